//! Messaging Gateway boundary.
//!
//! The backend's transport, crypto, and protocol live behind these traits.
//! The lifecycle manager owns the single live [`Gateway`] handle; the
//! campaign orchestrator borrows it for the duration of one run.

pub mod auth;
pub mod sidecar;
pub mod types;

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::common::error::GatewayError;

pub use types::{CloseReason, Credentials, GatewayEvent, GroupRoster, MessageContent};

/// A live session with the messaging backend.
#[async_trait]
pub trait Gateway: Send + Sync {
    /// Post `content` as a status broadcast addressed to exactly `recipients`.
    async fn post_status(
        &self,
        content: &MessageContent,
        recipients: &[String],
    ) -> Result<(), GatewayError>;

    /// Send the mention notification for an already-posted status.
    async fn send_status_mentions(
        &self,
        content: &MessageContent,
        recipients: &[String],
    ) -> Result<(), GatewayError>;

    /// Send `content` as one message into the group itself, mentioning
    /// `mentions`.
    async fn send_group_message(
        &self,
        group_jid: &str,
        content: &MessageContent,
        mentions: &[String],
    ) -> Result<(), GatewayError>;

    /// Look up a group's current member roster.
    async fn group_roster(&self, group_jid: &str) -> Result<GroupRoster, GatewayError>;

    /// Close the session without invalidating stored credentials.
    async fn disconnect(&self) -> Result<(), GatewayError>;

    /// Log out, invalidating the stored session.
    async fn logout(&self) -> Result<(), GatewayError>;
}

/// A freshly opened session: the handle plus its event stream.
///
/// The handshake is not complete until [`GatewayEvent::Open`] arrives on
/// `events`.
pub struct GatewayConnection {
    pub handle: Arc<dyn Gateway>,
    pub events: mpsc::UnboundedReceiver<GatewayEvent>,
}

/// Opens gateway sessions.
#[async_trait]
pub trait GatewayConnector: Send + Sync {
    async fn connect(&self) -> Result<GatewayConnection, GatewayError>;
}

/// Persists credentials issued by the backend.
///
/// Persistence is awaited by the lifecycle manager before any further event
/// is handled, so issued credentials cannot be lost silently on a crash.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    async fn persist(&self, credentials: &Credentials) -> Result<(), GatewayError>;
}
