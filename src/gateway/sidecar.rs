//! Sidecar-backed gateway implementation.
//!
//! The backend protocol itself runs in an out-of-process sidecar; this
//! adapter drives it over a small HTTP surface:
//!
//! - `POST /session/connect` - begin a session handshake
//! - `GET  /session/events`  - long-poll for session events
//! - `POST /session/disconnect`, `POST /session/logout`
//! - `POST /messages/status`, `POST /messages/status-mentions`
//! - `GET  /groups/{jid}`    - group roster lookup
//! - `POST /groups/{jid}/messages` - message into the group with mentions

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::common::error::GatewayError;
use crate::gateway::types::{CloseReason, Credentials, GatewayEvent, GroupRoster, MessageContent};
use crate::gateway::{Gateway, GatewayConnection, GatewayConnector};

/// Timeout for ordinary request/response calls.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Timeout for one event long-poll cycle. The sidecar answers earlier when
/// events are pending.
const EVENT_POLL_TIMEOUT: Duration = Duration::from_secs(75);

/// Event shape on the sidecar wire.
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum WireEvent {
    Qr { payload: String },
    Open,
    Closed { reason: String },
    Credentials { key: String, data: serde_json::Value },
}

impl From<WireEvent> for GatewayEvent {
    fn from(event: WireEvent) -> Self {
        match event {
            WireEvent::Qr { payload } => GatewayEvent::Qr(payload),
            WireEvent::Open => GatewayEvent::Open,
            WireEvent::Closed { reason } => GatewayEvent::Closed(CloseReason::from_code(&reason)),
            WireEvent::Credentials { key, data } => {
                GatewayEvent::Credentials(Credentials { key, data })
            }
        }
    }
}

#[derive(Serialize)]
struct SendRequest<'a> {
    content: &'a MessageContent,
    recipients: &'a [String],
}

#[derive(Serialize)]
struct GroupMessageRequest<'a> {
    content: &'a MessageContent,
    mentions: &'a [String],
}

/// Connector for the protocol sidecar.
pub struct SidecarConnector {
    http: reqwest::Client,
    base_url: String,
}

impl SidecarConnector {
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url = base_url.into();
        let base_url = base_url.trim_end_matches('/').to_string();
        Self {
            http: reqwest::Client::new(),
            base_url,
        }
    }
}

#[async_trait]
impl GatewayConnector for SidecarConnector {
    async fn connect(&self) -> Result<GatewayConnection, GatewayError> {
        let url = format!("{}/session/connect", self.base_url);
        self.http
            .post(&url)
            .timeout(REQUEST_TIMEOUT)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| GatewayError::ConnectFailed {
                message: e.to_string(),
            })?;

        let (tx, rx) = mpsc::unbounded_channel();
        tokio::spawn(pump_events(
            self.http.clone(),
            self.base_url.clone(),
            tx,
        ));

        let handle: Arc<dyn Gateway> = Arc::new(SidecarGateway {
            http: self.http.clone(),
            base_url: self.base_url.clone(),
        });

        Ok(GatewayConnection { handle, events: rx })
    }
}

/// Forward sidecar events into the lifecycle manager's channel.
///
/// Ends when the session closes, or when a poll fails (reported upward as a
/// lost connection so the lifecycle manager can recover).
async fn pump_events(
    http: reqwest::Client,
    base_url: String,
    tx: mpsc::UnboundedSender<GatewayEvent>,
) {
    let url = format!("{}/session/events", base_url);

    loop {
        let batch = http
            .get(&url)
            .timeout(EVENT_POLL_TIMEOUT)
            .send()
            .await
            .and_then(|r| r.error_for_status());

        let events: Vec<WireEvent> = match batch {
            Ok(response) => match response.json().await {
                Ok(events) => events,
                Err(e) => {
                    warn!("Malformed sidecar event payload: {}", e);
                    let _ = tx.send(GatewayEvent::Closed(CloseReason::ConnectionLost));
                    return;
                }
            },
            Err(e) => {
                warn!("Sidecar event poll failed: {}", e);
                let _ = tx.send(GatewayEvent::Closed(CloseReason::ConnectionLost));
                return;
            }
        };

        for event in events {
            let event: GatewayEvent = event.into();
            let closed = matches!(event, GatewayEvent::Closed(_));
            if tx.send(event).is_err() {
                debug!("Lifecycle manager dropped the event channel, stopping pump");
                return;
            }
            if closed {
                return;
            }
        }
    }
}

/// Live session handle backed by the sidecar.
pub struct SidecarGateway {
    http: reqwest::Client,
    base_url: String,
}

impl SidecarGateway {
    async fn post_json<T: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &T,
    ) -> Result<(), reqwest::Error> {
        self.http
            .post(format!("{}{}", self.base_url, path))
            .timeout(REQUEST_TIMEOUT)
            .json(body)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map(|_| ())
    }
}

#[async_trait]
impl Gateway for SidecarGateway {
    async fn post_status(
        &self,
        content: &MessageContent,
        recipients: &[String],
    ) -> Result<(), GatewayError> {
        self.post_json("/messages/status", &SendRequest { content, recipients })
            .await
            .map_err(|e| GatewayError::SendFailed {
                message: e.to_string(),
            })
    }

    async fn send_status_mentions(
        &self,
        content: &MessageContent,
        recipients: &[String],
    ) -> Result<(), GatewayError> {
        self.post_json(
            "/messages/status-mentions",
            &SendRequest { content, recipients },
        )
        .await
        .map_err(|e| GatewayError::SendFailed {
            message: e.to_string(),
        })
    }

    async fn send_group_message(
        &self,
        group_jid: &str,
        content: &MessageContent,
        mentions: &[String],
    ) -> Result<(), GatewayError> {
        self.post_json(
            &format!("/groups/{}/messages", group_jid),
            &GroupMessageRequest { content, mentions },
        )
        .await
        .map_err(|e| GatewayError::SendFailed {
            message: e.to_string(),
        })
    }

    async fn group_roster(&self, group_jid: &str) -> Result<GroupRoster, GatewayError> {
        let to_err = |message: String| GatewayError::RosterLookupFailed {
            group: group_jid.to_string(),
            message,
        };

        let response = self
            .http
            .get(format!("{}/groups/{}", self.base_url, group_jid))
            .timeout(REQUEST_TIMEOUT)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| to_err(e.to_string()))?;

        response.json().await.map_err(|e| to_err(e.to_string()))
    }

    async fn disconnect(&self) -> Result<(), GatewayError> {
        self.post_json("/session/disconnect", &serde_json::json!({}))
            .await
            .map_err(GatewayError::from)
    }

    async fn logout(&self) -> Result<(), GatewayError> {
        self.post_json("/session/logout", &serde_json::json!({}))
            .await
            .map_err(GatewayError::from)
    }
}
