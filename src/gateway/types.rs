//! Gateway boundary types.
//!
//! Wire-level shapes exchanged with the messaging backend sidecar, plus the
//! events the lifecycle manager consumes.

use serde::{Deserialize, Serialize};

/// Asynchronous event emitted by a live gateway session.
#[derive(Debug, Clone)]
pub enum GatewayEvent {
    /// A QR challenge is pending; payload is the challenge data to display.
    Qr(String),
    /// The connection handshake completed; the session is usable.
    Open,
    /// The connection closed.
    Closed(CloseReason),
    /// The backend issued updated credentials that must be persisted.
    Credentials(Credentials),
}

/// Why a connection closed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CloseReason {
    /// Authenticated logout. Terminal: no reconnect may be scheduled.
    LoggedOut,
    /// Transport dropped unexpectedly.
    ConnectionLost,
    /// Backend closed the stream in an orderly way.
    ConnectionClosed,
    /// Backend asked the client to restart the session.
    Restart,
    /// Anything else, carrying the backend's reason code.
    Other(String),
}

impl CloseReason {
    /// Terminal closes must not trigger automatic reconnection.
    pub fn is_terminal(&self) -> bool {
        matches!(self, CloseReason::LoggedOut)
    }

    /// Map a sidecar reason code to a close reason.
    pub fn from_code(code: &str) -> Self {
        match code {
            "logged_out" => CloseReason::LoggedOut,
            "connection_lost" => CloseReason::ConnectionLost,
            "connection_closed" => CloseReason::ConnectionClosed,
            "restart_required" => CloseReason::Restart,
            other => CloseReason::Other(other.to_string()),
        }
    }
}

impl std::fmt::Display for CloseReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CloseReason::LoggedOut => write!(f, "logged out"),
            CloseReason::ConnectionLost => write!(f, "connection lost"),
            CloseReason::ConnectionClosed => write!(f, "connection closed"),
            CloseReason::Restart => write!(f, "restart required"),
            CloseReason::Other(code) => write!(f, "{}", code),
        }
    }
}

/// Credentials issued by the backend during or after the handshake.
///
/// The payload is opaque to the core; it is persisted as-is and replayed to
/// the sidecar on the next connect.
#[derive(Debug, Clone, Deserialize)]
pub struct Credentials {
    /// Storage key, e.g. "creds" or a sync-key identifier.
    pub key: String,
    pub data: serde_json::Value,
}

/// A group's current membership as reported by the backend.
#[derive(Debug, Clone, Deserialize)]
pub struct GroupRoster {
    pub subject: String,
    /// Canonical member addresses.
    pub members: Vec<String>,
}

impl GroupRoster {
    #[allow(dead_code)]
    pub fn count(&self) -> usize {
        self.members.len()
    }
}

/// Fully built message content for one send unit.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum MessageContent {
    Text {
        text: String,
        /// Font index, 0..9.
        font: u8,
        /// Background color as "#RRGGBB".
        background_color: String,
    },
    Image {
        path: String,
        caption: String,
    },
    Video {
        path: String,
        caption: String,
    },
}

impl MessageContent {
    /// Whether this content carries a media attachment.
    #[allow(dead_code)]
    pub fn has_media(&self) -> bool {
        !matches!(self, MessageContent::Text { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_logout_is_terminal() {
        assert!(CloseReason::LoggedOut.is_terminal());
        assert!(!CloseReason::ConnectionLost.is_terminal());
        assert!(!CloseReason::ConnectionClosed.is_terminal());
        assert!(!CloseReason::Restart.is_terminal());
        assert!(!CloseReason::Other("unknown".to_string()).is_terminal());
    }

    #[test]
    fn test_close_reason_from_code() {
        assert_eq!(CloseReason::from_code("logged_out"), CloseReason::LoggedOut);
        assert_eq!(
            CloseReason::from_code("connection_lost"),
            CloseReason::ConnectionLost
        );
        assert_eq!(
            CloseReason::from_code("weird"),
            CloseReason::Other("weird".to_string())
        );
    }

    #[test]
    fn test_message_content_serializes_tagged() {
        let content = MessageContent::Image {
            path: "assets/promo.jpg".to_string(),
            caption: "hello".to_string(),
        };
        let json = serde_json::to_value(&content).unwrap();
        assert_eq!(json["kind"], "image");
        assert_eq!(json["caption"], "hello");
    }
}
