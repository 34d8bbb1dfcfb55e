//! Error types for the application.

use thiserror::Error;

/// Top-level application error.
#[derive(Debug, Error)]
#[allow(dead_code)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Gateway error: {0}")]
    Gateway(#[from] GatewayError),

    #[error("Recipient resolution error: {0}")]
    Resolve(#[from] ResolveError),

    #[error("Campaign error: {0}")]
    Campaign(#[from] CampaignError),
}

/// Configuration-related errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file '{path}': {source}")]
    IoError {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config: {message}")]
    ParseError { message: String },

    #[error("Config validation failed: {message}")]
    ValidationError { message: String },
}

/// Errors at the messaging gateway boundary.
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("Connection already active or in progress")]
    AlreadyActive,

    #[error("No active connection")]
    NotConnected,

    #[error("Connect attempt failed: {message}")]
    ConnectFailed { message: String },

    #[error("Send failed: {message}")]
    SendFailed { message: String },

    #[error("Group roster lookup failed for '{group}': {message}")]
    RosterLookupFailed { group: String, message: String },

    #[error("Failed to persist credentials '{key}': {source}")]
    CredentialPersist {
        key: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Gateway request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Lifecycle manager unavailable")]
    ManagerGone,
}

/// A single rejected line in a manual recipient list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineError {
    /// 1-based line number in the operator's input.
    pub line: usize,
    pub value: String,
    pub reason: String,
}

impl std::fmt::Display for LineError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "line {}: '{}' - {}", self.line, self.value, self.reason)
    }
}

/// Recipient resolution errors.
#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("Invalid recipient list ({} line(s) rejected): {}", .0.len(), format_line_errors(.0))]
    InvalidLines(Vec<LineError>),

    #[error("Recipient list is empty")]
    EmptyList,

    #[error("Group reference is not configured")]
    MissingGroup,

    #[error("Group roster lookup failed: {0}")]
    RosterLookup(#[source] GatewayError),
}

fn format_line_errors(errors: &[LineError]) -> String {
    errors
        .iter()
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

/// Campaign execution errors.
#[derive(Debug, Error)]
pub enum CampaignError {
    #[error("Campaign is already running")]
    AlreadyRunning,

    #[error("Campaign is not running")]
    NotRunning,

    #[error("Connection is not ready")]
    NotConnected,

    #[error("No message templates configured")]
    NoMessages,

    #[error("Fixed message index {index} out of range ({count} configured)")]
    MessageIndexOutOfRange { index: usize, count: usize },

    #[error("Media file not found: {path}")]
    MediaMissing { path: String },

    #[error("Unsupported media file type: {extension}")]
    UnsupportedMedia { extension: String },

    #[error("Recipient resolution failed: {0}")]
    Resolve(#[from] ResolveError),

    #[error("Send failed: {0}")]
    Send(#[from] GatewayError),
}

/// Result type alias using AppError.
#[allow(dead_code)]
pub type Result<T> = std::result::Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_line_error_display() {
        let err = LineError {
            line: 3,
            value: "abc".to_string(),
            reason: "not a phone number".to_string(),
        };
        assert_eq!(err.to_string(), "line 3: 'abc' - not a phone number");
    }

    #[test]
    fn test_invalid_lines_message_names_every_line() {
        let err = ResolveError::InvalidLines(vec![
            LineError {
                line: 1,
                value: "x".to_string(),
                reason: "too short".to_string(),
            },
            LineError {
                line: 4,
                value: "y".to_string(),
                reason: "too short".to_string(),
            },
        ]);
        let msg = err.to_string();
        assert!(msg.contains("2 line(s) rejected"));
        assert!(msg.contains("line 1"));
        assert!(msg.contains("line 4"));
    }
}
