//! Canonical types shared across the application.
//!
//! This module defines the single source of truth for log/progress events,
//! connection status snapshots, and campaign run outcomes.

use serde::Serialize;

/// Severity of a log entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Info,
    Success,
    Warning,
    Error,
}

/// A single entry in the bounded log history.
#[derive(Debug, Clone, Serialize)]
pub struct LogEntry {
    /// Wall-clock time, formatted HH:MM:SS.
    pub timestamp: String,
    pub message: String,
    #[serde(rename = "type")]
    pub level: LogLevel,
}

/// Progress update for the operator-facing progress indicator.
#[derive(Debug, Clone, Serialize)]
pub struct ProgressUpdate {
    pub text: String,
    pub percent: u8,
    /// When true, the indicator should be dismissed.
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub hide: bool,
}

impl ProgressUpdate {
    pub fn new(text: impl Into<String>, percent: u8) -> Self {
        Self {
            text: text.into(),
            percent,
            hide: false,
        }
    }

    /// The dismissal signal emitted shortly after a terminal update.
    pub fn hidden() -> Self {
        Self {
            text: String::new(),
            percent: 0,
            hide: true,
        }
    }
}

/// Event published on the sink's broadcast channel.
#[derive(Debug, Clone)]
pub enum SinkEvent {
    Log(LogEntry),
    Progress(ProgressUpdate),
}

/// Connection lifecycle phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionState {
    Idle,
    Connecting,
    Ready,
    Closing,
}

/// Published view of the lifecycle manager's state.
///
/// Readable at any time without going through the manager's event loop.
#[derive(Debug, Clone)]
pub struct ConnectionSnapshot {
    pub state: ConnectionState,
    /// Current QR challenge payload, if one is pending.
    pub qr: Option<String>,
}

impl ConnectionSnapshot {
    pub fn idle() -> Self {
        Self {
            state: ConnectionState::Idle,
            qr: None,
        }
    }

    pub fn is_ready(&self) -> bool {
        self.state == ConnectionState::Ready
    }

    pub fn is_connecting(&self) -> bool {
        self.state == ConnectionState::Connecting
    }
}

/// Combined status report for the operator surface.
#[derive(Debug, Clone, Serialize)]
pub struct StatusReport {
    pub connection: ConnectionState,
    pub is_connected: bool,
    pub is_connecting: bool,
    pub has_pending_qr: bool,
    pub running: bool,
    pub should_stop: bool,
}

/// Terminal outcome of one campaign run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    /// All batches were sent.
    Completed,
    /// Cancellation was observed at a checkpoint before completion.
    Interrupted,
    /// The run aborted on an error.
    Failed(String),
}
