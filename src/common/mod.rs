//! Common utilities and types shared across the application.

pub mod error;
pub mod messages;

// Re-export the types most modules need
pub use messages::{
    ConnectionSnapshot, ConnectionState, LogEntry, LogLevel, ProgressUpdate, RunOutcome,
    SinkEvent, StatusReport,
};
