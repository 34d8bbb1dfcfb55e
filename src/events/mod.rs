//! Event/Log Sink.
//!
//! Bounded log history plus a broadcast channel for log lines and progress
//! updates. The sink is the explicit publish/replay contract for observers:
//! a new subscriber receives a snapshot of the current buffered history,
//! then live updates. The history keeps the most recent entries only,
//! evicting oldest-first.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::broadcast;
use tracing::{error, info, warn};

use crate::common::{LogEntry, LogLevel, ProgressUpdate, SinkEvent};

/// Maximum number of log entries retained for replay.
pub const LOG_HISTORY_LIMIT: usize = 100;

/// Broadcast channel capacity for live events.
const CHANNEL_CAPACITY: usize = 256;

/// Shared log/progress sink.
pub struct EventSink {
    history: Mutex<VecDeque<LogEntry>>,
    capacity: usize,
    tx: broadcast::Sender<SinkEvent>,
}

impl EventSink {
    pub fn new() -> Self {
        Self::with_capacity(LOG_HISTORY_LIMIT)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self {
            history: Mutex::new(VecDeque::with_capacity(capacity)),
            capacity,
            tx,
        }
    }

    /// Append a log entry, mirror it to tracing, and broadcast it.
    pub fn log(&self, level: LogLevel, message: impl Into<String>) {
        let message = message.into();
        let entry = LogEntry {
            timestamp: chrono::Local::now().format("%H:%M:%S").to_string(),
            message: message.clone(),
            level,
        };

        match level {
            LogLevel::Info | LogLevel::Success => info!("{}", message),
            LogLevel::Warning => warn!("{}", message),
            LogLevel::Error => error!("{}", message),
        }

        {
            let mut history = self.history.lock().expect("log history poisoned");
            if history.len() >= self.capacity {
                history.pop_front();
            }
            history.push_back(entry.clone());
        }

        // Nobody listening is fine
        let _ = self.tx.send(SinkEvent::Log(entry));
    }

    pub fn info(&self, message: impl Into<String>) {
        self.log(LogLevel::Info, message);
    }

    pub fn success(&self, message: impl Into<String>) {
        self.log(LogLevel::Success, message);
    }

    pub fn warning(&self, message: impl Into<String>) {
        self.log(LogLevel::Warning, message);
    }

    pub fn error(&self, message: impl Into<String>) {
        self.log(LogLevel::Error, message);
    }

    /// Broadcast a progress update. Not recorded in the log history.
    pub fn progress(&self, update: ProgressUpdate) {
        let _ = self.tx.send(SinkEvent::Progress(update));
    }

    /// Emit the progress dismissal signal after `delay`.
    pub fn schedule_progress_hide(self: &Arc<Self>, delay: Duration) {
        let sink = Arc::clone(self);
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            sink.progress(ProgressUpdate::hidden());
        });
    }

    /// Subscribe to the event stream.
    ///
    /// Returns the current history snapshot and a live receiver. Events
    /// published after the snapshot was taken arrive on the receiver.
    pub fn subscribe(&self) -> (Vec<LogEntry>, broadcast::Receiver<SinkEvent>) {
        let history = self.history.lock().expect("log history poisoned");
        let snapshot = history.iter().cloned().collect();
        (snapshot, self.tx.subscribe())
    }

    /// Current history snapshot.
    #[allow(dead_code)]
    pub fn history(&self) -> Vec<LogEntry> {
        let history = self.history.lock().expect("log history poisoned");
        history.iter().cloned().collect()
    }

    /// Drop all buffered history.
    #[allow(dead_code)]
    pub fn clear(&self) {
        let mut history = self.history.lock().expect("log history poisoned");
        history.clear();
    }
}

impl Default for EventSink {
    fn default() -> Self {
        Self::new()
    }
}
