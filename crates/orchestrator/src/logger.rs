//! Logging capability for orchestration lifecycle events.
//!
//! The orchestrator calls [`Logger::log`] once per loggable event (start,
//! progress, pause, resume, stop, finish, failure, all-done). What a sink
//! does with the line is its own business.

use std::sync::{Mutex, PoisonError};

use chrono::{DateTime, Utc};
use im::Vector;
use tracing::info;
use workpool_events::WorkerId;

/// Sink for lifecycle log lines.
pub trait Logger: Send + Sync + 'static {
    /// Record one line, optionally attributed to a worker.
    fn log(&self, worker_id: Option<&WorkerId>, message: &str);
}

/// Forwards every line to `tracing` at info level.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingLogger;

impl Logger for TracingLogger {
    fn log(&self, worker_id: Option<&WorkerId>, message: &str) {
        match worker_id {
            Some(id) => info!(worker_id = %id, "{message}"),
            None => info!("{message}"),
        }
    }
}

/// One recorded log line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEntry {
    pub timestamp: DateTime<Utc>,
    pub worker_id: Option<WorkerId>,
    pub message: String,
}

impl LogEntry {
    /// Render as `{id}: {message}`, or just the message when unattributed.
    #[must_use]
    pub fn line(&self) -> String {
        self.worker_id.as_ref().map_or_else(
            || self.message.clone(),
            |id| format!("{id}: {}", self.message),
        )
    }
}

/// Keeps every line in memory, in call order.
#[derive(Debug, Default)]
pub struct MemoryLogger {
    entries: Mutex<Vector<LogEntry>>,
}

impl MemoryLogger {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// All entries recorded so far.
    pub fn entries(&self) -> Vector<LogEntry> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Messages attributed to `worker_id`, in order.
    pub fn messages_for(&self, worker_id: &WorkerId) -> Vec<String> {
        self.entries()
            .iter()
            .filter(|entry| entry.worker_id.as_ref() == Some(worker_id))
            .map(|entry| entry.message.clone())
            .collect()
    }

    /// Number of entries whose message equals `message`.
    pub fn count(&self, message: &str) -> usize {
        self.entries()
            .iter()
            .filter(|entry| entry.message == message)
            .count()
    }
}

impl Logger for MemoryLogger {
    fn log(&self, worker_id: Option<&WorkerId>, message: &str) {
        let entry = LogEntry {
            timestamp: Utc::now(),
            worker_id: worker_id.cloned(),
            message: message.to_string(),
        };
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push_back(entry);
    }
}
