//! Core types for the events crate.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Identifier of a work item, shared by the processor that handles it.
///
/// Uniqueness across one orchestration is the caller's responsibility.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WorkerId(String);

impl WorkerId {
    /// Create a worker ID from any string-like value.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Borrow the raw identifier.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for WorkerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for WorkerId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for WorkerId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl AsRef<str> for WorkerId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// A unit of work the orchestrator can hand to a processor.
///
/// `Display` is used in log lines such as `starting #<id> worker for <item>`.
pub trait WorkItem: Send + Sync + fmt::Display + 'static {
    /// Stable identifier of this item.
    fn id(&self) -> &WorkerId;
}

/// Lifecycle of a single processor.
///
/// `Stopped` and `Finished` are terminal; no further events follow them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProcessorStatus {
    /// Created, no step started yet.
    #[default]
    Initialized,
    /// A step is executing or about to.
    Running,
    /// Suspended at a step boundary.
    Paused,
    /// Stopped at a step boundary before completing all steps.
    Stopped,
    /// All steps completed.
    Finished,
}

impl ProcessorStatus {
    /// Whether the processor can no longer change state.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Stopped | Self::Finished)
    }

    /// Stable lowercase name, used in logs and snapshots.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Initialized => "initialized",
            Self::Running => "running",
            Self::Paused => "paused",
            Self::Stopped => "stopped",
            Self::Finished => "finished",
        }
    }
}

impl fmt::Display for ProcessorStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
