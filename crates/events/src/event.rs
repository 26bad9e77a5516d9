//! Events reported by a processor back to its orchestrator.

use serde::{Deserialize, Serialize};

/// Back-communication from a processor, generic over the domain message `M`.
///
/// For one processor the sequence is: zero or more `Progress` with
/// non-decreasing percent, interleaved with `Paused`/`Resumed`/`Message`,
/// ending in exactly one of `Stopped` or `Finished`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum BackCommunication<M> {
    /// A step has started, or all steps completed (`percent == 100`).
    Progress {
        /// Percentage in `[0, 100]`.
        percent: f64,
        /// Step name, or `"finished"`.
        label: String,
    },
    /// Suspended at a step boundary.
    Paused,
    /// Processing continued after a pause.
    Resumed,
    /// Stopped before completing all steps. Terminal.
    Stopped,
    /// Completed all steps. Terminal.
    Finished,
    /// Domain-specific payload.
    Message(M),
}

impl<M> BackCommunication<M> {
    /// Convenience constructor for progress events.
    pub fn progress(percent: f64, label: impl Into<String>) -> Self {
        Self::Progress {
            percent,
            label: label.into(),
        }
    }

    /// Whether this event ends the processor's event stream.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Stopped | Self::Finished)
    }

    /// Get the event type as a string.
    #[must_use]
    pub const fn event_type(&self) -> &'static str {
        match self {
            Self::Progress { .. } => "progress",
            Self::Paused => "paused",
            Self::Resumed => "resumed",
            Self::Stopped => "stopped",
            Self::Finished => "finished",
            Self::Message(_) => "message",
        }
    }
}
