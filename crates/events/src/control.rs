//! Commands sent from the orchestrator to a processor.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Control command forwarded to a running processor.
///
/// Pause and stop are cooperative: they take effect at the next step boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Control {
    /// Begin or continue processing.
    Start,
    /// Suspend at the next step boundary.
    Pause,
    /// Continue from where a pause left off.
    Resume,
    /// Terminate at the next step boundary.
    Stop,
}

impl Control {
    /// Whether this command (re)starts processing rather than interrupting it.
    #[must_use]
    pub const fn is_activation(self) -> bool {
        matches!(self, Self::Start | Self::Resume)
    }
}

impl fmt::Display for Control {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Start => "start",
            Self::Pause => "pause",
            Self::Resume => "resume",
            Self::Stop => "stop",
        };
        f.write_str(name)
    }
}
