//! Actor-specific error types.
//!
//! These are business logic errors returned in RPC replies.
//! They are NOT actor crashes - they're normal error responses.

use std::time::Duration;
use thiserror::Error;

/// Business logic errors returned in RPC replies.
///
/// These errors represent expected failure modes that don't crash the actor.
/// The actor continues running after returning these errors to callers.
#[derive(Debug, Clone, Error)]
pub enum ActorError {
    /// A processor could not be created or refused to process.
    #[error("Processor failed for {worker_id}: {reason}")]
    ProcessorFailed { worker_id: String, reason: String },

    /// A single step of a processor failed.
    #[error("Step '{step}' failed: {reason}")]
    StepFailed { step: String, reason: String },

    /// RPC call timed out.
    #[error("RPC timeout after {0:?}")]
    RpcTimeout(Duration),

    /// The actor is not available (stopped or not started).
    #[error("Actor not available")]
    ActorUnavailable,

    /// Channel communication error.
    #[error("Channel error: {0}")]
    ChannelError(String),

    /// Failed to spawn an actor.
    #[error("Spawn failed: {0}")]
    SpawnFailed(String),

    /// Internal actor error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ActorError {
    /// Create a processor failure error.
    pub fn processor_failed(worker_id: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::ProcessorFailed {
            worker_id: worker_id.into(),
            reason: reason.into(),
        }
    }

    /// Create a step failure error.
    pub fn step_failed(step: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::StepFailed {
            step: step.into(),
            reason: reason.into(),
        }
    }

    /// Create an RPC timeout error.
    #[must_use]
    pub const fn rpc_timeout(duration: Duration) -> Self {
        Self::RpcTimeout(duration)
    }

    /// Create an actor unavailable error.
    #[must_use]
    pub const fn actor_unavailable() -> Self {
        Self::ActorUnavailable
    }

    /// Create a channel error.
    pub fn channel_error(msg: impl Into<String>) -> Self {
        Self::ChannelError(msg.into())
    }

    /// Create a spawn failure error.
    pub fn spawn_failed(msg: impl Into<String>) -> Self {
        Self::SpawnFailed(msg.into())
    }

    /// Create an internal error.
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }
}
