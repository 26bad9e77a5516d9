//! Actor-based concurrency for the orchestrator.
//!
//! # Architecture
//!
//! - **Message passing**: the orchestrator and every processor own their
//!   state exclusively; they only talk through mailboxes
//! - **Serialized handling**: one message at a time per actor, so the
//!   orchestrator's five collections never race
//! - **Graceful degradation**: business errors travel in RPC replies, they
//!   never crash an actor
//!
//! # Components
//!
//! - `OrchestratorActorDef`: owns the waiting pool and all bookkeeping
//! - `StepProcessorActorDef`: runs one work item's steps, honouring
//!   pause/stop at step boundaries
//! - `ProcessorHandle`: the `Processor` implementation backed by a step
//!   processor actor
//! - `ActorError`: business errors returned via RPC replies

pub mod errors;
pub mod messages;
pub mod orchestrator;
pub mod step_processor;

// Re-export main types for convenience
pub use errors::ActorError;
pub use messages::{OrchestratorMessage, PoolSnapshot, ProcessorMessage, ProcessorSnapshot};
pub use orchestrator::{
    CompletionCallback, OrchestratorActorDef, OrchestratorArguments, OrchestratorState,
    ProcessorEntry, spawn_orchestrator,
};
pub use step_processor::{
    ProcessorHandle, StepProcessorActorDef, StepProcessorArguments, StepProcessorState, StepWork,
    spawn_step_processor,
};
