//! The processor contract.
//!
//! A [`Processor`] is bound to exactly one work item and reports upward
//! through a [`BackChannel`]. A [`ProcessorFactory`] is the only extension
//! point for new kinds of work item.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use ractor::ActorRef;
use workpool_events::{BackCommunication, Control, WorkerId};

use crate::actors::errors::ActorError;
use crate::actors::messages::OrchestratorMessage;

/// One worker bound to one work item.
///
/// `process` only initiates work; progress and termination are observable
/// exclusively through the back channel handed to the factory.
#[async_trait]
pub trait Processor: Send + Sync + 'static {
    /// The worker this processor was created for.
    fn worker_id(&self) -> &WorkerId;

    /// Begin or resume execution. No-op once stopped or finished.
    ///
    /// # Errors
    ///
    /// Returns an error if processing could not be initiated.
    async fn process(&self) -> Result<(), ActorError>;

    /// Request a status transition.
    ///
    /// # Errors
    ///
    /// Returns an error if the command could not be delivered.
    async fn handle(&self, control: Control) -> Result<(), ActorError>;

    /// Release resources held by the processor.
    async fn shutdown(&self) {}
}

/// Builds processors for work items of type `W` reporting messages of type `M`.
#[async_trait]
pub trait ProcessorFactory<W, M>: Send + Sync + 'static {
    /// Create a processor bound to `item`, reporting through `sink`.
    ///
    /// # Errors
    ///
    /// Returns an error if the processor could not be instantiated.
    async fn create(
        &self,
        item: W,
        worker_id: WorkerId,
        sink: BackChannel<M>,
    ) -> Result<Box<dyn Processor>, ActorError>;
}

type SinkFn<M> = dyn Fn(WorkerId, BackCommunication<M>) -> Result<(), ActorError> + Send + Sync;

/// Sink for back-communication events.
///
/// Events sent through one channel from one task arrive in the order sent.
pub struct BackChannel<M> {
    sink: Arc<SinkFn<M>>,
}

impl<M> Clone for BackChannel<M> {
    fn clone(&self) -> Self {
        Self {
            sink: Arc::clone(&self.sink),
        }
    }
}

impl<M> fmt::Debug for BackChannel<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BackChannel").finish_non_exhaustive()
    }
}

impl<M: Send + 'static> BackChannel<M> {
    /// Wrap an arbitrary function as a sink.
    pub fn from_fn<F>(f: F) -> Self
    where
        F: Fn(WorkerId, BackCommunication<M>) -> Result<(), ActorError> + Send + Sync + 'static,
    {
        Self { sink: Arc::new(f) }
    }

    /// Enqueue events into an orchestrator's mailbox.
    #[must_use]
    pub fn from_actor(actor: ActorRef<OrchestratorMessage<M>>) -> Self {
        Self::from_fn(move |worker_id, event| {
            actor
                .send_message(OrchestratorMessage::BackCommunication { worker_id, event })
                .map_err(|e| ActorError::channel_error(e.to_string()))
        })
    }

    /// Deliver one event.
    ///
    /// # Errors
    ///
    /// Returns an error if the receiving side is gone.
    pub fn send(&self, worker_id: &WorkerId, event: BackCommunication<M>) -> Result<(), ActorError> {
        (self.sink)(worker_id.clone(), event)
    }
}
