//! Caller-facing handle to a running orchestration.

use std::fmt;
use std::marker::PhantomData;
use std::time::Duration;

use ractor::rpc::CallResult;
use ractor::{ActorRef, RpcReplyPort};
use tokio::task::JoinHandle;
use tracing::debug;
use workpool_events::{Control, WorkItem, WorkerId};

use crate::actors::errors::ActorError;
use crate::actors::messages::{OrchestratorMessage, PoolSnapshot};
use crate::actors::orchestrator::{OrchestratorArguments, spawn_orchestrator};

/// A spawned orchestrator together with its join handle.
pub struct Orchestration<W, M> {
    actor: ActorRef<OrchestratorMessage<M>>,
    join: JoinHandle<()>,
    rpc_timeout: Duration,
    parallel_workers: usize,
    _items: PhantomData<fn() -> W>,
}

impl<W, M> Orchestration<W, M>
where
    W: WorkItem + Clone,
    M: fmt::Display + Send + 'static,
{
    /// Spawn the orchestrator actor. Nothing is launched until [`start`](Self::start).
    ///
    /// # Errors
    ///
    /// Returns `SpawnFailed` if the actor could not be started.
    pub async fn spawn(args: OrchestratorArguments<W, M>) -> Result<Self, ActorError> {
        let rpc_timeout = args.rpc_timeout;
        let parallel_workers = args.parallel_workers;
        let (actor, join) = spawn_orchestrator(args).await?;
        Ok(Self {
            actor,
            join,
            rpc_timeout,
            parallel_workers,
            _items: PhantomData,
        })
    }

    /// Fill up to `parallel_workers` slots.
    ///
    /// Returns once the initial fill completes, with the number of active
    /// processors. A second call launches nothing.
    ///
    /// # Errors
    ///
    /// Returns an error if the orchestrator did not answer in time.
    pub async fn start(&self) -> Result<usize, ActorError> {
        self.request(|reply| OrchestratorMessage::Start { reply }, self.fill_timeout())
            .await
    }

    /// Forward `control` to the active processor for `worker_id`.
    ///
    /// Returns `false` without error when the worker is not active.
    ///
    /// # Errors
    ///
    /// Returns an error if the processor rejected the command or the
    /// orchestrator did not answer in time.
    pub async fn control(&self, worker_id: &WorkerId, control: Control) -> Result<bool, ActorError> {
        let worker_id = worker_id.clone();
        self.request(
            |reply| OrchestratorMessage::Control {
                worker_id,
                control,
                reply,
            },
            self.rpc_timeout.saturating_mul(2),
        )
        .await?
    }

    /// True iff nothing is waiting and nothing is active.
    ///
    /// # Errors
    ///
    /// Returns an error if the orchestrator did not answer in time.
    pub async fn all_done(&self) -> Result<bool, ActorError> {
        self.request(|reply| OrchestratorMessage::AllDone { reply }, self.rpc_timeout)
            .await
    }

    /// Current bookkeeping of all five collections.
    ///
    /// # Errors
    ///
    /// Returns an error if the orchestrator did not answer in time.
    pub async fn snapshot(&self) -> Result<PoolSnapshot, ActorError> {
        self.request(|reply| OrchestratorMessage::GetSnapshot { reply }, self.rpc_timeout)
            .await
    }

    /// The underlying actor.
    #[must_use]
    pub const fn actor(&self) -> &ActorRef<OrchestratorMessage<M>> {
        &self.actor
    }

    /// Stop the orchestrator and wait for it to exit.
    ///
    /// Still-active processors are shut down.
    ///
    /// # Errors
    ///
    /// Returns `Internal` if the actor task panicked.
    pub async fn shutdown(self) -> Result<(), ActorError> {
        self.actor.stop(Some("shutdown".to_string()));
        self.join
            .await
            .map_err(|e| ActorError::internal(format!("Orchestrator task failed: {e}")))?;
        debug!("Orchestration shut down");
        Ok(())
    }

    /// Each slot may wait up to one processor RPC during the initial fill.
    fn fill_timeout(&self) -> Duration {
        let slots = u32::try_from(self.parallel_workers.saturating_add(1)).unwrap_or(u32::MAX);
        self.rpc_timeout.saturating_mul(slots)
    }

    async fn request<T, F>(&self, build: F, timeout: Duration) -> Result<T, ActorError>
    where
        T: Send + 'static,
        F: FnOnce(RpcReplyPort<T>) -> OrchestratorMessage<M>,
    {
        match self.actor.call(build, Some(timeout)).await {
            Ok(CallResult::Success(value)) => Ok(value),
            Ok(CallResult::Timeout) => Err(ActorError::rpc_timeout(timeout)),
            Ok(CallResult::SenderError) => Err(ActorError::actor_unavailable()),
            Err(e) => Err(ActorError::channel_error(e.to_string())),
        }
    }
}
