//! OrchestratorActor - bounded-parallelism scheduling of work items.
//!
//! The actor owns five disjoint collections keyed by worker ID. Every item
//! moves forward through them exactly once:
//!
//! ```text
//! waiting ──► started ──► finished
//!    │           └──────► stopped
//!    └──────────────────► failed_to_start
//! ```
//!
//! All public operations and all back-communication events are messages in
//! the actor's mailbox, so they are handled one at a time.

use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use im::{HashMap, Vector};
use itertools::Itertools;
use ractor::{Actor, ActorProcessingErr, ActorRef};
use tap::TapFallible;
use tracing::{debug, info, warn};
use workpool_core::PoolConfig;
use workpool_events::{BackCommunication, Control, WorkItem, WorkerId};

use super::errors::ActorError;
use super::messages::{OrchestratorMessage, PoolSnapshot};
use crate::logger::Logger;
use crate::processor::{BackChannel, Processor, ProcessorFactory};

/// Callback invoked once every item has reached a terminal collection.
pub type CompletionCallback = Box<dyn FnOnce() + Send>;

/// Arguments for spawning an OrchestratorActor.
pub struct OrchestratorArguments<W, M> {
    /// Initial items, pushed onto the waiting pool in order.
    pub items: Vec<W>,
    /// Maximum number of simultaneously active processors.
    pub parallel_workers: usize,
    /// Try the next waiting item when a launch fails instead of consuming the slot.
    pub refill_on_launch_failure: bool,
    /// Timeout for request/response calls made through the orchestration handle.
    pub rpc_timeout: Duration,
    pub factory: Arc<dyn ProcessorFactory<W, M>>,
    pub logger: Arc<dyn Logger>,
    pub on_all_done: Option<CompletionCallback>,
}

impl<W, M> OrchestratorArguments<W, M> {
    /// Arguments with the default pool configuration.
    pub fn new<F>(items: Vec<W>, factory: F, logger: Arc<dyn Logger>) -> Self
    where
        F: ProcessorFactory<W, M>,
    {
        let defaults = PoolConfig::default();
        Self {
            items,
            parallel_workers: defaults.parallel_workers,
            refill_on_launch_failure: defaults.refill_on_launch_failure,
            rpc_timeout: defaults.rpc_timeout(),
            factory: Arc::new(factory),
            logger,
            on_all_done: None,
        }
    }

    /// Apply pool settings from configuration.
    #[must_use]
    pub fn with_pool_config(mut self, config: &PoolConfig) -> Self {
        self.parallel_workers = config.parallel_workers;
        self.refill_on_launch_failure = config.refill_on_launch_failure;
        self.rpc_timeout = config.rpc_timeout();
        self
    }

    #[must_use]
    pub const fn with_parallel_workers(mut self, parallel_workers: usize) -> Self {
        self.parallel_workers = parallel_workers;
        self
    }

    /// Register the completion callback.
    #[must_use]
    pub fn on_all_done(mut self, callback: impl FnOnce() + Send + 'static) -> Self {
        self.on_all_done = Some(Box::new(callback));
        self
    }
}

/// An active or stopped entry: the item and the processor created for it.
pub struct ProcessorEntry<W> {
    pub item: W,
    pub processor: Arc<dyn Processor>,
}

impl<W: Clone> Clone for ProcessorEntry<W> {
    fn clone(&self) -> Self {
        Self {
            item: self.item.clone(),
            processor: Arc::clone(&self.processor),
        }
    }
}

/// State owned exclusively by the OrchestratorActor.
pub struct OrchestratorState<W: Clone, M> {
    /// LIFO pool: the back of the vector launches next.
    waiting: Vector<W>,
    started: HashMap<WorkerId, ProcessorEntry<W>>,
    stopped: HashMap<WorkerId, ProcessorEntry<W>>,
    finished: HashMap<WorkerId, W>,
    failed_to_start: HashMap<WorkerId, W>,
    worker_count: u64,
    parallel_workers: usize,
    refill_on_launch_failure: bool,
    fill_started: bool,
    completion_fired: bool,
    factory: Arc<dyn ProcessorFactory<W, M>>,
    logger: Arc<dyn Logger>,
    on_all_done: Option<CompletionCallback>,
}

impl<W: WorkItem + Clone, M> OrchestratorState<W, M> {
    fn new(args: OrchestratorArguments<W, M>) -> Self {
        Self {
            waiting: args.items.into_iter().collect(),
            started: HashMap::new(),
            stopped: HashMap::new(),
            finished: HashMap::new(),
            failed_to_start: HashMap::new(),
            worker_count: 0,
            parallel_workers: args.parallel_workers,
            refill_on_launch_failure: args.refill_on_launch_failure,
            fill_started: false,
            completion_fired: false,
            factory: args.factory,
            logger: args.logger,
            on_all_done: args.on_all_done,
        }
    }

    /// True iff nothing is waiting and nothing is active.
    fn all_done(&self) -> bool {
        self.waiting.is_empty() && self.started.is_empty()
    }

    fn snapshot(&self) -> PoolSnapshot {
        PoolSnapshot {
            waiting: self.waiting.iter().rev().map(|item| item.id().clone()).collect(),
            started: self.started.keys().cloned().sorted().collect(),
            stopped: self.stopped.keys().cloned().sorted().collect(),
            finished: self.finished.keys().cloned().sorted().collect(),
            failed_to_start: self.failed_to_start.keys().cloned().sorted().collect(),
            worker_count: self.worker_count,
            parallel_workers: self.parallel_workers,
            completion_fired: self.completion_fired,
        }
    }

    /// Log all-done and run the callback, once per orchestration.
    fn fire_completion(&mut self) {
        if self.completion_fired {
            return;
        }
        self.completion_fired = true;
        self.logger.log(None, "All done!");
        if let Some(callback) = self.on_all_done.take() {
            callback();
        }
    }

    fn fire_completion_if_done(&mut self) {
        if self.all_done() {
            self.fire_completion();
        }
    }
}

/// The OrchestratorActor definition.
pub struct OrchestratorActorDef<W, M>(PhantomData<fn() -> (W, M)>);

impl<W, M> OrchestratorActorDef<W, M> {
    #[must_use]
    pub const fn new() -> Self {
        Self(PhantomData)
    }
}

impl<W, M> Default for OrchestratorActorDef<W, M> {
    fn default() -> Self {
        Self::new()
    }
}

impl<W, M> Actor for OrchestratorActorDef<W, M>
where
    W: WorkItem + Clone,
    M: fmt::Display + Send + 'static,
{
    type Msg = OrchestratorMessage<M>;
    type State = OrchestratorState<W, M>;
    type Arguments = OrchestratorArguments<W, M>;

    async fn pre_start(
        &self,
        _myself: ActorRef<Self::Msg>,
        args: Self::Arguments,
    ) -> Result<Self::State, ActorProcessingErr> {
        let state = OrchestratorState::new(args);
        state.logger.log(
            None,
            &format!(
                "Initializing an orchestration for {} work items ... with {} workers in parallel.",
                state.waiting.len(),
                state.parallel_workers
            ),
        );
        Ok(state)
    }

    async fn handle(
        &self,
        myself: ActorRef<Self::Msg>,
        message: Self::Msg,
        state: &mut Self::State,
    ) -> Result<(), ActorProcessingErr> {
        match message {
            // ═══════════════════════════════════════════════════════════════
            // COMMANDS
            // ═══════════════════════════════════════════════════════════════
            OrchestratorMessage::Start { reply } => {
                Self::handle_start(&myself, state).await;
                if reply.send(state.started.len()).is_err() {
                    debug!("Start caller went away");
                }
            }

            OrchestratorMessage::Control {
                worker_id,
                control,
                reply,
            } => {
                let processor = state
                    .started
                    .get(&worker_id)
                    .map(|entry| Arc::clone(&entry.processor));
                let result = Self::forward_control(processor, &worker_id, control).await;
                if reply.send(result).is_err() {
                    debug!(worker_id = %worker_id, "Control caller went away");
                }
            }

            // ═══════════════════════════════════════════════════════════════
            // EVENTS
            // ═══════════════════════════════════════════════════════════════
            OrchestratorMessage::BackCommunication { worker_id, event } => {
                Self::handle_back_communication(&myself, state, worker_id, event).await;
            }

            // ═══════════════════════════════════════════════════════════════
            // QUERIES
            // ═══════════════════════════════════════════════════════════════
            OrchestratorMessage::AllDone { reply } => {
                let _ = reply.send(state.all_done());
            }

            OrchestratorMessage::GetSnapshot { reply } => {
                let _ = reply.send(state.snapshot());
            }
        }
        Ok(())
    }

    async fn post_stop(
        &self,
        _myself: ActorRef<Self::Msg>,
        state: &mut Self::State,
    ) -> Result<(), ActorProcessingErr> {
        let active: Vec<Arc<dyn Processor>> = state
            .started
            .values()
            .map(|entry| Arc::clone(&entry.processor))
            .collect();
        join_all(active.iter().map(|processor| processor.shutdown())).await;
        info!(
            active = active.len(),
            finished = state.finished.len(),
            stopped = state.stopped.len(),
            failed_to_start = state.failed_to_start.len(),
            "OrchestratorActor stopped"
        );
        Ok(())
    }
}

impl<W, M> OrchestratorActorDef<W, M>
where
    W: WorkItem + Clone,
    M: fmt::Display + Send + 'static,
{
    async fn handle_start(
        myself: &ActorRef<OrchestratorMessage<M>>,
        state: &mut OrchestratorState<W, M>,
    ) {
        if state.fill_started {
            debug!("Orchestration already started");
            return;
        }
        state.fill_started = true;

        if state.parallel_workers == 0 {
            warn!(waiting = state.waiting.len(), "No parallel workers, nothing will be launched");
            state.fire_completion();
            return;
        }

        for _ in 0..state.parallel_workers {
            if !Self::launch_next(myself, state).await {
                break;
            }
        }
    }

    /// Dequeue the next waiting item and launch a processor for it.
    ///
    /// Returns `false` when the pool was empty. A failed launch still
    /// returns `true`: its slot is consumed unless refilling is enabled.
    async fn launch_next(
        myself: &ActorRef<OrchestratorMessage<M>>,
        state: &mut OrchestratorState<W, M>,
    ) -> bool {
        loop {
            let Some(item) = state.waiting.pop_back() else {
                state.fire_completion_if_done();
                return false;
            };
            state.worker_count = state.worker_count.saturating_add(1);
            let worker_id = item.id().clone();

            let factory = Arc::clone(&state.factory);
            let logger = Arc::clone(&state.logger);
            match Self::launch(myself, &*factory, &*logger, &item, &worker_id).await {
                Ok(processor) => {
                    state.started.insert(worker_id, ProcessorEntry { item, processor });
                    return true;
                }
                Err(e) => {
                    state
                        .logger
                        .log(Some(&worker_id), &format!("failed starting worker for {item}: {e}"));
                    state.failed_to_start.insert(worker_id, item);

                    if state.refill_on_launch_failure {
                        continue;
                    }
                    state.fire_completion_if_done();
                    return true;
                }
            }
        }
    }

    async fn launch(
        myself: &ActorRef<OrchestratorMessage<M>>,
        factory: &dyn ProcessorFactory<W, M>,
        logger: &dyn Logger,
        item: &W,
        worker_id: &WorkerId,
    ) -> Result<Arc<dyn Processor>, ActorError> {
        let sink = BackChannel::from_actor(myself.clone());
        let processor: Arc<dyn Processor> = factory
            .create(item.clone(), worker_id.clone(), sink)
            .await
            .tap_err(|e| warn!(worker_id = %worker_id, error = %e, "Processor factory failed"))?
            .into();

        if processor.worker_id() != worker_id {
            let e = ActorError::processor_failed(
                worker_id.as_str(),
                format!("processor is bound to worker {}", processor.worker_id()),
            );
            warn!(worker_id = %worker_id, error = %e, "Factory returned a mismatched processor");
            processor.shutdown().await;
            return Err(e);
        }

        logger.log(Some(worker_id), &format!("starting #{worker_id} worker for {item}"));

        if let Err(e) = processor.process().await {
            warn!(worker_id = %worker_id, error = %e, "Initial process() failed");
            processor.shutdown().await;
            return Err(e);
        }
        Ok(processor)
    }

    async fn forward_control(
        processor: Option<Arc<dyn Processor>>,
        worker_id: &WorkerId,
        control: Control,
    ) -> Result<bool, ActorError> {
        let Some(processor) = processor else {
            debug!(worker_id = %worker_id, %control, "Control for inactive worker ignored");
            return Ok(false);
        };
        debug!(worker_id = %worker_id, %control, "Forwarding control");
        processor.handle(control).await?;
        Ok(true)
    }

    async fn handle_back_communication(
        myself: &ActorRef<OrchestratorMessage<M>>,
        state: &mut OrchestratorState<W, M>,
        worker_id: WorkerId,
        event: BackCommunication<M>,
    ) {
        match event {
            BackCommunication::Progress { percent, label } => {
                state
                    .logger
                    .log(Some(&worker_id), &format!("progress {percent} %: {label}"));
            }
            BackCommunication::Message(message) => {
                state.logger.log(Some(&worker_id), &message.to_string());
            }
            BackCommunication::Paused => state.logger.log(Some(&worker_id), "worker paused!"),
            BackCommunication::Resumed => state.logger.log(Some(&worker_id), "worker resumed..."),
            BackCommunication::Stopped => {
                state.logger.log(Some(&worker_id), "worker stopped!");
                match state.started.remove(&worker_id) {
                    Some(entry) => {
                        state.stopped.insert(worker_id, entry);
                        Self::launch_next(myself, state).await;
                    }
                    None => debug!(worker_id = %worker_id, "Stop from inactive worker ignored"),
                }
            }
            BackCommunication::Finished => {
                state.logger.log(Some(&worker_id), "finished");
                match state.started.remove(&worker_id) {
                    Some(entry) => {
                        state.finished.insert(worker_id, entry.item);
                        Self::launch_next(myself, state).await;
                    }
                    None => debug!(worker_id = %worker_id, "Finish from inactive worker ignored"),
                }
            }
        }
    }
}

/// Spawn an OrchestratorActor.
///
/// # Errors
///
/// Returns `SpawnFailed` if the actor could not be started.
pub async fn spawn_orchestrator<W, M>(
    args: OrchestratorArguments<W, M>,
) -> Result<(ActorRef<OrchestratorMessage<M>>, tokio::task::JoinHandle<()>), ActorError>
where
    W: WorkItem + Clone,
    M: fmt::Display + Send + 'static,
{
    Actor::spawn(None, OrchestratorActorDef::<W, M>::new(), args)
        .await
        .map_err(|e| ActorError::spawn_failed(format!("Failed to spawn orchestrator: {e}")))
}
