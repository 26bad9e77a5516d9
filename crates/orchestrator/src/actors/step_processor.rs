//! StepProcessorActor - a processor that runs a fixed sequence of named steps.
//!
//! Each step's work runs in its own tokio task, which posts
//! `StepCompleted` back into the actor's mailbox. Handling that message is
//! the step boundary: pending pause or stop requests are honoured there and
//! nowhere else, so a step that has begun always runs to completion.

use std::marker::PhantomData;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use ractor::rpc::CallResult;
use ractor::{Actor, ActorProcessingErr, ActorRef};
use tokio::sync::watch;
use tracing::{debug, warn};
use workpool_events::{BackCommunication, Control, ProcessorStatus, WorkerId};

use super::errors::ActorError;
use super::messages::{ProcessorMessage, ProcessorSnapshot};
use crate::processor::{BackChannel, Processor};

/// The work behind a step processor.
#[async_trait]
pub trait StepWork: Send + Sync + 'static {
    /// Domain message a step may report.
    type Message: Send + 'static;

    /// Ordered step names. Must not change while the processor runs.
    fn steps(&self) -> &[String];

    /// Perform step `index`. A returned message is emitted after the step.
    ///
    /// # Errors
    ///
    /// A failed step terminates the processor as stopped.
    async fn run_step(&self, index: usize, name: &str)
    -> Result<Option<Self::Message>, ActorError>;
}

/// Arguments for spawning a StepProcessorActor.
pub struct StepProcessorArguments<S: StepWork> {
    pub worker_id: WorkerId,
    pub work: Arc<S>,
    pub sink: BackChannel<S::Message>,
    pub status_tx: watch::Sender<ProcessorSnapshot>,
}

/// State owned exclusively by one StepProcessorActor.
pub struct StepProcessorState<S: StepWork> {
    worker_id: WorkerId,
    work: Arc<S>,
    sink: BackChannel<S::Message>,
    step_index: Option<usize>,
    status: ProcessorStatus,
    desired_status: Option<ProcessorStatus>,
    status_tx: watch::Sender<ProcessorSnapshot>,
}

impl<S: StepWork> StepProcessorState<S> {
    fn new(args: StepProcessorArguments<S>) -> Self {
        Self {
            worker_id: args.worker_id,
            work: args.work,
            sink: args.sink,
            step_index: None,
            status: ProcessorStatus::Initialized,
            desired_status: None,
            status_tx: args.status_tx,
        }
    }

    fn snapshot(&self) -> ProcessorSnapshot {
        ProcessorSnapshot {
            worker_id: self.worker_id.clone(),
            status: self.status,
            step_index: self.step_index,
            desired_status: self.desired_status,
        }
    }

    fn publish(&self) {
        self.status_tx.send_replace(self.snapshot());
    }

    fn emit(&self, event: BackCommunication<S::Message>) -> Result<(), ActorError> {
        self.sink.send(&self.worker_id, event)
    }
}

/// The StepProcessorActor definition.
pub struct StepProcessorActorDef<S>(PhantomData<fn() -> S>);

impl<S> StepProcessorActorDef<S> {
    #[must_use]
    pub const fn new() -> Self {
        Self(PhantomData)
    }
}

impl<S> Default for StepProcessorActorDef<S> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: StepWork> Actor for StepProcessorActorDef<S> {
    type Msg = ProcessorMessage<S::Message>;
    type State = StepProcessorState<S>;
    type Arguments = StepProcessorArguments<S>;

    async fn pre_start(
        &self,
        _myself: ActorRef<Self::Msg>,
        args: Self::Arguments,
    ) -> Result<Self::State, ActorProcessingErr> {
        debug!(
            worker_id = %args.worker_id,
            steps = args.work.steps().len(),
            "StepProcessorActor starting"
        );
        let state = StepProcessorState::new(args);
        state.publish();
        Ok(state)
    }

    async fn handle(
        &self,
        myself: ActorRef<Self::Msg>,
        message: Self::Msg,
        state: &mut Self::State,
    ) -> Result<(), ActorProcessingErr> {
        match message {
            ProcessorMessage::Process { reply } => {
                let result = Self::handle_process(&myself, state);
                if reply.send(result).is_err() {
                    debug!(worker_id = %state.worker_id, "Process caller went away");
                }
            }

            ProcessorMessage::Control(control) => {
                Self::handle_control(&myself, state, control);
            }

            ProcessorMessage::StepCompleted { index, outcome } => {
                Self::handle_step_completed(&myself, state, index, outcome);
            }
        }
        Ok(())
    }

    async fn post_stop(
        &self,
        _myself: ActorRef<Self::Msg>,
        state: &mut Self::State,
    ) -> Result<(), ActorProcessingErr> {
        debug!(worker_id = %state.worker_id, status = %state.status, "StepProcessorActor stopped");
        Ok(())
    }
}

impl<S: StepWork> StepProcessorActorDef<S> {
    fn handle_process(
        myself: &ActorRef<ProcessorMessage<S::Message>>,
        state: &mut StepProcessorState<S>,
    ) -> Result<(), ActorError> {
        match state.status {
            ProcessorStatus::Stopped | ProcessorStatus::Finished => Ok(()),
            ProcessorStatus::Running => {
                if state.desired_status == Some(ProcessorStatus::Paused) {
                    state.desired_status = None;
                    state.publish();
                }
                Ok(())
            }
            ProcessorStatus::Paused => {
                state.emit(BackCommunication::Resumed)?;
                Self::advance(myself, state)
            }
            ProcessorStatus::Initialized => Self::advance(myself, state),
        }
    }

    fn handle_control(
        myself: &ActorRef<ProcessorMessage<S::Message>>,
        state: &mut StepProcessorState<S>,
        control: Control,
    ) {
        match (control, state.status) {
            (Control::Start | Control::Resume, _) => {
                if let Err(e) = Self::handle_process(myself, state) {
                    warn!(worker_id = %state.worker_id, error = %e, "Failed to resume processor");
                    Self::abandon(myself, state);
                }
            }

            (Control::Pause, ProcessorStatus::Initialized | ProcessorStatus::Running) => {
                if state.desired_status != Some(ProcessorStatus::Stopped) {
                    state.desired_status = Some(ProcessorStatus::Paused);
                    state.publish();
                }
            }

            (Control::Stop, ProcessorStatus::Initialized | ProcessorStatus::Running) => {
                state.desired_status = Some(ProcessorStatus::Stopped);
                state.publish();
            }

            // Already at a step boundary
            (Control::Stop, ProcessorStatus::Paused) => {
                state.desired_status = None;
                state.status = ProcessorStatus::Stopped;
                state.publish();
                if let Err(e) = state.emit(BackCommunication::Stopped) {
                    warn!(worker_id = %state.worker_id, error = %e, "Failed to report stop");
                }
                myself.stop(None);
            }

            (control, status) => {
                debug!(worker_id = %state.worker_id, %control, %status, "Ignoring control");
            }
        }
    }

    fn handle_step_completed(
        myself: &ActorRef<ProcessorMessage<S::Message>>,
        state: &mut StepProcessorState<S>,
        index: usize,
        outcome: Result<Option<S::Message>, ActorError>,
    ) {
        if state.status != ProcessorStatus::Running || state.step_index != Some(index) {
            debug!(worker_id = %state.worker_id, index, "Ignoring stale step completion");
            return;
        }

        match outcome {
            Ok(None) => {}
            Ok(Some(message)) => {
                if let Err(e) = state.emit(BackCommunication::Message(message)) {
                    warn!(worker_id = %state.worker_id, error = %e, "Failed to report message");
                    Self::abandon(myself, state);
                    return;
                }
            }
            Err(e) => {
                warn!(worker_id = %state.worker_id, index, error = %e, "Step failed, stopping processor");
                state.desired_status = None;
                state.status = ProcessorStatus::Stopped;
                state.publish();
                if let Err(e) = state.emit(BackCommunication::Stopped) {
                    warn!(worker_id = %state.worker_id, error = %e, "Failed to report stop");
                }
                myself.stop(None);
                return;
            }
        }

        if let Err(e) = Self::advance(myself, state) {
            warn!(worker_id = %state.worker_id, error = %e, "Failed to advance processor");
            Self::abandon(myself, state);
        }
    }

    /// Step boundary: honour a pending transition, start the next step, or finish.
    fn advance(
        myself: &ActorRef<ProcessorMessage<S::Message>>,
        state: &mut StepProcessorState<S>,
    ) -> Result<(), ActorError> {
        let total = state.work.steps().len();
        let next = state.step_index.map_or(0, |i| i.saturating_add(1));

        let Some(name) = state.work.steps().get(next).cloned() else {
            state.desired_status = None;
            state.emit(BackCommunication::progress(100.0, "finished"))?;
            state.emit(BackCommunication::Finished)?;
            state.status = ProcessorStatus::Finished;
            state.publish();
            myself.stop(None);
            return Ok(());
        };

        match state.desired_status.take() {
            Some(ProcessorStatus::Paused) => {
                state.status = ProcessorStatus::Paused;
                state.publish();
                return state.emit(BackCommunication::Paused);
            }
            Some(ProcessorStatus::Stopped) => {
                state.status = ProcessorStatus::Stopped;
                state.publish();
                let reported = state.emit(BackCommunication::Stopped);
                myself.stop(None);
                return reported;
            }
            _ => {}
        }

        state.status = ProcessorStatus::Running;
        state.step_index = Some(next);
        state.publish();
        state.emit(BackCommunication::progress(percent(next, total), name.clone()))?;

        let work = Arc::clone(&state.work);
        let actor = myself.clone();
        let worker_id = state.worker_id.clone();
        tokio::spawn(async move {
            let outcome = work.run_step(next, &name).await;
            let completed = ProcessorMessage::StepCompleted {
                index: next,
                outcome,
            };
            if actor.send_message(completed).is_err() {
                debug!(worker_id = %worker_id, step = %name, "Processor gone before step completed");
            }
        });
        Ok(())
    }

    /// The back channel is unusable; stop without further events.
    fn abandon(myself: &ActorRef<ProcessorMessage<S::Message>>, state: &mut StepProcessorState<S>) {
        state.desired_status = None;
        state.status = ProcessorStatus::Stopped;
        state.publish();
        myself.stop(None);
    }
}

#[allow(clippy::cast_precision_loss)]
fn percent(index: usize, total: usize) -> f64 {
    if total == 0 {
        return 100.0;
    }
    100.0 * index as f64 / total as f64
}

// ═══════════════════════════════════════════════════════════════════════════
// HANDLE
// ═══════════════════════════════════════════════════════════════════════════

/// [`Processor`] implementation that drives a StepProcessorActor.
pub struct ProcessorHandle<M> {
    worker_id: WorkerId,
    actor: ActorRef<ProcessorMessage<M>>,
    status: watch::Receiver<ProcessorSnapshot>,
    rpc_timeout: Duration,
}

impl<M: Send + 'static> ProcessorHandle<M> {
    /// Latest published state of the processor.
    #[must_use]
    pub fn snapshot(&self) -> ProcessorSnapshot {
        self.status.borrow().clone()
    }

    /// Whether the processor has stopped or finished.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        self.status.borrow().status.is_terminal()
    }

    /// The underlying actor.
    #[must_use]
    pub const fn actor(&self) -> &ActorRef<ProcessorMessage<M>> {
        &self.actor
    }

    /// Wait until the published state satisfies `predicate`.
    ///
    /// # Errors
    ///
    /// Returns `ActorUnavailable` if the actor went away before the
    /// predicate held.
    pub async fn wait_for(
        &self,
        predicate: impl Fn(&ProcessorSnapshot) -> bool,
    ) -> Result<ProcessorSnapshot, ActorError> {
        let mut rx = self.status.clone();
        rx.wait_for(|snapshot| predicate(snapshot))
            .await
            .map(|snapshot| snapshot.clone())
            .map_err(|_| ActorError::actor_unavailable())
    }
}

#[async_trait]
impl<M: Send + 'static> Processor for ProcessorHandle<M> {
    fn worker_id(&self) -> &WorkerId {
        &self.worker_id
    }

    async fn process(&self) -> Result<(), ActorError> {
        if self.is_terminal() {
            return Ok(());
        }

        match self
            .actor
            .call(
                |reply| ProcessorMessage::Process { reply },
                Some(self.rpc_timeout),
            )
            .await
        {
            Ok(CallResult::Success(result)) => result,
            Ok(CallResult::Timeout) => Err(ActorError::rpc_timeout(self.rpc_timeout)),
            Ok(CallResult::SenderError) => Err(ActorError::actor_unavailable()),
            // Finished processors stop themselves
            Err(_) if self.is_terminal() => Ok(()),
            Err(e) => Err(ActorError::channel_error(e.to_string())),
        }
    }

    async fn handle(&self, control: Control) -> Result<(), ActorError> {
        if control.is_activation() {
            return self.process().await;
        }
        if self.is_terminal() {
            return Ok(());
        }
        match self.actor.send_message(ProcessorMessage::Control(control)) {
            Ok(()) => Ok(()),
            Err(_) if self.is_terminal() => Ok(()),
            Err(e) => Err(ActorError::channel_error(e.to_string())),
        }
    }

    async fn shutdown(&self) {
        self.actor.stop(Some("shutdown".to_string()));
    }
}

/// Spawn a StepProcessorActor for `work` and return a handle to it.
///
/// # Errors
///
/// Returns `SpawnFailed` if the actor could not be started.
pub async fn spawn_step_processor<S: StepWork>(
    worker_id: WorkerId,
    work: S,
    sink: BackChannel<S::Message>,
    rpc_timeout: Duration,
) -> Result<ProcessorHandle<S::Message>, ActorError> {
    let (status_tx, status_rx) = watch::channel(ProcessorSnapshot::initial(worker_id.clone()));
    let args = StepProcessorArguments {
        worker_id: worker_id.clone(),
        work: Arc::new(work),
        sink,
        status_tx,
    };
    let (actor, _handle) = Actor::spawn(None, StepProcessorActorDef::<S>::new(), args)
        .await
        .map_err(|e| {
            ActorError::spawn_failed(format!("Failed to spawn processor '{worker_id}': {e}"))
        })?;

    Ok(ProcessorHandle {
        worker_id,
        actor,
        status: status_rx,
        rpc_timeout,
    })
}
