//! Messages for the orchestrator and step-processor actors.
//!
//! Design principles:
//! - Back-communication and processor controls are fire-and-forget (`send_message`)
//! - Queries return responses (`call` with a timeout)
//! - Business errors are returned in RPC replies, NOT as actor crashes

use ractor::RpcReplyPort;
use workpool_events::{BackCommunication, Control, ProcessorStatus, WorkerId};

use super::errors::ActorError;

/// Point-in-time view of the orchestrator's bookkeeping.
///
/// Every supplied item appears in exactly one of the five lists.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PoolSnapshot {
    /// Not yet dequeued, in launch order (next to launch first).
    pub waiting: Vec<WorkerId>,
    /// Active processors occupying a slot, sorted.
    pub started: Vec<WorkerId>,
    /// Terminated by a stop, sorted.
    pub stopped: Vec<WorkerId>,
    /// Completed all steps, sorted.
    pub finished: Vec<WorkerId>,
    /// Processor creation or the initial `process()` failed, sorted.
    pub failed_to_start: Vec<WorkerId>,
    /// Items ever dequeued from the waiting pool.
    pub worker_count: u64,
    /// The concurrency bound.
    pub parallel_workers: usize,
    /// Whether all-done has been reached and reported.
    pub completion_fired: bool,
}

impl PoolSnapshot {
    /// True iff nothing is waiting and nothing is active.
    #[must_use]
    pub fn all_done(&self) -> bool {
        self.waiting.is_empty() && self.started.is_empty()
    }

    /// Number of items accounted for across all five collections.
    #[must_use]
    pub fn total(&self) -> usize {
        [
            self.waiting.len(),
            self.started.len(),
            self.stopped.len(),
            self.finished.len(),
            self.failed_to_start.len(),
        ]
        .iter()
        .sum()
    }
}

/// Point-in-time view of one step processor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessorSnapshot {
    /// The worker this processor serves.
    pub worker_id: WorkerId,
    /// Current lifecycle status.
    pub status: ProcessorStatus,
    /// Index of the last step begun, `None` before the first step.
    pub step_index: Option<usize>,
    /// Transition requested but not yet honoured.
    pub desired_status: Option<ProcessorStatus>,
}

impl ProcessorSnapshot {
    /// Snapshot of a processor that has not begun yet.
    #[must_use]
    pub const fn initial(worker_id: WorkerId) -> Self {
        Self {
            worker_id,
            status: ProcessorStatus::Initialized,
            step_index: None,
            desired_status: None,
        }
    }
}

/// Messages for the OrchestratorActor.
pub enum OrchestratorMessage<M> {
    // ═══════════════════════════════════════════════════════════════════════
    // COMMANDS
    // ═══════════════════════════════════════════════════════════════════════
    /// Fill up to `parallel_workers` slots. Replies with the active count.
    Start { reply: RpcReplyPort<usize> },

    /// Forward a control command to an active processor.
    ///
    /// Replies `Ok(false)` when the worker is not currently active.
    Control {
        worker_id: WorkerId,
        control: Control,
        reply: RpcReplyPort<Result<bool, ActorError>>,
    },

    // ═══════════════════════════════════════════════════════════════════════
    // EVENTS
    // ═══════════════════════════════════════════════════════════════════════
    /// Back-communication from a processor.
    BackCommunication {
        worker_id: WorkerId,
        event: BackCommunication<M>,
    },

    // ═══════════════════════════════════════════════════════════════════════
    // QUERIES
    // ═══════════════════════════════════════════════════════════════════════
    /// True iff nothing is waiting and nothing is active.
    AllDone { reply: RpcReplyPort<bool> },

    /// Current bookkeeping.
    GetSnapshot { reply: RpcReplyPort<PoolSnapshot> },
}

/// Messages for a StepProcessorActor.
pub enum ProcessorMessage<M> {
    /// Begin or resume stepping. Replies once the next step has been initiated.
    Process {
        reply: RpcReplyPort<Result<(), ActorError>>,
    },

    /// Pause/stop request, or start/resume without a reply.
    Control(Control),

    /// A step's work completed; this is the step boundary.
    StepCompleted {
        index: usize,
        outcome: Result<Option<M>, ActorError>,
    },
}
