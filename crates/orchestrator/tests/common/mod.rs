//! Shared fixtures for orchestration integration tests.

#![allow(dead_code)]
#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use orchestrator::{
    ActorError, BackChannel, MemoryLogger, Orchestration, OrchestratorArguments, Processor,
    ProcessorFactory, StepWork, spawn_step_processor,
};
use tokio::sync::oneshot;
use workpool_events::{WorkItem, WorkerId};

pub const TEST_TIMEOUT: Duration = Duration::from_secs(10);
pub const RPC_TIMEOUT: Duration = Duration::from_secs(2);

/// A work item that only carries its ID.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestItem {
    id: WorkerId,
}

impl TestItem {
    pub fn new(id: &str) -> Self {
        Self {
            id: WorkerId::from(id),
        }
    }
}

impl fmt::Display for TestItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "test item {}", self.id)
    }
}

impl WorkItem for TestItem {
    fn id(&self) -> &WorkerId {
        &self.id
    }
}

pub fn items(ids: &[&str]) -> Vec<TestItem> {
    ids.iter().map(|id| TestItem::new(id)).collect()
}

pub fn ids(ids: &[&str]) -> Vec<WorkerId> {
    ids.iter().map(|id| WorkerId::from(*id)).collect()
}

/// Fixed number of steps, each a fixed sleep.
pub struct FixedSteps {
    steps: Vec<String>,
    delay: Duration,
}

#[async_trait]
impl StepWork for FixedSteps {
    type Message = String;

    fn steps(&self) -> &[String] {
        &self.steps
    }

    async fn run_step(&self, _index: usize, _name: &str) -> Result<Option<String>, ActorError> {
        tokio::time::sleep(self.delay).await;
        Ok(None)
    }
}

/// Factory for [`FixedSteps`] processors that refuses a configured set of IDs.
pub struct TestFactory {
    step_count: usize,
    delay: Duration,
    refuse: HashSet<WorkerId>,
    misbind: HashSet<WorkerId>,
}

impl TestFactory {
    pub fn new(step_count: usize, delay: Duration) -> Self {
        Self {
            step_count,
            delay,
            refuse: HashSet::new(),
            misbind: HashSet::new(),
        }
    }

    pub fn refusing(mut self, id: &str) -> Self {
        self.refuse.insert(WorkerId::from(id));
        self
    }

    /// Bind the processor for `id` to some other worker ID.
    pub fn misbinding(mut self, id: &str) -> Self {
        self.misbind.insert(WorkerId::from(id));
        self
    }
}

#[async_trait]
impl ProcessorFactory<TestItem, String> for TestFactory {
    async fn create(
        &self,
        item: TestItem,
        worker_id: WorkerId,
        sink: BackChannel<String>,
    ) -> Result<Box<dyn Processor>, ActorError> {
        if self.refuse.contains(item.id()) {
            return Err(ActorError::processor_failed(worker_id.as_str(), "refused"));
        }
        let work = FixedSteps {
            steps: (1..=self.step_count).map(|i| format!("step{i}")).collect(),
            delay: self.delay,
        };
        let bound_to = if self.misbind.contains(item.id()) {
            WorkerId::new(format!("{worker_id}-elsewhere"))
        } else {
            worker_id
        };
        let handle = spawn_step_processor(bound_to, work, sink, RPC_TIMEOUT).await?;
        Ok(Box::new(handle))
    }
}

/// A spawned orchestration plus everything needed to observe it.
pub struct Harness {
    pub orchestration: Orchestration<TestItem, String>,
    pub logger: Arc<MemoryLogger>,
    pub completions: Arc<AtomicUsize>,
    done: Option<oneshot::Receiver<()>>,
}

impl Harness {
    pub async fn spawn(
        items: Vec<TestItem>,
        parallel_workers: usize,
        factory: TestFactory,
    ) -> Self {
        Self::spawn_with(items, parallel_workers, factory, false).await
    }

    pub async fn spawn_with(
        items: Vec<TestItem>,
        parallel_workers: usize,
        factory: TestFactory,
        refill_on_launch_failure: bool,
    ) -> Self {
        let logger = Arc::new(MemoryLogger::new());
        let completions = Arc::new(AtomicUsize::new(0));
        let (tx, rx) = oneshot::channel();

        let counter = Arc::clone(&completions);
        let mut args = OrchestratorArguments::new(items, factory, logger.clone())
            .with_parallel_workers(parallel_workers)
            .on_all_done(move || {
                counter.fetch_add(1, Ordering::SeqCst);
                let _ = tx.send(());
            });
        args.refill_on_launch_failure = refill_on_launch_failure;
        args.rpc_timeout = RPC_TIMEOUT;

        let orchestration = Orchestration::spawn(args).await.unwrap();
        Self {
            orchestration,
            logger,
            completions,
            done: Some(rx),
        }
    }

    /// Wait for the completion callback.
    pub async fn wait_done(&mut self) {
        let rx = self.done.take().expect("completion already awaited");
        tokio::time::timeout(TEST_TIMEOUT, rx)
            .await
            .expect("orchestration did not complete in time")
            .expect("completion callback dropped");
    }

    /// Wait until a log line for `id` equals `message`.
    pub async fn wait_for_log(&self, id: &str, message: &str) {
        let id = WorkerId::from(id);
        tokio::time::timeout(TEST_TIMEOUT, async {
            while !self.logger.messages_for(&id).iter().any(|m| m == message) {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .expect("log line did not appear in time");
    }

    pub fn completions(&self) -> usize {
        self.completions.load(Ordering::SeqCst)
    }

    /// Highest number of workers active at once, replayed from the log.
    pub fn max_active(&self) -> usize {
        let mut active: HashSet<WorkerId> = HashSet::new();
        let mut max = 0_usize;
        for entry in self.logger.entries() {
            let Some(id) = entry.worker_id.clone() else {
                continue;
            };
            if entry.message.starts_with("starting #") {
                active.insert(id);
                max = max.max(active.len());
            } else if entry.message == "finished"
                || entry.message == "worker stopped!"
                || entry.message.starts_with("failed starting worker")
            {
                active.remove(&id);
            }
        }
        max
    }

    /// Progress percentages logged for `id`, in order.
    pub fn progress_of(&self, id: &str) -> Vec<(f64, String)> {
        self.logger
            .messages_for(&WorkerId::from(id))
            .iter()
            .filter_map(|m| m.strip_prefix("progress "))
            .filter_map(|rest| rest.split_once(" %: "))
            .map(|(percent, label)| (percent.parse::<f64>().unwrap(), label.to_string()))
            .collect()
    }
}
