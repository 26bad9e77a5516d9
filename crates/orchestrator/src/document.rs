//! Document processing: the reference work-item kind.
//!
//! A document's size is translated into processing time. Each of the four
//! steps sleeps for a quarter of that, slowed down by a random factor.

use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use rand::Rng;
use workpool_core::Config;
use workpool_events::{WorkItem, WorkerId};

use crate::actors::errors::ActorError;
use crate::actors::step_processor::{StepWork, spawn_step_processor};
use crate::processor::{BackChannel, Processor, ProcessorFactory};

const STEP_COUNT: u32 = 4;
const STEP_NAMES: [&str; STEP_COUNT as usize] = ["step1", "step2", "step3", "step4"];
const SLOW_STEP_FACTOR: f64 = 1.4;

/// A document to process, identified by its worker ID.
#[derive(Debug, Clone, PartialEq)]
pub struct DocumentWorkItem {
    path: PathBuf,
    size: f64,
    id: WorkerId,
}

impl DocumentWorkItem {
    pub fn new(path: impl Into<PathBuf>, size: f64, id: impl Into<WorkerId>) -> Self {
        Self {
            path: path.into(),
            size,
            id: id.into(),
        }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Size in abstract units; one unit is one second at time scale 1.0.
    #[must_use]
    pub const fn size(&self) -> f64 {
        self.size
    }
}

impl fmt::Display for DocumentWorkItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "work item: document {}", self.path.display())
    }
}

impl WorkItem for DocumentWorkItem {
    fn id(&self) -> &WorkerId {
        &self.id
    }
}

/// Informational message reported while processing a document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentMessage {
    text: String,
}

impl DocumentMessage {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }
}

impl fmt::Display for DocumentMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

/// Simulated work for one document.
pub struct DocumentWork {
    steps: Vec<String>,
    seconds_per_step: f64,
}

impl DocumentWork {
    #[must_use]
    pub fn new(item: &DocumentWorkItem, time_scale: f64) -> Self {
        let steps: Vec<String> = STEP_NAMES.iter().map(ToString::to_string).collect();
        let seconds_per_step = item.size() * time_scale / f64::from(STEP_COUNT);
        Self {
            steps,
            seconds_per_step,
        }
    }
}

#[async_trait]
impl StepWork for DocumentWork {
    type Message = DocumentMessage;

    fn steps(&self) -> &[String] {
        &self.steps
    }

    async fn run_step(
        &self,
        _index: usize,
        name: &str,
    ) -> Result<Option<DocumentMessage>, ActorError> {
        let slowdown: f64 = rand::thread_rng().gen_range(1.0..1.5);
        let delay = Duration::try_from_secs_f64(self.seconds_per_step * slowdown)
            .map_err(|e| ActorError::step_failed(name, e.to_string()))?;

        tokio::time::sleep(delay).await;

        Ok((slowdown >= SLOW_STEP_FACTOR)
            .then(|| DocumentMessage::new(format!("{name} ran slow ({slowdown:.2}x)"))))
    }
}

/// Creates one step-processor actor per document.
#[derive(Debug, Clone)]
pub struct DocumentProcessorFactory {
    time_scale: f64,
    rpc_timeout: Duration,
}

impl DocumentProcessorFactory {
    #[must_use]
    pub const fn new(time_scale: f64, rpc_timeout: Duration) -> Self {
        Self {
            time_scale,
            rpc_timeout,
        }
    }

    #[must_use]
    pub fn from_config(config: &Config) -> Self {
        Self::new(config.demo.time_scale, config.pool.rpc_timeout())
    }
}

#[async_trait]
impl ProcessorFactory<DocumentWorkItem, DocumentMessage> for DocumentProcessorFactory {
    async fn create(
        &self,
        item: DocumentWorkItem,
        worker_id: WorkerId,
        sink: BackChannel<DocumentMessage>,
    ) -> Result<Box<dyn Processor>, ActorError> {
        let work = DocumentWork::new(&item, self.time_scale);
        let handle = spawn_step_processor(worker_id, work, sink, self.rpc_timeout).await?;
        Ok(Box::new(handle))
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;

    #[test]
    fn document_displays_its_path() {
        let doc = DocumentWorkItem::new("/tmp/doc3.txt", 1.0, "3");
        assert_eq!(doc.to_string(), "work item: document /tmp/doc3.txt");
        assert_eq!(doc.id(), &WorkerId::from("3"));
    }

    #[test]
    fn work_has_four_named_steps() {
        let work = DocumentWork::new(&DocumentWorkItem::new("a", 2.0, "a"), 1.0);
        assert_eq!(work.steps(), ["step1", "step2", "step3", "step4"]);
        assert!((work.seconds_per_step - 0.5).abs() < f64::EPSILON);
    }

    #[tokio::test]
    async fn zero_sized_document_steps_complete_immediately() {
        let work = DocumentWork::new(&DocumentWorkItem::new("a", 0.0, "a"), 1.0);
        let outcome = tokio::time::timeout(Duration::from_secs(1), work.run_step(0, "step1"))
            .await
            .unwrap();
        assert!(outcome.is_ok());
    }

    #[tokio::test]
    async fn negative_size_fails_the_step() {
        let work = DocumentWork::new(&DocumentWorkItem::new("a", -1.0, "a"), 1.0);
        let outcome = work.run_step(0, "step1").await;
        assert!(matches!(outcome, Err(ActorError::StepFailed { .. })));
    }
}
