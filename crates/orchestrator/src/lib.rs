//! # Orchestrator
//!
//! Bounded-parallelism orchestration of pausable, stoppable processors.
//!
//! An [`Orchestration`] owns a pool of work items and keeps at most
//! `parallel_workers` processors active until the pool drains. Processors
//! report upward through a [`BackChannel`] and accept [`Control`] commands.
//!
//! ```ignore
//! use std::sync::Arc;
//! use orchestrator::{
//!     DocumentProcessorFactory, DocumentWorkItem, Orchestration, OrchestratorArguments,
//!     TracingLogger,
//! };
//!
//! let items = vec![DocumentWorkItem::new("/tmp/doc1.txt", 3.0, "1")];
//! let factory = DocumentProcessorFactory::new(1.0, Duration::from_secs(5));
//! let args = OrchestratorArguments::new(items, factory, Arc::new(TracingLogger))
//!     .with_parallel_workers(2)
//!     .on_all_done(|| println!("All done!"));
//! let orchestration = Orchestration::spawn(args).await?;
//! orchestration.start().await?;
//! ```
//!
//! [`Control`]: workpool_events::Control

#![forbid(unsafe_code)]
#![deny(clippy::unwrap_used)]
#![deny(clippy::panic)]
#![deny(clippy::expect_used)]

pub mod actors;
pub mod document;
pub mod logger;
pub mod orchestration;
pub mod processor;

pub use actors::{
    ActorError, OrchestratorArguments, OrchestratorMessage, PoolSnapshot, ProcessorHandle,
    ProcessorSnapshot, StepWork, spawn_step_processor,
};
pub use document::{DocumentMessage, DocumentProcessorFactory, DocumentWork, DocumentWorkItem};
pub use logger::{LogEntry, Logger, MemoryLogger, TracingLogger};
pub use orchestration::Orchestration;
pub use processor::{BackChannel, Processor, ProcessorFactory};
