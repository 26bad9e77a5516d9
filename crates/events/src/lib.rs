//! Shared vocabulary between the orchestrator and its processors.
//!
//! - **Identities**: [`WorkerId`] and the [`WorkItem`] trait
//! - **Commands**: [`Control`] sent from the orchestrator to a processor
//! - **Events**: [`BackCommunication`] sent from a processor to its orchestrator
//! - **Lifecycle**: [`ProcessorStatus`]

#![forbid(unsafe_code)]
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]

pub mod control;
pub mod event;
pub mod types;

pub use control::Control;
pub use event::BackCommunication;
pub use types::{ProcessorStatus, WorkItem, WorkerId};
