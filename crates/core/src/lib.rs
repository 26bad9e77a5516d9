//! Core types, errors, and configuration for workpool.
//!
//! All errors are explicit, typed, and recoverable - no panics allowed.

#![forbid(unsafe_code)]
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]

pub mod config;
pub mod error;

pub use config::{Config, DemoConfig, PoolConfig};
pub use error::{Error, Result};
