//! CLI flag definitions using clap.

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]

use std::path::PathBuf;

use clap::Parser;
use workpool_core::Config;

/// Workpool - bounded-parallelism document processing demo
#[derive(Parser, Debug)]
#[command(name = "workpool")]
#[command(version)]
#[command(about = "Process documents with a bounded pool of pausable, stoppable workers")]
#[command(
    long_about = "Runs four simulated documents through an orchestrator that keeps at most N workers active, randomly stopping one now and then."
)]
pub struct Cli {
    /// TOML configuration file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Maximum number of workers active at the same time
    #[arg(short = 'p', long)]
    pub parallel_workers: Option<usize>,

    /// Seconds of simulated work per unit of document size
    #[arg(short, long)]
    pub time_scale: Option<f64>,

    /// Stop a random worker with probability 1/N on each tick (0 disables)
    #[arg(short, long)]
    pub stop_one_in: Option<u32>,
}

impl Cli {
    /// Apply flag overrides on top of file and environment configuration.
    pub fn apply(&self, config: &mut Config) {
        if let Some(parallel_workers) = self.parallel_workers {
            config.pool.parallel_workers = parallel_workers;
        }
        if let Some(time_scale) = self.time_scale {
            config.demo.time_scale = time_scale;
        }
        if let Some(stop_one_in) = self.stop_one_in {
            config.demo.stop_one_in = stop_one_in;
        }
    }
}
