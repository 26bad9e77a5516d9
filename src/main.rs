//! # Workpool - document processing demo
//!
//! Runs four simulated documents through a bounded-parallelism orchestrator.
//!
//! ## Sequence
//!
//! 1. **Configuration** - defaults, then TOML file, then `WORKPOOL_*` env, then flags
//! 2. **Tracing** - `RUST_LOG` if set, otherwise the configured filter
//! 3. **Orchestration** - spawn, fill the worker slots
//! 4. **Tick loop** - poll for completion, occasionally stopping a random worker
//! 5. **Summary** - report where every document ended up, then shut down

#![forbid(unsafe_code)]
#![deny(clippy::unwrap_used)]
#![deny(clippy::panic)]
#![deny(clippy::expect_used)]

mod cli;

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

use anyhow::{Context, Result};
use clap::Parser;
use rand::Rng;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use orchestrator::{
    DocumentProcessorFactory, DocumentWorkItem, Orchestration, OrchestratorArguments,
    TracingLogger,
};
use workpool_core::Config;
use workpool_events::{Control, WorkerId};

use crate::cli::Cli;

#[tokio::main]
async fn main() -> Result<()> {
    let start_time = Instant::now();
    let cli = Cli::parse();
    let config = load_config(&cli)?;

    init_tracing(&config.pool.log_filter);

    run_demo(&config).await?;

    let elapsed_ms = u64::try_from(start_time.elapsed().as_millis()).unwrap_or(u64::MAX);
    info!(elapsed_ms, "Workpool demo finished");
    Ok(())
}

fn init_tracing(default_filter: &str) {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)))
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Defaults, then file, then environment, then flags.
fn load_config(cli: &Cli) -> Result<Config> {
    let config = match &cli.config {
        Some(path) => Config::load(path)
            .with_context(|| format!("Failed to load configuration from {}", path.display()))?,
        None => Config::default(),
    };
    let mut config = config
        .with_process_env()
        .context("Invalid WORKPOOL_* environment override")?;
    cli.apply(&mut config);
    config.validate().context("Invalid configuration")?;
    Ok(config)
}

/// The four documents of the demo. Sizes are in seconds at time scale 1.0.
fn demo_documents() -> Vec<DocumentWorkItem> {
    vec![
        DocumentWorkItem::new("/a", 2.0, "4"),
        DocumentWorkItem::new("/b", 4.0, "3"),
        DocumentWorkItem::new("/c", 1.0, "2"),
        DocumentWorkItem::new("/d", 3.0, "1"),
    ]
}

async fn run_demo(config: &Config) -> Result<()> {
    let documents = demo_documents();
    let document_count = documents.len();

    let finished = Arc::new(AtomicBool::new(false));
    let done_flag = Arc::clone(&finished);

    let args = OrchestratorArguments::new(
        documents,
        DocumentProcessorFactory::from_config(config),
        Arc::new(TracingLogger),
    )
    .with_pool_config(&config.pool)
    .on_all_done(move || done_flag.store(true, Ordering::SeqCst));

    let orchestration = Orchestration::spawn(args)
        .await
        .context("Failed to spawn orchestrator")?;
    orchestration
        .start()
        .await
        .context("Failed to start orchestration")?;

    while !finished.load(Ordering::SeqCst) {
        tokio::time::sleep(config.demo.tick()).await;

        if let Some(worker_id) = pick_worker_to_stop(config.demo.stop_one_in, document_count) {
            match orchestration.control(&worker_id, Control::Stop).await {
                Ok(true) => info!(worker_id = %worker_id, "Requested stop"),
                Ok(false) => {}
                Err(e) => warn!(worker_id = %worker_id, error = %e, "Stop request failed"),
            }
        }
    }

    let snapshot = orchestration
        .snapshot()
        .await
        .context("Failed to query final state")?;
    info!(
        finished = ?snapshot.finished,
        stopped = ?snapshot.stopped,
        failed_to_start = ?snapshot.failed_to_start,
        worker_count = snapshot.worker_count,
        "Summary"
    );

    orchestration
        .shutdown()
        .await
        .context("Failed to shut down orchestration")?;
    Ok(())
}

/// With probability `1/one_in`, a uniformly chosen document ID.
fn pick_worker_to_stop(one_in: u32, document_count: usize) -> Option<WorkerId> {
    if one_in == 0 || document_count == 0 {
        return None;
    }
    let mut rng = rand::thread_rng();
    (rng.gen_range(1..=one_in) == 1)
        .then(|| WorkerId::from(rng.gen_range(1..=document_count).to_string()))
}
