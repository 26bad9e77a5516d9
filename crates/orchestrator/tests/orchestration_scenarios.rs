//! BDD integration tests for the orchestrator's fill, refill and completion.
//!
//! Scenarios:
//! - GIVEN four items and two workers WHEN started THEN LIFO launch and all finish
//! - GIVEN more items than workers WHEN run THEN never more than P active
//! - GIVEN no workers or no items WHEN started THEN completion fires immediately
//! - GIVEN no callback WHEN the pool drains THEN all-done is still logged
//! - GIVEN a running pool WHEN started twice THEN nothing extra launches

// Integration tests allow unwrap/panic for assertions
#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]

mod common;

use std::error::Error;
use std::sync::Arc;
use std::time::Duration;

use common::{Harness, TestFactory, TestItem, ids, items};
use orchestrator::{MemoryLogger, Orchestration, OrchestratorArguments};

/// BDD Test: Four items, two workers, LIFO pool order
///
/// **Given** items d1..d4 pushed in that order and two parallel workers
/// **When** the orchestration is started
/// **Then** d4 and d3 launch first, every item finishes, and completion fires once
#[tokio::test]
async fn given_four_items_and_two_workers_when_started_then_lifo_order_and_all_finish()
-> Result<(), Box<dyn Error>> {
    // Given
    let factory = TestFactory::new(2, Duration::from_millis(100));
    let mut harness = Harness::spawn(items(&["d1", "d2", "d3", "d4"]), 2, factory).await;

    // When
    let active = harness.orchestration.start().await?;

    // Then: the two most recently pushed items occupy the slots
    assert_eq!(active, 2);
    let snapshot = harness.orchestration.snapshot().await?;
    assert_eq!(snapshot.started, ids(&["d3", "d4"]));
    assert_eq!(snapshot.waiting, ids(&["d2", "d1"]));
    assert_eq!(snapshot.worker_count, 2);

    harness.wait_done().await;

    let snapshot = harness.orchestration.snapshot().await?;
    assert_eq!(snapshot.finished, ids(&["d1", "d2", "d3", "d4"]));
    assert!(snapshot.waiting.is_empty());
    assert!(snapshot.started.is_empty());
    assert!(snapshot.stopped.is_empty());
    assert!(snapshot.failed_to_start.is_empty());
    assert_eq!(snapshot.worker_count, 4);
    assert!(snapshot.completion_fired);
    assert!(harness.orchestration.all_done().await?);

    assert_eq!(harness.completions(), 1);
    assert_eq!(harness.logger.count("All done!"), 1);

    let launch_order: Vec<String> = harness
        .logger
        .entries()
        .iter()
        .filter(|entry| entry.message.starts_with("starting #"))
        .filter_map(|entry| entry.worker_id.as_ref().map(ToString::to_string))
        .collect();
    assert_eq!(launch_order.first().map(String::as_str), Some("d4"));
    assert_eq!(launch_order.get(1).map(String::as_str), Some("d3"));
    assert_eq!(launch_order.len(), 4);

    // "All done!" is the last thing logged
    let last = harness.logger.entries().back().cloned().unwrap();
    assert_eq!(last.message, "All done!");
    assert!(last.worker_id.is_none());

    harness.orchestration.shutdown().await?;
    Ok(())
}

/// BDD Test: Concurrency bound holds across refills
///
/// **Given** seven items and three parallel workers
/// **When** the pool drains
/// **Then** at most three workers were ever active, and exactly three at peak
#[tokio::test]
async fn given_more_items_than_workers_when_run_then_active_never_exceeds_bound()
-> Result<(), Box<dyn Error>> {
    // Given
    let factory = TestFactory::new(3, Duration::from_millis(10));
    let mut harness =
        Harness::spawn(items(&["a", "b", "c", "d", "e", "f", "g"]), 3, factory).await;

    // When
    harness.orchestration.start().await?;
    harness.wait_done().await;

    // Then
    assert_eq!(harness.max_active(), 3);
    let snapshot = harness.orchestration.snapshot().await?;
    assert_eq!(snapshot.finished.len(), 7);
    assert_eq!(snapshot.total(), 7);
    assert_eq!(snapshot.worker_count, 7);
    assert_eq!(harness.completions(), 1);

    harness.orchestration.shutdown().await?;
    Ok(())
}

/// BDD Test: Progress is ordered per worker
///
/// **Given** items with four steps each
/// **When** they all finish
/// **Then** each worker's progress is non-decreasing and ends at 100 "finished"
#[tokio::test]
async fn given_four_step_items_when_finished_then_progress_is_monotonic_and_ends_at_100()
-> Result<(), Box<dyn Error>> {
    // Given
    let factory = TestFactory::new(4, Duration::from_millis(5));
    let mut harness = Harness::spawn(items(&["x", "y", "z"]), 2, factory).await;

    // When
    harness.orchestration.start().await?;
    harness.wait_done().await;

    // Then
    for id in ["x", "y", "z"] {
        let progress = harness.progress_of(id);
        let percents: Vec<f64> = progress.iter().map(|(p, _)| *p).collect();
        assert_eq!(percents, vec![0.0, 25.0, 50.0, 75.0, 100.0], "worker {id}");
        assert!(percents.windows(2).all(|w| w[0] <= w[1]));

        let labels: Vec<&str> = progress.iter().map(|(_, l)| l.as_str()).collect();
        assert_eq!(labels, vec!["step1", "step2", "step3", "step4", "finished"]);

        let messages = harness.logger.messages_for(&id.into());
        assert_eq!(messages.last().map(String::as_str), Some("finished"));
    }

    harness.orchestration.shutdown().await?;
    Ok(())
}

/// BDD Test: Zero parallel workers is degenerate
///
/// **Given** two items and zero parallel workers
/// **When** the orchestration is started
/// **Then** completion fires immediately and the items stay waiting
#[tokio::test]
async fn given_zero_workers_when_started_then_completion_fires_immediately()
-> Result<(), Box<dyn Error>> {
    // Given
    let factory = TestFactory::new(1, Duration::from_millis(1));
    let mut harness = Harness::spawn(items(&["a", "b"]), 0, factory).await;

    // When
    let active = harness.orchestration.start().await?;

    // Then
    assert_eq!(active, 0);
    harness.wait_done().await;
    assert_eq!(harness.completions(), 1);

    let snapshot = harness.orchestration.snapshot().await?;
    assert_eq!(snapshot.waiting, ids(&["b", "a"]));
    assert_eq!(snapshot.worker_count, 0);
    assert!(!harness.orchestration.all_done().await?);

    harness.orchestration.shutdown().await?;
    Ok(())
}

/// BDD Test: No items at all
///
/// **Given** an empty item set
/// **When** the orchestration is started
/// **Then** completion fires immediately, exactly once
#[tokio::test]
async fn given_no_items_when_started_then_completion_fires_once() -> Result<(), Box<dyn Error>> {
    // Given
    let factory = TestFactory::new(1, Duration::from_millis(1));
    let mut harness = Harness::spawn(Vec::new(), 2, factory).await;

    // When
    harness.orchestration.start().await?;
    harness.orchestration.start().await?;

    // Then
    harness.wait_done().await;
    assert_eq!(harness.completions(), 1);
    assert_eq!(harness.logger.count("All done!"), 1);
    assert!(harness.orchestration.all_done().await?);

    harness.orchestration.shutdown().await?;
    Ok(())
}

/// BDD Test: All-done is logged even without a callback
///
/// **Given** an empty item set and no completion callback
/// **When** the orchestration is started
/// **Then** completion is reported as fired only after start, and "All done!" is logged once
#[tokio::test]
async fn given_no_callback_when_pool_drains_then_all_done_still_logged()
-> Result<(), Box<dyn Error>> {
    // Given
    let logger = Arc::new(MemoryLogger::new());
    let args = OrchestratorArguments::new(
        Vec::<TestItem>::new(),
        TestFactory::new(1, Duration::from_millis(1)),
        logger.clone(),
    );
    let orchestration = Orchestration::spawn(args).await?;
    assert!(!orchestration.snapshot().await?.completion_fired);

    // When
    orchestration.start().await?;
    orchestration.start().await?;

    // Then
    assert!(orchestration.all_done().await?);
    assert!(orchestration.snapshot().await?.completion_fired);
    assert_eq!(logger.count("All done!"), 1);

    orchestration.shutdown().await?;
    Ok(())
}

/// BDD Test: Start is idempotent
///
/// **Given** a started orchestration with long-running items
/// **When** start is called again
/// **Then** no further items are dequeued
#[tokio::test]
async fn given_started_pool_when_started_again_then_nothing_extra_launches()
-> Result<(), Box<dyn Error>> {
    // Given
    let factory = TestFactory::new(2, Duration::from_millis(150));
    let mut harness = Harness::spawn(items(&["a", "b", "c"]), 1, factory).await;
    harness.orchestration.start().await?;

    // When
    let active = harness.orchestration.start().await?;

    // Then
    assert_eq!(active, 1);
    let snapshot = harness.orchestration.snapshot().await?;
    assert_eq!(snapshot.worker_count, 1);
    assert_eq!(snapshot.started, ids(&["c"]));

    harness.wait_done().await;
    assert_eq!(harness.max_active(), 1);
    harness.orchestration.shutdown().await?;
    Ok(())
}

/// BDD Test: Shutdown while work is in flight
///
/// **Given** an orchestration with slow items in progress
/// **When** it is shut down
/// **Then** shutdown completes and no completion fires
#[tokio::test]
async fn given_work_in_flight_when_shutdown_then_stops_without_completion()
-> Result<(), Box<dyn Error>> {
    // Given
    let factory = TestFactory::new(4, Duration::from_secs(5));
    let harness = Harness::spawn(items(&["a", "b"]), 2, factory).await;
    harness.orchestration.start().await?;

    // When
    tokio::time::timeout(common::TEST_TIMEOUT, harness.orchestration.shutdown()).await??;

    // Then
    assert_eq!(harness.completions.load(std::sync::atomic::Ordering::SeqCst), 0);
    assert_eq!(harness.logger.count("All done!"), 0);
    Ok(())
}
