//! Run coordinator tests: single-run enforcement and outcome tracking

mod helpers;

use helpers::{Fixture, MockFingerprintService};
use skipmark_ia::runner::{RunCoordinator, StartError};
use std::sync::Arc;
use std::time::Duration;

async fn wait_until_idle(coordinator: &RunCoordinator) {
    for _ in 0..100 {
        if coordinator.active_since().is_none() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    panic!("run did not finish in time");
}

#[tokio::test]
async fn test_only_one_concurrent_run() {
    let fixture = Fixture::new().await;
    fixture.add_episode("Series A", "Season 01", "Series A S01E01.mkv");
    fixture.add_episode("Series A", "Season 01", "Series A S01E02.mkv");

    let mock = Arc::new(
        MockFingerprintService::new(fixture.cache.clone())
            .with_delay(Duration::from_millis(300)),
    );
    let scheduler = fixture.scheduler(mock);
    let coordinator = Arc::new(RunCoordinator::new(scheduler, fixture.bus.clone()));

    coordinator.try_start().unwrap();
    assert_eq!(coordinator.try_start(), Err(StartError::AlreadyRunning));
    assert!(coordinator.active_since().is_some());

    wait_until_idle(&coordinator).await;

    let last = coordinator.last_run().expect("finished run recorded");
    let summary = last.summary.expect("run completed");
    assert_eq!(summary.processed, 2);
    assert!(last.error.is_none());

    // Idle again: a new run may start
    assert!(coordinator.try_start().is_ok());
    wait_until_idle(&coordinator).await;
}

#[tokio::test]
async fn test_cancel_without_active_run() {
    let fixture = Fixture::new().await;
    let mock = Arc::new(MockFingerprintService::new(fixture.cache.clone()));
    let scheduler = fixture.scheduler(mock);
    let coordinator = RunCoordinator::new(scheduler, fixture.bus.clone());

    assert!(!coordinator.cancel());
    assert!(coordinator.last_run().is_none());
}

#[tokio::test]
async fn test_failed_run_is_recorded() {
    let fixture = Fixture::new().await; // empty library -> EmptyQueue

    let mock = Arc::new(MockFingerprintService::new(fixture.cache.clone()));
    let scheduler = fixture.scheduler(mock);
    let coordinator = Arc::new(RunCoordinator::new(scheduler, fixture.bus.clone()));

    coordinator.try_start().unwrap();
    wait_until_idle(&coordinator).await;

    let last = coordinator.last_run().expect("finished run recorded");
    assert!(last.summary.is_none());
    assert!(last.error.is_some());
}
