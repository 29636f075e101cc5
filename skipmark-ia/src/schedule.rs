//! Recurring daily analysis trigger
//!
//! A background task that starts an analysis run at a fixed local time
//! each day. The trigger goes through the run coordinator, so a scheduled
//! firing while a manual run is active is skipped, not queued.

use crate::runner::{RunCoordinator, StartError};
use chrono::Timelike;
use std::sync::Arc;
use std::time::Duration;

/// Local hour of the daily run
const RUN_HOUR: u32 = 3;

const SECONDS_PER_DAY: u64 = 24 * 60 * 60;

/// Spawn the daily trigger task
pub fn spawn_daily_analysis(coordinator: Arc<RunCoordinator>) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            let wait = duration_until_next_run(chrono::Local::now().time());
            tracing::debug!(
                seconds = wait.as_secs(),
                "Sleeping until next scheduled analysis"
            );
            tokio::time::sleep(wait).await;

            match coordinator.try_start() {
                Ok(()) => tracing::info!("Scheduled analysis run started"),
                Err(StartError::AlreadyRunning) => {
                    tracing::info!("Scheduled analysis skipped; a run is already active")
                }
            }
        }
    })
}

/// Time until the next daily firing
fn duration_until_next_run(now: chrono::NaiveTime) -> Duration {
    let seconds_today = now.num_seconds_from_midnight() as u64;
    let target = RUN_HOUR as u64 * 3600;

    let until = if seconds_today < target {
        target - seconds_today
    } else {
        SECONDS_PER_DAY - seconds_today + target
    };

    Duration::from_secs(until)
}
