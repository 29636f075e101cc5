//! Run lifecycle coordination
//!
//! The task host around the scheduler: at most one analysis run is active
//! at a time, runs execute on a background task, and the outcome of the
//! most recent run is kept for the status endpoint. Both the HTTP trigger
//! and the daily schedule go through [`RunCoordinator::try_start`].

use crate::scheduler::{AnalysisScheduler, RunSummary};
use serde::Serialize;
use skipmark_common::events::{EventBus, SkipmarkEvent};
use std::sync::{Arc, Mutex, RwLock};
use tokio_util::sync::CancellationToken;

/// Why a run could not be started
#[derive(Debug, PartialEq, Eq)]
pub enum StartError {
    /// A run is already active; only one run instance is permitted
    AlreadyRunning,
}

/// Outcome of the most recent run
#[derive(Debug, Clone, Serialize)]
pub struct FinishedRun {
    /// Summary when the run completed (possibly with absorbed season
    /// failures; those do not fail the run)
    pub summary: Option<RunSummary>,
    /// Pre-run fatal error, when the run aborted before scheduling
    pub error: Option<String>,
    /// When the run finished
    pub finished_at: chrono::DateTime<chrono::Utc>,
}

struct ActiveRun {
    token: CancellationToken,
    started_at: chrono::DateTime<chrono::Utc>,
}

/// Coordinates analysis run lifecycle
pub struct RunCoordinator {
    scheduler: Arc<AnalysisScheduler>,
    event_bus: EventBus,
    active: Mutex<Option<ActiveRun>>,
    last: RwLock<Option<FinishedRun>>,
}

impl RunCoordinator {
    /// Create a coordinator over the given scheduler
    pub fn new(scheduler: Arc<AnalysisScheduler>, event_bus: EventBus) -> Self {
        Self {
            scheduler,
            event_bus,
            active: Mutex::new(None),
            last: RwLock::new(None),
        }
    }

    /// Start a run on a background task, unless one is already active
    pub fn try_start(self: &Arc<Self>) -> Result<(), StartError> {
        let token = {
            let mut active = self.active.lock().unwrap();
            if active.is_some() {
                return Err(StartError::AlreadyRunning);
            }
            let token = CancellationToken::new();
            *active = Some(ActiveRun {
                token: token.clone(),
                started_at: chrono::Utc::now(),
            });
            token
        };

        let coordinator = self.clone();
        tokio::spawn(async move {
            coordinator.execute(token).await;
        });

        Ok(())
    }

    /// Request cancellation of the active run, if any
    ///
    /// Cancellation is cooperative: seasons already inside the analyzer
    /// run to completion; remaining seasons are skipped and the run still
    /// finishes normally.
    pub fn cancel(&self) -> bool {
        match &*self.active.lock().unwrap() {
            Some(run) => {
                run.token.cancel();
                true
            }
            None => false,
        }
    }

    /// Whether a run is active, and when it started
    pub fn active_since(&self) -> Option<chrono::DateTime<chrono::Utc>> {
        self.active.lock().unwrap().as_ref().map(|run| run.started_at)
    }

    /// Outcome of the most recent finished run
    pub fn last_run(&self) -> Option<FinishedRun> {
        self.last.read().unwrap().clone()
    }

    async fn execute(&self, token: CancellationToken) {
        let progress = |percent: f64| {
            tracing::info!(percent, "Analysis progress");
        };

        let result = self.scheduler.run(&progress, token).await;

        let finished = match result {
            Ok(summary) => FinishedRun {
                summary: Some(summary),
                error: None,
                finished_at: chrono::Utc::now(),
            },
            Err(e) => {
                tracing::error!(error = %e, "Analysis run aborted");
                self.event_bus.emit_lossy(SkipmarkEvent::AnalysisFailed {
                    error: e.to_string(),
                    timestamp: chrono::Utc::now(),
                });
                FinishedRun {
                    summary: None,
                    error: Some(e.to_string()),
                    finished_at: chrono::Utc::now(),
                }
            }
        };

        *self.last.write().unwrap() = Some(finished);
        *self.active.lock().unwrap() = None;
    }
}
