//! Batch analysis scheduler
//!
//! Drains the grouped analysis queue with bounded parallelism. Per
//! season: verify membership, decide skip/analyze, drive the
//! fingerprinting service, aggregate the shared processed counter, decide
//! whether marker files are (re)written, and report overall progress.
//! A season failure never aborts the run or other in-flight seasons.

pub mod analyzer;
pub mod progress;
pub mod verify;

pub use analyzer::SeasonAnalyzer;
pub use progress::{NullProgress, ProgressSink};
pub use verify::{SeasonVerifier, VerifiedSeason};

use crate::db;
use crate::models::{AnalysisSettings, MarkerMode, QueuedEpisode, SeasonKey};
use crate::services::edl_writer::EdlWriter;
use crate::services::episode_queue::EpisodeQueue;
use crate::services::intro_detection::FingerprintService;
use crate::services::library_scanner::ScanError;
use crate::services::media_library::MediaLibrary;
use crate::services::segment_cache::SegmentCache;
use futures::StreamExt;
use serde::Serialize;
use skipmark_common::events::{EventBus, SkipmarkEvent};
use sqlx::SqlitePool;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

/// Fatal pre-run errors; nothing is scheduled when these occur
#[derive(Debug, Error)]
pub enum ScheduleError {
    /// No usable media library root is configured
    #[error("No media library configured")]
    NotConfigured,

    /// The queue is empty after synchronizing with the library; this
    /// signals misconfiguration, not "nothing needs analysis"
    #[error("Analysis queue is empty after library synchronization")]
    EmptyQueue,

    /// Library synchronization failed
    #[error("Library scan failed: {0}")]
    Scan(#[from] ScanError),

    /// Settings could not be read before the run
    #[error(transparent)]
    Common(#[from] skipmark_common::Error),
}

/// Outcome of a completed run
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    /// Episodes queued at run start
    pub total_queued: usize,
    /// Episodes counted as processed over the run
    pub processed: usize,
    /// Whether cancellation cut the run short
    pub cancelled: bool,
    /// Wall-clock duration
    pub duration_seconds: u64,
}

/// Batch analysis scheduler
pub struct AnalysisScheduler {
    library: Arc<MediaLibrary>,
    queue: Arc<EpisodeQueue>,
    verifier: SeasonVerifier,
    analyzer: SeasonAnalyzer,
    edl: EdlWriter,
    db: SqlitePool,
    event_bus: EventBus,
}

impl AnalysisScheduler {
    /// Wire a scheduler over its collaborators
    pub fn new(
        library: Arc<MediaLibrary>,
        queue: Arc<EpisodeQueue>,
        cache: SegmentCache,
        service: Arc<dyn FingerprintService>,
        db: SqlitePool,
        event_bus: EventBus,
    ) -> Self {
        Self {
            verifier: SeasonVerifier::new(library.clone(), cache.clone()),
            analyzer: SeasonAnalyzer::new(service),
            edl: EdlWriter::new(cache),
            library,
            queue,
            db,
            event_bus,
        }
    }

    /// Execute one batch analysis run
    ///
    /// Synchronizes the queue, fans seasons out over a bounded worker
    /// pool, and reports progress as `floor(processed * 100 /
    /// total_queued)` with the denominator fixed at run start. If the
    /// regenerate flag was set at run start it is cleared (and persisted)
    /// exactly once after all workers have joined, regardless of
    /// per-season outcomes or cancellation.
    pub async fn run(
        &self,
        progress: &dyn ProgressSink,
        token: CancellationToken,
    ) -> Result<RunSummary, ScheduleError> {
        let started = std::time::Instant::now();

        if !self.library.is_configured() {
            return Err(ScheduleError::NotConfigured);
        }

        // Synchronize the grouped queue from the library (blocking walk)
        let total_queued = {
            let queue = self.queue.clone();
            tokio::task::spawn_blocking(move || queue.enqueue_all())
                .await
                .map_err(|e| {
                    ScheduleError::Common(skipmark_common::Error::Internal(e.to_string()))
                })??
        };

        if total_queued == 0 {
            return Err(ScheduleError::EmptyQueue);
        }

        let config = db::settings::load_analysis_settings(&self.db).await?;
        // Workers iterate an owned snapshot; library changes during the
        // run cannot affect work already in flight.
        let seasons = self.queue.snapshot();

        tracing::info!(
            total_queued,
            seasons = seasons.len(),
            max_parallelism = config.max_parallelism,
            regenerate = config.regenerate_markers,
            "Starting batch analysis"
        );
        self.event_bus.emit_lossy(SkipmarkEvent::AnalysisStarted {
            total_queued,
            timestamp: chrono::Utc::now(),
        });

        let processed = AtomicUsize::new(0);

        {
            let processed = &processed;
            let config = &config;
            let token = &token;
            futures::stream::iter(seasons)
                .for_each_concurrent(config.max_parallelism.max(1), |(key, episodes)| {
                    async move {
                        self.process_season(
                            &key,
                            &episodes,
                            config,
                            processed,
                            total_queued,
                            progress,
                            token,
                        )
                        .await;
                    }
                })
                .await;
        }

        // Single writer, happens-after all workers joined
        if config.regenerate_markers {
            match db::settings::set_regenerate_markers(&self.db, false).await {
                Ok(()) => tracing::debug!("Marker regeneration flag cleared"),
                Err(e) => {
                    tracing::error!(error = %e, "Failed to clear marker regeneration flag")
                }
            }
        }

        let summary = RunSummary {
            total_queued,
            processed: processed.load(Ordering::SeqCst),
            cancelled: token.is_cancelled(),
            duration_seconds: started.elapsed().as_secs(),
        };

        tracing::info!(
            processed = summary.processed,
            total_queued,
            cancelled = summary.cancelled,
            duration_seconds = summary.duration_seconds,
            "Batch analysis finished"
        );
        self.event_bus.emit_lossy(SkipmarkEvent::AnalysisCompleted {
            processed: summary.processed,
            total: total_queued,
            cancelled: summary.cancelled,
            duration_seconds: summary.duration_seconds,
            timestamp: chrono::Utc::now(),
        });

        Ok(summary)
    }

    /// Process one season; every failure is terminal at the season level
    #[allow(clippy::too_many_arguments)]
    async fn process_season(
        &self,
        key: &SeasonKey,
        episodes: &[QueuedEpisode],
        config: &AnalysisSettings,
        processed: &AtomicUsize,
        total_queued: usize,
        progress: &dyn ProgressSink,
        token: &CancellationToken,
    ) {
        let verified = self.verifier.verify(episodes);

        if verified.episodes.is_empty() {
            return;
        }

        if !verified.any_unanalyzed {
            // A fully-analyzed season contributes no progress, but the
            // one-shot regenerate flag still refreshes its markers.
            if config.regenerate_markers && config.marker_mode != MarkerMode::None {
                let files = self.edl.write_markers(&verified.episodes);
                tracing::debug!(season = %key, files, "Markers regenerated for analyzed season");
            } else {
                tracing::debug!(season = %key, "All episodes already analyzed, skipping");
            }
            return;
        }

        if token.is_cancelled() {
            tracing::debug!(season = %key, "Cancellation requested, skipping season");
            return;
        }

        let analyzed = match self
            .analyzer
            .analyze(key, &verified.episodes, config.analyze_specials, token)
            .await
        {
            Ok(count) => count,
            Err(e) => {
                tracing::error!(
                    season = %key,
                    error = %e,
                    "Season analysis failed; remaining seasons continue"
                );
                self.event_bus.emit_lossy(SkipmarkEvent::SeasonFailed {
                    series: key.series.clone(),
                    season: key.season,
                    error: e.to_string(),
                    timestamp: chrono::Utc::now(),
                });
                return;
            }
        };

        let done = processed.fetch_add(analyzed, Ordering::SeqCst) + analyzed;

        let write_output = analyzed > 0 || config.regenerate_markers;
        let mut markers_written = false;
        if write_output && config.marker_mode != MarkerMode::None {
            let files = self.edl.write_markers(&verified.episodes);
            markers_written = files > 0;
            tracing::debug!(season = %key, files, "Marker files refreshed");
        }

        let percent = (done * 100 / total_queued) as f64;
        progress.report(percent);
        self.event_bus.emit_lossy(SkipmarkEvent::AnalysisProgress {
            processed: done,
            total: total_queued,
            percent,
            timestamp: chrono::Utc::now(),
        });
        self.event_bus.emit_lossy(SkipmarkEvent::SeasonCompleted {
            series: key.series.clone(),
            season: key.season,
            episodes_analyzed: analyzed,
            markers_written,
            timestamp: chrono::Utc::now(),
        });
    }
}
