//! Event types for the skipmark event system
//!
//! Provides the shared event definitions and the [`EventBus`] used to fan
//! analysis progress out to SSE subscribers.

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

/// skipmark event types
///
/// Events are broadcast via [`EventBus`] and serialized for SSE
/// transmission. All analysis components emit through this central enum.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum SkipmarkEvent {
    /// An analysis run started
    AnalysisStarted {
        /// Episodes queued for this run
        total_queued: usize,
        /// When the run started
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Overall run progress changed
    ///
    /// Emitted after each season completes. Concurrent season completions
    /// can interleave, so consumers must tolerate repeated or
    /// non-monotonic percentages.
    AnalysisProgress {
        /// Episodes processed so far
        processed: usize,
        /// Episodes queued at run start
        total: usize,
        /// floor(processed * 100 / total)
        percent: f64,
        /// When this update was produced
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// One season finished analyzing
    SeasonCompleted {
        /// Series display name
        series: String,
        /// Season number (0 = Specials)
        season: u32,
        /// Episodes counted as analyzed in this season
        episodes_analyzed: usize,
        /// Whether marker files were (re)written for the season
        markers_written: bool,
        /// When the season completed
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// One season failed analyzing; the run continues
    SeasonFailed {
        /// Series display name
        series: String,
        /// Season number (0 = Specials)
        season: u32,
        /// Failure description
        error: String,
        /// When the failure was recorded
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// An analysis run finished (including partially-failed runs)
    AnalysisCompleted {
        /// Episodes processed over the whole run
        processed: usize,
        /// Episodes queued at run start
        total: usize,
        /// Whether the run was cut short by cancellation
        cancelled: bool,
        /// Wall-clock run duration
        duration_seconds: u64,
        /// When the run finished
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// An analysis run aborted before any season was scheduled
    AnalysisFailed {
        /// Failure description
        error: String,
        /// When the failure was recorded
        timestamp: chrono::DateTime<chrono::Utc>,
    },
}

impl SkipmarkEvent {
    /// Event type name for SSE event framing
    pub fn event_type(&self) -> &'static str {
        match self {
            SkipmarkEvent::AnalysisStarted { .. } => "AnalysisStarted",
            SkipmarkEvent::AnalysisProgress { .. } => "AnalysisProgress",
            SkipmarkEvent::SeasonCompleted { .. } => "SeasonCompleted",
            SkipmarkEvent::SeasonFailed { .. } => "SeasonFailed",
            SkipmarkEvent::AnalysisCompleted { .. } => "AnalysisCompleted",
            SkipmarkEvent::AnalysisFailed { .. } => "AnalysisFailed",
        }
    }
}

/// Broadcast bus for [`SkipmarkEvent`]
///
/// Thin wrapper over `tokio::sync::broadcast`; cloning shares the channel.
#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<SkipmarkEvent>,
    capacity: usize,
}

impl EventBus {
    /// Creates a new EventBus with the given channel capacity
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx, capacity }
    }

    /// Subscribe to all future events
    pub fn subscribe(&self) -> broadcast::Receiver<SkipmarkEvent> {
        self.tx.subscribe()
    }

    /// Emit an event, ignoring if no subscribers are listening
    ///
    /// Progress events are advisory; it is acceptable for nobody to be
    /// listening.
    pub fn emit_lossy(&self, event: SkipmarkEvent) {
        let _ = self.tx.send(event);
    }

    /// Current number of active subscribers
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }

    /// Configured channel capacity
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
