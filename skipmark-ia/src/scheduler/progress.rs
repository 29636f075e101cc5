//! Run progress reporting

/// Sink for overall run progress
///
/// Receives `floor(processed * 100 / total_queued)` after each season
/// completes. Implementations must tolerate concurrent invocation from
/// multiple workers and non-monotonic or repeated values.
pub trait ProgressSink: Send + Sync {
    /// Report overall progress, percent in [0, 100]
    fn report(&self, percent: f64);
}

impl<F> ProgressSink for F
where
    F: Fn(f64) + Send + Sync,
{
    fn report(&self, percent: f64) {
        self(percent)
    }
}

/// Sink that discards progress (scheduled background runs)
pub struct NullProgress;

impl ProgressSink for NullProgress {
    fn report(&self, _percent: f64) {}
}
