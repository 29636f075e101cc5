//! Shared fixtures for integration tests
#![allow(dead_code)]

use async_trait::async_trait;
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::SqlitePool;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use skipmark_common::events::EventBus;
use skipmark_ia::models::{MediaSegment, QueuedEpisode, SeasonKey};
use skipmark_ia::scheduler::{AnalysisScheduler, ProgressSink};
use skipmark_ia::services::{
    AnalysisError, EpisodeQueue, FingerprintService, MediaLibrary, SegmentCache,
};

/// Matroska magic so fixture files pass scanner verification
pub const MKV_MAGIC: [u8; 4] = [0x1A, 0x45, 0xDF, 0xA3];

type AnalyzeHook = Box<dyn Fn(&SeasonKey) + Send + Sync>;

/// Scripted fingerprint service for scheduler tests
///
/// Records every invocation, optionally fails for specific series,
/// simulates the cache side effect, and can run a hook at analyze time
/// (e.g. to mutate the filesystem mid-run).
pub struct MockFingerprintService {
    cache: SegmentCache,
    calls: Mutex<Vec<(SeasonKey, usize)>>,
    fail_series: HashSet<String>,
    record_segments: bool,
    delay: Option<Duration>,
    on_analyze: Option<AnalyzeHook>,
}

impl MockFingerprintService {
    pub fn new(cache: SegmentCache) -> Self {
        Self {
            cache,
            calls: Mutex::new(Vec::new()),
            fail_series: HashSet::new(),
            record_segments: true,
            delay: None,
            on_analyze: None,
        }
    }

    /// Fail every season of the given series with a fingerprint error
    pub fn failing_for(mut self, series: &str) -> Self {
        self.fail_series.insert(series.to_string());
        self
    }

    /// Do not simulate detection outcomes
    pub fn without_results(mut self) -> Self {
        self.record_segments = false;
        self
    }

    /// Sleep inside each analyze call (for overlap/cancellation tests)
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Run a hook at the start of each analyze call
    pub fn with_hook<F>(mut self, hook: F) -> Self
    where
        F: Fn(&SeasonKey) + Send + Sync + 'static,
    {
        self.on_analyze = Some(Box::new(hook));
        self
    }

    /// All recorded invocations
    pub fn calls(&self) -> Vec<(SeasonKey, usize)> {
        self.calls.lock().unwrap().clone()
    }

    /// Invocations for one series
    pub fn calls_for(&self, series: &str) -> Vec<(SeasonKey, usize)> {
        self.calls()
            .into_iter()
            .filter(|(key, _)| key.series == series)
            .collect()
    }
}

#[async_trait]
impl FingerprintService for MockFingerprintService {
    async fn analyze_season(
        &self,
        key: &SeasonKey,
        episodes: &[QueuedEpisode],
        _token: CancellationToken,
    ) -> Result<(), AnalysisError> {
        self.calls.lock().unwrap().push((key.clone(), episodes.len()));

        if let Some(hook) = &self.on_analyze {
            hook(key);
        }

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        if self.fail_series.contains(&key.series) {
            return Err(AnalysisError::Fingerprint(format!(
                "injected failure for {}",
                key
            )));
        }

        if self.record_segments {
            for episode in episodes {
                self.cache.insert(MediaSegment {
                    episode_id: episode.episode_id,
                    start: 1.0,
                    end: 31.0,
                });
            }
        }

        Ok(())
    }
}

/// Progress sink collecting every reported percentage
#[derive(Default)]
pub struct CollectingProgress {
    values: Mutex<Vec<f64>>,
}

impl CollectingProgress {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn values(&self) -> Vec<f64> {
        self.values.lock().unwrap().clone()
    }
}

impl ProgressSink for CollectingProgress {
    fn report(&self, percent: f64) {
        self.values.lock().unwrap().push(percent);
    }
}

/// A library tree, in-memory database, cache, and event bus
pub struct Fixture {
    pub temp: TempDir,
    pub db: SqlitePool,
    pub cache: SegmentCache,
    pub bus: EventBus,
    pub library: Arc<MediaLibrary>,
    pub queue: Arc<EpisodeQueue>,
}

impl Fixture {
    pub async fn new() -> Self {
        let temp = TempDir::new().unwrap();

        // A single connection keeps the in-memory database shared across
        // every query in the test.
        let db = SqlitePoolOptions::new()
            .max_connections(1)
            .connect(":memory:")
            .await
            .unwrap();
        skipmark_ia::db::init_tables(&db).await.unwrap();

        let library = Arc::new(MediaLibrary::new(temp.path().to_path_buf()));
        let queue = Arc::new(EpisodeQueue::new(library.clone()));

        Self {
            temp,
            db,
            cache: SegmentCache::new(),
            bus: EventBus::new(64),
            library,
            queue,
        }
    }

    pub fn root(&self) -> &Path {
        self.temp.path()
    }

    /// Create one episode file under `<series>/<season dir>/`
    pub fn add_episode(&self, series: &str, season_dir: &str, file: &str) -> PathBuf {
        let dir = self.root().join(series).join(season_dir);
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join(file);
        std::fs::write(&path, MKV_MAGIC).unwrap();
        path
    }

    pub fn episode_id(&self, path: &Path) -> Uuid {
        QueuedEpisode::id_for_path(path)
    }

    /// Pre-populate the cache as if this episode were already analyzed
    pub fn mark_analyzed(&self, path: &Path) {
        self.cache.insert(MediaSegment {
            episode_id: self.episode_id(path),
            start: 2.0,
            end: 60.0,
        });
    }

    pub fn scheduler(&self, service: Arc<dyn FingerprintService>) -> Arc<AnalysisScheduler> {
        Arc::new(AnalysisScheduler::new(
            self.library.clone(),
            self.queue.clone(),
            self.cache.clone(),
            service,
            self.db.clone(),
            self.bus.clone(),
        ))
    }
}
