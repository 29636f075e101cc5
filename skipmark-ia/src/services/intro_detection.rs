//! Season-level intro detection
//!
//! [`FingerprintService`] is the narrow seam the scheduler drives:
//! analyze one season, record detections in the segment cache and the
//! database as a side effect. [`IntroFingerprintService`] is the
//! production implementation: fingerprint every episode, then locate the
//! longest hash run shared between episode pairs.

use crate::db;
use crate::models::{MediaSegment, QueuedEpisode, SeasonKey};
use crate::services::fingerprint::{
    Fingerprinter, HASH_SPAN, HOP_SECONDS, SILENT_HASH,
};
use crate::services::segment_cache::SegmentCache;
use async_trait::async_trait;
use sqlx::SqlitePool;
use std::collections::HashMap;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

/// Season analysis errors
///
/// Both kinds are caught by the orchestrator and never abort a run.
#[derive(Debug, Error)]
pub enum AnalysisError {
    /// Process-level fingerprinting failure (unreadable or undecodable audio)
    #[error("Fingerprinting failed: {0}")]
    Fingerprint(String),

    /// Internal consistency fault: a fingerprint that was just computed is
    /// missing from the working set
    #[error("Fingerprint cache miss for episode {0}")]
    CacheMiss(Uuid),

    /// Detections could not be persisted
    #[error("Failed to persist detections: {0}")]
    Persist(String),
}

/// Narrow interface between the scheduler and the fingerprinting machinery
///
/// Implementations write detection outcomes into the segment cache (and
/// durable storage) as a side effect; the scheduler itself never mutates
/// the cache.
#[async_trait]
pub trait FingerprintService: Send + Sync {
    /// Analyze one season's verified episodes
    async fn analyze_season(
        &self,
        key: &SeasonKey,
        episodes: &[QueuedEpisode],
        token: CancellationToken,
    ) -> Result<(), AnalysisError>;
}

/// Tunables for the pairwise comparison
#[derive(Debug, Clone)]
pub struct AnalysisParams {
    /// Shortest accepted intro (seconds)
    pub min_intro_seconds: f64,
    /// Longest accepted intro (seconds); longer runs are capped
    pub max_intro_seconds: f64,
    /// Mismatching hops tolerated inside a run before it is closed
    pub max_gap_hops: usize,
}

impl Default for AnalysisParams {
    fn default() -> Self {
        Self {
            min_intro_seconds: 10.0,
            max_intro_seconds: 150.0,
            max_gap_hops: 4,
        }
    }
}

/// Production fingerprint service
pub struct IntroFingerprintService {
    fingerprinter: Fingerprinter,
    params: AnalysisParams,
    cache: SegmentCache,
    db: SqlitePool,
}

impl IntroFingerprintService {
    /// Create a service writing into the given cache and database
    pub fn new(cache: SegmentCache, db: SqlitePool) -> Self {
        Self {
            fingerprinter: Fingerprinter::new(),
            params: AnalysisParams::default(),
            cache,
            db,
        }
    }

    /// Override the comparison tunables
    pub fn with_params(mut self, params: AnalysisParams) -> Self {
        self.params = params;
        self
    }
}

#[async_trait]
impl FingerprintService for IntroFingerprintService {
    async fn analyze_season(
        &self,
        key: &SeasonKey,
        episodes: &[QueuedEpisode],
        _token: CancellationToken,
    ) -> Result<(), AnalysisError> {
        // Once a season is entered it runs to completion; cancellation is
        // only honored at season entry by the scheduler.
        let owned = episodes.to_vec();
        let fingerprinter = self.fingerprinter;
        let params = self.params.clone();

        let segments = tokio::task::spawn_blocking(move || {
            detect_season_segments(&fingerprinter, &params, &owned)
        })
        .await
        .map_err(|e| AnalysisError::Fingerprint(format!("analysis task panicked: {}", e)))??;

        tracing::debug!(
            season = %key,
            detections = segments.len(),
            "Season comparison finished"
        );

        for segment in &segments {
            self.cache.insert(segment.clone());
        }

        db::segments::save_segments(&self.db, &segments)
            .await
            .map_err(|e| AnalysisError::Persist(e.to_string()))?;

        Ok(())
    }
}

/// Fingerprint all episodes and find shared runs between neighbours
///
/// Each episode is compared against the next one (cyclically); an episode
/// keeps the longest range any pairing produced. Episodes with no shared
/// run yield no segment and stay unanalyzed for a later run.
fn detect_season_segments(
    fingerprinter: &Fingerprinter,
    params: &AnalysisParams,
    episodes: &[QueuedEpisode],
) -> Result<Vec<MediaSegment>, AnalysisError> {
    let mut prints: HashMap<Uuid, Vec<u32>> = HashMap::with_capacity(episodes.len());
    for episode in episodes {
        let hashes = fingerprinter
            .fingerprint_file(&episode.path)
            .map_err(|e| {
                AnalysisError::Fingerprint(format!("{}: {}", episode.path.display(), e))
            })?;
        prints.insert(episode.episode_id, hashes);
    }

    let mut best: HashMap<Uuid, MediaSegment> = HashMap::new();
    let count = episodes.len();

    for i in 0..count {
        let a = &episodes[i];
        let b = &episodes[(i + 1) % count];
        if a.episode_id == b.episode_id {
            continue;
        }

        let hashes_a = prints
            .get(&a.episode_id)
            .ok_or(AnalysisError::CacheMiss(a.episode_id))?;
        let hashes_b = prints
            .get(&b.episode_id)
            .ok_or(AnalysisError::CacheMiss(b.episode_id))?;

        if let Some((range_a, range_b)) = find_shared_run(hashes_a, hashes_b, params) {
            keep_longest(&mut best, a.episode_id, range_a);
            keep_longest(&mut best, b.episode_id, range_b);
        }
    }

    Ok(best.into_values().collect())
}

fn keep_longest(best: &mut HashMap<Uuid, MediaSegment>, episode_id: Uuid, range: (f64, f64)) {
    let candidate = MediaSegment {
        episode_id,
        start: range.0,
        end: range.1,
    };
    match best.get(&episode_id) {
        Some(existing) if existing.duration() >= candidate.duration() => {}
        _ => {
            best.insert(episode_id, candidate);
        }
    }
}

/// Locate the longest hash run two episodes share
///
/// Votes on the alignment shift via an inverted index of `b`'s hashes,
/// then walks the aligned sequences at the winning shift collecting the
/// longest run that tolerates `max_gap_hops` mismatches. Returns
/// `(range_in_a, range_in_b)` in seconds.
fn find_shared_run(
    a: &[u32],
    b: &[u32],
    params: &AnalysisParams,
) -> Option<((f64, f64), (f64, f64))> {
    let mut index: HashMap<u32, Vec<usize>> = HashMap::new();
    for (j, &hash) in b.iter().enumerate() {
        if hash != SILENT_HASH {
            index.entry(hash).or_default().push(j);
        }
    }

    let mut votes: HashMap<isize, u32> = HashMap::new();
    for (i, &hash) in a.iter().enumerate() {
        if hash == SILENT_HASH {
            continue;
        }
        if let Some(positions) = index.get(&hash) {
            for &j in positions {
                *votes.entry(i as isize - j as isize).or_insert(0) += 1;
            }
        }
    }

    let (&shift, _) = votes
        .iter()
        .max_by_key(|(&d, &c)| (c, std::cmp::Reverse(d)))?;

    // Walk the overlap of a and b at this shift
    let start_i = shift.max(0) as usize;
    let end_i = a.len().min((b.len() as isize + shift).max(0) as usize);
    if start_i >= end_i {
        return None;
    }

    let mut best_run: Option<(usize, usize)> = None;
    let mut current: Option<(usize, usize)> = None; // (first, last) matching index in a

    for i in start_i..end_i {
        let j = (i as isize - shift) as usize;
        let matched = a[i] != SILENT_HASH && a[i] == b[j];

        if matched {
            current = match current {
                None => Some((i, i)),
                Some((first, _)) => Some((first, i)),
            };
        } else if let Some((first, last)) = current {
            if i - last > params.max_gap_hops {
                if run_len(best_run) < last - first + 1 {
                    best_run = Some((first, last));
                }
                current = None;
            }
        }
    }
    if let Some((first, last)) = current {
        if run_len(best_run) < last - first + 1 {
            best_run = Some((first, last));
        }
    }

    let (first, last) = best_run?;

    // A run of hashes [first..=last] covers hops first..last+HASH_SPAN
    let start_a = first as f64 * HOP_SECONDS;
    let mut end_a = (last + HASH_SPAN) as f64 * HOP_SECONDS;

    if end_a - start_a < params.min_intro_seconds {
        return None;
    }
    if end_a - start_a > params.max_intro_seconds {
        end_a = start_a + params.max_intro_seconds;
    }

    let offset = shift as f64 * HOP_SECONDS;
    Some(((start_a, end_a), (start_a - offset, end_a - offset)))
}

fn run_len(run: Option<(usize, usize)>) -> usize {
    match run {
        Some((first, last)) => last - first + 1,
        None => 0,
    }
}
