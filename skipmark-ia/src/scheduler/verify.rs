//! Season verification
//!
//! Filters a season to the episodes still resolvable to an existing media
//! file, and determines whether any member still lacks a detection
//! outcome. Never fails; every per-candidate fault is absorbed.

use crate::models::QueuedEpisode;
use crate::services::media_library::MediaLibrary;
use crate::services::segment_cache::SegmentCache;
use std::sync::Arc;

/// Verification outcome for one season
#[derive(Debug)]
pub struct VerifiedSeason {
    /// Episodes that resolved to an existing file, input order preserved
    pub episodes: Vec<QueuedEpisode>,
    /// Whether any queued member (verified or not) lacks a cached outcome
    pub any_unanalyzed: bool,
}

/// Season verifier
pub struct SeasonVerifier {
    library: Arc<MediaLibrary>,
    cache: SegmentCache,
}

impl SeasonVerifier {
    /// Create a verifier over the given library and cache
    pub fn new(library: Arc<MediaLibrary>, cache: SegmentCache) -> Self {
        Self { library, cache }
    }

    /// Verify one season's queued episodes
    ///
    /// The existence check and the analyzed check are independent: a
    /// candidate that fails path resolution still marks the season
    /// unanalyzed when it has no cached outcome.
    pub fn verify(&self, episodes: &[QueuedEpisode]) -> VerifiedSeason {
        let mut verified = Vec::with_capacity(episodes.len());
        let mut any_unanalyzed = false;

        for episode in episodes {
            match self.library.resolve_path(episode.episode_id) {
                Ok(path) => {
                    if path.exists() {
                        verified.push(episode.clone());
                    }
                }
                Err(e) => {
                    tracing::debug!(
                        episode = %episode.title,
                        error = %e,
                        "Path resolution failed, dropping candidate"
                    );
                }
            }

            if !self.cache.contains(episode.episode_id) {
                any_unanalyzed = true;
            }
        }

        VerifiedSeason {
            episodes: verified,
            any_unanalyzed,
        }
    }
}
