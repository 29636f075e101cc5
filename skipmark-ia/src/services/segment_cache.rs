//! In-process analysis result cache
//!
//! Holds every known detection outcome keyed by episode id, warmed from
//! the `media_segments` table at startup. The scheduler only queries
//! membership; inserts happen inside the fingerprinting service as
//! analysis completes.

use crate::models::MediaSegment;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use uuid::Uuid;

/// Shared detection-outcome cache
///
/// Cloning shares the underlying map. Reads and writes are short critical
/// sections; the lock is never held across I/O.
#[derive(Clone, Default)]
pub struct SegmentCache {
    inner: Arc<RwLock<HashMap<Uuid, MediaSegment>>>,
}

impl SegmentCache {
    /// Create an empty cache
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the cache contents with persisted segments (startup warm-up)
    pub fn load(&self, segments: Vec<MediaSegment>) {
        let mut map = self.inner.write().unwrap();
        map.clear();
        for segment in segments {
            map.insert(segment.episode_id, segment);
        }
    }

    /// Whether a detection outcome exists for this episode
    pub fn contains(&self, episode_id: Uuid) -> bool {
        self.inner.read().unwrap().contains_key(&episode_id)
    }

    /// Detection outcome for an episode, if any
    pub fn get(&self, episode_id: Uuid) -> Option<MediaSegment> {
        self.inner.read().unwrap().get(&episode_id).cloned()
    }

    /// Record a detection outcome
    pub fn insert(&self, segment: MediaSegment) {
        self.inner.write().unwrap().insert(segment.episode_id, segment);
    }

    /// Number of cached outcomes
    pub fn len(&self) -> usize {
        self.inner.read().unwrap().len()
    }

    /// Whether the cache is empty
    pub fn is_empty(&self) -> bool {
        self.inner.read().unwrap().is_empty()
    }
}
