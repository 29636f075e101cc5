//! Grouped analysis queue
//!
//! The queue holds the current set of analysis candidates grouped by
//! series+season. [`EpisodeQueue::enqueue_all`] rebuilds it from the
//! library; a run then iterates an owned [`EpisodeQueue::snapshot`], so
//! concurrent library changes cannot affect work already in flight.

use crate::models::{QueuedEpisode, SeasonKey};
use crate::services::library_scanner::ScanError;
use crate::services::media_library::MediaLibrary;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

/// Candidate store, grouped by season
pub struct EpisodeQueue {
    library: Arc<MediaLibrary>,
    groups: RwLock<HashMap<SeasonKey, Vec<QueuedEpisode>>>,
}

impl EpisodeQueue {
    /// Create an empty queue over the given library
    pub fn new(library: Arc<MediaLibrary>) -> Self {
        Self {
            library,
            groups: RwLock::new(HashMap::new()),
        }
    }

    /// Refresh the library and rebuild the grouped queue from it
    ///
    /// Returns the total number of queued episodes. Within a group,
    /// insertion order follows the library index enumeration; no business
    /// ordering is promised.
    pub fn enqueue_all(&self) -> Result<usize, ScanError> {
        self.library.refresh()?;

        let mut rebuilt: HashMap<SeasonKey, Vec<QueuedEpisode>> = HashMap::new();
        let mut total = 0usize;

        let mut episodes = self.library.episodes();
        // Stable grouping output regardless of index iteration order
        episodes.sort_by(|a, b| a.path.cmp(&b.path));

        for episode in episodes {
            rebuilt.entry(episode.season_key()).or_default().push(episode);
            total += 1;
        }

        let season_count = rebuilt.len();
        *self.groups.write().unwrap() = rebuilt;

        tracing::debug!(episodes = total, seasons = season_count, "Analysis queue rebuilt");

        Ok(total)
    }

    /// Owned snapshot of the grouped queue, taken at run start
    pub fn snapshot(&self) -> Vec<(SeasonKey, Vec<QueuedEpisode>)> {
        let mut seasons: Vec<_> = self
            .groups
            .read()
            .unwrap()
            .iter()
            .map(|(key, episodes)| (key.clone(), episodes.clone()))
            .collect();
        seasons.sort_by(|a, b| a.0.cmp(&b.0));
        seasons
    }

    /// Number of queued episodes across all groups
    pub fn len(&self) -> usize {
        self.groups.read().unwrap().values().map(Vec::len).sum()
    }

    /// Whether the queue is empty
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::path::Path;

    const MKV_MAGIC: [u8; 4] = [0x1A, 0x45, 0xDF, 0xA3];

    fn make_episode(root: &Path, series: &str, season_dir: &str, file: &str) {
        let dir = root.join(series).join(season_dir);
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join(file), MKV_MAGIC).unwrap();
    }

    #[test]
    fn test_enqueue_all_groups_by_season() {
        let temp = tempfile::tempdir().unwrap();
        let root = temp.path();
        make_episode(root, "Show A", "Season 01", "Show A S01E01.mkv");
        make_episode(root, "Show A", "Season 01", "Show A S01E02.mkv");
        make_episode(root, "Show A", "Season 02", "Show A S02E01.mkv");
        make_episode(root, "Show B", "Season 01", "Show B S01E01.mkv");

        let library = Arc::new(MediaLibrary::new(root.to_path_buf()));
        let queue = EpisodeQueue::new(library);

        let total = queue.enqueue_all().unwrap();
        assert_eq!(total, 4);
        assert_eq!(queue.len(), 4);

        let snapshot = queue.snapshot();
        assert_eq!(snapshot.len(), 3);

        let (key, episodes) = &snapshot[0];
        assert_eq!(key.series, "Show A");
        assert_eq!(key.season, 1);
        assert_eq!(episodes.len(), 2);
    }

    #[test]
    fn test_snapshot_is_detached_from_queue() {
        let temp = tempfile::tempdir().unwrap();
        let root = temp.path();
        make_episode(root, "Show A", "Season 01", "Show A S01E01.mkv");

        let library = Arc::new(MediaLibrary::new(root.to_path_buf()));
        let queue = EpisodeQueue::new(library);
        queue.enqueue_all().unwrap();

        let snapshot = queue.snapshot();

        // A concurrent re-enqueue after library changes must not disturb
        // the snapshot a run already took.
        make_episode(root, "Show A", "Season 01", "Show A S01E02.mkv");
        queue.enqueue_all().unwrap();

        assert_eq!(snapshot[0].1.len(), 1);
        assert_eq!(queue.len(), 2);
    }

    #[test]
    fn test_empty_library_yields_empty_queue() {
        let temp = tempfile::tempdir().unwrap();
        let library = Arc::new(MediaLibrary::new(temp.path().to_path_buf()));
        let queue = EpisodeQueue::new(library);

        assert_eq!(queue.enqueue_all().unwrap(), 0);
        assert!(queue.is_empty());
    }
}
