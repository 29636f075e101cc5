//! EDL marker file output
//!
//! Persists detected segment boundaries as one EDL file per episode,
//! placed next to the media file (`<stem>.edl`). Lines are
//! `start<TAB>end<TAB>action`; action 3 marks a skippable commercial
//! break, which is what players act on for intros.

use crate::models::QueuedEpisode;
use crate::services::segment_cache::SegmentCache;
use std::path::{Path, PathBuf};

const EDL_SKIP_ACTION: u8 = 3;

/// Marker file writer
#[derive(Clone)]
pub struct EdlWriter {
    cache: SegmentCache,
}

impl EdlWriter {
    /// Create a writer reading detections from the given cache
    pub fn new(cache: SegmentCache) -> Self {
        Self { cache }
    }

    /// Write or refresh marker files for the given episodes
    ///
    /// Episodes without a cached detection are skipped. Per-file write
    /// failures are logged and absorbed; the return value is the number
    /// of files actually written.
    pub fn write_markers(&self, episodes: &[QueuedEpisode]) -> usize {
        let mut written = 0;

        for episode in episodes {
            let segment = match self.cache.get(episode.episode_id) {
                Some(segment) if segment.is_valid() => segment,
                Some(_) => {
                    tracing::debug!(
                        episode = %episode.title,
                        "Cached segment is degenerate, not writing marker"
                    );
                    continue;
                }
                None => continue,
            };

            let marker_path = Self::marker_path(&episode.path);
            let contents = format!(
                "{:.2}\t{:.2}\t{}\n",
                segment.start, segment.end, EDL_SKIP_ACTION
            );

            match std::fs::write(&marker_path, contents) {
                Ok(()) => {
                    written += 1;
                    tracing::debug!(
                        marker = %marker_path.display(),
                        start = segment.start,
                        end = segment.end,
                        "Marker file written"
                    );
                }
                Err(e) => {
                    tracing::warn!(
                        marker = %marker_path.display(),
                        error = %e,
                        "Failed to write marker file"
                    );
                }
            }
        }

        written
    }

    /// Marker path for a media file
    pub fn marker_path(media_path: &Path) -> PathBuf {
        media_path.with_extension("edl")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::MediaSegment;
    use std::fs;
    use uuid::Uuid;

    fn episode(path: PathBuf) -> QueuedEpisode {
        QueuedEpisode {
            episode_id: QueuedEpisode::id_for_path(&path),
            series: "Example".to_string(),
            season: 1,
            title: path.file_stem().unwrap().to_string_lossy().to_string(),
            path,
        }
    }

    #[test]
    fn test_write_markers_for_cached_segments() {
        let temp = tempfile::tempdir().unwrap();
        let media = temp.path().join("e1.mkv");
        fs::write(&media, b"x").unwrap();

        let ep = episode(media.clone());
        let cache = SegmentCache::new();
        cache.insert(MediaSegment {
            episode_id: ep.episode_id,
            start: 12.5,
            end: 97.25,
        });

        let writer = EdlWriter::new(cache);
        let written = writer.write_markers(std::slice::from_ref(&ep));

        assert_eq!(written, 1);
        let contents = fs::read_to_string(temp.path().join("e1.edl")).unwrap();
        assert_eq!(contents, "12.50\t97.25\t3\n");
    }

    #[test]
    fn test_episode_without_detection_is_skipped() {
        let temp = tempfile::tempdir().unwrap();
        let media = temp.path().join("e1.mkv");
        fs::write(&media, b"x").unwrap();

        let writer = EdlWriter::new(SegmentCache::new());
        let written = writer.write_markers(&[episode(media)]);

        assert_eq!(written, 0);
        assert!(!temp.path().join("e1.edl").exists());
    }

    #[test]
    fn test_rewrite_replaces_existing_marker() {
        let temp = tempfile::tempdir().unwrap();
        let media = temp.path().join("e1.mkv");
        fs::write(&media, b"x").unwrap();
        fs::write(temp.path().join("e1.edl"), "0.00\t1.00\t3\n").unwrap();

        let ep = episode(media);
        let cache = SegmentCache::new();
        cache.insert(MediaSegment {
            episode_id: ep.episode_id,
            start: 5.0,
            end: 80.0,
        });

        let writer = EdlWriter::new(cache);
        assert_eq!(writer.write_markers(std::slice::from_ref(&ep)), 1);

        let contents = fs::read_to_string(temp.path().join("e1.edl")).unwrap();
        assert_eq!(contents, "5.00\t80.00\t3\n");
    }

    #[test]
    fn test_marker_path_swaps_extension() {
        assert_eq!(
            EdlWriter::marker_path(Path::new("/tv/show/e1.mkv")),
            PathBuf::from("/tv/show/e1.edl")
        );
    }
}
