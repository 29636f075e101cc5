//! Episode and season grouping types

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use std::path::{Path, PathBuf};
use uuid::Uuid;

/// One episode queued for batch analysis
///
/// Immutable once enqueued for a run; re-enqueueing rebuilds the queue
/// from the library index.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueuedEpisode {
    /// Stable episode identity, derived from the media path
    pub episode_id: Uuid,
    /// Parent series display name
    pub series: String,
    /// Season number (0 = Specials)
    pub season: u32,
    /// Episode display name (file stem)
    pub title: String,
    /// Resolvable media path
    pub path: PathBuf,
}

impl QueuedEpisode {
    /// Derive the stable episode identity for a media path
    ///
    /// SHA-256 of the lossy path string, truncated to 16 bytes. The same
    /// path always maps to the same id across runs and processes, which is
    /// what makes re-analysis avoidance idempotent.
    pub fn id_for_path(path: &Path) -> Uuid {
        let digest = Sha256::digest(path.to_string_lossy().as_bytes());
        let mut bytes = [0u8; 16];
        bytes.copy_from_slice(&digest[..16]);
        Uuid::from_bytes(bytes)
    }

    /// Grouping key for this episode
    pub fn season_key(&self) -> SeasonKey {
        SeasonKey {
            series: self.series.clone(),
            season: self.season,
        }
    }
}

/// Grouping key: one series season is the unit of scheduling
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SeasonKey {
    /// Series display name
    pub series: String,
    /// Season number (0 = Specials)
    pub season: u32,
}

impl SeasonKey {
    /// Whether this is the reserved Specials group (season 0)
    pub fn is_specials(&self) -> bool {
        self.season == 0
    }
}

impl fmt::Display for SeasonKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.season == 0 {
            write!(f, "{} / Specials", self.series)
        } else {
            write!(f, "{} / Season {}", self.series, self.season)
        }
    }
}
