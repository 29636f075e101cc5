//! TV library index and path resolution
//!
//! Maps the on-disk library layout (`<root>/<series>/<season dir>/<file>`)
//! to episodes with stable ids, and resolves episode ids back to media
//! paths. The index is rebuilt by [`MediaLibrary::refresh`]; resolution
//! fails for ids the latest refresh no longer knows about.

use crate::models::QueuedEpisode;
use crate::services::library_scanner::{LibraryScanner, ScanError};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::RwLock;
use thiserror::Error;
use uuid::Uuid;

/// Library lookup errors
#[derive(Debug, Error)]
pub enum LibraryError {
    /// Episode id is not in the current library index
    #[error("Episode no longer in library: {0}")]
    UnknownEpisode(Uuid),
}

/// Indexed TV library
pub struct MediaLibrary {
    root: PathBuf,
    scanner: LibraryScanner,
    index: RwLock<HashMap<Uuid, QueuedEpisode>>,
}

impl MediaLibrary {
    /// Create a library over the given root
    pub fn new(root: PathBuf) -> Self {
        Self {
            root,
            scanner: LibraryScanner::new(),
            index: RwLock::new(HashMap::new()),
        }
    }

    /// The configured library root
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Whether a usable library root is configured
    pub fn is_configured(&self) -> bool {
        self.root.is_dir()
    }

    /// Rescan the library and rebuild the episode index
    ///
    /// Returns the number of indexed episodes. Files whose path does not
    /// parse into a series/season are skipped with a debug note.
    pub fn refresh(&self) -> Result<usize, ScanError> {
        let files = self.scanner.scan(&self.root)?;

        let mut rebuilt = HashMap::with_capacity(files.len());
        for file in files {
            match parse_episode(&self.root, &file) {
                Some(episode) => {
                    rebuilt.insert(episode.episode_id, episode);
                }
                None => {
                    tracing::debug!(
                        file = %file.display(),
                        "Unparseable library path, skipping"
                    );
                }
            }
        }

        let count = rebuilt.len();
        *self.index.write().unwrap() = rebuilt;

        tracing::debug!(episodes = count, root = %self.root.display(), "Library index rebuilt");

        Ok(count)
    }

    /// Snapshot of all indexed episodes
    pub fn episodes(&self) -> Vec<QueuedEpisode> {
        self.index.read().unwrap().values().cloned().collect()
    }

    /// Resolve an episode id to its media path
    pub fn resolve_path(&self, episode_id: Uuid) -> Result<PathBuf, LibraryError> {
        self.index
            .read()
            .unwrap()
            .get(&episode_id)
            .map(|episode| episode.path.clone())
            .ok_or(LibraryError::UnknownEpisode(episode_id))
    }

    #[cfg(test)]
    pub(crate) fn forget(&self, episode_id: Uuid) {
        self.index.write().unwrap().remove(&episode_id);
    }
}

/// Parse a media path into an episode, relative to the library root
///
/// Supported layouts:
/// - `<series>/<season dir>/<file>` where the season dir is `Season N` or
///   `Specials`
/// - `<series>/<file>` where the file name carries an `SxxEyy` code
fn parse_episode(root: &Path, path: &Path) -> Option<QueuedEpisode> {
    let relative = path.strip_prefix(root).ok()?;
    let components: Vec<String> = relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy().to_string())
        .collect();

    let title = path.file_stem()?.to_string_lossy().to_string();

    let (series, season) = match components.as_slice() {
        [series, season_dir, _file] => (series.clone(), parse_season_dir(season_dir)?),
        [series, file] => (series.clone(), parse_episode_code(file)?),
        _ => return None,
    };

    Some(QueuedEpisode {
        episode_id: QueuedEpisode::id_for_path(path),
        series,
        season,
        title,
        path: path.to_path_buf(),
    })
}

/// Season number from a season directory name
fn parse_season_dir(name: &str) -> Option<u32> {
    let lower = name.trim().to_lowercase();
    if lower == "specials" || lower == "season 00" {
        return Some(0);
    }

    let rest = lower.strip_prefix("season")?.trim();
    rest.parse().ok()
}

/// Season number from an `SxxEyy` episode code in a file name
fn parse_episode_code(name: &str) -> Option<u32> {
    let lower = name.to_lowercase();
    let bytes = lower.as_bytes();

    for (i, &b) in bytes.iter().enumerate() {
        if b != b's' {
            continue;
        }
        let digits: String = lower[i + 1..]
            .chars()
            .take_while(|c| c.is_ascii_digit())
            .collect();
        if digits.is_empty() {
            continue;
        }
        let after = i + 1 + digits.len();
        if bytes.get(after) == Some(&b'e') && bytes.get(after + 1).is_some_and(|c| c.is_ascii_digit()) {
            return digits.parse().ok();
        }
    }

    None
}
