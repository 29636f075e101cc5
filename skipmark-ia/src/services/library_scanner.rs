//! Media file scanner
//!
//! Recursive video file discovery with container verification. Two-phase:
//! sequential directory traversal (symlink-loop safe), then parallel
//! magic-byte verification of the candidates.

use rayon::prelude::*;
use std::collections::HashSet;
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};
use thiserror::Error;
use walkdir::{DirEntry, WalkDir};

/// Media scanner errors
#[derive(Debug, Error)]
pub enum ScanError {
    /// Specified path does not exist
    #[error("Path not found: {0}")]
    PathNotFound(PathBuf),

    /// Path exists but is not a directory
    #[error("Not a directory: {0}")]
    NotADirectory(PathBuf),

    /// Cannot access file
    #[error("File access error {0}: {1}")]
    FileAccessError(PathBuf, String),
}

/// Video file scanner
pub struct LibraryScanner {
    ignore_patterns: Vec<String>,
    max_depth: Option<usize>,
}

impl LibraryScanner {
    /// Create a new scanner with default ignore patterns
    pub fn new() -> Self {
        Self {
            ignore_patterns: vec![
                ".DS_Store".to_string(),
                "Thumbs.db".to_string(),
                ".git".to_string(),
                "@eaDir".to_string(),
                "extras".to_string(),
            ],
            max_depth: None,
        }
    }

    /// Scan a library root for video files
    pub fn scan(&self, root_path: &Path) -> Result<Vec<PathBuf>, ScanError> {
        if !root_path.exists() {
            return Err(ScanError::PathNotFound(root_path.to_path_buf()));
        }

        if !root_path.is_dir() {
            return Err(ScanError::NotADirectory(root_path.to_path_buf()));
        }

        // Phase 1: sequential traversal; symlink_visited is mutable state
        let mut candidate_files = Vec::new();
        let mut symlink_visited = HashSet::new();

        let walker = WalkDir::new(root_path)
            .follow_links(false)
            .max_depth(self.max_depth.unwrap_or(usize::MAX))
            .into_iter()
            .filter_entry(|e| self.should_process_entry(e, &mut symlink_visited));

        for entry in walker {
            match entry {
                Ok(entry) => {
                    if entry.file_type().is_file() {
                        candidate_files.push(entry.path().to_path_buf());
                    }
                }
                Err(e) => {
                    tracing::warn!("Error accessing entry: {}", e);
                    // Continue scanning, don't abort
                }
            }
        }

        tracing::debug!(
            "Phase 1 complete: {} candidate files discovered",
            candidate_files.len()
        );

        // Phase 2: parallel container verification
        let mut video_files: Vec<PathBuf> = candidate_files
            .par_iter()
            .filter_map(|path| match self.is_video_file(path) {
                Ok(true) => Some(path.clone()),
                Ok(false) => None,
                Err(e) => {
                    tracing::warn!("Error verifying {}: {}", path.display(), e);
                    None
                }
            })
            .collect();

        // par_iter output order is nondeterministic; keep results stable
        video_files.sort();

        tracing::debug!(
            "Phase 2 complete: {} video files verified from {} candidates",
            video_files.len(),
            candidate_files.len()
        );

        Ok(video_files)
    }

    /// Check if entry should be processed
    fn should_process_entry(
        &self,
        entry: &DirEntry,
        symlink_visited: &mut HashSet<PathBuf>,
    ) -> bool {
        let path = entry.path();
        let file_name = entry.file_name().to_string_lossy();

        for pattern in &self.ignore_patterns {
            if file_name.eq_ignore_ascii_case(pattern) {
                return false;
            }
        }

        // Detect symlink loops
        if entry.file_type().is_symlink() {
            if let Ok(canonical) = path.canonicalize() {
                if !symlink_visited.insert(canonical) {
                    tracing::warn!("Symlink loop detected: {}", path.display());
                    return false;
                }
            }
        }

        true
    }

    /// Check if file is a video container
    fn is_video_file(&self, path: &Path) -> Result<bool, ScanError> {
        // 1. Check extension first (fast)
        if let Some(ext) = path.extension() {
            let ext_lower = ext.to_string_lossy().to_lowercase();
            if self.is_video_extension(&ext_lower) {
                // 2. Verify with magic bytes (reliable)
                return self.verify_magic_bytes(path);
            }
        }

        Ok(false)
    }

    /// Check if extension is video
    fn is_video_extension(&self, ext: &str) -> bool {
        matches!(
            ext,
            "mkv" | "webm" | "mp4" | "m4v" | "mov" | "avi" | "ts" | "wmv"
        )
    }

    /// Verify container type using magic bytes
    fn verify_magic_bytes(&self, path: &Path) -> Result<bool, ScanError> {
        let mut file = File::open(path)
            .map_err(|e| ScanError::FileAccessError(path.to_path_buf(), e.to_string()))?;

        let mut buffer = [0u8; 16];
        let bytes_read = file
            .read(&mut buffer)
            .map_err(|e| ScanError::FileAccessError(path.to_path_buf(), e.to_string()))?;

        if bytes_read < 4 {
            return Ok(false); // Too small to be a container
        }

        let is_video = match &buffer[..bytes_read.min(16)] {
            // Matroska / WebM (EBML header)
            [0x1A, 0x45, 0xDF, 0xA3, ..] => true,

            // MP4 / M4V / MOV (ftyp box after 4-byte size)
            [_, _, _, _, b'f', b't', b'y', b'p', ..] => true,
            [_, _, _, _, b'm', b'o', b'o', b'v', ..] => true,

            // AVI
            [b'R', b'I', b'F', b'F', _, _, _, _, b'A', b'V', b'I', b' ', ..] => true,

            // MPEG-TS (sync byte)
            [0x47, ..] => true,

            // ASF / WMV
            [0x30, 0x26, 0xB2, 0x75, ..] => true,

            _ => false,
        };

        Ok(is_video)
    }
}

impl Default for LibraryScanner {
    fn default() -> Self {
        Self::new()
    }
}
