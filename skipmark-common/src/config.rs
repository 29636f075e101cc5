//! Configuration loading and directory resolution
//!
//! Resolution priority for both the media library root and the data
//! directory:
//! 1. Environment variable (highest priority)
//! 2. TOML config file (`<config dir>/skipmark/config.toml`)
//! 3. OS-dependent compiled default (data dir only; the library root has
//!    no sensible default and stays unset when nothing is configured)

use crate::{Error, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Environment variable naming the TV library root
pub const LIBRARY_ROOT_ENV: &str = "SKIPMARK_LIBRARY_ROOT";

/// Environment variable naming the data directory (database, state)
pub const DATA_DIR_ENV: &str = "SKIPMARK_DATA_DIR";

/// Contents of `config.toml`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ConfigFile {
    /// Root folder of the TV library to analyze
    pub library_root: Option<PathBuf>,
    /// Directory holding the skipmark database
    pub data_dir: Option<PathBuf>,
    /// HTTP bind address, e.g. "127.0.0.1:5741"
    pub bind: Option<String>,
}

/// Load `config.toml` if present; a missing file is not an error
pub fn load_config_file() -> Result<ConfigFile> {
    let path = match config_file_path() {
        Some(p) if p.exists() => p,
        _ => return Ok(ConfigFile::default()),
    };

    let raw = std::fs::read_to_string(&path)?;
    toml::from_str(&raw).map_err(|e| Error::Config(format!("{}: {}", path.display(), e)))
}

/// Platform config file location
pub fn config_file_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("skipmark").join("config.toml"))
}

/// Resolve the TV library root, if any is configured
pub fn resolve_library_root(config: &ConfigFile) -> Option<PathBuf> {
    if let Ok(path) = std::env::var(LIBRARY_ROOT_ENV) {
        if !path.is_empty() {
            return Some(PathBuf::from(path));
        }
    }

    config.library_root.clone()
}

/// Resolve the data directory, falling back to the platform default
pub fn resolve_data_dir(config: &ConfigFile) -> PathBuf {
    if let Ok(path) = std::env::var(DATA_DIR_ENV) {
        if !path.is_empty() {
            return PathBuf::from(path);
        }
    }

    if let Some(dir) = &config.data_dir {
        return dir.clone();
    }

    default_data_dir()
}

/// OS-dependent default data directory
fn default_data_dir() -> PathBuf {
    dirs::data_local_dir()
        .map(|d| d.join("skipmark"))
        .unwrap_or_else(|| PathBuf::from("./skipmark_data"))
}

/// Ensure the data directory exists and return the database path inside it
pub fn ensure_data_dir(data_dir: &Path) -> Result<PathBuf> {
    std::fs::create_dir_all(data_dir)?;
    Ok(data_dir.join("skipmark.db"))
}
