//! Run-tunable analysis settings
//!
//! Stored in the `settings` key/value table; see `db::settings` for the
//! typed accessors. `AnalysisSettings` is the snapshot a run operates on.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// How marker files are written
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MarkerMode {
    /// Never write marker files
    None,
    /// Write whenever a season produced new analysis results (or the
    /// regenerate flag was set for the run)
    OnChange,
    /// Same write decision as OnChange; rewrites are never skipped for
    /// already-existing marker files
    Always,
}

impl FromStr for MarkerMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "none" => Ok(MarkerMode::None),
            "on_change" => Ok(MarkerMode::OnChange),
            "always" => Ok(MarkerMode::Always),
            other => Err(format!("unknown marker mode: {}", other)),
        }
    }
}

impl fmt::Display for MarkerMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            MarkerMode::None => "none",
            MarkerMode::OnChange => "on_change",
            MarkerMode::Always => "always",
        };
        f.write_str(s)
    }
}

/// Settings snapshot read at run start
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisSettings {
    /// Number of seasons analyzed concurrently
    pub max_parallelism: usize,
    /// Opt-in for analyzing the reserved Specials group (season 0)
    pub analyze_specials: bool,
    /// One-shot flag: rewrite markers for every verified season this run,
    /// cleared after the run completes
    pub regenerate_markers: bool,
    /// Marker output mode
    pub marker_mode: MarkerMode,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_marker_mode_round_trip() {
        for mode in [MarkerMode::None, MarkerMode::OnChange, MarkerMode::Always] {
            let parsed: MarkerMode = mode.to_string().parse().unwrap();
            assert_eq!(parsed, mode);
        }
    }

    #[test]
    fn test_marker_mode_rejects_unknown() {
        assert!("sometimes".parse::<MarkerMode>().is_err());
    }
}
