//! Settings database operations
//!
//! Typed get/set accessors over the key/value `settings` table. Values are
//! stored as strings and parsed on read; writes are UPSERTs.

use crate::models::{AnalysisSettings, MarkerMode};
use sqlx::{Pool, Sqlite};
use skipmark_common::{Error, Result};

/// Get or auto-initialize the season-level parallelism limit
///
/// If unset, the CPU core count is computed and persisted so later runs
/// (and the settings API) see a concrete value.
pub async fn get_or_init_max_parallelism(db: &Pool<Sqlite>) -> Result<usize> {
    match get_setting::<usize>(db, "max_parallelism").await? {
        Some(count) if count > 0 => Ok(count),
        _ => {
            let cpu_count = num_cpus::get();
            set_setting(db, "max_parallelism", cpu_count).await?;

            tracing::debug!(cpu_count, "Auto-initialized max_parallelism");

            Ok(cpu_count)
        }
    }
}

/// Set the season-level parallelism limit
pub async fn set_max_parallelism(db: &Pool<Sqlite>, count: usize) -> Result<()> {
    if count == 0 {
        return Err(Error::Config("max_parallelism must be at least 1".to_string()));
    }
    set_setting(db, "max_parallelism", count).await
}

/// Whether the Specials group (season 0) is analyzed
///
/// **Default:** false
pub async fn get_analyze_specials(db: &Pool<Sqlite>) -> Result<bool> {
    get_setting(db, "analyze_specials").await.map(|opt| opt.unwrap_or(false))
}

/// Opt in or out of analyzing the Specials group
pub async fn set_analyze_specials(db: &Pool<Sqlite>, enabled: bool) -> Result<()> {
    set_setting(db, "analyze_specials", enabled).await
}

/// One-shot marker regeneration flag
///
/// **Default:** false. Read at run start; cleared exactly once after the
/// run completes.
pub async fn get_regenerate_markers(db: &Pool<Sqlite>) -> Result<bool> {
    get_setting(db, "regenerate_markers").await.map(|opt| opt.unwrap_or(false))
}

/// Set or clear the one-shot marker regeneration flag
pub async fn set_regenerate_markers(db: &Pool<Sqlite>, enabled: bool) -> Result<()> {
    set_setting(db, "regenerate_markers", enabled).await
}

/// Marker output mode
///
/// **Default:** on_change
pub async fn get_marker_mode(db: &Pool<Sqlite>) -> Result<MarkerMode> {
    match get_setting::<String>(db, "marker_mode").await? {
        Some(raw) => raw.parse().map_err(Error::Config),
        None => Ok(MarkerMode::OnChange),
    }
}

/// Set the marker output mode
pub async fn set_marker_mode(db: &Pool<Sqlite>, mode: MarkerMode) -> Result<()> {
    set_setting(db, "marker_mode", mode).await
}

/// Load the full settings snapshot a run operates on
pub async fn load_analysis_settings(db: &Pool<Sqlite>) -> Result<AnalysisSettings> {
    Ok(AnalysisSettings {
        max_parallelism: get_or_init_max_parallelism(db).await?,
        analyze_specials: get_analyze_specials(db).await?,
        regenerate_markers: get_regenerate_markers(db).await?,
        marker_mode: get_marker_mode(db).await?,
    })
}

/// Generic setting getter (internal)
async fn get_setting<T>(db: &Pool<Sqlite>, key: &str) -> Result<Option<T>>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    let row: Option<(String,)> = sqlx::query_as("SELECT value FROM settings WHERE key = ?")
        .bind(key)
        .fetch_optional(db)
        .await
        .map_err(Error::Database)?;

    match row {
        Some((value,)) => {
            let parsed = value
                .parse::<T>()
                .map_err(|e| Error::Config(format!("Parse setting {} failed: {}", key, e)))?;
            Ok(Some(parsed))
        }
        None => Ok(None),
    }
}

/// Generic setting setter (internal)
async fn set_setting<T>(db: &Pool<Sqlite>, key: &str, value: T) -> Result<()>
where
    T: std::fmt::Display,
{
    sqlx::query(
        "INSERT INTO settings (key, value) VALUES (?, ?)
         ON CONFLICT(key) DO UPDATE SET value = excluded.value",
    )
    .bind(key)
    .bind(value.to_string())
    .execute(db)
    .await
    .map_err(Error::Database)?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_pool;

    #[tokio::test]
    async fn test_defaults() {
        let pool = test_pool().await;

        assert!(!get_analyze_specials(&pool).await.unwrap());
        assert!(!get_regenerate_markers(&pool).await.unwrap());
        assert_eq!(get_marker_mode(&pool).await.unwrap(), MarkerMode::OnChange);
    }

    #[tokio::test]
    async fn test_max_parallelism_auto_init_persists() {
        let pool = test_pool().await;

        let first = get_or_init_max_parallelism(&pool).await.unwrap();
        assert!(first >= 1);

        // Second read must come from the persisted row, not recompute
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM settings WHERE key = 'max_parallelism'")
                .fetch_one(&pool)
                .await
                .unwrap();
        assert_eq!(count, 1);

        let second = get_or_init_max_parallelism(&pool).await.unwrap();
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_set_max_parallelism_rejects_zero() {
        let pool = test_pool().await;
        assert!(set_max_parallelism(&pool, 0).await.is_err());
    }

    #[tokio::test]
    async fn test_regenerate_flag_round_trip() {
        let pool = test_pool().await;

        set_regenerate_markers(&pool, true).await.unwrap();
        assert!(get_regenerate_markers(&pool).await.unwrap());

        set_regenerate_markers(&pool, false).await.unwrap();
        assert!(!get_regenerate_markers(&pool).await.unwrap());
    }

    #[tokio::test]
    async fn test_marker_mode_round_trip() {
        let pool = test_pool().await;

        set_marker_mode(&pool, MarkerMode::Always).await.unwrap();
        assert_eq!(get_marker_mode(&pool).await.unwrap(), MarkerMode::Always);

        set_marker_mode(&pool, MarkerMode::None).await.unwrap();
        assert_eq!(get_marker_mode(&pool).await.unwrap(), MarkerMode::None);
    }

    #[tokio::test]
    async fn test_load_analysis_settings_snapshot() {
        let pool = test_pool().await;

        set_analyze_specials(&pool, true).await.unwrap();
        set_regenerate_markers(&pool, true).await.unwrap();

        let settings = load_analysis_settings(&pool).await.unwrap();
        assert!(settings.analyze_specials);
        assert!(settings.regenerate_markers);
        assert!(settings.max_parallelism >= 1);
        assert_eq!(settings.marker_mode, MarkerMode::OnChange);
    }
}
