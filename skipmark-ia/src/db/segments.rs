//! Detected segment persistence
//!
//! The `media_segments` table is the durable backing of the in-process
//! segment cache; rows are upserted as seasons finish analyzing and the
//! whole table is loaded once at startup.

use crate::models::MediaSegment;
use skipmark_common::{Error, Result};
use sqlx::{Pool, Sqlite};
use uuid::Uuid;

/// Upsert one detected segment
pub async fn save_segment(db: &Pool<Sqlite>, segment: &MediaSegment) -> Result<()> {
    sqlx::query(
        "INSERT INTO media_segments (episode_id, start_seconds, end_seconds, updated_at)
         VALUES (?, ?, ?, ?)
         ON CONFLICT(episode_id) DO UPDATE SET
             start_seconds = excluded.start_seconds,
             end_seconds = excluded.end_seconds,
             updated_at = excluded.updated_at",
    )
    .bind(segment.episode_id.to_string())
    .bind(segment.start)
    .bind(segment.end)
    .bind(chrono::Utc::now().to_rfc3339())
    .execute(db)
    .await
    .map_err(Error::Database)?;

    Ok(())
}

/// Upsert a batch of detected segments
pub async fn save_segments(db: &Pool<Sqlite>, segments: &[MediaSegment]) -> Result<()> {
    for segment in segments {
        save_segment(db, segment).await?;
    }
    Ok(())
}

/// Load every persisted segment (startup cache warm-up)
pub async fn load_all_segments(db: &Pool<Sqlite>) -> Result<Vec<MediaSegment>> {
    let rows: Vec<(String, f64, f64)> =
        sqlx::query_as("SELECT episode_id, start_seconds, end_seconds FROM media_segments")
            .fetch_all(db)
            .await
            .map_err(Error::Database)?;

    let mut segments = Vec::with_capacity(rows.len());
    for (raw_id, start, end) in rows {
        let episode_id = Uuid::parse_str(&raw_id)
            .map_err(|e| Error::Internal(format!("corrupt episode id {}: {}", raw_id, e)))?;
        segments.push(MediaSegment {
            episode_id,
            start,
            end,
        });
    }

    Ok(segments)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_pool;

    fn segment(start: f64, end: f64) -> MediaSegment {
        MediaSegment {
            episode_id: Uuid::new_v4(),
            start,
            end,
        }
    }

    #[tokio::test]
    async fn test_save_and_load_round_trip() {
        let pool = test_pool().await;

        let first = segment(10.0, 95.5);
        let second = segment(0.0, 62.0);
        save_segments(&pool, &[first.clone(), second.clone()]).await.unwrap();

        let mut loaded = load_all_segments(&pool).await.unwrap();
        loaded.sort_by(|a, b| a.start.partial_cmp(&b.start).unwrap());

        assert_eq!(loaded.len(), 2);
        assert_eq!(loaded[0], second);
        assert_eq!(loaded[1], first);
    }

    #[tokio::test]
    async fn test_save_segment_upserts() {
        let pool = test_pool().await;

        let mut seg = segment(10.0, 90.0);
        save_segment(&pool, &seg).await.unwrap();

        // Re-analysis of the same episode replaces the stored boundaries
        seg.start = 12.0;
        seg.end = 101.0;
        save_segment(&pool, &seg).await.unwrap();

        let loaded = load_all_segments(&pool).await.unwrap();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0], seg);
    }

    #[tokio::test]
    async fn test_load_empty_table() {
        let pool = test_pool().await;
        assert!(load_all_segments(&pool).await.unwrap().is_empty());
    }
}
