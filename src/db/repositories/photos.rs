use crate::db::models::{NewPhoto, Photo};
use crate::error::Error;
use anyhow::Result;
use sqlx::SqlitePool;
use std::sync::Arc;
use tracing::info;

/// Photos repository for handling photo operations
#[derive(Clone)]
pub struct PhotosRepository {
    pool: Arc<SqlitePool>,
}

impl PhotosRepository {
    /// Create a new photos repository
    pub fn new(pool: Arc<SqlitePool>) -> Self {
        Self { pool }
    }

    /// Attach a photo to an existing event
    pub async fn attach(&self, photo: &NewPhoto) -> Result<Photo> {
        if photo.file_id.trim().is_empty() {
            return Err(Error::Validation("Photo file id must not be empty".to_string()).into());
        }

        let result = sqlx::query_as::<_, Photo>(
            r#"
            INSERT INTO photos (event_id, ts, file_id)
            VALUES (?, ?, ?)
            RETURNING id, event_id, ts, file_id
            "#,
        )
        .bind(photo.event_id)
        .bind(photo.ts)
        .bind(&photo.file_id)
        .fetch_one(&*self.pool)
        .await
        .map_err(|e| Error::from_sqlx("Failed to attach photo", e))?;

        info!("Attached photo {} to event {}", result.id, result.event_id);

        Ok(result)
    }

    /// Photos of an event, newest first
    pub async fn get_by_event(&self, event_id: i64) -> Result<Vec<Photo>> {
        let result = sqlx::query_as::<_, Photo>(
            r#"
            SELECT id, event_id, ts, file_id
            FROM photos
            WHERE event_id = ?
            ORDER BY ts DESC, id DESC
            "#,
        )
        .bind(event_id)
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| Error::from_sqlx("Failed to get photos for event", e))?;

        Ok(result)
    }

    /// Number of photos attached to an event
    pub async fn count_by_event(&self, event_id: i64) -> Result<i64> {
        let count = sqlx::query_scalar("SELECT COUNT(*) FROM photos WHERE event_id = ?")
            .bind(event_id)
            .fetch_one(&*self.pool)
            .await
            .map_err(|e| Error::from_sqlx("Failed to count photos", e))?;

        Ok(count)
    }
}
