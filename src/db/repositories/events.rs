use crate::db::models::{Event, EventKind, EventStatus, Feature, FeatureCollection, NewEvent};
use crate::error::Error;
use anyhow::Result;
use sqlx::SqlitePool;
use std::sync::Arc;
use tracing::{debug, info};

const EVENT_COLUMNS: &str =
    "id, ts, type, lat, lon, user_id, group_id, text, photo_file_id, status, contact";

/// Default cap for list queries
pub const DEFAULT_LIMIT: i64 = 100;

/// Cap for the public map feed
pub const MAP_FEED_LIMIT: i64 = 5000;

/// Event row joined with the number of photos attached to it
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct EventWithPhotoCount {
    #[sqlx(flatten)]
    pub event: Event,
    pub photo_count: i64,
}

/// Longitude ranges covered by `lon ± radius`. A span crossing ±180 is
/// split in two; otherwise both ranges are the same.
fn longitude_spans(lon: f64, radius: f64) -> [(f64, f64); 2] {
    let (west, east) = (lon - radius, lon + radius);
    if radius >= 180.0 {
        [(-180.0, 180.0); 2]
    } else if west < -180.0 {
        [(west + 360.0, 180.0), (-180.0, east)]
    } else if east > 180.0 {
        [(west, 180.0), (-180.0, east - 360.0)]
    } else {
        [(west, east); 2]
    }
}

/// Events repository for handling event operations
#[derive(Clone)]
pub struct EventsRepository {
    pool: Arc<SqlitePool>,
}

impl EventsRepository {
    /// Create a new events repository
    pub fn new(pool: Arc<SqlitePool>) -> Self {
        Self { pool }
    }

    /// Create a new event
    pub async fn create(&self, event: &NewEvent) -> Result<Event> {
        event.validate()?;

        let result = sqlx::query_as::<_, Event>(&format!(
            r#"
            INSERT INTO events (ts, type, lat, lon, user_id, group_id, text, photo_file_id, status, contact)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            RETURNING {}
            "#,
            EVENT_COLUMNS
        ))
        .bind(event.ts)
        .bind(event.kind)
        .bind(event.lat)
        .bind(event.lon)
        .bind(event.user_id)
        .bind(&event.group_id)
        .bind(&event.text)
        .bind(&event.photo_file_id)
        .bind(event.status.unwrap_or_default())
        .bind(&event.contact)
        .fetch_one(&*self.pool)
        .await
        .map_err(|e| Error::from_sqlx("Failed to create event", e))?;

        info!("Created {} event {}", result.kind, result.id);

        Ok(result)
    }

    /// Get event by ID
    pub async fn get_by_id(&self, id: i64) -> Result<Option<Event>> {
        let result = sqlx::query_as::<_, Event>(&format!(
            "SELECT {} FROM events WHERE id = ?",
            EVENT_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&*self.pool)
        .await
        .map_err(|e| Error::from_sqlx("Failed to get event by ID", e))?;

        Ok(result)
    }

    /// Set the status of an event
    pub async fn update_status(&self, id: i64, status: EventStatus) -> Result<Event> {
        let result = sqlx::query_as::<_, Event>(&format!(
            "UPDATE events SET status = ? WHERE id = ? RETURNING {}",
            EVENT_COLUMNS
        ))
        .bind(status)
        .bind(id)
        .fetch_optional(&*self.pool)
        .await
        .map_err(|e| Error::from_sqlx("Failed to update event status", e))?
        .ok_or_else(|| Error::NotFound(format!("Event not found: {}", id)))?;

        info!("Event {} is now {}", id, status);

        Ok(result)
    }

    /// Delete an event together with its photos
    pub async fn delete(&self, id: i64) -> Result<bool> {
        let result = sqlx::query("DELETE FROM events WHERE id = ?")
            .bind(id)
            .execute(&*self.pool)
            .await
            .map_err(|e| Error::from_sqlx("Failed to delete event", e))?;

        let deleted = result.rows_affected() > 0;
        if deleted {
            info!("Deleted event {}", id);
        }

        Ok(deleted)
    }

    /// Delete an event only if it was reported by `owner_user_id`.
    ///
    /// Events without a reporting user cannot be removed this way.
    pub async fn delete_by_owner(&self, id: i64, owner_user_id: i64) -> Result<bool> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| Error::from_sqlx("Failed to start transaction", e))?;

        let owner: Option<Option<i64>> =
            sqlx::query_scalar("SELECT user_id FROM events WHERE id = ?")
                .bind(id)
                .fetch_optional(&mut *tx)
                .await
                .map_err(|e| Error::from_sqlx("Failed to look up event owner", e))?;

        if owner.flatten() != Some(owner_user_id) {
            debug!("Refusing delete of event {} for user {}", id, owner_user_id);
            return Ok(false);
        }

        sqlx::query("DELETE FROM events WHERE id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(|e| Error::from_sqlx("Failed to delete event", e))?;

        tx.commit()
            .await
            .map_err(|e| Error::from_sqlx("Failed to commit delete", e))?;

        info!("User {} deleted event {}", owner_user_id, id);

        Ok(true)
    }

    /// Get events of one type, newest first
    pub async fn get_by_type(&self, kind: EventKind, limit: Option<i64>) -> Result<Vec<Event>> {
        let limit = limit.unwrap_or(DEFAULT_LIMIT);

        let result = sqlx::query_as::<_, Event>(&format!(
            "SELECT {} FROM events WHERE type = ? ORDER BY ts DESC LIMIT ?",
            EVENT_COLUMNS
        ))
        .bind(kind)
        .bind(limit)
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| Error::from_sqlx("Failed to get events by type", e))?;

        Ok(result)
    }

    /// Get events inside a box of `radius_deg` degrees around a point,
    /// newest first. The longitude span wraps across the antimeridian.
    pub async fn get_near(
        &self,
        lat: f64,
        lon: f64,
        radius_deg: f64,
        limit: Option<i64>,
    ) -> Result<Vec<Event>> {
        crate::db::models::event_models::validate_point(lat, lon)?;
        if !radius_deg.is_finite() || radius_deg < 0.0 {
            return Err(Error::Validation(format!("Invalid radius: {}", radius_deg)).into());
        }
        let limit = limit.unwrap_or(DEFAULT_LIMIT);
        let [(west_a, east_a), (west_b, east_b)] = longitude_spans(lon, radius_deg);

        let result = sqlx::query_as::<_, Event>(&format!(
            r#"
            SELECT {}
            FROM events
            WHERE lat BETWEEN ? AND ?
              AND (lon BETWEEN ? AND ? OR lon BETWEEN ? AND ?)
            ORDER BY ts DESC
            LIMIT ?
            "#,
            EVENT_COLUMNS
        ))
        .bind(lat - radius_deg)
        .bind(lat + radius_deg)
        .bind(west_a)
        .bind(east_a)
        .bind(west_b)
        .bind(east_b)
        .bind(limit)
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| Error::from_sqlx("Failed to get events near point", e))?;

        Ok(result)
    }

    /// Events that have coordinates, newest first, with their photo counts
    pub async fn get_located(&self, limit: Option<i64>) -> Result<Vec<EventWithPhotoCount>> {
        let limit = limit.unwrap_or(MAP_FEED_LIMIT);

        let result = sqlx::query_as::<_, EventWithPhotoCount>(
            r#"
            SELECT e.id, e.ts, e.type, e.lat, e.lon, e.user_id, e.group_id, e.text,
                   e.photo_file_id, e.status, e.contact,
                   (SELECT COUNT(1) FROM photos p WHERE p.event_id = e.id) AS photo_count
            FROM events e
            WHERE e.lat IS NOT NULL AND e.lon IS NOT NULL
            ORDER BY e.ts DESC
            LIMIT ?
            "#,
        )
        .bind(limit)
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| Error::from_sqlx("Failed to get located events", e))?;

        Ok(result)
    }

    /// Public map feed as a GeoJSON feature collection
    pub async fn feature_collection(&self) -> Result<FeatureCollection> {
        let features = self
            .get_located(None)
            .await?
            .iter()
            .filter_map(|row| Feature::from_event(&row.event, row.photo_count))
            .collect();

        Ok(FeatureCollection::new(features))
    }
}
