use anyhow::{Context, Result};
use chrono::Utc;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::{debug, info, warn};

/// Embedded migrations, applied in order and recorded in `_migrations`.
const MIGRATIONS: &[(&str, &str)] = &[
    (
        "0001_create_events",
        include_str!("sql/0001_create_events.sql"),
    ),
    (
        "0002_create_photos",
        include_str!("sql/0002_create_photos.sql"),
    ),
];

pub async fn run_migrations(pool: &SqlitePool) -> Result<()> {
    sqlx::raw_sql(
        r#"
        CREATE TABLE IF NOT EXISTS _migrations (
            name TEXT PRIMARY KEY,
            applied_at INTEGER NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await
    .context("Failed to create migrations table")?;

    upgrade_legacy_schema(pool).await?;

    let applied: Vec<String> = sqlx::query_scalar("SELECT name FROM _migrations")
        .fetch_all(pool)
        .await
        .context("Failed to read applied migrations")?;

    for (name, sql) in MIGRATIONS {
        if applied.iter().any(|a| a.as_str() == *name) {
            debug!("Migration already applied: {}", name);
            continue;
        }

        let mut tx = pool.begin().await?;
        sqlx::raw_sql(*sql)
            .execute(&mut *tx)
            .await
            .with_context(|| format!("Failed to apply migration {}", name))?;
        sqlx::query("INSERT INTO _migrations (name, applied_at) VALUES (?, ?)")
            .bind(*name)
            .bind(Utc::now().timestamp())
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;

        info!("Applied migration: {}", name);
    }

    Ok(())
}

const CREATE_EVENTS: &str = "0001_create_events";

const EVENT_TYPES: &str = "'volunteer', 'fire', 'safe', 'note'";
const EVENT_STATUSES: &str = "'active', 'verified', 'resolved'";

/// Rebuild tables written by earlier releases, which predate `_migrations`.
///
/// Those files carry an `events` table without the type/status checks and
/// with an integer `group_id`, and may lack `contact` or name the photo
/// timestamp `created_at`. Both tables are recreated with the current
/// layout and their rows copied over in one transaction. Unknown types are
/// kept as `note`, unknown or missing statuses become `active` and photos
/// of vanished events are dropped.
async fn upgrade_legacy_schema(pool: &SqlitePool) -> Result<()> {
    let event_columns = table_columns(pool, "events").await?;
    if event_columns.is_empty() {
        return Ok(());
    }

    let recorded: Option<String> = sqlx::query_scalar("SELECT name FROM _migrations WHERE name = ?")
        .bind(CREATE_EVENTS)
        .fetch_optional(pool)
        .await
        .context("Failed to read applied migrations")?;
    if recorded.is_some() {
        return Ok(());
    }

    warn!("Found tables from an earlier release, rebuilding them");

    let has = |columns: &[String], name: &str| columns.iter().any(|c| c == name);
    let contact = if has(&event_columns, "contact") { "contact" } else { "NULL" };

    let mut tx = pool.begin().await?;

    sqlx::raw_sql(&format!(
        r#"
        CREATE TABLE events_new (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            ts INTEGER NOT NULL,
            type TEXT NOT NULL CHECK (type IN ({types})),
            lat REAL,
            lon REAL,
            user_id INTEGER,
            group_id TEXT,
            text TEXT,
            photo_file_id TEXT,
            status TEXT NOT NULL DEFAULT 'active' CHECK (status IN ({statuses})),
            contact TEXT
        );

        INSERT INTO events_new
            (id, ts, type, lat, lon, user_id, group_id, text, photo_file_id, status, contact)
        SELECT
            id,
            ts,
            CASE WHEN type IN ({types}) THEN type ELSE 'note' END,
            lat,
            lon,
            user_id,
            CAST(group_id AS TEXT),
            text,
            photo_file_id,
            CASE WHEN status IN ({statuses}) THEN status ELSE 'active' END,
            {contact}
        FROM events;
        "#,
        types = EVENT_TYPES,
        statuses = EVENT_STATUSES,
        contact = contact,
    ))
    .execute(&mut *tx)
    .await
    .context("Failed to copy legacy events")?;

    let photo_columns = table_columns_in(&mut *tx, "photos").await?;
    if !photo_columns.is_empty() {
        let ts = if has(&photo_columns, "ts") {
            "ts"
        } else if has(&photo_columns, "created_at") {
            "created_at"
        } else {
            "NULL"
        };

        // photos_new points at events_new; the rename below rewrites the
        // reference to `events`.
        sqlx::raw_sql(&format!(
            r#"
            CREATE TABLE photos_new (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                event_id INTEGER NOT NULL,
                ts INTEGER NOT NULL,
                file_id TEXT NOT NULL,
                FOREIGN KEY (event_id) REFERENCES events_new (id) ON DELETE CASCADE
            );

            INSERT INTO photos_new (id, event_id, ts, file_id)
            SELECT id, event_id, COALESCE({ts}, CAST(strftime('%s', 'now') AS INTEGER)), file_id
            FROM photos
            WHERE event_id IN (SELECT id FROM events_new) AND file_id IS NOT NULL;

            DROP TABLE photos;
            "#,
            ts = ts,
        ))
        .execute(&mut *tx)
        .await
        .context("Failed to copy legacy photos")?;
    }

    sqlx::raw_sql(
        r#"
        DROP TABLE events;
        ALTER TABLE events_new RENAME TO events;
        "#,
    )
    .execute(&mut *tx)
    .await
    .context("Failed to replace legacy events table")?;

    if !photo_columns.is_empty() {
        sqlx::query("ALTER TABLE photos_new RENAME TO photos")
            .execute(&mut *tx)
            .await
            .context("Failed to replace legacy photos table")?;
    }

    tx.commit().await?;
    info!("Rebuilt legacy events and photos tables");

    Ok(())
}

async fn table_columns(pool: &SqlitePool, table: &str) -> Result<Vec<String>> {
    let mut conn = pool.acquire().await?;
    table_columns_in(&mut *conn, table).await
}

async fn table_columns_in(conn: &mut SqliteConnection, table: &str) -> Result<Vec<String>> {
    let columns = sqlx::query_scalar("SELECT name FROM pragma_table_info(?)")
        .bind(table)
        .fetch_all(conn)
        .await
        .with_context(|| format!("Failed to inspect table {}", table))?;

    Ok(columns)
}
