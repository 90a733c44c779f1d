use crate::config::DatabaseConfig;
use crate::error::Error;
use anyhow::Result;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};

pub mod migrations;
pub mod models;
pub mod repositories;

/// Database service for handling connections and migrations
pub struct DatabaseService {
    pub pool: Arc<SqlitePool>,
    config: DatabaseConfig,
}

impl DatabaseService {
    /// Create a new database service
    pub async fn new(config: &DatabaseConfig) -> Result<Self> {
        info!("Initializing Database service");

        let pool = connect_pool(&config.url, config.max_connections).await?;

        info!("Connected to SQLite database at {}", config.url);

        let service = Self {
            pool: Arc::new(pool),
            config: config.clone(),
        };

        if service.config.auto_migrate {
            service.run_migrations().await?;
        }

        Ok(service)
    }

    /// Run database migrations
    pub async fn run_migrations(&self) -> Result<()> {
        info!("Running database migrations");

        migrations::run_migrations(&self.pool)
            .await
            .map_err(|e| Error::Database(format!("Failed to run migrations: {:#}", e)))?;

        info!("Database migrations completed successfully");

        Ok(())
    }

    /// Health check for database
    pub async fn health_check(&self) -> bool {
        check_pool(&self.pool).await
    }
}

/// Ping the database with a trivial query
pub async fn check_pool(pool: &SqlitePool) -> bool {
    match sqlx::query("SELECT 1").execute(pool).await {
        Ok(_) => true,
        Err(e) => {
            error!("Database health check failed: {}", e);
            false
        }
    }
}

/// Open a SQLite pool with foreign keys enforced.
///
/// An in-memory database lives only as long as its connection, so such URLs
/// get a single connection that is never recycled.
pub async fn connect_pool(url: &str, max_connections: u32) -> Result<SqlitePool> {
    let options = SqliteConnectOptions::from_str(url)
        .map_err(|e| Error::Config(format!("Invalid database URL {}: {}", url, e)))?
        .create_if_missing(true)
        .foreign_keys(true);

    let pool_options = if url.contains(":memory:") || url.contains("mode=memory") {
        SqlitePoolOptions::new()
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
    } else {
        SqlitePoolOptions::new().max_connections(max_connections.max(1))
    };

    let pool = pool_options
        .acquire_timeout(Duration::from_secs(5))
        .connect_with(options)
        .await
        .map_err(|e| Error::Database(format!("Failed to connect to database: {}", e)))?;

    Ok(pool)
}

#[cfg(test)]
pub(crate) async fn test_pool() -> Result<Arc<SqlitePool>> {
    let pool = connect_pool("sqlite::memory:", 1).await?;
    migrations::run_migrations(&pool).await?;
    Ok(Arc::new(pool))
}
