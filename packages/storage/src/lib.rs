// ABOUTME: Database connection management and shared storage errors
// ABOUTME: Provides SQLite pool bootstrap and migrations for all portal entities

use chrono::{DateTime, Utc};
use sqlx::migrate::{MigrateDatabase, Migrator};
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};
use std::path::Path;
use thiserror::Error;
use tracing::{debug, info};

/// Embedded migrations for the portal schema
pub static MIGRATOR: Migrator = sqlx::migrate!("./migrations");

/// Storage errors
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Database error: {0}")]
    Database(String),
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
    #[error("Sqlx error: {0}")]
    Sqlx(#[from] sqlx::Error),
    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Record not found")]
    NotFound,
    #[error("Invalid stored value: {0}")]
    InvalidValue(String),
}

pub type StorageResult<T> = Result<T, StorageError>;

/// Open (creating if missing) a file-backed portal database and run migrations
pub async fn connect(database_path: &Path) -> StorageResult<SqlitePool> {
    // Ensure parent directory exists
    if let Some(parent) = database_path.parent() {
        std::fs::create_dir_all(parent).map_err(StorageError::Io)?;
    }

    let database_url = format!("sqlite:{}", database_path.display());

    if !sqlx::Sqlite::database_exists(&database_url)
        .await
        .map_err(StorageError::Sqlx)?
    {
        debug!("Creating database at: {}", database_url);
        sqlx::Sqlite::create_database(&database_url)
            .await
            .map_err(StorageError::Sqlx)?;
    }

    let pool = SqlitePoolOptions::new()
        .max_connections(10)
        .acquire_timeout(std::time::Duration::from_secs(30))
        .connect(&database_url)
        .await
        .map_err(StorageError::Sqlx)?;

    sqlx::query("PRAGMA journal_mode = WAL")
        .execute(&pool)
        .await
        .map_err(StorageError::Sqlx)?;

    configure_pool(&pool).await?;

    MIGRATOR.run(&pool).await.map_err(StorageError::Migration)?;

    info!("Database connection established");
    Ok(pool)
}

/// Open an in-memory database with migrations applied. Single connection:
/// each SQLite memory connection is its own database.
pub async fn connect_in_memory() -> StorageResult<SqlitePool> {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .map_err(StorageError::Sqlx)?;

    configure_pool(&pool).await?;

    MIGRATOR.run(&pool).await.map_err(StorageError::Migration)?;

    Ok(pool)
}

async fn configure_pool(pool: &SqlitePool) -> StorageResult<()> {
    sqlx::query("PRAGMA foreign_keys = ON")
        .execute(pool)
        .await
        .map_err(StorageError::Sqlx)?;

    sqlx::query("PRAGMA synchronous = NORMAL")
        .execute(pool)
        .await
        .map_err(StorageError::Sqlx)?;

    Ok(())
}

/// Parse an RFC 3339 timestamp column into a UTC instant
pub fn parse_timestamp(value: &str, column: &str) -> StorageResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|_| StorageError::InvalidValue(format!("invalid {} timestamp", column)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_connect_in_memory_runs_migrations() {
        let pool = connect_in_memory().await.unwrap();

        let tables: Vec<(String,)> = sqlx::query_as(
            "SELECT name FROM sqlite_master WHERE type = 'table' ORDER BY name",
        )
        .fetch_all(&pool)
        .await
        .unwrap();

        let names: Vec<&str> = tables.iter().map(|(n,)| n.as_str()).collect();
        for expected in [
            "organizations",
            "organization_members",
            "invites",
            "requests",
            "comments",
            "pricing_offers",
            "consultations",
        ] {
            assert!(names.contains(&expected), "missing table {}", expected);
        }
    }

    #[tokio::test]
    async fn test_connect_creates_database_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("portal.db");

        let pool = connect(&path).await.unwrap();
        drop(pool);

        assert!(path.exists());
    }

    #[test]
    fn test_parse_timestamp() {
        let parsed = parse_timestamp("2024-06-01T10:00:00Z", "created_at").unwrap();
        assert_eq!(parsed.to_rfc3339(), "2024-06-01T10:00:00+00:00");

        let err = parse_timestamp("yesterday", "created_at").unwrap_err();
        assert!(matches!(err, StorageError::InvalidValue(_)));
    }
}
