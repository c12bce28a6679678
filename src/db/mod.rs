/// Database layer for Courier
///
/// Manages the connection pool and migrations, and provides typed access to
/// accounts, statuses, polls, media, relationships, mutes, notifications
/// and scheduled statuses through [`Db`]. Lookups of a single entry return
/// `Option`; `None` is the only "no such entry" signal.

pub mod account;
pub mod media;
pub mod mute;
pub mod notification;
pub mod poll;
pub mod relationship;
pub mod scheduled_status;
pub mod status;

use crate::error::{CourierError, CourierResult};
use chrono::{DateTime, Utc};
use serde::{de::DeserializeOwned, Serialize};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};
use std::path::Path;

/// Database connection options
#[derive(Debug, Clone)]
pub struct DatabaseOptions {
    pub max_connections: u32,
    pub enable_wal: bool,
}

impl Default for DatabaseOptions {
    fn default() -> Self {
        Self {
            max_connections: 10,
            enable_wal: true,
        }
    }
}

/// Create a SQLite connection pool
pub async fn create_pool(path: &Path, options: DatabaseOptions) -> CourierResult<SqlitePool> {
    // Ensure parent directory exists
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }

    let pool = SqlitePoolOptions::new()
        .max_connections(options.max_connections)
        .connect_with(
            SqliteConnectOptions::new()
                .filename(path)
                .create_if_missing(true)
                .journal_mode(if options.enable_wal {
                    SqliteJournalMode::Wal
                } else {
                    SqliteJournalMode::Delete
                })
                .foreign_keys(true)
                .busy_timeout(std::time::Duration::from_secs(5)),
        )
        .await?;

    Ok(pool)
}

/// Run migrations for a database
/// Migrations are embedded at compile time from ./migrations directory
pub async fn run_migrations(pool: &SqlitePool) -> CourierResult<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}

/// Test database connection
pub async fn test_connection(pool: &SqlitePool) -> CourierResult<()> {
    sqlx::query("SELECT 1").execute(pool).await?;
    Ok(())
}

/// Typed store over the Courier database
#[derive(Clone)]
pub struct Db {
    pool: SqlitePool,
}

impl Db {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Open (creating if needed) the database file and apply migrations
    pub async fn open(path: &Path, options: DatabaseOptions) -> CourierResult<Self> {
        let pool = create_pool(path, options).await?;
        run_migrations(&pool).await?;
        test_connection(&pool).await?;
        Ok(Self::new(pool))
    }

    /// Private in-memory database, migrated
    ///
    /// A single connection that never expires; every new connection to
    /// `sqlite::memory:` would see a fresh empty database.
    pub async fn in_memory() -> CourierResult<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect("sqlite::memory:")
            .await?;
        run_migrations(&pool).await?;
        Ok(Self::new(pool))
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

pub(crate) fn parse_time(value: &str) -> CourierResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| CourierError::Internal(format!("Invalid timestamp {}: {}", value, e)))
}

pub(crate) fn parse_opt_time(value: Option<String>) -> CourierResult<Option<DateTime<Utc>>> {
    value.as_deref().map(parse_time).transpose()
}

pub(crate) fn to_json<T: Serialize>(value: &T) -> CourierResult<String> {
    Ok(serde_json::to_string(value)?)
}

pub(crate) fn from_json<T: DeserializeOwned>(value: &str) -> CourierResult<T> {
    Ok(serde_json::from_str(value)?)
}

/// Map a UNIQUE constraint violation to `Conflict`
pub(crate) fn map_unique(e: sqlx::Error, what: &str) -> CourierError {
    match &e {
        sqlx::Error::Database(db) if db.is_unique_violation() => {
            CourierError::Conflict(format!("{} already exists", what))
        }
        _ => CourierError::Database(e),
    }
}
