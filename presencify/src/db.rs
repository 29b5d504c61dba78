//! Site database: connection pool, SQLite pragmas and schema.
//!
//! With the default `sqlite` feature the whole site (accounts, sessions,
//! projects and contact submissions) lives in one file under the data
//! directory. The `postgres` feature points the same schema at a server.

use crate::config::DatabaseConfig;
use crate::sql;
use anyhow::{Context, Result};
use std::path::Path;
use tracing::info;

#[cfg(feature = "sqlite")]
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
#[cfg(feature = "sqlite")]
use std::path::PathBuf;

#[cfg(feature = "postgres")]
use sqlx::postgres::{PgConnectOptions, PgPoolOptions};

// Re-export the pool and row types for the selected backend
#[cfg(feature = "sqlite")]
pub use sqlx::{SqlitePool as DbPool, sqlite::SqliteRow as DbRow};

#[cfg(feature = "postgres")]
pub use sqlx::{PgPool as DbPool, postgres::PgRow as DbRow};

#[cfg(feature = "sqlite")]
const DB_FILE_NAME: &str = "presencify.db";

/// The session sweeper and request handlers write concurrently.
#[cfg(feature = "sqlite")]
const SQLITE_BUSY_TIMEOUT: std::time::Duration = std::time::Duration::from_secs(5);

/// Row counts logged when the database opens.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SiteCounts {
    pub accounts: i64,
    pub projects: i64,
    pub submissions: i64,
}

/// Owns the site's connection pool. Migrations run on open.
pub struct Database {
    pool: DbPool,
    /// Where the data lives, for logs. Never includes credentials.
    location: String,
}

/// Database file used when `database.path` is unset.
#[cfg(feature = "sqlite")]
pub fn sqlite_path(config: &DatabaseConfig, data_dir: &Path) -> PathBuf {
    config
        .path
        .clone()
        .unwrap_or_else(|| data_dir.join(DB_FILE_NAME))
}

#[cfg(feature = "sqlite")]
fn sqlite_options(path: &Path) -> SqliteConnectOptions {
    SqliteConnectOptions::new()
        .filename(path)
        .create_if_missing(true)
        .journal_mode(SqliteJournalMode::Wal)
        .synchronous(SqliteSynchronous::Normal)
        .busy_timeout(SQLITE_BUSY_TIMEOUT)
        .foreign_keys(true)
}

#[cfg(feature = "sqlite")]
async fn connect(config: &DatabaseConfig, data_dir: &Path) -> Result<(DbPool, String)> {
    let db_path = sqlite_path(config, data_dir);

    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent).with_context(|| {
            format!("Failed to create database directory: {}", parent.display())
        })?;
    }

    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect_with(sqlite_options(&db_path))
        .await
        .with_context(|| format!("Failed to open site database {}", db_path.display()))?;

    Ok((pool, format!("sqlite:{}", db_path.display())))
}

#[cfg(feature = "postgres")]
async fn connect(config: &DatabaseConfig, _data_dir: &Path) -> Result<(DbPool, String)> {
    let options = PgConnectOptions::new()
        .host(&config.host)
        .port(config.port)
        .username(&config.user)
        .password(&config.password)
        .database(&config.database);

    let location = format!(
        "postgres://{}@{}:{}/{}",
        config.user, config.host, config.port, config.database
    );

    let pool = PgPoolOptions::new()
        .max_connections(10)
        .connect_with(options)
        .await
        .with_context(|| format!("Failed to connect to {location}"))?;

    Ok((pool, location))
}

impl Database {
    /// Connect, apply pending migrations and log what the site holds.
    pub async fn new(config: &DatabaseConfig, data_dir: &Path) -> Result<Self> {
        let (pool, location) = connect(config, data_dir).await?;

        sqlx::migrate!("./migrations/shared")
            .run(&pool)
            .await
            .with_context(|| format!("Failed to migrate {location}"))?;

        let db = Self { pool, location };
        let counts = db.counts().await?;
        info!(
            location = %db.location,
            accounts = counts.accounts,
            projects = counts.projects,
            submissions = counts.submissions,
            "Site database ready"
        );

        Ok(db)
    }

    pub fn location(&self) -> &str {
        &self.location
    }

    pub async fn counts(&self) -> Result<SiteCounts> {
        let count = |query: &'static str| {
            let pool = self.pool.clone();
            async move {
                sqlx::query_scalar::<_, i64>(query)
                    .fetch_one(&pool)
                    .await
                    .with_context(|| format!("Failed to run {query}"))
            }
        };

        let (accounts, projects, submissions) = tokio::try_join!(
            count(sql::COUNT_ACCOUNTS),
            count(sql::COUNT_PROJECTS),
            count(sql::COUNT_SUBMISSIONS),
        )?;

        Ok(SiteCounts {
            accounts,
            projects,
            submissions,
        })
    }

    /// Clones share the same connections.
    pub fn pool(&self) -> DbPool {
        self.pool.clone()
    }
}
