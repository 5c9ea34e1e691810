//! Database initialization
//!
//! Opens (or creates) the SQLite database, applies connection PRAGMAs, creates
//! the base tables and runs pending migrations. Safe to call on every startup.

use crate::Result;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::SqlitePool;
use std::path::Path;
use std::time::Duration;
use tracing::info;

/// Busy timeout applied to every connection
///
/// Concurrent visit tracking serializes on the SQLite write lock; writers wait
/// this long before surfacing `SQLITE_BUSY`.
pub const BUSY_TIMEOUT_MS: u64 = 5000;

/// Initialize database connection and create tables if needed
pub async fn init_database(db_path: &Path) -> Result<SqlitePool> {
    let newly_created = !db_path.exists();

    // Create parent directory if it doesn't exist
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let options = SqliteConnectOptions::new()
        .filename(db_path)
        .create_if_missing(true)
        .journal_mode(SqliteJournalMode::Wal)
        .synchronous(SqliteSynchronous::Normal)
        .busy_timeout(Duration::from_millis(BUSY_TIMEOUT_MS));

    // Schema changes run on their own connection, closed before the pool
    // opens, so no pooled connection holds a pre-migration schema
    let bootstrap = SqlitePoolOptions::new()
        .max_connections(1)
        .connect_with(options.clone())
        .await?;
    create_schema(&bootstrap).await?;
    bootstrap.close().await;

    if newly_created {
        info!("Initialized new database: {}", db_path.display());
    } else {
        info!("Opened existing database: {}", db_path.display());
    }

    // Per-connection options: every pooled connection gets WAL and the busy timeout
    let pool = SqlitePoolOptions::new()
        .max_connections(20)
        .min_connections(2)
        .connect_with(options)
        .await?;

    Ok(pool)
}

/// Single-connection in-memory database with the full schema
///
/// Each in-memory connection is its own database, so the pool is capped at
/// one connection.
pub async fn init_memory_database() -> Result<SqlitePool> {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await?;

    create_schema(&pool).await?;

    Ok(pool)
}

/// Create all tables and run migrations (idempotent)
pub async fn create_schema(pool: &SqlitePool) -> Result<()> {
    create_schema_version_table(pool).await?;
    create_referrer_visits_table(pool).await?;
    create_leads_table(pool).await?;

    crate::db::migrations::run_migrations(pool).await?;

    Ok(())
}

async fn create_schema_version_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY,
            applied_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

/// Create the referrer_visits table
///
/// Append-only log of referral-link click-throughs. `identity_key` and
/// `day_bucket` are derived at insert time and back the dedup index.
pub async fn create_referrer_visits_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS referrer_visits (
            id TEXT PRIMARY KEY,
            referrer_username TEXT NOT NULL,
            email TEXT,
            phone TEXT,
            identity_key TEXT NOT NULL,
            ip_address TEXT NOT NULL DEFAULT '',
            user_agent TEXT NOT NULL DEFAULT '',
            created_at INTEGER NOT NULL,
            day_bucket INTEGER NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

/// Create the leads table
///
/// Written by the lead-capture flow, read by the stats aggregator.
pub async fn create_leads_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS leads (
            id TEXT PRIMARY KEY,
            email TEXT,
            phone TEXT,
            attribution_method TEXT NOT NULL
                CHECK (attribution_method IN ('cookie', 'email_match', 'phone_match', 'direct')),
            attribution_confidence INTEGER NOT NULL
                CHECK (attribution_confidence BETWEEN 0 AND 100),
            referrer_username TEXT,
            created_at INTEGER NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}
