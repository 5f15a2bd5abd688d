//! Database access for songwriter-id
//!
//! SQLite via sqlx, one shared pool. Tables are created on pool init.

pub mod credits;
pub mod store;
pub mod tracks;

pub use store::{RecordStore, SqliteRecordStore};

use crate::error::Result;
use sqlx::SqlitePool;
use std::path::Path;

/// Initialize database connection pool
pub async fn init_database_pool(db_path: &Path) -> Result<SqlitePool> {
    // Ensure parent directory exists
    if let Some(parent) = db_path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    // SQLite URI with mode=rwc (read, write, create)
    let db_url = format!("sqlite://{}?mode=rwc", db_path.display());
    tracing::debug!("Connecting to database: {}", db_url);

    let pool = SqlitePool::connect(&db_url).await?;
    init_tables(&pool).await?;

    Ok(pool)
}

/// Create tables if they don't exist
pub async fn init_tables(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS tracks (
            track_id INTEGER PRIMARY KEY AUTOINCREMENT,
            title TEXT NOT NULL,
            artist_name TEXT NOT NULL,
            release_title TEXT,
            duration TEXT,
            isrc TEXT UNIQUE,
            audio_path TEXT,
            identification_status TEXT NOT NULL DEFAULT 'pending',
            confidence_score REAL NOT NULL DEFAULT 0.0,
            created_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP,
            updated_at TEXT
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS songwriter_credits (
            credit_id INTEGER PRIMARY KEY AUTOINCREMENT,
            track_id INTEGER NOT NULL REFERENCES tracks(track_id),
            songwriter_name TEXT NOT NULL,
            role TEXT NOT NULL,
            share_percentage REAL,
            publisher_name TEXT,
            source_of_info TEXT,
            confidence_score REAL NOT NULL DEFAULT 0.0,
            created_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS identification_attempts (
            attempt_id INTEGER PRIMARY KEY AUTOINCREMENT,
            track_id INTEGER NOT NULL REFERENCES tracks(track_id),
            source_used TEXT NOT NULL,
            query_performed TEXT NOT NULL,
            result TEXT NOT NULL,
            confidence_score REAL NOT NULL DEFAULT 0.0,
            attempted_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    tracing::info!("Database tables initialized (tracks, songwriter_credits, identification_attempts)");

    Ok(())
}
