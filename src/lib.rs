//! songwriter-id library interface
//!
//! Tiered songwriter-credit identification over imported catalogs, driven by
//! a durable file-backed job scheduler and a small HTTP surface.

pub mod api;
pub mod config;
pub mod db;
pub mod error;
pub mod ingest;
pub mod jobs;
pub mod models;
pub mod pipeline;
pub mod scoring;
pub mod sources;

pub use crate::error::{ApiError, ApiResult, Error, Result};

use axum::Router;
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use std::sync::Arc;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool
    pub db: SqlitePool,
    /// Durable job queue, shared with the scheduler
    pub jobs: Arc<jobs::JobStore>,
    /// Service startup timestamp for uptime tracking
    pub startup_time: DateTime<Utc>,
}

impl AppState {
    pub fn new(db: SqlitePool, jobs: Arc<jobs::JobStore>) -> Self {
        Self {
            db,
            jobs,
            startup_time: Utc::now(),
        }
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .merge(api::job_routes())
        .merge(api::health_routes())
        .with_state(state)
}
