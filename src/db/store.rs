//! Persistence seam for the identification cascade
//!
//! The cascade writes through `RecordStore` rather than touching the pool
//! directly, so tests can run it against a scratch database or observe the
//! write ordering directly.

use crate::models::{IdentificationAttempt, IdentificationStatus, SongwriterCredit};
use crate::error::Result;
use async_trait::async_trait;
use sqlx::SqlitePool;

/// Durable writes performed while identifying a track
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Replace the track's credits with a freshly accepted set
    async fn save_credits(&self, credits: &[SongwriterCredit]) -> Result<()>;

    /// Record the track's final status and confidence
    async fn update_track_status(
        &self,
        track_id: i64,
        status: IdentificationStatus,
        confidence: f64,
    ) -> Result<()>;

    /// Append one audit row for a tier execution
    async fn append_attempt(&self, attempt: &IdentificationAttempt) -> Result<()>;
}

/// `RecordStore` over the shared SQLite pool
#[derive(Clone)]
pub struct SqliteRecordStore {
    pool: SqlitePool,
}

impl SqliteRecordStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RecordStore for SqliteRecordStore {
    async fn save_credits(&self, credits: &[SongwriterCredit]) -> Result<()> {
        super::credits::save_credits(&self.pool, credits).await
    }

    async fn update_track_status(
        &self,
        track_id: i64,
        status: IdentificationStatus,
        confidence: f64,
    ) -> Result<()> {
        super::tracks::update_track_status(&self.pool, track_id, status, confidence).await
    }

    async fn append_attempt(&self, attempt: &IdentificationAttempt) -> Result<()> {
        super::credits::append_attempt(&self.pool, attempt).await
    }
}
