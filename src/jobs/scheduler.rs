//! Scheduler loop
//!
//! Polls the job store, and for each claimed job runs the full batch:
//! ingest the catalog, load pending tracks, drive them through the cascade,
//! record a terminal status. A failed job is recorded and the loop keeps
//! polling.

use crate::error::Result;
use crate::ingest::CatalogImporter;
use crate::jobs::store::JobStore;
use crate::models::{BatchStats, JobError, JobSpec, JobStatus};
use crate::pipeline::BatchRunner;
use sqlx::SqlitePool;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

pub struct JobScheduler {
    store: Arc<JobStore>,
    importer: CatalogImporter,
    runner: BatchRunner,
    pool: SqlitePool,
    poll_interval: Duration,
}

impl JobScheduler {
    pub fn new(
        store: Arc<JobStore>,
        importer: CatalogImporter,
        runner: BatchRunner,
        pool: SqlitePool,
        poll_interval: Duration,
    ) -> Self {
        Self {
            store,
            importer,
            runner,
            pool,
            poll_interval,
        }
    }

    /// Poll until cancelled. Jobs run one at a time, oldest first.
    pub async fn run(self, cancel: CancellationToken) {
        tracing::info!(
            jobs_dir = %self.store.jobs_dir().display(),
            poll_secs = self.poll_interval.as_secs(),
            "Scheduler started"
        );

        loop {
            if cancel.is_cancelled() {
                break;
            }

            match self.store.claim_pending() {
                Ok(Some((running, spec))) => {
                    self.process_job(running, spec).await;
                }
                Ok(None) => {
                    tokio::select! {
                        _ = cancel.cancelled() => break,
                        _ = tokio::time::sleep(self.poll_interval) => {}
                    }
                }
                Err(e) => {
                    tracing::error!(error = %e, "Job scan failed");
                    tokio::select! {
                        _ = cancel.cancelled() => break,
                        _ = tokio::time::sleep(self.poll_interval) => {}
                    }
                }
            }
        }

        tracing::info!("Scheduler stopped");
    }

    /// Run one claimed job to a terminal status. The running record from
    /// claim time carries forward so `start_time` is preserved.
    async fn process_job(&self, running: JobStatus, spec: JobSpec) {
        let job_id = running.job_id;
        tracing::info!(job_id = %job_id, catalog = %spec.catalog_path, "Processing job");

        let terminal = match self.execute(&spec).await {
            Ok(stats) => running.completed(stats),
            Err(e) => {
                tracing::error!(job_id = %job_id, error = %e, "Job failed");
                running.failed(JobError {
                    message: e.to_string(),
                    detail: format!("{:?}", e),
                })
            }
        };

        if let Err(e) = self.store.write_status(&terminal) {
            tracing::error!(job_id = %job_id, error = %e, "Cannot record job outcome");
        }
    }

    async fn execute(&self, spec: &JobSpec) -> Result<BatchStats> {
        let report = self
            .importer
            .import_catalog(
                Path::new(&spec.catalog_path),
                spec.audio_base_path.as_deref().map(Path::new),
            )
            .await?;

        let tracks = crate::db::tracks::load_pending_tracks(&self.pool).await?;
        let mut stats = self.runner.run(&tracks).await;

        stats.tracks_parsed = report.parsed;
        stats.tracks_added = report.added;
        stats.tracks_skipped = report.skipped;
        stats.import_errors = report.errors.len();
        Ok(stats)
    }
}
