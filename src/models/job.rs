//! Job records for the durable batch queue

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One durable request to run the batch pipeline over a catalog.
///
/// Written by a submitter as `<jobs_dir>/<job_id>.job`, consumed exactly
/// once by the scheduler, then deleted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobSpec {
    pub catalog_path: String,
    pub audio_base_path: Option<String>,
    pub submitted_at: DateTime<Utc>,
}

/// Job lifecycle state machine: pending -> running -> {completed, failed}
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobState {
    Pending,
    Running,
    Completed,
    Failed,
}

/// One-line message plus full detail, so a monitoring surface can show the
/// message by default and the detail on demand.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobError {
    pub message: String,
    pub detail: String,
}

/// Externally-observable lifecycle record of a job.
///
/// Persisted as `<jobs_dir>/<job_id>.status`, replaced whole on every
/// transition so a concurrent reader never sees a partial write.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobStatus {
    pub job_id: Uuid,
    pub status: JobState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub catalog_path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub submitted_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_time: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_time: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<BatchStats>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<JobError>,
}

impl JobStatus {
    pub fn pending(job_id: Uuid, spec: &JobSpec) -> Self {
        Self {
            job_id,
            status: JobState::Pending,
            catalog_path: Some(spec.catalog_path.clone()),
            submitted_at: Some(spec.submitted_at),
            start_time: None,
            end_time: None,
            result: None,
            error: None,
        }
    }

    pub fn running(job_id: Uuid, spec: &JobSpec) -> Self {
        Self {
            job_id,
            status: JobState::Running,
            catalog_path: Some(spec.catalog_path.clone()),
            submitted_at: Some(spec.submitted_at),
            start_time: Some(Utc::now()),
            end_time: None,
            result: None,
            error: None,
        }
    }

    pub fn completed(mut self, result: BatchStats) -> Self {
        self.status = JobState::Completed;
        self.end_time = Some(Utc::now());
        self.result = Some(result);
        self.error = None;
        self
    }

    pub fn failed(mut self, error: JobError) -> Self {
        self.status = JobState::Failed;
        self.end_time = Some(Utc::now());
        self.result = None;
        self.error = Some(error);
        self
    }
}

/// Aggregate statistics for one batch run
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BatchStats {
    pub tracks_parsed: usize,
    pub tracks_added: usize,
    pub tracks_skipped: usize,
    pub import_errors: usize,
    pub tier1_identified: usize,
    pub tier2_identified: usize,
    pub tier3_identified: usize,
    pub manual_review: usize,
    pub errors: usize,
    pub total_processed: usize,
}
