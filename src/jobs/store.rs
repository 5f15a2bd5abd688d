//! File-backed job queue
//!
//! Claim protocol: write `<id>.status` = running via tmp + rename, then
//! delete `<id>.job`. The rename is the commit point. If the process dies
//! between the two steps, the next scan sees a `.job` whose `.status` already
//! exists and sweeps it without re-running. A half-run batch must not be
//! silently repeated, only inspected.

use crate::error::{Error, Result};
use crate::models::{JobSpec, JobStatus};
use std::fs;
use std::path::{Path, PathBuf};
use uuid::Uuid;

pub struct JobStore {
    jobs_dir: PathBuf,
}

impl JobStore {
    pub fn new(jobs_dir: impl Into<PathBuf>) -> Result<Self> {
        let jobs_dir = jobs_dir.into();
        fs::create_dir_all(&jobs_dir)?;
        Ok(Self { jobs_dir })
    }

    pub fn jobs_dir(&self) -> &Path {
        &self.jobs_dir
    }

    fn job_path(&self, job_id: Uuid) -> PathBuf {
        self.jobs_dir.join(format!("{}.job", job_id))
    }

    fn status_path(&self, job_id: Uuid) -> PathBuf {
        self.jobs_dir.join(format!("{}.status", job_id))
    }

    /// Durably record a new job. Returns once the `.job` file is on disk.
    pub fn submit(&self, spec: &JobSpec) -> Result<Uuid> {
        let job_id = Uuid::new_v4();
        let payload = serde_json::to_vec_pretty(spec)
            .map_err(|e| Error::Internal(format!("Cannot serialize job: {}", e)))?;
        write_atomic(&self.job_path(job_id), &payload)?;
        tracing::info!(job_id = %job_id, catalog = %spec.catalog_path, "Job submitted");
        Ok(job_id)
    }

    /// Current lifecycle record for a job, or None if the id is unknown.
    ///
    /// A job that has a `.job` file but no `.status` yet is pending.
    pub fn status(&self, job_id: Uuid) -> Result<Option<JobStatus>> {
        let status_path = self.status_path(job_id);
        if status_path.exists() {
            let status = read_json::<JobStatus>(&status_path)?;
            return Ok(Some(status));
        }
        let job_path = self.job_path(job_id);
        if job_path.exists() {
            let spec = read_json::<JobSpec>(&job_path)?;
            return Ok(Some(JobStatus::pending(job_id, &spec)));
        }
        Ok(None)
    }

    /// Every known job, newest submission first
    pub fn list(&self) -> Result<Vec<JobStatus>> {
        let mut ids = Vec::new();
        for entry in fs::read_dir(&self.jobs_dir)? {
            let entry = entry?;
            let name = entry.file_name();
            let Some(name) = name.to_str() else { continue };
            let Some(stem) = name
                .strip_suffix(".job")
                .or_else(|| name.strip_suffix(".status"))
            else {
                continue;
            };
            if let Ok(id) = Uuid::parse_str(stem) {
                if !ids.contains(&id) {
                    ids.push(id);
                }
            }
        }

        let mut statuses = Vec::new();
        for id in ids {
            if let Some(status) = self.status(id)? {
                statuses.push(status);
            }
        }
        statuses.sort_by(|a, b| b.submitted_at.cmp(&a.submitted_at));
        Ok(statuses)
    }

    /// Replace a job's status record (tmp + rename, never partial)
    pub fn write_status(&self, status: &JobStatus) -> Result<()> {
        let payload = serde_json::to_vec_pretty(status)
            .map_err(|e| Error::Internal(format!("Cannot serialize status: {}", e)))?;
        write_atomic(&self.status_path(status.job_id), &payload)
    }

    /// Claim the oldest unclaimed job, if any. Returns the running status
    /// record written at claim time, which the caller carries forward to the
    /// terminal transition so `start_time` reflects when work began.
    ///
    /// Crashed claims (a `.job` whose `.status` already exists) are swept
    /// here, leaving the status file as the record of what happened.
    pub fn claim_pending(&self) -> Result<Option<(JobStatus, JobSpec)>> {
        let mut pending: Vec<(Uuid, JobSpec)> = Vec::new();

        for entry in fs::read_dir(&self.jobs_dir)? {
            let entry = entry?;
            let name = entry.file_name();
            let Some(name) = name.to_str() else { continue };
            let Some(stem) = name.strip_suffix(".job") else {
                continue;
            };
            let Ok(job_id) = Uuid::parse_str(stem) else {
                tracing::warn!(file = name, "Ignoring job file with non-UUID name");
                continue;
            };

            if self.status_path(job_id).exists() {
                tracing::warn!(
                    job_id = %job_id,
                    "Sweeping crashed claim; job will not be re-run"
                );
                fs::remove_file(entry.path())?;
                continue;
            }

            match read_json::<JobSpec>(&entry.path()) {
                Ok(spec) => pending.push((job_id, spec)),
                Err(e) => {
                    tracing::warn!(job_id = %job_id, error = %e, "Unreadable job file, skipping");
                }
            }
        }

        pending.sort_by(|a, b| a.1.submitted_at.cmp(&b.1.submitted_at));
        let Some((job_id, spec)) = pending.into_iter().next() else {
            return Ok(None);
        };

        // Commit point: running status lands before the request disappears
        let running = JobStatus::running(job_id, &spec);
        self.write_status(&running)?;
        fs::remove_file(self.job_path(job_id))?;
        tracing::info!(job_id = %job_id, "Job claimed");
        Ok(Some((running, spec)))
    }
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T> {
    let bytes = fs::read(path)?;
    serde_json::from_slice(&bytes)
        .map_err(|e| Error::Internal(format!("Corrupt job record {}: {}", path.display(), e)))
}

/// Write via sibling tmp file + rename so readers never see a partial file
fn write_atomic(path: &Path, payload: &[u8]) -> Result<()> {
    let tmp = path.with_extension("tmp");
    fs::write(&tmp, payload)?;
    fs::rename(&tmp, path)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{BatchStats, JobState};
    use chrono::Utc;

    fn spec(catalog: &str) -> JobSpec {
        JobSpec {
            catalog_path: catalog.to_string(),
            audio_base_path: None,
            submitted_at: Utc::now(),
        }
    }

    #[test]
    fn submitted_job_reads_back_as_pending() {
        let dir = tempfile::tempdir().unwrap();
        let store = JobStore::new(dir.path()).unwrap();

        let job_id = store.submit(&spec("catalog.csv")).unwrap();
        let status = store.status(job_id).unwrap().unwrap();
        assert_eq!(status.status, JobState::Pending);
        assert_eq!(status.catalog_path.as_deref(), Some("catalog.csv"));
    }

    #[test]
    fn unknown_job_id_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let store = JobStore::new(dir.path()).unwrap();
        assert!(store.status(Uuid::new_v4()).unwrap().is_none());
    }

    #[test]
    fn claim_removes_request_and_records_running() {
        let dir = tempfile::tempdir().unwrap();
        let store = JobStore::new(dir.path()).unwrap();

        let job_id = store.submit(&spec("catalog.csv")).unwrap();
        let (running, claimed_spec) = store.claim_pending().unwrap().unwrap();
        assert_eq!(running.job_id, job_id);
        assert_eq!(running.status, JobState::Running);
        assert_eq!(claimed_spec.catalog_path, "catalog.csv");

        assert!(!dir.path().join(format!("{}.job", job_id)).exists());
        let status = store.status(job_id).unwrap().unwrap();
        assert_eq!(status.status, JobState::Running);

        // Nothing left to claim
        assert!(store.claim_pending().unwrap().is_none());
    }

    #[test]
    fn oldest_job_is_claimed_first() {
        let dir = tempfile::tempdir().unwrap();
        let store = JobStore::new(dir.path()).unwrap();

        let mut old = spec("first.csv");
        old.submitted_at = Utc::now() - chrono::Duration::minutes(5);
        let old_id = store.submit(&old).unwrap();
        store.submit(&spec("second.csv")).unwrap();

        let (running, _) = store.claim_pending().unwrap().unwrap();
        assert_eq!(running.job_id, old_id);
    }

    #[test]
    fn crashed_claim_is_swept_not_rerun() {
        let dir = tempfile::tempdir().unwrap();
        let store = JobStore::new(dir.path()).unwrap();

        // Simulate a crash after the status write but before the job file
        // was removed: both files present.
        let job_id = store.submit(&spec("catalog.csv")).unwrap();
        let job_spec = spec("catalog.csv");
        store
            .write_status(&JobStatus::running(job_id, &job_spec))
            .unwrap();

        assert!(store.claim_pending().unwrap().is_none());
        assert!(!dir.path().join(format!("{}.job", job_id)).exists());

        // Status record survives for inspection
        let status = store.status(job_id).unwrap().unwrap();
        assert_eq!(status.status, JobState::Running);
    }

    #[test]
    fn terminal_status_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let store = JobStore::new(dir.path()).unwrap();

        let job_id = store.submit(&spec("catalog.csv")).unwrap();
        let (running, _) = store.claim_pending().unwrap().unwrap();

        let stats = BatchStats {
            total_processed: 3,
            tier1_identified: 2,
            manual_review: 1,
            ..Default::default()
        };
        store.write_status(&running.completed(stats.clone())).unwrap();

        let read = store.status(job_id).unwrap().unwrap();
        assert_eq!(read.status, JobState::Completed);
        assert_eq!(read.result, Some(stats));
    }

    #[test]
    fn completed_status_keeps_claim_time_start() {
        let dir = tempfile::tempdir().unwrap();
        let store = JobStore::new(dir.path()).unwrap();

        let job_id = store.submit(&spec("catalog.csv")).unwrap();
        let (running, _) = store.claim_pending().unwrap().unwrap();
        let claimed_start = store.status(job_id).unwrap().unwrap().start_time;
        assert!(claimed_start.is_some());

        // A long-running batch must not regenerate start_time at completion
        std::thread::sleep(std::time::Duration::from_millis(20));
        store
            .write_status(&running.completed(BatchStats::default()))
            .unwrap();

        let read = store.status(job_id).unwrap().unwrap();
        assert_eq!(read.start_time, claimed_start);
        assert!(read.end_time.unwrap() > read.start_time.unwrap());
    }

    #[test]
    fn list_orders_newest_first() {
        let dir = tempfile::tempdir().unwrap();
        let store = JobStore::new(dir.path()).unwrap();

        let mut old = spec("first.csv");
        old.submitted_at = Utc::now() - chrono::Duration::minutes(5);
        store.submit(&old).unwrap();
        let newest = store.submit(&spec("second.csv")).unwrap();

        let listed = store.list().unwrap();
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0].job_id, newest);
    }
}
