//! Job submission and monitoring endpoints
//!
//! POST /jobs durably records the request and returns at once; the
//! scheduler picks it up on its next scan. Status is read straight off the
//! job store, so it stays accurate across restarts.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{ApiError, ApiResult};
use crate::models::{JobSpec, JobStatus};
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct SubmitJobRequest {
    pub catalog_path: String,
    #[serde(default)]
    pub audio_base_path: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct SubmitJobResponse {
    pub job_id: Uuid,
}

/// POST /jobs
pub async fn submit_job(
    State(state): State<AppState>,
    Json(request): Json<SubmitJobRequest>,
) -> ApiResult<(StatusCode, Json<SubmitJobResponse>)> {
    if request.catalog_path.trim().is_empty() {
        return Err(ApiError::BadRequest("catalog_path is required".to_string()));
    }

    let spec = JobSpec {
        catalog_path: request.catalog_path,
        audio_base_path: request.audio_base_path,
        submitted_at: Utc::now(),
    };
    let job_id = state.jobs.submit(&spec)?;

    Ok((StatusCode::ACCEPTED, Json(SubmitJobResponse { job_id })))
}

/// GET /jobs/:job_id
pub async fn get_job(
    State(state): State<AppState>,
    Path(job_id): Path<Uuid>,
) -> ApiResult<Json<JobStatus>> {
    match state.jobs.status(job_id)? {
        Some(status) => Ok(Json(status)),
        None => Err(ApiError::NotFound(format!("No such job: {}", job_id))),
    }
}

/// GET /jobs
pub async fn list_jobs(State(state): State<AppState>) -> ApiResult<Json<Vec<JobStatus>>> {
    Ok(Json(state.jobs.list()?))
}

/// Build job routes
pub fn job_routes() -> Router<AppState> {
    Router::new()
        .route("/jobs", post(submit_job).get(list_jobs))
        .route("/jobs/:job_id", get(get_job))
}
