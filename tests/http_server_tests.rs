//! HTTP surface tests: submission is fire-and-forget, status reads come off
//! the durable store, and errors arrive as the JSON error envelope.

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use songwriter_id::db;
use songwriter_id::jobs::JobStore;
use songwriter_id::{build_router, AppState};
use std::sync::Arc;
use tower::util::ServiceExt;

async fn create_test_app() -> (axum::Router, Arc<JobStore>, tempfile::TempDir) {
    let pool = sqlx::SqlitePool::connect("sqlite::memory:").await.unwrap();
    db::init_tables(&pool).await.unwrap();

    let dir = tempfile::tempdir().unwrap();
    let jobs = Arc::new(JobStore::new(dir.path().join("jobs")).unwrap());

    let app = build_router(AppState::new(pool, Arc::clone(&jobs)));
    (app, jobs, dir)
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

#[tokio::test]
async fn submit_returns_job_id_immediately() {
    let (app, jobs, _dir) = create_test_app().await;

    let response = app
        .oneshot(post_json(
            "/jobs",
            json!({"catalog_path": "/data/catalog.csv"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::ACCEPTED);

    let body = body_json(response).await;
    let job_id = body["job_id"].as_str().unwrap().parse().unwrap();

    // Durably recorded as pending; no scheduler is running in this test
    let status = jobs.status(job_id).unwrap().unwrap();
    assert_eq!(status.catalog_path.as_deref(), Some("/data/catalog.csv"));
}

#[tokio::test]
async fn submit_without_catalog_path_is_rejected() {
    let (app, _jobs, _dir) = create_test_app().await;

    let response = app
        .oneshot(post_json("/jobs", json!({"catalog_path": "  "})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let body = body_json(response).await;
    assert_eq!(body["error"]["code"], "BAD_REQUEST");
}

#[tokio::test]
async fn unknown_job_is_404_with_error_envelope() {
    let (app, _jobs, _dir) = create_test_app().await;

    let response = app
        .oneshot(
            Request::builder()
                .uri("/jobs/00000000-0000-0000-0000-000000000000")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let body = body_json(response).await;
    assert_eq!(body["error"]["code"], "NOT_FOUND");
}

#[tokio::test]
async fn job_status_and_listing_read_from_the_store() {
    let (app, _jobs, _dir) = create_test_app().await;

    let response = app
        .clone()
        .oneshot(post_json(
            "/jobs",
            json!({"catalog_path": "/data/catalog.csv", "audio_base_path": "/data/audio"}),
        ))
        .await
        .unwrap();
    let job_id = body_json(response).await["job_id"].as_str().unwrap().to_string();

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri(format!("/jobs/{}", job_id))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let status = body_json(response).await;
    assert_eq!(status["status"], "pending");

    let response = app
        .oneshot(Request::builder().uri("/jobs").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let listed = body_json(response).await;
    assert_eq!(listed.as_array().unwrap().len(), 1);
    assert_eq!(listed[0]["job_id"], job_id.as_str());
}

#[tokio::test]
async fn health_reports_ok() {
    let (app, _jobs, _dir) = create_test_app().await;

    let response = app
        .oneshot(
            Request::builder()
                .uri("/health")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["status"], "ok");
    assert_eq!(body["module"], "songwriter-id");
}
