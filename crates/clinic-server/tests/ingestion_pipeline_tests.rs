//! End-to-end ingestion scenarios against the in-memory backend
//!
//! Files are enqueued over HTTP, processed by the apalis workers and then read back
//! through the query endpoints.

mod helpers;

use axum::http::StatusCode;
use serde_json::json;
use tower::ServiceExt;

use clinic_server::ingest::{JobChannel, JobId, JobStatus};
use helpers::*;

async fn enqueue(app: &TestApp, filepath: &str) -> JobId {
    let response = app
        .router()
        .oneshot(post_json("/api/v1/appointments", json!({ "filepath": filepath })))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);

    let body = read_json(response).await;
    assert_eq!(body["data"]["message"], "Appointment file added to the queue");
    body["data"]["job_id"]
        .as_str()
        .and_then(|id| JobId::from_string(id).ok())
        .expect("job_id in enqueue response")
}

async fn job_status(app: &TestApp, id: JobId) -> JobStatus {
    app.queue.status(id).await.unwrap().expect("job exists").status
}

#[tokio::test]
async fn test_valid_file_is_ingested_and_listed() {
    let app = TestApp::new();
    let file = csv_file(&[
        "101,Dr Smith,2024-06-01T09:00:00Z,Checkup",
        "102,Dr Jones,2024-06-02T10:30:00Z,Follow-up",
    ]);

    let job = enqueue(&app, &path_of(&file)).await;
    app.run_jobs(&[job]).await;

    assert_eq!(job_status(&app, job).await, JobStatus::Done);
    assert_eq!(app.appointments.len().await, 2);

    let response = app
        .router()
        .oneshot(get("/api/v1/appointments?patient_id=101"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = read_json(response).await;
    let rows = body["data"].as_array().unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["doctor"], "Dr Smith");
    assert_eq!(rows[0]["reason"], "Checkup");
}

#[tokio::test]
async fn test_one_invalid_row_rejects_the_whole_file() {
    let app = TestApp::new();
    let file = csv_file(&[
        "101,Dr Smith,2024-06-01T09:00:00Z,Checkup",
        "-1,Dr Jones,2024-06-02T10:30:00Z,Follow-up",
    ]);

    let job = enqueue(&app, &path_of(&file)).await;
    let snapshot = app.run_jobs(&[job]).await.remove(0);

    assert_eq!(snapshot.status, JobStatus::Failed);
    assert_eq!(snapshot.attempts, 1);
    assert_eq!(snapshot.last_error.as_deref(), Some("Validation failed"));
    assert!(app.appointments.is_empty().await);
}

#[tokio::test]
async fn test_reprocessing_the_same_file_is_idempotent() {
    let app = TestApp::new();
    let file = csv_file(&["101,Dr Smith,2024-06-01T09:00:00Z,Checkup"]);

    let first = enqueue(&app, &path_of(&file)).await;
    let second = enqueue(&app, &path_of(&file)).await;
    let snapshots = app.run_jobs(&[first, second]).await;

    assert!(snapshots.iter().all(|s| s.status == JobStatus::Done));
    assert_eq!(app.appointments.len().await, 1);
}

#[tokio::test]
async fn test_duplicate_key_keeps_first_reason() {
    let app = TestApp::new();
    let file = csv_file(&[
        "101,Dr Smith,2024-06-01T09:00:00Z,Checkup",
        "101,Dr Smith,2024-06-01T09:00:00Z,Something else",
    ]);

    let job = enqueue(&app, &path_of(&file)).await;
    app.run_jobs(&[job]).await;

    assert_eq!(job_status(&app, job).await, JobStatus::Done);
    let body = read_json(app.router().oneshot(get("/api/v1/appointments")).await.unwrap()).await;
    let rows = body["data"].as_array().unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["reason"], "Checkup");
}

#[tokio::test]
async fn test_wrong_extension_fails_without_retry() {
    let app = TestApp::new();
    let file = raw_file(".txt", "patient_id,doctor,appointment_date,reason\n");

    let job = enqueue(&app, &path_of(&file)).await;
    let snapshot = app.run_jobs(&[job]).await.remove(0);

    assert_eq!(snapshot.status, JobStatus::Failed);
    assert_eq!(snapshot.attempts, 1);
    assert_eq!(snapshot.last_error.as_deref(), Some("Invalid file format"));
}

#[tokio::test]
async fn test_missing_file_is_retried_until_exhausted() {
    let app = TestApp::new();

    let job = enqueue(&app, "/nonexistent/appointments.csv").await;
    let snapshot = app.run_jobs(&[job]).await.remove(0);

    assert_eq!(snapshot.status, JobStatus::Failed);
    assert_eq!(snapshot.attempts, 3);
    assert!(snapshot.last_error.is_some());
}

#[tokio::test]
async fn test_job_status_endpoint_reports_outcome() {
    let app = TestApp::new();
    let file = csv_file(&["101,Dr Smith,2024-06-01T09:00:00Z,Checkup"]);

    let job = enqueue(&app, &path_of(&file)).await;

    let pending = read_json(
        app.router()
            .oneshot(get(&format!("/api/v1/jobs/{}", job)))
            .await
            .unwrap(),
    )
    .await;
    assert_eq!(pending["data"]["status"], "pending");

    app.run_jobs(&[job]).await;

    let done = read_json(
        app.router()
            .oneshot(get(&format!("/api/v1/jobs/{}", job)))
            .await
            .unwrap(),
    )
    .await;
    assert_eq!(done["data"]["status"], "done");
    assert_eq!(done["data"]["attempts"], 1);
}

#[tokio::test]
async fn test_missing_appointment_is_not_found() {
    let app = TestApp::new();

    let response = app
        .router()
        .oneshot(get("/api/v1/appointments/999"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let body = read_json(response).await;
    assert_eq!(body["error"]["code"], "NOT_FOUND");
    assert_eq!(body["error"]["message"], "No appointment found");
}

#[tokio::test]
async fn test_invalid_listing_filter_is_bad_request() {
    let app = TestApp::new();

    let response = app
        .router()
        .oneshot(get("/api/v1/appointments?patient_id=abc"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = read_json(response).await;
    assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn test_empty_filepath_is_rejected() {
    let app = TestApp::new();

    let response = app
        .router()
        .oneshot(post_json("/api/v1/appointments", json!({ "filepath": "" })))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(app.queue.snapshots().is_empty());
}
