//! Test helpers for clinic server integration tests
//!
//! Builds in-memory wiring for the HTTP surface and the ingestion runtime,
//! and writes CSV fixtures to temp files.

#![allow(dead_code)]

use std::io::Write;
use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::Request;
use axum::response::Response;
use http_body_util::BodyExt;
use tempfile::NamedTempFile;

use clinic_server::config::Config;
use clinic_server::db::{InMemoryAppointmentStore, InMemoryPatientStore};
use clinic_server::features::FeatureState;
use clinic_server::ingest::appointments::AppointmentFileProcessor;
use clinic_server::ingest::{
    IngestConfig, InMemoryJobChannel, JobChannel, JobDispatcher, JobId, JobScheduler, JobSnapshot,
};
use tokio_util::sync::CancellationToken;

pub const HEADER: &str = "patient_id,doctor,appointment_date,reason";

/// Everything a test needs to drive the service end to end
pub struct TestApp {
    pub state: FeatureState,
    pub appointments: Arc<InMemoryAppointmentStore>,
    pub queue: Arc<InMemoryJobChannel>,
    pub config: Config,
}

impl TestApp {
    pub fn new() -> Self {
        let appointments = Arc::new(InMemoryAppointmentStore::new());
        let queue = Arc::new(InMemoryJobChannel::new());
        let state = FeatureState {
            appointments: appointments.clone(),
            patients: Arc::new(InMemoryPatientStore::new()),
            jobs: queue.clone(),
            max_attempts: 3,
        };

        Self {
            state,
            appointments,
            queue,
            config: Config::default(),
        }
    }

    pub fn router(&self) -> axum::Router {
        clinic_server::api::create_router(self.state.clone(), &self.config)
    }

    /// Start the apalis workers, wait for every job in `ids` to finish,
    /// then shut the workers down
    pub async fn run_jobs(&self, ids: &[JobId]) -> Vec<JobSnapshot> {
        let processor = AppointmentFileProcessor::new(self.state.appointments.clone());
        let dispatcher = JobDispatcher::new(self.state.jobs.clone(), processor);
        let config = IngestConfig {
            worker_concurrency: 2,
            poll_interval_ms: 10,
            ..IngestConfig::default()
        };
        let shutdown = CancellationToken::new();
        let handle = JobScheduler::new(config, dispatcher).start(self.queue.source(), shutdown.clone());

        let mut snapshots = Vec::with_capacity(ids.len());
        for id in ids {
            snapshots.push(self.wait_for(*id).await);
        }

        shutdown.cancel();
        tokio::time::timeout(Duration::from_secs(5), handle)
            .await
            .expect("workers did not stop")
            .expect("scheduler task panicked");
        snapshots
    }

    async fn wait_for(&self, id: JobId) -> JobSnapshot {
        tokio::time::timeout(Duration::from_secs(10), async {
            loop {
                let snapshot = self
                    .queue
                    .status(id)
                    .await
                    .expect("status lookup")
                    .expect("job exists");
                if snapshot.status.is_terminal() {
                    return snapshot;
                }
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .expect("job did not finish")
    }
}

/// Write `rows` under the standard header to a `.csv` temp file
pub fn csv_file(rows: &[&str]) -> NamedTempFile {
    let mut body = String::from(HEADER);
    for row in rows {
        body.push('\n');
        body.push_str(row);
    }
    body.push('\n');
    raw_file(".csv", &body)
}

pub fn raw_file(suffix: &str, body: &str) -> NamedTempFile {
    let mut file = tempfile::Builder::new()
        .suffix(suffix)
        .tempfile()
        .expect("create temp file");
    file.write_all(body.as_bytes()).expect("write temp file");
    file
}

pub fn path_of(file: &NamedTempFile) -> String {
    file.path().to_string_lossy().into_owned()
}

pub fn get(uri: &str) -> Request<Body> {
    Request::get(uri).body(Body::empty()).expect("build request")
}

pub fn post_json(uri: &str, body: serde_json::Value) -> Request<Body> {
    Request::post(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .expect("build request")
}

pub async fn read_json(response: Response) -> serde_json::Value {
    let bytes = response
        .into_body()
        .collect()
        .await
        .expect("read body")
        .to_bytes();
    serde_json::from_slice(&bytes).expect("body is JSON")
}
