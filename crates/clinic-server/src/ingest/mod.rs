//! Appointment file ingestion
//!
//! # Architecture
//!
//! - **jobs**: Job ids, the apalis task argument and terminal failure reasons
//! - **queue**: apalis-backed job storage (`JobChannel` for producers,
//!   `JobSource` for workers)
//! - **appointments**: `decode → validate → upsert` pipeline for one CSV file
//! - **dispatcher**: Runs a delivery through the pipeline
//! - **worker**: The apalis handler and retry predicate
//! - **scheduler**: Runs the apalis monitor
//! - **config**: `INGEST_*` environment variables
//!
//! Jobs are enqueued by `POST /api/v1/appointments` and inspected with
//! `GET /api/v1/jobs/:id`.

pub mod appointments;
pub mod config;
pub mod dispatcher;
pub mod jobs;
pub mod queue;
pub mod scheduler;
pub mod worker;

pub use config::IngestConfig;
pub use dispatcher::JobDispatcher;
pub use jobs::{
    AppointmentsFileJob, AppointmentsFilePayload, JobFailure, JobHandle, JobId, JobKind,
    JobSnapshot, JobStatus, UpsertSummary,
};
pub use queue::{InMemoryJobChannel, JobChannel, JobSource, PgJobChannel, QueueError};
pub use scheduler::JobScheduler;
