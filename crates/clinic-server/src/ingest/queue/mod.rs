//! Job queue
//!
//! Jobs are stored and delivered by apalis. This module wraps the two
//! storages the service can run on:
//!
//! - [`JobChannel`] is the producer side used by HTTP handlers, and by the
//!   dispatcher to record terminal failures.
//! - [`JobSource`] is the storage the apalis workers are built on.
//!
//! # Implementations
//!
//! - [`PgJobChannel`]: `apalis.jobs` through `apalis-postgres`
//! - [`InMemoryJobChannel`]: apalis `MemoryStorage` plus a status ledger, for
//!   tests and `STORE_BACKEND=memory`

use std::sync::Arc;

use apalis_postgres::PostgresStorage;
use async_trait::async_trait;
use thiserror::Error;

use super::jobs::{
    AppointmentsFileJob, AppointmentsFilePayload, JobFailure, JobHandle, JobId, JobSnapshot,
    JobStatus,
};

pub mod memory;
pub mod postgres;

pub use memory::InMemoryJobChannel;
pub use postgres::PgJobChannel;

#[derive(Debug, Error)]
pub enum QueueError {
    #[error("Queue storage error: {0}")]
    Sqlx(#[from] sqlx::Error),

    #[error("Job {0} is no longer held by this worker")]
    LockLost(JobId),

    #[error("max_attempts must be at least 1, got {0}")]
    InvalidAttempts(i32),

    #[error("Job could not be queued: {0}")]
    Submit(String),

    #[error("Job {id} has unknown status '{status}'")]
    CorruptStatus { id: String, status: String },
}

pub type QueueResult<T> = Result<T, QueueError>;

/// Producer side of the queue
#[async_trait]
pub trait JobChannel: Send + Sync {
    /// Enqueue an appointments file. `None` means the backend accepted the
    /// call without reporting an identifier.
    async fn submit(
        &self,
        payload: AppointmentsFilePayload,
        max_attempts: i32,
    ) -> QueueResult<Option<JobId>>;

    /// Fail the delivery held by `handle` for good, recording `failure`
    async fn mark_failed(&self, handle: &JobHandle, failure: &JobFailure) -> QueueResult<()>;

    async fn status(&self, id: JobId) -> QueueResult<Option<JobSnapshot>>;
}

/// Storage the ingestion workers poll
#[derive(Clone)]
pub enum JobSource {
    Postgres(PostgresStorage<AppointmentsFileJob>),
    Memory(Arc<InMemoryJobChannel>),
}

impl JobSource {
    pub fn backend_name(&self) -> &'static str {
        match self {
            JobSource::Postgres(_) => "postgres",
            JobSource::Memory(_) => "memory",
        }
    }
}

pub(crate) fn check_max_attempts(max_attempts: i32) -> QueueResult<()> {
    if max_attempts < 1 {
        return Err(QueueError::InvalidAttempts(max_attempts));
    }
    Ok(())
}

/// Map an apalis status onto the job API's four states.
///
/// A `Failed` row with budget left is waiting to be fetched again, so it
/// reads as pending. `Queued` rows are fetched but not yet locked.
pub(crate) fn map_status(status: &str, attempts: i32, max_attempts: i32) -> Option<JobStatus> {
    match status {
        "Pending" | "Queued" => Some(JobStatus::Pending),
        "Running" => Some(JobStatus::Running),
        "Done" => Some(JobStatus::Done),
        "Killed" => Some(JobStatus::Failed),
        "Failed" if attempts < max_attempts => Some(JobStatus::Pending),
        "Failed" => Some(JobStatus::Failed),
        _ => None,
    }
}
