//! Job definitions
//!
//! The apalis task argument for appointment files, the handle a delivery
//! reports through, and the terminal failure classification. Job ids are
//! ULIDs, the id type apalis uses for its PostgreSQL storage.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ulid::Ulid;

pub type JobId = Ulid;

/// Kinds of work the ingestion runtime knows how to dispatch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum JobKind {
    ProcessAppointmentsFile,
}

impl JobKind {
    /// Also the apalis queue name for the kind
    pub fn as_str(&self) -> &'static str {
        match self {
            JobKind::ProcessAppointmentsFile => "process-appointments-file",
        }
    }
}

impl fmt::Display for JobKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Enqueue request body forwarded to the queue
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppointmentsFilePayload {
    pub filepath: String,
}

/// Task argument of a `process-appointments-file` job.
///
/// Carries its own id so a delivery can report against it whichever apalis
/// backend delivered it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppointmentsFileJob {
    pub job_id: JobId,
    pub filepath: String,
}

impl AppointmentsFileJob {
    pub const KIND: JobKind = JobKind::ProcessAppointmentsFile;

    pub fn new(payload: AppointmentsFilePayload) -> Self {
        Self {
            job_id: Ulid::new(),
            filepath: payload.filepath,
        }
    }
}

/// One delivery of a job.
///
/// `worker` is the apalis worker holding the lock; `attempt` counts the
/// current delivery.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct JobHandle {
    pub id: JobId,
    pub worker: String,
    pub attempt: i32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Pending,
    Running,
    Done,
    Failed,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Pending => "pending",
            JobStatus::Running => "running",
            JobStatus::Done => "done",
            JobStatus::Failed => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Done | JobStatus::Failed)
    }
}

/// Point-in-time view of a queued job
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobSnapshot {
    pub id: JobId,
    pub kind: String,
    pub status: JobStatus,
    pub attempts: i32,
    pub max_attempts: i32,
    pub last_error: Option<String>,
    pub run_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
}

/// Terminal, data-quality failures.
///
/// These are recorded on the job through `JobChannel::mark_failed` and never
/// retried: running the same file again gives the same answer.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum JobFailure {
    #[error("Invalid file format")]
    InvalidFileFormat,

    #[error("Invalid CSV file")]
    InvalidCsvFile,

    #[error("Validation failed")]
    ValidationFailed,
}

/// Result of `upsert_many`, also the value apalis stores for a finished job
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpsertSummary {
    pub created: u64,
    pub submitted: u64,
}

impl UpsertSummary {
    pub fn message(&self) -> String {
        format!("{} appointments created out of {}", self.created, self.submitted)
    }
}
