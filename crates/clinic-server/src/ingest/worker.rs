//! Ingestion worker
//!
//! The apalis handler for `process-appointments-file` tasks. It builds the
//! delivery's [`JobHandle`] from the worker context and hands the job to the
//! [`JobDispatcher`] shared through worker data.

use apalis::prelude::{Attempt, BoxDynError, Data, WorkerContext};

use super::appointments::processor::ProcessError;
use super::dispatcher::JobDispatcher;
use super::jobs::{AppointmentsFileJob, JobHandle, UpsertSummary};

/// Name the ingestion workers register under
pub const WORKER_NAME: &str = "clinic-ingest-worker";

/// Process one delivery of an appointments file
pub async fn process_appointments_file(
    job: AppointmentsFileJob,
    dispatcher: Data<JobDispatcher>,
    attempt: Attempt,
    worker: WorkerContext,
) -> Result<UpsertSummary, ProcessError> {
    let handle = JobHandle {
        id: job.job_id,
        worker: worker.name().to_string(),
        attempt: i32::try_from(attempt.current()).unwrap_or(i32::MAX),
    };
    dispatcher.dispatch(&job, &handle).await
}

/// Whether a failed delivery may run again.
///
/// Data-quality rejections are final; every other error is retried while
/// the job has attempts left.
pub fn is_retryable(error: &BoxDynError) -> bool {
    !matches!(
        error.downcast_ref::<ProcessError>(),
        Some(ProcessError::Rejected(_))
    )
}
