//! Job dispatch
//!
//! Runs one delivery of an appointments file through the pipeline and
//! records terminal failures on the queue. apalis acknowledges whatever the
//! dispatcher returns.

use std::sync::Arc;

use tracing::{error, warn, Instrument, Span};

use super::appointments::processor::{AppointmentFileProcessor, ProcessError};
use super::jobs::{AppointmentsFileJob, AppointmentsFilePayload, JobHandle, UpsertSummary};
use super::queue::JobChannel;

#[derive(Clone)]
pub struct JobDispatcher {
    channel: Arc<dyn JobChannel>,
    appointments: AppointmentFileProcessor,
    span: Span,
}

impl JobDispatcher {
    pub fn new(channel: Arc<dyn JobChannel>, appointments: AppointmentFileProcessor) -> Self {
        Self::with_span(channel, appointments, tracing::info_span!("job_dispatcher"))
    }

    pub fn with_span(
        channel: Arc<dyn JobChannel>,
        appointments: AppointmentFileProcessor,
        span: Span,
    ) -> Self {
        Self {
            channel,
            appointments,
            span,
        }
    }

    /// Run one delivery of `job`.
    ///
    /// `Rejected` has already been recorded on the job through
    /// [`JobChannel::mark_failed`]; `Fault` is left to the retry budget.
    pub async fn dispatch(
        &self,
        job: &AppointmentsFileJob,
        handle: &JobHandle,
    ) -> Result<UpsertSummary, ProcessError> {
        let span = tracing::info_span!(
            parent: &self.span,
            "dispatch",
            job_id = %job.job_id,
            kind = %AppointmentsFileJob::KIND,
            worker = %handle.worker,
            attempt = handle.attempt
        );
        self.dispatch_inner(job, handle).instrument(span).await
    }

    async fn dispatch_inner(
        &self,
        job: &AppointmentsFileJob,
        handle: &JobHandle,
    ) -> Result<UpsertSummary, ProcessError> {
        let payload = AppointmentsFilePayload {
            filepath: job.filepath.clone(),
        };

        match self.appointments.process(&payload).await {
            Ok(summary) => Ok(summary),
            Err(ProcessError::Rejected(failure)) => {
                warn!(reason = %failure, "Job failed permanently");
                if let Err(e) = self.channel.mark_failed(handle, &failure).await {
                    error!(error = %e, reason = %failure, "Failed to record job failure");
                }
                Err(ProcessError::Rejected(failure))
            },
            Err(ProcessError::Fault(e)) => {
                error!(error = %e, detail = ?e, "Job attempt failed");
                Err(ProcessError::Fault(e))
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::memory::InMemoryAppointmentStore;
    use crate::ingest::jobs::{JobFailure, JobId, JobStatus};
    use crate::ingest::queue::InMemoryJobChannel;
    use futures::StreamExt;
    use std::io::Write;

    const HEADER: &str = "patient_id,doctor,appointment_date,reason";

    struct Harness {
        channel: Arc<InMemoryJobChannel>,
        store: Arc<InMemoryAppointmentStore>,
        dispatcher: JobDispatcher,
    }

    fn harness() -> Harness {
        let channel = Arc::new(InMemoryJobChannel::new());
        let store = Arc::new(InMemoryAppointmentStore::new());
        let dispatcher =
            JobDispatcher::new(channel.clone(), AppointmentFileProcessor::new(store.clone()));
        Harness {
            channel,
            store,
            dispatcher,
        }
    }

    /// Submit a job and take it off the channel, as a worker would
    async fn deliver(h: &Harness, filepath: &str) -> (AppointmentsFileJob, JobHandle) {
        let payload = AppointmentsFilePayload {
            filepath: filepath.to_string(),
        };
        h.channel.submit(payload, 3).await.unwrap();
        let task = h.channel.storage().next().await.unwrap();
        let handle = JobHandle {
            id: task.args.job_id,
            worker: "test-worker".to_string(),
            attempt: 1,
        };
        (task.args, handle)
    }

    async fn status(h: &Harness, id: JobId) -> JobStatus {
        h.channel.status(id).await.unwrap().unwrap().status
    }

    #[tokio::test]
    async fn test_wrong_extension_is_marked_failed() {
        let h = harness();
        let (job, handle) = deliver(&h, "/data/appointments.xlsx").await;

        let result = h.dispatcher.dispatch(&job, &handle).await;

        assert!(matches!(result, Err(ProcessError::Rejected(JobFailure::InvalidFileFormat))));
        let snapshot = h.channel.status(job.job_id).await.unwrap().unwrap();
        assert_eq!(snapshot.status, JobStatus::Failed);
        assert_eq!(snapshot.last_error.as_deref(), Some("Invalid file format"));
    }

    #[tokio::test]
    async fn test_read_error_is_returned_for_retry() {
        let h = harness();
        let (job, handle) = deliver(&h, "/missing/appointments.csv").await;

        let result = h.dispatcher.dispatch(&job, &handle).await;

        assert!(matches!(result, Err(ProcessError::Fault(_))));
        // Still held by the worker; the retry policy decides what happens next.
        assert_eq!(status(&h, job.job_id).await, JobStatus::Running);
    }

    #[tokio::test]
    async fn test_valid_file_is_processed() {
        let h = harness();
        let mut file = tempfile::Builder::new().suffix(".csv").tempfile().unwrap();
        write!(
            file,
            "{HEADER}\n101,Dr Smith,2024-06-01T09:00:00Z,Checkup\n101,Dr Smith,2024-06-01T09:00:00Z,Again\n"
        )
        .unwrap();

        let (job, handle) = deliver(&h, &file.path().to_string_lossy()).await;
        let summary = h.dispatcher.dispatch(&job, &handle).await.unwrap();

        assert_eq!(
            summary,
            UpsertSummary {
                created: 1,
                submitted: 2
            }
        );
        assert_eq!(h.store.len().await, 1);
    }
}
