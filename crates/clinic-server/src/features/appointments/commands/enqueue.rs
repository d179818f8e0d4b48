//! Enqueue appointments file command
//!
//! Accepts a path to a CSV file and submits a `process-appointments-file` job.
//! The path is not checked here; the worker validates extension and contents.

use std::sync::Arc;

use mediator::Request;
use serde::{Deserialize, Serialize};

use crate::features::shared::validation::{validate_required, RequiredFieldError};
use crate::ingest::jobs::{AppointmentsFilePayload, JobId};
use crate::ingest::{JobChannel, QueueError};

pub const ENQUEUED_MESSAGE: &str = "Appointment file added to the queue";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnqueueAppointmentsCommand {
    /// Path of the CSV file on the worker's filesystem
    #[serde(default)]
    pub filepath: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnqueueAppointmentsResponse {
    pub message: String,
    pub job_id: JobId,
}

#[derive(Debug, thiserror::Error)]
pub enum EnqueueAppointmentsError {
    #[error(transparent)]
    FilepathRequired(#[from] RequiredFieldError),

    #[error("The job queue did not accept the appointments file")]
    QueueSubmission,

    #[error("Failed to submit appointments file: {0}")]
    Queue(#[from] QueueError),
}

impl Request<Result<EnqueueAppointmentsResponse, EnqueueAppointmentsError>>
    for EnqueueAppointmentsCommand
{
}

impl EnqueueAppointmentsCommand {
    pub fn validate(&self) -> Result<(), EnqueueAppointmentsError> {
        validate_required(&self.filepath, "filepath")?;
        Ok(())
    }
}

#[tracing::instrument(skip(jobs, command), fields(filepath = %command.filepath))]
pub async fn handle(
    jobs: Arc<dyn JobChannel>,
    max_attempts: i32,
    command: EnqueueAppointmentsCommand,
) -> Result<EnqueueAppointmentsResponse, EnqueueAppointmentsError> {
    command.validate()?;

    let payload = AppointmentsFilePayload {
        filepath: command.filepath,
    };
    let job_id = jobs
        .submit(payload, max_attempts)
        .await?
        .ok_or(EnqueueAppointmentsError::QueueSubmission)?;

    tracing::info!(job_id = %job_id, "Appointments file enqueued");

    Ok(EnqueueAppointmentsResponse {
        message: ENQUEUED_MESSAGE.to_string(),
        job_id,
    })
}
