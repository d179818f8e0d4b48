//! Get job query
//!
//! Query to get a single ingestion job by ID.

use std::sync::Arc;

use mediator::Request;
use serde::{Deserialize, Serialize};

use crate::ingest::{JobChannel, JobId, JobSnapshot, QueueError};

/// Query to get a job by ID
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GetJobQuery {
    pub job_id: String,
}

/// Error type for get job query
#[derive(Debug, thiserror::Error)]
pub enum GetJobError {
    #[error("Invalid job id '{0}'")]
    InvalidId(String),
    #[error("No job found")]
    NotFound,
    #[error("Queue error: {0}")]
    Queue(#[from] QueueError),
}

impl Request<Result<JobSnapshot, GetJobError>> for GetJobQuery {}

pub async fn handle(jobs: Arc<dyn JobChannel>, query: GetJobQuery) -> Result<JobSnapshot, GetJobError> {
    let id = JobId::from_string(query.job_id.trim())
        .map_err(|_| GetJobError::InvalidId(query.job_id.clone()))?;

    jobs.status(id).await?.ok_or(GetJobError::NotFound)
}
