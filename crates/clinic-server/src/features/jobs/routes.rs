//! Job routes
//!
//! - `GET /api/v1/jobs/:job_id` - Current state of an ingestion job

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Router,
};

use crate::api::response::{ApiResponse, ErrorResponse};
use crate::features::FeatureState;

use super::queries::{get_job::handle as handle_get_job, GetJobError, GetJobQuery};

pub fn jobs_routes() -> Router<FeatureState> {
    Router::new().route("/:job_id", get(get_job))
}

#[tracing::instrument(skip(state))]
async fn get_job(State(state): State<FeatureState>, Path(job_id): Path<String>) -> Response {
    match handle_get_job(state.jobs.clone(), GetJobQuery { job_id }).await {
        Ok(job) => ApiResponse::success(job).into_response(),
        Err(e @ GetJobError::InvalidId(_)) => {
            ErrorResponse::new("VALIDATION_ERROR", e.to_string()).into_response_with(StatusCode::BAD_REQUEST)
        },
        Err(e @ GetJobError::NotFound) => {
            ErrorResponse::new("NOT_FOUND", e.to_string()).into_response_with(StatusCode::NOT_FOUND)
        },
        Err(GetJobError::Queue(e)) => {
            tracing::error!(error = %e, detail = ?e, "Failed to read job status");
            ErrorResponse::new("QUEUE_ERROR", "Failed to read job status")
                .into_response_with(StatusCode::INTERNAL_SERVER_ERROR)
        },
    }
}
