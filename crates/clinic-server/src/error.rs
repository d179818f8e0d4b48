//! Server-specific error types

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;

use crate::api::response::ErrorResponse;
use crate::db::StoreError;
use crate::ingest::QueueError;

/// Result type alias for server operations
pub type ServerResult<T> = std::result::Result<T, ServerError>;

/// Errors surfaced by shared handlers (health, jobs)
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Queue error: {0}")]
    Queue(#[from] QueueError),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Validation(String),

    #[error("Service unavailable: {0}")]
    Unavailable(String),
}

impl AppError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::Store(_) | AppError::Queue(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let error = match self {
            AppError::Store(ref e) => {
                tracing::error!(error = %e, detail = ?e, "Store error");
                ErrorResponse::new("INTERNAL_ERROR", "A database error occurred")
            },
            AppError::Queue(ref e) => {
                tracing::error!(error = %e, detail = ?e, "Queue error");
                ErrorResponse::new("QUEUE_ERROR", "A job queue error occurred")
            },
            AppError::NotFound(message) => ErrorResponse::new("NOT_FOUND", message),
            AppError::Validation(message) => ErrorResponse::new("VALIDATION_ERROR", message),
            AppError::Unavailable(message) => ErrorResponse::new("UNAVAILABLE", message),
        };

        (status, Json(error)).into_response()
    }
}

/// Startup and shutdown failures of the binary
#[derive(Error, Debug)]
pub enum ServerError {
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),
}
