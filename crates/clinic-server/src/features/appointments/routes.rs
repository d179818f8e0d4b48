//! Appointment API routes
//!
//! - `POST /api/v1/appointments` - Enqueue a CSV file for ingestion
//! - `GET /api/v1/appointments?patient_id=&doctor=` - List appointments
//! - `GET /api/v1/appointments/:id` - Get a single appointment

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};

use crate::api::response::{ApiResponse, ErrorResponse};
use crate::features::shared::parse_path_id;
use crate::features::FeatureState;

use super::{
    commands::{EnqueueAppointmentsCommand, EnqueueAppointmentsError},
    queries::{GetAppointmentError, GetAppointmentQuery, ListAppointmentsError, ListAppointmentsQuery},
};

pub fn appointments_routes() -> Router<FeatureState> {
    Router::new()
        .route("/", get(list_appointments).post(enqueue_appointments))
        .route("/:id", get(get_appointment))
}

/// Enqueue an appointments file
///
/// # Response
///
/// - `201 Created` - Job accepted by the queue
/// - `400 Bad Request` - Empty filepath
/// - `500 Internal Server Error` - Queue did not accept the job
#[tracing::instrument(skip(state, command), fields(filepath = %command.filepath))]
async fn enqueue_appointments(
    State(state): State<FeatureState>,
    Json(command): Json<EnqueueAppointmentsCommand>,
) -> Result<Response, AppointmentApiError> {
    let response =
        super::commands::enqueue::handle(state.jobs.clone(), state.max_attempts, command).await?;

    Ok(ApiResponse::success(response).with_status(StatusCode::CREATED))
}

#[tracing::instrument(skip(state, query))]
async fn list_appointments(
    State(state): State<FeatureState>,
    Query(query): Query<ListAppointmentsQuery>,
) -> Result<Response, AppointmentApiError> {
    let views = super::queries::list::handle(state.appointments.clone(), query).await?;
    Ok(ApiResponse::success(views).into_response())
}

#[tracing::instrument(skip(state))]
async fn get_appointment(
    State(state): State<FeatureState>,
    Path(id): Path<String>,
) -> Result<Response, AppointmentApiError> {
    let Some(id) = parse_path_id(&id) else {
        return Err(AppointmentApiError::InvalidId(id));
    };

    let view = super::queries::get::handle(state.appointments.clone(), GetAppointmentQuery { id })
        .await?;
    Ok(ApiResponse::success(view).into_response())
}

// ============================================================================
// Error Handling
// ============================================================================

#[derive(Debug, thiserror::Error)]
enum AppointmentApiError {
    #[error(transparent)]
    Enqueue(#[from] EnqueueAppointmentsError),

    #[error(transparent)]
    List(#[from] ListAppointmentsError),

    #[error(transparent)]
    Get(#[from] GetAppointmentError),

    #[error("Invalid appointment id '{0}'")]
    InvalidId(String),
}

impl IntoResponse for AppointmentApiError {
    fn into_response(self) -> Response {
        let message = self.to_string();
        let (status, error) = match self {
            AppointmentApiError::Enqueue(EnqueueAppointmentsError::FilepathRequired(_))
            | AppointmentApiError::List(ListAppointmentsError::PatientId(_))
            | AppointmentApiError::List(ListAppointmentsError::Doctor(_))
            | AppointmentApiError::InvalidId(_) => (
                StatusCode::BAD_REQUEST,
                ErrorResponse::new("VALIDATION_ERROR", message),
            ),
            AppointmentApiError::Enqueue(EnqueueAppointmentsError::QueueSubmission)
            | AppointmentApiError::Enqueue(EnqueueAppointmentsError::Queue(_)) => {
                tracing::error!(error = %message, "Queue submission failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorResponse::new("QUEUE_ERROR", "Failed to add appointment file to the queue"),
                )
            },
            AppointmentApiError::Get(GetAppointmentError::NotFound) => {
                (StatusCode::NOT_FOUND, ErrorResponse::new("NOT_FOUND", message))
            },
            AppointmentApiError::List(ListAppointmentsError::Store(_))
            | AppointmentApiError::Get(GetAppointmentError::Store(_)) => {
                tracing::error!(error = %message, "Database error during appointment query");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorResponse::new("INTERNAL_ERROR", "A database error occurred"),
                )
            },
        };

        error.into_response_with(status)
    }
}
