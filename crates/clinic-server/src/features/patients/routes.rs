//! Patient API routes
//!
//! - `POST /api/v1/patients` - Create a patient
//! - `GET /api/v1/patients` - List patients
//! - `GET /api/v1/patients/:id` - Get a single patient

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};

use crate::api::response::{ApiResponse, ErrorResponse};
use crate::features::shared::parse_path_id;
use crate::features::FeatureState;

use super::{
    commands::{CreatePatientCommand, CreatePatientError},
    queries::{GetPatientError, GetPatientQuery, ListPatientsError, ListPatientsQuery},
};

pub fn patients_routes() -> Router<FeatureState> {
    Router::new()
        .route("/", get(list_patients).post(create_patient))
        .route("/:id", get(get_patient))
}

#[tracing::instrument(skip(state, command))]
async fn create_patient(
    State(state): State<FeatureState>,
    Json(command): Json<CreatePatientCommand>,
) -> Result<Response, PatientApiError> {
    let patient = super::commands::create::handle(state.patients.clone(), command).await?;
    Ok(ApiResponse::success(patient).with_status(StatusCode::CREATED))
}

#[tracing::instrument(skip(state))]
async fn list_patients(State(state): State<FeatureState>) -> Result<Response, PatientApiError> {
    let patients =
        super::queries::list::handle(state.patients.clone(), ListPatientsQuery::default()).await?;
    Ok(ApiResponse::success(patients).into_response())
}

#[tracing::instrument(skip(state))]
async fn get_patient(
    State(state): State<FeatureState>,
    Path(id): Path<String>,
) -> Result<Response, PatientApiError> {
    let Some(id) = parse_path_id(&id) else {
        return Err(PatientApiError::InvalidId(id));
    };

    let patient = super::queries::get::handle(state.patients.clone(), GetPatientQuery { id }).await?;
    Ok(ApiResponse::success(patient).into_response())
}

#[derive(Debug, thiserror::Error)]
enum PatientApiError {
    #[error(transparent)]
    Create(#[from] CreatePatientError),

    #[error(transparent)]
    List(#[from] ListPatientsError),

    #[error(transparent)]
    Get(#[from] GetPatientError),

    #[error("Invalid patient id '{0}'")]
    InvalidId(String),
}

impl IntoResponse for PatientApiError {
    fn into_response(self) -> Response {
        let message = self.to_string();
        let (status, error) = match self {
            PatientApiError::Create(CreatePatientError::Store(_))
            | PatientApiError::List(ListPatientsError::Store(_))
            | PatientApiError::Get(GetPatientError::Store(_)) => {
                tracing::error!(error = %message, "Database error during patient request");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorResponse::new("INTERNAL_ERROR", "A database error occurred"),
                )
            },
            PatientApiError::Create(_) | PatientApiError::InvalidId(_) => (
                StatusCode::BAD_REQUEST,
                ErrorResponse::new("VALIDATION_ERROR", message),
            ),
            PatientApiError::Get(GetPatientError::NotFound) => {
                (StatusCode::NOT_FOUND, ErrorResponse::new("NOT_FOUND", message))
            },
        };

        error.into_response_with(status)
    }
}
