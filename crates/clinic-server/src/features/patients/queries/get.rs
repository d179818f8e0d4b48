//! Get patient query

use std::sync::Arc;

use mediator::Request;
use serde::{Deserialize, Serialize};

use crate::db::{PatientStore, StoreError};
use crate::models::PatientView;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GetPatientQuery {
    pub id: i64,
}

#[derive(Debug, thiserror::Error)]
pub enum GetPatientError {
    #[error("No patient found")]
    NotFound,

    #[error("Database error: {0}")]
    Store(#[from] StoreError),
}

impl Request<Result<PatientView, GetPatientError>> for GetPatientQuery {}

#[tracing::instrument(skip(store), fields(id = query.id))]
pub async fn handle(
    store: Arc<dyn PatientStore>,
    query: GetPatientQuery,
) -> Result<PatientView, GetPatientError> {
    store
        .find_by_id(query.id)
        .await?
        .map(PatientView::from)
        .ok_or(GetPatientError::NotFound)
}
