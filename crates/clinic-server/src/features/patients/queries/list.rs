//! List patients query

use std::sync::Arc;

use mediator::Request;
use serde::{Deserialize, Serialize};

use crate::db::{PatientStore, StoreError};
use crate::models::PatientView;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ListPatientsQuery {}

#[derive(Debug, thiserror::Error)]
pub enum ListPatientsError {
    #[error("Database error: {0}")]
    Store(#[from] StoreError),
}

impl Request<Result<Vec<PatientView>, ListPatientsError>> for ListPatientsQuery {}

pub async fn handle(
    store: Arc<dyn PatientStore>,
    _query: ListPatientsQuery,
) -> Result<Vec<PatientView>, ListPatientsError> {
    let records = store.list().await?;
    Ok(records.into_iter().map(PatientView::from).collect())
}
