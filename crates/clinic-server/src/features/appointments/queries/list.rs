//! List appointments query

use std::sync::Arc;

use mediator::Request;
use serde::{Deserialize, Serialize};

use crate::db::{AppointmentStore, StoreError};
use crate::features::shared::validation::{
    contains_digit, parse_patient_id, PatientIdValidationError, PersonNameValidationError,
};
use crate::models::{AppointmentFilter, AppointmentView};

/// Both filters are optional; absent filters match everything.
///
/// `patient_id` arrives as text so a malformed value can be reported with the
/// same message the CSV validator uses.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ListAppointmentsQuery {
    pub patient_id: Option<String>,
    pub doctor: Option<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum ListAppointmentsError {
    #[error(transparent)]
    PatientId(#[from] PatientIdValidationError),

    #[error(transparent)]
    Doctor(#[from] PersonNameValidationError),

    #[error("Database error: {0}")]
    Store(#[from] StoreError),
}

impl Request<Result<Vec<AppointmentView>, ListAppointmentsError>> for ListAppointmentsQuery {}

impl ListAppointmentsQuery {
    pub fn into_filter(self) -> Result<AppointmentFilter, ListAppointmentsError> {
        let patient_id = self.patient_id.as_deref().map(parse_patient_id).transpose()?;

        // Only the digit rule applies; `?doctor=` filters on the empty name
        if self.doctor.as_deref().is_some_and(contains_digit) {
            return Err(PersonNameValidationError::ContainsDigits.into());
        }

        Ok(AppointmentFilter {
            patient_id,
            doctor: self.doctor,
        })
    }
}

#[tracing::instrument(skip(store, query), fields(patient_id = ?query.patient_id, doctor = ?query.doctor))]
pub async fn handle(
    store: Arc<dyn AppointmentStore>,
    query: ListAppointmentsQuery,
) -> Result<Vec<AppointmentView>, ListAppointmentsError> {
    let filter = query.into_filter()?;
    let records = store.list(&filter).await?;

    tracing::debug!(count = records.len(), "Appointments listed");

    Ok(records.into_iter().map(AppointmentView::from).collect())
}
