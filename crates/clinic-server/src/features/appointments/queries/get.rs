//! Get appointment query

use std::sync::Arc;

use mediator::Request;
use serde::{Deserialize, Serialize};

use crate::db::{AppointmentStore, StoreError};
use crate::models::AppointmentView;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GetAppointmentQuery {
    /// External id assigned by the store
    pub id: i64,
}

#[derive(Debug, thiserror::Error)]
pub enum GetAppointmentError {
    #[error("No appointment found")]
    NotFound,

    #[error("Database error: {0}")]
    Store(#[from] StoreError),
}

impl Request<Result<AppointmentView, GetAppointmentError>> for GetAppointmentQuery {}

#[tracing::instrument(skip(store), fields(id = query.id))]
pub async fn handle(
    store: Arc<dyn AppointmentStore>,
    query: GetAppointmentQuery,
) -> Result<AppointmentView, GetAppointmentError> {
    store
        .find_by_id(query.id)
        .await?
        .map(AppointmentView::from)
        .ok_or(GetAppointmentError::NotFound)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::memory::InMemoryAppointmentStore;
    use crate::models::AppointmentCandidate;

    #[tokio::test]
    async fn test_get_existing() {
        let store = Arc::new(InMemoryAppointmentStore::new());
        store
            .insert_if_absent(&[AppointmentCandidate {
                patient_id: 5,
                doctor: "Dr Grey".to_string(),
                appointment_date: "2024-02-29T12:00".to_string(),
                reason: "Consult".to_string(),
            }])
            .await
            .unwrap();

        let view = handle(store, GetAppointmentQuery { id: 1 }).await.unwrap();
        assert_eq!(view.doctor, "Dr Grey");
        assert_eq!(view.appointment_date, "2024-02-29T12:00");
    }

    #[tokio::test]
    async fn test_missing_is_not_found() {
        let store = Arc::new(InMemoryAppointmentStore::new());
        let err = handle(store, GetAppointmentQuery { id: 999 }).await.unwrap_err();
        assert!(matches!(err, GetAppointmentError::NotFound));
        assert_eq!(err.to_string(), "No appointment found");
    }
}
