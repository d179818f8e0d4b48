//! Feature modules implementing the clinic API
//!
//! Each feature is a vertical slice with its own commands, queries and
//! routes, following the CQRS split:
//!
//! - `commands/` - Write operations (enqueue, create)
//! - `queries/` - Read operations (get, list)
//! - `routes.rs` - HTTP route definitions and error mapping
//!
//! Commands and queries implement `mediator::Request`; their `handle`
//! functions take the store or queue they need plus the request.
//!
//! # Features
//!
//! - **appointments**: Enqueue CSV files, list and get appointments
//! - **patients**: Create, list and get patients
//! - **jobs**: Ingestion job status

pub mod appointments;
pub mod jobs;
pub mod patients;
pub mod shared;

use std::sync::Arc;

use axum::Router;

use crate::db::{AppointmentStore, PatientStore};
use crate::ingest::JobChannel;

/// Shared state for all feature routes
#[derive(Clone)]
pub struct FeatureState {
    pub appointments: Arc<dyn AppointmentStore>,
    pub patients: Arc<dyn PatientStore>,
    /// Producer side of the ingestion queue
    pub jobs: Arc<dyn JobChannel>,
    /// Attempt budget for every enqueued file
    pub max_attempts: i32,
}

/// Creates the API router with all feature routes mounted
///
/// - `/appointments` - Upload, list and get appointments
/// - `/patients` - Patient records
/// - `/jobs` - Ingestion job status
pub fn router(state: FeatureState) -> Router<()> {
    Router::new()
        .nest("/appointments", appointments::appointments_routes().with_state(state.clone()))
        .nest("/patients", patients::patients_routes().with_state(state.clone()))
        .nest("/jobs", jobs::jobs_routes().with_state(state))
}
