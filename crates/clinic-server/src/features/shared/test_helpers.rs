//! Test helpers for route and handler tests
//!
//! ```rust,ignore
//! let app = appointments_routes().with_state(memory_state());
//! let body = read_json(app.oneshot(request).await.unwrap()).await;
//! ```

use std::sync::Arc;

use axum::response::Response;
use http_body_util::BodyExt;

use crate::db::memory::{InMemoryAppointmentStore, InMemoryPatientStore};
use crate::features::FeatureState;
use crate::ingest::config::DEFAULT_MAX_ATTEMPTS;
use crate::ingest::queue::InMemoryJobChannel;

/// Feature state backed entirely by in-memory stores and queue
pub fn memory_state() -> FeatureState {
    FeatureState {
        appointments: Arc::new(InMemoryAppointmentStore::new()),
        patients: Arc::new(InMemoryPatientStore::new()),
        jobs: Arc::new(InMemoryJobChannel::new()),
        max_attempts: DEFAULT_MAX_ATTEMPTS,
    }
}

/// Collect a response body and parse it as JSON
pub async fn read_json(response: Response) -> serde_json::Value {
    let bytes = response
        .into_body()
        .collect()
        .await
        .expect("failed to read response body")
        .to_bytes();
    serde_json::from_slice(&bytes).expect("response body is not JSON")
}
