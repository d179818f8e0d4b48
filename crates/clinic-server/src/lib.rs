//! Clinic Server Library
#![recursion_limit = "256"]
//!
//! HTTP service that ingests appointment CSV files in the background and
//! serves appointments and patients.
//!
//! # Overview
//!
//! - **Ingestion**: `POST /api/v1/appointments` enqueues a file path; apalis
//!   workers pick the job up, then decode, validate and upsert the file
//! - **Idempotence**: one record per `(doctor, patient_id, appointment_date)`,
//!   enforced by a single insert-if-absent statement
//! - **Queries**: filtered appointment listing, patient CRUD, job status
//! - **Configuration**: environment variables, see [`config::Config`]
//!
//! # Architecture
//!
//! Features follow a **CQRS** split: commands (enqueue, create) and queries
//! (get, list) are plain request types with `handle` functions, wired to
//! Axum in each feature's `routes.rs`.
//!
//! Storage sits behind the `AppointmentStore` and `PatientStore` traits and
//! the job queue behind `JobChannel`, each with PostgreSQL and in-memory
//! implementations; `STORE_BACKEND` chooses between them.
//!
//! ## Framework Stack
//!
//! - **Axum**: HTTP routing and extractors
//! - **SQLx**: PostgreSQL access and migrations
//! - **apalis**: Job storage, retries and worker runtime
//! - **Tower**: Middleware and service abstractions
//!
//! # Example
//!
//! ```no_run
//! use clinic_server::{api, config::Config, features::FeatureState};
//!
//! async fn run(state: FeatureState) -> anyhow::Result<()> {
//!     let config = Config::load()?;
//!     let app = api::create_router(state, &config);
//!     api::serve(app, &config, std::future::pending()).await?;
//!     Ok(())
//! }
//! ```

pub mod api;
pub mod config;
pub mod db;
pub mod error;
pub mod features;
pub mod ingest;
pub mod middleware;
pub mod models;

pub use error::{AppError, ServerError, ServerResult};
