//! Jobs feature module
//!
//! Read-only view of ingestion job progress. Jobs are created by the
//! appointments upload route, never here.

pub mod queries;
pub mod routes;


pub use routes::jobs_routes;
