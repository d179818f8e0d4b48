//! CSV appointments pipeline

pub mod parser;
pub mod processor;
pub mod upsert;
pub mod validator;

pub use processor::{AppointmentFileProcessor, ProcessError};
pub use upsert::AppointmentUpserter;
