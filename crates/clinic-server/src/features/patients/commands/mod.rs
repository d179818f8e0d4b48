pub mod create;

pub use create::{CreatePatientCommand, CreatePatientError};
