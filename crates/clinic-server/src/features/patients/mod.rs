pub mod commands;
pub mod queries;
pub mod routes;

pub use commands::{CreatePatientCommand, CreatePatientError};
pub use queries::{GetPatientError, GetPatientQuery, ListPatientsError, ListPatientsQuery};
pub use routes::patients_routes;
