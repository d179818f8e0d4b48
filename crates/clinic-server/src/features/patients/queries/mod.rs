pub mod get;
pub mod list;

pub use get::{GetPatientError, GetPatientQuery};
pub use list::{ListPatientsError, ListPatientsQuery};
