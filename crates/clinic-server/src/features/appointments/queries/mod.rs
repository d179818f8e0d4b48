pub mod get;
pub mod list;

pub use get::{GetAppointmentError, GetAppointmentQuery};
pub use list::{ListAppointmentsError, ListAppointmentsQuery};
