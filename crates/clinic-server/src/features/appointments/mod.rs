pub mod commands;
pub mod queries;
pub mod routes;

pub use commands::{
    EnqueueAppointmentsCommand, EnqueueAppointmentsError, EnqueueAppointmentsResponse,
};

pub use queries::{
    GetAppointmentError, GetAppointmentQuery, ListAppointmentsError, ListAppointmentsQuery,
};

pub use routes::appointments_routes;
