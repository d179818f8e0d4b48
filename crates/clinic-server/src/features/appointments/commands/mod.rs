pub mod enqueue;

pub use enqueue::{
    EnqueueAppointmentsCommand, EnqueueAppointmentsError, EnqueueAppointmentsResponse,
    ENQUEUED_MESSAGE,
};
