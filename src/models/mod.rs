mod api;
mod student;

pub use api::{
    HealthResponse, KAFKA_CONNECTED, KAFKA_DISCONNECTED, STATUS_NOT_READY, STATUS_OK, STATUS_SENT,
    SubmitResponse,
};
pub use student::{NewStudent, Student};
