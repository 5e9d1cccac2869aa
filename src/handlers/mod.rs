mod health;
mod students;

pub use health::health_check;
pub use students::{list_students, submit_student};
