//! Business logic between the transports and the broker/store clients.

mod persistence;
mod registration;

pub use persistence::{DropReason, MessageOutcome, PersistenceService};
pub use registration::RegistrationService;
