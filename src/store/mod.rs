//! Persistence of registration records.
//!
//! - `postgres` - the production store over a `sqlx` connection pool
//! - `memory` - an in-process store with the same observable behavior,
//!   used by tests and for running the API without a database

mod memory;
mod postgres;

use crate::error::AppFuture;
use crate::models::{NewStudent, Student};

pub use memory::MemoryStudentStore;
pub use postgres::{CREATE_TABLE_SQL, PgStudentStore};

/// Storage operations needed by both services.
pub trait StudentStore: Send + Sync {
    /// Trivial liveness query.
    fn ping(&self) -> AppFuture<'_, ()>;

    /// Create the `students` table if it does not exist. Idempotent.
    fn ensure_schema(&self) -> AppFuture<'_, ()>;

    /// Insert one record and return the assigned id.
    fn insert<'a>(&'a self, record: &'a NewStudent) -> AppFuture<'a, i32>;

    /// All rows, highest id first.
    fn list_newest_first(&self) -> AppFuture<'_, Vec<Student>>;

    /// Close every pooled connection.
    fn close(&self) -> AppFuture<'_, ()>;
}
