use std::sync::atomic::{AtomicBool, Ordering};

use chrono::Utc;
use tokio::sync::Mutex;

use super::StudentStore;
use crate::error::{AppError, AppFuture};
use crate::models::{NewStudent, Student};

/// In-process store mirroring the Postgres behavior the services rely on:
/// serial ids, newest-first listing, and failures while the table is
/// missing or the "server" is down.
pub struct MemoryStudentStore {
    rows: Mutex<Vec<Student>>,
    available: AtomicBool,
    schema_ready: AtomicBool,
}

impl MemoryStudentStore {
    /// A reachable store without the table.
    pub fn new() -> Self {
        Self {
            rows: Mutex::new(Vec::new()),
            available: AtomicBool::new(true),
            schema_ready: AtomicBool::new(false),
        }
    }

    /// A reachable store with the table already created.
    pub fn with_schema() -> Self {
        let store = Self::new();
        store.schema_ready.store(true, Ordering::SeqCst);
        store
    }

    /// Simulate the server going away (`false`) or coming back (`true`).
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    pub fn is_schema_ready(&self) -> bool {
        self.schema_ready.load(Ordering::SeqCst)
    }

    /// Snapshot of stored rows in insertion order.
    pub async fn rows(&self) -> Vec<Student> {
        self.rows.lock().await.clone()
    }

    fn check_available(&self) -> Result<(), AppError> {
        if self.available.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(AppError::Database(
                "error communicating with database: Connection refused".to_string(),
            ))
        }
    }

    fn check_table(&self) -> Result<(), AppError> {
        if self.is_schema_ready() {
            Ok(())
        } else {
            Err(AppError::Database(
                r#"relation "students" does not exist"#.to_string(),
            ))
        }
    }
}

impl Default for MemoryStudentStore {
    fn default() -> Self {
        Self::new()
    }
}

impl StudentStore for MemoryStudentStore {
    fn ping(&self) -> AppFuture<'_, ()> {
        Box::pin(async move { self.check_available() })
    }

    fn ensure_schema(&self) -> AppFuture<'_, ()> {
        Box::pin(async move {
            self.check_available()?;
            self.schema_ready.store(true, Ordering::SeqCst);
            Ok(())
        })
    }

    fn insert<'a>(&'a self, record: &'a NewStudent) -> AppFuture<'a, i32> {
        Box::pin(async move {
            self.check_available()?;
            self.check_table()?;

            let mut rows = self.rows.lock().await;
            let id = rows.last().map_or(1, |row| row.id + 1);
            rows.push(Student::from_new(id, record.clone(), Utc::now().naive_utc()));
            Ok(id)
        })
    }

    fn list_newest_first(&self) -> AppFuture<'_, Vec<Student>> {
        Box::pin(async move {
            self.check_available()?;
            self.check_table()?;

            let mut rows = self.rows.lock().await.clone();
            rows.sort_by(|a, b| b.id.cmp(&a.id));
            Ok(rows)
        })
    }

    fn close(&self) -> AppFuture<'_, ()> {
        Box::pin(async move {
            self.set_available(false);
            Ok(())
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    fn record(numero: &str) -> NewStudent {
        NewStudent {
            nom: "Lovelace".into(),
            prenom: "Ada".into(),
            numero: numero.into(),
            email: "ada@example.org".into(),
        }
    }

    #[tokio::test]
    async fn test_insert_requires_schema() {
        let store = MemoryStudentStore::new();

        let err = store.insert(&record("1")).await.unwrap_err();
        assert!(err.to_string().contains("does not exist"));

        store.ensure_schema().await.unwrap();
        assert_eq!(store.insert(&record("1")).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_ensure_schema_is_idempotent() {
        let store = MemoryStudentStore::new();
        store.ensure_schema().await.unwrap();
        store.insert(&record("1")).await.unwrap();
        store.ensure_schema().await.unwrap();

        assert_eq!(store.rows().await.len(), 1);
    }

    #[tokio::test]
    async fn test_list_newest_first() {
        let store = MemoryStudentStore::with_schema();
        for n in ["a", "b", "c"] {
            store.insert(&record(n)).await.unwrap();
        }

        let listed = store.list_newest_first().await.unwrap();
        let ids: Vec<i32> = listed.iter().map(|s| s.id).collect();
        assert_eq!(ids, vec![3, 2, 1]);
        assert_eq!(listed[0].numero, "c");
    }

    #[tokio::test]
    async fn test_unavailable_store_fails_everything() {
        let store = MemoryStudentStore::with_schema();
        store.set_available(false);

        assert!(store.ping().await.is_err());
        assert!(store.insert(&record("1")).await.is_err());
        assert!(store.list_newest_first().await.is_err());

        store.set_available(true);
        assert!(store.ping().await.is_ok());
    }
}
