use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use tracing::{debug, info};

use super::StudentStore;
use crate::config::Config;
use crate::error::{AppFuture, AppResult};
use crate::models::{NewStudent, Student};

/// Schema of the registration table.
pub const CREATE_TABLE_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS students(
    id SERIAL PRIMARY KEY,
    nom TEXT NOT NULL,
    prenom TEXT NOT NULL,
    numero TEXT NOT NULL,
    email TEXT NOT NULL,
    created_at TIMESTAMP DEFAULT NOW()
)
"#;

const INSERT_SQL: &str =
    "INSERT INTO students(nom, prenom, numero, email) VALUES($1, $2, $3, $4) RETURNING id";

const LIST_SQL: &str =
    "SELECT id, nom, prenom, numero, email, created_at FROM students ORDER BY id DESC";

/// Postgres-backed store.
///
/// The pool connects lazily: constructing it never fails on an unreachable
/// server, the first query does.
#[derive(Clone)]
pub struct PgStudentStore {
    pool: PgPool,
}

impl PgStudentStore {
    /// Build a lazily connecting pool from configuration.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` for an unparsable `DATABASE_URL`.
    pub fn connect_lazy(config: &Config) -> AppResult<Self> {
        let options = config.pg_connect_options()?;

        let pool = PgPoolOptions::new()
            .max_connections(config.db_max_connections)
            .acquire_timeout(config.db_acquire_timeout)
            .connect_lazy_with(options);

        Ok(Self { pool })
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

impl StudentStore for PgStudentStore {
    fn ping(&self) -> AppFuture<'_, ()> {
        Box::pin(async move {
            sqlx::query("SELECT 1").execute(&self.pool).await?;
            Ok(())
        })
    }

    fn ensure_schema(&self) -> AppFuture<'_, ()> {
        Box::pin(async move {
            sqlx::query(CREATE_TABLE_SQL).execute(&self.pool).await?;
            info!("Table 'students' ready");
            Ok(())
        })
    }

    fn insert<'a>(&'a self, record: &'a NewStudent) -> AppFuture<'a, i32> {
        Box::pin(async move {
            let id = sqlx::query_scalar::<_, i32>(INSERT_SQL)
                .bind(&record.nom)
                .bind(&record.prenom)
                .bind(&record.numero)
                .bind(&record.email)
                .fetch_one(&self.pool)
                .await?;

            Ok(id)
        })
    }

    fn list_newest_first(&self) -> AppFuture<'_, Vec<Student>> {
        Box::pin(async move {
            let rows = sqlx::query_as::<_, Student>(LIST_SQL)
                .fetch_all(&self.pool)
                .await?;

            debug!(count = rows.len(), "Retrieved students from database");
            Ok(rows)
        })
    }

    fn close(&self) -> AppFuture<'_, ()> {
        Box::pin(async move {
            self.pool.close().await;
            info!("Database pool closed");
            Ok(())
        })
    }
}
