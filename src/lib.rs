//! # Student Registration Relay
//!
//! Two services that decouple ingestion of student registrations from their
//! persistence, with Kafka in between:
//!
//! - **Ingress API** (`ingress-api`): validates `POST /students` bodies and
//!   publishes each one unchanged to the `students` topic; lists stored rows
//!   and reports broker readiness.
//! - **Integration Worker** (`integration-worker`): waits for Postgres and
//!   Kafka, creates the `students` table, then inserts every consumed
//!   message as one row.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────┐  POST /students  ┌──────────────┐  students  ┌───────────────┐
//! │    client    │ ───────────────▶ │ Ingress API  │ ─────────▶ │ Integration   │
//! └──────────────┘                  │ (axum)       │   topic    │ Worker        │
//!                                   └──────┬───────┘            └───────┬───────┘
//!                                          │ GET /students              │ INSERT
//!                                          ▼                            ▼
//!                                   ┌──────────────────────────────────────────┐
//!                                   │          Postgres: students table        │
//!                                   └──────────────────────────────────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use student_relay::{AppState, Config, KafkaPublisher, PgStudentStore, build_router};
//!
//! # async fn run() -> student_relay::AppResult<()> {
//! let config = Config::from_env()?;
//! let publisher = Arc::new(KafkaPublisher::new(&config)?);
//! let store = Arc::new(PgStudentStore::connect_lazy(&config)?);
//!
//! let state = AppState::new(publisher, store, config);
//! let app = build_router(state.clone());
//! state.connect_broker().await?;
//! // serve `app`...
//! # Ok(())
//! # }
//! ```

pub mod broker;
pub mod config;
pub mod error;
pub mod handlers;
pub mod metrics;
pub mod middleware;
pub mod models;
pub mod retry;
pub mod routes;
pub mod services;
pub mod state;
pub mod store;
pub mod utils;
pub mod validation;
pub mod worker;

// Re-exports for convenience
pub use broker::{ConnectionState, KafkaPublisher, KafkaSubscriber, MessagePublisher, MessageSource};
pub use config::Config;
pub use error::{AppError, AppResult};
pub use routes::build_router;
pub use state::AppState;
pub use store::{MemoryStudentStore, PgStudentStore, StudentStore};
pub use worker::{IntegrationWorker, WorkerPhase};
