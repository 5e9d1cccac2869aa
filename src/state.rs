//! Shared application state for Axum handlers.
//!
//! - **Services**: registration publishing and the student store
//! - **Connection state**: broker readiness, written by the startup sequence
//!   and by shutdown, read by handlers
//! - **Configuration**: runtime configuration access
//!
//! # Lifecycle
//!
//! ```rust,ignore
//! let state = AppState::new(publisher, store, config);
//! // serve requests, then in parallel:
//! state.connect_broker().await?;   // readiness flips to connected
//! // ... on signal:
//! state.shutdown().await;          // readiness flips to closed, flush, close pool
//! ```

use std::sync::Arc;
use std::time::Instant;

use tracing::{info, warn};

use crate::broker::{ConnectionState, MessagePublisher};
use crate::config::Config;
use crate::error::AppResult;
use crate::metrics;
use crate::services::RegistrationService;
use crate::store::StudentStore;

/// Shared application state for Axum handlers.
///
/// Cloned for each request; every field is behind an `Arc`.
#[derive(Clone)]
pub struct AppState {
    /// Outbound Kafka client
    pub publisher: Arc<dyn MessagePublisher>,
    /// Student table access for listing
    pub store: Arc<dyn StudentStore>,
    /// Broker readiness
    pub connection: Arc<ConnectionState>,
    /// Validation and publishing of submissions
    pub registrations: RegistrationService,
    /// Application configuration
    pub config: Arc<Config>,
    /// Timestamp when the application started
    pub started_at: Instant,
}

impl AppState {
    pub fn new(
        publisher: Arc<dyn MessagePublisher>,
        store: Arc<dyn StudentStore>,
        config: Config,
    ) -> Self {
        let connection = Arc::new(ConnectionState::new());
        let registrations = RegistrationService::new(publisher.clone(), connection.clone());

        Self {
            publisher,
            store,
            connection,
            registrations,
            config: Arc::new(config),
            started_at: Instant::now(),
        }
    }

    /// Startup sequence for the outbound broker connection.
    ///
    /// On success the service reports ready. The caller terminates the
    /// process on error.
    pub async fn connect_broker(&self) -> AppResult<()> {
        self.publisher.connect().await?;

        if self.connection.mark_connected() {
            metrics::set_connection_status(true);
            info!(topic = self.publisher.topic(), "Kafka producer ready");
        } else {
            warn!(status = %self.connection.status(), "Broker connected after shutdown began");
        }

        Ok(())
    }

    /// Stop reporting ready, flush the producer and close the pool.
    pub async fn shutdown(&self) {
        info!("Initiating graceful shutdown");

        self.connection.mark_closed();
        metrics::set_connection_status(false);

        if let Err(e) = self.publisher.close().await {
            warn!(error = %e, "Failed to flush Kafka producer");
        }

        if let Err(e) = self.store.close().await {
            warn!(error = %e, "Failed to close database pool");
        }

        info!(
            uptime_secs = self.uptime_seconds(),
            sent = self.registrations.messages_sent(),
            "Shutdown complete"
        );
    }

    /// Get the application uptime in seconds.
    pub fn uptime_seconds(&self) -> u64 {
        self.started_at.elapsed().as_secs()
    }
}
