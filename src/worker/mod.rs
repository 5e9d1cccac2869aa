//! Integration worker lifecycle.
//!
//! ```text
//! WaitingForStore ──▶ TableReady ──▶ WaitingForBroker ──▶ Subscribed ──▶ Running
//!        │                                  │
//!        └──────────────▶ Fatal ◀───────────┘
//! ```
//!
//! Both waiting phases use the fixed-delay startup policy. Running ends
//! when the cancellation token fires.

use std::fmt;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::broker::{BrokerStatus, ConnectionState, KafkaSubscriber, MessageSource};
use crate::config::Config;
use crate::error::{AppError, AppResult};
use crate::metrics;
use crate::retry::retry;
use crate::services::PersistenceService;
use crate::store::StudentStore;

/// Lifecycle phase of the worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerPhase {
    WaitingForStore,
    TableReady,
    WaitingForBroker,
    Subscribed,
    Running,
    Fatal,
}

impl fmt::Display for WorkerPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            WorkerPhase::WaitingForStore => "WAITING_FOR_STORE",
            WorkerPhase::TableReady => "TABLE_READY",
            WorkerPhase::WaitingForBroker => "WAITING_FOR_BROKER",
            WorkerPhase::Subscribed => "SUBSCRIBED",
            WorkerPhase::Running => "RUNNING",
            WorkerPhase::Fatal => "FATAL",
        };
        f.write_str(name)
    }
}

/// Consumes the registration topic and persists every message.
pub struct IntegrationWorker {
    config: Arc<Config>,
    persistence: PersistenceService,
    connection: ConnectionState,
    phase: WorkerPhase,
}

impl IntegrationWorker {
    pub fn new(config: Arc<Config>, store: Arc<dyn StudentStore>) -> Self {
        Self {
            config,
            persistence: PersistenceService::new(store),
            connection: ConnectionState::new(),
            phase: WorkerPhase::WaitingForStore,
        }
    }

    pub fn phase(&self) -> WorkerPhase {
        self.phase
    }

    /// Status of the subscription, mirrored in `kafka_connection_status`.
    pub fn broker_status(&self) -> BrokerStatus {
        self.connection.status()
    }

    pub fn persistence(&self) -> &PersistenceService {
        &self.persistence
    }

    fn transition(&mut self, next: WorkerPhase) {
        info!(from = %self.phase, to = %next, "Worker phase changed");
        self.phase = next;
    }

    /// Wait for the store, then create the table.
    ///
    /// # Errors
    ///
    /// `AppError::Unavailable` once the startup policy is exhausted; the
    /// worker is left in `Fatal`.
    pub async fn prepare_store(&mut self) -> AppResult<()> {
        self.transition(WorkerPhase::WaitingForStore);

        let policy = self.config.startup_wait_policy();
        let store = self.persistence.store().clone();

        if let Err(e) = retry(&policy, "postgres", || store.ping()).await {
            self.transition(WorkerPhase::Fatal);
            return Err(AppError::Unavailable(e.to_string()));
        }

        info!("Connected to Postgres");
        store.ensure_schema().await?;
        self.transition(WorkerPhase::TableReady);
        Ok(())
    }

    /// Wait for the broker and subscribe to the registration topic.
    ///
    /// # Errors
    ///
    /// `AppError::Config` for invalid consumer settings,
    /// `AppError::Unavailable` once the startup policy is exhausted.
    pub async fn connect_broker(&mut self) -> AppResult<KafkaSubscriber> {
        self.transition(WorkerPhase::WaitingForBroker);

        let subscriber = KafkaSubscriber::new(&self.config)?;
        let policy = self.config.startup_wait_policy();

        if let Err(e) = retry(&policy, "kafka consumer", || subscriber.check_metadata()).await {
            metrics::set_connection_status(false);
            self.transition(WorkerPhase::Fatal);
            return Err(AppError::Unavailable(e.to_string()));
        }

        info!("Connected to Kafka");
        subscriber.subscribe()?;
        if self.connection.mark_connected() {
            metrics::set_connection_status(true);
        }
        self.transition(WorkerPhase::Subscribed);
        Ok(subscriber)
    }

    /// Process messages one at a time until `cancel` fires.
    ///
    /// Neither per-message failures nor receive errors stop the loop.
    pub async fn run(&mut self, source: &dyn MessageSource, cancel: CancellationToken) {
        self.transition(WorkerPhase::Running);

        loop {
            tokio::select! {
                biased;

                _ = cancel.cancelled() => {
                    debug!("Consume loop received cancellation signal");
                    break;
                }
                received = source.next_payload() => match received {
                    Ok(payload) => {
                        self.persistence.handle_payload(payload.as_deref()).await;
                    }
                    Err(e) => {
                        warn!(error = %e, "Failed to receive message");
                    }
                }
            }
        }

        info!(
            persisted = self.persistence.persisted_count(),
            dropped = self.persistence.dropped_count(),
            "Consume loop stopped"
        );
    }

    /// Leave the consumer group and close the pool.
    pub async fn shutdown(&self, subscriber: Option<&KafkaSubscriber>) {
        if let Some(subscriber) = subscriber {
            subscriber.unsubscribe();
        }
        self.connection.mark_closed();
        metrics::set_connection_status(false);

        if let Err(e) = self.persistence.store().close().await {
            warn!(error = %e, "Failed to close database pool");
        }

        info!("Integration worker stopped");
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::error::AppFuture;
    use crate::store::MemoryStudentStore;
    use std::time::Duration;
    use tokio::sync::{Mutex, mpsc};

    const VALID: &[u8] = br#"{"nom":"Curie","prenom":"Marie","numero":"88","email":"marie@example.org"}"#;

    struct ChannelSource {
        rx: Mutex<mpsc::UnboundedReceiver<AppResult<Option<Vec<u8>>>>>,
    }

    impl MessageSource for ChannelSource {
        fn next_payload(&self) -> AppFuture<'_, Option<Vec<u8>>> {
            Box::pin(async move {
                match self.rx.lock().await.recv().await {
                    Some(item) => item,
                    None => std::future::pending().await,
                }
            })
        }
    }

    fn fast_config() -> Arc<Config> {
        Arc::new(Config {
            startup_max_attempts: 3,
            startup_retry_delay: Duration::from_millis(10),
            ..Config::default()
        })
    }

    #[test]
    fn test_phase_display() {
        assert_eq!(WorkerPhase::WaitingForStore.to_string(), "WAITING_FOR_STORE");
        assert_eq!(WorkerPhase::Fatal.to_string(), "FATAL");
    }

    #[tokio::test]
    async fn test_prepare_store_creates_table() {
        let store = Arc::new(MemoryStudentStore::new());
        let mut worker = IntegrationWorker::new(fast_config(), store.clone());

        worker.prepare_store().await.unwrap();

        assert_eq!(worker.phase(), WorkerPhase::TableReady);
        assert!(store.is_schema_ready());
    }

    #[tokio::test]
    async fn test_prepare_store_unreachable_is_fatal() {
        let store = Arc::new(MemoryStudentStore::new());
        store.set_available(false);
        let mut worker = IntegrationWorker::new(fast_config(), store.clone());

        let err = worker.prepare_store().await.unwrap_err();

        assert!(matches!(err, AppError::Unavailable(_)));
        assert!(err.to_string().contains("after 3 attempts"));
        assert_eq!(worker.phase(), WorkerPhase::Fatal);
        assert!(!store.is_schema_ready());
    }

    #[tokio::test]
    async fn test_connect_broker_unreachable_is_fatal() {
        let config = Arc::new(Config {
            kafka_broker: "127.0.0.1:1".to_string(),
            kafka_metadata_timeout: Duration::from_millis(300),
            startup_max_attempts: 2,
            startup_retry_delay: Duration::from_millis(10),
            ..Config::default()
        });
        let store = Arc::new(MemoryStudentStore::with_schema());
        let mut worker = IntegrationWorker::new(config, store);

        let result = tokio::time::timeout(Duration::from_secs(10), worker.connect_broker())
            .await
            .unwrap();

        let err = result.err().unwrap();
        assert!(matches!(err, AppError::Unavailable(_)));
        assert!(err.to_string().contains("kafka consumer not available after 2 attempts"));
        assert_eq!(worker.phase(), WorkerPhase::Fatal);
        assert_eq!(worker.broker_status(), BrokerStatus::Disconnected);
    }

    #[tokio::test]
    async fn test_run_skips_bad_messages_until_cancelled() {
        let store = Arc::new(MemoryStudentStore::new());
        let mut worker = IntegrationWorker::new(fast_config(), store.clone());
        worker.prepare_store().await.unwrap();

        let (tx, rx) = mpsc::unbounded_channel();
        tx.send(Ok(Some(b"{broken".to_vec()))).unwrap();
        tx.send(Err(AppError::Broker("Broker: transport failure".into())))
            .unwrap();
        tx.send(Ok(None)).unwrap();
        tx.send(Ok(Some(VALID.to_vec()))).unwrap();
        let source = ChannelSource { rx: Mutex::new(rx) };

        let cancel = CancellationToken::new();
        let stopper = cancel.clone();
        let watcher = store.clone();
        tokio::spawn(async move {
            while watcher.rows().await.is_empty() {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
            stopper.cancel();
        });

        tokio::time::timeout(Duration::from_secs(5), worker.run(&source, cancel))
            .await
            .unwrap();

        let rows = store.rows().await;
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].numero, "88");
        assert_eq!(worker.phase(), WorkerPhase::Running);
        assert_eq!(worker.persistence().dropped_count(), 2);
    }

    #[tokio::test]
    async fn test_shutdown_closes_store() {
        let store = Arc::new(MemoryStudentStore::with_schema());
        let worker = IntegrationWorker::new(fast_config(), store.clone());

        worker.shutdown(None).await;

        assert!(store.ping().await.is_err());
        assert_eq!(worker.broker_status(), BrokerStatus::Closed);
    }
}
