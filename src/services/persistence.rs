//! Persistence of consumed registration messages.
//!
//! Each message is handled independently. A message that cannot be parsed
//! or inserted is logged and dropped, and the caller moves on to the next
//! one. Nothing is retried or dead-lettered.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

use tracing::{error, info, warn};

use crate::metrics;
use crate::models::NewStudent;
use crate::store::StudentStore;

/// Why a consumed message was not persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropReason {
    EmptyPayload,
    Malformed,
    InsertFailed,
}

impl DropReason {
    pub fn as_str(self) -> &'static str {
        match self {
            DropReason::EmptyPayload => "empty_payload",
            DropReason::Malformed => "malformed",
            DropReason::InsertFailed => "insert_failed",
        }
    }
}

impl fmt::Display for DropReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of handling one message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MessageOutcome {
    Persisted(i32),
    Dropped(DropReason),
}

/// Inserts consumed messages into the store.
///
/// Counters use `Ordering::Relaxed`; they only feed logs and tests.
#[derive(Clone)]
pub struct PersistenceService {
    store: Arc<dyn StudentStore>,
    persisted: Arc<AtomicU64>,
    dropped: Arc<AtomicU64>,
}

impl PersistenceService {
    pub fn new(store: Arc<dyn StudentStore>) -> Self {
        Self {
            store,
            persisted: Arc::new(AtomicU64::new(0)),
            dropped: Arc::new(AtomicU64::new(0)),
        }
    }

    pub fn store(&self) -> &Arc<dyn StudentStore> {
        &self.store
    }

    /// Parse and insert one message payload.
    ///
    /// Never fails: problems are reported through the returned outcome.
    pub async fn handle_payload(&self, payload: Option<&[u8]>) -> MessageOutcome {
        let outcome = self.persist(payload).await;

        match outcome {
            MessageOutcome::Persisted(_) => {
                self.persisted.fetch_add(1, Ordering::Relaxed);
            }
            MessageOutcome::Dropped(reason) => {
                self.dropped.fetch_add(1, Ordering::Relaxed);
                metrics::record_dropped(reason.as_str());
            }
        }

        outcome
    }

    async fn persist(&self, payload: Option<&[u8]>) -> MessageOutcome {
        let Some(payload) = payload.filter(|p| !p.is_empty()) else {
            warn!("Received message without payload, skipping");
            return MessageOutcome::Dropped(DropReason::EmptyPayload);
        };

        let student = match NewStudent::from_payload(payload) {
            Ok(student) => student,
            Err(e) => {
                warn!(
                    payload_size = payload.len(),
                    error = %e,
                    "Failed to parse message as student record, skipping"
                );
                return MessageOutcome::Dropped(DropReason::Malformed);
            }
        };

        let start = Instant::now();
        match self.store.insert(&student).await {
            Ok(id) => {
                metrics::record_persisted(start.elapsed().as_secs_f64());
                info!(id, numero = %student.numero, "Student inserted");
                MessageOutcome::Persisted(id)
            }
            Err(e) => {
                error!(numero = %student.numero, error = %e, "Error processing message");
                MessageOutcome::Dropped(DropReason::InsertFailed)
            }
        }
    }

    pub fn persisted_count(&self) -> u64 {
        self.persisted.load(Ordering::Relaxed)
    }

    pub fn dropped_count(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}
