use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

use serde_json::Value;
use tracing::{error, info, instrument};

use crate::broker::{ConnectionState, MessagePublisher};
use crate::error::{AppError, AppResult};
use crate::metrics;
use crate::validation::{parse_json_body, validate_submission};

/// Accepts registration submissions and publishes them to Kafka.
///
/// # Counter Memory Ordering
///
/// `messages_sent` is a metrics-only counter and uses `Ordering::Relaxed`.
/// Readiness goes through `ConnectionState`, which uses `SeqCst`.
#[derive(Clone)]
pub struct RegistrationService {
    publisher: Arc<dyn MessagePublisher>,
    connection: Arc<ConnectionState>,
    messages_sent: Arc<AtomicU64>,
}

impl RegistrationService {
    pub fn new(publisher: Arc<dyn MessagePublisher>, connection: Arc<ConnectionState>) -> Self {
        Self {
            publisher,
            connection,
            messages_sent: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Validate a raw request body and publish it unchanged.
    ///
    /// Returns the parsed body for the response echo. The Kafka payload is
    /// the exact bytes received, so key order and extra fields survive.
    ///
    /// # Errors
    ///
    /// - `AppError::NotReady` before the producer has connected
    /// - `AppError::Validation` for malformed JSON or a missing field
    /// - `AppError::Broker` when the broker rejects or times out the send
    #[instrument(skip(self, body), fields(size = body.len()))]
    pub async fn submit(&self, body: &[u8]) -> AppResult<Value> {
        if !self.connection.is_connected() {
            return Err(AppError::NotReady);
        }

        let parsed = parse_json_body(body)?;
        let student = validate_submission(&parsed)?;

        let start = Instant::now();
        match self.publisher.publish(body).await {
            Ok(()) => {
                metrics::record_published("success", start.elapsed().as_secs_f64());
                self.messages_sent.fetch_add(1, Ordering::Relaxed);
                info!(
                    topic = self.publisher.topic(),
                    numero = %student.numero,
                    "Registration published"
                );
                Ok(parsed)
            }
            Err(e) => {
                metrics::record_published("error", start.elapsed().as_secs_f64());
                error!(error = %e, "Error sending to Kafka");
                Err(e)
            }
        }
    }

    /// Registrations published since startup.
    pub fn messages_sent(&self) -> u64 {
        self.messages_sent.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::error::AppFuture;
    use serde_json::json;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Recorder {
        sent: Mutex<Vec<Vec<u8>>>,
        fail: bool,
    }

    impl MessagePublisher for Recorder {
        fn connect(&self) -> AppFuture<'_, ()> {
            Box::pin(async { Ok(()) })
        }

        fn publish<'a>(&'a self, payload: &'a [u8]) -> AppFuture<'a, ()> {
            Box::pin(async move {
                if self.fail {
                    return Err(AppError::Broker("Local: Message timed out".into()));
                }
                self.sent.lock().unwrap().push(payload.to_vec());
                Ok(())
            })
        }

        fn topic(&self) -> &str {
            "students"
        }

        fn close(&self) -> AppFuture<'_, ()> {
            Box::pin(async { Ok(()) })
        }
    }

    fn service(recorder: Arc<Recorder>, connected: bool) -> RegistrationService {
        let connection = Arc::new(ConnectionState::new());
        if connected {
            connection.mark_connected();
        }
        RegistrationService::new(recorder, connection)
    }

    const BODY: &[u8] =
        br#"{"email":"ada@example.org","nom":"Lovelace","prenom":"Ada","numero":"42","extra":1}"#;

    #[tokio::test]
    async fn test_submit_publishes_raw_bytes() {
        let recorder = Arc::new(Recorder::default());
        let svc = service(recorder.clone(), true);

        let echoed = svc.submit(BODY).await.unwrap();

        assert_eq!(echoed["extra"], json!(1));
        assert_eq!(recorder.sent.lock().unwrap().as_slice(), &[BODY.to_vec()]);
        assert_eq!(svc.messages_sent(), 1);
    }

    #[tokio::test]
    async fn test_submit_before_connect_is_not_ready() {
        let recorder = Arc::new(Recorder::default());
        let svc = service(recorder.clone(), false);

        let err = svc.submit(BODY).await.unwrap_err();

        assert!(matches!(err, AppError::NotReady));
        assert!(recorder.sent.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_not_ready_wins_over_invalid_body() {
        let svc = service(Arc::new(Recorder::default()), false);
        let err = svc.submit(b"{}").await.unwrap_err();
        assert!(matches!(err, AppError::NotReady));
    }

    #[tokio::test]
    async fn test_invalid_body_is_not_published() {
        let recorder = Arc::new(Recorder::default());
        let svc = service(recorder.clone(), true);

        let err = svc.submit(br#"{"nom":"x"}"#).await.unwrap_err();

        assert!(matches!(err, AppError::Validation(_)));
        assert!(recorder.sent.lock().unwrap().is_empty());
        assert_eq!(svc.messages_sent(), 0);
    }

    #[tokio::test]
    async fn test_publish_failure_is_propagated() {
        let recorder = Arc::new(Recorder {
            fail: true,
            ..Recorder::default()
        });
        let svc = service(recorder, true);

        let err = svc.submit(BODY).await.unwrap_err();

        assert_eq!(err.to_string(), "Local: Message timed out");
        assert_eq!(svc.messages_sent(), 0);
    }
}
