use std::time::Duration;

use rdkafka::ClientConfig;
use rdkafka::producer::{FutureProducer, FutureRecord, Producer};
use tracing::{debug, info};

use super::MessagePublisher;
use crate::config::Config;
use crate::error::{AppError, AppFuture, AppResult};
use crate::retry::{RetryPolicy, retry};

/// Kafka publisher for the registration topic.
///
/// Creating the producer does not touch the network; `connect` proves the
/// cluster is reachable with a metadata round trip, retried with the
/// exponential policy from `Config::broker_connect_policy`.
#[derive(Clone)]
pub struct KafkaPublisher {
    producer: FutureProducer,
    topic: String,
    connect_policy: RetryPolicy,
    metadata_timeout: Duration,
    message_timeout: Duration,
}

impl KafkaPublisher {
    /// Build the producer from configuration.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if librdkafka rejects the client settings.
    pub fn new(config: &Config) -> AppResult<Self> {
        let producer: FutureProducer = ClientConfig::new()
            .set("bootstrap.servers", &config.kafka_broker)
            .set("client.id", &config.kafka_client_id)
            .set(
                "message.timeout.ms",
                config.kafka_message_timeout.as_millis().to_string(),
            )
            .set(
                "retry.backoff.ms",
                config.kafka_retry_initial.as_millis().to_string(),
            )
            .set(
                "retry.backoff.max.ms",
                config.kafka_retry_max_delay.as_millis().to_string(),
            )
            .set("message.send.max.retries", config.kafka_retries.to_string())
            .create()
            .map_err(|e| AppError::Config(format!("Invalid Kafka producer settings: {e}")))?;

        Ok(Self {
            producer,
            topic: config.kafka_topic.clone(),
            connect_policy: config.broker_connect_policy(),
            metadata_timeout: config.kafka_metadata_timeout,
            message_timeout: config.kafka_message_timeout,
        })
    }

    /// One metadata round trip against the cluster.
    async fn check_metadata(&self) -> AppResult<()> {
        let producer = self.producer.clone();
        let timeout = self.metadata_timeout;

        let brokers = tokio::task::spawn_blocking(move || {
            producer
                .client()
                .fetch_metadata(None, timeout)
                .map(|metadata| metadata.brokers().len())
        })
        .await
        .map_err(|e| AppError::Broker(format!("Metadata task failed: {e}")))??;

        debug!(brokers, "Kafka metadata fetched");
        Ok(())
    }
}

impl MessagePublisher for KafkaPublisher {
    fn connect(&self) -> AppFuture<'_, ()> {
        Box::pin(async move {
            retry(&self.connect_policy, "kafka producer", || self.check_metadata())
                .await
                .map_err(|e| AppError::Unavailable(e.to_string()))?;

            info!(topic = %self.topic, "Kafka producer connected");
            Ok(())
        })
    }

    fn publish<'a>(&'a self, payload: &'a [u8]) -> AppFuture<'a, ()> {
        Box::pin(async move {
            let record = FutureRecord::<(), [u8]>::to(&self.topic).payload(payload);

            self.producer
                .send(record, self.message_timeout)
                .await
                .map(|_| ())
                .map_err(|(e, _)| AppError::from(e))
        })
    }

    fn topic(&self) -> &str {
        &self.topic
    }

    fn close(&self) -> AppFuture<'_, ()> {
        Box::pin(async move {
            let producer = self.producer.clone();
            let timeout = self.message_timeout;

            tokio::task::spawn_blocking(move || producer.flush(timeout))
                .await
                .map_err(|e| AppError::Broker(format!("Flush task failed: {e}")))??;

            info!("Kafka producer flushed");
            Ok(())
        })
    }
}
