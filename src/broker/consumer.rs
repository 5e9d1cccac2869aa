use std::sync::Arc;
use std::time::Duration;

use rdkafka::ClientConfig;
use rdkafka::Message;
use rdkafka::consumer::{Consumer, StreamConsumer};
use rdkafka::error::KafkaResult;
use rdkafka::message::OwnedMessage;
use tracing::{debug, info, trace};

use super::MessageSource;
use crate::config::{CONSUMER_GROUP_ID, Config};
use crate::error::{AppError, AppFuture, AppResult};

/// Inbound subscription to the registration topic.
///
/// Offsets are never committed. Together with `auto.offset.reset=earliest`
/// this makes every start of the worker replay all retained messages.
pub struct KafkaSubscriber {
    consumer: Arc<StreamConsumer>,
    topic: String,
    metadata_timeout: Duration,
}

impl KafkaSubscriber {
    /// Build the consumer from configuration. Does not connect.
    pub fn new(config: &Config) -> AppResult<Self> {
        let consumer: StreamConsumer = ClientConfig::new()
            .set("bootstrap.servers", &config.kafka_broker)
            .set("client.id", &config.kafka_client_id)
            .set("group.id", CONSUMER_GROUP_ID)
            .set("auto.offset.reset", "earliest")
            .set("enable.auto.commit", "false")
            .set("enable.auto.offset.store", "false")
            .set("enable.partition.eof", "false")
            .set("allow.auto.create.topics", "true")
            .create()
            .map_err(|e| AppError::Config(format!("Invalid Kafka consumer settings: {e}")))?;

        Ok(Self {
            consumer: Arc::new(consumer),
            topic: config.kafka_topic.clone(),
            metadata_timeout: config.kafka_metadata_timeout,
        })
    }

    pub fn topic(&self) -> &str {
        &self.topic
    }

    /// One metadata round trip, used to wait for the broker.
    pub async fn check_metadata(&self) -> AppResult<()> {
        let consumer = self.consumer.clone();
        let timeout = self.metadata_timeout;

        let brokers = tokio::task::spawn_blocking(move || {
            consumer
                .fetch_metadata(None, timeout)
                .map(|metadata| metadata.brokers().len())
        })
        .await
        .map_err(|e| AppError::Broker(format!("Metadata task failed: {e}")))??;

        debug!(brokers, "Kafka metadata fetched");
        Ok(())
    }

    /// Join the consumer group on the registration topic.
    pub fn subscribe(&self) -> AppResult<()> {
        self.consumer.subscribe(&[self.topic.as_str()])?;
        info!(topic = %self.topic, group = CONSUMER_GROUP_ID, "Subscribed to topic");
        Ok(())
    }

    /// Wait for the next message.
    ///
    /// The message is detached from the consumer so it can be held across
    /// awaits while it is persisted.
    pub async fn recv(&self) -> KafkaResult<OwnedMessage> {
        self.consumer.recv().await.map(|message| message.detach())
    }

    /// Leave the consumer group.
    pub fn unsubscribe(&self) {
        self.consumer.unsubscribe();
        info!(topic = %self.topic, "Unsubscribed from topic");
    }
}

impl MessageSource for KafkaSubscriber {
    fn next_payload(&self) -> AppFuture<'_, Option<Vec<u8>>> {
        Box::pin(async move {
            let message = self.recv().await?;
            trace!(
                partition = message.partition(),
                offset = message.offset(),
                "Message received"
            );
            Ok(message.payload().map(<[u8]>::to_vec))
        })
    }
}
