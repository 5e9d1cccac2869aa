//! Kafka plumbing for both services.
//!
//! ```text
//! ┌──────────────────────────┐         ┌──────────────────────────┐
//! │ Ingress API              │         │ Integration Worker       │
//! │  KafkaPublisher          │ ──────▶ │  KafkaSubscriber         │
//! │  (FutureProducer)        │  topic  │  (StreamConsumer,        │
//! │  ConnectionState         │         │   group students-group)  │
//! └──────────────────────────┘         └──────────────────────────┘
//! ```
//!
//! # Module Structure
//!
//! - `connection` - Readiness state written by startup, read by handlers
//! - `producer` - Outbound publisher behind the `MessagePublisher` trait
//! - `consumer` - Inbound subscription for the worker
//!
//! librdkafka calls that block (metadata fetch, flush) are moved onto the
//! blocking pool with `spawn_blocking`.

mod connection;
mod consumer;
mod producer;

use crate::error::AppFuture;

pub use connection::{BrokerStatus, ConnectionState};
pub use consumer::KafkaSubscriber;
pub use producer::KafkaPublisher;

/// Outbound side of the registration topic.
///
/// Object-safe so the ingress state can hold an `Arc<dyn MessagePublisher>`.
pub trait MessagePublisher: Send + Sync {
    /// Establish the broker connection, retrying per the client policy.
    fn connect(&self) -> AppFuture<'_, ()>;

    /// Publish one message with `payload` as its value and wait for delivery.
    fn publish<'a>(&'a self, payload: &'a [u8]) -> AppFuture<'a, ()>;

    /// Topic this publisher writes to.
    fn topic(&self) -> &str;

    /// Flush pending deliveries and release the connection.
    fn close(&self) -> AppFuture<'_, ()>;
}

/// Inbound side of the registration topic, as seen by the consume loop.
pub trait MessageSource: Send + Sync {
    /// Wait for the next message and return its payload, if any.
    ///
    /// An `Err` is a receive failure; the caller decides whether to go on.
    fn next_payload(&self) -> AppFuture<'_, Option<Vec<u8>>>;
}
