use serde::{Deserialize, Serialize};

/// Readiness values reported by `GET /health`.
pub const STATUS_OK: &str = "ok";
pub const STATUS_NOT_READY: &str = "not ready";
pub const KAFKA_CONNECTED: &str = "connected";
pub const KAFKA_DISCONNECTED: &str = "disconnected";

/// Status value returned after a successful publish.
pub const STATUS_SENT: &str = "sent to kafka";

/// Health check response.
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    /// "ok" or "not ready"
    pub status: String,
    /// "connected" or "disconnected"
    pub kafka: String,
}

impl HealthResponse {
    pub fn ready() -> Self {
        Self {
            status: STATUS_OK.to_string(),
            kafka: KAFKA_CONNECTED.to_string(),
        }
    }

    pub fn not_ready() -> Self {
        Self {
            status: STATUS_NOT_READY.to_string(),
            kafka: KAFKA_DISCONNECTED.to_string(),
        }
    }
}

/// Response after a registration was handed to Kafka.
#[derive(Debug, Serialize)]
pub struct SubmitResponse {
    pub status: &'static str,
    /// The request body exactly as received
    pub data: serde_json::Value,
}

impl SubmitResponse {
    pub fn sent(data: serde_json::Value) -> Self {
        Self {
            status: STATUS_SENT,
            data,
        }
    }
}
