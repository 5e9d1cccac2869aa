//! Prometheus metrics for both services.
//!
//! Each binary installs its own exporter on `METRICS_PORT` (0 disables it).
//! The default is 9090 for `ingress-api` and 9091 for `integration-worker`.
//!
//! # Available Metrics
//!
//! ## Counters
//! - `students_published_total` - Registrations handed to Kafka (label: status)
//! - `students_persisted_total` - Rows inserted by the worker
//! - `students_dropped_total` - Consumed messages discarded (label: reason)
//!
//! ## Histograms
//! - `students_publish_duration_seconds` - Time to delivery confirmation
//! - `students_insert_duration_seconds` - Time spent in the insert statement
//!
//! ## Gauges
//! - `kafka_connection_status` - 1 = connected, 0 = not connected. The API
//!   sets it for its producer, the worker for its subscription.

use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;
use tracing::{error, info};

/// Metric names as constants for consistency.
pub mod names {
    pub const STUDENTS_PUBLISHED_TOTAL: &str = "students_published_total";
    pub const STUDENTS_PERSISTED_TOTAL: &str = "students_persisted_total";
    pub const STUDENTS_DROPPED_TOTAL: &str = "students_dropped_total";
    pub const PUBLISH_DURATION_SECONDS: &str = "students_publish_duration_seconds";
    pub const INSERT_DURATION_SECONDS: &str = "students_insert_duration_seconds";
    pub const KAFKA_CONNECTION_STATUS: &str = "kafka_connection_status";
}

/// Install the Prometheus exporter and describe all metrics.
pub fn init_metrics(metrics_addr: SocketAddr) -> Result<(), String> {
    PrometheusBuilder::new()
        .with_http_listener(metrics_addr)
        .install()
        .map_err(|e| format!("Failed to install Prometheus exporter: {e}"))?;

    describe_counter!(
        names::STUDENTS_PUBLISHED_TOTAL,
        "Registrations published to Kafka"
    );
    describe_counter!(
        names::STUDENTS_PERSISTED_TOTAL,
        "Registrations inserted into the students table"
    );
    describe_counter!(
        names::STUDENTS_DROPPED_TOTAL,
        "Consumed messages dropped without being persisted"
    );
    describe_histogram!(
        names::PUBLISH_DURATION_SECONDS,
        "Publish duration until delivery confirmation, in seconds"
    );
    describe_histogram!(
        names::INSERT_DURATION_SECONDS,
        "Insert statement duration in seconds"
    );
    describe_gauge!(
        names::KAFKA_CONNECTION_STATUS,
        "Kafka connection status (1 = connected, 0 = not connected)"
    );

    info!(addr = %metrics_addr, "Prometheus metrics endpoint started");
    Ok(())
}

/// Initialize metrics when an address is configured, logging failures.
///
/// Metrics are never a reason to stop the process.
pub fn try_init_metrics(metrics_addr: Option<SocketAddr>) {
    let Some(addr) = metrics_addr else {
        info!("Metrics disabled (METRICS_PORT=0)");
        return;
    };

    if let Err(e) = init_metrics(addr) {
        error!(error = %e, "Failed to initialize metrics, continuing without metrics");
    }
}

pub fn record_published(status: &'static str, duration_secs: f64) {
    counter!(names::STUDENTS_PUBLISHED_TOTAL, "status" => status).increment(1);
    histogram!(names::PUBLISH_DURATION_SECONDS).record(duration_secs);
}

pub fn record_persisted(duration_secs: f64) {
    counter!(names::STUDENTS_PERSISTED_TOTAL).increment(1);
    histogram!(names::INSERT_DURATION_SECONDS).record(duration_secs);
}

pub fn record_dropped(reason: &'static str) {
    counter!(names::STUDENTS_DROPPED_TOTAL, "reason" => reason).increment(1);
}

pub fn set_connection_status(connected: bool) {
    gauge!(names::KAFKA_CONNECTION_STATUS).set(if connected { 1.0 } else { 0.0 });
}
