//! Readiness endpoint.
//!
//! `GET /health` reports whether the outbound Kafka connection is
//! established. It has no side effects and never touches the database.

use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use tracing::instrument;

use crate::models::HealthResponse;
use crate::state::AppState;

/// Health check endpoint.
///
/// # Response Body
///
/// 200 once the producer is connected:
///
/// ```json
/// { "status": "ok", "kafka": "connected" }
/// ```
///
/// 503 before that, and again once shutdown has begun:
///
/// ```json
/// { "status": "not ready", "kafka": "disconnected" }
/// ```
#[instrument(skip(state))]
pub async fn health_check(State(state): State<AppState>) -> (StatusCode, Json<HealthResponse>) {
    if state.connection.is_connected() {
        (StatusCode::OK, Json(HealthResponse::ready()))
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, Json(HealthResponse::not_ready()))
    }
}
