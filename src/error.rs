use std::future::Future;
use std::pin::Pin;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use thiserror::Error;

/// Application-wide error types with appropriate HTTP status codes.
///
/// # Taxonomy
///
/// - `Validation` - client-correctable input problems (400)
/// - `NotReady` - a dependency is not connected yet, transient (503)
/// - `Broker` / `Database` - transport failures while serving a request (500),
///   surfaced to the caller with the underlying message
/// - `Config` / `Unavailable` - fatal at startup, mapped to an exit code by the binaries
#[derive(Error, Debug)]
pub enum AppError {
    #[error("{0}")]
    Validation(String),

    #[error("Kafka not ready")]
    NotReady,

    #[error("{0}")]
    Broker(String),

    #[error("{0}")]
    Database(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Dependency unavailable: {0}")]
    Unavailable(String),
}

impl AppError {
    /// HTTP status associated with this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::NotReady | AppError::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            AppError::Broker(_) | AppError::Database(_) | AppError::Config(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl From<sqlx::Error> for AppError {
    fn from(e: sqlx::Error) -> Self {
        AppError::Database(e.to_string())
    }
}

impl From<rdkafka::error::KafkaError> for AppError {
    fn from(e: rdkafka::error::KafkaError) -> Self {
        AppError::Broker(e.to_string())
    }
}

/// Error response body for API endpoints.
#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        if status.is_server_error() {
            tracing::error!(error = %self, status = status.as_u16(), "Request failed");
        } else {
            tracing::debug!(error = %self, status = status.as_u16(), "Request rejected");
        }

        // 500s carry the underlying client message
        let body = ErrorResponse {
            error: self.to_string(),
        };

        (status, axum::Json(body)).into_response()
    }
}

/// Convenience type alias for Results with AppError.
pub type AppResult<T> = Result<T, AppError>;

/// Boxed future returned by the object-safe broker and store traits.
pub type AppFuture<'a, T> = Pin<Box<dyn Future<Output = AppResult<T>> + Send + 'a>>;
