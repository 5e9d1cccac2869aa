//! Registration handlers.
//!
//! # Endpoints
//!
//! - `POST /students` - Validate a registration and publish it to Kafka
//! - `GET /students` - List stored registrations, newest first

use axum::body::Bytes;
use axum::extract::State;
use axum::{Extension, Json};
use tracing::{Span, field, instrument};

use crate::error::AppResult;
use crate::middleware::RequestId;
use crate::models::{Student, SubmitResponse};
use crate::state::AppState;

/// Submit a registration.
///
/// The body is taken as raw bytes rather than through the `Json` extractor
/// so that the published message is exactly what the client sent, and so
/// that the readiness check runs before any parsing.
///
/// # Request Body
///
/// ```json
/// { "nom": "Lovelace", "prenom": "Ada", "numero": "42", "email": "ada@example.org" }
/// ```
///
/// # Response Body
///
/// ```json
/// { "status": "sent to kafka", "data": { "nom": "Lovelace", "...": "..." } }
/// ```
#[instrument(skip_all, fields(request_id = field::Empty))]
pub async fn submit_student(
    State(state): State<AppState>,
    Extension(request_id): Extension<RequestId>,
    body: Bytes,
) -> AppResult<Json<SubmitResponse>> {
    Span::current().record("request_id", request_id.as_str());

    let data = state.registrations.submit(&body).await?;
    Ok(Json(SubmitResponse::sent(data)))
}

/// List every stored registration, highest id first.
#[instrument(skip(state))]
pub async fn list_students(State(state): State<AppState>) -> AppResult<Json<Vec<Student>>> {
    let students = state.store.list_newest_first().await?;
    Ok(Json(students))
}
