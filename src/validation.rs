//! Request validation for registration submissions.
//!
//! The submitted body is kept as-is (it is what gets published), so
//! validation works on the parsed JSON value rather than a typed extractor.
//! That also lets a missing field map to 400 instead of axum's 422.

use serde_json::Value;

use crate::error::{AppError, AppResult};
use crate::models::NewStudent;

/// Fields every registration must carry, in message order.
pub const REQUIRED_FIELDS: [&str; 4] = ["nom", "prenom", "numero", "email"];

/// Message returned when any required field is absent or empty.
pub const MISSING_FIELDS_MESSAGE: &str = "All fields are required: nom, prenom, numero, email";

/// Parse a raw request body as JSON.
pub fn parse_json_body(body: &[u8]) -> AppResult<Value> {
    serde_json::from_slice(body)
        .map_err(|e| AppError::Validation(format!("Malformed JSON in request body: {e}")))
}

/// Validate that `body` is an object holding the four required fields as
/// non-empty strings.
///
/// Extra fields are allowed and left untouched.
pub fn validate_submission(body: &Value) -> AppResult<NewStudent> {
    let object = body
        .as_object()
        .ok_or_else(|| AppError::Validation(MISSING_FIELDS_MESSAGE.to_string()))?;

    let field = |name: &str| -> AppResult<String> {
        match object.get(name).and_then(Value::as_str) {
            Some(value) if !value.is_empty() => Ok(value.to_string()),
            _ => Err(AppError::Validation(MISSING_FIELDS_MESSAGE.to_string())),
        }
    };

    Ok(NewStudent {
        nom: field("nom")?,
        prenom: field("prenom")?,
        numero: field("numero")?,
        email: field("email")?,
    })
}
