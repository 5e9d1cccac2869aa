//! HTTP middleware.
//!
//! - **Request ID**: generation and propagation of `x-request-id`, with a
//!   tracing span per request
//!
//! Body size limits, CORS and HTTP tracing come from `axum` and
//! `tower-http` and are wired in `routes`.

pub mod request_id;

pub use request_id::{REQUEST_ID_HEADER, RequestId, RequestIdLayer};
