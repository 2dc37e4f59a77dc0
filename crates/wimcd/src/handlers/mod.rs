//! HTTP handlers. Thin: parse, delegate, serialize.

pub mod admin;
pub mod client;

use axum::http::StatusCode;

/// Liveness probe, served on both surfaces.
pub async fn ping() -> StatusCode {
    StatusCode::OK
}
