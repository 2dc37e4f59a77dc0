//! HTTP error mapping.
//!
//! Maps the core error taxonomy onto status codes. Bodies are plain reason
//! strings, which is all the node-local callers consume.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

use wimc_core::job::WimcError;

/// Axum-facing error type.
#[derive(Debug, Error)]
#[error("{status}: {reason}")]
pub struct HttpError {
    /// Status code to answer with.
    pub status: StatusCode,
    /// Human-readable reason string for the body.
    pub reason: String,
}

impl HttpError {
    /// A 400 with a reason.
    pub fn bad_request(reason: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            reason: reason.into(),
        }
    }

    /// A 404 with a reason.
    pub fn not_found(reason: impl Into<String>) -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            reason: reason.into(),
        }
    }
}

impl From<WimcError> for HttpError {
    fn from(err: WimcError) -> Self {
        let status = match &err {
            WimcError::UnknownJob { .. } => StatusCode::NOT_FOUND,
            WimcError::AlreadyInProgress { .. } => StatusCode::CONFLICT,
            e if e.is_caller_error() => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        Self {
            status,
            reason: err.to_string(),
        }
    }
}

impl IntoResponse for HttpError {
    fn into_response(self) -> Response {
        (self.status, self.reason).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn caller_errors_map_to_400() {
        let err: HttpError = WimcError::missing_field("callback_url").into();
        assert_eq!(err.status, StatusCode::BAD_REQUEST);
        assert!(err.reason.contains("callback_url"));
    }

    #[test]
    fn duplicate_fetch_maps_to_409() {
        let err: HttpError = WimcError::already_in_progress("nginx", "1.21").into();
        assert_eq!(err.status, StatusCode::CONFLICT);
    }

    #[test]
    fn unknown_job_maps_to_404() {
        let err: HttpError = WimcError::unknown_job("abc").into();
        assert_eq!(err.status, StatusCode::NOT_FOUND);
    }

    #[test]
    fn lifecycle_errors_map_to_500() {
        let err: HttpError = WimcError::catalog("hub unreachable").into();
        assert_eq!(err.status, StatusCode::INTERNAL_SERVER_ERROR);
    }
}
