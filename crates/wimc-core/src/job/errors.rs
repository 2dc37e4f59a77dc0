//! Error taxonomy for the orchestration core.
//!
//! One serializable error enum covers validation, resolution, dispatch and
//! delivery failures. Variants carry structured fields so HTTP handlers and
//! callback payloads can surface a reason string without string parsing.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error type for job orchestration operations.
///
/// Designed to be serializable so it can ride in callback payloads and API
/// responses without depending on non-serializable types like
/// `std::io::Error`.
#[derive(Clone, Debug, Error, Serialize, Deserialize, PartialEq, Eq)]
pub enum WimcError {
    /// Request's type field is not one of fetch/update/cancel.
    #[error("unsupported request type: {value}")]
    BadRequestType {
        /// The raw type string received.
        value: String,
    },

    /// A required request field is absent or invalid.
    #[error("missing or invalid field: {field}")]
    MissingField {
        /// Which field failed validation.
        field: String,
    },

    /// Hub catalog has no artifact matching the requested name/tag.
    #[error("no matching capp")]
    NotFound {
        /// Requested capp name.
        name: String,
        /// Requested tag.
        tag: String,
    },

    /// Catalog response named a different capp than requested. Upstream
    /// data integrity failure, not a caller error.
    #[error("catalog name mismatch: requested {requested}, hub returned {returned}")]
    NameMismatch {
        /// Name the caller asked for.
        requested: String,
        /// Name the hub answered with.
        returned: String,
    },

    /// Transfer-method-specific URLs absent from the resolved artifact.
    #[error("missing content URLs for {method} transfer")]
    MissingContentUrls {
        /// The transfer method that needed them.
        method: String,
    },

    /// A fetch for this (name, tag) pair is already active.
    #[error("fetch already in progress for {name}:{tag}")]
    AlreadyInProgress {
        /// Capp name.
        name: String,
        /// Capp tag.
        tag: String,
    },

    /// Agent process launch failed (binary missing, permissions, resources).
    #[error("agent spawn failed: {reason}")]
    AgentSpawnFailure {
        /// Captured launch-failure reason.
        reason: String,
    },

    /// Agent process exited non-zero or was killed by a signal.
    #[error("agent execution failed: {reason}")]
    AgentExecutionError {
        /// Exit code or signal description.
        reason: String,
    },

    /// Callback delivery failed after all attempts. Logged only; never
    /// fails the job.
    #[error("callback delivery failed after {attempts} attempts")]
    NotificationFailure {
        /// How many attempts were made.
        attempts: u8,
    },

    /// Transport-level failure talking to the hub catalog.
    #[error("hub catalog error: {message}")]
    Catalog {
        /// Detailed error message.
        message: String,
    },

    /// No job with this id is known to the manager.
    #[error("unknown job: {id}")]
    UnknownJob {
        /// The id that was looked up.
        id: String,
    },

    /// General/uncategorized internal error.
    #[error("{message}")]
    Internal {
        /// Error message.
        message: String,
    },
}

impl WimcError {
    /// Create a bad-request-type error.
    pub fn bad_request_type(value: impl Into<String>) -> Self {
        Self::BadRequestType {
            value: value.into(),
        }
    }

    /// Create a missing-field error.
    pub fn missing_field(field: impl Into<String>) -> Self {
        Self::MissingField {
            field: field.into(),
        }
    }

    /// Create a not-found error.
    pub fn not_found(name: impl Into<String>, tag: impl Into<String>) -> Self {
        Self::NotFound {
            name: name.into(),
            tag: tag.into(),
        }
    }

    /// Create a name-mismatch error.
    pub fn name_mismatch(requested: impl Into<String>, returned: impl Into<String>) -> Self {
        Self::NameMismatch {
            requested: requested.into(),
            returned: returned.into(),
        }
    }

    /// Create a missing-content-URLs error.
    pub fn missing_content_urls(method: impl Into<String>) -> Self {
        Self::MissingContentUrls {
            method: method.into(),
        }
    }

    /// Create an already-in-progress error.
    pub fn already_in_progress(name: impl Into<String>, tag: impl Into<String>) -> Self {
        Self::AlreadyInProgress {
            name: name.into(),
            tag: tag.into(),
        }
    }

    /// Create an agent-spawn-failure error.
    pub fn spawn_failure(reason: impl Into<String>) -> Self {
        Self::AgentSpawnFailure {
            reason: reason.into(),
        }
    }

    /// Create an agent-execution error.
    pub fn execution_error(reason: impl Into<String>) -> Self {
        Self::AgentExecutionError {
            reason: reason.into(),
        }
    }

    /// Create a catalog transport error.
    pub fn catalog(message: impl Into<String>) -> Self {
        Self::Catalog {
            message: message.into(),
        }
    }

    /// Create an unknown-job error.
    pub fn unknown_job(id: impl std::fmt::Display) -> Self {
        Self::UnknownJob { id: id.to_string() }
    }

    /// Create a generic internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Whether this error is a caller mistake (maps to HTTP 400) rather
    /// than a daemon or upstream failure.
    #[must_use]
    pub const fn is_caller_error(&self) -> bool {
        matches!(
            self,
            Self::BadRequestType { .. }
                | Self::MissingField { .. }
                | Self::AlreadyInProgress { .. }
                | Self::UnknownJob { .. }
        )
    }
}

/// Convenience result type for orchestration operations.
pub type WimcResult<T> = Result<T, WimcError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_display_is_wire_reason() {
        // The callback payload's void_str uses Display directly; callers
        // match on this exact string.
        let err = WimcError::not_found("nginx", "1.21");
        assert_eq!(err.to_string(), "no matching capp");
    }

    #[test]
    fn error_serialization_round_trip() {
        let err = WimcError::already_in_progress("nginx", "1.21");
        let json = serde_json::to_string(&err).unwrap();
        assert!(json.contains("nginx"));

        let parsed: WimcError = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, err);
    }

    #[test]
    fn caller_error_classification() {
        assert!(WimcError::missing_field("id").is_caller_error());
        assert!(WimcError::bad_request_type("delete").is_caller_error());
        assert!(!WimcError::not_found("a", "b").is_caller_error());
        assert!(!WimcError::spawn_failure("enoent").is_caller_error());
    }

    #[test]
    fn execution_error_preserves_reason() {
        let err = WimcError::execution_error("exit code 3");
        assert!(err.to_string().contains("exit code 3"));
    }
}
