//! Internal error types for hub catalog operations.
//!
//! These are internal to `wimc-hub` and are mapped to the core error
//! taxonomy at the resolver boundary.

use thiserror::Error;

/// Result type alias for hub operations.
pub type HubResult<T> = Result<T, HubError>;

/// Errors related to hub catalog access.
#[derive(Debug, Error)]
pub enum HubError {
    /// Hub request failed with an HTTP error status.
    #[error("hub request failed with status {status}: {url}")]
    ApiRequestFailed {
        /// HTTP status code
        status: u16,
        /// The URL that was requested
        url: String,
    },

    /// The hub has no entry for the requested capp name.
    #[error("capp '{name}' not found on hub")]
    CappNotFound {
        /// The capp name that was not found
        name: String,
    },

    /// Hub answered for a different capp than it was asked about.
    /// Upstream data integrity failure, not a caller error.
    #[error("hub answered for '{returned}' when asked about '{requested}'")]
    NameMismatch {
        /// The name the resolver asked for
        requested: String,
        /// The name the hub answered with
        returned: String,
    },

    /// Hub returned a response the resolver could not make sense of.
    #[error("invalid hub response: {message}")]
    InvalidResponse {
        /// Description of what was invalid
        message: String,
    },

    /// Network or HTTP client error.
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// URL parsing error.
    #[error("invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// JSON parsing error.
    #[error("JSON parsing error: {0}")]
    JsonParse(#[from] serde_json::Error),
}
