//! Error types for agent supervision.

use thiserror::Error;
use uuid::Uuid;

/// Result type alias for agent operations.
pub type AgentResult<T> = Result<T, AgentError>;

/// Errors raised while planning, spawning or tracking an agent process.
#[derive(Debug, Error)]
pub enum AgentError {
    /// The resolved artifact lacks the URL(s) its transfer method needs.
    #[error("missing content URLs for {method} transfer")]
    MissingContentUrls {
        /// The transfer method that needed them.
        method: String,
    },

    /// Could not create the destination directory.
    #[error("failed to create destination {path}: {message}")]
    Destination {
        /// The directory that could not be created.
        path: String,
        /// Underlying I/O error text.
        message: String,
    },

    /// The agent executable could not be launched.
    #[error("failed to spawn agent {binary}: {message}")]
    Spawn {
        /// The binary that was launched.
        binary: String,
        /// Captured launch-failure reason.
        message: String,
    },

    /// A progress slot for this job is already attached.
    #[error("progress slot for job {id} is already attached")]
    SlotBusy {
        /// The job whose slot was contended.
        id: Uuid,
    },
}
