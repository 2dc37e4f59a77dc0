//! Transfer progress counters shared between the agent and the daemon.
//!
//! The agent reports counters incrementally; until a counter has been
//! reported it holds a sentinel and must never be read as a literal value.
//! `Counter` encodes that rule in the type so call sites cannot forget it.

use serde::{Deserialize, Serialize};

use super::types::JobState;

/// A counter that starts out unreported.
///
/// The wire sentinel is `u64::MAX`; `get` hides it behind `Option`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Counter(u64);

impl Counter {
    /// The not-yet-reported sentinel.
    pub const UNKNOWN: Self = Self(u64::MAX);

    /// A counter holding a reported value.
    #[must_use]
    pub const fn known(value: u64) -> Self {
        Self(value)
    }

    /// The reported value, or `None` if the agent has not reported yet.
    #[must_use]
    pub const fn get(self) -> Option<u64> {
        if self.0 == u64::MAX { None } else { Some(self.0) }
    }

    /// The reported value, treating "not yet reported" as zero. Only for
    /// wire serialization, where the payload has no notion of absence.
    #[must_use]
    pub const fn or_zero(self) -> u64 {
        match self.get() {
            Some(v) => v,
            None => 0,
        }
    }

    /// Whether a value has been reported.
    #[must_use]
    pub const fn is_known(self) -> bool {
        self.0 != u64::MAX
    }
}

impl Default for Counter {
    fn default() -> Self {
        Self::UNKNOWN
    }
}

impl From<u64> for Counter {
    fn from(value: u64) -> Self {
        Self::known(value)
    }
}

/// Transfer activity state as reported by the agent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransferState {
    Pending,
    Started,
    Running,
    Done,
    Error,
}

impl TransferState {
    /// Wire string for this state.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Started => "started",
            Self::Running => "running",
            Self::Done => "done",
            Self::Error => "error",
        }
    }

    /// Parse a wire string.
    #[must_use]
    pub fn from_wire(value: &str) -> Option<Self> {
        match value {
            "pending" => Some(Self::Pending),
            "started" => Some(Self::Started),
            "running" => Some(Self::Running),
            "done" => Some(Self::Done),
            "error" => Some(Self::Error),
            _ => None,
        }
    }

    /// Whether this state admits no further transitions.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Done | Self::Error)
    }
}

impl From<JobState> for TransferState {
    fn from(state: JobState) -> Self {
        match state {
            JobState::Pending => Self::Pending,
            JobState::Running => Self::Running,
            JobState::Done => Self::Done,
            JobState::Error => Self::Error,
        }
    }
}

/// Counters and status updated by the agent process, read by the daemon.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressStats {
    /// Agent signalled it has begun transferring.
    pub started: bool,
    /// Agent signalled it has stopped (normally or not).
    pub stopped: bool,
    /// Agent's exit status once reaped.
    pub exit_status: Option<i32>,
    /// Total bytes this fetch will transfer.
    pub total_bytes: Counter,
    /// Total transfer requests this fetch will issue.
    pub total_requests: Counter,
    /// Bytes satisfied from local storage.
    pub local_bytes: Counter,
    /// Bytes fetched from the remote store.
    pub remote_bytes: Counter,
    /// Current transfer state.
    pub state: TransferState,
    /// Status message; set on error.
    pub message: Option<String>,
    /// Monotonically increasing sequence number for change detection.
    pub seq: u64,
}

impl Default for ProgressStats {
    fn default() -> Self {
        Self {
            started: false,
            stopped: false,
            exit_status: None,
            total_bytes: Counter::UNKNOWN,
            total_requests: Counter::UNKNOWN,
            local_bytes: Counter::UNKNOWN,
            remote_bytes: Counter::UNKNOWN,
            state: TransferState::Pending,
            message: None,
            seq: 0,
        }
    }
}

impl ProgressStats {
    /// Total kbytes for the callback payload; 0 until reported.
    #[must_use]
    pub const fn total_kbytes(&self) -> u64 {
        self.total_bytes.or_zero() / 1024
    }

    /// Transferred kbytes (local + remote) for the callback payload.
    #[must_use]
    pub const fn transfer_kbytes(&self) -> u64 {
        (self.local_bytes.or_zero() + self.remote_bytes.or_zero()) / 1024
    }
}
