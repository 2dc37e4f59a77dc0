//! Callback update payload.
//!
//! Wire shape:
//!
//! ```json
//! {"update": {"id": "...", "total_kbytes": 4, "transfer_kbytes": 3,
//!   "transfer_state": "running"}}
//! ```
//!
//! `void_str` rides along only when `transfer_state` is `error`.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::job::{ProgressStats, TransferState};

/// Outer envelope delivered to the caller's callback URL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateEnvelope {
    pub update: UpdateBody,
}

/// The status update itself.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateBody {
    pub id: Uuid,
    pub total_kbytes: u64,
    pub transfer_kbytes: u64,
    pub transfer_state: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub void_str: Option<String>,
}

impl UpdateEnvelope {
    /// Build an update from current progress stats.
    #[must_use]
    pub fn from_stats(id: Uuid, stats: &ProgressStats) -> Self {
        let void_str = if stats.state == TransferState::Error {
            Some(
                stats
                    .message
                    .clone()
                    .unwrap_or_else(|| "transfer failed".to_string()),
            )
        } else {
            None
        };

        Self {
            update: UpdateBody {
                id,
                total_kbytes: stats.total_kbytes(),
                transfer_kbytes: stats.transfer_kbytes(),
                transfer_state: stats.state.as_str().to_string(),
                void_str,
            },
        }
    }

    /// Build a terminal error update with a reason string.
    pub fn error(id: Uuid, reason: impl Into<String>) -> Self {
        Self {
            update: UpdateBody {
                id,
                total_kbytes: 0,
                transfer_kbytes: 0,
                transfer_state: TransferState::Error.as_str().to_string(),
                void_str: Some(reason.into()),
            },
        }
    }

    /// The transfer state carried by this update, if recognized.
    #[must_use]
    pub fn state(&self) -> Option<TransferState> {
        TransferState::from_wire(&self.update.transfer_state)
    }
}
