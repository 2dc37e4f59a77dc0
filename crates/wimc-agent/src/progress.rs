//! Per-job progress channels.
//!
//! Each job owns a watch channel registered under its id; the supervisor's
//! stdout reader feeds it and any number of observers subscribe. There is no
//! fixed global slot, so any number of fetches can be tracked concurrently.
//!
//! Attachment is scoped: `ProgressSlot` detaches its registry entry on
//! drop, so every exit path (success, failure, cancellation, panic of the
//! supervising task) releases the slot for reuse.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use uuid::Uuid;

use wimc_core::job::{Counter, ProgressStats, TransferState};

use crate::error::AgentError;

/// One progress report line from the agent's stdout pipe.
///
/// All fields are optional; the agent reports what it knows when it knows
/// it. Absent fields leave the corresponding stat untouched.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProgressReport {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_bytes: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_requests: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub local_bytes: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remote_bytes: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Registry of active progress channels, keyed by job id.
#[derive(Debug, Default)]
pub struct ProgressChannelRegistry {
    slots: Mutex<HashMap<Uuid, watch::Sender<ProgressStats>>>,
}

impl ProgressChannelRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach a fresh progress channel for a job.
    ///
    /// Fails with `SlotBusy` if the job already has one; a slot must be
    /// released (guard dropped) before the id can be reused.
    pub fn attach(self: &Arc<Self>, id: Uuid) -> Result<ProgressSlot, AgentError> {
        let mut slots = self.slots.lock().expect("progress registry poisoned");
        if slots.contains_key(&id) {
            return Err(AgentError::SlotBusy { id });
        }

        let (tx, _) = watch::channel(ProgressStats::default());
        slots.insert(id, tx.clone());
        tracing::debug!(id = %id, "progress slot attached");

        Ok(ProgressSlot {
            registry: Arc::clone(self),
            id,
            tx,
        })
    }

    /// Subscribe to a job's progress channel, if one is attached.
    #[must_use]
    pub fn subscribe(&self, id: Uuid) -> Option<watch::Receiver<ProgressStats>> {
        let slots = self.slots.lock().expect("progress registry poisoned");
        slots.get(&id).map(watch::Sender::subscribe)
    }

    /// Number of attached slots.
    #[must_use]
    pub fn len(&self) -> usize {
        self.slots.lock().expect("progress registry poisoned").len()
    }

    /// Whether no slots are attached.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn detach(&self, id: Uuid) {
        let mut slots = self.slots.lock().expect("progress registry poisoned");
        if slots.remove(&id).is_some() {
            tracing::debug!(id = %id, "progress slot detached");
        }
    }
}

/// Owned handle to a job's progress channel.
///
/// Detaches the registry entry on drop.
#[derive(Debug)]
pub struct ProgressSlot {
    registry: Arc<ProgressChannelRegistry>,
    id: Uuid,
    tx: watch::Sender<ProgressStats>,
}

impl ProgressSlot {
    /// The job this slot belongs to.
    #[must_use]
    pub const fn id(&self) -> Uuid {
        self.id
    }

    /// Subscribe to this slot's channel.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<ProgressStats> {
        self.tx.subscribe()
    }

    /// Mutate the stats in place, bumping the change-detection sequence.
    pub fn update(&self, mutate: impl FnOnce(&mut ProgressStats)) {
        self.tx.send_modify(|stats| {
            mutate(stats);
            stats.seq += 1;
        });
    }

    /// Apply one agent report to the stats.
    pub fn apply_report(&self, report: &ProgressReport) {
        feed(&self.tx, report);
    }

    /// Clone of the underlying sender, for the supervisor's reader task.
    pub(crate) fn subscribe_sender(&self) -> watch::Sender<ProgressStats> {
        self.tx.clone()
    }
}

/// Apply one agent report through a sender, bumping the sequence.
pub(crate) fn feed(tx: &watch::Sender<ProgressStats>, report: &ProgressReport) {
    tx.send_modify(|stats| {
        if let Some(v) = report.total_bytes {
            stats.total_bytes = Counter::known(v);
        }
        if let Some(v) = report.total_requests {
            stats.total_requests = Counter::known(v);
        }
        if let Some(v) = report.local_bytes {
            stats.local_bytes = Counter::known(v);
        }
        if let Some(v) = report.remote_bytes {
            stats.remote_bytes = Counter::known(v);
        }
        if let Some(state) = report.state.as_deref().and_then(TransferState::from_wire) {
            stats.state = state;
            if matches!(state, TransferState::Started | TransferState::Running) {
                stats.started = true;
            }
        }
        if let Some(message) = &report.message {
            stats.message = Some(message.clone());
        }
        stats.seq += 1;
    });
}

impl Drop for ProgressSlot {
    fn drop(&mut self) {
        self.registry.detach(self.id);
    }
}
