//! Registry of fetch agents, keyed by transfer method.
//!
//! Mutated by admin registration requests, read once per dispatched job.
//! Many concurrent lookups against infrequent writes, so a readers-writer
//! lock.
//!
//! Registrations live only as long as the process: there is no persistence,
//! and agents must re-register after a daemon restart.

use std::collections::HashMap;
use std::sync::RwLock;

use uuid::Uuid;

use wimc_core::job::TransferMethod;

/// One registered fetch agent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AgentRecord {
    /// Registration id the agent presented.
    pub id: Uuid,
    /// Transfer method this agent performs.
    pub method: TransferMethod,
    /// Where the agent receives dispatch commands.
    pub callback_url: String,
}

/// Mapping from transfer method to the agent handling it.
///
/// At most one record per method; registration overwrites
/// (last-writer-wins, no versioning).
#[derive(Debug, Default)]
pub struct AgentRegistry {
    records: RwLock<HashMap<TransferMethod, AgentRecord>>,
}

impl AgentRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an agent for a method, replacing any existing record.
    pub fn register(&self, id: Uuid, method: TransferMethod, callback_url: impl Into<String>) {
        let record = AgentRecord {
            id,
            method,
            callback_url: callback_url.into(),
        };
        let mut records = self.records.write().expect("agent registry poisoned");
        if let Some(previous) = records.insert(method, record) {
            tracing::info!(
                %method,
                previous = %previous.id,
                replacement = %id,
                "agent registration replaced"
            );
        } else {
            tracing::info!(%method, agent = %id, "agent registered");
        }
    }

    /// Unregister the agent for a method. Returns whether one was present.
    pub fn unregister(&self, method: TransferMethod) -> bool {
        let mut records = self.records.write().expect("agent registry poisoned");
        let removed = records.remove(&method).is_some();
        if removed {
            tracing::info!(%method, "agent unregistered");
        }
        removed
    }

    /// Unregister by registration id, whatever method it holds. Returns
    /// whether a record was removed.
    pub fn unregister_by_id(&self, id: Uuid) -> bool {
        let mut records = self.records.write().expect("agent registry poisoned");
        let method = records
            .iter()
            .find(|(_, record)| record.id == id)
            .map(|(method, _)| *method);

        method.is_some_and(|method| {
            records.remove(&method);
            tracing::info!(%method, agent = %id, "agent unregistered");
            true
        })
    }

    /// Look up the agent for a method. The per-dispatch hot path.
    #[must_use]
    pub fn lookup(&self, method: TransferMethod) -> Option<AgentRecord> {
        let records = self.records.read().expect("agent registry poisoned");
        records.get(&method).cloned()
    }

    /// Number of registered agents.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.read().expect("agent registry poisoned").len()
    }

    /// Whether no agents are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registration_is_idempotent() {
        let registry = AgentRegistry::new();
        let id = Uuid::new_v4();

        registry.register(id, TransferMethod::Chunk, "http://agent/cb");
        let first = registry.lookup(TransferMethod::Chunk);
        registry.register(id, TransferMethod::Chunk, "http://agent/cb");
        let second = registry.lookup(TransferMethod::Chunk);

        assert_eq!(first, second);
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn registration_overwrites_previous_agent() {
        let registry = AgentRegistry::new();
        registry.register(Uuid::new_v4(), TransferMethod::Chunk, "http://old/cb");

        let new_id = Uuid::new_v4();
        registry.register(new_id, TransferMethod::Chunk, "http://new/cb");

        let record = registry.lookup(TransferMethod::Chunk).unwrap();
        assert_eq!(record.id, new_id);
        assert_eq!(record.callback_url, "http://new/cb");
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn unregister_by_method_and_id() {
        let registry = AgentRegistry::new();
        let id = Uuid::new_v4();
        registry.register(id, TransferMethod::WholeFile, "http://agent/cb");
        registry.register(Uuid::new_v4(), TransferMethod::Chunk, "http://other/cb");

        assert!(registry.unregister(TransferMethod::Chunk));
        assert!(!registry.unregister(TransferMethod::Chunk));

        assert!(registry.unregister_by_id(id));
        assert!(!registry.unregister_by_id(id));
        assert!(registry.is_empty());
    }

    #[test]
    fn lookup_missing_method() {
        let registry = AgentRegistry::new();
        assert!(registry.lookup(TransferMethod::WholeFile).is_none());
    }
}
