//! Shared daemon state type.

use std::sync::Arc;

use wimc_jobs::{AgentRegistry, JobManager};

/// Everything the HTTP handlers need.
#[derive(Clone)]
pub struct DaemonContext {
    /// The job orchestration engine.
    pub manager: Arc<JobManager>,
    /// Registered fetch agents, mutated through the admin surface.
    pub agents: Arc<AgentRegistry>,
}

/// Application state shared across all handlers.
pub type AppState = Arc<DaemonContext>;
