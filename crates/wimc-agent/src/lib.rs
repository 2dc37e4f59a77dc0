//! Fetch-agent process supervision for wimc.
//!
//! The daemon never transfers content itself; it launches an external
//! fetch-agent executable and watches it. This crate owns everything about
//! that relationship: computing the agent's command line from a resolved
//! artifact, the per-job progress channel the agent reports into over its
//! stdout pipe, spawning and reaping the process, and signal-based
//! termination.

#![deny(unsafe_code)]

mod command;
mod error;
mod progress;
mod shutdown;
mod supervisor;

pub use command::LaunchPlan;
pub use error::{AgentError, AgentResult};
pub use progress::{ProgressChannelRegistry, ProgressReport, ProgressSlot};
pub use supervisor::{AgentExit, AgentHandle, AgentSupervisor};

// Silence unused dev-dependency warnings
#[cfg(test)]
use tokio_test as _;
