//! Job orchestration for wimc.
//!
//! The coordinating pieces of the daemon: the agent registry consulted at
//! dispatch time, the callback notifier that pushes status updates to the
//! caller, and the job manager owning the fetch-job state machine.

#![deny(unsafe_code)]

mod manager;
mod notifier;
mod registry;

pub use manager::{JobManager, JobManagerConfig};
pub use notifier::{CallbackNotifier, DeliveryQueue, HttpCallbackTransport};
pub use registry::{AgentRecord, AgentRegistry};

// Silence unused dev-dependency warnings
#[cfg(test)]
use tokio_test as _;
