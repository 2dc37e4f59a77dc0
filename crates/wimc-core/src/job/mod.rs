//! Job domain: request types, lifecycle states, progress counters, errors.

mod errors;
mod progress;
mod types;

pub use errors::{WimcError, WimcResult};
pub use progress::{Counter, ProgressStats, TransferState};
pub use types::{FetchContent, FetchRequest, JobSnapshot, JobState, RequestType, TransferMethod};
