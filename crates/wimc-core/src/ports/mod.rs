//! Port definitions.
//!
//! Traits implemented by adapter crates and injected into the job manager.
//! Keeping them here lets the orchestration logic be tested with fakes and
//! keeps transport types (reqwest, axum) out of core signatures.

use async_trait::async_trait;

use crate::artifact::ArtifactDescriptor;
use crate::contracts::UpdateEnvelope;
use crate::job::{TransferMethod, WimcError};

/// Port for resolving a (name, tag) pair against the hub catalog.
///
/// Implementations may block on network I/O; callers must not hold locks
/// across `resolve`.
#[async_trait]
pub trait ContentResolverPort: Send + Sync {
    /// Resolve the artifact descriptor for a content reference.
    ///
    /// Fails with `NotFound` when the catalog has no matching name/tag,
    /// `NameMismatch` when the catalog answers for a different name, and
    /// `Catalog` for transport-level failures.
    async fn resolve(
        &self,
        name: &str,
        tag: &str,
        method: TransferMethod,
    ) -> Result<ArtifactDescriptor, WimcError>;
}

/// Port for delivering one status update to a callback URL.
///
/// A single attempt; retry policy lives with the caller.
#[async_trait]
pub trait CallbackTransport: Send + Sync {
    /// POST the payload to the callback URL.
    async fn deliver(&self, callback_url: &str, payload: &UpdateEnvelope)
        -> Result<(), WimcError>;
}
