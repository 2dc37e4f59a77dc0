//! Hub catalog client for wimc.
//!
//! Talks to the upstream hub that publishes artifact metadata and resolves
//! (name, tag, method) references into owned `ArtifactDescriptor`s. The HTTP
//! backend is trait-based so the resolver can be exercised against canned
//! catalog responses in tests.

#![deny(unsafe_code)]
// Allow private types in the public resolver alias - DefaultCatalogResolver
// is meant to be used through the ContentResolverPort trait, not its internal
// generic structure
#![allow(private_interfaces)]

mod config;
mod error;
pub mod http;
mod models;
mod resolver;

// ============================================================================
// Public API
// ============================================================================

pub use config::HubClientConfig;
pub use error::{HubError, HubResult};
pub use resolver::DefaultCatalogResolver;

// Silence unused dev-dependency warnings
#[cfg(test)]
use tokio_test as _;
