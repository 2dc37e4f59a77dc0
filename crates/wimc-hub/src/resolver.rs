//! Content resolution against the hub catalog.
//!
//! `resolve(name, tag, method)` queries `GET <hub>/capps/{name}`, picks the
//! artifact whose version matches the requested tag, and returns an owned
//! descriptor holding the single format that matches the requested transfer
//! method. Relative format URLs are absolutized against the hub base before
//! the descriptor leaves this crate, so agents always receive fetchable
//! URLs.

use async_trait::async_trait;
use url::Url;

use wimc_core::job::{TransferMethod, WimcError};
use wimc_core::ports::ContentResolverPort;
use wimc_core::{ArtifactDescriptor, ArtifactFormat};

use crate::config::HubClientConfig;
use crate::error::{HubError, HubResult};
use crate::http::{HttpBackend, ReqwestBackend};
use crate::models::HubResponse;

/// Default resolver using the reqwest HTTP backend.
pub type DefaultCatalogResolver = CatalogResolver<ReqwestBackend>;

/// Resolves content references against the hub catalog.
///
/// Generic over an HTTP backend for testing; use `DefaultCatalogResolver`
/// in production code.
pub struct CatalogResolver<B: HttpBackend> {
    backend: B,
    base_url: Url,
}

impl DefaultCatalogResolver {
    /// Create a resolver for the configured hub.
    pub fn new(config: &HubClientConfig) -> HubResult<Self> {
        let base_url = Url::parse(&config.base_url)?;
        Ok(Self {
            backend: ReqwestBackend::new(config),
            base_url,
        })
    }
}

impl<B: HttpBackend> CatalogResolver<B> {
    #[cfg(test)]
    pub(crate) fn with_backend(base_url: Url, backend: B) -> Self {
        Self { backend, base_url }
    }

    /// Resolve (name, tag, method) to an owned artifact descriptor.
    pub async fn resolve_artifact(
        &self,
        name: &str,
        tag: &str,
        method: TransferMethod,
    ) -> HubResult<Option<ArtifactDescriptor>> {
        let url = self.base_url.join(&format!("capps/{name}"))?;
        let response: HubResponse = self.backend.get_json(&url).await?;

        // The hub must answer for the name it was asked about.
        if response.name != name {
            return Err(HubError::NameMismatch {
                requested: name.to_string(),
                returned: response.name,
            });
        }

        let Some(artifact) = response.artifacts.iter().find(|a| a.version == tag) else {
            tracing::debug!(name, tag, "no artifact with matching tag on hub");
            return Ok(None);
        };

        let mut matching = None;
        for format in &artifact.formats {
            if let Some(converted) = format.to_format()? {
                if converted.method == method {
                    matching = Some(self.absolutize(converted)?);
                    break;
                }
            }
        }

        let Some(format) = matching else {
            tracing::debug!(name, tag, %method, "tag published without requested method");
            return Ok(None);
        };

        Ok(Some(ArtifactDescriptor {
            name: response.name,
            version: artifact.version.clone(),
            formats: vec![format],
        }))
    }

    /// Rewrite hub-relative URLs to absolute ones. Chunked transfers carry
    /// a second location in `extra_info` that needs the same treatment.
    fn absolutize(&self, mut format: ArtifactFormat) -> HubResult<ArtifactFormat> {
        format.url = self.absolute_url(&format.url)?;
        if let Some(extra) = format.extra_info.take() {
            format.extra_info = Some(self.absolute_url(&extra)?);
        }
        Ok(format)
    }

    fn absolute_url(&self, raw: &str) -> HubResult<String> {
        if raw.starts_with("http://") || raw.starts_with("https://") {
            return Ok(raw.to_string());
        }
        Ok(self.base_url.join(raw.trim_start_matches('/'))?.to_string())
    }
}

#[async_trait]
impl<B: HttpBackend> ContentResolverPort for CatalogResolver<B> {
    async fn resolve(
        &self,
        name: &str,
        tag: &str,
        method: TransferMethod,
    ) -> Result<ArtifactDescriptor, WimcError> {
        match self.resolve_artifact(name, tag, method).await {
            Ok(Some(descriptor)) => Ok(descriptor),
            Ok(None) | Err(HubError::CappNotFound { .. }) => {
                Err(WimcError::not_found(name, tag))
            }
            Err(HubError::NameMismatch {
                requested,
                returned,
            }) => Err(WimcError::name_mismatch(requested, returned)),
            Err(e) => Err(WimcError::catalog(e.to_string())),
        }
    }
}
