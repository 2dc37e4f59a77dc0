//! Hub catalog response DTOs.
//!
//! Wire shape (per capp, one artifact entry per published tag):
//!
//! ```json
//! {"name": "nginx", "artifacts": [{"version": "1.21", "formats": [
//!   {"type": "whole-file", "url": "...", "created_at": "...", "size_bytes": 42},
//!   {"type": "chunk", "url": "...", "created_at": "...",
//!    "extra_info": {"chunks": "..."}}]}]}
//! ```
//!
//! Chunk formats must publish `extra_info.chunks` (the chunk store
//! location); every other format must publish `size_bytes`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use wimc_core::{ArtifactFormat, job::TransferMethod};

use crate::error::HubError;

/// Response for `GET <hub>/capps/{name}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct HubResponse {
    pub name: String,
    pub artifacts: Vec<HubArtifact>,
}

/// One published tag of a capp.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct HubArtifact {
    pub version: String,
    pub formats: Vec<HubFormat>,
}

/// One retrievable format of a tag.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct HubFormat {
    #[serde(rename = "type")]
    pub kind: String,
    pub url: String,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size_bytes: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extra_info: Option<HubExtraInfo>,
}

/// Method-specific extra data.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct HubExtraInfo {
    pub chunks: String,
}

impl HubFormat {
    /// Convert into a domain format.
    ///
    /// Returns `Ok(None)` for transfer methods this daemon does not know
    /// (forward compatibility with newer hubs); `Err` for a known method
    /// missing its required fields.
    pub(crate) fn to_format(&self) -> Result<Option<ArtifactFormat>, HubError> {
        let Some(method) = TransferMethod::from_wire(&self.kind) else {
            tracing::debug!(kind = %self.kind, "skipping unknown format type from hub");
            return Ok(None);
        };

        let (size_bytes, extra_info) = match method {
            TransferMethod::Chunk => {
                let extra = self.extra_info.as_ref().ok_or_else(|| {
                    HubError::InvalidResponse {
                        message: format!("chunk format for {} lacks extra_info.chunks", self.url),
                    }
                })?;
                (None, Some(extra.chunks.clone()))
            }
            TransferMethod::WholeFile => {
                let size = self.size_bytes.ok_or_else(|| HubError::InvalidResponse {
                    message: format!("whole-file format for {} lacks size_bytes", self.url),
                })?;
                (Some(size), None)
            }
        };

        Ok(Some(ArtifactFormat {
            method,
            url: self.url.clone(),
            extra_info,
            size_bytes,
            created_at: self.created_at,
        }))
    }
}
