//! Artifact descriptors produced by catalog resolution.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::job::TransferMethod;

/// One retrievable form of an artifact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactFormat {
    /// Transfer method this format supports.
    pub method: TransferMethod,
    /// Where the content lives. For chunked transfers this is the index
    /// URL; the store URL is carried in `extra_info`.
    pub url: String,
    /// Method-specific extra data (chunk store location).
    pub extra_info: Option<String>,
    /// Payload size; chunked formats publish chunk info instead.
    pub size_bytes: Option<u64>,
    /// When the hub published this format.
    pub created_at: DateTime<Utc>,
}

/// Resolver output: a named, tagged artifact with its retrievable formats.
///
/// Descriptors are owned deep copies; nothing aliases catalog response
/// buffers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactDescriptor {
    /// Capp name.
    pub name: String,
    /// Tag this descriptor was resolved for.
    pub version: String,
    /// Retrievable formats for this version.
    pub formats: Vec<ArtifactFormat>,
}

impl ArtifactDescriptor {
    /// The format matching a transfer method, if this version publishes one.
    #[must_use]
    pub fn format_for(&self, method: TransferMethod) -> Option<&ArtifactFormat> {
        self.formats.iter().find(|f| f.method == method)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn descriptor() -> ArtifactDescriptor {
        ArtifactDescriptor {
            name: "nginx".to_string(),
            version: "1.21".to_string(),
            formats: vec![
                ArtifactFormat {
                    method: TransferMethod::WholeFile,
                    url: "http://hub/nginx_1.21.tar.gz".to_string(),
                    extra_info: None,
                    size_bytes: Some(1024),
                    created_at: Utc::now(),
                },
                ArtifactFormat {
                    method: TransferMethod::Chunk,
                    url: "http://hub/nginx_1.21.caidx".to_string(),
                    extra_info: Some("http://hub/store".to_string()),
                    size_bytes: None,
                    created_at: Utc::now(),
                },
            ],
        }
    }

    #[test]
    fn format_lookup_by_method() {
        let desc = descriptor();
        assert!(desc.format_for(TransferMethod::WholeFile).is_some());
        assert_eq!(
            desc.format_for(TransferMethod::Chunk).unwrap().extra_info,
            Some("http://hub/store".to_string())
        );
    }
}
