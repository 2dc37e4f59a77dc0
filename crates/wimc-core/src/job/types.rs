//! Request and job lifecycle types.
//!
//! Request types, transfer methods and job states are closed enums with
//! explicit wire mappings so every consumer matches exhaustively instead of
//! comparing strings.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::errors::WimcError;
use super::progress::ProgressStats;

/// What the caller is asking the daemon to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RequestType {
    /// Start a new fetch job.
    Fetch,
    /// Request an immediate status callback for an existing job.
    Update,
    /// Cancel an existing job.
    Cancel,
}

impl RequestType {
    /// Wire string for this request type.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Fetch => "fetch",
            Self::Update => "update",
            Self::Cancel => "cancel",
        }
    }

    /// Parse a wire string. Returns `None` for unrecognized values;
    /// callers map that to `WimcError::BadRequestType`.
    #[must_use]
    pub fn from_wire(value: &str) -> Option<Self> {
        match value {
            "fetch" => Some(Self::Fetch),
            "update" => Some(Self::Update),
            "cancel" => Some(Self::Cancel),
            _ => None,
        }
    }
}

/// Named strategy for retrieving an artifact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TransferMethod {
    /// Single-file transfer from a provider URL.
    WholeFile,
    /// Content-addressable chunked sync; needs an index/store URL pair.
    Chunk,
}

impl TransferMethod {
    /// Wire string for this method.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::WholeFile => "whole-file",
            Self::Chunk => "chunk",
        }
    }

    /// Parse a wire string. "open" is a legacy alias for whole-file
    /// transfers still emitted by older hubs.
    #[must_use]
    pub fn from_wire(value: &str) -> Option<Self> {
        match value {
            "whole-file" | "open" => Some(Self::WholeFile),
            "chunk" => Some(Self::Chunk),
            _ => None,
        }
    }
}

impl std::fmt::Display for TransferMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lifecycle state of a job.
///
/// ```text
/// Pending --spawn ok--> Running --exit 0--> Done
/// Pending --spawn fail--> Error
/// Running --exit != 0 | cancel--> Error
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobState {
    Pending,
    Running,
    Done,
    Error,
}

impl JobState {
    /// Whether this state admits no further transitions.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Done | Self::Error)
    }
}

/// The content a fetch request refers to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FetchContent {
    /// Capp name, e.g. `nginx`.
    pub name: String,
    /// Published tag, e.g. `1.21`.
    pub tag: String,
    /// Requested transfer method.
    pub method: TransferMethod,
    /// Provider URL for whole-file transfers.
    pub provider_url: Option<String>,
    /// Index URL for chunked transfers.
    pub index_url: Option<String>,
    /// Store URL for chunked transfers.
    pub store_url: Option<String>,
}

impl FetchContent {
    /// Create content for a whole-file transfer.
    pub fn whole_file(
        name: impl Into<String>,
        tag: impl Into<String>,
        provider_url: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            tag: tag.into(),
            method: TransferMethod::WholeFile,
            provider_url: Some(provider_url.into()),
            index_url: None,
            store_url: None,
        }
    }

    /// Create content for a chunked transfer.
    pub fn chunk(
        name: impl Into<String>,
        tag: impl Into<String>,
        index_url: impl Into<String>,
        store_url: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            tag: tag.into(),
            method: TransferMethod::Chunk,
            provider_url: None,
            index_url: Some(index_url.into()),
            store_url: Some(store_url.into()),
        }
    }
}

/// The caller's ask, as handed to the job manager.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FetchRequest {
    /// Job identifier. Caller-assigned, or minted by the daemon when nil.
    pub id: Uuid,
    /// What this request does.
    pub request_type: RequestType,
    /// Content reference; required for Fetch, ignored otherwise.
    pub content: Option<FetchContent>,
    /// Where status updates are delivered.
    pub callback_url: Option<String>,
    /// Seconds between interval callbacks while the job runs.
    pub update_interval: u64,
}

impl FetchRequest {
    /// Build a Fetch request.
    pub fn fetch(
        id: Uuid,
        content: FetchContent,
        callback_url: impl Into<String>,
        update_interval: u64,
    ) -> Self {
        Self {
            id,
            request_type: RequestType::Fetch,
            content: Some(content),
            callback_url: Some(callback_url.into()),
            update_interval,
        }
    }

    /// Build an Update request for an existing job.
    #[must_use]
    pub const fn update(id: Uuid) -> Self {
        Self {
            id,
            request_type: RequestType::Update,
            content: None,
            callback_url: None,
            update_interval: 0,
        }
    }

    /// Build a Cancel request for an existing job.
    #[must_use]
    pub const fn cancel(id: Uuid) -> Self {
        Self {
            id,
            request_type: RequestType::Cancel,
            content: None,
            callback_url: None,
            update_interval: 0,
        }
    }

    /// Validate the field invariants for this request's type.
    ///
    /// Fetch needs a non-empty callback URL, content name/tag and a positive
    /// update interval; Update/Cancel need a non-nil id. Violations map to
    /// `WimcError::MissingField` naming the offending field.
    pub fn validate(&self) -> Result<(), WimcError> {
        match self.request_type {
            RequestType::Fetch => {
                let content = self
                    .content
                    .as_ref()
                    .ok_or_else(|| WimcError::missing_field("content"))?;
                if content.name.is_empty() {
                    return Err(WimcError::missing_field("content.name"));
                }
                if content.tag.is_empty() {
                    return Err(WimcError::missing_field("content.tag"));
                }
                match self.callback_url.as_deref() {
                    None | Some("") => return Err(WimcError::missing_field("callback_url")),
                    Some(_) => {}
                }
                if self.update_interval == 0 {
                    return Err(WimcError::missing_field("interval"));
                }
                Ok(())
            }
            RequestType::Update | RequestType::Cancel => {
                if self.id.is_nil() {
                    return Err(WimcError::missing_field("id"));
                }
                Ok(())
            }
        }
    }
}

/// Read-only view of a job, answered by `status` queries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobSnapshot {
    pub id: Uuid,
    pub name: String,
    pub tag: String,
    pub state: JobState,
    pub stats: ProgressStats,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_type_wire_round_trip() {
        for ty in [RequestType::Fetch, RequestType::Update, RequestType::Cancel] {
            assert_eq!(RequestType::from_wire(ty.as_str()), Some(ty));
        }
        assert_eq!(RequestType::from_wire("delete"), None);
    }

    #[test]
    fn transfer_method_accepts_legacy_alias() {
        assert_eq!(
            TransferMethod::from_wire("open"),
            Some(TransferMethod::WholeFile)
        );
        assert_eq!(TransferMethod::from_wire("chunk"), Some(TransferMethod::Chunk));
        assert_eq!(TransferMethod::from_wire("rsync"), None);
    }

    #[test]
    fn terminal_states() {
        assert!(JobState::Done.is_terminal());
        assert!(JobState::Error.is_terminal());
        assert!(!JobState::Pending.is_terminal());
        assert!(!JobState::Running.is_terminal());
    }

    #[test]
    fn fetch_request_validation() {
        let req = FetchRequest::fetch(
            Uuid::new_v4(),
            FetchContent::whole_file("nginx", "1.21", "http://hub/nginx"),
            "http://caller/cb",
            10,
        );
        assert!(req.validate().is_ok());
    }

    #[test]
    fn fetch_request_rejects_empty_callback() {
        let mut req = FetchRequest::fetch(
            Uuid::new_v4(),
            FetchContent::whole_file("nginx", "1.21", "http://hub/nginx"),
            "",
            10,
        );
        assert!(matches!(
            req.validate(),
            Err(WimcError::MissingField { ref field }) if field == "callback_url"
        ));

        req.callback_url = None;
        assert!(req.validate().is_err());
    }

    #[test]
    fn fetch_request_rejects_zero_interval() {
        let req = FetchRequest::fetch(
            Uuid::new_v4(),
            FetchContent::whole_file("nginx", "1.21", "http://hub/nginx"),
            "http://caller/cb",
            0,
        );
        assert!(matches!(
            req.validate(),
            Err(WimcError::MissingField { ref field }) if field == "interval"
        ));
    }

    #[test]
    fn cancel_request_rejects_nil_id() {
        let req = FetchRequest::cancel(Uuid::nil());
        assert!(matches!(
            req.validate(),
            Err(WimcError::MissingField { ref field }) if field == "id"
        ));
        assert!(FetchRequest::cancel(Uuid::new_v4()).validate().is_ok());
    }
}
