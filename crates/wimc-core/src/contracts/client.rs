//! Client request envelope.
//!
//! Wire shape:
//!
//! ```json
//! {"wimc_request": {"type": "fetch", "fetch": {"id": "...", "interval": 10,
//!   "callback_url": "...", "content": {"name": "...", "tag": "...",
//!   "method": "whole-file", "provider_url": "..."}}}}
//! ```
//!
//! Update/cancel requests carry `{"id": "..."}` under their own key.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::job::{FetchContent, FetchRequest, RequestType, TransferMethod, WimcError};

/// Outer envelope for all client requests.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchEnvelope {
    pub wimc_request: RequestBody,
}

/// Discriminated request body; exactly one inner object should be present,
/// matching `type`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequestBody {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fetch: Option<FetchBody>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub update: Option<JobRefBody>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cancel: Option<JobRefBody>,
}

/// Body of a fetch request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchBody {
    pub id: Uuid,
    pub interval: u64,
    pub callback_url: String,
    pub content: ContentBody,
}

/// Content reference inside a fetch body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContentBody {
    pub name: String,
    pub tag: String,
    pub method: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provider_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub index_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub store_url: Option<String>,
}

/// Body of an update or cancel request: just the job reference.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobRefBody {
    pub id: Uuid,
}

impl FetchEnvelope {
    /// Wrap a domain request for sending.
    #[must_use]
    pub fn from_request(request: &FetchRequest) -> Self {
        let body = match request.request_type {
            RequestType::Fetch => RequestBody {
                kind: RequestType::Fetch.as_str().to_string(),
                fetch: request.content.as_ref().map(|content| FetchBody {
                    id: request.id,
                    interval: request.update_interval,
                    callback_url: request.callback_url.clone().unwrap_or_default(),
                    content: ContentBody {
                        name: content.name.clone(),
                        tag: content.tag.clone(),
                        method: content.method.as_str().to_string(),
                        provider_url: content.provider_url.clone(),
                        index_url: content.index_url.clone(),
                        store_url: content.store_url.clone(),
                    },
                }),
                update: None,
                cancel: None,
            },
            RequestType::Update => RequestBody {
                kind: RequestType::Update.as_str().to_string(),
                fetch: None,
                update: Some(JobRefBody { id: request.id }),
                cancel: None,
            },
            RequestType::Cancel => RequestBody {
                kind: RequestType::Cancel.as_str().to_string(),
                fetch: None,
                update: None,
                cancel: Some(JobRefBody { id: request.id }),
            },
        };
        Self { wimc_request: body }
    }

    /// Convert the envelope into a domain request.
    ///
    /// An unrecognized `type` maps to `BadRequestType`; a missing inner
    /// object or unknown transfer method maps to `MissingField`. Field
    /// invariants beyond shape (empty name, zero interval) are left to
    /// `FetchRequest::validate`.
    pub fn into_request(self) -> Result<FetchRequest, WimcError> {
        let body = self.wimc_request;
        let kind = RequestType::from_wire(&body.kind)
            .ok_or_else(|| WimcError::bad_request_type(&body.kind))?;

        match kind {
            RequestType::Fetch => {
                let fetch = body
                    .fetch
                    .ok_or_else(|| WimcError::missing_field("fetch"))?;
                let method = TransferMethod::from_wire(&fetch.content.method)
                    .ok_or_else(|| WimcError::missing_field("content.method"))?;
                Ok(FetchRequest {
                    id: fetch.id,
                    request_type: RequestType::Fetch,
                    content: Some(FetchContent {
                        name: fetch.content.name,
                        tag: fetch.content.tag,
                        method,
                        provider_url: fetch.content.provider_url,
                        index_url: fetch.content.index_url,
                        store_url: fetch.content.store_url,
                    }),
                    callback_url: Some(fetch.callback_url),
                    update_interval: fetch.interval,
                })
            }
            RequestType::Update => {
                let update = body
                    .update
                    .ok_or_else(|| WimcError::missing_field("update"))?;
                Ok(FetchRequest::update(update.id))
            }
            RequestType::Cancel => {
                let cancel = body
                    .cancel
                    .ok_or_else(|| WimcError::missing_field("cancel"))?;
                Ok(FetchRequest::cancel(cancel.id))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn fetch_envelope_parses_wire_shape() {
        let raw = json!({
            "wimc_request": {
                "type": "fetch",
                "fetch": {
                    "id": "f47ac10b-58cc-4372-a567-0e02b2c3d479",
                    "interval": 10,
                    "callback_url": "http://caller/cb",
                    "content": {
                        "name": "nginx",
                        "tag": "1.21",
                        "method": "whole-file",
                        "provider_url": "http://hub/nginx"
                    }
                }
            }
        });

        let envelope: FetchEnvelope = serde_json::from_value(raw).unwrap();
        let request = envelope.into_request().unwrap();
        assert_eq!(request.request_type, RequestType::Fetch);
        let content = request.content.unwrap();
        assert_eq!(content.name, "nginx");
        assert_eq!(content.method, TransferMethod::WholeFile);
        assert_eq!(request.update_interval, 10);
    }

    #[test]
    fn chunk_fetch_carries_url_pair() {
        let raw = json!({
            "wimc_request": {
                "type": "fetch",
                "fetch": {
                    "id": "f47ac10b-58cc-4372-a567-0e02b2c3d479",
                    "interval": 5,
                    "callback_url": "http://caller/cb",
                    "content": {
                        "name": "nginx",
                        "tag": "1.21",
                        "method": "chunk",
                        "index_url": "http://hub/nginx.caidx",
                        "store_url": "http://hub/store"
                    }
                }
            }
        });

        let request: FetchRequest = serde_json::from_value::<FetchEnvelope>(raw)
            .unwrap()
            .into_request()
            .unwrap();
        let content = request.content.unwrap();
        assert_eq!(content.index_url.as_deref(), Some("http://hub/nginx.caidx"));
        assert_eq!(content.store_url.as_deref(), Some("http://hub/store"));
    }

    #[test]
    fn unknown_type_is_bad_request_type() {
        let raw = json!({"wimc_request": {"type": "delete"}});
        let err = serde_json::from_value::<FetchEnvelope>(raw)
            .unwrap()
            .into_request()
            .unwrap_err();
        assert!(matches!(err, WimcError::BadRequestType { ref value } if value == "delete"));
    }

    #[test]
    fn cancel_round_trip() {
        let request = FetchRequest::cancel(Uuid::new_v4());
        let json = serde_json::to_value(FetchEnvelope::from_request(&request)).unwrap();
        assert_eq!(json["wimc_request"]["type"], "cancel");

        let back = serde_json::from_value::<FetchEnvelope>(json)
            .unwrap()
            .into_request()
            .unwrap();
        assert_eq!(back, request);
    }

    #[test]
    fn fetch_serialization_matches_wire_names() {
        let request = FetchRequest::fetch(
            Uuid::nil(),
            FetchContent::whole_file("nginx", "1.21", "http://hub/nginx"),
            "http://caller/cb",
            10,
        );
        let json = serde_json::to_value(FetchEnvelope::from_request(&request)).unwrap();
        let fetch = &json["wimc_request"]["fetch"];
        assert_eq!(fetch["interval"], 10);
        assert_eq!(fetch["callback_url"], "http://caller/cb");
        assert_eq!(fetch["content"]["method"], "whole-file");
        // Chunk-only URLs must be absent for whole-file transfers
        assert!(fetch["content"].get("index_url").is_none());
    }
}
