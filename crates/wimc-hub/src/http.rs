//! HTTP backend abstraction for the hub catalog.
//!
//! Trait-based backend so the resolver can be driven by canned responses in
//! tests. The production implementation uses reqwest with automatic retry
//! for transient errors.

use crate::config::HubClientConfig;
use crate::error::{HubError, HubResult};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use std::time::Duration;
use url::Url;

/// Trait for HTTP backends that can fetch JSON from catalog URLs.
#[async_trait]
pub(crate) trait HttpBackend: Send + Sync {
    /// Fetch JSON from a URL and deserialize it.
    async fn get_json<T: DeserializeOwned + Send>(&self, url: &Url) -> HubResult<T>;
}

/// Production HTTP backend using reqwest with retry logic.
///
/// Implements exponential backoff for transient server errors (5xx)
/// and network errors; 4xx failures are returned immediately.
pub struct ReqwestBackend {
    client: reqwest::Client,
    max_retries: u8,
    retry_base_delay: Duration,
}

impl ReqwestBackend {
    /// Create a new reqwest backend with the given configuration.
    pub(crate) fn new(config: &HubClientConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .expect("failed to create HTTP client");

        Self {
            client,
            max_retries: config.max_retries,
            retry_base_delay: config.retry_base_delay,
        }
    }

    /// Fetch a URL with automatic retry for transient errors.
    async fn fetch_with_retry(&self, url: &Url) -> HubResult<reqwest::Response> {
        let mut last_error: Option<HubError> = None;

        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                let delay = self.retry_base_delay * 2u32.pow(u32::from(attempt) - 1);
                tokio::time::sleep(delay).await;
            }

            match self.client.get(url.as_str()).send().await {
                Ok(response) => {
                    let status = response.status();
                    if status.is_success() {
                        return Ok(response);
                    }

                    // 5xx errors are retryable (server-side issues)
                    if status.is_server_error() && attempt < self.max_retries {
                        last_error = Some(HubError::ApiRequestFailed {
                            status: status.as_u16(),
                            url: url.to_string(),
                        });
                        continue;
                    }

                    // The hub answers 404 for unknown capp names
                    if status.as_u16() == 404 {
                        if let Some(name) = extract_capp_name_from_path(url.path()) {
                            return Err(HubError::CappNotFound { name });
                        }
                    }

                    return Err(HubError::ApiRequestFailed {
                        status: status.as_u16(),
                        url: url.to_string(),
                    });
                }
                Err(e) => {
                    // Network errors are retryable
                    if attempt < self.max_retries {
                        last_error = Some(e.into());
                        continue;
                    }
                    return Err(e.into());
                }
            }
        }

        Err(last_error.unwrap_or_else(|| HubError::InvalidResponse {
            message: "unknown error during fetch".to_string(),
        }))
    }
}

/// Try to extract the capp name from a catalog path like `/capps/<name>`.
fn extract_capp_name_from_path(path: &str) -> Option<String> {
    let rest = path.trim_start_matches('/').strip_prefix("capps/")?;
    let name = rest.split('/').next()?;
    if name.is_empty() {
        None
    } else {
        Some(name.to_string())
    }
}

#[async_trait]
impl HttpBackend for ReqwestBackend {
    async fn get_json<T: DeserializeOwned + Send>(&self, url: &Url) -> HubResult<T> {
        let response = self.fetch_with_retry(url).await?;
        let data: T = response.json().await?;
        Ok(data)
    }
}

// ============================================================================
// Fake Backend for Testing
// ============================================================================

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Mutex;

    /// A fake HTTP backend that returns canned JSON responses.
    pub(crate) struct FakeBackend {
        responses: Mutex<HashMap<String, serde_json::Value>>,
    }

    impl FakeBackend {
        /// Create a new fake backend.
        pub(crate) fn new() -> Self {
            Self {
                responses: Mutex::new(HashMap::new()),
            }
        }

        /// Add a canned response for a URL substring.
        pub(crate) fn with_response(self, url_contains: &str, json: serde_json::Value) -> Self {
            self.responses
                .lock()
                .unwrap()
                .insert(url_contains.to_string(), json);
            self
        }

        fn find_response(&self, url: &str) -> Option<serde_json::Value> {
            let responses = self.responses.lock().unwrap();
            responses
                .iter()
                .find(|(pattern, _)| url.contains(pattern.as_str()))
                .map(|(_, json)| json.clone())
        }
    }

    #[async_trait]
    impl HttpBackend for FakeBackend {
        async fn get_json<T: DeserializeOwned + Send>(&self, url: &Url) -> HubResult<T> {
            let json = self.find_response(url.as_str()).ok_or_else(|| {
                extract_capp_name_from_path(url.path()).map_or(
                    HubError::ApiRequestFailed {
                        status: 404,
                        url: url.to_string(),
                    },
                    |name| HubError::CappNotFound { name },
                )
            })?;

            serde_json::from_value(json).map_err(Into::into)
        }
    }
}
