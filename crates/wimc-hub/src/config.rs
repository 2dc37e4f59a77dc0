//! Public configuration for the hub client.

use std::time::Duration;

/// Configuration for the hub catalog client.
///
/// # Example
///
/// ```
/// use wimc_hub::HubClientConfig;
/// use std::time::Duration;
///
/// let config = HubClientConfig::new("http://hub.local:8091")
///     .with_timeout(Duration::from_secs(10));
/// ```
#[derive(Debug, Clone)]
pub struct HubClientConfig {
    /// Base URL of the hub, e.g. `http://hub.local:8091`.
    pub(crate) base_url: String,
    /// Request timeout.
    pub(crate) timeout: Duration,
    /// Maximum number of retry attempts for transient errors.
    pub(crate) max_retries: u8,
    /// Base delay for exponential backoff.
    pub(crate) retry_base_delay: Duration,
}

impl HubClientConfig {
    /// Create a configuration for a hub base URL with default tuning.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            timeout: Duration::from_secs(30),
            max_retries: 3,
            retry_base_delay: Duration::from_millis(500),
        }
    }

    /// Set the request timeout.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the maximum retry attempts for 5xx/network errors.
    #[must_use]
    pub const fn with_max_retries(mut self, max_retries: u8) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Set the base delay for exponential backoff between retries.
    #[must_use]
    pub const fn with_retry_base_delay(mut self, delay: Duration) -> Self {
        self.retry_base_delay = delay;
        self
    }
}
