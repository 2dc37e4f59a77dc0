//! Daemon settings.
//!
//! Typed configuration for the daemon, read once at startup from the
//! environment. Pure domain type; no file parsing here.

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// Default port for the client-facing REST surface.
pub const DEFAULT_CLIENT_PORT: u16 = 8098;

/// Default port for the admin (agent registration) surface.
pub const DEFAULT_ADMIN_PORT: u16 = 8099;

/// Default grace period completed jobs stay queryable.
pub const DEFAULT_JOB_RETENTION: Duration = Duration::from_secs(300);

/// Default number of delivery attempts per callback.
pub const DEFAULT_NOTIFY_ATTEMPTS: u8 = 3;

/// Errors raised while loading settings from the environment.
#[derive(Debug, Error)]
pub enum SettingsError {
    /// A variable was present but unparseable.
    #[error("invalid value for {var}: {value}")]
    InvalidValue {
        /// Variable name.
        var: String,
        /// Offending value.
        value: String,
    },

    /// A required variable was absent.
    #[error("missing required environment variable: {var}")]
    Missing {
        /// Variable name.
        var: String,
    },
}

/// Daemon configuration.
#[derive(Debug, Clone)]
pub struct Settings {
    /// Hub catalog base URL.
    pub hub_url: String,
    /// Client REST listen port.
    pub client_port: u16,
    /// Admin REST listen port.
    pub admin_port: u16,
    /// Root directory for per-job artifact destinations.
    pub store_path: PathBuf,
    /// Path to the fetch-agent executable.
    pub agent_binary: PathBuf,
    /// How long completed jobs stay queryable before eviction.
    pub job_retention: Duration,
    /// Delivery attempts per callback notification.
    pub notify_attempts: u8,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            hub_url: "http://localhost:8091".to_string(),
            client_port: DEFAULT_CLIENT_PORT,
            admin_port: DEFAULT_ADMIN_PORT,
            store_path: PathBuf::from("/var/lib/wimc"),
            agent_binary: PathBuf::from("wimc-agent"),
            job_retention: DEFAULT_JOB_RETENTION,
            notify_attempts: DEFAULT_NOTIFY_ATTEMPTS,
        }
    }
}

impl Settings {
    /// Load settings from the environment, falling back to defaults for
    /// anything unset. `WIMC_HUB_URL` is required.
    pub fn from_env() -> Result<Self, SettingsError> {
        let defaults = Self::default();

        let hub_url = std::env::var("WIMC_HUB_URL").map_err(|_| SettingsError::Missing {
            var: "WIMC_HUB_URL".to_string(),
        })?;

        Ok(Self {
            hub_url,
            client_port: parse_env("WIMC_CLIENT_PORT", defaults.client_port)?,
            admin_port: parse_env("WIMC_ADMIN_PORT", defaults.admin_port)?,
            store_path: std::env::var("WIMC_STORE_PATH")
                .map_or(defaults.store_path, PathBuf::from),
            agent_binary: std::env::var("WIMC_AGENT_BIN")
                .map_or(defaults.agent_binary, PathBuf::from),
            job_retention: Duration::from_secs(parse_env(
                "WIMC_JOB_RETENTION_SECS",
                defaults.job_retention.as_secs(),
            )?),
            notify_attempts: parse_env("WIMC_NOTIFY_ATTEMPTS", defaults.notify_attempts)?,
        })
    }
}

/// Parse an optional environment variable, keeping the default when unset.
fn parse_env<T: std::str::FromStr>(var: &str, default: T) -> Result<T, SettingsError> {
    match std::env::var(var) {
        Ok(raw) => raw.parse().map_err(|_| SettingsError::InvalidValue {
            var: var.to_string(),
            value: raw,
        }),
        Err(_) => Ok(default),
    }
}
