//! # Configuration
//!
//! TOML configuration for the fetch command.
//!
//! ```toml
//! [device]
//! host = "192.0.2.10"
//! port = 8443
//! verify_tls = false
//!
//! [device.auth]
//! username = "admin"
//! password = "admin"
//!
//! [fetch]
//! max_in_flight = 4
//! timeout_secs = 30
//! ```
//!
//! Every `[fetch]` key has a default. `TAPI_SCHEMA_PASSWORD` overrides the
//! configured password.

use crate::AppError;
use crate::device::{Device, PASSWORD_ENV};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

/// Default number of node requests in flight at once.
pub const DEFAULT_MAX_IN_FLIGHT: usize = 4;

/// Default per-request timeout in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

fn default_max_in_flight() -> usize {
    DEFAULT_MAX_IN_FLIGHT
}

fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

/// Limits for the snapshot fetch.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct FetchConfig {
    #[serde(default = "default_max_in_flight")]
    pub max_in_flight: usize,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Restrict the fetch to one topology.
    #[serde(default)]
    pub topology_uuid: Option<String>,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            max_in_flight: DEFAULT_MAX_IN_FLIGHT,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            topology_uuid: None,
        }
    }
}

impl FetchConfig {
    #[must_use]
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// The whole configuration file.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct AppConfig {
    pub device: Device,
    #[serde(default)]
    pub fetch: FetchConfig,
}

impl AppConfig {
    /// Parse and validate configuration text.
    pub fn from_toml_str(text: &str) -> Result<Self, AppError> {
        let config: Self = toml::from_str(text).map_err(|e| AppError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load a configuration file and apply environment overrides.
    pub fn load(path: &Path) -> Result<Self, AppError> {
        let text = std::fs::read_to_string(path).map_err(|e| {
            AppError::Config(format!("Cannot read '{}': {}", path.display(), e))
        })?;
        let mut config = Self::from_toml_str(&text)?;
        if let Ok(password) = std::env::var(PASSWORD_ENV) {
            config.device.auth.set_password(password);
        }
        Ok(config)
    }

    fn validate(&self) -> Result<(), AppError> {
        if self.device.host.trim().is_empty() {
            return Err(AppError::Config("device.host must not be empty".to_string()));
        }
        if self.fetch.max_in_flight == 0 {
            return Err(AppError::Config(
                "fetch.max_in_flight must be at least 1".to_string(),
            ));
        }
        if self.fetch.timeout_secs == 0 {
            return Err(AppError::Config(
                "fetch.timeout_secs must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}
