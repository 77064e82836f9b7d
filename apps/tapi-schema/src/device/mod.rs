//! # Device Model
//!
//! A TAPI device reachable over RESTCONF: where it lives and how to
//! authenticate against it.
//!
//! Three authentication methods are recognized from the fields present:
//! - `grant_type` present: OAuth2 password grant
//! - `auth_body` present: custom body posted to `auth_url`
//! - `username` and `password` only: HTTP Basic

mod client;

pub use client::{DeviceClient, FetchError};

use serde::Deserialize;
use serde_json::Value;

/// Environment variable overriding the configured password.
pub const PASSWORD_ENV: &str = "TAPI_SCHEMA_PASSWORD";

/// URL scheme used to reach the device.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Scheme {
    Http,
    #[default]
    Https,
}

impl Scheme {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Http => "http",
            Self::Https => "https",
        }
    }
}

fn default_verify_tls() -> bool {
    true
}

/// A device: host, optional port and authentication.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Device {
    pub host: String,
    #[serde(default)]
    pub port: Option<u16>,
    #[serde(default)]
    pub scheme: Scheme,
    /// Reject self-signed certificates. Lab devices often need `false`.
    #[serde(default = "default_verify_tls")]
    pub verify_tls: bool,
    pub auth: Auth,
}

impl Device {
    /// Base URL of the device, without a trailing slash.
    #[must_use]
    pub fn base_url(&self) -> String {
        match self.port {
            Some(port) => format!("{}://{}:{}", self.scheme.as_str(), self.host, port),
            None => format!("{}://{}", self.scheme.as_str(), self.host),
        }
    }
}

// =============================================================================
// AUTHENTICATION
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BasicAuth {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Oauth2Auth {
    pub username: String,
    pub password: String,
    pub grant_type: String,
    pub auth_url: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CustomAuth {
    /// Posted as JSON to `auth_url`.
    pub auth_body: Value,
    pub auth_url: String,
}

/// How to authenticate against the device.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(try_from = "RawAuth")]
pub enum Auth {
    Basic(BasicAuth),
    Oauth2(Oauth2Auth),
    Custom(CustomAuth),
}

impl Auth {
    /// Replace the password of a password-based method.
    pub fn set_password(&mut self, password: String) {
        match self {
            Self::Basic(auth) => auth.password = password,
            Self::Oauth2(auth) => auth.password = password,
            Self::Custom(_) => {}
        }
    }

    /// Method name for logs.
    #[must_use]
    pub const fn method(&self) -> &'static str {
        match self {
            Self::Basic(_) => "basic",
            Self::Oauth2(_) => "oauth2",
            Self::Custom(_) => "custom",
        }
    }
}

/// Every field any method may carry.
#[derive(Debug, Deserialize)]
struct RawAuth {
    username: Option<String>,
    password: Option<String>,
    grant_type: Option<String>,
    auth_url: Option<String>,
    auth_body: Option<Value>,
}

impl TryFrom<RawAuth> for Auth {
    type Error = String;

    fn try_from(raw: RawAuth) -> Result<Self, Self::Error> {
        let missing = |field: &str, method: &str| format!("{method} auth requires `{field}`");

        if let Some(grant_type) = raw.grant_type {
            return Ok(Self::Oauth2(Oauth2Auth {
                username: raw.username.ok_or_else(|| missing("username", "oauth2"))?,
                password: raw.password.ok_or_else(|| missing("password", "oauth2"))?,
                grant_type,
                auth_url: raw.auth_url.ok_or_else(|| missing("auth_url", "oauth2"))?,
            }));
        }

        if let Some(auth_body) = raw.auth_body {
            return Ok(Self::Custom(CustomAuth {
                auth_body,
                auth_url: raw.auth_url.ok_or_else(|| missing("auth_url", "custom"))?,
            }));
        }

        match (raw.username, raw.password) {
            (Some(username), Some(password)) => Ok(Self::Basic(BasicAuth { username, password })),
            _ => Err("Not recognizable authentication type".to_string()),
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================
