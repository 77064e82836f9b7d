//! # Device RESTCONF Client
//!
//! Thin wrapper around `reqwest` for reading JSON documents from a TAPI
//! device. Token-based methods authenticate once per client; the token is
//! shared by every request made through it.

use super::{Auth, Device};
use serde_json::Value;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::OnceCell;
use tracing::debug;

/// RESTCONF media type for YANG data encoded as JSON.
const YANG_JSON: &str = "application/yang-data+json";

/// Errors from the device client layer.
#[derive(Debug, Error)]
pub enum FetchError {
    /// Cannot reach the device.
    #[error("Cannot connect to device at {0}")]
    ConnectionFailed(String),

    /// The request did not complete in time.
    #[error("Request timed out")]
    Timeout,

    /// 401 Unauthorized.
    #[error("Unauthorized: device rejected the credentials")]
    Unauthorized,

    /// 429 Too Many Requests.
    #[error("Rate limited: too many requests")]
    RateLimited,

    /// Any other non-success status.
    #[error("Device returned {0}: {1}")]
    Status(u16, String),

    /// The token endpoint answered without a usable token.
    #[error("Authentication failed: {0}")]
    Auth(String),

    /// Failed to parse the response body.
    #[error("Parse error: {0}")]
    Parse(String),
}

/// HTTP client bound to one device.
pub struct DeviceClient {
    http: reqwest::Client,
    base_url: String,
    auth: Auth,
    token: OnceCell<String>,
}

impl DeviceClient {
    /// Create a client for a device with a per-request timeout.
    pub fn new(device: &Device, timeout: Duration) -> Result<Self, FetchError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .danger_accept_invalid_certs(!device.verify_tls)
            .build()
            .map_err(|e| FetchError::ConnectionFailed(format!("{}: {e}", device.base_url())))?;

        Ok(Self {
            http,
            base_url: device.base_url(),
            auth: device.auth.clone(),
            token: OnceCell::new(),
        })
    }

    /// Base URL requests are made against.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Resolve a path or absolute URL against the device.
    fn url(&self, path: &str) -> String {
        if path.starts_with("http://") || path.starts_with("https://") {
            path.to_string()
        } else {
            format!("{}{}", self.base_url, path)
        }
    }

    /// GET a JSON document.
    pub async fn get_json(&self, path: &str, query: &[(&str, &str)]) -> Result<Value, FetchError> {
        debug!(path, "GET");
        let req = self
            .http
            .get(self.url(path))
            .header(reqwest::header::ACCEPT, YANG_JSON)
            .query(query);
        let req = self.authorize(req).await?;
        let resp = self.send(req).await?;
        self.handle_response(resp).await
    }

    /// Attach credentials for the configured method.
    async fn authorize(
        &self,
        req: reqwest::RequestBuilder,
    ) -> Result<reqwest::RequestBuilder, FetchError> {
        match &self.auth {
            Auth::Basic(basic) => Ok(req.basic_auth(&basic.username, Some(&basic.password))),
            Auth::Oauth2(_) | Auth::Custom(_) => {
                let token = self
                    .token
                    .get_or_try_init(|| self.request_token())
                    .await?;
                Ok(req.bearer_auth(token))
            }
        }
    }

    /// Obtain a bearer token from the configured auth endpoint.
    async fn request_token(&self) -> Result<String, FetchError> {
        let req = match &self.auth {
            Auth::Oauth2(oauth) => self.http.post(self.url(&oauth.auth_url)).form(&[
                ("grant_type", oauth.grant_type.as_str()),
                ("username", oauth.username.as_str()),
                ("password", oauth.password.as_str()),
            ]),
            Auth::Custom(custom) => self
                .http
                .post(self.url(&custom.auth_url))
                .json(&custom.auth_body),
            Auth::Basic(_) => {
                return Err(FetchError::Auth("basic auth does not use tokens".to_string()));
            }
        };

        debug!(method = self.auth.method(), "requesting token");
        let resp = self.send(req).await?;
        let body = self.handle_response(resp).await?;
        body.get("access_token")
            .or_else(|| body.get("token"))
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| FetchError::Auth("response carries no access_token".to_string()))
    }

    /// Handle HTTP response: check status codes and parse JSON.
    async fn handle_response(&self, resp: reqwest::Response) -> Result<Value, FetchError> {
        let status = resp.status();
        if status == reqwest::StatusCode::UNAUTHORIZED {
            return Err(FetchError::Unauthorized);
        }
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(FetchError::RateLimited);
        }
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(FetchError::Status(status.as_u16(), body));
        }
        resp.json::<Value>()
            .await
            .map_err(|e| FetchError::Parse(e.to_string()))
    }

    /// Send a request and classify transport errors.
    async fn send(&self, req: reqwest::RequestBuilder) -> Result<reqwest::Response, FetchError> {
        req.send().await.map_err(|e| {
            if e.is_timeout() {
                FetchError::Timeout
            } else {
                FetchError::ConnectionFailed(format!("{}: {e}", self.base_url))
            }
        })
    }
}
