//! ext_api - Authenticated JSON transport for opsdeck extensions
//!
//! Wraps a pooled `reqwest` client bound to the dashboard API base URL. The
//! pack catalog, the plugin fetcher and the descriptor catalog all go through
//! this client so credentials and error reporting stay uniform.
//!
//! Error codes: 9000-9099

use std::sync::Arc;
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};
use serde_json::Value;
use tracing::debug;
use url::Url;

// ============================================================================
// Error Types with Structured Codes
// ============================================================================

/// Error codes for API transport operations
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum ApiErrorCode {
    /// Invalid base URL or route
    InvalidUrl = 9000,
    /// Request could not be built or sent
    Request = 9001,
    /// Request timed out
    Timeout = 9002,
    /// Server answered with a non-success status
    HttpStatus = 9003,
    /// Response body could not be decoded
    Decode = 9004,
}

/// Custom error type for API operations
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("[{code}] Invalid URL: {message}")]
    InvalidUrl { code: u32, message: String },

    #[error("[{code}] Request failed: {message}")]
    Request { code: u32, message: String },

    #[error("[{code}] Request timeout: {message}")]
    Timeout { code: u32, message: String },

    #[error("[{code}] HTTP {status}: {message}")]
    HttpStatus {
        code: u32,
        status: u16,
        message: String,
    },

    #[error("[{code}] Decode error: {message}")]
    Decode { code: u32, message: String },
}

impl ApiError {
    pub fn invalid_url(message: impl Into<String>) -> Self {
        Self::InvalidUrl {
            code: ApiErrorCode::InvalidUrl as u32,
            message: message.into(),
        }
    }

    pub fn request(message: impl Into<String>) -> Self {
        Self::Request {
            code: ApiErrorCode::Request as u32,
            message: message.into(),
        }
    }

    pub fn timeout(message: impl Into<String>) -> Self {
        Self::Timeout {
            code: ApiErrorCode::Timeout as u32,
            message: message.into(),
        }
    }

    pub fn http_status(status: u16, message: impl Into<String>) -> Self {
        Self::HttpStatus {
            code: ApiErrorCode::HttpStatus as u32,
            status,
            message: message.into(),
        }
    }

    pub fn decode(message: impl Into<String>) -> Self {
        Self::Decode {
            code: ApiErrorCode::Decode as u32,
            message: message.into(),
        }
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(e: reqwest::Error) -> Self {
        // Plugin URLs may carry the access token as a query parameter
        let e = e.without_url();
        if e.is_timeout() {
            Self::timeout(e.to_string())
        } else if e.is_decode() {
            Self::decode(e.to_string())
        } else if let Some(status) = e.status() {
            Self::http_status(status.as_u16(), e.to_string())
        } else {
            Self::request(e.to_string())
        }
    }
}

impl From<url::ParseError> for ApiError {
    fn from(e: url::ParseError) -> Self {
        Self::invalid_url(e.to_string())
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(e: serde_json::Error) -> Self {
        Self::decode(e.to_string())
    }
}

// ============================================================================
// Credentials
// ============================================================================

/// Source of the current access token.
///
/// The session layer lives outside this workspace; it only has to answer
/// "is there a token right now".
pub trait CredentialSource: Send + Sync {
    fn access_token(&self) -> Option<String>;
}

/// Fixed token handed over by the host at startup
#[derive(Debug, Clone, Default)]
pub struct StaticCredentials {
    token: Option<String>,
}

impl StaticCredentials {
    pub fn new(token: Option<String>) -> Self {
        Self {
            token: token.filter(|t| !t.trim().is_empty()),
        }
    }

    pub fn anonymous() -> Self {
        Self { token: None }
    }
}

impl CredentialSource for StaticCredentials {
    fn access_token(&self) -> Option<String> {
        self.token.clone()
    }
}

// ============================================================================
// Response envelopes
// ============================================================================

/// List responses arrive either as a bare array or wrapped in `{ "items": [...] }`.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum ListEnvelope<T> {
    Bare(Vec<T>),
    Items {
        #[serde(default = "Vec::new")]
        items: Vec<T>,
    },
}

impl<T> ListEnvelope<T> {
    pub fn into_vec(self) -> Vec<T> {
        match self {
            ListEnvelope::Bare(v) => v,
            ListEnvelope::Items { items } => items,
        }
    }
}

impl ListEnvelope<Value> {
    /// Decode every element on its own; elements that do not fit `T` are dropped.
    pub fn decode_each<T: DeserializeOwned>(self) -> Vec<T> {
        self.into_vec()
            .into_iter()
            .enumerate()
            .filter_map(|(index, item)| match serde_json::from_value(item) {
                Ok(decoded) => Some(decoded),
                Err(e) => {
                    debug!(index, error = %e, "dropping malformed list element");
                    None
                }
            })
            .collect()
    }
}

/// Decode a field, falling back to its default when the value has the wrong shape.
///
/// Use with `#[serde(default, deserialize_with = "ext_api::lenient")]`.
pub fn lenient<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned + Default,
{
    let value = Value::deserialize(deserializer)?;
    Ok(serde_json::from_value(value).unwrap_or_default())
}

// ============================================================================
// Client
// ============================================================================

/// Shared API client (reused for connection pooling)
#[derive(Clone)]
pub struct ApiClient {
    client: reqwest::Client,
    base_url: Url,
    credentials: Arc<dyn CredentialSource>,
}

impl ApiClient {
    /// Build a client for `base_url`. A missing trailing slash is added so
    /// routes resolve below the base path instead of replacing its last segment.
    pub fn new(
        base_url: &str,
        credentials: Arc<dyn CredentialSource>,
        timeout: Option<Duration>,
    ) -> Result<Self, ApiError> {
        let mut normalized = base_url.trim().to_string();
        if !normalized.ends_with('/') {
            normalized.push('/');
        }
        let base_url = Url::parse(&normalized)?;

        let mut builder = reqwest::Client::builder().user_agent("opsdeck/0.1");
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder.build().map_err(|e| ApiError::request(e.to_string()))?;

        Ok(Self {
            client,
            base_url,
            credentials,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Current access token, if the session has one
    pub fn access_token(&self) -> Option<String> {
        self.credentials
            .access_token()
            .filter(|t| !t.trim().is_empty())
    }

    /// Resolve a route such as `/api/packs` against the base URL
    pub fn endpoint(&self, route: &str) -> Result<Url, ApiError> {
        Ok(self.base_url.join(route.trim_start_matches('/'))?)
    }

    /// GET a JSON document with bearer authentication
    pub async fn get_json<T: DeserializeOwned>(&self, route: &str) -> Result<T, ApiError> {
        let url = self.endpoint(route)?;
        let mut request = self.client.get(url.clone());
        if let Some(token) = self.access_token() {
            request = request.bearer_auth(token);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(ApiError::http_status(
                status.as_u16(),
                format!("GET {url}"),
            ));
        }

        let body = response.text().await?;
        debug!(%url, body_len = body.len(), "api.get_json complete");
        Ok(serde_json::from_str(&body)?)
    }

    /// GET a raw body from an absolute URL without any auth header.
    ///
    /// Used for module fetches where the credential already travels in the query.
    pub async fn get_text(&self, url: &Url) -> Result<String, ApiError> {
        let response = self.client.get(url.clone()).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(ApiError::http_status(
                status.as_u16(),
                format!("GET {}", url.path()),
            ));
        }
        let body = response.text().await?;
        debug!(path = url.path(), body_len = body.len(), "api.get_text complete");
        Ok(body)
    }
}

impl std::fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiClient")
            .field("base_url", &self.base_url.as_str())
            .field("authenticated", &self.access_token().is_some())
            .finish()
    }
}
