//! Proxy base URL handling.
//!
//! The URL a user enters (or a deep link carries) is the proxy *base*. The
//! JSON API lives under `{base}/api/v1`, the remote-approval socket under the
//! same path with a websocket scheme, and the OpenID page directly on the base.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

const API_PREFIX: &str = "api/v1";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProxyUrlError {
    #[error("proxy url is empty")]
    Empty,

    #[error("proxy url is not a valid url: {0}")]
    Invalid(String),

    #[error("unsupported proxy url scheme: {0}")]
    UnsupportedScheme(String),
}

/// Normalized proxy base URL (no trailing slash).
///
/// 规范化的代理基础地址。
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProxyUrl(String);

impl ProxyUrl {
    pub fn parse(raw: &str) -> Result<Self, ProxyUrlError> {
        let trimmed = raw.trim().trim_end_matches('/');
        if trimmed.is_empty() {
            return Err(ProxyUrlError::Empty);
        }

        let parsed = Url::parse(trimmed).map_err(|e| ProxyUrlError::Invalid(e.to_string()))?;
        match parsed.scheme() {
            "http" | "https" => {}
            other => return Err(ProxyUrlError::UnsupportedScheme(other.to_string())),
        }
        if parsed.host_str().map_or(true, str::is_empty) {
            return Err(ProxyUrlError::Invalid(format!("missing host in {trimmed}")));
        }

        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// `{base}/api/v1/{path}`
    pub fn api_url(&self, path: &str) -> String {
        format!("{}/{}/{}", self.0, API_PREFIX, path.trim_start_matches('/'))
    }

    /// Same as [`Self::api_url`] with `http` mapped to `ws` and `https` to `wss`.
    pub fn websocket_url(&self, path: &str) -> String {
        let http = self.api_url(path);
        if let Some(rest) = http.strip_prefix("https://") {
            format!("wss://{rest}")
        } else if let Some(rest) = http.strip_prefix("http://") {
            format!("ws://{rest}")
        } else {
            http
        }
    }

    /// Browser URL of the identity-provider MFA page for `token`.
    pub fn openid_mfa_url(&self, token: &str) -> String {
        let query: String = url::form_urlencoded::Serializer::new(String::new())
            .append_pair("token", token)
            .finish();
        format!("{}/openid/mfa?{}", self.0, query)
    }
}

impl std::fmt::Display for ProxyUrl {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}
