//! `defguard://` deep links.
//!
//! Only one link shape is understood:
//! `defguard://addinstance?token=<token>&url=<proxy url>`. The action may also
//! be given as the first path segment (`defguard:///addinstance?...`).
//! Anything else does not parse.

use thiserror::Error;
use url::Url;

use crate::proxy_url::ProxyUrl;

pub const DEEP_LINK_SCHEME: &str = "defguard";
const ADD_INSTANCE_ACTION: &str = "addinstance";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DeepLinkError {
    #[error("not a url: {0}")]
    NotAUrl(String),
    #[error("unknown scheme {0}")]
    UnknownScheme(String),
    #[error("unknown action {0:?}")]
    UnknownAction(String),
    #[error("unexpected query parameter {0}")]
    UnexpectedParameter(String),
    #[error("missing or empty parameter {0}")]
    MissingParameter(&'static str),
    #[error("invalid proxy url: {0}")]
    InvalidUrl(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeepLink {
    AddInstance { url: ProxyUrl, token: String },
}

impl DeepLink {
    pub fn parse(raw: &str) -> Result<Self, DeepLinkError> {
        let parsed = Url::parse(raw.trim()).map_err(|e| DeepLinkError::NotAUrl(e.to_string()))?;

        if parsed.scheme() != DEEP_LINK_SCHEME {
            return Err(DeepLinkError::UnknownScheme(parsed.scheme().to_string()));
        }

        let action = match parsed.host_str().filter(|h| !h.is_empty()) {
            Some(host) => host.to_string(),
            None => parsed
                .path_segments()
                .and_then(|mut segments| segments.next())
                .unwrap_or_default()
                .to_string(),
        };
        if !action.eq_ignore_ascii_case(ADD_INSTANCE_ACTION) {
            return Err(DeepLinkError::UnknownAction(action));
        }

        let mut token = None;
        let mut url = None;
        for (key, value) in parsed.query_pairs() {
            let slot = match key.as_ref() {
                "token" => &mut token,
                "url" => &mut url,
                other => return Err(DeepLinkError::UnexpectedParameter(other.to_string())),
            };
            if slot.is_some() {
                return Err(DeepLinkError::UnexpectedParameter(key.into_owned()));
            }
            *slot = Some(value.trim().to_string());
        }

        let token = token
            .filter(|t| !t.is_empty())
            .ok_or(DeepLinkError::MissingParameter("token"))?;
        let url = url
            .filter(|u| !u.is_empty())
            .ok_or(DeepLinkError::MissingParameter("url"))?;
        let url = ProxyUrl::parse(&url).map_err(|e| DeepLinkError::InvalidUrl(e.to_string()))?;

        Ok(Self::AddInstance { url, token })
    }
}
