use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::ids::LocationId;
use crate::mfa::MfaMethod;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientMfaStartRequest {
    pub method: MfaMethod,
    pub pubkey: String,
    pub location_id: LocationId,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientMfaStartResponse {
    pub token: String,
    /// Only issued for mobile approval.
    #[serde(default)]
    pub challenge: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientMfaFinishRequest {
    pub token: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientMfaFinishResponse {
    pub preshared_key: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RemoteMfaMessageError {
    #[error("message is not valid JSON: {0}")]
    NotJson(String),

    #[error("message is missing field `{0}`")]
    MissingField(&'static str),
}

/// Message pushed by the proxy over the remote-approval socket.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteMfaMessage {
    #[serde(rename = "type")]
    pub kind: String,
    pub preshared_key: String,
}

impl RemoteMfaMessage {
    /// Validate `text` against the fixed `{type, preshared_key}` shape.
    ///
    /// Both fields must be present, be strings, and be non-empty.
    pub fn parse(text: &str) -> Result<Self, RemoteMfaMessageError> {
        let value: serde_json::Value =
            serde_json::from_str(text).map_err(|e| RemoteMfaMessageError::NotJson(e.to_string()))?;

        let kind = non_empty_str(&value, "type")?;
        let preshared_key = non_empty_str(&value, "preshared_key")?;

        Ok(Self {
            kind: kind.to_string(),
            preshared_key: preshared_key.to_string(),
        })
    }
}

fn non_empty_str<'a>(
    value: &'a serde_json::Value,
    field: &'static str,
) -> Result<&'a str, RemoteMfaMessageError> {
    value
        .get(field)
        .and_then(|v| v.as_str())
        .filter(|s| !s.trim().is_empty())
        .ok_or(RemoteMfaMessageError::MissingField(field))
}
