use serde::{Deserialize, Serialize};

use super::{MfaError, MfaMethod};
use crate::ids::{InstanceId, LocationId};
use crate::proxy::ClientMfaStartResponse;
use crate::proxy_url::ProxyUrl;

/// What an MFA attempt authorizes: one location of one instance for one device.
///
/// 一次 MFA 授权的目标位置。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MfaTarget {
    pub instance_id: InstanceId,
    pub location_id: LocationId,
    pub pubkey: String,
    pub proxy_url: ProxyUrl,
}

impl MfaTarget {
    /// Key identifying "the same target" for attempt de-duplication.
    pub fn key(&self) -> (InstanceId, LocationId) {
        (self.instance_id.clone(), self.location_id)
    }
}

/// An issued challenge.
///
/// 已签发的挑战。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MfaChallenge {
    pub token: String,
    pub method: MfaMethod,
    /// Mobile approval only.
    pub challenge: Option<String>,
}

impl MfaChallenge {
    pub fn issued(method: MfaMethod, response: ClientMfaStartResponse) -> Self {
        Self {
            token: response.token,
            method,
            challenge: response.challenge,
        }
    }

    /// Secret the phone signs; required for mobile approval.
    pub fn mobile_secret(&self) -> Result<&str, MfaError> {
        match (self.method, self.challenge.as_deref()) {
            (MfaMethod::MobileApprove, Some(secret)) => Ok(secret),
            _ => Err(MfaError::UnknownResponse),
        }
    }
}

#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PresharedKey(String);

impl PresharedKey {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Debug for PresharedKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("PresharedKey(<redacted>)")
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MfaOutcome {
    Authorized(PresharedKey),
    Cancelled,
}

/// Progress reported to the prompt while an attempt runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MfaStatus {
    Starting(MfaMethod),
    AwaitingCode(MfaMethod),
    AwaitingBrowser { url: String },
    AwaitingMobile,
    Failed(MfaError),
    Authorized,
    Cancelled,
}
