use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::Serialize;

use crate::ids::InstanceId;

/// Raw bytes rendered into the mobile-approval QR code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QrPayload(Vec<u8>);

#[derive(Serialize)]
struct QrBody<'a> {
    token: &'a str,
    challenge: &'a str,
    instance_id: &'a str,
}

impl QrPayload {
    pub fn encode(token: &str, challenge: &str, instance_id: &InstanceId) -> Self {
        let body = QrBody {
            token,
            challenge,
            instance_id: instance_id.as_str(),
        };
        // Serializing a struct of &str cannot fail.
        let bytes = serde_json::to_vec(&body).unwrap_or_default();
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn to_base64(&self) -> String {
        STANDARD.encode(&self.0)
    }
}
