//! Locally known instances as reported by the native backend.

use serde::{Deserialize, Serialize};

use crate::ids::{InstanceId, LocationId};
use crate::mfa::MfaMethod;
use crate::proxy::{DeviceConfig, InstanceInfo};
use crate::proxy_url::ProxyUrl;

/// A VPN location belonging to an instance.
///
/// 实例下的 VPN 位置。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Location {
    pub id: LocationId,
    pub instance_id: InstanceId,
    pub name: String,
    /// MFA method the location requires before connecting.
    #[serde(default)]
    pub mfa_method: Option<MfaMethod>,
}

impl Location {
    pub fn from_config(instance_id: &InstanceId, config: &DeviceConfig) -> Self {
        Self {
            id: LocationId(config.network_id),
            instance_id: instance_id.clone(),
            name: config.network_name.clone(),
            mfa_method: config.mfa_method,
        }
    }

    pub fn requires_mfa(&self) -> bool {
        self.mfa_method.is_some()
    }
}

/// A registered instance. Identity is the server-issued UUID only.
///
/// 已注册的实例（以服务端 UUID 标识）。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Instance {
    pub id: InstanceId,
    pub name: String,
    pub proxy_url: ProxyUrl,
    /// Public key of this machine's device on the instance.
    pub pubkey: String,
    #[serde(default)]
    pub locations: Vec<Location>,
}

impl Instance {
    pub fn is_same_instance(&self, info: &InstanceInfo) -> bool {
        self.id.as_str() == info.id
    }

    pub fn location(&self, id: LocationId) -> Option<&Location> {
        self.locations.iter().find(|l| l.id == id)
    }
}

/// Which of the three reconciliation branches was taken.
///
/// 实例协调的结果分支。
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReconcileOutcome {
    /// Instance already known: its config was refreshed.
    InstanceUpdated { instance_id: InstanceId },
    /// User already enrolled elsewhere: only a device was added.
    DeviceRegistered { instance_id: InstanceId },
    /// A new enrollment session was started at the welcome step.
    EnrollmentStarted,
}
