use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::broadcast;

use crate::enrollment::DeviceKeys;
use crate::ids::{InstanceId, LocationId};
use crate::instance::Instance;
use crate::mfa::PresharedKey;
use crate::proxy::DeviceResponse;
use crate::proxy_url::ProxyUrl;

#[derive(Debug, Error)]
pub enum NativeBackendError {
    #[error("native backend command failed: {0}")]
    Command(String),

    #[error("unknown instance {0}")]
    UnknownInstance(InstanceId),

    #[error("unknown location {0}")]
    UnknownLocation(LocationId),
}

/// Payload of the "save device config" command.
#[derive(Debug, Clone)]
pub struct SaveDeviceConfig {
    pub proxy_url: ProxyUrl,
    pub keys: DeviceKeys,
    pub response: DeviceResponse,
}

/// Events pushed by the native backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NativeEvent {
    ConnectionChanged {
        instance_id: InstanceId,
        location_id: LocationId,
        connected: bool,
    },
    /// The backend needs the user to pass MFA before it can connect.
    MfaRequested {
        instance_id: InstanceId,
        location_id: LocationId,
    },
}

/// Command/event boundary of the native device-configuration and tunnel backend.
#[async_trait]
pub trait NativeBackendPort: Send + Sync {
    async fn list_instances(&self) -> Result<Vec<Instance>, NativeBackendError>;

    /// Persist a new device and its location configs. Returns the saved instance.
    async fn save_device_config(
        &self,
        config: SaveDeviceConfig,
    ) -> Result<Instance, NativeBackendError>;

    /// Replace an instance's configuration with freshly fetched network info.
    async fn update_instance(
        &self,
        instance_id: &InstanceId,
        response: DeviceResponse,
    ) -> Result<(), NativeBackendError>;

    async fn connect(
        &self,
        instance_id: &InstanceId,
        location_id: LocationId,
        preshared_key: Option<PresharedKey>,
    ) -> Result<(), NativeBackendError>;

    fn subscribe(&self) -> broadcast::Receiver<NativeEvent>;
}
