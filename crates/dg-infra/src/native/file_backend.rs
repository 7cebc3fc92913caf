//! File-backed stand-in for the native device/tunnel backend.
//!
//! Instances and their location configs live in `instances.json`. Connecting
//! a location renders a wg-quick style config under `tunnels/` and
//! publishes a [`NativeEvent`].

use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use anyhow::Context;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::fs;
use tokio::sync::{broadcast, Mutex};
use tracing::{debug, info};

use dg_core::ports::{NativeBackendError, NativeBackendPort, NativeEvent, SaveDeviceConfig};
use dg_core::proxy::{DeviceConfig, DeviceResponse};
use dg_core::{Instance, InstanceId, Location, LocationId, PresharedKey};

const INSTANCES_FILE: &str = "instances.json";
const TUNNELS_DIR: &str = "tunnels";
const EVENT_CAPACITY: usize = 32;

#[derive(Debug, Clone, Serialize, Deserialize)]
struct InstanceRecord {
    instance: Instance,
    #[serde(default)]
    configs: Vec<DeviceConfig>,
    private_key: String,
}

pub struct FileNativeBackend {
    dir: PathBuf,
    records: Mutex<Vec<InstanceRecord>>,
    events: broadcast::Sender<NativeEvent>,
}

impl FileNativeBackend {
    /// Open the backend rooted at `dir`, loading any saved instances.
    pub async fn open(dir: impl Into<PathBuf>) -> anyhow::Result<Self> {
        let dir = dir.into();
        let records = load_records(&dir.join(INSTANCES_FILE)).await?;
        debug!(count = records.len(), "native backend opened");
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Ok(Self {
            dir,
            records: Mutex::new(records),
            events,
        })
    }

    pub fn tunnel_path(&self, instance_id: &InstanceId, location_id: LocationId) -> PathBuf {
        self.dir
            .join(TUNNELS_DIR)
            .join(format!("{instance_id}-{location_id}.conf"))
    }

    /// Ask the user for MFA on behalf of a location, as the tunnel service
    /// does when a connection attempt needs it.
    pub fn request_mfa(&self, instance_id: InstanceId, location_id: LocationId) {
        self.publish(NativeEvent::MfaRequested {
            instance_id,
            location_id,
        });
    }

    fn publish(&self, event: NativeEvent) {
        // No subscribers is fine.
        let _ = self.events.send(event);
    }

    async fn persist(&self, records: &[InstanceRecord]) -> anyhow::Result<()> {
        fs::create_dir_all(&self.dir)
            .await
            .with_context(|| format!("create backend dir failed: {}", self.dir.display()))?;
        let path = self.dir.join(INSTANCES_FILE);
        let tmp_path = path.with_extension("json.tmp");
        let json = serde_json::to_string_pretty(records).context("serialize instances failed")?;
        fs::write(&tmp_path, json)
            .await
            .with_context(|| format!("write temp instances failed: {}", tmp_path.display()))?;
        fs::rename(&tmp_path, &path)
            .await
            .with_context(|| format!("rename temp instances failed: {}", path.display()))?;
        Ok(())
    }
}

async fn load_records(path: &Path) -> anyhow::Result<Vec<InstanceRecord>> {
    let content = match fs::read_to_string(path).await {
        Ok(content) => content,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(err) => {
            return Err(err).with_context(|| format!("read instances failed: {}", path.display()))
        }
    };
    if content.trim().is_empty() {
        return Ok(Vec::new());
    }
    serde_json::from_str(&content)
        .with_context(|| format!("parse instances failed: {}", path.display()))
}

fn command_error(err: anyhow::Error) -> NativeBackendError {
    NativeBackendError::Command(format!("{err:#}"))
}

fn build_instance(response: &DeviceResponse, proxy_url: dg_core::ProxyUrl) -> Instance {
    let id = InstanceId::from(response.instance.id.as_str());
    Instance {
        locations: response
            .configs
            .iter()
            .map(|config| Location::from_config(&id, config))
            .collect(),
        id,
        name: response.instance.name.clone(),
        proxy_url,
        pubkey: response.device.pubkey.clone(),
    }
}

/// wg-quick style rendering of one location config.
fn render_tunnel(private_key: &str, config: &DeviceConfig, psk: Option<&PresharedKey>) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "[Interface]");
    let _ = writeln!(out, "PrivateKey = {private_key}");
    let _ = writeln!(out, "Address = {}", config.assigned_ip);
    if let Some(dns) = config.dns.as_deref().filter(|dns| !dns.trim().is_empty()) {
        let _ = writeln!(out, "DNS = {dns}");
    }
    let _ = writeln!(out);
    let _ = writeln!(out, "[Peer]");
    let _ = writeln!(out, "PublicKey = {}", config.pubkey);
    if let Some(psk) = psk {
        let _ = writeln!(out, "PresharedKey = {}", psk.expose());
    }
    let _ = writeln!(out, "AllowedIPs = {}", config.allowed_ips);
    let _ = writeln!(out, "Endpoint = {}", config.endpoint);
    if config.keepalive_interval > 0 {
        let _ = writeln!(out, "PersistentKeepalive = {}", config.keepalive_interval);
    }
    out
}

#[async_trait]
impl NativeBackendPort for FileNativeBackend {
    async fn list_instances(&self) -> Result<Vec<Instance>, NativeBackendError> {
        Ok(self
            .records
            .lock()
            .await
            .iter()
            .map(|record| record.instance.clone())
            .collect())
    }

    async fn save_device_config(
        &self,
        config: SaveDeviceConfig,
    ) -> Result<Instance, NativeBackendError> {
        let instance = build_instance(&config.response, config.proxy_url);
        let record = InstanceRecord {
            instance: instance.clone(),
            configs: config.response.configs,
            private_key: config.keys.private.expose().to_string(),
        };

        let mut records = self.records.lock().await;
        let mut next: Vec<InstanceRecord> = records
            .iter()
            .filter(|existing| existing.instance.id != instance.id)
            .cloned()
            .collect();
        next.push(record);
        self.persist(&next).await.map_err(command_error)?;
        *records = next;

        info!(instance_id = %instance.id, locations = instance.locations.len(), "device config saved");
        Ok(instance)
    }

    async fn update_instance(
        &self,
        instance_id: &InstanceId,
        response: DeviceResponse,
    ) -> Result<(), NativeBackendError> {
        let mut records = self.records.lock().await;
        let mut next = records.clone();
        let record = next
            .iter_mut()
            .find(|record| &record.instance.id == instance_id)
            .ok_or_else(|| NativeBackendError::UnknownInstance(instance_id.clone()))?;

        let mut instance = build_instance(&response, record.instance.proxy_url.clone());
        instance.id = instance_id.clone();
        record.instance = instance;
        record.configs = response.configs;
        self.persist(&next).await.map_err(command_error)?;
        *records = next;

        info!(instance_id = %instance_id, "instance config updated");
        Ok(())
    }

    async fn connect(
        &self,
        instance_id: &InstanceId,
        location_id: LocationId,
        preshared_key: Option<PresharedKey>,
    ) -> Result<(), NativeBackendError> {
        let records = self.records.lock().await;
        let record = records
            .iter()
            .find(|record| &record.instance.id == instance_id)
            .ok_or_else(|| NativeBackendError::UnknownInstance(instance_id.clone()))?;
        let location = record
            .instance
            .location(location_id)
            .ok_or(NativeBackendError::UnknownLocation(location_id))?;
        let config = record
            .configs
            .iter()
            .find(|config| config.network_id == location_id.get())
            .ok_or(NativeBackendError::UnknownLocation(location_id))?;

        if location.requires_mfa() && preshared_key.is_none() {
            debug!(instance_id = %instance_id, location_id = %location_id, "location needs mfa first");
            self.request_mfa(instance_id.clone(), location_id);
            return Ok(());
        }

        let rendered = render_tunnel(&record.private_key, config, preshared_key.as_ref());
        let path = self.tunnel_path(instance_id, location_id);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .await
                .with_context(|| format!("create tunnel dir failed: {}", parent.display()))
                .map_err(command_error)?;
        }
        fs::write(&path, rendered)
            .await
            .with_context(|| format!("write tunnel config failed: {}", path.display()))
            .map_err(command_error)?;
        drop(records);

        info!(instance_id = %instance_id, location_id = %location_id, "tunnel config written");
        self.publish(NativeEvent::ConnectionChanged {
            instance_id: instance_id.clone(),
            location_id,
            connected: true,
        });
        Ok(())
    }

    fn subscribe(&self) -> broadcast::Receiver<NativeEvent> {
        self.events.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dg_core::enrollment::DeviceKeys;
    use dg_core::proxy::{DeviceInfo, InstanceInfo};
    use dg_core::{MfaMethod, ProxyUrl, SecretString};
    use tempfile::TempDir;

    const INSTANCE_ID: &str = "2f1c6f0e-3f36-4d6e-9a53-4a3b5d1f7c11";

    fn config(network_id: i64, mfa_method: Option<MfaMethod>) -> DeviceConfig {
        DeviceConfig {
            network_id,
            network_name: format!("net-{network_id}"),
            config: String::new(),
            endpoint: "vpn.example.com:51820".into(),
            assigned_ip: "10.0.0.2/32".into(),
            pubkey: "server-pubkey".into(),
            allowed_ips: "10.0.0.0/24".into(),
            dns: Some("10.0.0.1".into()),
            keepalive_interval: 25,
            mfa_method,
        }
    }

    fn response(configs: Vec<DeviceConfig>) -> DeviceResponse {
        DeviceResponse {
            device: DeviceInfo {
                id: 7,
                name: "laptop".into(),
                pubkey: "device-pubkey".into(),
                user_id: 3,
                created_at: None,
            },
            configs,
            instance: InstanceInfo {
                id: INSTANCE_ID.into(),
                name: "Example".into(),
                url: "https://core.example.com".into(),
                proxy_url: "https://vpn.example.com".into(),
                username: "jdoe".into(),
            },
        }
    }

    fn save_request(configs: Vec<DeviceConfig>) -> SaveDeviceConfig {
        SaveDeviceConfig {
            proxy_url: ProxyUrl::parse("https://vpn.example.com").unwrap(),
            keys: DeviceKeys {
                public: "device-pubkey".into(),
                private: SecretString::new("device-private"),
            },
            response: response(configs),
        }
    }

    #[tokio::test]
    async fn saved_instances_survive_reopen() {
        let dir = TempDir::new().unwrap();
        let backend = FileNativeBackend::open(dir.path()).await.unwrap();

        let saved = backend
            .save_device_config(save_request(vec![config(1, None), config(2, Some(MfaMethod::Totp))]))
            .await
            .unwrap();
        assert_eq!(saved.id.as_str(), INSTANCE_ID);
        assert_eq!(saved.locations.len(), 2);
        assert!(saved.location(LocationId(2)).unwrap().requires_mfa());

        let reopened = FileNativeBackend::open(dir.path()).await.unwrap();
        assert_eq!(reopened.list_instances().await.unwrap(), vec![saved]);
    }

    #[tokio::test]
    async fn failed_write_leaves_memory_unchanged() {
        let dir = TempDir::new().unwrap();
        let backend_dir = dir.path().join("backend");
        let backend = FileNativeBackend::open(&backend_dir).await.unwrap();
        std::fs::write(&backend_dir, b"not a directory").unwrap();

        let err = backend
            .save_device_config(save_request(vec![config(1, None)]))
            .await
            .unwrap_err();

        assert!(matches!(err, NativeBackendError::Command(_)));
        assert!(backend.list_instances().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn saving_same_instance_twice_replaces_it() {
        let dir = TempDir::new().unwrap();
        let backend = FileNativeBackend::open(dir.path()).await.unwrap();

        backend.save_device_config(save_request(vec![config(1, None)])).await.unwrap();
        backend.save_device_config(save_request(vec![config(1, None)])).await.unwrap();

        assert_eq!(backend.list_instances().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn update_replaces_locations() {
        let dir = TempDir::new().unwrap();
        let backend = FileNativeBackend::open(dir.path()).await.unwrap();
        backend.save_device_config(save_request(vec![config(1, None)])).await.unwrap();

        backend
            .update_instance(&InstanceId::from(INSTANCE_ID), response(vec![config(5, None)]))
            .await
            .unwrap();

        let instances = backend.list_instances().await.unwrap();
        let ids: Vec<_> = instances[0].locations.iter().map(|l| l.id).collect();
        assert_eq!(ids, vec![LocationId(5)]);
    }

    #[tokio::test]
    async fn update_of_unknown_instance_fails() {
        let dir = TempDir::new().unwrap();
        let backend = FileNativeBackend::open(dir.path()).await.unwrap();

        let err = backend
            .update_instance(&InstanceId::from("missing"), response(vec![]))
            .await
            .unwrap_err();

        assert!(matches!(err, NativeBackendError::UnknownInstance(_)));
    }

    #[tokio::test]
    async fn connect_writes_tunnel_and_publishes() {
        let dir = TempDir::new().unwrap();
        let backend = FileNativeBackend::open(dir.path()).await.unwrap();
        backend
            .save_device_config(save_request(vec![config(2, Some(MfaMethod::Totp))]))
            .await
            .unwrap();
        let mut events = backend.subscribe();
        let id = InstanceId::from(INSTANCE_ID);

        backend
            .connect(&id, LocationId(2), Some(PresharedKey::new("psk-value")))
            .await
            .unwrap();

        let tunnel = std::fs::read_to_string(backend.tunnel_path(&id, LocationId(2))).unwrap();
        assert!(tunnel.contains("PrivateKey = device-private"));
        assert!(tunnel.contains("PresharedKey = psk-value"));
        assert!(tunnel.contains("PersistentKeepalive = 25"));
        assert_eq!(
            events.recv().await.unwrap(),
            NativeEvent::ConnectionChanged {
                instance_id: id,
                location_id: LocationId(2),
                connected: true,
            }
        );
    }

    #[tokio::test]
    async fn mfa_location_without_key_requests_mfa() {
        let dir = TempDir::new().unwrap();
        let backend = FileNativeBackend::open(dir.path()).await.unwrap();
        backend
            .save_device_config(save_request(vec![config(2, Some(MfaMethod::Email))]))
            .await
            .unwrap();
        let mut events = backend.subscribe();
        let id = InstanceId::from(INSTANCE_ID);

        backend.connect(&id, LocationId(2), None).await.unwrap();

        assert!(!backend.tunnel_path(&id, LocationId(2)).exists());
        assert_eq!(
            events.recv().await.unwrap(),
            NativeEvent::MfaRequested {
                instance_id: id,
                location_id: LocationId(2),
            }
        );
    }

    #[tokio::test]
    async fn connect_to_unknown_location_fails() {
        let dir = TempDir::new().unwrap();
        let backend = FileNativeBackend::open(dir.path()).await.unwrap();
        backend.save_device_config(save_request(vec![config(1, None)])).await.unwrap();

        let err = backend
            .connect(&InstanceId::from(INSTANCE_ID), LocationId(9), None)
            .await
            .unwrap_err();

        assert!(matches!(err, NativeBackendError::UnknownLocation(LocationId(9))));
    }
}
