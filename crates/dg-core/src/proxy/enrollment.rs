use serde::{Deserialize, Serialize};

use crate::mfa::MfaMethod;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnrollmentStartRequest {
    pub token: String,
}

/// Contact details of the administrator who issued the enrollment token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdminInfo {
    pub name: String,
    #[serde(default)]
    pub phone_number: Option<String>,
    pub email: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserInfo {
    pub first_name: String,
    pub last_name: String,
    pub login: String,
    pub email: String,
    #[serde(default)]
    pub phone_number: Option<String>,
    #[serde(default)]
    pub is_active: bool,
    /// Already enrolled server-side: only a device needs registering.
    #[serde(default)]
    pub enrolled: bool,
    #[serde(default)]
    pub device_names: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstanceInfo {
    /// Stable instance UUID.
    pub id: String,
    pub name: String,
    pub url: String,
    pub proxy_url: String,
    #[serde(default)]
    pub username: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EnrollmentSettings {
    /// Enter the MFA subtree of the wizard.
    pub mfa_required: bool,
    /// Allow the user to skip MFA registration from the choice step.
    pub mfa_skippable: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnrollmentStartResponse {
    pub admin: AdminInfo,
    pub user: UserInfo,
    /// Unix timestamp (seconds) after which the enrollment session is dead.
    pub deadline_timestamp: i64,
    #[serde(default)]
    pub final_page_content: String,
    #[serde(default)]
    pub vpn_setup_optional: bool,
    pub instance: InstanceInfo,
    #[serde(default)]
    pub settings: EnrollmentSettings,
}

/// Start response plus every `Set-Cookie` header the proxy sent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnrollmentStartReply {
    pub body: EnrollmentStartResponse,
    pub set_cookies: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateDeviceRequest {
    pub name: String,
    pub pubkey: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceInfo {
    pub id: i64,
    pub name: String,
    pub pubkey: String,
    #[serde(default)]
    pub user_id: i64,
    #[serde(default)]
    pub created_at: Option<String>,
}

/// Per-location WireGuard configuration issued for a device.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceConfig {
    pub network_id: i64,
    pub network_name: String,
    pub config: String,
    pub endpoint: String,
    pub assigned_ip: String,
    pub pubkey: String,
    pub allowed_ips: String,
    #[serde(default)]
    pub dns: Option<String>,
    #[serde(default)]
    pub keepalive_interval: i64,
    /// MFA method required to connect, if any.
    #[serde(default)]
    pub mfa_method: Option<MfaMethod>,
}

/// Device plus per-location configs; returned by `create_device` and
/// `network_info`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceResponse {
    pub device: DeviceInfo,
    #[serde(default)]
    pub configs: Vec<DeviceConfig>,
    pub instance: InstanceInfo,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivateUserRequest {
    pub phone_number: Option<String>,
    pub password: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkInfoRequest {
    pub pubkey: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegisterMfaStartRequest {
    pub method: MfaMethod,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RegisterMfaStartResponse {
    /// Present for TOTP only.
    #[serde(default)]
    pub totp_secret: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegisterMfaFinishRequest {
    pub code: String,
    pub method: MfaMethod,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegisterMfaFinishResponse {
    pub recovery_codes: Vec<String>,
}
