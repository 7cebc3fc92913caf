use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{EnrollmentStep, SessionClock, StepContext, StepFlags, WizardState};
use crate::mfa::MfaMethod;
use crate::proxy::{AdminInfo, DeviceResponse, EnrollmentStartResponse, InstanceInfo, UserInfo};
use crate::proxy_url::ProxyUrl;
use crate::secret::SecretString;

/// Bumped whenever [`PersistedEnrollment`] changes shape; older data is discarded.
pub const SESSION_SCHEMA_VERSION: u32 = 2;

/// Device keypair generated for enrollment. The private half never leaves memory.
#[derive(Clone, PartialEq, Eq)]
pub struct DeviceKeys {
    pub public: String,
    pub private: SecretString,
}

impl std::fmt::Debug for DeviceKeys {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeviceKeys")
            .field("public", &self.public)
            .field("private", &self.private)
            .finish()
    }
}

/// In-memory enrollment session owned by the enrollment context.
///
/// 内存中的注册会话。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnrollmentSession {
    pub step: EnrollmentStep,
    pub proxy_url: ProxyUrl,
    /// `defguard_proxy=...`, sent as the `Cookie` header on every call.
    pub cookie: String,
    pub user_info: UserInfo,
    pub admin_info: AdminInfo,
    pub instance: InstanceInfo,
    pub flags: StepFlags,
    pub phone_number: Option<String>,
    pub user_password: Option<SecretString>,
    pub mfa_method: Option<MfaMethod>,
    pub totp_secret: Option<String>,
    pub recovery_codes: Option<Vec<String>>,
    pub mfa_registered: bool,
    pub device_keys: Option<DeviceKeys>,
    pub device_response: Option<DeviceResponse>,
    pub device_committed: bool,
    pub final_page_content: String,
    pub session_start: Option<DateTime<Utc>>,
    pub session_end: Option<DateTime<Utc>>,
}

impl EnrollmentSession {
    /// New session at the welcome step, built from an accepted start response.
    pub fn from_start(
        proxy_url: ProxyUrl,
        cookie: String,
        response: EnrollmentStartResponse,
        now: DateTime<Utc>,
    ) -> Self {
        let flags = StepFlags {
            vpn_optional: response.vpn_setup_optional,
            mfa_required: response.settings.mfa_required,
            mfa_skippable: response.settings.mfa_skippable,
        };
        Self {
            step: EnrollmentStep::Welcome,
            proxy_url,
            cookie,
            phone_number: response.user.phone_number.clone(),
            user_info: response.user,
            admin_info: response.admin,
            instance: response.instance,
            flags,
            user_password: None,
            mfa_method: None,
            totp_secret: None,
            recovery_codes: None,
            mfa_registered: false,
            device_keys: None,
            device_response: None,
            device_committed: false,
            final_page_content: response.final_page_content,
            session_start: Some(now),
            session_end: DateTime::from_timestamp(response.deadline_timestamp, 0),
        }
    }

    pub fn clock(&self) -> SessionClock {
        SessionClock::new(self.session_start, self.session_end)
    }

    pub fn context(&self) -> StepContext {
        StepContext {
            flags: self.flags,
            device_committed: self.device_committed,
            mfa_registered: self.mfa_registered,
            mfa_method: self.mfa_method,
        }
    }

    /// Wizard state matching the stored step.
    pub fn wizard_state(&self) -> WizardState {
        WizardState::at(self.step)
    }

    /// Hand out the recovery codes once.
    pub fn take_recovery_codes(&mut self) -> Option<Vec<String>> {
        self.recovery_codes.take()
    }

    pub fn to_persisted(&self) -> PersistedEnrollment {
        PersistedEnrollment {
            step: self.step,
            proxy_url: self.proxy_url.clone(),
            cookie: self.cookie.clone(),
            user_info: self.user_info.clone(),
            admin_info: self.admin_info.clone(),
            instance: self.instance.clone(),
            flags: self.flags,
            phone_number: self.phone_number.clone(),
            user_password: self.user_password.clone(),
            mfa_method: self.mfa_method,
            recovery_codes: self.recovery_codes.clone(),
            mfa_registered: self.mfa_registered,
            device_response: self.device_response.clone(),
            device_committed: self.device_committed,
            final_page_content: self.final_page_content.clone(),
            session_start: self.session_start,
            session_end: self.session_end,
        }
    }

    pub fn from_persisted(data: PersistedEnrollment) -> Self {
        Self {
            step: data.step,
            proxy_url: data.proxy_url,
            cookie: data.cookie,
            user_info: data.user_info,
            admin_info: data.admin_info,
            instance: data.instance,
            flags: data.flags,
            phone_number: data.phone_number,
            user_password: data.user_password,
            mfa_method: data.mfa_method,
            totp_secret: None,
            recovery_codes: data.recovery_codes,
            mfa_registered: data.mfa_registered,
            device_keys: None,
            device_response: data.device_response,
            device_committed: data.device_committed,
            final_page_content: data.final_page_content,
            session_start: data.session_start,
            session_end: data.session_end,
        }
    }
}

/// Allow-listed session fields written to session-scoped storage.
///
/// The password and unshown recovery codes are kept so a reload resumes at
/// the same step. The device private key and the TOTP secret are not.
///
/// 写入会话存储的白名单字段。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersistedEnrollment {
    pub step: EnrollmentStep,
    pub proxy_url: ProxyUrl,
    pub cookie: String,
    pub user_info: UserInfo,
    pub admin_info: AdminInfo,
    pub instance: InstanceInfo,
    pub flags: StepFlags,
    #[serde(default)]
    pub phone_number: Option<String>,
    #[serde(default)]
    pub user_password: Option<SecretString>,
    #[serde(default)]
    pub mfa_method: Option<MfaMethod>,
    #[serde(default)]
    pub recovery_codes: Option<Vec<String>>,
    #[serde(default)]
    pub mfa_registered: bool,
    #[serde(default)]
    pub device_response: Option<DeviceResponse>,
    #[serde(default)]
    pub device_committed: bool,
    #[serde(default)]
    pub final_page_content: String,
    pub session_start: Option<DateTime<Utc>>,
    pub session_end: Option<DateTime<Utc>>,
}

/// Versioned wrapper around persisted data.
///
/// 带版本号的持久化包装。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionEnvelope {
    pub version: u32,
    pub data: PersistedEnrollment,
}

impl SessionEnvelope {
    pub fn wrap(data: PersistedEnrollment) -> Self {
        Self {
            version: SESSION_SCHEMA_VERSION,
            data,
        }
    }
}
