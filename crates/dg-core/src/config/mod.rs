//! # Pure Data Module - Data Transfer Objects Only
//!
//! Defines configuration data structures and the TOML → DTO mapping.
//!
//! This module contains data only: no policy, no validation, no default
//! value calculation. A zero or empty value is a fact; the bootstrap layer
//! decides what it means.

use std::path::PathBuf;

/// Application configuration DTO (pure data, no logic)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    /// Device name offered for new devices (may be empty)
    pub device_name: String,

    /// Directory for session and instance files (path only, not checked)
    pub data_dir: PathBuf,

    /// Provisioning file path (may not exist)
    pub provisioning_file: PathBuf,

    /// HTTP request timeout in seconds (0 = unset)
    pub http_timeout_secs: u64,

    /// OpenID poll interval in seconds (0 = unset)
    pub mfa_poll_interval_secs: u64,

    /// OpenID poll ceiling in seconds (0 = unset)
    pub mfa_poll_timeout_secs: u64,
}

impl AppConfig {
    /// Create AppConfig from TOML value
    ///
    /// **Prohibited**: This method must NOT contain any validation
    /// or default value logic. Empty strings are valid "facts".
    pub fn from_toml(toml_value: &toml::Value) -> anyhow::Result<Self> {
        let str_at = |section: &str, key: &str| {
            toml_value
                .get(section)
                .and_then(|s| s.get(key))
                .and_then(|v| v.as_str())
                .unwrap_or("")
                .to_string()
        };
        let secs_at = |section: &str, key: &str| {
            toml_value
                .get(section)
                .and_then(|s| s.get(key))
                .and_then(|v| v.as_integer())
                .and_then(|v| u64::try_from(v).ok())
                .unwrap_or(0)
        };

        Ok(Self {
            device_name: str_at("general", "device_name"),
            data_dir: PathBuf::from(str_at("paths", "data_dir")),
            provisioning_file: PathBuf::from(str_at("paths", "provisioning_file")),
            http_timeout_secs: secs_at("http", "timeout_secs"),
            mfa_poll_interval_secs: secs_at("mfa", "poll_interval_secs"),
            mfa_poll_timeout_secs: secs_at("mfa", "poll_timeout_secs"),
        })
    }

    /// Create empty AppConfig (all empty/default values)
    pub fn empty() -> Self {
        Self {
            device_name: String::new(),
            data_dir: PathBuf::new(),
            provisioning_file: PathBuf::new(),
            http_timeout_secs: 0,
            mfa_poll_interval_secs: 0,
            mfa_poll_timeout_secs: 0,
        }
    }

    /// Create AppConfig with system-default paths for production use
    ///
    /// The base directory is computed by the caller (e.g. with the `dirs` crate).
    pub fn with_system_defaults(data_dir: PathBuf) -> Self {
        Self {
            provisioning_file: data_dir.join("provisioning.json"),
            data_dir,
            ..Self::empty()
        }
    }
}
