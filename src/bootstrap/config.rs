//! # Configuration loader
//!
//! [`load_config`] is pure data loading: read the file, parse TOML, map it
//! to [`AppConfig`]. Empty and zero values survive loading untouched;
//! [`resolve`] is the one place that turns them into runtime defaults.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context;
use dg_app::MfaSettings;
use dg_core::AppConfig;
use dg_infra::fs::DEFAULT_PROVISIONING_FILE;
use dg_infra::DEFAULT_HTTP_TIMEOUT;

pub const CONFIG_FILE_NAME: &str = "config.toml";

/// Load configuration from a TOML file.
///
/// # Errors
///
/// Returns an error if the file cannot be read or is not valid TOML.
pub fn load_config(config_path: PathBuf) -> anyhow::Result<AppConfig> {
    let content = std::fs::read_to_string(&config_path)
        .with_context(|| format!("Failed to read config file: {}", config_path.display()))?;
    let toml_value: toml::Value =
        toml::from_str(&content).context("Failed to parse config as TOML")?;
    AppConfig::from_toml(&toml_value)
}

/// Configuration with every unset value replaced by its default.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedConfig {
    /// Configured device name, possibly empty (the hostname is used then).
    pub device_name: String,
    pub data_dir: PathBuf,
    pub provisioning_file: PathBuf,
    pub http_timeout: Duration,
    pub mfa: MfaSettings,
}

/// Fill the gaps of a loaded config. `default_data_dir` is used when the
/// file names no data directory.
pub fn resolve(config: AppConfig, default_data_dir: &Path) -> ResolvedConfig {
    let data_dir = if config.data_dir.as_os_str().is_empty() {
        default_data_dir.to_path_buf()
    } else {
        config.data_dir
    };
    let provisioning_file = if config.provisioning_file.as_os_str().is_empty() {
        data_dir.join(DEFAULT_PROVISIONING_FILE)
    } else {
        config.provisioning_file
    };
    let secs_or = |secs: u64, default: Duration| {
        if secs == 0 {
            default
        } else {
            Duration::from_secs(secs)
        }
    };
    let mfa_defaults = MfaSettings::default();

    ResolvedConfig {
        device_name: config.device_name.trim().to_string(),
        data_dir,
        provisioning_file,
        http_timeout: secs_or(config.http_timeout_secs, DEFAULT_HTTP_TIMEOUT),
        mfa: MfaSettings {
            poll_interval: secs_or(config.mfa_poll_interval_secs, mfa_defaults.poll_interval),
            poll_timeout: secs_or(config.mfa_poll_timeout_secs, mfa_defaults.poll_timeout),
        },
    }
}

/// Load the config the host should run with.
///
/// An explicitly given file must exist. Without one, `config.toml` in the
/// platform config directory is used when present, otherwise defaults.
pub fn load_for_host(explicit: Option<PathBuf>) -> anyhow::Result<ResolvedConfig> {
    let default_data_dir = dg_infra::fs::app_data_dir::app_data_dir()?;
    let config = match explicit {
        Some(path) => load_config(path)?,
        None => {
            let path = dg_infra::fs::app_data_dir::app_config_dir()?.join(CONFIG_FILE_NAME);
            if path.exists() {
                load_config(path)?
            } else {
                AppConfig::with_system_defaults(default_data_dir.clone())
            }
        }
    };
    Ok(resolve(config, &default_data_dir))
}
