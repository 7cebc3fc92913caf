use anyhow::{Context, Result};
use std::path::PathBuf;

const APP_DIR_NAME: &str = "defguard-client";

/// Application data root.
///
/// - macOS: ~/Library/Application Support/defguard-client
/// - Windows: %APPDATA%\defguard-client
/// - Linux: $XDG_DATA_HOME/defguard-client or ~/.local/share/defguard-client
///
/// Nothing is created here; callers create directories when they write.
pub fn app_data_dir() -> Result<PathBuf> {
    let base_dir = dirs::data_dir().context("Failed to get platform-specific data directory")?;
    Ok(base_dir.join(APP_DIR_NAME))
}

/// Config root (`config.toml` lives here).
pub fn app_config_dir() -> Result<PathBuf> {
    let base_dir = dirs::config_dir().context("Failed to get platform-specific config directory")?;
    Ok(base_dir.join(APP_DIR_NAME))
}

/// Session-scoped enrollment state.
pub fn sessions_dir(data_dir: &std::path::Path) -> PathBuf {
    data_dir.join("sessions")
}

/// Native backend state: instances and rendered tunnels.
pub fn backend_dir(data_dir: &std::path::Path) -> PathBuf {
    data_dir.join("backend")
}

pub fn logs_dir(data_dir: &std::path::Path) -> PathBuf {
    data_dir.join("logs")
}
