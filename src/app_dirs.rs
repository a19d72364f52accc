//! Application directory paths.
//!
//! Uses the [`dirs`] crate for platform-appropriate resolution.
//!
//! | Purpose | macOS | Linux |
//! |---------|-------|-------|
//! | Config | `~/Library/Application Support/wakectl/` | `~/.config/wakectl/` |
//! | Logs | `~/Library/Application Support/wakectl/logs/` | `~/.local/share/wakectl/logs/` |
//!
//! # Environment Overrides
//!
//! - `WAKECTL_CONFIG_DIR` overrides [`config_dir`]
//! - `WAKECTL_DATA_DIR` overrides [`data_dir`]

use std::path::PathBuf;

const APP_DIR: &str = "wakectl";

/// Application config directory.
#[must_use]
pub fn config_dir() -> PathBuf {
    if let Some(override_dir) = std::env::var_os("WAKECTL_CONFIG_DIR") {
        return PathBuf::from(override_dir);
    }
    dirs::config_dir()
        .map(|d| d.join(APP_DIR))
        .unwrap_or_else(|| PathBuf::from("/tmp/wakectl-config"))
}

/// Application data directory.
#[must_use]
pub fn data_dir() -> PathBuf {
    if let Some(override_dir) = std::env::var_os("WAKECTL_DATA_DIR") {
        return PathBuf::from(override_dir);
    }
    dirs::data_dir()
        .map(|d| d.join(APP_DIR))
        .unwrap_or_else(|| PathBuf::from("/tmp/wakectl-data"))
}

/// Directory for rolling log files.
#[must_use]
pub fn logs_dir() -> PathBuf {
    data_dir().join("logs")
}
