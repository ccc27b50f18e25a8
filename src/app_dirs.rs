//! Centralized application directory paths.
//!
//! Uses the [`dirs`] crate for platform-appropriate directory resolution.
//!
//! | Purpose | macOS | Linux |
//! |---------|-------|-------|
//! | Data | `~/Library/Application Support/listwatch/` | `~/.local/share/listwatch/` |
//! | Config | `~/Library/Application Support/listwatch/` | `~/.config/listwatch/` |
//!
//! # Environment Overrides
//!
//! - `LISTWATCH_DATA_DIR` overrides [`data_dir`]
//! - `LISTWATCH_CONFIG_DIR` overrides [`config_dir`]

use std::path::PathBuf;

/// Application data root directory. Holds logs.
#[must_use]
pub fn data_dir() -> PathBuf {
    if let Some(override_dir) = std::env::var_os("LISTWATCH_DATA_DIR") {
        return PathBuf::from(override_dir);
    }
    dirs::data_dir()
        .map(|d| d.join("listwatch"))
        .unwrap_or_else(|| PathBuf::from("/tmp/listwatch-data"))
}

/// Application config directory.
///
/// Used for `config.toml` and the persisted watch state `tasks.json`.
#[must_use]
pub fn config_dir() -> PathBuf {
    if let Some(override_dir) = std::env::var_os("LISTWATCH_CONFIG_DIR") {
        return PathBuf::from(override_dir);
    }
    dirs::config_dir()
        .map(|d| d.join("listwatch"))
        .unwrap_or_else(|| PathBuf::from("/tmp/listwatch-config"))
}

/// Log file directory (`data_dir()/logs/`).
#[must_use]
pub fn logs_dir() -> PathBuf {
    data_dir().join("logs")
}

/// Main config file path (`config_dir()/config.toml`).
#[must_use]
pub fn config_file() -> PathBuf {
    config_dir().join("config.toml")
}

/// Persisted watch state (`config_dir()/tasks.json`).
#[must_use]
pub fn tasks_file() -> PathBuf {
    config_dir().join("tasks.json")
}
