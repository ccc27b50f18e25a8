//! Configuration types for listwatch.
//!
//! Loaded from `config.toml`. Every field has a default, so a missing file or
//! an empty one produces a working (if tokenless) configuration.

use crate::watch::PollPolicy;
use listwatch_fetch::FetchConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Environment variable consulted when `discord.bot_token` is empty.
pub const BOT_TOKEN_ENV: &str = "LISTWATCH_BOT_TOKEN";

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WatchConfig {
    /// Polling cadence and state location.
    pub watch: PollingConfig,
    /// Page download and item extraction.
    pub fetch: FetchConfig,
    /// Discord front-end.
    pub discord: DiscordConfig,
}

/// Polling loop settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PollingConfig {
    /// Seconds between two polls of the same page.
    pub interval_secs: u64,
    /// Upper bound on a single page fetch, in seconds.
    pub fetch_timeout_secs: u64,
    /// Persisted watch state. Defaults to `<config_dir>/tasks.json`.
    pub state_file: Option<PathBuf>,
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            interval_secs: 60,
            fetch_timeout_secs: 5,
            state_file: None,
        }
    }
}

impl PollingConfig {
    /// Timing policy handed to every polling task.
    pub fn policy(&self) -> PollPolicy {
        PollPolicy {
            interval: Duration::from_secs(self.interval_secs),
            fetch_timeout: Duration::from_secs(self.fetch_timeout_secs),
        }
    }

    /// Resolved location of the persisted watch state.
    pub fn state_path(&self) -> PathBuf {
        self.state_file
            .clone()
            .unwrap_or_else(crate::app_dirs::tasks_file)
    }
}

/// Discord bot settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DiscordConfig {
    /// Bot token. Falls back to [`BOT_TOKEN_ENV`] when empty.
    pub bot_token: String,
    /// Prefix that marks a message as a command (`>start`, `>stop`).
    pub command_prefix: String,
    /// User ids allowed to issue commands. `*` allows everyone; empty denies all.
    pub allowed_user_ids: Vec<String>,
    /// Channel ids the bot listens in. Empty allows all channels.
    pub allowed_channel_ids: Vec<String>,
    /// REST API root.
    pub api_base: String,
}

impl Default for DiscordConfig {
    fn default() -> Self {
        Self {
            bot_token: String::new(),
            command_prefix: ">".to_owned(),
            allowed_user_ids: vec!["*".to_owned()],
            allowed_channel_ids: Vec::new(),
            api_base: "https://discord.com/api/v10".to_owned(),
        }
    }
}

impl DiscordConfig {
    /// Token from config, or from the environment when the config leaves it blank.
    pub fn resolved_token(&self) -> Option<String> {
        let configured = self.bot_token.trim();
        if !configured.is_empty() {
            return Some(configured.to_owned());
        }
        std::env::var(BOT_TOKEN_ENV)
            .ok()
            .map(|t| t.trim().to_owned())
            .filter(|t| !t.is_empty())
    }
}

impl WatchConfig {
    /// Load configuration from a TOML file, falling back to defaults for missing fields.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: &Path) -> crate::error::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content).map_err(|e| crate::error::WatchError::Config(e.to_string()))
    }

    /// Load `path` if given, else the default config file if it exists, else defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if an existing file cannot be read or parsed.
    pub fn load(path: Option<&Path>) -> crate::error::Result<Self> {
        if let Some(path) = path {
            return Self::from_file(path);
        }
        let default_path = crate::app_dirs::config_file();
        if default_path.exists() {
            Self::from_file(&default_path)
        } else {
            Ok(Self::default())
        }
    }

    /// Save configuration to a TOML file, creating parent directories as needed.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written or the config cannot be serialized.
    pub fn save_to_file(&self, path: &Path) -> crate::error::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)
            .map_err(|e| crate::error::WatchError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Reject settings that would make polling spin or never match anything.
    ///
    /// # Errors
    ///
    /// Returns [`WatchError::Config`](crate::error::WatchError::Config) naming the bad field.
    pub fn validate(&self) -> crate::error::Result<()> {
        if self.watch.interval_secs == 0 {
            return Err(crate::error::WatchError::Config(
                "watch.interval_secs must be greater than 0".into(),
            ));
        }
        if self.watch.fetch_timeout_secs == 0 {
            return Err(crate::error::WatchError::Config(
                "watch.fetch_timeout_secs must be greater than 0".into(),
            ));
        }
        if self.discord.command_prefix.trim().is_empty() {
            return Err(crate::error::WatchError::Config(
                "discord.command_prefix must not be empty".into(),
            ));
        }
        self.fetch
            .validate()
            .map_err(|e| crate::error::WatchError::Config(format!("fetch: {e}")))
    }
}
