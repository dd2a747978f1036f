//! XDG config store adapter
//!
//! `$XDG_CONFIG_HOME/recplay/config.toml`. Values are checked on the way in
//! and out, so a hand-edited file with an unusable platform or channel count
//! is reported against its key instead of surfacing later as a native error.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::fs;
use tracing::debug;

use crate::application::ports::ConfigStore;
use crate::domain::config::AppConfig;
use crate::domain::error::ConfigError;
use crate::infrastructure::platform::PlatformKind;
use crate::infrastructure::storage::default_recordings_dir;

/// Directory name under the XDG config and data dirs
pub const APP_DIR: &str = "recplay";

const CONFIG_FILE: &str = "config.toml";

/// XDG-compliant config store
pub struct XdgConfigStore {
    path: PathBuf,
}

impl XdgConfigStore {
    pub fn new() -> Self {
        Self {
            path: config_home().join(APP_DIR).join(CONFIG_FILE),
        }
    }

    pub fn with_path(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    fn decode(&self, content: &str) -> Result<AppConfig, ConfigError> {
        let config: AppConfig = toml::from_str(content).map_err(|e| {
            ConfigError::ParseError(format!("{}: {}", self.path.display(), e))
        })?;
        validate(&config)?;
        Ok(config)
    }

    fn encode(config: &AppConfig) -> Result<String, ConfigError> {
        validate(config)?;
        toml::to_string_pretty(config).map_err(|e| ConfigError::WriteError(e.to_string()))
    }

    /// Sibling file the new content is written to before it replaces the config.
    fn staging_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_else(|| CONFIG_FILE.into());
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

impl Default for XdgConfigStore {
    fn default() -> Self {
        Self::new()
    }
}

/// `dirs::config_dir`, or `~/.config` resolved against the real home dir.
fn config_home() -> PathBuf {
    dirs::config_dir()
        .or_else(|| dirs::home_dir().map(|home| home.join(".config")))
        .unwrap_or_else(|| PathBuf::from(".config"))
}

/// Reject values no session could run with.
fn validate(config: &AppConfig) -> Result<(), ConfigError> {
    let invalid = |key: &str, message: String| ConfigError::ValidationError {
        key: key.to_string(),
        message,
    };

    if let Some(platform) = config.platform.as_deref() {
        platform
            .parse::<PlatformKind>()
            .map_err(|e| invalid("platform", e.to_string()))?;
    }
    if let Some(dir) = config.recordings_dir.as_deref() {
        if dir.trim().is_empty() {
            return Err(invalid("recordings_dir", "Value must not be empty".into()));
        }
    }
    if let Some(player) = &config.player {
        if player.update_interval_ms == Some(0) {
            return Err(invalid(
                "player.update_interval_ms",
                "Value must be greater than 0".into(),
            ));
        }
    }
    if let Some(recorder) = &config.recorder {
        if recorder.sample_rate == Some(0) {
            return Err(invalid(
                "recorder.sample_rate",
                "Value must be greater than 0".into(),
            ));
        }
        if let Some(channels) = recorder.channels {
            if !(1..=2).contains(&channels) {
                return Err(invalid(
                    "recorder.channels",
                    format!("Value must be 1 or 2, got {}", channels),
                ));
            }
        }
    }
    Ok(())
}

async fn ensure_parent(path: &Path) -> Result<(), ConfigError> {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => fs::create_dir_all(parent)
            .await
            .map_err(|e| ConfigError::WriteError(e.to_string())),
        _ => Ok(()),
    }
}

#[async_trait]
impl ConfigStore for XdgConfigStore {
    async fn load(&self) -> Result<AppConfig, ConfigError> {
        let content = match fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(AppConfig::empty()),
            Err(e) => return Err(ConfigError::ReadError(e.to_string())),
        };
        self.decode(&content)
    }

    async fn save(&self, config: &AppConfig) -> Result<(), ConfigError> {
        let content = Self::encode(config)?;
        ensure_parent(&self.path).await?;

        // Replace in one rename so a crash never leaves half a file.
        let staging = self.staging_path();
        fs::write(&staging, content)
            .await
            .map_err(|e| ConfigError::WriteError(e.to_string()))?;
        fs::rename(&staging, &self.path)
            .await
            .map_err(|e| ConfigError::WriteError(e.to_string()))?;

        debug!(path = %self.path.display(), "Config saved");
        Ok(())
    }

    fn path(&self) -> PathBuf {
        self.path.clone()
    }

    fn exists(&self) -> bool {
        self.path.is_file()
    }

    /// Write the defaults, with the recordings dir spelled out so users can
    /// see where takes land.
    async fn init(&self) -> Result<(), ConfigError> {
        if self.exists() {
            return Err(ConfigError::AlreadyExists(
                self.path.to_string_lossy().to_string(),
            ));
        }

        let defaults = AppConfig {
            recordings_dir: Some(default_recordings_dir().to_string_lossy().into_owned()),
            ..AppConfig::defaults()
        };
        self.save(&defaults).await
    }
}
