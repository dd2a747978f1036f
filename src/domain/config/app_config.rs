//! Application configuration value object

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use super::player::{PlayerConfig, DEFAULT_UPDATE_INTERVAL_MS};
use super::recorder::RecorderConfig;

/// Platform used when none is configured
pub const DEFAULT_PLATFORM: &str = "desktop";

/// `[player]` section of the config file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerSection {
    pub update_interval_ms: Option<u64>,
    pub metering_enabled: Option<bool>,
}

/// Application configuration.
/// All fields are optional to support partial configs and merging.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    pub platform: Option<String>,
    pub recordings_dir: Option<String>,
    pub player: Option<PlayerSection>,
    pub recorder: Option<RecorderConfig>,
}

impl AppConfig {
    /// Create config with default values
    pub fn defaults() -> Self {
        Self {
            platform: Some(DEFAULT_PLATFORM.to_string()),
            recordings_dir: None,
            player: Some(PlayerSection {
                update_interval_ms: Some(DEFAULT_UPDATE_INTERVAL_MS),
                metering_enabled: Some(false),
            }),
            recorder: None,
        }
    }

    /// Create an empty config (all None)
    pub fn empty() -> Self {
        Self::default()
    }

    /// Merge this config with another, where other takes precedence.
    /// Only non-None values from other will override this.
    pub fn merge(self, other: Self) -> Self {
        Self {
            platform: other.platform.or(self.platform),
            recordings_dir: other.recordings_dir.or(self.recordings_dir),
            player: match (self.player, other.player) {
                (Some(b), Some(o)) => Some(PlayerSection {
                    update_interval_ms: o.update_interval_ms.or(b.update_interval_ms),
                    metering_enabled: o.metering_enabled.or(b.metering_enabled),
                }),
                (b, o) => o.or(b),
            },
            recorder: match (self.recorder, other.recorder) {
                (Some(b), Some(o)) => Some(b.merge(o)),
                (b, o) => o.or(b),
            },
        }
    }

    /// Get platform name, or "desktop" if not set
    pub fn platform_or_default(&self) -> &str {
        self.platform.as_deref().unwrap_or(DEFAULT_PLATFORM)
    }

    /// Get recordings directory, or the given fallback if not set
    pub fn recordings_dir_or(&self, fallback: PathBuf) -> PathBuf {
        self.recordings_dir
            .as_ref()
            .filter(|dir| !dir.trim().is_empty())
            .map(PathBuf::from)
            .unwrap_or(fallback)
    }

    /// Player settings with defaults filled in
    pub fn player_config(&self) -> PlayerConfig {
        let section = self.player.clone().unwrap_or_default();
        let defaults = PlayerConfig::default();
        PlayerConfig {
            update_interval_ms: section
                .update_interval_ms
                .unwrap_or(defaults.update_interval_ms),
            metering_enabled: section.metering_enabled.unwrap_or(defaults.metering_enabled),
        }
    }

    /// Recorder settings; unset fields stay unset for the platform to fill
    pub fn recorder_config(&self) -> RecorderConfig {
        self.recorder.clone().unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::config::AudioEncoding;

    #[test]
    fn defaults_have_expected_values() {
        let config = AppConfig::defaults();
        assert_eq!(config.platform_or_default(), "desktop");
        assert!(config.recordings_dir.is_none());
        assert_eq!(config.player_config(), PlayerConfig::default());
        assert_eq!(config.recorder_config(), RecorderConfig::default());
    }

    #[test]
    fn empty_has_all_none() {
        let config = AppConfig::empty();
        assert!(config.platform.is_none());
        assert!(config.player.is_none());
        assert!(config.recorder.is_none());
    }

    #[test]
    fn merge_other_takes_precedence() {
        let base = AppConfig {
            platform: Some("desktop".to_string()),
            recordings_dir: Some("/base".to_string()),
            ..Default::default()
        };
        let other = AppConfig {
            platform: Some("web".to_string()),
            recordings_dir: None,
            ..Default::default()
        };

        let merged = base.merge(other);
        assert_eq!(merged.platform_or_default(), "web");
        assert_eq!(merged.recordings_dir, Some("/base".to_string()));
    }

    #[test]
    fn merge_player_section_field_by_field() {
        let base = AppConfig::defaults();
        let other = AppConfig {
            player: Some(PlayerSection {
                metering_enabled: Some(true),
                ..Default::default()
            }),
            ..Default::default()
        };

        let player = base.merge(other).player_config();
        assert!(player.metering_enabled);
        assert_eq!(player.update_interval_ms, DEFAULT_UPDATE_INTERVAL_MS);
    }

    #[test]
    fn merge_recorder_section() {
        let base = AppConfig {
            recorder: Some(RecorderConfig {
                sample_rate: Some(48_000),
                ..Default::default()
            }),
            ..Default::default()
        };
        let other = AppConfig {
            recorder: Some(RecorderConfig {
                encoding: Some(AudioEncoding::Flac),
                ..Default::default()
            }),
            ..Default::default()
        };

        let recorder = base.merge(other).recorder_config();
        assert_eq!(recorder.sample_rate, Some(48_000));
        assert_eq!(recorder.encoding, Some(AudioEncoding::Flac));
    }

    #[test]
    fn recordings_dir_falls_back() {
        let config = AppConfig::empty();
        assert_eq!(config.recordings_dir_or(PathBuf::from("/fallback")), PathBuf::from("/fallback"));

        let config = AppConfig {
            recordings_dir: Some("/custom".to_string()),
            ..Default::default()
        };
        assert_eq!(config.recordings_dir_or(PathBuf::from("/fallback")), PathBuf::from("/custom"));
    }

    #[test]
    fn parses_full_file() {
        let config: AppConfig = toml::from_str(
            r#"
            platform = "simulated-decibel"

            [player]
            update_interval_ms = 50
            metering_enabled = true

            [recorder]
            sample_rate = 16000
            encoding = "lpcm"
            "#,
        )
        .unwrap();

        assert_eq!(config.platform_or_default(), "simulated-decibel");
        assert_eq!(config.player_config().update_interval_ms, 50);
        assert_eq!(config.recorder_config().sample_rate, Some(16_000));
    }
}
