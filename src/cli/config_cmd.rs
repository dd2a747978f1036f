//! Config command handler

use std::str::FromStr;

use crate::application::ports::ConfigStore;
use crate::domain::config::{
    AppConfig, AudioEncoding, EncoderQuality, InputSource, OutputFormat, PlayerSection,
    RecorderConfig,
};
use crate::domain::error::ConfigError;
use crate::infrastructure::PlatformKind;

use super::args::{is_valid_config_key, ConfigAction, VALID_CONFIG_KEYS};
use super::presenter::Presenter;

const NOT_SET: &str = "(not set)";

/// Handle config subcommand
pub async fn handle_config_command<S: ConfigStore>(
    action: ConfigAction,
    store: &S,
    presenter: &Presenter,
) -> Result<(), ConfigError> {
    match action {
        ConfigAction::Init => handle_init(store, presenter).await,
        ConfigAction::Set { key, value } => handle_set(store, presenter, &key, &value).await,
        ConfigAction::Get { key } => handle_get(store, presenter, &key).await,
        ConfigAction::List => handle_list(store, presenter).await,
        ConfigAction::Path => handle_path(store, presenter),
    }
}

async fn handle_init<S: ConfigStore>(store: &S, presenter: &Presenter) -> Result<(), ConfigError> {
    store.init().await?;
    presenter.success(&format!(
        "Config file created at: {}",
        store.path().display()
    ));
    Ok(())
}

async fn handle_set<S: ConfigStore>(
    store: &S,
    presenter: &Presenter,
    key: &str,
    value: &str,
) -> Result<(), ConfigError> {
    check_key(key)?;

    let mut config = store.load().await?;
    apply_value(&mut config, key, value)?;

    store.save(&config).await?;
    presenter.success(&format!("{} = {}", key, value));

    Ok(())
}

async fn handle_get<S: ConfigStore>(
    store: &S,
    presenter: &Presenter,
    key: &str,
) -> Result<(), ConfigError> {
    check_key(key)?;

    let config = store.load().await?;
    match read_value(&config, key) {
        Some(v) => presenter.output(&v),
        None => presenter.output(NOT_SET),
    }

    Ok(())
}

async fn handle_list<S: ConfigStore>(store: &S, presenter: &Presenter) -> Result<(), ConfigError> {
    let config = store.load().await?;

    for key in VALID_CONFIG_KEYS {
        presenter.key_value(
            key,
            read_value(&config, key).as_deref().unwrap_or(NOT_SET),
        );
    }

    Ok(())
}

fn handle_path<S: ConfigStore>(store: &S, presenter: &Presenter) -> Result<(), ConfigError> {
    presenter.output(&store.path().to_string_lossy());
    Ok(())
}

fn check_key(key: &str) -> Result<(), ConfigError> {
    if is_valid_config_key(key) {
        return Ok(());
    }
    Err(ConfigError::ValidationError {
        key: key.to_string(),
        message: format!("Unknown key. Valid keys: {}", VALID_CONFIG_KEYS.join(", ")),
    })
}

/// Validate `value` for `key` and store it in `config`
fn apply_value(config: &mut AppConfig, key: &str, value: &str) -> Result<(), ConfigError> {
    match key {
        "platform" => {
            let kind = parse_as::<PlatformKind>(key, value)?;
            config.platform = Some(kind.to_string());
        }
        "recordings_dir" => {
            if value.trim().is_empty() {
                return Err(invalid(key, "Value must not be empty"));
            }
            config.recordings_dir = Some(value.to_string());
        }
        "player.update_interval_ms" => {
            let ms = parse_as::<u64>(key, value)?;
            if ms == 0 {
                return Err(invalid(key, "Value must be greater than 0"));
            }
            player_section(config).update_interval_ms = Some(ms);
        }
        "player.metering_enabled" => {
            let enabled =
                parse_bool(value).map_err(|_| invalid(key, "Value must be 'true' or 'false'"))?;
            player_section(config).metering_enabled = Some(enabled);
        }
        "recorder.sample_rate" => {
            let rate = parse_as::<u32>(key, value)?;
            if rate == 0 {
                return Err(invalid(key, "Value must be greater than 0"));
            }
            recorder_section(config).sample_rate = Some(rate);
        }
        "recorder.channels" => {
            let channels = parse_as::<u16>(key, value)?;
            if !(1..=2).contains(&channels) {
                return Err(invalid(key, "Value must be 1 or 2"));
            }
            recorder_section(config).channels = Some(channels);
        }
        "recorder.bit_rate" => {
            let bit_rate = parse_as::<u32>(key, value)?;
            recorder_section(config).bit_rate = Some(bit_rate);
        }
        "recorder.encoding" => {
            recorder_section(config).encoding = Some(parse_as::<AudioEncoding>(key, value)?);
        }
        "recorder.quality" => {
            recorder_section(config).quality = Some(parse_as::<EncoderQuality>(key, value)?);
        }
        "recorder.input_source" => {
            recorder_section(config).input_source = Some(parse_as::<InputSource>(key, value)?);
        }
        "recorder.output_format" => {
            recorder_section(config).output_format = Some(parse_as::<OutputFormat>(key, value)?);
        }
        _ => unreachable!(), // Already validated
    }
    Ok(())
}

fn read_value(config: &AppConfig, key: &str) -> Option<String> {
    let player = config.player.as_ref();
    let recorder = config.recorder.as_ref();
    match key {
        "platform" => config.platform.clone(),
        "recordings_dir" => config.recordings_dir.clone(),
        "player.update_interval_ms" => player
            .and_then(|p| p.update_interval_ms)
            .map(|ms| ms.to_string()),
        "player.metering_enabled" => player
            .and_then(|p| p.metering_enabled)
            .map(|b| b.to_string()),
        "recorder.sample_rate" => recorder.and_then(|r| r.sample_rate).map(|v| v.to_string()),
        "recorder.channels" => recorder.and_then(|r| r.channels).map(|v| v.to_string()),
        "recorder.bit_rate" => recorder.and_then(|r| r.bit_rate).map(|v| v.to_string()),
        "recorder.encoding" => recorder.and_then(|r| r.encoding).map(|v| v.to_string()),
        "recorder.quality" => recorder.and_then(|r| r.quality).map(|v| v.to_string()),
        "recorder.input_source" => recorder.and_then(|r| r.input_source).map(|v| v.to_string()),
        "recorder.output_format" => recorder
            .and_then(|r| r.output_format)
            .map(|v| v.to_string()),
        _ => None,
    }
}

fn player_section(config: &mut AppConfig) -> &mut PlayerSection {
    config.player.get_or_insert_with(PlayerSection::default)
}

fn recorder_section(config: &mut AppConfig) -> &mut RecorderConfig {
    config.recorder.get_or_insert_with(RecorderConfig::default)
}

fn parse_as<T>(key: &str, value: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    value.trim().parse::<T>().map_err(|e| invalid(key, &e.to_string()))
}

fn invalid(key: &str, message: &str) -> ConfigError {
    ConfigError::ValidationError {
        key: key.to_string(),
        message: message.to_string(),
    }
}

/// Parse a boolean value
fn parse_bool(value: &str) -> Result<bool, ()> {
    match value.to_lowercase().as_str() {
        "true" | "yes" | "1" => Ok(true),
        "false" | "no" | "0" => Ok(false),
        _ => Err(()),
    }
}
