//! Configuration value objects

mod app_config;
mod player;
mod recorder;

pub use app_config::{AppConfig, PlayerSection, DEFAULT_PLATFORM};
pub use player::{PlayerConfig, DEFAULT_UPDATE_INTERVAL_MS};
pub use recorder::{
    AudioEncoding, EncoderQuality, InputSource, InvalidSettingError, LinearPcmOptions,
    OutputFormat, RecorderConfig, RecorderProfile, RecorderSettings,
};
