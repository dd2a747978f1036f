//! Domain layer - Core business logic
//!
//! Contains value objects, session state machines, and domain errors.
//! This layer has no dependencies on external systems.

pub mod config;
pub mod error;
pub mod progress;
pub mod recording_info;
pub mod session;
pub mod source;
pub mod time;

// Re-export common types
pub use config::{AppConfig, PlayerConfig, RecorderConfig, RecorderSettings};
pub use error::*;
pub use progress::{MeteringInfo, MeteringScale, PlaybackProgress, RawMeter, RecordingProgress};
pub use recording_info::{format_file_size, RecordingInfo};
pub use session::{
    InvalidStateTransition, PlaybackSession, PlayerState, RecorderState, RecordingSession,
};
pub use source::AudioSource;
pub use time::{format_time, MediaTime};
