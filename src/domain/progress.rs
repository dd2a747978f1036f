//! Progress and metering events
//!
//! These are the payloads delivered to listeners. Metering values are
//! always normalized to `0.0..=1.0` before they leave an adapter.

use serde::Serialize;

use crate::domain::time::MediaTime;

/// Default decibel floor mapped to a level of 0.0
pub const DEFAULT_DB_FLOOR: f32 = -60.0;

/// Recording progress tick
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct RecordingProgress {
    /// Elapsed milliseconds, excluding paused intervals
    pub current_position: u64,
    pub formatted_time: String,
}

impl RecordingProgress {
    pub fn new(elapsed: MediaTime) -> Self {
        Self {
            current_position: elapsed.as_millis(),
            formatted_time: elapsed.to_string(),
        }
    }
}

/// Playback progress tick
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct PlaybackProgress {
    pub current_position: u64,
    pub duration: u64,
    pub formatted_current_time: String,
    pub formatted_duration: String,
}

impl PlaybackProgress {
    /// Position is clamped to duration when the duration is known.
    pub fn new(position: MediaTime, duration: MediaTime) -> Self {
        let position = if duration.is_zero() {
            position
        } else {
            position.min(duration)
        };
        Self {
            current_position: position.as_millis(),
            duration: duration.as_millis(),
            formatted_current_time: position.to_string(),
            formatted_duration: duration.to_string(),
        }
    }

    /// Completion ratio in `0.0..=1.0`; zero while the duration is unknown.
    pub fn ratio(&self) -> f32 {
        if self.duration == 0 {
            return 0.0;
        }
        (self.current_position as f64 / self.duration as f64).min(1.0) as f32
    }

    pub fn is_complete(&self) -> bool {
        self.duration > 0 && self.current_position >= self.duration
    }
}

/// Raw meter reading in the native unit of a platform
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RawMeter {
    pub peak: f32,
    pub average: f32,
}

/// Unit a native meter reports in.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MeteringScale {
    /// Already normalized linear amplitude
    Linear,
    /// Linear amplitude up to `full_scale` (e.g. 32767 for 16-bit peaks)
    Amplitude { full_scale: f32 },
    /// dBFS; `floor_db` maps to 0.0 and 0 dB to 1.0
    Decibels { floor_db: f32 },
}

impl MeteringScale {
    pub const fn decibels() -> Self {
        Self::Decibels {
            floor_db: DEFAULT_DB_FLOOR,
        }
    }

    /// Map a raw reading into `0.0..=1.0`, clamping out-of-range input.
    pub fn normalize(&self, raw: f32) -> f32 {
        if raw.is_nan() {
            return 0.0;
        }
        let level = match *self {
            Self::Linear => raw,
            Self::Amplitude { full_scale } if full_scale > 0.0 => raw / full_scale,
            Self::Amplitude { .. } => 0.0,
            Self::Decibels { floor_db } if floor_db < 0.0 => (raw - floor_db) / -floor_db,
            Self::Decibels { .. } => 0.0,
        };
        level.clamp(0.0, 1.0)
    }
}

/// Normalized input level
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct MeteringInfo {
    /// Level to display, equal to the average
    pub current_metering: f32,
    pub peak_power: f32,
    pub average_power: f32,
}

impl MeteringInfo {
    /// Level reported once metering stops
    pub const fn silent() -> Self {
        Self {
            current_metering: 0.0,
            peak_power: 0.0,
            average_power: 0.0,
        }
    }

    pub fn from_raw(raw: RawMeter, scale: MeteringScale) -> Self {
        let average = scale.normalize(raw.average);
        Self {
            current_metering: average,
            peak_power: scale.normalize(raw.peak),
            average_power: average,
        }
    }
}
