//! Player settings value object

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Default progress update interval
pub const DEFAULT_UPDATE_INTERVAL_MS: u64 = 25;

/// Sampling and metering settings used by the progress samplers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayerConfig {
    /// Progress update interval in milliseconds
    pub update_interval_ms: u64,
    /// Emit metering events while recording
    pub metering_enabled: bool,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            update_interval_ms: DEFAULT_UPDATE_INTERVAL_MS,
            metering_enabled: false,
        }
    }
}

impl PlayerConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_update_interval_ms(mut self, ms: u64) -> Self {
        self.update_interval_ms = ms;
        self
    }

    pub fn with_metering(mut self, enabled: bool) -> Self {
        self.metering_enabled = enabled;
        self
    }

    /// Tick interval; a zero setting is treated as one millisecond.
    pub fn update_interval(&self) -> Duration {
        Duration::from_millis(self.update_interval_ms.max(1))
    }
}
