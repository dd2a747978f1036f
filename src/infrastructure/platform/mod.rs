//! Platform backends and adapter factory
//!
//! The adapter is chosen once, at composition time, from a `PlatformKind`.

pub mod desktop;
pub mod simulated;
pub mod unsupported;

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;

use tokio::runtime::Handle;
use tracing::debug;

use crate::application::adapter::PlatformAdapter;
use crate::application::ports::AudioRecorderPlayer;

pub use desktop::DesktopBackend;
pub use simulated::{SimulatedBackend, SimulatedOp, SimulatedProfile};
pub use unsupported::UnsupportedBackend;

/// Target platform families
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PlatformKind {
    /// cpal capture and rodio playback on the host
    #[default]
    Desktop,
    /// Simulated mobile family with an amplitude meter
    SimulatedAmplitude,
    /// Simulated mobile family with a decibel meter
    SimulatedDecibel,
    /// Embedded target without a media binding
    Embedded,
    /// Web target without a media binding
    Web,
}

impl PlatformKind {
    pub const ALL: &'static [Self] = &[
        Self::Desktop,
        Self::SimulatedAmplitude,
        Self::SimulatedDecibel,
        Self::Embedded,
        Self::Web,
    ];

    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Desktop => "desktop",
            Self::SimulatedAmplitude => "simulated-amplitude",
            Self::SimulatedDecibel => "simulated-decibel",
            Self::Embedded => "embedded",
            Self::Web => "web",
        }
    }
}

impl fmt::Display for PlatformKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error type for parsing a platform name
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsePlatformError {
    pub value: String,
}

impl fmt::Display for ParsePlatformError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let valid: Vec<&str> = PlatformKind::ALL.iter().map(PlatformKind::as_str).collect();
        write!(
            f,
            "invalid platform '{}'. Valid options: {}",
            self.value,
            valid.join(", ")
        )
    }
}

impl std::error::Error for ParsePlatformError {}

impl FromStr for PlatformKind {
    type Err = ParsePlatformError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_lowercase();
        Self::ALL
            .iter()
            .copied()
            .find(|kind| kind.as_str() == wanted)
            .ok_or_else(|| ParsePlatformError {
                value: s.to_string(),
            })
    }
}

/// Build the recorder/player for `kind`.
///
/// Samplers and listener delivery run on `runtime`. Recordings without an
/// explicit path land in `recordings_dir`.
pub fn create_recorder_player(
    kind: PlatformKind,
    recordings_dir: PathBuf,
    runtime: Handle,
) -> Arc<dyn AudioRecorderPlayer> {
    debug!(platform = %kind, dir = %recordings_dir.display(), "Creating recorder/player");
    match kind {
        PlatformKind::Desktop => Arc::new(PlatformAdapter::new(
            DesktopBackend::new(runtime.clone(), recordings_dir),
            runtime,
        )),
        PlatformKind::SimulatedAmplitude => Arc::new(PlatformAdapter::new(
            SimulatedBackend::new(SimulatedProfile::AmplitudeMeter, recordings_dir),
            runtime,
        )),
        PlatformKind::SimulatedDecibel => Arc::new(PlatformAdapter::new(
            SimulatedBackend::new(SimulatedProfile::DecibelMeter, recordings_dir),
            runtime,
        )),
        PlatformKind::Embedded => Arc::new(PlatformAdapter::new(
            UnsupportedBackend::new("embedded", recordings_dir),
            runtime,
        )),
        PlatformKind::Web => Arc::new(PlatformAdapter::new(
            UnsupportedBackend::new("web", recordings_dir),
            runtime,
        )),
    }
}
