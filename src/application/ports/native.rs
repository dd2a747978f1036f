//! Native media handle ports
//!
//! A backend stands in for one platform media SDK. It creates opaque
//! recorder and player handles which the platform adapter drives. Handle
//! methods are synchronous and may block; the adapter runs the slow ones
//! (create, prepare, start, stop) off the async workers.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use thiserror::Error;

use crate::domain::config::{RecorderProfile, RecorderSettings};
use crate::domain::error::AudioError;
use crate::domain::progress::{MeteringScale, RawMeter};
use crate::domain::source::AudioSource;
use crate::domain::time::MediaTime;

/// Errors raised by native handles
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NativeError {
    #[error("{0}")]
    PermissionDenied(String),

    /// Device busy, file missing, remote unreachable
    #[error("{0}")]
    Unavailable(String),

    #[error("{0}")]
    Unsupported(String),

    #[error("{0}")]
    Failed(String),

    #[error("Native handle already released")]
    Released,
}

impl From<NativeError> for AudioError {
    fn from(err: NativeError) -> Self {
        match err {
            NativeError::PermissionDenied(msg) => Self::PermissionDenied(msg),
            NativeError::Unavailable(msg) => Self::ResourceUnavailable(msg),
            NativeError::Unsupported(msg) => Self::Unsupported(msg),
            NativeError::Failed(msg) => Self::NativeFailure(msg),
            NativeError::Released => Self::NativeFailure(NativeError::Released.to_string()),
        }
    }
}

/// Invoked by a native player when it reaches end of media.
/// May be called from any thread.
pub type CompletionHandler = Arc<dyn Fn() + Send + Sync>;

/// What a backend can do
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Capabilities {
    pub recording: bool,
    pub playback: bool,
    pub pause_recording: bool,
    pub playback_speed: bool,
    pub remote_sources: bool,
    /// Recording and playback may both be active at once
    pub concurrent_record_and_play: bool,
    /// Unit of the recorder meter, `None` when the platform has no meter
    pub metering: Option<MeteringScale>,
    pub recorder: RecorderProfile,
}

/// Native recorder handle
pub trait NativeRecorder: Send {
    /// Configure output and settings. Called once, before `start`.
    fn prepare(&mut self, output: &Path, settings: &RecorderSettings) -> Result<(), NativeError>;

    fn start(&mut self) -> Result<(), NativeError>;

    fn pause(&mut self) -> Result<(), NativeError>;

    fn resume(&mut self) -> Result<(), NativeError>;

    /// Finish capture and write the output file.
    fn stop(&mut self) -> Result<(), NativeError>;

    /// Free native resources. Safe to call more than once.
    fn release(&mut self);

    /// Current input level in the backend's `MeteringScale`.
    /// `Ok(None)` when no reading is available yet.
    fn read_meter(&mut self) -> Result<Option<RawMeter>, NativeError>;
}

/// Native player handle
pub trait NativePlayer: Send {
    fn set_completion_handler(&mut self, handler: CompletionHandler);

    /// Load the source. Called once, before `play`.
    fn prepare(&mut self, source: &AudioSource) -> Result<(), NativeError>;

    fn play(&mut self) -> Result<(), NativeError>;

    fn pause(&mut self) -> Result<(), NativeError>;

    fn stop(&mut self) -> Result<(), NativeError>;

    /// Free native resources. Safe to call more than once.
    fn release(&mut self);

    fn position(&self) -> Result<MediaTime, NativeError>;

    /// Zero when the length is unknown
    fn duration(&self) -> Result<MediaTime, NativeError>;

    fn seek(&mut self, position: MediaTime) -> Result<(), NativeError>;

    fn set_volume(&mut self, volume: f32) -> Result<(), NativeError>;

    fn set_rate(&mut self, rate: f32) -> Result<(), NativeError>;
}

/// Factory of native handles for one platform
pub trait NativeBackend: Send + Sync + 'static {
    /// Short platform name used in messages and logs
    fn name(&self) -> &'static str;

    fn capabilities(&self) -> Capabilities;

    /// Application-private directory for recordings without an explicit path
    fn recordings_dir(&self) -> PathBuf;

    fn create_recorder(&self) -> Result<Box<dyn NativeRecorder>, NativeError>;

    fn create_player(&self) -> Result<Box<dyn NativePlayer>, NativeError>;

    /// Length of a media file
    fn read_duration(&self, path: &Path) -> Result<MediaTime, NativeError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::error::ErrorKind;

    #[test]
    fn native_errors_map_onto_taxonomy() {
        let cases = [
            (NativeError::PermissionDenied("mic".into()), ErrorKind::PermissionDenied),
            (NativeError::Unavailable("busy".into()), ErrorKind::ResourceUnavailable),
            (NativeError::Unsupported("rate".into()), ErrorKind::UnsupportedOperation),
            (NativeError::Failed("boom".into()), ErrorKind::NativeFailure),
            (NativeError::Released, ErrorKind::NativeFailure),
        ];
        for (native, kind) in cases {
            assert_eq!(AudioError::from(native).kind(), kind);
        }
    }

    #[test]
    fn native_message_passes_through() {
        let err = AudioError::from(NativeError::Failed("prepare() returned -38".into()));
        assert_eq!(err.to_string(), "Native failure: prepare() returned -38");
    }
}
