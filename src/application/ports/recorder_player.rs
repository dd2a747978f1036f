//! Recorder/player capability interface

use async_trait::async_trait;
use std::path::PathBuf;
use std::sync::Arc;

use super::native::Capabilities;
use crate::domain::config::{PlayerConfig, RecorderConfig};
use crate::domain::error::AudioError;
use crate::domain::progress::{MeteringInfo, PlaybackProgress, RecordingProgress};
use crate::domain::recording_info::RecordingInfo;
use crate::domain::session::{PlayerState, RecorderState};
use crate::domain::source::AudioSource;

/// Receives recording progress
pub type RecordingListener = Arc<dyn Fn(&RecordingProgress) + Send + Sync>;

/// Receives playback progress
pub type PlaybackListener = Arc<dyn Fn(&PlaybackProgress) + Send + Sync>;

/// Receives normalized input levels
pub type MeteringListener = Arc<dyn Fn(&MeteringInfo) + Send + Sync>;

/// Kind of event a listener is registered for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ListenerKind {
    Recording,
    Playback,
    Metering,
}

/// Token returned when registering a listener; pass it back to unregister.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Subscription {
    id: u64,
    kind: ListenerKind,
}

impl Subscription {
    pub(crate) const fn new(id: u64, kind: ListenerKind) -> Self {
        Self { id, kind }
    }

    pub const fn id(&self) -> u64 {
        self.id
    }

    pub const fn kind(&self) -> ListenerKind {
        self.kind
    }
}

/// Uniform recording and playback control surface.
///
/// Control operations are serial: callers issue them from a single logical
/// sequence. Every failure is returned as an `AudioError`; listener callbacks
/// never run on a sampling task.
#[async_trait]
pub trait AudioRecorderPlayer: Send + Sync {
    /// Start recording to `path`, or to a generated file in the recordings
    /// directory. Returns the output path.
    async fn start_recording(&self, path: Option<PathBuf>) -> Result<PathBuf, AudioError>;

    async fn pause_recording(&self) -> Result<(), AudioError>;

    async fn resume_recording(&self) -> Result<(), AudioError>;

    /// Stop from any state and return the final output path. The recorder is
    /// idle afterwards even when the native stop fails.
    async fn stop_recording(&self) -> Result<PathBuf, AudioError>;

    /// Play `source`, or the last recording when `None`.
    async fn start_playing(&self, source: Option<AudioSource>) -> Result<(), AudioError>;

    async fn pause_playing(&self) -> Result<(), AudioError>;

    async fn resume_playing(&self) -> Result<(), AudioError>;

    /// Stop from any state. The player is idle afterwards even when the
    /// native stop fails.
    async fn stop_playing(&self) -> Result<(), AudioError>;

    /// Seek the loaded source. Out-of-range positions clamp.
    async fn seek_to(&self, position_ms: i64) -> Result<(), AudioError>;

    /// Volume in `0.0..=1.0`
    async fn set_volume(&self, volume: f32) -> Result<(), AudioError>;

    /// Speed in `0.5..=2.0`
    async fn set_playback_speed(&self, speed: f32) -> Result<(), AudioError>;

    /// Snapshot of the last recording, `None` if nothing was recorded.
    async fn get_recording_info(&self) -> Result<Option<RecordingInfo>, AudioError>;

    /// Snapshot of any media file.
    async fn describe_recording(&self, path: PathBuf) -> Result<RecordingInfo, AudioError>;

    fn add_recording_listener(&self, listener: RecordingListener) -> Subscription;

    fn add_playback_listener(&self, listener: PlaybackListener) -> Subscription;

    fn add_metering_listener(&self, listener: MeteringListener) -> Subscription;

    /// Unregister one listener. Returns false if it was not registered.
    fn remove_listener(&self, subscription: Subscription) -> bool;

    /// Unregister every listener and force-stop both sessions.
    async fn remove_listeners(&self);

    fn set_player_properties(&self, config: PlayerConfig);

    /// Applies to recordings started afterwards.
    fn set_recorder_properties(&self, config: RecorderConfig);

    fn recorder_state(&self) -> RecorderState;

    fn player_state(&self) -> PlayerState;

    fn capabilities(&self) -> Capabilities;

    fn platform_name(&self) -> &'static str;
}
