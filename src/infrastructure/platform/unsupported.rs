//! Backend for targets without a media SDK binding

use std::path::{Path, PathBuf};

use crate::application::ports::{
    Capabilities, NativeBackend, NativeError, NativePlayer, NativeRecorder,
};
use crate::domain::config::{AudioEncoding, RecorderProfile};
use crate::domain::time::MediaTime;

/// Every capability is off; every handle request fails with `Unsupported`.
pub struct UnsupportedBackend {
    target: &'static str,
    recordings_dir: PathBuf,
}

impl UnsupportedBackend {
    pub fn new(target: &'static str, recordings_dir: PathBuf) -> Self {
        Self {
            target,
            recordings_dir,
        }
    }

    fn refuse(&self, what: &str) -> NativeError {
        NativeError::Unsupported(format!("{} is not available on {}", what, self.target))
    }
}

impl NativeBackend for UnsupportedBackend {
    fn name(&self) -> &'static str {
        self.target
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities {
            recording: false,
            playback: false,
            pause_recording: false,
            playback_speed: false,
            remote_sources: false,
            concurrent_record_and_play: false,
            metering: None,
            recorder: RecorderProfile {
                default_sample_rate: 44_100,
                default_channels: 1,
                default_encoding: AudioEncoding::Lpcm,
                encodings: &[AudioEncoding::Lpcm],
                honors_linear_pcm: false,
                honors_input_source: false,
                honors_output_format: false,
            },
        }
    }

    fn recordings_dir(&self) -> PathBuf {
        self.recordings_dir.clone()
    }

    fn create_recorder(&self) -> Result<Box<dyn NativeRecorder>, NativeError> {
        Err(self.refuse("Audio recording"))
    }

    fn create_player(&self) -> Result<Box<dyn NativePlayer>, NativeError> {
        Err(self.refuse("Audio playback"))
    }

    fn read_duration(&self, _path: &Path) -> Result<MediaTime, NativeError> {
        Err(self.refuse("Media probing"))
    }
}
