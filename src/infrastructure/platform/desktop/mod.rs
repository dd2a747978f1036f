//! Desktop backend
//!
//! Captures from the default input device with cpal, writes WAV (hound) or
//! FLAC (flacenc), and plays local or downloaded media through rodio.

mod flac;
mod player;
mod recorder;
mod remote;

use std::path::{Path, PathBuf};

use tokio::runtime::Handle;

pub use flac::{encode_to_flac, EncodingError};
pub use player::{read_file_duration, DesktopPlayer};
pub use recorder::DesktopRecorder;
pub use remote::fetch_remote;

use crate::application::ports::{
    Capabilities, NativeBackend, NativeError, NativePlayer, NativeRecorder,
};
use crate::domain::config::{AudioEncoding, RecorderProfile};
use crate::domain::progress::MeteringScale;
use crate::domain::time::MediaTime;

const DESKTOP_ENCODINGS: &[AudioEncoding] = &[AudioEncoding::Lpcm, AudioEncoding::Flac];

/// Native backend for desktop operating systems
pub struct DesktopBackend {
    runtime: Handle,
    recordings_dir: PathBuf,
    client: reqwest::Client,
}

impl DesktopBackend {
    /// `runtime` runs remote downloads for players.
    pub fn new(runtime: Handle, recordings_dir: PathBuf) -> Self {
        Self {
            runtime,
            recordings_dir,
            client: reqwest::Client::new(),
        }
    }
}

impl NativeBackend for DesktopBackend {
    fn name(&self) -> &'static str {
        "desktop"
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities {
            recording: true,
            playback: true,
            pause_recording: true,
            playback_speed: true,
            remote_sources: true,
            concurrent_record_and_play: true,
            metering: Some(MeteringScale::decibels()),
            recorder: RecorderProfile {
                default_sample_rate: 44_100,
                default_channels: 1,
                default_encoding: AudioEncoding::Lpcm,
                encodings: DESKTOP_ENCODINGS,
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
        Ok(Box::new(DesktopRecorder::new()))
    }

    fn create_player(&self) -> Result<Box<dyn NativePlayer>, NativeError> {
        Ok(Box::new(DesktopPlayer::new(
            self.runtime.clone(),
            self.client.clone(),
        )))
    }

    fn read_duration(&self, path: &Path) -> Result<MediaTime, NativeError> {
        read_file_duration(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::config::RecorderConfig;

    #[tokio::test]
    async fn flac_request_is_honored() {
        let backend = DesktopBackend::new(Handle::current(), PathBuf::from("/tmp"));
        let config = RecorderConfig {
            encoding: Some(AudioEncoding::Flac),
            ..Default::default()
        };
        let settings = config.resolve(&backend.capabilities().recorder);
        assert_eq!(settings.extension(), "flac");
    }

    #[tokio::test]
    async fn compressed_request_falls_back_to_wav() {
        let backend = DesktopBackend::new(Handle::current(), PathBuf::from("/tmp"));
        let config = RecorderConfig {
            encoding: Some(AudioEncoding::Opus),
            ..Default::default()
        };
        let settings = config.resolve(&backend.capabilities().recorder);
        assert_eq!(settings.encoding, AudioEncoding::Lpcm);
        assert_eq!(settings.extension(), "wav");
    }
}
