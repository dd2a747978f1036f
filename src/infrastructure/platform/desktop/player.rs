//! Media playback using rodio
//!
//! `rodio::OutputStream` is not `Send`; it is opened on a small owner thread
//! that keeps it alive until the player is released, while the `Sink` is
//! driven from the handle directly.

use std::io::Cursor;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc;
use std::sync::Arc;
use std::thread::JoinHandle;

use rodio::{Decoder, OutputStream, OutputStreamHandle, Sink, Source};
use tokio::runtime::Handle;
use tracing::{debug, warn};

use super::remote::fetch_remote;
use crate::application::ports::{CompletionHandler, NativeError, NativePlayer};
use crate::domain::source::AudioSource;
use crate::domain::time::MediaTime;

type Media = Cursor<Arc<[u8]>>;

/// Keeps the output device open until dropped.
struct OutputOwner {
    handle: OutputStreamHandle,
    shutdown: Option<mpsc::Sender<()>>,
    thread: Option<JoinHandle<()>>,
}

impl OutputOwner {
    fn open() -> Result<Self, NativeError> {
        let (ready_tx, ready_rx) = mpsc::channel();
        let (shutdown_tx, shutdown_rx) = mpsc::channel::<()>();

        let thread = std::thread::Builder::new()
            .name("recplay-output".to_string())
            .spawn(move || match OutputStream::try_default() {
                Ok((stream, handle)) => {
                    let _ = ready_tx.send(Ok(handle));
                    // Returns once the sender side is dropped.
                    let _ = shutdown_rx.recv();
                    drop(stream);
                }
                Err(e) => {
                    let _ = ready_tx.send(Err(NativeError::Unavailable(format!(
                        "No audio output device available: {}",
                        e
                    ))));
                }
            })
            .map_err(|e| NativeError::Failed(format!("Cannot spawn output thread: {}", e)))?;

        let handle = ready_rx
            .recv()
            .map_err(|_| NativeError::Failed("Output thread exited early".to_string()))??;
        Ok(Self {
            handle,
            shutdown: Some(shutdown_tx),
            thread: Some(thread),
        })
    }
}

impl Drop for OutputOwner {
    fn drop(&mut self) {
        drop(self.shutdown.take());
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                warn!("Audio output thread panicked");
            }
        }
    }
}

/// Native player over the default output device
pub struct DesktopPlayer {
    runtime: Handle,
    client: reqwest::Client,
    output: Option<OutputOwner>,
    sink: Option<Sink>,
    media: Option<Arc<[u8]>>,
    duration: MediaTime,
    completion: Option<CompletionHandler>,
    /// End of media was already reported for the queued source
    ended: AtomicBool,
    released: bool,
}

impl DesktopPlayer {
    pub fn new(runtime: Handle, client: reqwest::Client) -> Self {
        Self {
            runtime,
            client,
            output: None,
            sink: None,
            media: None,
            duration: MediaTime::ZERO,
            completion: None,
            ended: AtomicBool::new(false),
            released: false,
        }
    }

    fn sink(&self) -> Result<&Sink, NativeError> {
        if self.released {
            return Err(NativeError::Released);
        }
        self.sink
            .as_ref()
            .ok_or_else(|| NativeError::Failed("Player was never prepared".to_string()))
    }

    fn load(&self, source: &AudioSource) -> Result<Vec<u8>, NativeError> {
        match source {
            AudioSource::File(path) => std::fs::read(path).map_err(|e| {
                NativeError::Unavailable(format!("Cannot open {}: {}", path.display(), e))
            }),
            AudioSource::Url { url, headers } => self
                .runtime
                .block_on(fetch_remote(&self.client, url, headers)),
        }
    }

    /// Queue the media again once the sink has drained it.
    fn rearm(&self) -> Result<(), NativeError> {
        let sink = self.sink()?;
        if !sink.empty() {
            return Ok(());
        }
        let media = self
            .media
            .clone()
            .ok_or_else(|| NativeError::Failed("Player was never prepared".to_string()))?;
        sink.append(decode(Cursor::new(media))?);
        self.ended.store(false, Ordering::SeqCst);
        Ok(())
    }
}

impl NativePlayer for DesktopPlayer {
    fn set_completion_handler(&mut self, handler: CompletionHandler) {
        self.completion = Some(handler);
    }

    fn prepare(&mut self, source: &AudioSource) -> Result<(), NativeError> {
        if self.released {
            return Err(NativeError::Released);
        }
        let media: Arc<[u8]> = self.load(source)?.into();
        let decoder = decode(Cursor::new(Arc::clone(&media)))?;
        self.duration = decoder
            .total_duration()
            .map(MediaTime::from)
            .or_else(|| wav_duration(&media))
            .unwrap_or_default();

        let output = OutputOwner::open()?;
        let sink = Sink::try_new(&output.handle)
            .map_err(|e| NativeError::Unavailable(format!("Cannot open audio sink: {}", e)))?;
        sink.pause();
        sink.append(decoder);

        debug!(%source, duration_ms = self.duration.as_millis(), "Media prepared");
        self.media = Some(media);
        self.sink = Some(sink);
        self.output = Some(output);
        self.ended.store(false, Ordering::SeqCst);
        Ok(())
    }

    fn play(&mut self) -> Result<(), NativeError> {
        self.rearm()?;
        self.sink()?.play();
        Ok(())
    }

    fn pause(&mut self) -> Result<(), NativeError> {
        self.sink()?.pause();
        Ok(())
    }

    fn stop(&mut self) -> Result<(), NativeError> {
        self.sink()?.stop();
        Ok(())
    }

    fn release(&mut self) {
        if self.released {
            return;
        }
        self.released = true;
        if let Some(sink) = self.sink.take() {
            sink.stop();
        }
        self.output = None;
        self.media = None;
        self.completion = None;
    }

    fn position(&self) -> Result<MediaTime, NativeError> {
        let sink = self.sink()?;
        if sink.empty() {
            if !self.ended.swap(true, Ordering::SeqCst) {
                if let Some(handler) = &self.completion {
                    handler();
                }
            }
            return Ok(self.duration);
        }

        let position = MediaTime::from(sink.get_pos());
        Ok(if self.duration.is_zero() {
            position
        } else {
            position.min(self.duration)
        })
    }

    fn duration(&self) -> Result<MediaTime, NativeError> {
        self.sink()?;
        Ok(self.duration)
    }

    fn seek(&mut self, position: MediaTime) -> Result<(), NativeError> {
        self.rearm()?;
        self.sink()?
            .try_seek(position.as_std())
            .map_err(|e| NativeError::Failed(format!("Seek failed: {}", e)))
    }

    fn set_volume(&mut self, volume: f32) -> Result<(), NativeError> {
        self.sink()?.set_volume(volume);
        Ok(())
    }

    fn set_rate(&mut self, rate: f32) -> Result<(), NativeError> {
        self.sink()?.set_speed(rate);
        Ok(())
    }
}

impl Drop for DesktopPlayer {
    fn drop(&mut self) {
        self.release();
    }
}

fn decode(media: Media) -> Result<Decoder<Media>, NativeError> {
    Decoder::new(media).map_err(|e| NativeError::Failed(format!("Cannot decode media: {}", e)))
}

fn wav_duration(media: &Arc<[u8]>) -> Option<MediaTime> {
    let reader = hound::WavReader::new(Cursor::new(Arc::clone(media))).ok()?;
    let rate = u64::from(reader.spec().sample_rate.max(1));
    Some(MediaTime::from_millis(u64::from(reader.duration()) * 1_000 / rate))
}

/// Length of a media file on disk
pub fn read_file_duration(path: &std::path::Path) -> Result<MediaTime, NativeError> {
    let bytes: Arc<[u8]> = std::fs::read(path)
        .map_err(|e| NativeError::Unavailable(format!("Cannot open {}: {}", path.display(), e)))?
        .into();
    if let Some(duration) = wav_duration(&bytes) {
        return Ok(duration);
    }
    let decoder = decode(Cursor::new(bytes))?;
    decoder
        .total_duration()
        .map(MediaTime::from)
        .ok_or_else(|| NativeError::Unsupported(format!("Unknown length: {}", path.display())))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tone_wav(millis: u32) -> Vec<u8> {
        let spec = hound::WavSpec {
            channels: 1,
            sample_rate: 8_000,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut bytes = Cursor::new(Vec::new());
        {
            let mut writer = hound::WavWriter::new(&mut bytes, spec).unwrap();
            for i in 0..(8 * millis) {
                writer.write_sample(((i % 40) as i16 - 20) * 500).unwrap();
            }
            writer.finalize().unwrap();
        }
        bytes.into_inner()
    }

    #[test]
    fn wav_header_gives_duration() {
        let media: Arc<[u8]> = tone_wav(1_250).into();
        assert_eq!(wav_duration(&media), Some(MediaTime::from_millis(1_250)));
    }

    #[test]
    fn reads_file_length() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tone.wav");
        std::fs::write(&path, tone_wav(500)).unwrap();
        assert_eq!(read_file_duration(&path).unwrap(), MediaTime::from_millis(500));
    }

    #[test]
    fn missing_file_is_unavailable() {
        let err = read_file_duration(std::path::Path::new("/nonexistent/x.wav")).unwrap_err();
        assert!(matches!(err, NativeError::Unavailable(_)));
    }

    #[test]
    fn unprepared_player_reports_failure() {
        let runtime = tokio::runtime::Runtime::new().unwrap();
        let player = DesktopPlayer::new(runtime.handle().clone(), reqwest::Client::new());
        assert!(player.position().is_err());
    }

    #[test]
    #[ignore = "Requires audio hardware"]
    fn plays_to_completion() {
        let runtime = tokio::runtime::Runtime::new().unwrap();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tone.wav");
        std::fs::write(&path, tone_wav(200)).unwrap();

        let fired = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&fired);
        let mut player = DesktopPlayer::new(runtime.handle().clone(), reqwest::Client::new());
        player.set_completion_handler(Arc::new(move || flag.store(true, Ordering::SeqCst)));
        player.prepare(&AudioSource::file(&path)).unwrap();
        player.play().unwrap();
        std::thread::sleep(std::time::Duration::from_millis(600));

        assert_eq!(player.position().unwrap(), MediaTime::from_millis(200));
        assert!(fired.load(Ordering::SeqCst));
    }
}
