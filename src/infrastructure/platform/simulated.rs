//! Simulated mobile media engines
//!
//! A deterministic stand-in for the two mobile SDK families. Time is read
//! from the tokio clock, so a paused test runtime drives playback positions
//! and recording lengths exactly. Recordings are written as silent 8 kHz
//! mono RIFF/WAV payloads whatever the requested container, which keeps
//! them readable with `hound`.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::time::Instant;
use tracing::{debug, trace};

use crate::application::ports::{
    Capabilities, CompletionHandler, NativeBackend, NativeError, NativePlayer, NativeRecorder,
};
use crate::domain::config::{AudioEncoding, RecorderProfile, RecorderSettings};
use crate::domain::progress::{MeteringScale, RawMeter};
use crate::domain::source::AudioSource;
use crate::domain::time::MediaTime;

const SIMULATED_SAMPLE_RATE: u32 = 8_000;

/// Newest OS level the amplitude family reports by default
pub const DEFAULT_API_LEVEL: u32 = 34;

/// First OS level with recorder pause/resume
pub const PAUSE_RECORDING_API_LEVEL: u32 = 24;

/// First OS level with playback speed control
pub const PLAYBACK_SPEED_API_LEVEL: u32 = 23;

/// Which mobile family to imitate
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SimulatedProfile {
    /// Linear amplitude meter (0..=32767), OS-level gated features,
    /// record and play at the same time
    AmplitudeMeter,
    /// dBFS meter, linear PCM options, never records and plays at once
    DecibelMeter,
}

impl SimulatedProfile {
    pub const fn name(&self) -> &'static str {
        match self {
            Self::AmplitudeMeter => "simulated-amplitude",
            Self::DecibelMeter => "simulated-decibel",
        }
    }
}

const AMPLITUDE_ENCODINGS: &[AudioEncoding] =
    &[AudioEncoding::Aac, AudioEncoding::Amr, AudioEncoding::Opus];

const DECIBEL_ENCODINGS: &[AudioEncoding] = &[
    AudioEncoding::Aac,
    AudioEncoding::Lpcm,
    AudioEncoding::Alac,
    AudioEncoding::Flac,
    AudioEncoding::Opus,
    AudioEncoding::Ulaw,
    AudioEncoding::Alaw,
];

/// Native call that a test can make fail once
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SimulatedOp {
    PrepareRecorder,
    StartRecorder,
    PauseRecorder,
    ResumeRecorder,
    StopRecorder,
    ReadMeter,
    PreparePlayer,
    Play,
    PausePlayer,
    StopPlayer,
    Seek,
}

impl fmt::Display for SimulatedOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

#[derive(Default)]
struct Engine {
    input_level: Option<f32>,
    failures: HashSet<SimulatedOp>,
    permission_denied: bool,
    live_recorders: usize,
    live_players: usize,
    last_rate: Option<f32>,
    remote: HashMap<String, MediaTime>,
    /// Completion handler of the most recently prepared player
    end_of_media: Option<CompletionHandler>,
}

impl Engine {
    fn check(&mut self, op: SimulatedOp) -> Result<(), NativeError> {
        if self.failures.remove(&op) {
            debug!(%op, "Injected native failure");
            return Err(NativeError::Failed(format!("simulated {} failure", op)));
        }
        Ok(())
    }
}

type EngineRef = Arc<Mutex<Engine>>;

/// Native backend imitating one mobile SDK family
pub struct SimulatedBackend {
    profile: SimulatedProfile,
    api_level: u32,
    recordings_dir: PathBuf,
    engine: EngineRef,
}

impl SimulatedBackend {
    pub fn new(profile: SimulatedProfile, recordings_dir: PathBuf) -> Self {
        Self {
            profile,
            api_level: DEFAULT_API_LEVEL,
            recordings_dir,
            engine: Arc::default(),
        }
    }

    /// Pretend to run on an older OS. Only the amplitude family gates
    /// features by OS level.
    pub fn with_api_level(mut self, api_level: u32) -> Self {
        self.api_level = api_level;
        self
    }

    pub fn profile(&self) -> SimulatedProfile {
        self.profile
    }

    /// Input level in the profile's native unit (amplitude or dBFS)
    pub fn set_input_level(&self, level: f32) {
        self.engine.lock().input_level = Some(level);
    }

    /// Make the next `op` fail with a native failure.
    pub fn fail_next(&self, op: SimulatedOp) {
        self.engine.lock().failures.insert(op);
    }

    /// Refuse microphone access from now on.
    pub fn deny_permission(&self) {
        self.engine.lock().permission_denied = true;
    }

    /// Fire the native end-of-media callback of the current player.
    /// Returns false when no player is prepared.
    pub fn trigger_end_of_media(&self) -> bool {
        let handler = self.engine.lock().end_of_media.clone();
        match handler {
            Some(handler) => {
                handler();
                true
            }
            None => false,
        }
    }

    /// Recorder handles created and not yet released
    pub fn live_recorders(&self) -> usize {
        self.engine.lock().live_recorders
    }

    /// Player handles created and not yet released
    pub fn live_players(&self) -> usize {
        self.engine.lock().live_players
    }

    /// Rate last applied to any player
    pub fn last_rate(&self) -> Option<f32> {
        self.engine.lock().last_rate
    }

    /// Make `url` playable with the given length.
    pub fn register_remote(&self, url: impl Into<String>, duration: MediaTime) {
        self.engine.lock().remote.insert(url.into(), duration);
    }
}

impl NativeBackend for SimulatedBackend {
    fn name(&self) -> &'static str {
        self.profile.name()
    }

    fn capabilities(&self) -> Capabilities {
        match self.profile {
            SimulatedProfile::AmplitudeMeter => Capabilities {
                recording: true,
                playback: true,
                pause_recording: self.api_level >= PAUSE_RECORDING_API_LEVEL,
                playback_speed: self.api_level >= PLAYBACK_SPEED_API_LEVEL,
                remote_sources: true,
                concurrent_record_and_play: true,
                metering: Some(MeteringScale::Amplitude {
                    full_scale: f32::from(i16::MAX),
                }),
                recorder: RecorderProfile {
                    default_sample_rate: 44_100,
                    default_channels: 1,
                    default_encoding: AudioEncoding::Aac,
                    encodings: AMPLITUDE_ENCODINGS,
                    honors_linear_pcm: false,
                    honors_input_source: true,
                    honors_output_format: true,
                },
            },
            SimulatedProfile::DecibelMeter => Capabilities {
                recording: true,
                playback: true,
                pause_recording: true,
                playback_speed: true,
                remote_sources: true,
                concurrent_record_and_play: false,
                metering: Some(MeteringScale::decibels()),
                recorder: RecorderProfile {
                    default_sample_rate: 44_100,
                    default_channels: 2,
                    default_encoding: AudioEncoding::Aac,
                    encodings: DECIBEL_ENCODINGS,
                    honors_linear_pcm: true,
                    honors_input_source: false,
                    honors_output_format: false,
                },
            },
        }
    }

    fn recordings_dir(&self) -> PathBuf {
        self.recordings_dir.clone()
    }

    fn create_recorder(&self) -> Result<Box<dyn NativeRecorder>, NativeError> {
        self.engine.lock().live_recorders += 1;
        Ok(Box::new(SimulatedRecorder {
            engine: Arc::clone(&self.engine),
            output: None,
            clock: StopClock::default(),
            released: false,
        }))
    }

    fn create_player(&self) -> Result<Box<dyn NativePlayer>, NativeError> {
        self.engine.lock().live_players += 1;
        Ok(Box::new(SimulatedPlayer {
            engine: Arc::clone(&self.engine),
            duration: None,
            clock: StopClock::default(),
            rate: 1.0,
            completion: None,
            released: false,
        }))
    }

    fn read_duration(&self, path: &Path) -> Result<MediaTime, NativeError> {
        wav_duration(path)
    }
}

/// Accumulates running time across start/stop cycles.
#[derive(Default)]
struct StopClock {
    accumulated: Duration,
    running_since: Option<Instant>,
}

impl StopClock {
    fn run(&mut self) {
        if self.running_since.is_none() {
            self.running_since = Some(Instant::now());
        }
    }

    fn halt(&mut self) {
        if let Some(since) = self.running_since.take() {
            self.accumulated += since.elapsed();
        }
    }

    fn elapsed(&self) -> Duration {
        self.accumulated + self.running_since.map_or(Duration::ZERO, |s| s.elapsed())
    }

    fn set(&mut self, elapsed: Duration) {
        self.accumulated = elapsed;
        if self.running_since.is_some() {
            self.running_since = Some(Instant::now());
        }
    }
}

struct SimulatedRecorder {
    engine: EngineRef,
    output: Option<PathBuf>,
    clock: StopClock,
    released: bool,
}

impl SimulatedRecorder {
    fn live(&self) -> Result<(), NativeError> {
        if self.released {
            Err(NativeError::Released)
        } else {
            Ok(())
        }
    }
}

impl NativeRecorder for SimulatedRecorder {
    fn prepare(&mut self, output: &Path, settings: &RecorderSettings) -> Result<(), NativeError> {
        self.live()?;
        let mut engine = self.engine.lock();
        if engine.permission_denied {
            return Err(NativeError::PermissionDenied(
                "Microphone permission denied".to_string(),
            ));
        }
        engine.check(SimulatedOp::PrepareRecorder)?;
        trace!(path = %output.display(), ?settings, "Simulated recorder prepared");
        self.output = Some(output.to_path_buf());
        Ok(())
    }

    fn start(&mut self) -> Result<(), NativeError> {
        self.live()?;
        self.engine.lock().check(SimulatedOp::StartRecorder)?;
        self.clock.run();
        Ok(())
    }

    fn pause(&mut self) -> Result<(), NativeError> {
        self.live()?;
        self.engine.lock().check(SimulatedOp::PauseRecorder)?;
        self.clock.halt();
        Ok(())
    }

    fn resume(&mut self) -> Result<(), NativeError> {
        self.live()?;
        self.engine.lock().check(SimulatedOp::ResumeRecorder)?;
        self.clock.run();
        Ok(())
    }

    fn stop(&mut self) -> Result<(), NativeError> {
        self.live()?;
        self.engine.lock().check(SimulatedOp::StopRecorder)?;
        self.clock.halt();

        let Some(output) = self.output.take() else {
            return Err(NativeError::Failed("Recorder was never prepared".to_string()));
        };
        write_silence(&output, self.clock.elapsed())
    }

    fn release(&mut self) {
        if !self.released {
            self.released = true;
            self.engine.lock().live_recorders -= 1;
        }
    }

    fn read_meter(&mut self) -> Result<Option<RawMeter>, NativeError> {
        self.live()?;
        let mut engine = self.engine.lock();
        engine.check(SimulatedOp::ReadMeter)?;
        Ok(engine.input_level.map(|level| RawMeter {
            peak: level,
            average: level,
        }))
    }
}

impl Drop for SimulatedRecorder {
    fn drop(&mut self) {
        self.release();
    }
}

struct SimulatedPlayer {
    engine: EngineRef,
    duration: Option<MediaTime>,
    clock: StopClock,
    rate: f32,
    completion: Option<CompletionHandler>,
    released: bool,
}

impl SimulatedPlayer {
    fn loaded(&self) -> Result<MediaTime, NativeError> {
        if self.released {
            return Err(NativeError::Released);
        }
        self.duration
            .ok_or_else(|| NativeError::Failed("Player was never prepared".to_string()))
    }
}

impl NativePlayer for SimulatedPlayer {
    fn set_completion_handler(&mut self, handler: CompletionHandler) {
        if self.duration.is_some() {
            self.engine.lock().end_of_media = Some(Arc::clone(&handler));
        }
        self.completion = Some(handler);
    }

    fn prepare(&mut self, source: &AudioSource) -> Result<(), NativeError> {
        if self.released {
            return Err(NativeError::Released);
        }
        let mut engine = self.engine.lock();
        engine.check(SimulatedOp::PreparePlayer)?;

        let duration = match source {
            AudioSource::File(path) => wav_duration(path)?,
            AudioSource::Url { url, .. } => *engine
                .remote
                .get(url)
                .ok_or_else(|| NativeError::Unavailable(format!("Cannot open {}", url)))?,
        };
        self.duration = Some(duration);
        engine.end_of_media = self.completion.clone();
        trace!(%source, duration_ms = duration.as_millis(), "Simulated player prepared");
        Ok(())
    }

    fn play(&mut self) -> Result<(), NativeError> {
        self.loaded()?;
        self.engine.lock().check(SimulatedOp::Play)?;
        self.clock.run();
        Ok(())
    }

    fn pause(&mut self) -> Result<(), NativeError> {
        self.loaded()?;
        self.engine.lock().check(SimulatedOp::PausePlayer)?;
        self.clock.halt();
        Ok(())
    }

    fn stop(&mut self) -> Result<(), NativeError> {
        self.loaded()?;
        self.engine.lock().check(SimulatedOp::StopPlayer)?;
        self.clock = StopClock::default();
        Ok(())
    }

    fn release(&mut self) {
        if self.released {
            return;
        }
        self.released = true;
        let mut engine = self.engine.lock();
        engine.live_players -= 1;
        let ours = match (&engine.end_of_media, &self.completion) {
            (Some(current), Some(mine)) => Arc::ptr_eq(current, mine),
            _ => false,
        };
        if ours {
            engine.end_of_media = None;
        }
    }

    fn position(&self) -> Result<MediaTime, NativeError> {
        let duration = self.loaded()?;
        let media = self.clock.elapsed().mul_f32(self.rate);
        Ok(MediaTime::from(media).min(duration))
    }

    fn duration(&self) -> Result<MediaTime, NativeError> {
        self.loaded()
    }

    fn seek(&mut self, position: MediaTime) -> Result<(), NativeError> {
        let duration = self.loaded()?;
        self.engine.lock().check(SimulatedOp::Seek)?;
        let target = position.min(duration);
        self.clock.set(target.as_std().div_f32(self.rate));
        Ok(())
    }

    fn set_volume(&mut self, _volume: f32) -> Result<(), NativeError> {
        self.loaded().map(|_| ())
    }

    fn set_rate(&mut self, rate: f32) -> Result<(), NativeError> {
        self.loaded()?;
        // Keep the media position continuous across the rate change.
        let media = self.clock.elapsed().mul_f32(self.rate);
        self.rate = rate;
        self.clock.set(media.div_f32(rate));
        self.engine.lock().last_rate = Some(rate);
        Ok(())
    }
}

impl Drop for SimulatedPlayer {
    fn drop(&mut self) {
        self.release();
    }
}

fn write_silence(path: &Path, length: Duration) -> Result<(), NativeError> {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate: SIMULATED_SAMPLE_RATE,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let frames = length.as_millis() as u64 * u64::from(SIMULATED_SAMPLE_RATE) / 1_000;

    let mut writer = hound::WavWriter::create(path, spec)
        .map_err(|e| NativeError::Failed(format!("Failed to create {}: {}", path.display(), e)))?;
    for _ in 0..frames {
        writer
            .write_sample(0i16)
            .map_err(|e| NativeError::Failed(format!("Failed to write sample: {}", e)))?;
    }
    writer
        .finalize()
        .map_err(|e| NativeError::Failed(format!("Failed to finalize recording: {}", e)))
}

fn wav_duration(path: &Path) -> Result<MediaTime, NativeError> {
    let reader = hound::WavReader::open(path).map_err(|e| match e {
        hound::Error::IoError(io) => {
            NativeError::Unavailable(format!("Cannot open {}: {}", path.display(), io))
        }
        other => NativeError::Failed(format!("Unreadable media {}: {}", path.display(), other)),
    })?;
    let spec = reader.spec();
    let frames = u64::from(reader.duration());
    Ok(MediaTime::from_millis(frames * 1_000 / u64::from(spec.sample_rate.max(1))))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::config::RecorderConfig;
    use tempfile::tempdir;

    fn backend(profile: SimulatedProfile) -> (SimulatedBackend, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        (SimulatedBackend::new(profile, dir.path().to_path_buf()), dir)
    }

    #[test]
    fn amplitude_features_follow_api_level() {
        let (backend, _dir) = backend(SimulatedProfile::AmplitudeMeter);
        let old = backend.with_api_level(22);
        let caps = old.capabilities();
        assert!(!caps.pause_recording);
        assert!(!caps.playback_speed);
        assert!(caps.concurrent_record_and_play);

        let caps = old.with_api_level(23).capabilities();
        assert!(!caps.pause_recording);
        assert!(caps.playback_speed);
    }

    #[test]
    fn decibel_profile_is_exclusive() {
        let (backend, _dir) = backend(SimulatedProfile::DecibelMeter);
        let caps = backend.capabilities();
        assert!(!caps.concurrent_record_and_play);
        assert_eq!(caps.metering, Some(MeteringScale::decibels()));
        assert_eq!(backend.name(), "simulated-decibel");
    }

    #[tokio::test(start_paused = true)]
    async fn recording_length_excludes_pauses() {
        let (backend, dir) = backend(SimulatedProfile::DecibelMeter);
        let path = dir.path().join("take.wav");
        let settings = RecorderConfig::default().resolve(&backend.capabilities().recorder);

        let mut recorder = backend.create_recorder().unwrap();
        recorder.prepare(&path, &settings).unwrap();
        recorder.start().unwrap();
        tokio::time::sleep(Duration::from_millis(1_000)).await;
        recorder.pause().unwrap();
        tokio::time::sleep(Duration::from_millis(5_000)).await;
        recorder.resume().unwrap();
        tokio::time::sleep(Duration::from_millis(500)).await;
        recorder.stop().unwrap();
        recorder.release();

        assert_eq!(backend.read_duration(&path).unwrap(), MediaTime::from_millis(1_500));
        assert_eq!(backend.live_recorders(), 0);
    }

    #[test]
    fn permission_denial_fails_prepare() {
        let (backend, dir) = backend(SimulatedProfile::AmplitudeMeter);
        backend.deny_permission();
        let settings = RecorderConfig::default().resolve(&backend.capabilities().recorder);

        let mut recorder = backend.create_recorder().unwrap();
        let err = recorder.prepare(&dir.path().join("x.m4a"), &settings).unwrap_err();
        assert!(matches!(err, NativeError::PermissionDenied(_)));
    }

    #[test]
    fn injected_failure_fires_once() {
        let (backend, _dir) = backend(SimulatedProfile::AmplitudeMeter);
        backend.fail_next(SimulatedOp::ReadMeter);
        backend.set_input_level(16_000.0);

        let mut recorder = backend.create_recorder().unwrap();
        assert!(recorder.read_meter().is_err());
        let meter = recorder.read_meter().unwrap().unwrap();
        assert_eq!(meter.peak, 16_000.0);
    }

    #[tokio::test(start_paused = true)]
    async fn player_position_scales_with_rate_and_clamps() {
        let (backend, _dir) = backend(SimulatedProfile::AmplitudeMeter);
        backend.register_remote("https://cdn.test/a.mp3", MediaTime::from_secs(10));

        let mut player = backend.create_player().unwrap();
        player.prepare(&AudioSource::url("https://cdn.test/a.mp3")).unwrap();
        player.play().unwrap();
        tokio::time::sleep(Duration::from_secs(2)).await;
        assert_eq!(player.position().unwrap(), MediaTime::from_secs(2));

        player.set_rate(2.0).unwrap();
        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(player.position().unwrap(), MediaTime::from_secs(4));
        assert_eq!(backend.last_rate(), Some(2.0));

        tokio::time::sleep(Duration::from_secs(60)).await;
        assert_eq!(player.position().unwrap(), MediaTime::from_secs(10));
    }

    #[test]
    fn unknown_remote_is_unavailable() {
        let (backend, _dir) = backend(SimulatedProfile::DecibelMeter);
        let mut player = backend.create_player().unwrap();
        let err = player.prepare(&AudioSource::url("https://nowhere.test/x")).unwrap_err();
        assert!(matches!(err, NativeError::Unavailable(_)));
    }

    #[test]
    fn end_of_media_reaches_current_player_only() {
        let (backend, _dir) = backend(SimulatedProfile::AmplitudeMeter);
        backend.register_remote("https://cdn.test/a", MediaTime::from_secs(1));
        assert!(!backend.trigger_end_of_media());

        let fired = Arc::new(Mutex::new(0u32));
        let counter = Arc::clone(&fired);
        let mut player = backend.create_player().unwrap();
        player.set_completion_handler(Arc::new(move || *counter.lock() += 1));
        player.prepare(&AudioSource::url("https://cdn.test/a")).unwrap();

        assert!(backend.trigger_end_of_media());
        assert_eq!(*fired.lock(), 1);

        player.release();
        assert!(!backend.trigger_end_of_media());
        assert_eq!(backend.live_players(), 0);
    }
}
