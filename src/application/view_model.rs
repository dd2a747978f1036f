//! Recorder/player view model
//!
//! Mirrors adapter state into one observable `ViewSnapshot`. Metering levels
//! arrive already normalized and are shown as-is.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::watch;
use tracing::debug;

use crate::application::ports::{AudioRecorderPlayer, Subscription};
use crate::domain::config::{PlayerConfig, RecorderConfig};
use crate::domain::error::AudioError;
use crate::domain::progress::{MeteringInfo, PlaybackProgress, RecordingProgress};
use crate::domain::session::{PlayerState, DEFAULT_PLAYBACK_RATE};
use crate::domain::source::AudioSource;
use crate::domain::time::MediaTime;

/// Everything a UI renders
#[derive(Debug, Clone, PartialEq)]
pub struct ViewSnapshot {
    pub record_time: String,
    pub play_time: String,
    pub duration: String,
    /// Playback completion ratio in `0.0..=1.0`
    pub play_progress: f32,
    pub is_recording: bool,
    pub is_playing: bool,
    pub is_recording_paused: bool,
    pub is_playing_paused: bool,
    /// Last failure, kept until `clear_error`
    pub error_message: Option<String>,
    /// `Duration: X | Size: Y` of the last recording
    pub recording_info: Option<String>,
    pub metering_level: f32,
    pub playback_speed: f32,
}

impl Default for ViewSnapshot {
    fn default() -> Self {
        let zero = MediaTime::ZERO.to_string();
        Self {
            record_time: zero.clone(),
            play_time: zero.clone(),
            duration: zero,
            play_progress: 0.0,
            is_recording: false,
            is_playing: false,
            is_recording_paused: false,
            is_playing_paused: false,
            error_message: None,
            recording_info: None,
            metering_level: 0.0,
            playback_speed: DEFAULT_PLAYBACK_RATE,
        }
    }
}

struct ViewState {
    snapshot: watch::Sender<ViewSnapshot>,
    /// Gates late events that were published before a session ended
    recording_active: AtomicBool,
    playback_loaded: AtomicBool,
}

impl ViewState {
    fn update(&self, f: impl FnOnce(&mut ViewSnapshot)) {
        self.snapshot.send_modify(f);
    }

    fn on_recording(&self, progress: &RecordingProgress) {
        if self.recording_active.load(Ordering::Acquire) {
            let time = progress.formatted_time.clone();
            self.update(|s| s.record_time = time);
        }
    }

    fn on_playback(&self, progress: &PlaybackProgress) {
        if !self.playback_loaded.load(Ordering::Acquire) {
            return;
        }
        self.update(|s| {
            s.duration = progress.formatted_duration.clone();
            if progress.is_complete() {
                s.play_time = progress.formatted_duration.clone();
                s.play_progress = 1.0;
                s.is_playing = false;
                s.is_playing_paused = false;
            } else {
                s.play_time = progress.formatted_current_time.clone();
                s.play_progress = progress.ratio();
            }
        });
    }

    fn on_metering(&self, info: &MeteringInfo) {
        let level = info.current_metering;
        self.update(|s| s.metering_level = level);
    }
}

/// Consumer of an `AudioRecorderPlayer`.
pub struct AudioViewModel {
    engine: Arc<dyn AudioRecorderPlayer>,
    state: Arc<ViewState>,
    player_config: Mutex<PlayerConfig>,
    subscriptions: Vec<Subscription>,
}

impl AudioViewModel {
    pub fn new(engine: Arc<dyn AudioRecorderPlayer>, config: PlayerConfig) -> Self {
        let (snapshot, _) = watch::channel(ViewSnapshot::default());
        let state = Arc::new(ViewState {
            snapshot,
            recording_active: AtomicBool::new(false),
            playback_loaded: AtomicBool::new(false),
        });
        engine.set_player_properties(config);

        let recording = Arc::clone(&state);
        let playback = Arc::clone(&state);
        let metering = Arc::clone(&state);
        let subscriptions = vec![
            engine.add_recording_listener(Arc::new(move |p: &RecordingProgress| {
                recording.on_recording(p)
            })),
            engine.add_playback_listener(Arc::new(move |p: &PlaybackProgress| {
                playback.on_playback(p)
            })),
            engine.add_metering_listener(Arc::new(move |m: &MeteringInfo| metering.on_metering(m))),
        ];

        Self {
            engine,
            state,
            player_config: Mutex::new(config),
            subscriptions,
        }
    }

    pub fn snapshot(&self) -> ViewSnapshot {
        self.state.snapshot.borrow().clone()
    }

    /// Observe every change to the snapshot.
    pub fn subscribe(&self) -> watch::Receiver<ViewSnapshot> {
        self.state.snapshot.subscribe()
    }

    pub fn engine(&self) -> &Arc<dyn AudioRecorderPlayer> {
        &self.engine
    }

    /// Record `context: error` as the visible message and pass the error on.
    fn fail(&self, context: &str, error: AudioError) -> AudioError {
        let message = format!("{}: {}", context, error);
        debug!(%message, "View model operation failed");
        self.state.update(|s| s.error_message = Some(message));
        error
    }

    pub fn clear_error(&self) {
        self.state.update(|s| s.error_message = None);
    }

    pub async fn start_recording(&self, path: Option<PathBuf>) -> Result<PathBuf, AudioError> {
        let output = self
            .engine
            .start_recording(path)
            .await
            .map_err(|e| self.fail("Recording failed", e))?;

        self.state.recording_active.store(true, Ordering::Release);
        self.state.update(|s| {
            s.is_recording = true;
            s.is_recording_paused = false;
            s.record_time = MediaTime::ZERO.to_string();
            s.recording_info = None;
        });
        Ok(output)
    }

    pub async fn stop_recording(&self) -> Result<PathBuf, AudioError> {
        let result = self.engine.stop_recording().await;
        self.state.recording_active.store(false, Ordering::Release);
        self.state.update(|s| {
            s.is_recording = false;
            s.is_recording_paused = false;
            s.metering_level = 0.0;
        });

        let output = result.map_err(|e| self.fail("Failed to stop recording", e))?;
        // Failure is already reported through error_message.
        let _ = self.load_recording_info().await;
        Ok(output)
    }

    pub async fn pause_recording(&self) -> Result<(), AudioError> {
        self.engine
            .pause_recording()
            .await
            .map_err(|e| self.fail("Failed to pause recording", e))?;
        self.state.update(|s| s.is_recording_paused = true);
        Ok(())
    }

    pub async fn resume_recording(&self) -> Result<(), AudioError> {
        self.engine
            .resume_recording()
            .await
            .map_err(|e| self.fail("Failed to resume recording", e))?;
        self.state.update(|s| s.is_recording_paused = false);
        Ok(())
    }

    pub async fn toggle_recording_pause(&self) -> Result<(), AudioError> {
        if self.snapshot().is_recording_paused {
            self.resume_recording().await
        } else {
            self.pause_recording().await
        }
    }

    pub async fn start_playing(&self, source: Option<AudioSource>) -> Result<(), AudioError> {
        self.engine
            .start_playing(source)
            .await
            .map_err(|e| self.fail("Playback failed", e))?;

        self.state.playback_loaded.store(true, Ordering::Release);
        self.state.update(|s| {
            s.is_playing = true;
            s.is_playing_paused = false;
            s.play_time = MediaTime::ZERO.to_string();
            s.play_progress = 0.0;
            s.playback_speed = DEFAULT_PLAYBACK_RATE;
        });
        Ok(())
    }

    pub async fn stop_playing(&self) -> Result<(), AudioError> {
        let result = self.engine.stop_playing().await;
        self.state.playback_loaded.store(false, Ordering::Release);
        self.state.update(|s| {
            s.is_playing = false;
            s.is_playing_paused = false;
            s.play_time = MediaTime::ZERO.to_string();
            s.play_progress = 0.0;
        });
        result.map_err(|e| self.fail("Failed to stop playback", e))
    }

    pub async fn pause_playing(&self) -> Result<(), AudioError> {
        self.engine
            .pause_playing()
            .await
            .map_err(|e| self.fail("Failed to pause playback", e))?;
        self.state.update(|s| {
            s.is_playing = false;
            s.is_playing_paused = true;
        });
        Ok(())
    }

    /// Resume a paused playback, or replay a completed one.
    pub async fn resume_playing(&self) -> Result<(), AudioError> {
        self.engine
            .resume_playing()
            .await
            .map_err(|e| self.fail("Failed to resume playback", e))?;
        self.state.update(|s| {
            s.is_playing = true;
            s.is_playing_paused = false;
        });
        Ok(())
    }

    pub async fn toggle_playback_pause(&self) -> Result<(), AudioError> {
        if self.snapshot().is_playing {
            self.pause_playing().await
        } else {
            self.resume_playing().await
        }
    }

    /// Seek to a fraction (`0.0..=1.0`) of the displayed duration.
    pub async fn seek_to(&self, fraction: f32) -> Result<(), AudioError> {
        let fraction = if fraction.is_nan() {
            0.0
        } else {
            fraction.clamp(0.0, 1.0)
        };
        let duration: MediaTime = self.snapshot().duration.parse().unwrap_or_default();
        if duration.is_zero() {
            return Ok(());
        }

        let target = (duration.as_millis() as f64 * f64::from(fraction)).round() as i64;
        let was_completed = self.engine.player_state() == PlayerState::Completed;
        self.engine
            .seek_to(target)
            .await
            .map_err(|e| self.fail("Seek failed", e))?;

        // Seeking back from the end parks the player paused at the target.
        if was_completed && (target as u64) < duration.as_millis() {
            self.state.update(|s| {
                s.is_playing = false;
                s.is_playing_paused = true;
            });
        }
        Ok(())
    }

    pub async fn set_volume(&self, volume: f32) -> Result<(), AudioError> {
        self.engine
            .set_volume(volume)
            .await
            .map_err(|e| self.fail("Failed to set volume", e))
    }

    pub async fn set_playback_speed(&self, speed: f32) -> Result<(), AudioError> {
        self.engine
            .set_playback_speed(speed)
            .await
            .map_err(|e| self.fail("Failed to set playback speed", e))?;
        self.state.update(|s| s.playback_speed = speed);
        Ok(())
    }

    pub fn set_update_interval(&self, ms: u64) {
        let config = {
            let mut config = self.player_config.lock();
            *config = config.with_update_interval_ms(ms);
            *config
        };
        self.engine.set_player_properties(config);
    }

    pub fn set_metering(&self, enabled: bool) {
        let config = {
            let mut config = self.player_config.lock();
            *config = config.with_metering(enabled);
            *config
        };
        self.engine.set_player_properties(config);
    }

    pub fn set_recorder_settings(&self, config: RecorderConfig) {
        self.engine.set_recorder_properties(config);
    }

    pub async fn load_recording_info(&self) -> Result<(), AudioError> {
        let info = self
            .engine
            .get_recording_info()
            .await
            .map_err(|e| self.fail("Failed to get recording info", e))?;
        self.state
            .update(|s| s.recording_info = info.map(|i| i.summary()));
        Ok(())
    }

    /// Stop everything and detach from the engine.
    pub async fn dispose(&self) {
        for subscription in &self.subscriptions {
            self.engine.remove_listener(*subscription);
        }
        self.engine.remove_listeners().await;
        self.state.recording_active.store(false, Ordering::Release);
        self.state.playback_loaded.store(false, Ordering::Release);
        self.state.update(|s| {
            s.is_recording = false;
            s.is_recording_paused = false;
            s.is_playing = false;
            s.is_playing_paused = false;
            s.metering_level = 0.0;
        });
    }
}
