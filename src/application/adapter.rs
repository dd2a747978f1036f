//! Platform adapter
//!
//! `PlatformAdapter` implements `AudioRecorderPlayer` once for every
//! backend. It owns at most one native recorder and one native player,
//! keeps them in step with the session state machines, and runs one
//! sampler per active session.
//!
//! Completion policy: when playback reaches end of media the native player
//! stays alive, paused at the end, and the session moves to `Completed`
//! with the last event reporting position == duration. Seeking back parks
//! the session as paused, resuming replays from the start, and stopping or
//! starting another source releases the handle.

use std::ops::ControlFlow;
use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::{Mutex, RwLock};
use tokio::runtime::Handle;
use tokio::sync::Notify;
use tracing::{debug, info, warn};

use super::listeners::ListenerHub;
use super::ports::{
    AudioRecorderPlayer, Capabilities, MeteringListener, NativeBackend, NativePlayer,
    NativeRecorder, PlaybackListener, RecordingListener, Subscription,
};
use super::sampler::{Sampler, Wake};
use crate::domain::config::{PlayerConfig, RecorderConfig};
use crate::domain::error::AudioError;
use crate::domain::progress::{MeteringInfo, MeteringScale, PlaybackProgress, RecordingProgress};
use crate::domain::recording_info::{default_recording_path, RecordingInfo};
use crate::domain::session::{
    validate_playback_rate, validate_volume, InvalidStateTransition, PlaybackSession,
    PlayerState, RecorderState, RecordingSession,
};
use crate::domain::source::AudioSource;
use crate::domain::time::MediaTime;

#[derive(Default)]
struct RecorderSlot {
    session: RecordingSession,
    native: Option<Box<dyn NativeRecorder>>,
    sampler: Option<Sampler>,
    /// Bumped whenever a session starts or ends; a sampler from another
    /// epoch exits on its next tick.
    epoch: u64,
}

#[derive(Default)]
struct PlayerSlot {
    session: PlaybackSession,
    native: Option<Box<dyn NativePlayer>>,
    sampler: Option<Sampler>,
    completion: Option<Arc<Notify>>,
    epoch: u64,
    /// Whether the current epoch's sampler is still looping. Cleared under
    /// the lock by the sampler itself when it breaks.
    sampling: bool,
}

#[derive(Default)]
struct Settings {
    player: PlayerConfig,
    recorder: RecorderConfig,
}

/// State shared between the adapter and its sampler tasks
struct Shared {
    platform: &'static str,
    recorder: Mutex<RecorderSlot>,
    player: Mutex<PlayerSlot>,
    settings: RwLock<Settings>,
    listeners: ListenerHub,
    last_recording: Mutex<Option<PathBuf>>,
}

/// Which side of the adapter an operation starts
#[derive(Debug, Clone, Copy)]
enum Side {
    Recorder,
    Player,
}

/// Recorder/player backed by a `NativeBackend`.
pub struct PlatformAdapter<B: NativeBackend> {
    backend: Arc<B>,
    runtime: Handle,
    shared: Arc<Shared>,
}

impl<B: NativeBackend> PlatformAdapter<B> {
    /// Create an adapter. Samplers and listener delivery run on `runtime`.
    pub fn new(backend: B, runtime: Handle) -> Self {
        let shared = Shared {
            platform: backend.name(),
            recorder: Mutex::new(RecorderSlot::default()),
            player: Mutex::new(PlayerSlot::default()),
            settings: RwLock::new(Settings::default()),
            listeners: ListenerHub::new(&runtime),
            last_recording: Mutex::new(None),
        };
        Self {
            backend: Arc::new(backend),
            runtime,
            shared: Arc::new(shared),
        }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Reject an operation that would make recording and playback both
    /// active on a platform that cannot do both.
    fn ensure_exclusive(&self, starting: Side, action: &'static str) -> Result<(), AudioError> {
        if self.backend.capabilities().concurrent_record_and_play {
            return Ok(());
        }
        let busy = match starting {
            Side::Recorder => {
                let state = self.shared.player.lock().session.state();
                state.is_active().then_some(state.as_str())
            }
            Side::Player => {
                let state = self.shared.recorder.lock().session.state();
                state.is_active().then_some(state.as_str())
            }
        };
        match busy {
            Some(state) => Err(InvalidStateTransition::new(state, action).into()),
            None => Ok(()),
        }
    }

    fn unsupported(&self, what: &str) -> AudioError {
        AudioError::Unsupported(format!("{} is not supported on {}", what, self.backend.name()))
    }

    fn spawn_recording_sampler(&self, epoch: u64) -> Sampler {
        let shared = Arc::clone(&self.shared);
        let settings = Arc::clone(&self.shared);
        let scale = self.backend.capabilities().metering;
        Sampler::spawn(
            &self.runtime,
            "recording",
            move || settings.settings.read().player.update_interval(),
            None,
            move |_| shared.sample_recording(epoch, scale),
        )
    }

    fn spawn_playback_sampler(&self, epoch: u64, completion: Arc<Notify>) -> Sampler {
        let shared = Arc::clone(&self.shared);
        let settings = Arc::clone(&self.shared);
        Sampler::spawn(
            &self.runtime,
            "playback",
            move || settings.settings.read().player.update_interval(),
            Some(completion),
            move |wake| shared.sample_playback(epoch, wake),
        )
    }

    /// End the recording session, if any. Returns the output path of the
    /// session that ended.
    async fn shutdown_recorder(&self) -> Result<Option<PathBuf>, AudioError> {
        let (sampler, native, output) = {
            let mut slot = self.shared.recorder.lock();
            slot.epoch += 1;
            (slot.sampler.take(), slot.native.take(), slot.session.stop())
        };

        if let Some(sampler) = sampler {
            sampler.cancel().await;
        }

        let metering = self.shared.settings.read().player.metering_enabled
            && self.backend.capabilities().metering.is_some();
        if output.is_some() && metering {
            self.shared.listeners.publish_metering(MeteringInfo::silent());
        }

        if let Some(native) = native {
            run_native("stop recording", move || finish_recorder(native)).await?;
        }
        Ok(output)
    }

    /// End the playback session, if any.
    async fn shutdown_player(&self) -> Result<(), AudioError> {
        let (sampler, native) = {
            let mut slot = self.shared.player.lock();
            slot.epoch += 1;
            slot.sampling = false;
            slot.completion = None;
            slot.session.stop();
            (slot.sampler.take(), slot.native.take())
        };

        if let Some(sampler) = sampler {
            sampler.cancel().await;
        }
        if let Some(native) = native {
            run_native("stop playback", move || finish_player(native)).await?;
        }
        Ok(())
    }

    /// Validate a source and resolve `None` to the last recording.
    async fn resolve_source(&self, source: Option<AudioSource>) -> Result<AudioSource, AudioError> {
        let source = match source {
            Some(source) => source,
            None => self
                .shared
                .last_recording
                .lock()
                .clone()
                .map(AudioSource::File)
                .ok_or_else(|| AudioError::ResourceUnavailable("No file to play".to_string()))?,
        };

        match &source {
            AudioSource::File(path) => {
                let is_file = tokio::fs::metadata(path)
                    .await
                    .map(|m| m.is_file())
                    .unwrap_or(false);
                if !is_file {
                    return Err(AudioError::ResourceUnavailable(format!(
                        "File does not exist: {}",
                        path.display()
                    )));
                }
            }
            AudioSource::Url { .. } => {
                if !self.backend.capabilities().remote_sources {
                    return Err(self.unsupported("Remote playback"));
                }
            }
        }
        Ok(source)
    }
}

impl Shared {
    fn sample_recording(&self, epoch: u64, scale: Option<MeteringScale>) -> ControlFlow<()> {
        let metering_enabled = self.settings.read().player.metering_enabled;

        let mut guard = self.recorder.lock();
        let slot = &mut *guard;
        if slot.epoch != epoch {
            return ControlFlow::Break(());
        }
        let Some(native) = slot.native.as_mut() else {
            return ControlFlow::Break(());
        };
        if slot.session.is_paused() {
            return ControlFlow::Continue(());
        }

        let elapsed = slot.session.elapsed(now());
        let meter = match scale.filter(|_| metering_enabled) {
            Some(scale) => match native.read_meter() {
                Ok(raw) => raw.map(|raw| MeteringInfo::from_raw(raw, scale)),
                Err(_) => return ControlFlow::Break(()),
            },
            None => None,
        };
        drop(guard);

        self.listeners
            .publish_recording(RecordingProgress::new(MediaTime::from(elapsed)));
        if let Some(meter) = meter {
            self.listeners.publish_metering(meter);
        }
        ControlFlow::Continue(())
    }

    fn sample_playback(&self, epoch: u64, wake: Wake) -> ControlFlow<()> {
        let mut guard = self.player.lock();
        let slot = &mut *guard;
        if slot.epoch != epoch {
            return ControlFlow::Break(());
        }
        let Some(native) = slot.native.as_mut() else {
            slot.sampling = false;
            return ControlFlow::Break(());
        };
        let state = slot.session.state();
        if wake == Wake::Timer && state != PlayerState::Playing {
            return ControlFlow::Continue(());
        }

        let (position, duration) = match (native.position(), native.duration()) {
            (Ok(position), Ok(duration)) => (position, duration),
            _ => {
                slot.sampling = false;
                return ControlFlow::Break(());
            }
        };

        let ended = wake == Wake::Signal || (!duration.is_zero() && position >= duration);
        if !ended {
            drop(guard);
            self.listeners
                .publish_playback(PlaybackProgress::new(position, duration));
            return ControlFlow::Continue(());
        }

        // Park at end: keep the handle, hold position at duration.
        let end = if duration.is_zero() { position } else { duration };
        if let Err(e) = native.pause() {
            debug!(error = %e, "Native pause at end of media failed");
        }
        slot.sampling = false;
        if let Err(e) = slot.session.complete() {
            debug!(error = %e, "Completion ignored");
            return ControlFlow::Break(());
        }
        drop(guard);

        self.listeners.publish_playback(PlaybackProgress::new(end, end));
        info!(platform = self.platform, position_ms = end.as_millis(), "Playback completed");
        ControlFlow::Break(())
    }
}

#[async_trait]
impl<B: NativeBackend> AudioRecorderPlayer for PlatformAdapter<B> {
    async fn start_recording(&self, path: Option<PathBuf>) -> Result<PathBuf, AudioError> {
        {
            let slot = self.shared.recorder.lock();
            if !slot.session.is_idle() {
                return Err(
                    InvalidStateTransition::new(slot.session.state().as_str(), "start recording")
                        .into(),
                );
            }
        }
        let caps = self.backend.capabilities();
        if !caps.recording {
            return Err(self.unsupported("Audio recording"));
        }
        self.ensure_exclusive(Side::Recorder, "start recording")?;

        let settings = self.shared.settings.read().recorder.resolve(&caps.recorder);
        let output = match path {
            Some(path) => path,
            None => default_recording_path(&self.backend.recordings_dir(), settings.extension()),
        };
        if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await.map_err(|e| {
                AudioError::ResourceUnavailable(format!(
                    "Cannot create directory {}: {}",
                    parent.display(),
                    e
                ))
            })?;
        }

        let backend = Arc::clone(&self.backend);
        let target = output.clone();
        let native = run_native("start recording", move || {
            let mut recorder = backend.create_recorder()?;
            let started = recorder
                .prepare(&target, &settings)
                .and_then(|()| recorder.start());
            if let Err(e) = started {
                let _ = recorder.stop();
                recorder.release();
                return Err(e.into());
            }
            Ok(recorder)
        })
        .await?;

        let epoch = {
            let mut slot = self.shared.recorder.lock();
            match slot.session.start(output.clone(), now()) {
                Ok(()) => {
                    slot.native = Some(native);
                    slot.epoch += 1;
                    Ok(slot.epoch)
                }
                Err(e) => Err((e, native)),
            }
        };
        let epoch = match epoch {
            Ok(epoch) => epoch,
            Err((e, native)) => {
                let _ = finish_recorder(native);
                return Err(e.into());
            }
        };

        *self.shared.last_recording.lock() = Some(output.clone());
        let sampler = self.spawn_recording_sampler(epoch);
        self.shared.recorder.lock().sampler = Some(sampler);

        info!(platform = self.backend.name(), path = %output.display(), "Recording started");
        Ok(output)
    }

    async fn pause_recording(&self) -> Result<(), AudioError> {
        if !self.backend.capabilities().pause_recording {
            return Err(self.unsupported("Pausing a recording"));
        }

        let mut guard = self.shared.recorder.lock();
        let slot = &mut *guard;
        let mut next = slot.session.clone();
        next.pause(now())?;
        if let Some(native) = slot.native.as_mut() {
            native.pause()?;
        }
        slot.session = next;

        debug!("Recording paused");
        Ok(())
    }

    async fn resume_recording(&self) -> Result<(), AudioError> {
        if !self.backend.capabilities().pause_recording {
            return Err(self.unsupported("Resuming a recording"));
        }
        self.ensure_exclusive(Side::Recorder, "resume recording")?;

        let mut guard = self.shared.recorder.lock();
        let slot = &mut *guard;
        let mut next = slot.session.clone();
        next.resume(now())?;
        if let Some(native) = slot.native.as_mut() {
            native.resume()?;
        }
        slot.session = next;

        debug!("Recording resumed");
        Ok(())
    }

    async fn stop_recording(&self) -> Result<PathBuf, AudioError> {
        match self.shutdown_recorder().await? {
            Some(output) => {
                info!(path = %output.display(), "Recording stopped");
                Ok(output)
            }
            None => self.shared.last_recording.lock().clone().ok_or_else(|| {
                InvalidStateTransition::new(RecorderState::Idle.as_str(), "stop recording").into()
            }),
        }
    }

    async fn start_playing(&self, source: Option<AudioSource>) -> Result<(), AudioError> {
        {
            let slot = self.shared.player.lock();
            let state = slot.session.state();
            if matches!(state, PlayerState::Playing | PlayerState::Paused) {
                return Err(InvalidStateTransition::new(state.as_str(), "start playing").into());
            }
        }
        if !self.backend.capabilities().playback {
            return Err(self.unsupported("Audio playback"));
        }
        let source = self.resolve_source(source).await?;
        self.ensure_exclusive(Side::Player, "start playing")?;

        // A parked (completed) session gives way to the new source.
        let parked = self.shared.player.lock().session.state() == PlayerState::Completed;
        if parked {
            if let Err(e) = self.shutdown_player().await {
                debug!(error = %e, "Releasing completed player failed");
            }
        }

        let completion = Arc::new(Notify::new());
        let backend = Arc::clone(&self.backend);
        let prepared = source.clone();
        let signal = Arc::clone(&completion);
        let native = run_native("start playback", move || {
            let mut player = backend.create_player()?;
            player.set_completion_handler(Arc::new(move || signal.notify_one()));
            let started = player.prepare(&prepared).and_then(|()| player.play());
            if let Err(e) = started {
                let _ = player.stop();
                player.release();
                return Err(e.into());
            }
            Ok(player)
        })
        .await?;

        let epoch = {
            let mut slot = self.shared.player.lock();
            match slot.session.start(source.clone()) {
                Ok(()) => {
                    slot.native = Some(native);
                    slot.completion = Some(Arc::clone(&completion));
                    slot.epoch += 1;
                    slot.sampling = true;
                    Ok(slot.epoch)
                }
                Err(e) => Err((e, native)),
            }
        };
        let epoch = match epoch {
            Ok(epoch) => epoch,
            Err((e, native)) => {
                let _ = finish_player(native);
                return Err(e.into());
            }
        };

        let sampler = self.spawn_playback_sampler(epoch, completion);
        self.shared.player.lock().sampler = Some(sampler);

        info!(platform = self.backend.name(), source = %source, "Playback started");
        Ok(())
    }

    async fn pause_playing(&self) -> Result<(), AudioError> {
        let mut guard = self.shared.player.lock();
        let slot = &mut *guard;
        let mut next = slot.session.clone();
        next.pause()?;
        if let Some(native) = slot.native.as_mut() {
            native.pause()?;
        }
        slot.session = next;

        debug!("Playback paused");
        Ok(())
    }

    async fn resume_playing(&self) -> Result<(), AudioError> {
        self.ensure_exclusive(Side::Player, "resume playing")?;

        let restart = {
            let mut guard = self.shared.player.lock();
            let slot = &mut *guard;
            let replay = slot.session.state() == PlayerState::Completed;
            let mut next = slot.session.clone();
            next.resume()?;

            let Some(native) = slot.native.as_mut() else {
                return Err(InvalidStateTransition::new(
                    PlayerState::Idle.as_str(),
                    "resume playing",
                )
                .into());
            };
            if replay {
                native.seek(MediaTime::ZERO)?;
            }
            native.play()?;
            slot.session = next;

            // The sampler breaks at completion, possibly before its task has
            // exited. A fresh one needs a fresh signal and epoch.
            if !slot.sampling {
                let completion = Arc::new(Notify::new());
                let signal = Arc::clone(&completion);
                native.set_completion_handler(Arc::new(move || signal.notify_one()));
                slot.completion = Some(Arc::clone(&completion));
                slot.epoch += 1;
                slot.sampling = true;
                Some((slot.epoch, completion))
            } else {
                None
            }
        };

        if let Some((epoch, completion)) = restart {
            let sampler = self.spawn_playback_sampler(epoch, completion);
            self.shared.player.lock().sampler = Some(sampler);
        }

        debug!("Playback resumed");
        Ok(())
    }

    async fn stop_playing(&self) -> Result<(), AudioError> {
        self.shutdown_player().await?;
        debug!("Playback stopped");
        Ok(())
    }

    async fn seek_to(&self, position_ms: i64) -> Result<(), AudioError> {
        let progress = {
            let mut guard = self.shared.player.lock();
            let slot = &mut *guard;
            let state = slot.session.state();
            let Some(native) = slot.native.as_mut() else {
                return Err(InvalidStateTransition::new(state.as_str(), "seek").into());
            };

            let duration = native.duration()?;
            let mut target = MediaTime::from_signed_millis(position_ms);
            if !duration.is_zero() {
                target = target.min(duration);
            }
            native.seek(target)?;

            if state == PlayerState::Completed && target < duration {
                slot.session.park()?;
            }
            PlaybackProgress::new(target, duration)
        };

        debug!(position_ms = progress.current_position, "Seeked");
        self.shared.listeners.publish_playback(progress);
        Ok(())
    }

    async fn set_volume(&self, volume: f32) -> Result<(), AudioError> {
        let volume = validate_volume(volume)?;

        let mut guard = self.shared.player.lock();
        let slot = &mut *guard;
        let Some(native) = slot.native.as_mut() else {
            return Err(
                InvalidStateTransition::new(slot.session.state().as_str(), "set volume").into(),
            );
        };
        native.set_volume(volume)?;
        slot.session.set_volume(volume)
    }

    async fn set_playback_speed(&self, speed: f32) -> Result<(), AudioError> {
        let speed = validate_playback_rate(speed)?;
        if !self.backend.capabilities().playback_speed {
            return Err(self.unsupported("Playback speed control"));
        }

        let mut guard = self.shared.player.lock();
        let slot = &mut *guard;
        let Some(native) = slot.native.as_mut() else {
            return Err(InvalidStateTransition::new(
                slot.session.state().as_str(),
                "set playback speed",
            )
            .into());
        };
        native.set_rate(speed)?;
        slot.session.set_rate(speed)
    }

    async fn get_recording_info(&self) -> Result<Option<RecordingInfo>, AudioError> {
        let last = self.shared.last_recording.lock().clone();
        match last {
            Some(path) => self.describe_recording(path).await.map(Some),
            None => Ok(None),
        }
    }

    async fn describe_recording(&self, path: PathBuf) -> Result<RecordingInfo, AudioError> {
        let metadata = tokio::fs::metadata(&path).await.map_err(|e| {
            AudioError::ResourceUnavailable(format!(
                "Recording not found at {}: {}",
                path.display(),
                e
            ))
        })?;

        let backend = Arc::clone(&self.backend);
        let file = path.clone();
        let duration = run_native("read recording duration", move || {
            Ok(backend.read_duration(&file).unwrap_or_else(|e| {
                debug!(error = %e, path = %file.display(), "Duration unknown");
                MediaTime::ZERO
            }))
        })
        .await?;

        Ok(RecordingInfo::new(path, duration, metadata.len()))
    }

    fn add_recording_listener(&self, listener: RecordingListener) -> Subscription {
        self.shared.listeners.add_recording(listener)
    }

    fn add_playback_listener(&self, listener: PlaybackListener) -> Subscription {
        self.shared.listeners.add_playback(listener)
    }

    fn add_metering_listener(&self, listener: MeteringListener) -> Subscription {
        self.shared.listeners.add_metering(listener)
    }

    fn remove_listener(&self, subscription: Subscription) -> bool {
        self.shared.listeners.remove(subscription)
    }

    async fn remove_listeners(&self) {
        self.shared.listeners.clear();
        if let Err(e) = self.shutdown_recorder().await {
            warn!(error = %e, "Forced recorder stop failed");
        }
        if let Err(e) = self.shutdown_player().await {
            warn!(error = %e, "Forced player stop failed");
        }
    }

    fn set_player_properties(&self, config: PlayerConfig) {
        self.shared.settings.write().player = config;
    }

    fn set_recorder_properties(&self, config: RecorderConfig) {
        self.shared.settings.write().recorder = config;
    }

    fn recorder_state(&self) -> RecorderState {
        self.shared.recorder.lock().session.state()
    }

    fn player_state(&self) -> PlayerState {
        self.shared.player.lock().session.state()
    }

    fn capabilities(&self) -> Capabilities {
        self.backend.capabilities()
    }

    fn platform_name(&self) -> &'static str {
        self.backend.name()
    }
}

impl<B: NativeBackend> Drop for PlatformAdapter<B> {
    fn drop(&mut self) {
        // Samplers hold the shared state; cancelling them breaks the cycle.
        let recorder = {
            let mut slot = self.shared.recorder.lock();
            drop(slot.sampler.take());
            slot.native.take()
        };
        let player = {
            let mut slot = self.shared.player.lock();
            drop(slot.sampler.take());
            slot.native.take()
        };
        if let Some(mut native) = recorder {
            native.release();
        }
        if let Some(mut native) = player {
            native.release();
        }
    }
}

fn now() -> std::time::Instant {
    tokio::time::Instant::now().into_std()
}

/// Run a native call on the blocking pool.
async fn run_native<T, F>(operation: &'static str, f: F) -> Result<T, AudioError>
where
    F: FnOnce() -> Result<T, AudioError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f).await.map_err(|e| {
        AudioError::NativeFailure(format!("{} did not complete: {}", operation, e))
    })?
}

/// Stop then release. Release always runs; the stop result is returned.
fn finish_recorder(mut native: Box<dyn NativeRecorder>) -> Result<(), AudioError> {
    let stopped = native.stop();
    native.release();
    stopped.map_err(AudioError::from)
}

fn finish_player(mut native: Box<dyn NativePlayer>) -> Result<(), AudioError> {
    let stopped = native.stop();
    native.release();
    stopped.map_err(AudioError::from)
}
