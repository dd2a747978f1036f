//! Recorder and player session state machines
//!
//! Both machines are pure: callers pass in the current instant, and native
//! handles live elsewhere. A failed transition never mutates the session.

use std::fmt;
use std::path::PathBuf;
use std::time::{Duration, Instant};

use thiserror::Error;

use crate::domain::error::AudioError;
use crate::domain::source::AudioSource;

/// Playback rate bounds (inclusive)
pub const MIN_PLAYBACK_RATE: f32 = 0.5;
pub const MAX_PLAYBACK_RATE: f32 = 2.0;
pub const DEFAULT_PLAYBACK_RATE: f32 = 1.0;

/// Recorder states
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum RecorderState {
    #[default]
    Idle,
    Recording,
    Paused,
}

impl RecorderState {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Recording => "recording",
            Self::Paused => "recording-paused",
        }
    }

    /// Capturing right now (not idle, not paused)
    pub const fn is_active(&self) -> bool {
        matches!(self, Self::Recording)
    }
}

impl fmt::Display for RecorderState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Player states
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum PlayerState {
    #[default]
    Idle,
    Playing,
    Paused,
    /// Reached end of media; position is held at duration.
    Completed,
}

impl PlayerState {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Playing => "playing",
            Self::Paused => "playing-paused",
            Self::Completed => "completed",
        }
    }

    /// Producing sound right now
    pub const fn is_active(&self) -> bool {
        matches!(self, Self::Playing)
    }
}

impl fmt::Display for PlayerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Error when an invalid state transition is attempted
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Invalid state transition: cannot {action} while {current_state}")]
pub struct InvalidStateTransition {
    pub current_state: &'static str,
    pub action: &'static str,
}

impl InvalidStateTransition {
    pub const fn new(current_state: &'static str, action: &'static str) -> Self {
        Self {
            current_state,
            action,
        }
    }
}

/// One recording, from start to stop.
///
/// State machine:
///   IDLE -> RECORDING (start)
///   RECORDING -> PAUSED (pause)
///   PAUSED -> RECORDING (resume)
///   any -> IDLE (stop)
///
/// Elapsed time is `now - started_at - paused_total`; the interval of an
/// ongoing pause is excluded as well.
#[derive(Debug, Clone, Default)]
pub struct RecordingSession {
    state: RecorderState,
    output: Option<PathBuf>,
    started_at: Option<Instant>,
    paused_at: Option<Instant>,
    paused_total: Duration,
}

impl RecordingSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> RecorderState {
        self.state
    }

    pub fn is_idle(&self) -> bool {
        self.state == RecorderState::Idle
    }

    pub fn is_paused(&self) -> bool {
        self.state == RecorderState::Paused
    }

    pub fn output(&self) -> Option<&PathBuf> {
        self.output.as_ref()
    }

    fn rejected(&self, action: &'static str) -> InvalidStateTransition {
        InvalidStateTransition::new(self.state.as_str(), action)
    }

    /// Transition from IDLE to RECORDING
    pub fn start(&mut self, output: PathBuf, now: Instant) -> Result<(), InvalidStateTransition> {
        if self.state != RecorderState::Idle {
            return Err(self.rejected("start recording"));
        }
        *self = Self {
            state: RecorderState::Recording,
            output: Some(output),
            started_at: Some(now),
            paused_at: None,
            paused_total: Duration::ZERO,
        };
        Ok(())
    }

    /// Transition from RECORDING to PAUSED
    pub fn pause(&mut self, now: Instant) -> Result<(), InvalidStateTransition> {
        if self.state != RecorderState::Recording {
            return Err(self.rejected("pause recording"));
        }
        self.state = RecorderState::Paused;
        self.paused_at = Some(now);
        Ok(())
    }

    /// Transition from PAUSED to RECORDING
    pub fn resume(&mut self, now: Instant) -> Result<(), InvalidStateTransition> {
        if self.state != RecorderState::Paused {
            return Err(self.rejected("resume recording"));
        }
        if let Some(paused_at) = self.paused_at.take() {
            self.paused_total += now.saturating_duration_since(paused_at);
        }
        self.state = RecorderState::Recording;
        Ok(())
    }

    /// Any state to IDLE. Returns the output path of the ended session.
    pub fn stop(&mut self) -> Option<PathBuf> {
        std::mem::take(self).output
    }

    /// Recorded time so far, excluding paused intervals.
    pub fn elapsed(&self, now: Instant) -> Duration {
        let Some(started_at) = self.started_at else {
            return Duration::ZERO;
        };
        let until = self.paused_at.unwrap_or(now);
        until
            .saturating_duration_since(started_at)
            .saturating_sub(self.paused_total)
    }
}

/// One playback, from start to stop.
///
/// State machine:
///   IDLE | COMPLETED -> PLAYING (start)
///   PLAYING -> PAUSED (pause)
///   PAUSED -> PLAYING (resume)
///   COMPLETED -> PLAYING (resume, replays from the start)
///   PLAYING | PAUSED -> COMPLETED (complete)
///   COMPLETED -> PAUSED (park, after seeking back from the end)
///   any -> IDLE (stop)
#[derive(Debug, Clone)]
pub struct PlaybackSession {
    state: PlayerState,
    source: Option<AudioSource>,
    rate: f32,
    volume: f32,
}

impl Default for PlaybackSession {
    fn default() -> Self {
        Self {
            state: PlayerState::Idle,
            source: None,
            rate: DEFAULT_PLAYBACK_RATE,
            volume: 1.0,
        }
    }
}

impl PlaybackSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> PlayerState {
        self.state
    }

    pub fn source(&self) -> Option<&AudioSource> {
        self.source.as_ref()
    }

    pub fn rate(&self) -> f32 {
        self.rate
    }

    pub fn volume(&self) -> f32 {
        self.volume
    }

    /// A source is loaded (any state but IDLE)
    pub fn is_loaded(&self) -> bool {
        self.state != PlayerState::Idle
    }

    fn rejected(&self, action: &'static str) -> InvalidStateTransition {
        InvalidStateTransition::new(self.state.as_str(), action)
    }

    /// Transition from IDLE or COMPLETED to PLAYING with a fresh source
    pub fn start(&mut self, source: AudioSource) -> Result<(), InvalidStateTransition> {
        if !matches!(self.state, PlayerState::Idle | PlayerState::Completed) {
            return Err(self.rejected("start playing"));
        }
        *self = Self {
            state: PlayerState::Playing,
            source: Some(source),
            ..Self::default()
        };
        Ok(())
    }

    /// Transition from PLAYING to PAUSED
    pub fn pause(&mut self) -> Result<(), InvalidStateTransition> {
        if self.state != PlayerState::Playing {
            return Err(self.rejected("pause playing"));
        }
        self.state = PlayerState::Paused;
        Ok(())
    }

    /// Transition from PAUSED or COMPLETED to PLAYING
    pub fn resume(&mut self) -> Result<(), InvalidStateTransition> {
        if !matches!(self.state, PlayerState::Paused | PlayerState::Completed) {
            return Err(self.rejected("resume playing"));
        }
        self.state = PlayerState::Playing;
        Ok(())
    }

    /// Transition from PLAYING or PAUSED to COMPLETED
    pub fn complete(&mut self) -> Result<(), InvalidStateTransition> {
        if !matches!(self.state, PlayerState::Playing | PlayerState::Paused) {
            return Err(self.rejected("complete playback"));
        }
        self.state = PlayerState::Completed;
        Ok(())
    }

    /// Transition from COMPLETED to PAUSED
    pub fn park(&mut self) -> Result<(), InvalidStateTransition> {
        if self.state != PlayerState::Completed {
            return Err(self.rejected("rewind playback"));
        }
        self.state = PlayerState::Paused;
        Ok(())
    }

    /// Any state to IDLE. Returns the source of the ended session.
    pub fn stop(&mut self) -> Option<AudioSource> {
        std::mem::take(self).source
    }

    pub fn set_rate(&mut self, rate: f32) -> Result<(), AudioError> {
        self.rate = validate_playback_rate(rate)?;
        Ok(())
    }

    pub fn set_volume(&mut self, volume: f32) -> Result<(), AudioError> {
        self.volume = validate_volume(volume)?;
        Ok(())
    }
}

/// Accept a volume in `0.0..=1.0`.
pub fn validate_volume(volume: f32) -> Result<f32, AudioError> {
    if !(0.0..=1.0).contains(&volume) {
        return Err(AudioError::InvalidArgument(format!(
            "volume must be between 0.0 and 1.0, got {}",
            volume
        )));
    }
    Ok(volume)
}

/// Accept a playback rate in `0.5..=2.0`.
pub fn validate_playback_rate(rate: f32) -> Result<f32, AudioError> {
    if !(MIN_PLAYBACK_RATE..=MAX_PLAYBACK_RATE).contains(&rate) {
        return Err(AudioError::InvalidArgument(format!(
            "playback speed must be between {} and {}, got {}",
            MIN_PLAYBACK_RATE, MAX_PLAYBACK_RATE, rate
        )));
    }
    Ok(rate)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(base: Instant, ms: u64) -> Instant {
        base + Duration::from_millis(ms)
    }

    #[test]
    fn new_recording_session_is_idle() {
        let session = RecordingSession::new();
        assert!(session.is_idle());
        assert!(session.output().is_none());
        assert_eq!(session.elapsed(Instant::now()), Duration::ZERO);
    }

    #[test]
    fn start_from_idle_records() {
        let mut session = RecordingSession::new();
        session
            .start(PathBuf::from("/tmp/a.wav"), Instant::now())
            .unwrap();
        assert_eq!(session.state(), RecorderState::Recording);
        assert_eq!(session.output(), Some(&PathBuf::from("/tmp/a.wav")));
    }

    #[test]
    fn start_while_recording_fails_without_mutation() {
        let t0 = Instant::now();
        let mut session = RecordingSession::new();
        session.start(PathBuf::from("/tmp/a.wav"), t0).unwrap();

        let err = session
            .start(PathBuf::from("/tmp/b.wav"), at(t0, 10))
            .unwrap_err();
        assert_eq!(err.current_state, "recording");
        assert_eq!(err.action, "start recording");
        assert_eq!(session.output(), Some(&PathBuf::from("/tmp/a.wav")));
        assert_eq!(session.elapsed(at(t0, 100)), Duration::from_millis(100));
    }

    #[test]
    fn pause_from_idle_fails() {
        let mut session = RecordingSession::new();
        let err = session.pause(Instant::now()).unwrap_err();
        assert_eq!(err.current_state, "idle");
        assert!(session.is_idle());
    }

    #[test]
    fn pause_twice_fails() {
        let t0 = Instant::now();
        let mut session = RecordingSession::new();
        session.start(PathBuf::from("a.wav"), t0).unwrap();
        session.pause(at(t0, 100)).unwrap();

        let err = session.pause(at(t0, 200)).unwrap_err();
        assert_eq!(err.current_state, "recording-paused");
    }

    #[test]
    fn resume_while_recording_fails() {
        let t0 = Instant::now();
        let mut session = RecordingSession::new();
        session.start(PathBuf::from("a.wav"), t0).unwrap();

        assert!(session.resume(at(t0, 50)).is_err());
        assert_eq!(session.state(), RecorderState::Recording);
    }

    #[test]
    fn paused_interval_is_excluded_from_elapsed() {
        let t0 = Instant::now();
        let mut session = RecordingSession::new();
        session.start(PathBuf::from("a.wav"), t0).unwrap();

        session.pause(at(t0, 1_000)).unwrap();
        assert_eq!(session.elapsed(at(t0, 4_000)), Duration::from_millis(1_000));

        session.resume(at(t0, 5_000)).unwrap();
        assert_eq!(session.elapsed(at(t0, 5_000)), Duration::from_millis(1_000));
        assert_eq!(session.elapsed(at(t0, 5_500)), Duration::from_millis(1_500));
    }

    #[test]
    fn multiple_pause_cycles_accumulate() {
        let t0 = Instant::now();
        let mut session = RecordingSession::new();
        session.start(PathBuf::from("a.wav"), t0).unwrap();

        session.pause(at(t0, 100)).unwrap();
        session.resume(at(t0, 300)).unwrap();
        session.pause(at(t0, 400)).unwrap();
        session.resume(at(t0, 1_400)).unwrap();

        assert_eq!(session.elapsed(at(t0, 1_500)), Duration::from_millis(300));
    }

    #[test]
    fn stop_returns_output_and_resets() {
        let t0 = Instant::now();
        let mut session = RecordingSession::new();
        session.start(PathBuf::from("a.wav"), t0).unwrap();
        session.pause(at(t0, 10)).unwrap();

        assert_eq!(session.stop(), Some(PathBuf::from("a.wav")));
        assert!(session.is_idle());
        assert_eq!(session.elapsed(at(t0, 100)), Duration::ZERO);
        assert_eq!(session.stop(), None);
    }

    #[test]
    fn new_playback_session_is_idle() {
        let session = PlaybackSession::new();
        assert_eq!(session.state(), PlayerState::Idle);
        assert!(!session.is_loaded());
        assert_eq!(session.rate(), DEFAULT_PLAYBACK_RATE);
    }

    #[test]
    fn playback_full_cycle() {
        let mut session = PlaybackSession::new();
        session.start(AudioSource::file("a.wav")).unwrap();
        session.pause().unwrap();
        session.resume().unwrap();
        session.complete().unwrap();
        assert_eq!(session.state(), PlayerState::Completed);
        assert!(session.is_loaded());

        assert_eq!(session.stop(), Some(AudioSource::file("a.wav")));
        assert_eq!(session.state(), PlayerState::Idle);
    }

    #[test]
    fn start_while_playing_fails() {
        let mut session = PlaybackSession::new();
        session.start(AudioSource::file("a.wav")).unwrap();

        let err = session.start(AudioSource::file("b.wav")).unwrap_err();
        assert_eq!(err.current_state, "playing");
        assert_eq!(session.source(), Some(&AudioSource::file("a.wav")));
    }

    #[test]
    fn start_from_completed_replaces_source() {
        let mut session = PlaybackSession::new();
        session.start(AudioSource::file("a.wav")).unwrap();
        session.set_rate(1.5).unwrap();
        session.complete().unwrap();

        session.start(AudioSource::file("b.wav")).unwrap();
        assert_eq!(session.source(), Some(&AudioSource::file("b.wav")));
        assert_eq!(session.rate(), DEFAULT_PLAYBACK_RATE);
    }

    #[test]
    fn pause_when_idle_or_paused_fails() {
        let mut session = PlaybackSession::new();
        assert!(session.pause().is_err());

        session.start(AudioSource::file("a.wav")).unwrap();
        session.pause().unwrap();
        let err = session.pause().unwrap_err();
        assert_eq!(err.current_state, "playing-paused");
    }

    #[test]
    fn park_only_from_completed() {
        let mut session = PlaybackSession::new();
        session.start(AudioSource::file("a.wav")).unwrap();
        assert!(session.park().is_err());

        session.complete().unwrap();
        session.park().unwrap();
        assert_eq!(session.state(), PlayerState::Paused);
    }

    #[test]
    fn resume_from_completed_plays_again() {
        let mut session = PlaybackSession::new();
        session.start(AudioSource::file("a.wav")).unwrap();
        session.complete().unwrap();
        session.resume().unwrap();
        assert_eq!(session.state(), PlayerState::Playing);
    }

    #[test]
    fn rate_out_of_range_leaves_rate_untouched() {
        let mut session = PlaybackSession::new();
        let err = session.set_rate(3.0).unwrap_err();
        assert!(matches!(err, AudioError::InvalidArgument(_)));
        assert_eq!(session.rate(), DEFAULT_PLAYBACK_RATE);
        assert!(session.set_rate(f32::NAN).is_err());
    }

    #[test]
    fn volume_bounds() {
        assert!(validate_volume(0.0).is_ok());
        assert!(validate_volume(1.0).is_ok());
        assert!(validate_volume(-0.1).is_err());
        assert!(validate_volume(1.01).is_err());
        assert!(validate_volume(f32::NAN).is_err());
    }

    #[test]
    fn rate_bounds_are_inclusive() {
        assert!(validate_playback_rate(0.5).is_ok());
        assert!(validate_playback_rate(2.0).is_ok());
        assert!(validate_playback_rate(0.49).is_err());
    }
}
