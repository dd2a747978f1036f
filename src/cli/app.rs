//! Runners for the record, play and info commands

use std::env;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use tokio::runtime::Handle;
use tracing::{debug, info, warn};

use crate::application::ports::{AudioRecorderPlayer, ConfigStore};
use crate::application::{AudioViewModel, ViewSnapshot};
use crate::domain::config::AppConfig;
use crate::domain::source::AudioSource;
use crate::domain::time::MediaTime;
use crate::infrastructure::{
    create_recorder_player, default_recordings_dir, latest_recording, PlatformKind,
    XdgConfigStore,
};

use super::args::{InfoArgs, PlayOptions, RecordOptions};
use super::presenter::Presenter;
use super::signals::{SessionControl, SessionControls};

/// Exit codes
pub const EXIT_SUCCESS: u8 = 0;
pub const EXIT_ERROR: u8 = 1;
pub const EXIT_USAGE_ERROR: u8 = 2;

/// Environment overrides
pub const PLATFORM_ENV: &str = "RECPLAY_PLATFORM";
pub const RECORDINGS_DIR_ENV: &str = "RECPLAY_RECORDINGS_DIR";

/// Load and merge configuration from file, env, and CLI
pub async fn load_merged_config(cli_config: AppConfig) -> AppConfig {
    let store = XdgConfigStore::new();
    let file_config = store.load().await.unwrap_or_else(|e| {
        warn!(path = %store.path().display(), error = %e, "Ignoring config file");
        AppConfig::empty()
    });

    // Build env config
    let env_config = AppConfig {
        platform: env::var(PLATFORM_ENV).ok().filter(|s| !s.is_empty()),
        recordings_dir: env::var(RECORDINGS_DIR_ENV).ok().filter(|s| !s.is_empty()),
        ..Default::default()
    };

    // Merge: defaults < file < env < cli
    AppConfig::defaults()
        .merge(file_config)
        .merge(env_config)
        .merge(cli_config)
}

/// Everything a command needs from the merged config
struct Session {
    engine: Arc<dyn AudioRecorderPlayer>,
    recordings_dir: PathBuf,
}

impl Session {
    fn open(config: &AppConfig) -> Result<Self, String> {
        let kind = config
            .platform_or_default()
            .parse::<PlatformKind>()
            .map_err(|e| e.to_string())?;
        let recordings_dir = config.recordings_dir_or(default_recordings_dir());
        let engine = create_recorder_player(kind, recordings_dir.clone(), Handle::current());
        engine.set_recorder_properties(config.recorder_config());
        Ok(Self {
            engine,
            recordings_dir,
        })
    }

    async fn newest_recording(&self) -> Result<PathBuf, String> {
        match latest_recording(&self.recordings_dir).await {
            Ok(Some(path)) => Ok(path),
            Ok(None) => Err(format!(
                "No recordings in {}",
                self.recordings_dir.display()
            )),
            Err(e) => Err(format!(
                "Cannot read {}: {}",
                self.recordings_dir.display(),
                e
            )),
        }
    }
}

/// Record until stopped, paused/resumed from stdin
pub async fn run_record(config: AppConfig, options: RecordOptions) -> ExitCode {
    let mut presenter = Presenter::new();

    let session = match Session::open(&config) {
        Ok(session) => session,
        Err(e) => {
            presenter.error(&e);
            return ExitCode::from(EXIT_USAGE_ERROR);
        }
    };
    let player_config = config.player_config();
    let metering = player_config.metering_enabled;
    let view_model = AudioViewModel::new(session.engine, player_config);

    let mut controls = match SessionControls::new(true) {
        Ok(controls) => controls,
        Err(e) => {
            presenter.error(&format!("Failed to setup signal handler: {}", e));
            return ExitCode::from(EXIT_ERROR);
        }
    };

    let path = match view_model.start_recording(options.output).await {
        Ok(path) => path,
        Err(e) => {
            presenter.error(&e.to_string());
            view_model.dispose().await;
            return ExitCode::from(EXIT_ERROR);
        }
    };
    info!(path = %path.display(), limit = ?options.limit, "Recording");

    let mut updates = view_model.subscribe();
    let first = presenter.recording_line(&updates.borrow_and_update(), metering);
    presenter.start_spinner(&first);
    presenter.info("Enter pauses/resumes, Ctrl-C stops");

    loop {
        tokio::select! {
            changed = updates.changed() => {
                if changed.is_err() {
                    break;
                }
                let view = updates.borrow_and_update().clone();
                presenter.update_recording_progress(&view, metering);
                if limit_reached(&view, options.limit) {
                    debug!("Recording limit reached");
                    break;
                }
            }
            control = controls.recv() => match control {
                Some(SessionControl::TogglePause) => {
                    if let Err(e) = view_model.toggle_recording_pause().await {
                        presenter.warn(&e.to_string());
                    }
                }
                Some(SessionControl::Stop) | None => break,
            },
        }
    }

    let exit = match view_model.stop_recording().await {
        Ok(path) => {
            presenter.spinner_success(&format!("Saved {}", path.display()));
            if let Some(summary) = view_model.snapshot().recording_info {
                presenter.info(&summary);
            }
            presenter.output(&path.to_string_lossy());
            ExitCode::from(EXIT_SUCCESS)
        }
        Err(e) => {
            presenter.spinner_fail(&e.to_string());
            ExitCode::from(EXIT_ERROR)
        }
    };
    view_model.dispose().await;
    exit
}

/// Play a source to the end, or until stopped
pub async fn run_play(config: AppConfig, options: PlayOptions) -> ExitCode {
    let mut presenter = Presenter::new();

    let session = match Session::open(&config) {
        Ok(session) => session,
        Err(e) => {
            presenter.error(&e);
            return ExitCode::from(EXIT_USAGE_ERROR);
        }
    };

    let source = match options.source.clone() {
        Some(source) => source,
        None => match session.newest_recording().await {
            Ok(path) => AudioSource::file(path),
            Err(e) => {
                presenter.error(&e);
                return ExitCode::from(EXIT_ERROR);
            }
        },
    };
    let label = source.to_string();
    let view_model = AudioViewModel::new(session.engine, config.player_config());

    let mut controls = match SessionControls::new(true) {
        Ok(controls) => controls,
        Err(e) => {
            presenter.error(&format!("Failed to setup signal handler: {}", e));
            return ExitCode::from(EXIT_ERROR);
        }
    };

    if let Err(e) = start_playback(&view_model, source, &options).await {
        presenter.error(&e);
        view_model.dispose().await;
        return ExitCode::from(EXIT_ERROR);
    }
    info!(source = %label, "Playing");

    let mut updates = view_model.subscribe();
    let first = presenter.playback_line(&updates.borrow_and_update());
    presenter.start_spinner(&first);
    presenter.info("Enter pauses/resumes, Ctrl-C stops");

    let mut finished = false;
    loop {
        tokio::select! {
            changed = updates.changed() => {
                if changed.is_err() {
                    break;
                }
                let view = updates.borrow_and_update().clone();
                presenter.update_playback_progress(&view);
                if playback_finished(&view) {
                    finished = true;
                    break;
                }
            }
            control = controls.recv() => match control {
                Some(SessionControl::TogglePause) => {
                    if let Err(e) = view_model.toggle_playback_pause().await {
                        presenter.warn(&e.to_string());
                    }
                }
                Some(SessionControl::Stop) | None => break,
            },
        }
    }

    let exit = match view_model.stop_playing().await {
        Ok(()) if finished => {
            presenter.spinner_success(&format!("Finished {}", label));
            ExitCode::from(EXIT_SUCCESS)
        }
        Ok(()) => {
            presenter.spinner_success(&format!("Stopped {}", label));
            ExitCode::from(EXIT_SUCCESS)
        }
        Err(e) => {
            presenter.spinner_fail(&e.to_string());
            ExitCode::from(EXIT_ERROR)
        }
    };
    view_model.dispose().await;
    exit
}

async fn start_playback(
    view_model: &AudioViewModel,
    source: AudioSource,
    options: &PlayOptions,
) -> Result<(), String> {
    view_model
        .start_playing(Some(source))
        .await
        .map_err(|e| e.to_string())?;
    if let Some(volume) = options.volume {
        view_model
            .set_volume(volume)
            .await
            .map_err(|e| e.to_string())?;
    }
    if let Some(speed) = options.speed {
        view_model
            .set_playback_speed(speed)
            .await
            .map_err(|e| e.to_string())?;
    }
    if let Some(start_at) = options.start_at {
        let position = i64::try_from(start_at.as_millis()).unwrap_or(i64::MAX);
        view_model
            .engine()
            .seek_to(position)
            .await
            .map_err(|e| e.to_string())?;
    }
    Ok(())
}

/// Describe a recording on stdout
pub async fn run_info(config: AppConfig, args: InfoArgs) -> ExitCode {
    let presenter = Presenter::new();

    let session = match Session::open(&config) {
        Ok(session) => session,
        Err(e) => {
            presenter.error(&e);
            return ExitCode::from(EXIT_USAGE_ERROR);
        }
    };

    let path = match args.path {
        Some(path) => path,
        None => match session.newest_recording().await {
            Ok(path) => path,
            Err(e) => {
                presenter.error(&e);
                return ExitCode::from(EXIT_ERROR);
            }
        },
    };

    if !Path::new(&path).is_file() {
        presenter.error(&format!("No such file: {}", path.display()));
        return ExitCode::from(EXIT_ERROR);
    }

    let info = match session.engine.describe_recording(path).await {
        Ok(info) => info,
        Err(e) => {
            presenter.error(&e.to_string());
            return ExitCode::from(EXIT_ERROR);
        }
    };

    if args.json {
        match serde_json::to_string_pretty(&info) {
            Ok(json) => presenter.output(&json),
            Err(e) => {
                presenter.error(&format!("Failed to serialize info: {}", e));
                return ExitCode::from(EXIT_ERROR);
            }
        }
    } else {
        presenter.key_value("file", &info.file_path.to_string_lossy());
        presenter.key_value("duration", &info.formatted_duration);
        presenter.key_value("size", &info.formatted_file_size);
    }

    ExitCode::from(EXIT_SUCCESS)
}

fn limit_reached(view: &ViewSnapshot, limit: Option<MediaTime>) -> bool {
    let Some(limit) = limit else {
        return false;
    };
    view.record_time
        .parse::<MediaTime>()
        .is_ok_and(|elapsed| elapsed >= limit.truncated())
}

fn playback_finished(view: &ViewSnapshot) -> bool {
    !view.is_playing && !view.is_playing_paused && view.play_progress >= 1.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_limit_never_reached() {
        let view = ViewSnapshot {
            record_time: "59:59:99".to_string(),
            ..Default::default()
        };
        assert!(!limit_reached(&view, None));
    }

    #[test]
    fn limit_compares_recorded_time() {
        let mut view = ViewSnapshot {
            record_time: "00:29:99".to_string(),
            ..Default::default()
        };
        let limit = Some(MediaTime::from_secs(30));
        assert!(!limit_reached(&view, limit));
        view.record_time = "00:30:00".to_string();
        assert!(limit_reached(&view, limit));
    }

    #[test]
    fn finished_needs_full_progress() {
        let mut view = ViewSnapshot {
            is_playing: true,
            play_progress: 0.4,
            ..Default::default()
        };
        assert!(!playback_finished(&view));
        view.is_playing = false;
        assert!(!playback_finished(&view));
        view.play_progress = 1.0;
        assert!(playback_finished(&view));
    }

    #[tokio::test]
    async fn session_rejects_unknown_platform() {
        let config = AppConfig {
            platform: Some("amiga".to_string()),
            ..AppConfig::defaults()
        };
        let err = Session::open(&config).err().unwrap();
        assert!(err.contains("amiga"));
    }

    #[tokio::test]
    async fn session_uses_configured_dir() {
        let dir = tempfile::tempdir().unwrap();
        let config = AppConfig {
            platform: Some("simulated-decibel".to_string()),
            recordings_dir: Some(dir.path().to_string_lossy().into_owned()),
            ..AppConfig::defaults()
        };
        let session = Session::open(&config).unwrap();
        assert_eq!(session.engine.platform_name(), "simulated-decibel");
        assert!(session.newest_recording().await.is_err());
    }
}
