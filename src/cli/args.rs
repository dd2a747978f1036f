//! CLI argument definitions using Clap

use std::path::PathBuf;

use clap::{ArgAction, Args, Parser, Subcommand};

use crate::domain::config::{AudioEncoding, PlayerSection, RecorderConfig};
use crate::domain::source::AudioSource;
use crate::domain::time::MediaTime;

/// recplay - record and play audio with live progress
#[derive(Parser, Debug)]
#[command(name = "recplay")]
#[command(version)]
#[command(about = "Record and play audio with live progress and metering")]
#[command(long_about = None)]
pub struct Cli {
    /// Platform backend (desktop, simulated-amplitude, simulated-decibel, embedded, web)
    #[arg(long, global = true, value_name = "PLATFORM")]
    pub platform: Option<String>,

    /// Directory for recordings without an explicit output path
    #[arg(long, global = true, value_name = "DIR")]
    pub recordings_dir: Option<PathBuf>,

    /// More diagnostics on stderr (-v debug, -vv trace)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

/// Subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Record from the microphone (Enter pauses/resumes, Ctrl-C stops)
    Record(RecordArgs),
    /// Play a file or URL, or the last recording (Enter pauses/resumes, Ctrl-C stops)
    Play(PlayArgs),
    /// Show duration and size of a recording
    Info(InfoArgs),
    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Args, Debug, Default)]
pub struct RecordArgs {
    /// Output file (default: timestamped file in the recordings dir)
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Stop after this long (e.g., 30s, 1m, 2m30s)
    #[arg(short, long, value_name = "TIME")]
    pub duration: Option<String>,

    /// Sample rate in Hz
    #[arg(long, value_name = "HZ")]
    pub sample_rate: Option<u32>,

    /// Channel count
    #[arg(long, value_parser = clap::value_parser!(u16).range(1..=2))]
    pub channels: Option<u16>,

    /// Encoding (lpcm, flac, aac, alac, opus, amr, ulaw, alaw)
    #[arg(short, long, value_name = "ENCODING")]
    pub encoding: Option<String>,

    /// Show the input level meter
    #[arg(short, long)]
    pub metering: bool,

    /// Progress update interval in milliseconds
    #[arg(long, value_name = "MS")]
    pub interval: Option<u64>,
}

#[derive(Args, Debug, Default)]
pub struct PlayArgs {
    /// File path or http(s) URL (default: the last recording)
    #[arg(value_name = "SOURCE")]
    pub source: Option<String>,

    /// Request header for URL sources, repeatable
    #[arg(short = 'H', long = "header", value_name = "NAME:VALUE", value_parser = parse_header)]
    pub headers: Vec<(String, String)>,

    /// Playback speed (0.5 - 2.0)
    #[arg(short, long)]
    pub speed: Option<f32>,

    /// Volume (0.0 - 1.0)
    #[arg(long)]
    pub volume: Option<f32>,

    /// Start position (MM:SS:CC or e.g. 1m30s)
    #[arg(long, value_name = "TIME")]
    pub start_at: Option<String>,

    /// Progress update interval in milliseconds
    #[arg(long, value_name = "MS")]
    pub interval: Option<u64>,
}

#[derive(Args, Debug, Default)]
pub struct InfoArgs {
    /// Recording to describe (default: the newest recording)
    #[arg(value_name = "PATH")]
    pub path: Option<PathBuf>,

    /// Print JSON instead of text
    #[arg(long)]
    pub json: bool,
}

/// Config action subcommands
#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Create config file with defaults
    Init,
    /// Set a config value
    Set {
        /// Config key
        key: String,
        /// Config value
        value: String,
    },
    /// Get a config value
    Get {
        /// Config key
        key: String,
    },
    /// List all config values
    List,
    /// Show config file path
    Path,
}

/// Parsed record options
#[derive(Debug, Clone, Default)]
pub struct RecordOptions {
    pub output: Option<PathBuf>,
    /// Stop once this much audio is recorded
    pub limit: Option<MediaTime>,
}

/// Parsed play options
#[derive(Debug, Clone, Default)]
pub struct PlayOptions {
    /// `None` plays the newest recording
    pub source: Option<AudioSource>,
    pub speed: Option<f32>,
    pub volume: Option<f32>,
    pub start_at: Option<MediaTime>,
}

impl RecordArgs {
    pub fn options(&self) -> Result<RecordOptions, String> {
        let limit = self
            .duration
            .as_deref()
            .map(str::parse::<MediaTime>)
            .transpose()
            .map_err(|e| e.to_string())?;
        if limit.is_some_and(|t| t.is_zero()) {
            return Err("--duration must be greater than zero".to_string());
        }
        Ok(RecordOptions {
            output: self.output.clone(),
            limit,
        })
    }

    /// CLI overrides for the recorder section
    pub fn recorder_overrides(&self) -> Result<RecorderConfig, String> {
        let encoding = self
            .encoding
            .as_deref()
            .map(str::parse::<AudioEncoding>)
            .transpose()
            .map_err(|e| e.to_string())?;
        Ok(RecorderConfig {
            sample_rate: self.sample_rate,
            channels: self.channels,
            encoding,
            ..Default::default()
        })
    }

    /// CLI overrides for the player section
    pub fn player_overrides(&self) -> PlayerSection {
        PlayerSection {
            update_interval_ms: self.interval,
            metering_enabled: self.metering.then_some(true),
        }
    }
}

impl PlayArgs {
    pub fn options(&self) -> Result<PlayOptions, String> {
        let start_at = self
            .start_at
            .as_deref()
            .map(str::parse::<MediaTime>)
            .transpose()
            .map_err(|e| e.to_string())?;
        Ok(PlayOptions {
            source: self.audio_source()?,
            speed: self.speed,
            volume: self.volume,
            start_at,
        })
    }

    /// Source with any headers attached
    pub fn audio_source(&self) -> Result<Option<AudioSource>, String> {
        let Some(input) = self.source.as_deref() else {
            if !self.headers.is_empty() {
                return Err("--header needs a URL source".to_string());
            }
            return Ok(None);
        };
        let source = AudioSource::parse(input);
        if !self.headers.is_empty() && !source.is_remote() {
            return Err("--header only applies to http(s) sources".to_string());
        }
        Ok(Some(self.headers.iter().fold(source, |source, (name, value)| {
            source.with_header(name.clone(), value.clone())
        })))
    }

    /// CLI overrides for the player section
    pub fn player_overrides(&self) -> PlayerSection {
        PlayerSection {
            update_interval_ms: self.interval,
            metering_enabled: None,
        }
    }
}

/// Parse `NAME:VALUE`
pub fn parse_header(input: &str) -> Result<(String, String), String> {
    let (name, value) = input
        .split_once(':')
        .ok_or_else(|| format!("expected NAME:VALUE, got '{}'", input))?;
    let name = name.trim();
    if name.is_empty() {
        return Err(format!("missing header name in '{}'", input));
    }
    Ok((name.to_string(), value.trim().to_string()))
}

/// Valid config keys
pub const VALID_CONFIG_KEYS: &[&str] = &[
    "platform",
    "recordings_dir",
    "player.update_interval_ms",
    "player.metering_enabled",
    "recorder.sample_rate",
    "recorder.channels",
    "recorder.bit_rate",
    "recorder.encoding",
    "recorder.quality",
    "recorder.input_source",
    "recorder.output_format",
];

/// Check if a config key is valid
pub fn is_valid_config_key(key: &str) -> bool {
    VALID_CONFIG_KEYS.contains(&key)
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_parses_record_defaults() {
        let cli = Cli::parse_from(["recplay", "record"]);
        assert!(cli.platform.is_none());
        assert_eq!(cli.verbose, 0);
        let Commands::Record(args) = cli.command else {
            panic!("Expected record command");
        };
        assert!(args.output.is_none());
        assert!(args.duration.is_none());
        assert!(!args.metering);
    }

    #[test]
    fn cli_parses_record_options() {
        let cli = Cli::parse_from([
            "recplay", "record", "-o", "take.flac", "-d", "30s", "--sample-rate", "48000",
            "--channels", "2", "-e", "flac", "-m", "--interval", "100",
        ]);
        let Commands::Record(args) = cli.command else {
            panic!("Expected record command");
        };
        assert_eq!(args.output, Some(PathBuf::from("take.flac")));
        assert_eq!(args.duration.as_deref(), Some("30s"));
        assert!(args.metering);
        assert_eq!(args.interval, Some(100));

        let recorder = args.recorder_overrides().unwrap();
        assert_eq!(recorder.sample_rate, Some(48_000));
        assert_eq!(recorder.channels, Some(2));
        assert_eq!(recorder.encoding, Some(AudioEncoding::Flac));
    }

    #[test]
    fn record_duration_parsed() {
        let cli = Cli::parse_from(["recplay", "record", "-d", "1m30s"]);
        let Commands::Record(args) = cli.command else {
            panic!("Expected record command");
        };
        let options = args.options().unwrap();
        assert_eq!(options.limit, Some(MediaTime::from_secs(90)));
        assert_eq!(args.player_overrides().metering_enabled, None);
    }

    #[test]
    fn record_duration_invalid() {
        for bad in ["soon", "0s"] {
            let cli = Cli::parse_from(["recplay", "record", "-d", bad]);
            let Commands::Record(args) = cli.command else {
                panic!("Expected record command");
            };
            assert!(args.options().is_err(), "{bad}");
        }
    }

    #[test]
    fn play_start_at_accepts_clock_format() {
        let cli = Cli::parse_from(["recplay", "play", "a.wav", "--start-at", "01:02:50"]);
        let Commands::Play(args) = cli.command else {
            panic!("Expected play command");
        };
        let options = args.options().unwrap();
        assert_eq!(options.start_at, Some(MediaTime::from_millis(62_500)));
        assert_eq!(options.source, Some(AudioSource::file("a.wav")));
    }

    #[test]
    fn cli_rejects_three_channels() {
        assert!(Cli::try_parse_from(["recplay", "record", "--channels", "3"]).is_err());
    }

    #[test]
    fn bad_encoding_is_reported() {
        let cli = Cli::parse_from(["recplay", "record", "-e", "mp3"]);
        let Commands::Record(args) = cli.command else {
            panic!("Expected record command");
        };
        assert!(args.recorder_overrides().unwrap_err().contains("mp3"));
    }

    #[test]
    fn cli_parses_global_flags_after_subcommand() {
        let cli = Cli::parse_from(["recplay", "info", "--platform", "web", "-vv"]);
        assert_eq!(cli.platform.as_deref(), Some("web"));
        assert_eq!(cli.verbose, 2);
    }

    #[test]
    fn play_headers_attach_to_url() {
        let cli = Cli::parse_from([
            "recplay",
            "play",
            "https://cdn.test/a.mp3",
            "-H",
            "Authorization: Bearer t",
        ]);
        let Commands::Play(args) = cli.command else {
            panic!("Expected play command");
        };
        let source = args.audio_source().unwrap().unwrap();
        assert_eq!(
            source,
            AudioSource::url("https://cdn.test/a.mp3").with_header("Authorization", "Bearer t")
        );
    }

    #[test]
    fn play_headers_need_url() {
        let cli = Cli::parse_from(["recplay", "play", "local.wav", "-H", "X-A: 1"]);
        let Commands::Play(args) = cli.command else {
            panic!("Expected play command");
        };
        assert!(args.audio_source().is_err());
    }

    #[test]
    fn header_parsing() {
        assert_eq!(
            parse_header("X-Token: abc:def").unwrap(),
            ("X-Token".to_string(), "abc:def".to_string())
        );
        assert!(parse_header("no-colon").is_err());
        assert!(parse_header(": value").is_err());
    }

    #[test]
    fn cli_parses_config_set() {
        let cli = Cli::parse_from(["recplay", "config", "set", "platform", "web"]);
        if let Commands::Config {
            action: ConfigAction::Set { key, value },
        } = cli.command
        {
            assert_eq!(key, "platform");
            assert_eq!(value, "web");
        } else {
            panic!("Expected Config Set command");
        }
    }

    #[test]
    fn valid_config_keys() {
        assert!(is_valid_config_key("platform"));
        assert!(is_valid_config_key("player.metering_enabled"));
        assert!(is_valid_config_key("recorder.encoding"));
        assert!(!is_valid_config_key("api_key"));
    }

    #[test]
    fn verify_cli() {
        Cli::command().debug_assert();
    }
}
