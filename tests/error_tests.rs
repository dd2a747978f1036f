//! Error scenario integration tests

use std::path::Path;
use std::process::Stdio;

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

fn recplay_bin(home: &Path) -> Command {
    let mut std_cmd = std::process::Command::new(env!("CARGO_BIN_EXE_recplay"));
    std_cmd
        .env("HOME", home)
        .env("XDG_CONFIG_HOME", home.join("config"))
        .env_remove("RECPLAY_PLATFORM")
        .env_remove("RECPLAY_RECORDINGS_DIR")
        .stdin(Stdio::null());
    Command::from_std(std_cmd)
}

#[test]
fn config_get_unknown_key() {
    let home = TempDir::new().unwrap();
    recplay_bin(home.path())
        .args(["config", "get", "unknown_key"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Unknown key").and(predicate::str::contains("Valid keys")));
}

#[test]
fn config_set_unknown_key() {
    let home = TempDir::new().unwrap();
    recplay_bin(home.path())
        .args(["config", "set", "api_key", "value"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Unknown key"));
}

#[test]
fn config_set_invalid_channels() {
    let home = TempDir::new().unwrap();
    recplay_bin(home.path())
        .args(["config", "set", "recorder.channels", "3"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("1 or 2"));
    assert!(!home.path().join("config/recplay/config.toml").exists());
}

#[test]
fn config_set_invalid_boolean() {
    let home = TempDir::new().unwrap();
    recplay_bin(home.path())
        .args(["config", "set", "player.metering_enabled", "maybe"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("'true' or 'false'"));
}

#[test]
fn config_set_unknown_platform() {
    let home = TempDir::new().unwrap();
    recplay_bin(home.path())
        .args(["config", "set", "platform", "amiga"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid platform 'amiga'"));
}

#[test]
fn unknown_platform_is_usage_error() {
    let home = TempDir::new().unwrap();
    recplay_bin(home.path())
        .args(["--platform", "amiga", "info", "clip.wav"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("amiga"));
}

#[test]
fn info_missing_file() {
    let home = TempDir::new().unwrap();
    recplay_bin(home.path())
        .args(["--platform", "simulated-amplitude", "info"])
        .arg(home.path().join("nope.wav"))
        .assert()
        .code(1)
        .stderr(predicate::str::contains("No such file"));
}

#[test]
fn info_without_recordings() {
    let home = TempDir::new().unwrap();
    recplay_bin(home.path())
        .args(["--platform", "simulated-amplitude", "--recordings-dir"])
        .arg(home.path())
        .arg("info")
        .assert()
        .code(1)
        .stderr(predicate::str::contains("No recordings in"));
}

#[test]
fn record_rejects_three_channels() {
    let home = TempDir::new().unwrap();
    recplay_bin(home.path())
        .args(["record", "--channels", "3"])
        .assert()
        .code(2);
}

#[test]
fn record_rejects_zero_duration() {
    let home = TempDir::new().unwrap();
    recplay_bin(home.path())
        .args(["--platform", "simulated-amplitude", "record", "--duration", "0s"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("greater than zero"));
}

#[test]
fn play_header_needs_url() {
    let home = TempDir::new().unwrap();
    recplay_bin(home.path())
        .args([
            "--platform",
            "simulated-amplitude",
            "play",
            "clip.wav",
            "--header",
            "Authorization: Bearer abc",
        ])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("--header"));
}

#[test]
fn play_missing_file_fails() {
    let home = TempDir::new().unwrap();
    recplay_bin(home.path())
        .args(["--platform", "simulated-amplitude", "play"])
        .arg(home.path().join("nope.wav"))
        .assert()
        .code(1);
}

#[test]
fn web_platform_cannot_record() {
    let home = TempDir::new().unwrap();
    recplay_bin(home.path())
        .args(["--platform", "web", "--recordings-dir"])
        .arg(home.path())
        .args(["record", "--duration", "1s"])
        .assert()
        .code(1)
        .stderr(predicate::str::is_empty().not());
}

#[test]
fn config_get_reports_invalid_file_value() {
    let home = TempDir::new().unwrap();
    let dir = home.path().join("config/recplay");
    std::fs::create_dir_all(&dir).unwrap();
    std::fs::write(dir.join("config.toml"), "[recorder]\nchannels = 6\n").unwrap();

    recplay_bin(home.path())
        .args(["config", "get", "recorder.channels"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("recorder.channels").and(predicate::str::contains("1 or 2")));
}
