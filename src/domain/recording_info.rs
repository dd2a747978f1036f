//! Recording snapshot and file naming

use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::domain::time::MediaTime;

/// Prefix of generated recording file names
pub const RECORDING_FILE_PREFIX: &str = "recording_";

/// Read-only snapshot of a recording on disk. Computed on demand.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RecordingInfo {
    pub file_path: PathBuf,
    /// Duration in milliseconds, zero when it cannot be determined
    pub duration: u64,
    /// Size in bytes
    pub file_size: u64,
    pub formatted_duration: String,
    pub formatted_file_size: String,
}

impl RecordingInfo {
    pub fn new(file_path: PathBuf, duration: MediaTime, file_size: u64) -> Self {
        Self {
            file_path,
            duration: duration.as_millis(),
            file_size,
            formatted_duration: duration.to_string(),
            formatted_file_size: format_file_size(file_size),
        }
    }

    /// One-line summary, e.g. `Duration: 00:05:20 | Size: 1.2 MB`
    pub fn summary(&self) -> String {
        format!(
            "Duration: {} | Size: {}",
            self.formatted_duration, self.formatted_file_size
        )
    }
}

/// Human-readable size (e.g., "1.5 MB")
pub fn format_file_size(bytes: u64) -> String {
    if bytes < 1024 {
        format!("{} B", bytes)
    } else if bytes < 1024 * 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else {
        format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
    }
}

/// `recording_{timestamp_ms}.{extension}`
pub fn recording_file_name(timestamp_ms: u128, extension: &str) -> String {
    format!("{}{}.{}", RECORDING_FILE_PREFIX, timestamp_ms, extension)
}

/// Default output path for a new recording inside `dir`.
pub fn default_recording_path(dir: &Path, extension: &str) -> PathBuf {
    let timestamp_ms = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or_default();
    dir.join(recording_file_name(timestamp_ms, extension))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_size_bytes() {
        assert_eq!(format_file_size(500), "500 B");
    }

    #[test]
    fn file_size_kb() {
        assert_eq!(format_file_size(2048), "2.0 KB");
    }

    #[test]
    fn file_size_mb() {
        assert_eq!(format_file_size(2 * 1024 * 1024), "2.0 MB");
    }

    #[test]
    fn info_formats_fields() {
        let info = RecordingInfo::new(
            PathBuf::from("/data/recording_1.wav"),
            MediaTime::from_millis(320_000),
            1_258_291,
        );
        assert_eq!(info.formatted_duration, "05:20:00");
        assert_eq!(info.summary(), "Duration: 05:20:00 | Size: 1.2 MB");
    }

    #[test]
    fn generated_names_carry_timestamp_and_extension() {
        assert_eq!(recording_file_name(1_700_000_000_123, "m4a"), "recording_1700000000123.m4a");

        let path = default_recording_path(Path::new("/rec"), "wav");
        let name = path.file_name().unwrap().to_string_lossy();
        assert!(path.starts_with("/rec"));
        assert!(name.starts_with(RECORDING_FILE_PREFIX));
        assert!(name.ends_with(".wav"));
    }
}
