//! Recordings directory helpers

use std::path::{Path, PathBuf};

use tokio::fs;

use super::config::APP_DIR;
use crate::domain::recording_info::RECORDING_FILE_PREFIX;

/// `$XDG_DATA_HOME/recplay/recordings`, or a relative fallback when the
/// data dir is unknown.
pub fn default_recordings_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_DIR)
        .join("recordings")
}

/// Most recently modified generated recording in `dir`.
pub async fn latest_recording(dir: &Path) -> std::io::Result<Option<PathBuf>> {
    let mut entries = match fs::read_dir(dir).await {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e),
    };

    let mut latest: Option<(std::time::SystemTime, PathBuf)> = None;
    while let Some(entry) = entries.next_entry().await? {
        let is_recording = entry
            .file_name()
            .to_str()
            .is_some_and(|name| name.starts_with(RECORDING_FILE_PREFIX));
        if !is_recording {
            continue;
        }
        let metadata = entry.metadata().await?;
        if !metadata.is_file() {
            continue;
        }
        let modified = metadata.modified()?;
        if latest.as_ref().map_or(true, |(best, _)| modified > *best) {
            latest = Some((modified, entry.path()));
        }
    }
    Ok(latest.map(|(_, path)| path))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{Duration, SystemTime};

    #[test]
    fn default_dir_ends_with_recordings() {
        let dir = default_recordings_dir();
        assert!(dir.ends_with("recplay/recordings"));
    }

    #[tokio::test]
    async fn missing_dir_has_no_latest() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope");
        assert_eq!(latest_recording(&missing).await.unwrap(), None);
    }

    #[tokio::test]
    async fn picks_newest_generated_file() {
        let dir = tempfile::tempdir().unwrap();
        let older = dir.path().join("recording_100.wav");
        let newer = dir.path().join("recording_200.wav");
        let foreign = dir.path().join("notes.txt");
        for path in [&older, &newer, &foreign] {
            std::fs::write(path, b"x").unwrap();
        }

        let base = SystemTime::now() - Duration::from_secs(60);
        let set = |path: &Path, offset: u64| {
            let file = std::fs::File::options().write(true).open(path).unwrap();
            file.set_modified(base + Duration::from_secs(offset)).unwrap();
        };
        set(&older, 1);
        set(&newer, 2);
        set(&foreign, 3);

        assert_eq!(latest_recording(dir.path()).await.unwrap(), Some(newer));
    }
}
