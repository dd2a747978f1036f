//! Playback source value object

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

/// Where a player reads its media from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AudioSource {
    /// Local file
    File(PathBuf),
    /// Remote media, fetched with the given HTTP headers
    Url {
        url: String,
        headers: BTreeMap<String, String>,
    },
}

impl AudioSource {
    pub fn file(path: impl Into<PathBuf>) -> Self {
        Self::File(path.into())
    }

    pub fn url(url: impl Into<String>) -> Self {
        Self::Url {
            url: url.into(),
            headers: BTreeMap::new(),
        }
    }

    /// Add an HTTP header. No effect on file sources.
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        if let Self::Url { headers, .. } = &mut self {
            headers.insert(name.into(), value.into());
        }
        self
    }

    /// Interpret user input: `http://` and `https://` become remote sources,
    /// anything else a file path.
    pub fn parse(input: &str) -> Self {
        let trimmed = input.trim();
        let lower = trimmed.to_ascii_lowercase();
        if lower.starts_with("http://") || lower.starts_with("https://") {
            Self::url(trimmed)
        } else {
            Self::file(trimmed)
        }
    }

    pub fn is_remote(&self) -> bool {
        matches!(self, Self::Url { .. })
    }

    pub fn as_path(&self) -> Option<&Path> {
        match self {
            Self::File(path) => Some(path),
            Self::Url { .. } => None,
        }
    }
}

impl fmt::Display for AudioSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::File(path) => write!(f, "{}", path.display()),
            Self::Url { url, .. } => write!(f, "{}", url),
        }
    }
}
