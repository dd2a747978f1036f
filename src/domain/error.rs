//! Domain error types

use std::fmt;

use thiserror::Error;

use crate::domain::session::InvalidStateTransition;

/// Error when parsing a media time string
#[derive(Debug, Clone, Error)]
#[error("Invalid time format: \"{input}\". Expected MM:SS:CC (e.g., 02:05:03) or <number>s, <number>m, <number>m<number>s (e.g., 30s, 1m, 2m30s)")]
pub struct TimeParseError {
    pub input: String,
}

/// Error when configuration fails
#[derive(Debug, Clone, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadError(String),

    #[error("Failed to parse config file: {0}")]
    ParseError(String),

    #[error("Failed to write config file: {0}")]
    WriteError(String),

    #[error("Invalid config value for '{key}': {message}")]
    ValidationError { key: String, message: String },

    #[error("Config file already exists at: {0}")]
    AlreadyExists(String),
}

/// Failure classes shared by every platform adapter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    StateConflict,
    PermissionDenied,
    ResourceUnavailable,
    UnsupportedOperation,
    NativeFailure,
    InvalidArgument,
}

impl ErrorKind {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::StateConflict => "state_conflict",
            Self::PermissionDenied => "permission_denied",
            Self::ResourceUnavailable => "resource_unavailable",
            Self::UnsupportedOperation => "unsupported_operation",
            Self::NativeFailure => "native_failure",
            Self::InvalidArgument => "invalid_argument",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Result error of every recorder/player control operation.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum AudioError {
    /// Operation is not valid in the current recorder or player state
    #[error(transparent)]
    StateConflict(#[from] InvalidStateTransition),

    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    /// Missing file, busy microphone, unreachable remote source
    #[error("Resource unavailable: {0}")]
    ResourceUnavailable(String),

    /// The platform (or its OS version) lacks the capability
    #[error("Unsupported operation: {0}")]
    Unsupported(String),

    /// Opaque failure reported by the native layer
    #[error("Native failure: {0}")]
    NativeFailure(String),

    /// Out-of-range volume, speed, or similar
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
}

impl AudioError {
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::StateConflict(_) => ErrorKind::StateConflict,
            Self::PermissionDenied(_) => ErrorKind::PermissionDenied,
            Self::ResourceUnavailable(_) => ErrorKind::ResourceUnavailable,
            Self::Unsupported(_) => ErrorKind::UnsupportedOperation,
            Self::NativeFailure(_) => ErrorKind::NativeFailure,
            Self::InvalidArgument(_) => ErrorKind::InvalidArgument,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds_follow_variants() {
        let conflict: AudioError = InvalidStateTransition::new("recording", "start recording").into();
        assert_eq!(conflict.kind(), ErrorKind::StateConflict);
        assert_eq!(
            AudioError::InvalidArgument("speed".into()).kind(),
            ErrorKind::InvalidArgument
        );
        assert_eq!(
            AudioError::Unsupported("pause".into()).kind(),
            ErrorKind::UnsupportedOperation
        );
    }

    #[test]
    fn state_conflict_message_is_descriptive() {
        let err: AudioError = InvalidStateTransition::new("idle", "pause recording").into();
        assert_eq!(
            err.to_string(),
            "Invalid state transition: cannot pause recording while idle"
        );
    }

    #[test]
    fn time_parse_error_names_input() {
        let err = TimeParseError {
            input: "1:2".to_string(),
        };
        assert!(err.to_string().contains("\"1:2\""));
    }
}
