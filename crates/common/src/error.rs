//! Error types shared across Reelcut crates.

use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Top-level error type for Reelcut operations.
#[derive(Debug, thiserror::Error)]
pub enum ReelcutError {
    #[error("Invalid interval: {message}")]
    InvalidInterval { message: String },

    #[error("Missing video track: {message}")]
    MissingVideoTrack { message: String },

    #[error("Track copy failed for segment {segment}: {message}")]
    TrackCopyFailure { segment: u32, message: String },

    #[error("Export failed: {message}")]
    Export { message: String },

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Export cancelled")]
    Cancelled,

    #[error("File not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Result type alias using ReelcutError.
pub type ReelcutResult<T> = Result<T, ReelcutError>;

/// Coarse classification of a failure, stable across the error's message.
///
/// Callers map these to user-facing messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    InvalidInterval,
    MissingVideoTrack,
    TrackCopyFailure,
    ExportFailure,
    ConfigurationError,
    Cancelled,
}

impl ErrorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorKind::InvalidInterval => "invalid_interval",
            ErrorKind::MissingVideoTrack => "missing_video_track",
            ErrorKind::TrackCopyFailure => "track_copy_failure",
            ErrorKind::ExportFailure => "export_failure",
            ErrorKind::ConfigurationError => "configuration_error",
            ErrorKind::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl ReelcutError {
    pub fn invalid_interval(msg: impl Into<String>) -> Self {
        Self::InvalidInterval {
            message: msg.into(),
        }
    }

    pub fn missing_video_track(msg: impl Into<String>) -> Self {
        Self::MissingVideoTrack {
            message: msg.into(),
        }
    }

    pub fn track_copy(segment: u32, msg: impl Into<String>) -> Self {
        Self::TrackCopyFailure {
            segment,
            message: msg.into(),
        }
    }

    pub fn export(msg: impl Into<String>) -> Self {
        Self::Export {
            message: msg.into(),
        }
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    /// Classify this error.
    ///
    /// I/O and serialization failures only happen while writing or probing
    /// media, so they fold into `ExportFailure`.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidInterval { .. } => ErrorKind::InvalidInterval,
            Self::MissingVideoTrack { .. } => ErrorKind::MissingVideoTrack,
            Self::TrackCopyFailure { .. } => ErrorKind::TrackCopyFailure,
            Self::Config { .. } => ErrorKind::ConfigurationError,
            Self::Cancelled => ErrorKind::Cancelled,
            Self::Export { .. }
            | Self::FileNotFound { .. }
            | Self::Io(_)
            | Self::Json(_)
            | Self::Other(_) => ErrorKind::ExportFailure,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_mapping() {
        assert_eq!(
            ReelcutError::invalid_interval("bad").kind(),
            ErrorKind::InvalidInterval
        );
        assert_eq!(
            ReelcutError::config("empty").kind(),
            ErrorKind::ConfigurationError
        );
        assert_eq!(ReelcutError::Cancelled.kind(), ErrorKind::Cancelled);
        let io = std::io::Error::new(std::io::ErrorKind::Other, "disk full");
        assert_eq!(ReelcutError::from(io).kind(), ErrorKind::ExportFailure);
    }

    #[test]
    fn test_display_includes_diagnostic() {
        let err = ReelcutError::track_copy(3, "audio ends at 4.2s");
        assert_eq!(
            err.to_string(),
            "Track copy failed for segment 3: audio ends at 4.2s"
        );
        assert_eq!(err.kind().to_string(), "track_copy_failure");
    }
}
