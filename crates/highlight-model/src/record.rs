//! Highlight records persisted after a successful export.
//!
//! The pipeline itself never stores anything beyond the output video; the
//! caller writes one of these next to it so a library view can list past
//! highlight reels without reprobing the media.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::interval::ModelError;

/// Summary of one exported highlight reel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HighlightRecord {
    /// Human-readable title.
    pub title: String,

    /// Creation timestamp (ISO 8601).
    pub created_at: String,

    /// Source video the highlights were cut from.
    pub source: PathBuf,

    /// Exported video.
    pub output: PathBuf,

    /// Total output duration in seconds.
    pub duration_secs: f64,

    /// Segment labels in output order.
    pub segments: Vec<String>,
}

impl HighlightRecord {
    /// Create a record stamped with the current time.
    pub fn new(
        title: impl Into<String>,
        source: impl Into<PathBuf>,
        output: impl Into<PathBuf>,
        duration_secs: f64,
        segments: Vec<String>,
    ) -> Self {
        Self {
            title: title.into(),
            created_at: chrono::Utc::now().to_rfc3339(),
            source: source.into(),
            output: output.into(),
            duration_secs,
            segments,
        }
    }

    /// Conventional sidecar location for an exported video.
    pub fn sidecar_path(output: &Path) -> PathBuf {
        output.with_extension("record.json")
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ModelError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| ModelError::IoError {
            path: path.to_path_buf(),
            source: e,
        })?;
        serde_json::from_str(&content).map_err(|e| ModelError::ParseError {
            path: path.to_path_buf(),
            source: e,
        })
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ModelError> {
        let path = path.as_ref();
        let json = serde_json::to_string_pretty(self).map_err(|e| ModelError::ParseError {
            path: path.to_path_buf(),
            source: e,
        })?;
        std::fs::write(path, json).map_err(|e| ModelError::IoError {
            path: path.to_path_buf(),
            source: e,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_save_and_load() {
        let dir = std::env::temp_dir().join(format!("reelcut-record-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let output = dir.join("reel.mp4");
        let record = HighlightRecord::new(
            "Match highlights",
            "/videos/match.mov",
            &output,
            2.0,
            vec!["0-30".to_string(), "60-90".to_string()],
        );

        let sidecar = HighlightRecord::sidecar_path(&output);
        assert_eq!(sidecar.file_name().unwrap(), "reel.record.json");
        record.save(&sidecar).unwrap();
        let loaded = HighlightRecord::load(&sidecar).unwrap();
        assert_eq!(loaded, record);
        assert!(chrono::DateTime::parse_from_rfc3339(&loaded.created_at).is_ok());

        std::fs::remove_dir_all(&dir).ok();
    }
}
