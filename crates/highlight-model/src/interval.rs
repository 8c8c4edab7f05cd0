//! Highlight intervals reported by the analysis service.
//!
//! The service answers an upload with a JSON body of the form
//! `{"highlights":[{"startFrame":0,"endFrame":30}, ...]}`. Frames are in
//! the source video's native numbering; intervals are half-open
//! (`endFrame` is the first frame *not* included).

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// One highlight as frame indices.
///
/// The derived ordering sorts by `start_frame`, then `end_frame`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Interval {
    pub start_frame: u64,
    pub end_frame: u64,
}

impl Interval {
    pub fn new(start_frame: u64, end_frame: u64) -> Self {
        Self {
            start_frame,
            end_frame,
        }
    }

    /// Label burned into the output while this interval plays.
    pub fn label(&self) -> String {
        format!("{}-{}", self.start_frame, self.end_frame)
    }

    /// Number of frames covered; zero for malformed intervals.
    pub fn frame_len(&self) -> u64 {
        self.end_frame.saturating_sub(self.start_frame)
    }

    pub fn is_well_formed(&self) -> bool {
        self.end_frame > self.start_frame
    }

    /// Whether the two half-open ranges share at least one frame.
    pub fn overlaps(&self, other: &Interval) -> bool {
        self.start_frame < other.end_frame && other.start_frame < self.end_frame
    }
}

/// Response body of the analysis service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HighlightsResponse {
    pub highlights: Vec<Interval>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum HighlightsPayload {
    Wrapped(HighlightsResponse),
    Bare(Vec<Interval>),
}

/// Parse intervals from either the service response or a bare JSON array.
pub fn parse_highlights(json: &str) -> Result<Vec<Interval>, serde_json::Error> {
    let payload: HighlightsPayload = serde_json::from_str(json)?;
    Ok(match payload {
        HighlightsPayload::Wrapped(response) => response.highlights,
        HighlightsPayload::Bare(intervals) => intervals,
    })
}

/// Read and parse an interval file.
pub fn load_highlights(path: impl AsRef<Path>) -> Result<Vec<Interval>, ModelError> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path).map_err(|e| ModelError::IoError {
        path: path.to_path_buf(),
        source: e,
    })?;
    parse_highlights(&content).map_err(|e| ModelError::ParseError {
        path: path.to_path_buf(),
        source: e,
    })
}

/// Errors that can occur when reading or writing model files.
#[derive(Debug, thiserror::Error)]
pub enum ModelError {
    #[error("I/O error at {path}: {source}")]
    IoError {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Parse error in {path}: {source}")]
    ParseError {
        path: PathBuf,
        source: serde_json::Error,
    },
}
