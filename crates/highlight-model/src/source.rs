//! Probed properties of a source video.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::segment::TimeRange;
use crate::time::{FrameRate, MediaTime};
use crate::transform::AffineTransform;

/// A source video as seen by the composition pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceMedia {
    /// Location of the media file.
    pub path: PathBuf,

    /// Container duration.
    pub duration: MediaTime,

    /// Where the first video frame sits, measured from the container start.
    ///
    /// Frame 0 of every interval maps here. All track spans below are
    /// relative to the first video frame; add this offset to get the
    /// timestamps a demuxer reports.
    #[serde(default)]
    pub start_offset: MediaTime,

    /// First video stream, if any.
    pub video: Option<VideoTrackInfo>,

    /// First audio stream, if any.
    pub audio: Option<AudioTrackInfo>,
}

/// Video stream properties.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoTrackInfo {
    /// Stream index inside the container.
    pub stream_index: u32,

    /// Coded picture size before any display transform.
    pub natural_width: u32,
    pub natural_height: u32,

    /// Transform the player applies for display.
    pub preferred_transform: AffineTransform,

    /// Nominal frame rate.
    pub frame_rate: FrameRate,

    /// Span covered by the stream.
    pub time_range: TimeRange,

    /// Codec name.
    pub codec: String,
}

/// Audio stream properties.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AudioTrackInfo {
    /// Stream index inside the container.
    pub stream_index: u32,

    /// Span covered by the stream.
    pub time_range: TimeRange,

    /// Codec name.
    pub codec: String,

    pub sample_rate: u32,
    pub channels: u32,
}

impl SourceMedia {
    pub fn has_audio(&self) -> bool {
        self.audio.is_some()
    }

    /// Duration used to validate highlight bounds: the video stream's end
    /// when known, else the container duration.
    pub fn video_duration(&self) -> MediaTime {
        self.video
            .as_ref()
            .map(|video| video.time_range.end())
            .filter(|end| end.is_positive())
            .unwrap_or(self.duration)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_source(audio_secs: Option<i64>) -> SourceMedia {
        SourceMedia {
            path: PathBuf::from("clip.mov"),
            duration: MediaTime::from_secs(12),
            start_offset: MediaTime::ZERO,
            video: Some(VideoTrackInfo {
                stream_index: 0,
                natural_width: 1920,
                natural_height: 1080,
                preferred_transform: AffineTransform::IDENTITY,
                frame_rate: FrameRate::from_fps(30).unwrap(),
                time_range: TimeRange::new(MediaTime::ZERO, MediaTime::from_secs(10)),
                codec: "h264".to_string(),
            }),
            audio: audio_secs.map(|secs| AudioTrackInfo {
                stream_index: 1,
                time_range: TimeRange::new(MediaTime::ZERO, MediaTime::from_secs(secs)),
                codec: "aac".to_string(),
                sample_rate: 44100,
                channels: 2,
            }),
        }
    }

    #[test]
    fn test_video_duration_prefers_stream() {
        assert_eq!(sample_source(None).video_duration(), MediaTime::from_secs(10));

        let mut no_video = sample_source(None);
        no_video.video = None;
        assert_eq!(no_video.video_duration(), MediaTime::from_secs(12));
    }

    #[test]
    fn test_audio_presence() {
        assert!(sample_source(Some(4)).has_audio());
        assert!(!sample_source(None).has_audio());
    }
}
