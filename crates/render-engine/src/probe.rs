//! Source probing with ffprobe.

use std::path::Path;

use serde::Deserialize;
use tokio::process::Command;

use reelcut_common::error::{ReelcutError, ReelcutResult};
use reelcut_highlight_model::{
    AffineTransform, AudioTrackInfo, FrameRate, MediaTime, SourceMedia, TimeRange, VideoTrackInfo,
};

#[derive(Debug, Deserialize)]
struct ProbeOutput {
    #[serde(default)]
    streams: Vec<ProbeStream>,
    #[serde(default)]
    format: Option<ProbeFormat>,
}

#[derive(Debug, Deserialize)]
struct ProbeFormat {
    start_time: Option<String>,
    duration: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ProbeStream {
    index: u32,
    codec_type: Option<String>,
    codec_name: Option<String>,
    width: Option<u32>,
    height: Option<u32>,
    r_frame_rate: Option<String>,
    avg_frame_rate: Option<String>,
    start_time: Option<String>,
    duration: Option<String>,
    sample_rate: Option<String>,
    channels: Option<u32>,
    #[serde(default)]
    tags: ProbeTags,
    #[serde(default)]
    side_data_list: Vec<ProbeSideData>,
}

#[derive(Debug, Default, Deserialize)]
struct ProbeTags {
    rotate: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ProbeSideData {
    rotation: Option<f64>,
}

/// Probe `path` with `ffprobe`.
pub async fn probe_source(path: &Path) -> ReelcutResult<SourceMedia> {
    if !path.exists() {
        return Err(ReelcutError::FileNotFound {
            path: path.to_path_buf(),
        });
    }

    let output = Command::new("ffprobe")
        .args([
            "-v",
            "error",
            "-show_streams",
            "-show_format",
            "-of",
            "json",
        ])
        .arg(path)
        .kill_on_drop(true)
        .output()
        .await
        .map_err(|e| ReelcutError::export(format!("Failed to run ffprobe: {e}")))?;

    if !output.status.success() {
        return Err(ReelcutError::export(format!(
            "ffprobe failed for {} (status {}): {}",
            path.display(),
            output.status,
            String::from_utf8_lossy(&output.stderr).trim()
        )));
    }

    let json = String::from_utf8_lossy(&output.stdout);
    let source = parse_probe_output(path, &json)?;
    tracing::info!(
        path = %path.display(),
        duration_secs = source.duration.as_secs_f64(),
        has_audio = source.has_audio(),
        "Probed source media"
    );
    Ok(source)
}

/// Build a [`SourceMedia`] from `ffprobe -of json` output.
///
/// Stream spans are measured from the first video frame, so frame 0 of an
/// interval is always the first picture even when the container starts its
/// clock elsewhere.
pub fn parse_probe_output(path: &Path, json: &str) -> ReelcutResult<SourceMedia> {
    let probe: ProbeOutput = serde_json::from_str(json)?;

    let container_duration = probe
        .format
        .as_ref()
        .and_then(|f| f.duration.as_deref())
        .and_then(MediaTime::parse_decimal)
        .unwrap_or(MediaTime::ZERO);

    let Some(video_stream) = probe
        .streams
        .iter()
        .find(|s| s.codec_type.as_deref() == Some("video") && s.width.is_some())
    else {
        return Err(ReelcutError::missing_video_track(format!(
            "{} has no video stream",
            path.display()
        )));
    };

    let clock = StreamClock::new(&probe, video_stream, container_duration);
    let video = video_info(video_stream, &clock)?;

    let audio = probe
        .streams
        .iter()
        .find(|s| s.codec_type.as_deref() == Some("audio"))
        .map(|s| AudioTrackInfo {
            stream_index: s.index,
            time_range: clock.range_of(s),
            codec: s.codec_name.clone().unwrap_or_default(),
            sample_rate: s
                .sample_rate
                .as_deref()
                .and_then(|r| r.parse().ok())
                .unwrap_or(0),
            channels: s.channels.unwrap_or(0),
        });

    if !clock.start_offset().is_zero() {
        tracing::debug!(
            path = %path.display(),
            start_offset_secs = clock.start_offset().as_secs_f64(),
            "First video frame does not start the container"
        );
    }

    Ok(SourceMedia {
        path: path.to_path_buf(),
        duration: container_duration,
        start_offset: clock.start_offset(),
        video: Some(video),
        audio,
    })
}

/// Container timestamps every stream span is measured against.
#[derive(Debug, Clone, Copy)]
struct StreamClock {
    /// Timestamp ffmpeg rebases to zero on input.
    container_start: MediaTime,
    container_end: MediaTime,
    /// Timestamp of the first video frame.
    origin: MediaTime,
}

impl StreamClock {
    fn new(probe: &ProbeOutput, video: &ProbeStream, container_duration: MediaTime) -> Self {
        let container_start = probe
            .format
            .as_ref()
            .and_then(|f| f.start_time.as_deref())
            .and_then(MediaTime::parse_decimal)
            .or_else(|| probe.streams.iter().filter_map(stream_start).min())
            .unwrap_or(MediaTime::ZERO);
        let container_end = container_start
            .checked_add(container_duration)
            .unwrap_or(container_duration);
        let origin = stream_start(video).unwrap_or(container_start);
        Self {
            container_start,
            container_end,
            origin,
        }
    }

    /// First video frame relative to the container start, never negative.
    fn start_offset(&self) -> MediaTime {
        self.origin
            .checked_sub(self.container_start)
            .filter(|offset| *offset >= MediaTime::ZERO)
            .unwrap_or(MediaTime::ZERO)
    }

    /// Span of `stream` relative to the first video frame. Streams that
    /// start before the picture get a negative start.
    fn range_of(&self, stream: &ProbeStream) -> TimeRange {
        let absolute_start = stream_start(stream).unwrap_or(self.container_start);
        let duration = stream
            .duration
            .as_deref()
            .and_then(MediaTime::parse_decimal)
            .or_else(|| self.container_end.checked_sub(absolute_start))
            .filter(|d| *d >= MediaTime::ZERO)
            .unwrap_or(MediaTime::ZERO);
        let start = absolute_start
            .checked_sub(self.origin)
            .unwrap_or(MediaTime::ZERO);
        TimeRange::new(start, duration)
    }
}

fn stream_start(stream: &ProbeStream) -> Option<MediaTime> {
    stream
        .start_time
        .as_deref()
        .and_then(MediaTime::parse_decimal)
}

fn video_info(stream: &ProbeStream, clock: &StreamClock) -> ReelcutResult<VideoTrackInfo> {
    let width = stream.width.unwrap_or(0);
    let height = stream.height.unwrap_or(0);

    // Variable-rate streams report 0/0 for r_frame_rate.
    let frame_rate = [&stream.r_frame_rate, &stream.avg_frame_rate]
        .into_iter()
        .flatten()
        .find_map(|raw| FrameRate::parse(raw))
        .ok_or_else(|| {
            ReelcutError::invalid_interval(format!(
                "video stream {} has no usable frame rate ({:?}); frame intervals cannot be placed",
                stream.index, stream.r_frame_rate
            ))
        })?;

    Ok(VideoTrackInfo {
        stream_index: stream.index,
        natural_width: width,
        natural_height: height,
        preferred_transform: preferred_transform(stream, width as f64, height as f64),
        frame_rate,
        time_range: clock.range_of(stream),
        codec: stream.codec_name.clone().unwrap_or_default(),
    })
}

fn preferred_transform(stream: &ProbeStream, width: f64, height: f64) -> AffineTransform {
    if let Some(rotation) = stream.side_data_list.iter().find_map(|d| d.rotation) {
        return AffineTransform::from_display_rotation(rotation, width, height)
            .unwrap_or_else(|| arbitrary_rotation(-rotation));
    }
    if let Some(degrees) = stream.tags.rotate.as_deref().and_then(|r| r.trim().parse::<f64>().ok()) {
        return AffineTransform::from_display_rotation(-degrees, width, height)
            .unwrap_or_else(|| arbitrary_rotation(degrees));
    }
    AffineTransform::IDENTITY
}

/// Linear part of a clockwise rotation by `degrees`. Downstream rejects it
/// unless it happens to be a quarter turn.
fn arbitrary_rotation(degrees: f64) -> AffineTransform {
    let (sin, cos) = degrees.to_radians().sin_cos();
    AffineTransform::new(cos, sin, -sin, cos, 0.0, 0.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use reelcut_common::error::ErrorKind;

    const PORTRAIT_PHONE: &str = r#"{
        "streams": [
            {
                "index": 0, "codec_type": "video", "codec_name": "hevc",
                "width": 1920, "height": 1080,
                "r_frame_rate": "30/1", "avg_frame_rate": "30/1",
                "start_time": "0.000000", "duration": "12.000000",
                "side_data_list": [{"side_data_type": "Display Matrix", "rotation": -90}]
            },
            {
                "index": 1, "codec_type": "audio", "codec_name": "aac",
                "sample_rate": "44100", "channels": 2,
                "start_time": "0.000000", "duration": "11.989333"
            }
        ],
        "format": {"duration": "12.010000"}
    }"#;

    #[test]
    fn test_parse_portrait_recording() {
        let source = parse_probe_output(Path::new("clip.mov"), PORTRAIT_PHONE).unwrap();
        let video = source.video.as_ref().unwrap();
        assert_eq!(video.frame_rate, FrameRate::from_fps(30).unwrap());
        assert_eq!(
            video.preferred_transform,
            AffineTransform::from_clockwise_rotation(90, 1920.0, 1080.0).unwrap()
        );
        assert_eq!(video.time_range.duration, MediaTime::from_secs(12));
        assert_eq!(source.duration, MediaTime::new(1201, 100).unwrap());

        let audio = source.audio.as_ref().unwrap();
        assert_eq!(audio.stream_index, 1);
        assert_eq!(audio.sample_rate, 44100);
        assert_eq!(
            audio.time_range.duration,
            MediaTime::parse_decimal("11.989333").unwrap()
        );
    }

    #[test]
    fn test_rotate_tag_and_container_duration_fallback() {
        let json = r#"{
            "streams": [{"index": 0, "codec_type": "video", "width": 640, "height": 480,
                         "r_frame_rate": "0/0", "avg_frame_rate": "25/1",
                         "tags": {"rotate": "180"}}],
            "format": {"duration": "4.000000"}
        }"#;
        let source = parse_probe_output(Path::new("old.mp4"), json).unwrap();
        let video = source.video.unwrap();
        assert_eq!(video.frame_rate, FrameRate::from_fps(25).unwrap());
        assert_eq!(video.time_range.duration, MediaTime::from_secs(4));
        assert_eq!(
            video.preferred_transform,
            AffineTransform::from_clockwise_rotation(180, 640.0, 480.0).unwrap()
        );
        assert!(source.audio.is_none());
    }

    #[test]
    fn test_audio_only_file_is_rejected() {
        let json = r#"{"streams": [{"index": 0, "codec_type": "audio"}], "format": {}}"#;
        let err = parse_probe_output(Path::new("song.m4a"), json).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MissingVideoTrack);
    }

    #[test]
    fn test_unknown_frame_rate_is_rejected() {
        let json = r#"{"streams": [{"index": 0, "codec_type": "video", "width": 8, "height": 8,
                        "r_frame_rate": "0/0", "avg_frame_rate": "0/0"}]}"#;
        let err = parse_probe_output(Path::new("x.mp4"), json).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidInterval);
    }

    #[test]
    fn test_spans_are_measured_from_first_video_frame() {
        let json = r#"{
            "streams": [
                {"index": 0, "codec_type": "video", "codec_name": "h264",
                 "width": 1280, "height": 720, "r_frame_rate": "30/1",
                 "start_time": "0.500000", "duration": "10.000000"},
                {"index": 1, "codec_type": "audio", "codec_name": "aac",
                 "sample_rate": "48000", "channels": 2,
                 "start_time": "0.200000", "duration": "10.300000"}
            ],
            "format": {"start_time": "0.200000", "duration": "10.300000"}
        }"#;
        let source = parse_probe_output(Path::new("broadcast.ts"), json).unwrap();
        assert_eq!(source.start_offset, MediaTime::new(3, 10).unwrap());

        let video = source.video.as_ref().unwrap();
        assert_eq!(video.time_range.start, MediaTime::ZERO);
        assert_eq!(video.time_range.duration, MediaTime::from_secs(10));
        assert_eq!(source.video_duration(), MediaTime::from_secs(10));

        let audio = source.audio.as_ref().unwrap();
        assert_eq!(audio.time_range.start, MediaTime::new(-3, 10).unwrap());
        assert_eq!(audio.time_range.end(), MediaTime::from_secs(10));
    }

    #[test]
    fn test_container_start_falls_back_to_earliest_stream() {
        let json = r#"{
            "streams": [
                {"index": 0, "codec_type": "video", "width": 640, "height": 360,
                 "r_frame_rate": "25/1", "start_time": "1.400000"},
                {"index": 1, "codec_type": "audio", "start_time": "1.000000"}
            ],
            "format": {"duration": "6.000000"}
        }"#;
        let source = parse_probe_output(Path::new("capture.mkv"), json).unwrap();
        assert_eq!(source.start_offset, MediaTime::new(2, 5).unwrap());
        // Container runs 1.0..7.0, so video covers 1.4..7.0.
        let video = source.video.unwrap();
        assert_eq!(video.time_range.start, MediaTime::ZERO);
        assert_eq!(video.time_range.duration, MediaTime::new(28, 5).unwrap());
        let audio = source.audio.unwrap();
        assert_eq!(audio.time_range.start, MediaTime::new(-2, 5).unwrap());
        assert_eq!(audio.time_range.duration, MediaTime::from_secs(6));
    }

    #[test]
    fn test_odd_rotation_is_not_axis_aligned() {
        let transform = arbitrary_rotation(45.0);
        assert!(!transform.is_axis_aligned());
    }
}
