//! Track composer: turns the segment list into edit instructions.
//!
//! Nothing is decoded here. The composition only records which source span
//! lands where on the output timeline; the export backend realizes it.

use serde::Serialize;

use reelcut_common::error::{ReelcutError, ReelcutResult};
use reelcut_highlight_model::{
    AffineTransform, AudioTrackInfo, MediaTime, Segment, SourceMedia, TimeRange, VideoTrackInfo,
};

use crate::orientation::{Orientation, ResolvedOrientation};

/// Audio may start or stop this many milliseconds short of the picture and
/// still be copied. Encoder priming routinely offsets the two by a few
/// audio frames.
const AUDIO_SLACK_MS: i64 = 100;

/// Media type of a composition track.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TrackKind {
    Video,
    Audio,
}

/// One entry of a composition track.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TrackEdit {
    /// Copy `source` from the source stream so it starts at `output_start`.
    Media {
        segment_index: u32,
        source: TimeRange,
        output_start: MediaTime,
    },
    /// Nothing to copy for this span; the renderer fills it (silence for audio).
    Empty { segment_index: u32, output: TimeRange },
}

impl TrackEdit {
    pub fn segment_index(&self) -> u32 {
        match self {
            TrackEdit::Media { segment_index, .. } | TrackEdit::Empty { segment_index, .. } => {
                *segment_index
            }
        }
    }

    pub fn output_range(&self) -> TimeRange {
        match self {
            TrackEdit::Media {
                source,
                output_start,
                ..
            } => TimeRange::new(*output_start, source.duration),
            TrackEdit::Empty { output, .. } => *output,
        }
    }
}

/// An ordered, gapless list of edits for one media type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CompositionTrack {
    pub kind: TrackKind,

    /// Stream in the source file the media edits read from.
    pub source_stream: u32,

    pub edits: Vec<TrackEdit>,
}

impl CompositionTrack {
    fn new(kind: TrackKind, source_stream: u32) -> Self {
        Self {
            kind,
            source_stream,
            edits: Vec::new(),
        }
    }

    /// End of the last edit.
    pub fn duration(&self) -> MediaTime {
        self.edits
            .last()
            .map(|edit| edit.output_range().end())
            .unwrap_or(MediaTime::ZERO)
    }

    fn insert_time_range(&mut self, segment_index: u32, source: TimeRange, at: MediaTime) {
        debug_assert_eq!(at, self.duration(), "edits must be appended contiguously");
        self.edits.push(TrackEdit::Media {
            segment_index,
            source,
            output_start: at,
        });
    }

    fn insert_empty(&mut self, segment_index: u32, output: TimeRange) {
        debug_assert_eq!(output.start, self.duration(), "edits must be appended contiguously");
        self.edits.push(TrackEdit::Empty {
            segment_index,
            output,
        });
    }

    /// Number of edits that copy real media.
    pub fn media_edit_count(&self) -> usize {
        self.edits
            .iter()
            .filter(|edit| matches!(edit, TrackEdit::Media { .. }))
            .count()
    }
}

/// Display transform for one segment's span of output time.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct LayerInstruction {
    pub segment_index: u32,

    /// Output span; the transform takes effect at `time_range.start`.
    pub time_range: TimeRange,

    pub transform: AffineTransform,
    pub orientation: Orientation,
}

/// Non-fatal problems met while composing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CompositionNote {
    /// The segment plays without its audio.
    AudioOmitted {
        segment_index: u32,
        label: String,
        reason: String,
    },
}

/// The full edit description handed to the exporter.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Composition {
    pub video: CompositionTrack,

    /// Absent when the source has no audio stream.
    pub audio: Option<CompositionTrack>,

    /// One per segment, in output order.
    pub instructions: Vec<LayerInstruction>,

    pub duration: MediaTime,

    /// Offset of the first video frame from the container start. Edit
    /// sources are relative to that frame; the renderer adds this back.
    pub source_offset: MediaTime,

    pub notes: Vec<CompositionNote>,
}

impl Composition {
    pub fn segment_count(&self) -> usize {
        self.video.edits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.duration.is_zero()
    }
}

/// Build the composition for `segments`, in order.
///
/// A missing video stream is fatal. A missing audio stream simply yields a
/// video-only composition. When a single segment's audio cannot be copied
/// the segment keeps its picture and an empty audio edit holds its place,
/// so later segments stay in sync.
pub fn compose_tracks(
    source: &SourceMedia,
    segments: &[Segment],
    orientation: &ResolvedOrientation,
) -> ReelcutResult<Composition> {
    let video_info = source.video.as_ref().ok_or_else(|| {
        ReelcutError::missing_video_track(format!(
            "{} has no decodable video stream",
            source.path.display()
        ))
    })?;

    // Allow rounding of the first and last frame boundary.
    let tolerance = orientation.render_target.frame_duration;
    let audio_tolerance = MediaTime::new(AUDIO_SLACK_MS, 1000)
        .map_or(tolerance, |slack| slack.max(tolerance));

    let mut video = CompositionTrack::new(TrackKind::Video, video_info.stream_index);
    let mut audio = source
        .audio
        .as_ref()
        .map(|info| CompositionTrack::new(TrackKind::Audio, info.stream_index));
    let mut instructions = Vec::with_capacity(segments.len());
    let mut notes = Vec::new();

    for segment in segments {
        let source_range = copy_video(video_info, segment, tolerance)?;
        video.insert_time_range(segment.index, source_range, segment.output_start);

        if let (Some(track), Some(info)) = (audio.as_mut(), source.audio.as_ref()) {
            match copy_audio(info, segment, audio_tolerance) {
                Ok(range) => track.insert_time_range(segment.index, range, segment.output_start),
                Err(err) => {
                    tracing::warn!(
                        segment = segment.index,
                        label = %segment.label,
                        error = %err,
                        "Audio copy failed; segment will play without sound"
                    );
                    notes.push(CompositionNote::AudioOmitted {
                        segment_index: segment.index,
                        label: segment.label.clone(),
                        reason: err.to_string(),
                    });
                    track.insert_empty(segment.index, segment.output_range());
                }
            }
        }

        instructions.push(LayerInstruction {
            segment_index: segment.index,
            time_range: segment.output_range(),
            transform: orientation.transform,
            orientation: orientation.orientation,
        });
    }

    let duration = video.duration();
    tracing::info!(
        segments = segments.len(),
        has_audio = audio.is_some(),
        audio_omitted = notes.len(),
        duration_secs = duration.as_secs_f64(),
        "Composition built"
    );

    Ok(Composition {
        video,
        audio,
        instructions,
        duration,
        source_offset: source.start_offset,
        notes,
    })
}

/// Whether `range` lies inside `track` widened by `tolerance` at both ends.
fn fits(track: &TimeRange, range: &TimeRange, tolerance: MediaTime) -> bool {
    let (Some(start), Some(end)) = (
        track.start.checked_sub(tolerance),
        track.end().checked_add(tolerance),
    ) else {
        return false;
    };
    TimeRange::from_bounds(start, end).contains_range(range)
}

fn copy_video(
    info: &VideoTrackInfo,
    segment: &Segment,
    tolerance: MediaTime,
) -> ReelcutResult<TimeRange> {
    let range = segment.source_range();
    if !fits(&info.time_range, &range, tolerance) {
        return Err(ReelcutError::invalid_interval(format!(
            "segment {} ({}) needs video {:.3}s..{:.3}s but the stream covers {:.3}s..{:.3}s",
            segment.index,
            segment.label,
            range.start.as_secs_f64(),
            range.end().as_secs_f64(),
            info.time_range.start.as_secs_f64(),
            info.time_range.end().as_secs_f64(),
        )));
    }
    Ok(range)
}

fn copy_audio(
    info: &AudioTrackInfo,
    segment: &Segment,
    tolerance: MediaTime,
) -> ReelcutResult<TimeRange> {
    let range = segment.source_range();
    if !fits(&info.time_range, &range, tolerance) {
        return Err(ReelcutError::track_copy(
            segment.index,
            format!(
                "audio stream covers {:.3}s..{:.3}s but the segment needs {:.3}s..{:.3}s",
                info.time_range.start.as_secs_f64(),
                info.time_range.end().as_secs_f64(),
                range.start.as_secs_f64(),
                range.end().as_secs_f64(),
            ),
        ));
    }
    Ok(range)
}
