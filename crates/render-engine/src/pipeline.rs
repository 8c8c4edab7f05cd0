//! End-to-end entry points.

use std::path::PathBuf;

use serde::Serialize;

use reelcut_common::config::{ExportProfile, OverlayStyle};
use reelcut_common::error::{ReelcutError, ReelcutResult};
use reelcut_highlight_model::{HighlightRecord, Interval, MediaTime, Segment, SourceMedia};

use crate::compositor::{compose_tracks, Composition};
use crate::export::{CancelToken, ExportOutcome, HighlightExporter, RenderBackend};
use crate::normalize::{normalize_intervals, NormalizationNote};
use crate::orientation::{resolve_orientation, ResolvedOrientation};
use crate::overlay::{schedule_overlays, OverlayPlan};
use crate::timeline::build_timeline;

/// Everything decided before encoding starts.
///
/// Building a plan is synchronous and touches no files, so the same source
/// and intervals always give the same plan.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HighlightPlan {
    pub source: SourceMedia,
    pub notes: Vec<NormalizationNote>,
    pub segments: Vec<Segment>,
    pub orientation: ResolvedOrientation,
    pub composition: Composition,
    pub overlays: OverlayPlan,
}

impl HighlightPlan {
    pub fn total_duration(&self) -> MediaTime {
        self.composition.duration
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn labels(&self) -> Vec<String> {
        self.segments.iter().map(|s| s.label.clone()).collect()
    }

    /// Record describing this plan exported to `output`.
    pub fn record(&self, title: impl Into<String>, output: impl Into<PathBuf>) -> HighlightRecord {
        HighlightRecord::new(
            title,
            self.source.path.clone(),
            output,
            self.total_duration().as_secs_f64(),
            self.labels(),
        )
    }

    /// Run `exporter` on this plan.
    pub async fn export_with(
        &self,
        exporter: &HighlightExporter,
        destination: impl Into<PathBuf>,
    ) -> ExportOutcome {
        exporter
            .export(
                &self.source.path,
                &self.composition,
                &self.orientation.render_target,
                &self.overlays,
                destination,
            )
            .await
    }
}

/// Normalize, lay out, compose and schedule overlays for `intervals`.
pub fn plan_highlights(
    source: &SourceMedia,
    intervals: &[Interval],
    style: &OverlayStyle,
) -> ReelcutResult<HighlightPlan> {
    let video = source.video.as_ref().ok_or_else(|| {
        ReelcutError::missing_video_track(format!(
            "{} has no decodable video stream",
            source.path.display()
        ))
    })?;

    let normalized = normalize_intervals(intervals, video.frame_rate, source.video_duration())?;
    let segments = build_timeline(&normalized.intervals);
    let orientation = resolve_orientation(source)?;
    let composition = compose_tracks(source, &segments, &orientation)?;
    let overlays = schedule_overlays(&segments, &orientation.render_target, style);

    tracing::info!(
        source = %source.path.display(),
        segments = segments.len(),
        duration_secs = composition.duration.as_secs_f64(),
        "Highlight plan ready"
    );

    Ok(HighlightPlan {
        source: source.clone(),
        notes: normalized.notes,
        segments,
        orientation,
        composition,
        overlays,
    })
}

/// Export `plan` to `destination` with a fresh exporter.
pub async fn export_highlights(
    plan: &HighlightPlan,
    destination: impl Into<PathBuf>,
    backend: Box<dyn RenderBackend>,
    profile: ExportProfile,
    cancel: CancelToken,
) -> ExportOutcome {
    let exporter = HighlightExporter::new(backend, profile).with_cancel_token(cancel);
    plan.export_with(&exporter, destination).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use reelcut_common::error::ErrorKind;
    use reelcut_highlight_model::{AffineTransform, FrameRate, TimeRange, VideoTrackInfo};

    fn source() -> SourceMedia {
        SourceMedia {
            path: PathBuf::from("game.mp4"),
            duration: MediaTime::from_secs(60),
            start_offset: MediaTime::ZERO,
            video: Some(VideoTrackInfo {
                stream_index: 0,
                natural_width: 1280,
                natural_height: 720,
                preferred_transform: AffineTransform::IDENTITY,
                frame_rate: FrameRate::from_fps(30).unwrap(),
                time_range: TimeRange::new(MediaTime::ZERO, MediaTime::from_secs(60)),
                codec: "h264".to_string(),
            }),
            audio: None,
        }
    }

    #[test]
    fn test_plan_is_deterministic() {
        let intervals = [
            Interval::new(300, 330),
            Interval::new(0, 45),
            Interval::new(900, 1000),
        ];
        let a = plan_highlights(&source(), &intervals, &OverlayStyle::default()).unwrap();
        let b = plan_highlights(&source(), &intervals, &OverlayStyle::default()).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.labels(), vec!["0-45", "300-330", "900-1000"]);
        assert_eq!(a.notes.len(), 1);
        // 45 + 30 + 100 frames at 30 fps
        assert_eq!(a.total_duration(), MediaTime::new(35, 6).unwrap());
    }

    #[test]
    fn test_plan_rejects_overlap() {
        let err = plan_highlights(
            &source(),
            &[Interval::new(0, 40), Interval::new(30, 60)],
            &OverlayStyle::default(),
        )
        .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidInterval);
    }

    #[test]
    fn test_record_carries_labels() {
        let plan = plan_highlights(&source(), &[Interval::new(0, 30)], &OverlayStyle::default())
            .unwrap();
        let record = plan.record("Saturday match", "out.mp4");
        assert_eq!(record.segments, vec!["0-30"]);
        assert_eq!(record.duration_secs, 1.0);
        assert_eq!(record.source, PathBuf::from("game.mp4"));
    }
}
