//! Orientation resolver: one display transform for the whole output.
//!
//! The preferred transform is a property of the source video, not of any
//! one segment, so it is read once here and every layer instruction reuses
//! the result.

use serde::Serialize;

use reelcut_common::error::{ReelcutError, ReelcutResult};
use reelcut_highlight_model::{AffineTransform, FrameRate, MediaTime, SourceMedia};

/// The eight axis-aligned display orientations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Orientation {
    Identity,
    /// Quarter turn clockwise (portrait phone recordings).
    Rotate90,
    Rotate180,
    /// Quarter turn counter-clockwise.
    Rotate270,
    FlipHorizontal,
    FlipVertical,
    /// Mirror across the main diagonal.
    Transpose,
    /// Mirror across the anti-diagonal.
    AntiTranspose,
}

impl Orientation {
    /// Classify the linear part of `transform`. Translation is ignored.
    pub fn classify(transform: &AffineTransform) -> Option<Self> {
        if !transform.is_axis_aligned() {
            return None;
        }
        let sign = |v: f64| v.round() as i8;
        let orientation = match (
            sign(transform.a),
            sign(transform.b),
            sign(transform.c),
            sign(transform.d),
        ) {
            (1, 0, 0, 1) => Orientation::Identity,
            (0, 1, -1, 0) => Orientation::Rotate90,
            (-1, 0, 0, -1) => Orientation::Rotate180,
            (0, -1, 1, 0) => Orientation::Rotate270,
            (-1, 0, 0, 1) => Orientation::FlipHorizontal,
            (1, 0, 0, -1) => Orientation::FlipVertical,
            (0, 1, 1, 0) => Orientation::Transpose,
            (0, -1, -1, 0) => Orientation::AntiTranspose,
            _ => return None,
        };
        Some(orientation)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Orientation::Identity => "identity",
            Orientation::Rotate90 => "rotate_90",
            Orientation::Rotate180 => "rotate_180",
            Orientation::Rotate270 => "rotate_270",
            Orientation::FlipHorizontal => "flip_horizontal",
            Orientation::FlipVertical => "flip_vertical",
            Orientation::Transpose => "transpose",
            Orientation::AntiTranspose => "anti_transpose",
        }
    }

    /// Whether width and height trade places.
    pub fn swaps_axes(self) -> bool {
        matches!(
            self,
            Orientation::Rotate90
                | Orientation::Rotate270
                | Orientation::Transpose
                | Orientation::AntiTranspose
        )
    }
}

/// Size and frame timing of the rendered output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RenderTarget {
    pub width: u32,
    pub height: u32,
    pub frame_rate: FrameRate,
    pub frame_duration: MediaTime,
}

/// Result of reading the source's display transform.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ResolvedOrientation {
    pub transform: AffineTransform,
    pub orientation: Orientation,
    pub render_target: RenderTarget,
}

/// Read natural size and preferred transform once and derive the render
/// target as the transformed bounding box.
pub fn resolve_orientation(source: &SourceMedia) -> ReelcutResult<ResolvedOrientation> {
    let video = source.video.as_ref().ok_or_else(|| {
        ReelcutError::missing_video_track(format!(
            "{} has no decodable video stream",
            source.path.display()
        ))
    })?;

    if video.natural_width == 0 || video.natural_height == 0 {
        return Err(ReelcutError::config(format!(
            "Source video reports an empty picture ({}x{})",
            video.natural_width, video.natural_height
        )));
    }

    let transform = video.preferred_transform;
    let orientation = Orientation::classify(&transform).ok_or_else(|| {
        ReelcutError::config(format!(
            "Display transform {transform:?} is not a right-angle rotation or mirror"
        ))
    })?;

    let bounds = transform.transform_rect(video.natural_width as f64, video.natural_height as f64);
    let render_target = RenderTarget {
        width: bounds.width().round() as u32,
        height: bounds.height().round() as u32,
        frame_rate: video.frame_rate,
        frame_duration: video.frame_rate.frame_duration(),
    };

    tracing::info!(
        natural_width = video.natural_width,
        natural_height = video.natural_height,
        orientation = orientation.as_str(),
        render_width = render_target.width,
        render_height = render_target.height,
        frame_rate = %video.frame_rate,
        "Resolved source orientation"
    );

    Ok(ResolvedOrientation {
        transform,
        orientation,
        render_target,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use reelcut_common::error::ErrorKind;
    use reelcut_highlight_model::{TimeRange, VideoTrackInfo};
    use std::path::PathBuf;

    fn source_with_transform(transform: AffineTransform) -> SourceMedia {
        SourceMedia {
            path: PathBuf::from("portrait.mov"),
            duration: MediaTime::from_secs(5),
            start_offset: MediaTime::ZERO,
            video: Some(VideoTrackInfo {
                stream_index: 0,
                natural_width: 1920,
                natural_height: 1080,
                preferred_transform: transform,
                frame_rate: FrameRate::from_fps(30).unwrap(),
                time_range: TimeRange::new(MediaTime::ZERO, MediaTime::from_secs(5)),
                codec: "hevc".to_string(),
            }),
            audio: None,
        }
    }

    #[test]
    fn test_portrait_recording_renders_upright() {
        let transform = AffineTransform::from_clockwise_rotation(90, 1920.0, 1080.0).unwrap();
        let resolved = resolve_orientation(&source_with_transform(transform)).unwrap();
        assert_eq!(resolved.orientation, Orientation::Rotate90);
        assert_eq!(
            (resolved.render_target.width, resolved.render_target.height),
            (1080, 1920)
        );
        assert_eq!(
            resolved.render_target.frame_duration,
            MediaTime::new(1, 30).unwrap()
        );
    }

    #[test]
    fn test_identity_keeps_natural_size() {
        let resolved = resolve_orientation(&source_with_transform(AffineTransform::IDENTITY)).unwrap();
        assert_eq!(resolved.orientation, Orientation::Identity);
        assert_eq!(
            (resolved.render_target.width, resolved.render_target.height),
            (1920, 1080)
        );
    }

    #[test]
    fn test_classify_all_quarter_turns() {
        for (degrees, expected) in [
            (0, Orientation::Identity),
            (90, Orientation::Rotate90),
            (180, Orientation::Rotate180),
            (270, Orientation::Rotate270),
        ] {
            let t = AffineTransform::from_clockwise_rotation(degrees, 4.0, 2.0).unwrap();
            assert_eq!(Orientation::classify(&t), Some(expected));
        }
        let transpose = AffineTransform::new(0.0, 1.0, 1.0, 0.0, 0.0, 0.0);
        assert_eq!(Orientation::classify(&transpose), Some(Orientation::Transpose));
        assert!(Orientation::Transpose.swaps_axes());
    }

    #[test]
    fn test_sheared_transform_is_unbindable() {
        let shear = AffineTransform::new(1.0, 0.0, 0.3, 1.0, 0.0, 0.0);
        let err = resolve_orientation(&source_with_transform(shear)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ConfigurationError);
    }

    #[test]
    fn test_missing_video_track() {
        let mut source = source_with_transform(AffineTransform::IDENTITY);
        source.video = None;
        let err = resolve_orientation(&source).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MissingVideoTrack);
    }
}
