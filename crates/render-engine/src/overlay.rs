//! Overlay scheduler: one fading label per segment.

use serde::Serialize;

use reelcut_common::config::OverlayStyle;
use reelcut_highlight_model::{MediaTime, Segment};

use crate::orientation::RenderTarget;
use crate::text_metrics::{line_height, text_width};

/// Label placement in output pixels, origin at the top-left corner.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TextFrame {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

/// Opacity at a point of the annotation's lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct OpacityKeyframe {
    /// Fraction of the annotation duration, in `[0, 1]`.
    pub fraction: f64,
    /// Opacity, in `[0, 1]`.
    pub opacity: f64,
}

/// A label shown over one segment.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OverlayAnnotation {
    pub segment_index: u32,
    pub text: String,
    pub begin_time: MediaTime,
    pub duration: MediaTime,
    pub frame: TextFrame,

    /// Linear interpolation between consecutive keyframes.
    pub keyframes: Vec<OpacityKeyframe>,
}

impl OverlayAnnotation {
    pub fn end_time(&self) -> MediaTime {
        self.begin_time + self.duration
    }

    /// Opacity at `fraction` of the lifetime.
    pub fn opacity_at(&self, fraction: f64) -> f64 {
        let fraction = fraction.clamp(0.0, 1.0);
        for pair in self.keyframes.windows(2) {
            let (k0, k1) = (pair[0], pair[1]);
            if fraction <= k1.fraction {
                let span = k1.fraction - k0.fraction;
                if span <= 0.0 {
                    return k1.opacity;
                }
                return k0.opacity + (k1.opacity - k0.opacity) * (fraction - k0.fraction) / span;
            }
        }
        self.keyframes.last().map(|k| k.opacity).unwrap_or(0.0)
    }
}

/// Every annotation in output order plus the style they share.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OverlayPlan {
    pub style: OverlayStyle,
    pub annotations: Vec<OverlayAnnotation>,
}

impl OverlayPlan {
    pub fn len(&self) -> usize {
        self.annotations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.annotations.is_empty()
    }
}

/// Schedule one label per segment in the top-right corner.
///
/// Each label fades in over `f` and out over `f`, with
/// `f = min(style.max_fade_secs, duration / 2)`, so the two fades never
/// overlap on short segments.
pub fn schedule_overlays(
    segments: &[Segment],
    target: &RenderTarget,
    style: &OverlayStyle,
) -> OverlayPlan {
    let max_fade = fade_limit(style.max_fade_secs);
    let height = line_height(style.font_size);

    let annotations = segments
        .iter()
        .map(|segment| {
            let width = text_width(&segment.label, style.font_size);
            OverlayAnnotation {
                segment_index: segment.index,
                text: segment.label.clone(),
                begin_time: segment.output_start,
                duration: segment.output_duration,
                frame: TextFrame {
                    // Right-aligned; labels wider than the frame pin to the left edge.
                    x: (target.width as f64 - width - style.margin).max(0.0),
                    y: style.margin,
                    width,
                    height,
                },
                keyframes: fade_keyframes(segment.output_duration, max_fade),
            }
        })
        .collect::<Vec<_>>();

    tracing::debug!(
        annotations = annotations.len(),
        font_size = style.font_size,
        max_fade_secs = style.max_fade_secs,
        "Overlay plan scheduled"
    );

    OverlayPlan {
        style: style.clone(),
        annotations,
    }
}

/// Configured fade limit as exact time, at millisecond resolution.
fn fade_limit(secs: f64) -> MediaTime {
    if !secs.is_finite() || secs <= 0.0 {
        return MediaTime::ZERO;
    }
    MediaTime::new((secs * 1000.0).round().min(i64::MAX as f64) as i64, 1000)
        .unwrap_or(MediaTime::ZERO)
}

fn fade_keyframes(duration: MediaTime, max_fade: MediaTime) -> Vec<OpacityKeyframe> {
    let fade = max_fade.min(duration.half());
    let rise = fade
        .ratio(duration)
        .map(|r| r.as_secs_f64().clamp(0.0, 0.5))
        .unwrap_or(0.0);

    vec![
        OpacityKeyframe {
            fraction: 0.0,
            opacity: 0.0,
        },
        OpacityKeyframe {
            fraction: rise,
            opacity: 1.0,
        },
        OpacityKeyframe {
            fraction: 1.0 - rise,
            opacity: 1.0,
        },
        OpacityKeyframe {
            fraction: 1.0,
            opacity: 0.0,
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normalize::normalize_intervals;
    use crate::timeline::build_timeline;
    use proptest::prelude::*;
    use reelcut_highlight_model::{FrameRate, Interval};

    fn target() -> RenderTarget {
        let rate = FrameRate::from_fps(30).unwrap();
        RenderTarget {
            width: 1920,
            height: 1080,
            frame_rate: rate,
            frame_duration: rate.frame_duration(),
        }
    }

    fn segments(intervals: &[Interval]) -> Vec<Segment> {
        build_timeline(
            &normalize_intervals(
                intervals,
                FrameRate::from_fps(30).unwrap(),
                MediaTime::from_secs(3600),
            )
            .unwrap()
            .intervals,
        )
    }

    fn fractions(annotation: &OverlayAnnotation) -> Vec<f64> {
        annotation.keyframes.iter().map(|k| k.fraction).collect()
    }

    #[test]
    fn test_short_segment_fades_meet_in_the_middle() {
        let plan = schedule_overlays(
            &segments(&[Interval::new(0, 10)]),
            &target(),
            &OverlayStyle::default(),
        );
        assert_eq!(fractions(&plan.annotations[0]), vec![0.0, 0.5, 0.5, 1.0]);
    }

    #[test]
    fn test_long_segment_uses_half_second_fades() {
        let plan = schedule_overlays(
            &segments(&[Interval::new(0, 150)]),
            &target(),
            &OverlayStyle::default(),
        );
        assert_eq!(fractions(&plan.annotations[0]), vec![0.0, 0.1, 0.9, 1.0]);
        let opacities: Vec<_> = plan.annotations[0]
            .keyframes
            .iter()
            .map(|k| k.opacity)
            .collect();
        assert_eq!(opacities, vec![0.0, 1.0, 1.0, 0.0]);
    }

    #[test]
    fn test_label_sits_in_top_right_corner() {
        let plan = schedule_overlays(
            &segments(&[Interval::new(0, 30), Interval::new(60, 90)]),
            &target(),
            &OverlayStyle::default(),
        );
        let second = &plan.annotations[1];
        assert_eq!(second.text, "60-90");
        assert_eq!(second.begin_time, MediaTime::from_secs(1));
        assert_eq!(second.duration, MediaTime::from_secs(1));
        assert!((second.frame.x + second.frame.width + 20.0 - 1920.0).abs() < 1e-9);
        assert_eq!(second.frame.y, 20.0);
    }

    #[test]
    fn test_wide_label_stays_inside_narrow_frame() {
        let narrow = RenderTarget {
            width: 160,
            height: 90,
            ..target()
        };
        let plan = schedule_overlays(
            &segments(&[Interval::new(1200, 1500)]),
            &narrow,
            &OverlayStyle::default(),
        );
        let frame = plan.annotations[0].frame;
        assert!(frame.width > 160.0);
        assert_eq!(frame.x, 0.0);
        assert_eq!(frame.y, 20.0);
    }

    #[test]
    fn test_disabled_fade_keeps_label_opaque() {
        let style = OverlayStyle {
            max_fade_secs: 0.0,
            ..OverlayStyle::default()
        };
        let plan = schedule_overlays(&segments(&[Interval::new(0, 30)]), &target(), &style);
        assert_eq!(plan.annotations[0].opacity_at(0.5), 1.0);
        assert_eq!(fractions(&plan.annotations[0]), vec![0.0, 0.0, 1.0, 1.0]);
    }

    #[test]
    fn test_opacity_interpolates() {
        let plan = schedule_overlays(
            &segments(&[Interval::new(0, 150)]),
            &target(),
            &OverlayStyle::default(),
        );
        let annotation = &plan.annotations[0];
        assert!((annotation.opacity_at(0.05) - 0.5).abs() < 1e-9);
        assert_eq!(annotation.opacity_at(0.5), 1.0);
        assert_eq!(annotation.opacity_at(1.0), 0.0);
    }

    proptest! {
        #[test]
        fn prop_keyframes_are_monotonic(frames in 1u64..10_000, fade_ms in 0u32..5_000) {
            let style = OverlayStyle {
                max_fade_secs: fade_ms as f64 / 1000.0,
                ..OverlayStyle::default()
            };
            let plan = schedule_overlays(&segments(&[Interval::new(0, frames)]), &target(), &style);
            let keyframes = &plan.annotations[0].keyframes;
            prop_assert_eq!(keyframes.len(), 4);
            for k in keyframes {
                prop_assert!((0.0..=1.0).contains(&k.fraction));
                prop_assert!((0.0..=1.0).contains(&k.opacity));
            }
            for pair in keyframes.windows(2) {
                prop_assert!(pair[0].fraction <= pair[1].fraction);
            }
        }
    }
}
