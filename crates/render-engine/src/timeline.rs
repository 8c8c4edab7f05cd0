//! Timeline builder: lay normalized intervals back to back.

use reelcut_highlight_model::{MediaTime, NormalizedInterval, Segment};

/// Place each interval on the output timeline, in order, with no gaps.
///
/// Segment `i` starts at the sum of the durations of segments `0..i`.
/// Pure and deterministic.
pub fn build_timeline(intervals: &[NormalizedInterval]) -> Vec<Segment> {
    let mut cursor = MediaTime::ZERO;
    let mut segments = Vec::with_capacity(intervals.len());

    for (index, interval) in intervals.iter().enumerate() {
        let duration = interval.duration();
        segments.push(Segment {
            index: index as u32,
            source_start: interval.source_start,
            source_end: interval.source_end,
            output_start: cursor,
            output_duration: duration,
            label: interval.interval.label(),
        });
        cursor = cursor + duration;
    }

    segments
}

/// Total output duration of a segment list.
pub fn timeline_duration(segments: &[Segment]) -> MediaTime {
    segments.iter().map(|segment| segment.output_duration).sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normalize::normalize_intervals;
    use proptest::prelude::*;
    use reelcut_highlight_model::{FrameRate, Interval};

    fn normalized(intervals: &[Interval], fps: u32) -> Vec<NormalizedInterval> {
        normalize_intervals(
            intervals,
            FrameRate::from_fps(fps).unwrap(),
            MediaTime::from_secs(1_000_000),
        )
        .unwrap()
        .intervals
    }

    #[test]
    fn test_two_one_second_highlights() {
        let segments = build_timeline(&normalized(
            &[Interval::new(0, 30), Interval::new(60, 90)],
            30,
        ));

        assert_eq!(segments.len(), 2);
        assert_eq!(segments[0].output_start, MediaTime::ZERO);
        assert_eq!(segments[0].output_duration, MediaTime::from_secs(1));
        assert_eq!(segments[1].output_start, MediaTime::from_secs(1));
        assert_eq!(segments[1].output_duration, MediaTime::from_secs(1));
        assert_eq!(segments[1].source_start, MediaTime::from_secs(2));
        assert_eq!(segments[1].label, "60-90");
        assert_eq!(segments[1].index, 1);
    }

    #[test]
    fn test_empty_timeline() {
        let segments = build_timeline(&[]);
        assert!(segments.is_empty());
        assert_eq!(timeline_duration(&segments), MediaTime::ZERO);
    }

    fn disjoint_intervals() -> impl Strategy<Value = Vec<Interval>> {
        prop::collection::vec((0u64..50, 1u64..200), 0..40).prop_map(|pairs| {
            let mut next = 0u64;
            pairs
                .into_iter()
                .map(|(gap, len)| {
                    let start = next + gap;
                    next = start + len;
                    Interval::new(start, next)
                })
                .collect()
        })
    }

    proptest! {
        #[test]
        fn prop_duration_is_conserved(intervals in disjoint_intervals(), fps in 1u32..120) {
            let rate = FrameRate::from_fps(fps).unwrap();
            let segments = build_timeline(&normalized(&intervals, fps));
            let frames: u64 = intervals.iter().map(|i| i.frame_len()).sum();
            prop_assert_eq!(timeline_duration(&segments), MediaTime::from_frames(frames, rate).unwrap());
        }

        #[test]
        fn prop_segments_are_contiguous(intervals in disjoint_intervals(), fps in 1u32..120) {
            let segments = build_timeline(&normalized(&intervals, fps));
            if let Some(first) = segments.first() {
                prop_assert_eq!(first.output_start, MediaTime::ZERO);
            }
            for pair in segments.windows(2) {
                prop_assert_eq!(pair[1].output_start, pair[0].output_end());
            }
        }

        #[test]
        fn prop_builder_is_deterministic(intervals in disjoint_intervals()) {
            let input = normalized(&intervals, 30);
            prop_assert_eq!(build_timeline(&input), build_timeline(&input));
        }
    }
}
