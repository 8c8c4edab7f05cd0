//! Interval normalization: validate, order, and convert to source time.

use serde::Serialize;

use reelcut_common::error::{ReelcutError, ReelcutResult};
use reelcut_highlight_model::{FrameRate, Interval, MediaTime, NormalizedInterval};

/// Non-fatal observations made while normalizing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum NormalizationNote {
    /// The input was not sorted; it was processed in sorted order.
    Reordered {
        /// Index of the first input interval that starts before its predecessor.
        first_out_of_order: usize,
    },
}

/// Output of [`normalize_intervals`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedIntervals {
    /// Intervals sorted by start frame.
    pub intervals: Vec<NormalizedInterval>,

    /// Frame count implied by the source duration and frame rate.
    pub frame_count: u64,

    pub notes: Vec<NormalizationNote>,
}

/// Validate raw intervals against the source and convert them to time.
///
/// Intervals are sorted by `start_frame`, ties by `end_frame`. An interval
/// is rejected when it is empty or reversed, when it ends past the last
/// frame of the source, or when it overlaps its sorted neighbour. Touching
/// intervals (`a.end_frame == b.start_frame`) are fine.
pub fn normalize_intervals(
    raw: &[Interval],
    frame_rate: FrameRate,
    source_duration: MediaTime,
) -> ReelcutResult<NormalizedIntervals> {
    let frame_count = source_duration.round_to_frames(frame_rate).ok_or_else(|| {
        ReelcutError::config(format!(
            "Source duration {source_duration} cannot be expressed in frames at {frame_rate} fps"
        ))
    })?;

    for (idx, interval) in raw.iter().enumerate() {
        if !interval.is_well_formed() {
            return Err(ReelcutError::invalid_interval(format!(
                "interval #{idx} ({}) must end after it starts",
                interval.label()
            )));
        }
        if interval.end_frame > frame_count {
            return Err(ReelcutError::invalid_interval(format!(
                "interval #{idx} ({}) ends past the last frame of the source ({frame_count} frames)",
                interval.label()
            )));
        }
    }

    let mut notes = Vec::new();
    if let Some(pos) = raw.windows(2).position(|pair| pair[0] > pair[1]) {
        tracing::warn!(
            first_out_of_order = pos + 1,
            intervals = raw.len(),
            "Highlight intervals arrived out of order; processing in sorted order"
        );
        notes.push(NormalizationNote::Reordered {
            first_out_of_order: pos + 1,
        });
    }

    let mut sorted = raw.to_vec();
    sorted.sort();

    if let Some(pair) = sorted.windows(2).find(|pair| pair[0].overlaps(&pair[1])) {
        return Err(ReelcutError::invalid_interval(format!(
            "intervals {} and {} overlap",
            pair[0].label(),
            pair[1].label()
        )));
    }

    let intervals = sorted
        .into_iter()
        .map(|interval| to_source_time(interval, frame_rate))
        .collect::<ReelcutResult<Vec<_>>>()?;

    tracing::debug!(
        intervals = intervals.len(),
        frame_count,
        %frame_rate,
        "Intervals normalized"
    );

    Ok(NormalizedIntervals {
        intervals,
        frame_count,
        notes,
    })
}

fn to_source_time(interval: Interval, frame_rate: FrameRate) -> ReelcutResult<NormalizedInterval> {
    let out_of_range = || {
        ReelcutError::invalid_interval(format!(
            "interval {} is out of the representable time range",
            interval.label()
        ))
    };
    Ok(NormalizedInterval {
        interval,
        source_start: frame_rate
            .time_of_frame(interval.start_frame)
            .ok_or_else(out_of_range)?,
        source_end: frame_rate
            .time_of_frame(interval.end_frame)
            .ok_or_else(out_of_range)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use reelcut_common::error::ErrorKind;

    fn fps30() -> FrameRate {
        FrameRate::from_fps(30).unwrap()
    }

    #[test]
    fn test_converts_frames_to_rational_time() {
        let result = normalize_intervals(
            &[Interval::new(0, 30), Interval::new(60, 90)],
            fps30(),
            MediaTime::from_secs(10),
        )
        .unwrap();

        assert_eq!(result.frame_count, 300);
        assert!(result.notes.is_empty());
        assert_eq!(result.intervals[1].source_start, MediaTime::from_secs(2));
        assert_eq!(result.intervals[1].source_end, MediaTime::from_secs(3));
    }

    #[test]
    fn test_sorts_with_tie_break_and_notes_reorder() {
        let result = normalize_intervals(
            &[Interval::new(100, 120), Interval::new(0, 10), Interval::new(10, 20)],
            fps30(),
            MediaTime::from_secs(10),
        )
        .unwrap();

        let order: Vec<_> = result.intervals.iter().map(|n| n.interval).collect();
        assert_eq!(
            order,
            vec![
                Interval::new(0, 10),
                Interval::new(10, 20),
                Interval::new(100, 120)
            ]
        );
        assert_eq!(
            result.notes,
            vec![NormalizationNote::Reordered {
                first_out_of_order: 1
            }]
        );
    }

    #[test]
    fn test_rejects_reversed_and_empty() {
        for bad in [Interval::new(30, 10), Interval::new(30, 30)] {
            let err = normalize_intervals(&[bad], fps30(), MediaTime::from_secs(10)).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::InvalidInterval);
        }
    }

    #[test]
    fn test_rejects_interval_past_source_end() {
        let err = normalize_intervals(&[Interval::new(290, 301)], fps30(), MediaTime::from_secs(10))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidInterval);
        assert!(err.to_string().contains("300 frames"));

        assert!(
            normalize_intervals(&[Interval::new(290, 300)], fps30(), MediaTime::from_secs(10))
                .is_ok()
        );
    }

    #[test]
    fn test_rejects_overlap_even_when_unsorted() {
        let err = normalize_intervals(
            &[Interval::new(20, 40), Interval::new(0, 25)],
            fps30(),
            MediaTime::from_secs(10),
        )
        .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidInterval);
        assert!(err.to_string().contains("0-25"));
    }

    #[test]
    fn test_empty_input_is_valid() {
        let result = normalize_intervals(&[], fps30(), MediaTime::from_secs(10)).unwrap();
        assert!(result.intervals.is_empty());
        assert!(result.notes.is_empty());
    }

    #[test]
    fn test_ntsc_frame_count_rounds() {
        let ntsc = FrameRate::new(30000, 1001).unwrap();
        let duration = MediaTime::parse_decimal("10.010000").unwrap();
        let result = normalize_intervals(&[Interval::new(0, 300)], ntsc, duration).unwrap();
        assert_eq!(result.frame_count, 300);
        assert_eq!(
            result.intervals[0].source_end,
            MediaTime::new(1001, 100).unwrap()
        );
    }
}
