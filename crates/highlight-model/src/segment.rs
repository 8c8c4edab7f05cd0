//! Normalized intervals and their placement on the output timeline.

use serde::{Deserialize, Serialize};

use crate::interval::Interval;
use crate::time::MediaTime;

/// A validated interval converted to source time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NormalizedInterval {
    /// The interval as reported, kept for labelling.
    pub interval: Interval,
    pub source_start: MediaTime,
    pub source_end: MediaTime,
}

impl NormalizedInterval {
    pub fn duration(&self) -> MediaTime {
        self.source_end - self.source_start
    }
}

/// A half-open span `[start, start + duration)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeRange {
    pub start: MediaTime,
    pub duration: MediaTime,
}

impl TimeRange {
    pub fn new(start: MediaTime, duration: MediaTime) -> Self {
        Self { start, duration }
    }

    pub fn from_bounds(start: MediaTime, end: MediaTime) -> Self {
        Self {
            start,
            duration: end - start,
        }
    }

    pub fn end(&self) -> MediaTime {
        self.start + self.duration
    }

    /// Whether `other` lies entirely inside this range.
    pub fn contains_range(&self, other: &TimeRange) -> bool {
        other.start >= self.start && other.end() <= self.end()
    }
}

/// One highlight placed on the output timeline.
///
/// Segments are created once by the timeline builder and never mutated;
/// both the track composer and the overlay scheduler read from the same
/// list, which keeps picture and label timing in lockstep.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Segment {
    /// Position in the output, starting at 0.
    pub index: u32,

    /// Source span copied into the output.
    pub source_start: MediaTime,
    pub source_end: MediaTime,

    /// Where the segment begins in the output.
    pub output_start: MediaTime,

    /// How long the segment plays in the output.
    pub output_duration: MediaTime,

    /// `"{startFrame}-{endFrame}"` of the originating interval.
    pub label: String,
}

impl Segment {
    pub fn source_range(&self) -> TimeRange {
        TimeRange::from_bounds(self.source_start, self.source_end)
    }

    pub fn output_range(&self) -> TimeRange {
        TimeRange::new(self.output_start, self.output_duration)
    }

    pub fn output_end(&self) -> MediaTime {
        self.output_start + self.output_duration
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_time_range_containment() {
        let outer = TimeRange::new(MediaTime::ZERO, MediaTime::from_secs(10));
        let inner = TimeRange::from_bounds(MediaTime::from_secs(2), MediaTime::from_secs(10));
        let spill = TimeRange::from_bounds(MediaTime::from_secs(9), MediaTime::from_secs(11));
        assert!(outer.contains_range(&inner));
        assert!(!outer.contains_range(&spill));
        assert_eq!(inner.end(), MediaTime::from_secs(10));
    }

    #[test]
    fn test_segment_ranges() {
        let segment = Segment {
            index: 1,
            source_start: MediaTime::from_secs(2),
            source_end: MediaTime::from_secs(3),
            output_start: MediaTime::from_secs(1),
            output_duration: MediaTime::from_secs(1),
            label: "60-90".to_string(),
        };
        assert_eq!(segment.output_end(), MediaTime::from_secs(2));
        assert_eq!(segment.source_range().duration, segment.output_duration);
    }
}
