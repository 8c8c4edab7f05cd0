//! Exact rational media time.
//!
//! Highlight boundaries are frame indices, so every timeline position is a
//! rational number of seconds with the frame rate in the denominator.
//! Keeping the arithmetic exact means segment sums never drift, no matter
//! how many segments are concatenated.

use std::cmp::Ordering;
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, Sub};

use serde::{Deserialize, Serialize};

/// A point or span on a media timeline, in seconds, as a reduced fraction.
///
/// The denominator is always positive and `gcd(num, den) == 1`, so the
/// derived equality and hashing agree with numeric equality.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "RawMediaTime", into = "RawMediaTime")]
pub struct MediaTime {
    num: i64,
    den: i64,
}

#[derive(Serialize, Deserialize)]
struct RawMediaTime {
    num: i64,
    den: i64,
}

impl TryFrom<RawMediaTime> for MediaTime {
    type Error = String;

    fn try_from(raw: RawMediaTime) -> Result<Self, Self::Error> {
        MediaTime::new(raw.num, raw.den)
            .ok_or_else(|| format!("invalid media time {}/{}", raw.num, raw.den))
    }
}

impl From<MediaTime> for RawMediaTime {
    fn from(time: MediaTime) -> Self {
        Self {
            num: time.num,
            den: time.den,
        }
    }
}

fn gcd(a: i128, b: i128) -> i128 {
    let (mut a, mut b) = (a.abs(), b.abs());
    while b != 0 {
        (a, b) = (b, a % b);
    }
    a
}

/// Reduce `num/den`, returning `None` for a zero denominator or when the
/// reduced fraction does not fit in `i64`.
fn reduce(num: i128, den: i128) -> Option<MediaTime> {
    if den == 0 {
        return None;
    }
    let (num, den) = if den < 0 { (-num, -den) } else { (num, den) };
    let g = gcd(num, den).max(1);
    Some(MediaTime {
        num: i64::try_from(num / g).ok()?,
        den: i64::try_from(den / g).ok()?,
    })
}

impl MediaTime {
    pub const ZERO: MediaTime = MediaTime { num: 0, den: 1 };

    /// Create `num/den` seconds. Returns `None` if `den == 0`.
    pub fn new(num: i64, den: i64) -> Option<Self> {
        reduce(num as i128, den as i128)
    }

    /// Whole seconds.
    pub const fn from_secs(secs: i64) -> Self {
        Self { num: secs, den: 1 }
    }

    /// Presentation time of `frame` at the given rate.
    pub fn from_frames(frame: u64, rate: FrameRate) -> Option<Self> {
        reduce(frame as i128 * rate.den as i128, rate.num as i128)
    }

    /// Parse a plain decimal string such as `"12.345000"` exactly.
    ///
    /// This is the format ffprobe uses for durations and start times.
    pub fn parse_decimal(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        let (negative, digits) = match raw.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, raw.strip_prefix('+').unwrap_or(raw)),
        };
        let (whole, frac) = digits.split_once('.').unwrap_or((digits, ""));
        if whole.is_empty() && frac.is_empty() {
            return None;
        }
        if !whole.bytes().all(|b| b.is_ascii_digit()) || !frac.bytes().all(|b| b.is_ascii_digit())
        {
            return None;
        }
        if frac.len() > 18 {
            return None;
        }

        let scale = 10i128.pow(frac.len() as u32);
        let whole_val: i128 = if whole.is_empty() { 0 } else { whole.parse().ok()? };
        let frac_val: i128 = if frac.is_empty() { 0 } else { frac.parse().ok()? };
        let num = whole_val.checked_mul(scale)?.checked_add(frac_val)?;
        reduce(if negative { -num } else { num }, scale)
    }

    pub fn numer(self) -> i64 {
        self.num
    }

    pub fn denom(self) -> i64 {
        self.den
    }

    pub fn is_zero(self) -> bool {
        self.num == 0
    }

    pub fn is_positive(self) -> bool {
        self.num > 0
    }

    pub fn checked_add(self, rhs: Self) -> Option<Self> {
        reduce(
            self.num as i128 * rhs.den as i128 + rhs.num as i128 * self.den as i128,
            self.den as i128 * rhs.den as i128,
        )
    }

    pub fn checked_sub(self, rhs: Self) -> Option<Self> {
        reduce(
            self.num as i128 * rhs.den as i128 - rhs.num as i128 * self.den as i128,
            self.den as i128 * rhs.den as i128,
        )
    }

    /// Half of this span.
    pub fn half(self) -> Self {
        // Halving a reduced fraction never overflows once widened.
        reduce(self.num as i128, self.den as i128 * 2).unwrap_or(self)
    }

    /// `self / other` as an exact fraction. `None` when `other` is zero.
    pub fn ratio(self, other: Self) -> Option<Self> {
        reduce(
            self.num as i128 * other.den as i128,
            self.den as i128 * other.num as i128,
        )
    }

    /// Number of whole frames in this span at `rate`, rounded half up.
    pub fn round_to_frames(self, rate: FrameRate) -> Option<u64> {
        if self.num < 0 {
            return None;
        }
        let n = self.num as i128 * rate.num as i128;
        let d = self.den as i128 * rate.den as i128;
        u64::try_from((2 * n + d) / (2 * d)).ok()
    }

    /// Lossy conversion for display and for renderer expressions.
    pub fn as_secs_f64(self) -> f64 {
        self.num as f64 / self.den as f64
    }
}

impl Ord for MediaTime {
    fn cmp(&self, other: &Self) -> Ordering {
        (self.num as i128 * other.den as i128).cmp(&(other.num as i128 * self.den as i128))
    }
}

impl PartialOrd for MediaTime {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// # Panics
///
/// Panics if the result does not fit, like integer addition in debug builds.
impl Add for MediaTime {
    type Output = MediaTime;

    fn add(self, rhs: Self) -> Self::Output {
        match self.checked_add(rhs) {
            Some(sum) => sum,
            None => panic!("media time overflow: {self} + {rhs}"),
        }
    }
}

/// # Panics
///
/// Panics if the result does not fit, like integer subtraction in debug builds.
impl Sub for MediaTime {
    type Output = MediaTime;

    fn sub(self, rhs: Self) -> Self::Output {
        match self.checked_sub(rhs) {
            Some(diff) => diff,
            None => panic!("media time overflow: {self} - {rhs}"),
        }
    }
}

impl Sum for MediaTime {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(MediaTime::ZERO, Add::add)
    }
}

impl<'a> Sum<&'a MediaTime> for MediaTime {
    fn sum<I: Iterator<Item = &'a MediaTime>>(iter: I) -> Self {
        iter.copied().sum()
    }
}

impl Default for MediaTime {
    fn default() -> Self {
        Self::ZERO
    }
}

impl fmt::Display for MediaTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.den == 1 {
            write!(f, "{}s", self.num)
        } else {
            write!(f, "{}/{}s", self.num, self.den)
        }
    }
}

/// Frames per second as a reduced fraction (`30/1`, `30000/1001`, ...).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "RawFrameRate", into = "RawFrameRate")]
pub struct FrameRate {
    num: u32,
    den: u32,
}

#[derive(Serialize, Deserialize)]
struct RawFrameRate {
    num: u32,
    den: u32,
}

impl TryFrom<RawFrameRate> for FrameRate {
    type Error = String;

    fn try_from(raw: RawFrameRate) -> Result<Self, Self::Error> {
        FrameRate::new(raw.num, raw.den)
            .ok_or_else(|| format!("invalid frame rate {}/{}", raw.num, raw.den))
    }
}

impl From<FrameRate> for RawFrameRate {
    fn from(rate: FrameRate) -> Self {
        Self {
            num: rate.num,
            den: rate.den,
        }
    }
}

impl FrameRate {
    /// Create `num/den` fps. Both parts must be non-zero.
    pub fn new(num: u32, den: u32) -> Option<Self> {
        if num == 0 || den == 0 {
            return None;
        }
        let g = gcd(num as i128, den as i128) as u32;
        Some(Self {
            num: num / g,
            den: den / g,
        })
    }

    /// Integral frame rate.
    pub fn from_fps(fps: u32) -> Option<Self> {
        Self::new(fps, 1)
    }

    /// Parse `"30000/1001"`, `"30"` or `"29.97"`.
    pub fn parse(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        if let Some((num, den)) = raw.split_once('/') {
            return Self::new(num.trim().parse().ok()?, den.trim().parse().ok()?);
        }
        let value = MediaTime::parse_decimal(raw)?;
        Self::new(
            u32::try_from(value.num).ok()?,
            u32::try_from(value.den).ok()?,
        )
    }

    pub fn numer(self) -> u32 {
        self.num
    }

    pub fn denom(self) -> u32 {
        self.den
    }

    /// Duration of a single frame.
    pub fn frame_duration(self) -> MediaTime {
        // Already reduced and non-zero.
        MediaTime {
            num: self.den as i64,
            den: self.num as i64,
        }
    }

    /// Presentation time of `frame`.
    pub fn time_of_frame(self, frame: u64) -> Option<MediaTime> {
        MediaTime::from_frames(frame, self)
    }

    pub fn as_f64(self) -> f64 {
        self.num as f64 / self.den as f64
    }
}

impl fmt::Display for FrameRate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.num, self.den)
    }
}
