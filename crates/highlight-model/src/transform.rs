//! 2D affine transforms for display orientation.
//!
//! Uses the row-vector convention common to media containers:
//! `x' = a·x + c·y + tx`, `y' = b·x + d·y + ty`, with `y` pointing down.

use serde::{Deserialize, Serialize};

/// An affine transform of the source picture plane.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AffineTransform {
    pub a: f64,
    pub b: f64,
    pub c: f64,
    pub d: f64,
    pub tx: f64,
    pub ty: f64,
}

/// Axis-aligned bounds of a transformed rectangle.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
}

impl Bounds {
    pub fn width(&self) -> f64 {
        (self.max_x - self.min_x).abs()
    }

    pub fn height(&self) -> f64 {
        (self.max_y - self.min_y).abs()
    }
}

impl Default for AffineTransform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl AffineTransform {
    pub const IDENTITY: AffineTransform = AffineTransform {
        a: 1.0,
        b: 0.0,
        c: 0.0,
        d: 1.0,
        tx: 0.0,
        ty: 0.0,
    };

    pub fn new(a: f64, b: f64, c: f64, d: f64, tx: f64, ty: f64) -> Self {
        Self { a, b, c, d, tx, ty }
    }

    /// Transform that turns a `width`×`height` picture clockwise by
    /// `degrees` and translates it back into the positive quadrant.
    ///
    /// Only quarter turns are representable; other angles return `None`.
    pub fn from_clockwise_rotation(degrees: i64, width: f64, height: f64) -> Option<Self> {
        match degrees.rem_euclid(360) {
            0 => Some(Self::IDENTITY),
            90 => Some(Self::new(0.0, 1.0, -1.0, 0.0, height, 0.0)),
            180 => Some(Self::new(-1.0, 0.0, 0.0, -1.0, width, height)),
            270 => Some(Self::new(0.0, -1.0, 1.0, 0.0, 0.0, width)),
            _ => None,
        }
    }

    /// Build from a display-matrix rotation as ffprobe reports it
    /// (counter-clockwise degrees, so portrait phone video reads `-90`).
    pub fn from_display_rotation(rotation: f64, width: f64, height: f64) -> Option<Self> {
        let rounded = rotation.round();
        if (rotation - rounded).abs() > 1e-6 {
            return None;
        }
        Self::from_clockwise_rotation(-(rounded as i64), width, height)
    }

    pub fn apply(&self, x: f64, y: f64) -> (f64, f64) {
        (
            self.a * x + self.c * y + self.tx,
            self.b * x + self.d * y + self.ty,
        )
    }

    /// Bounds of the rectangle `(0, 0, width, height)` after transforming.
    pub fn transform_rect(&self, width: f64, height: f64) -> Bounds {
        let corners = [
            self.apply(0.0, 0.0),
            self.apply(width, 0.0),
            self.apply(0.0, height),
            self.apply(width, height),
        ];
        corners.iter().fold(
            Bounds {
                min_x: f64::INFINITY,
                min_y: f64::INFINITY,
                max_x: f64::NEG_INFINITY,
                max_y: f64::NEG_INFINITY,
            },
            |acc, &(x, y)| Bounds {
                min_x: acc.min_x.min(x),
                min_y: acc.min_y.min(y),
                max_x: acc.max_x.max(x),
                max_y: acc.max_y.max(y),
            },
        )
    }

    /// Whether the linear part only swaps and/or mirrors axes.
    pub fn is_axis_aligned(&self) -> bool {
        let unit = |v: f64| (v.abs() - 1.0).abs() < 1e-6;
        let zero = |v: f64| v.abs() < 1e-6;
        (unit(self.a) && unit(self.d) && zero(self.b) && zero(self.c))
            || (zero(self.a) && zero(self.d) && unit(self.b) && unit(self.c))
    }
}
