//! Advance widths for laying out overlay labels.
//!
//! The renderer draws the label with whatever font fontconfig resolves, but
//! the frame has to be placed before rendering. Widths come from the
//! Helvetica-Bold AFM metrics (units per em = 1000), which match the label
//! font closely enough for right-aligned placement.

const UNITS_PER_EM: f64 = 1000.0;
const ASCENDER: f64 = 718.0;
const DESCENDER: f64 = 207.0;

/// Width used for anything outside printable ASCII.
const FALLBACK_ADVANCE: u16 = 556;

/// Printable ASCII, 0x20 through 0x7E.
#[rustfmt::skip]
const ADVANCES: [u16; 95] = [
    // space ! " # $ % & ' ( ) * + , - . /
    278, 333, 474, 556, 556, 889, 722, 238, 333, 333, 389, 584, 278, 333, 278, 278,
    // 0-9
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556,
    // : ; < = > ? @
    333, 333, 584, 584, 584, 611, 975,
    // A-Z
    722, 722, 722, 722, 667, 611, 778, 722, 278, 556, 722, 611, 833,
    722, 778, 667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611,
    // [ \ ] ^ _ `
    333, 278, 333, 584, 556, 333,
    // a-z
    556, 611, 556, 611, 556, 333, 611, 611, 278, 278, 556, 278, 889,
    611, 611, 611, 611, 389, 556, 333, 611, 556, 778, 556, 556, 500,
    // { | } ~
    389, 280, 389, 584,
];

fn advance(ch: char) -> u16 {
    match ch {
        ' '..='~' => ADVANCES[ch as usize - 0x20],
        _ => FALLBACK_ADVANCE,
    }
}

/// Rendered width of `text` at `font_size` pixels.
pub fn text_width(text: &str, font_size: f64) -> f64 {
    let units: u32 = text.chars().map(|ch| advance(ch) as u32).sum();
    units as f64 * font_size / UNITS_PER_EM
}

/// Line height of a single label at `font_size` pixels.
pub fn line_height(font_size: f64) -> f64 {
    (ASCENDER + DESCENDER) * font_size / UNITS_PER_EM
}
