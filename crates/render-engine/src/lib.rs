//! Reelcut Render Engine
//!
//! Turns a source video plus a list of highlight intervals into a single
//! highlight reel with a fading label on every segment.
//!
//! # Pipeline Architecture
//!
//! ```text
//! intervals ──► Normalize ──► Timeline ──┬──► Compose tracks ──┐
//!                                        │                     │
//! source ──► Resolve orientation ────────┼──► Schedule labels ─┤
//!                                        │                     ▼
//!                                        └────────────► Export (ffmpeg)
//!                                                              │
//!                                                              ▼
//!                                                         output.mp4
//! ```
//!
//! Everything up to the export is synchronous and pure. Only the export
//! suspends, and it either moves a finished file into place or leaves the
//! destination untouched.

pub mod compositor;
pub mod export;
pub mod ffmpeg;
pub mod normalize;
pub mod orientation;
pub mod overlay;
pub mod pipeline;
pub mod probe;
pub mod text_metrics;
pub mod timeline;

pub use compositor::{compose_tracks, Composition, CompositionNote, TrackEdit};
pub use export::*;
pub use ffmpeg::FfmpegBackend;
pub use normalize::{normalize_intervals, NormalizationNote, NormalizedIntervals};
pub use orientation::{resolve_orientation, Orientation, RenderTarget, ResolvedOrientation};
pub use overlay::{schedule_overlays, OverlayAnnotation, OverlayPlan};
pub use pipeline::{export_highlights, plan_highlights, HighlightPlan};
pub use probe::probe_source;
pub use timeline::{build_timeline, timeline_duration};
