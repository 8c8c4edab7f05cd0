//! Reelcut Highlight Model
//!
//! Defines the core data contracts for highlight composition:
//! - **Intervals:** Frame ranges reported by the analysis service
//! - **Time:** Exact rational media time and frame rates
//! - **Segments:** Placement of each interval on the output timeline
//! - **Source:** Probed properties of the source video
//! - **Records:** What the caller persists after a successful export
//!
//! All timing is rational (`num/den` seconds). Floating point only
//! appears at display boundaries.

pub mod interval;
pub mod record;
pub mod segment;
pub mod source;
pub mod time;
pub mod transform;

pub use interval::*;
pub use record::*;
pub use segment::*;
pub use source::*;
pub use time::*;
pub use transform::*;
