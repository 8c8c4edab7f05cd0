//! Reelcut Common Utilities
//!
//! Shared infrastructure for all Reelcut crates:
//! - Error types, error kinds, and result aliases
//! - Tracing/logging initialization
//! - Configuration loading (overlay style, export profile, logging)

pub mod config;
pub mod error;
pub mod logging;

pub use config::*;
pub use error::*;
