//! Inkcast Common Utilities
//!
//! Shared infrastructure for all Inkcast crates:
//! - Error types and result aliases
//! - Clocks and pacing for the recording/playback timeline
//! - Tracing/logging initialization
//! - Configuration loading

pub mod clock;
pub mod config;
pub mod error;
pub mod logging;

pub use clock::*;
pub use config::*;
pub use error::*;
