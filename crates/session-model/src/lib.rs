//! # inkcast-session-model
//!
//! Data model for Inkcast sessions.
//!
//! This crate defines:
//! - The shared point buffer holding all stroke geometry
//! - The event family (strokes, pointer movement, markers) and its
//!   time-editing operations
//! - Canvas geometry primitives
//! - The session directory layout and metadata

pub mod event;
pub mod geometry;
pub mod point_buffer;
pub mod sample;
pub mod session;

pub use event::{
    DrawStep, Event, EventBody, EventId, EventKind, IdAllocator, MarkerKind, PointerMovement,
    Stroke, StrokeTool, TrimOutcome,
};
pub use geometry::{Point2D, Rgb, Transform2D};
pub use point_buffer::{PointBuffer, QuantizedPoint, ResampleConfig};
pub use sample::{PointerSample, StrokeSample, Timed};
pub use session::{AudioFormat, LoadedSession, SessionError, SessionMeta};
