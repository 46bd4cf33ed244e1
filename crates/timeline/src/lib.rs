//! Inkcast Timeline
//!
//! The editing and replay core of a recorded session:
//! - **Event log:** time-sorted events with binary-search selection, trim,
//!   delete, copy/paste and time scaling
//! - **Replay:** full and incremental conversion of the log into draw
//!   requests for a time cursor
//! - **Transport:** idle / recording / playing state machine
//! - **Timeline:** the context tying geometry, events, audio and thumbnails
//!   together behind one set of entry points
//!
//! Nothing in this crate rasterizes pixels or touches devices. Rendering
//! goes through the [`RenderBackend`] trait.

pub mod audio;
pub mod edit;
pub mod error;
pub mod event_log;
pub mod replay;
pub mod thumbnail;
pub mod timeline;
pub mod transport;

pub use audio::AudioTrack;
pub use edit::{EditController, MovePreview, Selection};
pub use error::{TimelineError, TimelineResult};
pub use event_log::{DeleteSummary, EventLog};
pub use replay::{DrawRequest, RecordingBackend, RenderBackend, ReplayEngine};
pub use thumbnail::ThumbnailStrip;
pub use timeline::{Brush, Timeline};
pub use transport::{Transport, TransportState, REWIND_MARGIN_MS};
