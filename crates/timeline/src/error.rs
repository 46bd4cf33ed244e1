//! Errors raised by timeline operations.

use inkcast_session_model::SessionError;

use crate::transport::TransportState;

/// Errors from the timeline context and its edit layer.
#[derive(Debug, thiserror::Error)]
pub enum TimelineError {
    /// Edits and seeks need the transport in a particular state.
    #[error("Timeline is busy ({state:?})")]
    Busy { state: TransportState },

    #[error("Stroke input requires an active recording")]
    NotRecording,

    #[error("Clipboard is empty")]
    EmptyClipboard,

    #[error("No selection")]
    NoSelection,

    #[error("No move in progress")]
    NoPendingMove,

    #[error("Invalid scale factor {scale}")]
    InvalidScale { scale: f64 },

    #[error("Unknown event {id}")]
    UnknownEvent { id: inkcast_session_model::EventId },

    #[error(transparent)]
    Session(#[from] SessionError),
}

pub type TimelineResult<T> = Result<T, TimelineError>;
