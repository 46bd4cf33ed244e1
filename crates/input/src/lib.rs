//! Inkcast Input
//!
//! Feeds pen, pointer and narration input into a [`Timeline`]. Uses a
//! pluggable backend architecture so live devices and recorded journals go
//! through the same path:
//!
//! - **Canvas:** maps window pixels to canvas coordinates and calls the
//!   timeline entry points in the right order
//! - **Journal:** append-only JSONL record of every input, replayable
//!   through [`backends::JournalBackend`]

pub mod backends;
pub mod canvas;
pub mod journal;
pub mod writer;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use inkcast_common::error::InkcastResult;
use inkcast_session_model::MarkerKind;
use inkcast_timeline::{Brush, Timeline, TimelineResult};

pub use canvas::{CanvasGeometry, CanvasInput};
pub use journal::{InputRecord, JournalHeader, PenInput};
pub use writer::JournalWriter;

/// Trait for input backends.
pub trait InputBackend: Send {
    /// Poll for the next input. Returns `None` if nothing is available yet.
    fn poll(&mut self) -> InkcastResult<Option<InputRecord>>;

    /// Backend name for logging.
    fn name(&self) -> &str;

    /// Whether the backend will never produce input again.
    fn is_exhausted(&self) -> bool {
        false
    }
}

/// Drives a timeline from a backend, optionally journaling what it sees.
pub struct InputTracker {
    backend: Box<dyn InputBackend>,
    canvas: CanvasInput,
    journal: Option<JournalWriter>,
    stop_flag: Arc<AtomicBool>,
    records_applied: u64,
    records_rejected: u64,
}

impl InputTracker {
    pub fn new(backend: Box<dyn InputBackend>, canvas: CanvasInput) -> Self {
        Self {
            backend,
            canvas,
            journal: None,
            stop_flag: Arc::new(AtomicBool::new(false)),
            records_applied: 0,
            records_rejected: 0,
        }
    }

    /// Write every input to `journal` before applying it.
    pub fn with_journal(mut self, journal: JournalWriter) -> Self {
        self.journal = Some(journal);
        self
    }

    /// Run until the stop flag is set or the backend is exhausted.
    ///
    /// A recording still running when the loop ends is paused, closing its
    /// open events. Returns the number of records applied.
    pub async fn run(&mut self, timeline: &mut Timeline) -> InkcastResult<u64> {
        tracing::info!(backend = %self.backend.name(), "Input tracker started");

        while !self.stop_flag.load(Ordering::Relaxed) {
            match self.backend.poll() {
                Ok(Some(record)) => {
                    if let Some(journal) = &mut self.journal {
                        journal.write_record(&record)?;
                    }
                    match self.apply(timeline, &record) {
                        Ok(()) => self.records_applied += 1,
                        Err(e) => {
                            self.records_rejected += 1;
                            tracing::warn!(t = record.t, error = %e, "Input rejected");
                        }
                    }
                }
                Ok(None) if self.backend.is_exhausted() => break,
                Ok(None) => {
                    tokio::time::sleep(tokio::time::Duration::from_millis(1)).await;
                }
                Err(e) => {
                    tracing::warn!(error = %e, "Input backend error");
                }
            }
        }

        if timeline.state() == inkcast_timeline::TransportState::Recording {
            timeline.pause();
            self.canvas.reset();
        }
        if let Some(journal) = &mut self.journal {
            journal.flush()?;
        }
        tracing::info!(
            applied = self.records_applied,
            rejected = self.records_rejected,
            "Input tracker stopped"
        );
        Ok(self.records_applied)
    }

    /// Apply one input to the timeline.
    pub fn apply(&mut self, timeline: &mut Timeline, record: &InputRecord) -> TimelineResult<()> {
        match &record.input {
            PenInput::Record => {
                timeline.start_recording()?;
            }
            PenInput::Pause => {
                timeline.pause();
                self.canvas.reset();
            }
            PenInput::Press { x, y } => self.canvas.press(timeline, *x, *y)?,
            PenInput::Move { x, y } => self.canvas.motion(timeline, *x, *y)?,
            PenInput::Release { x, y } => self.canvas.release(timeline, *x, *y)?,
            PenInput::Leave => self.canvas.leave(timeline),
            PenInput::Tool {
                tool,
                color,
                point_size,
            } => timeline.set_brush(Brush {
                tool: *tool,
                color: *color,
                point_size: *point_size,
            }),
            PenInput::Undo => {
                timeline.add_marker(MarkerKind::Undo);
            }
            PenInput::Scroll { offset } => {
                self.canvas.scroll(timeline, *offset);
            }
            PenInput::Audio { pcm } => {
                timeline.append_audio(pcm);
            }
        }
        Ok(())
    }

    pub fn stop(&self) {
        self.stop_flag.store(true, Ordering::SeqCst);
    }

    /// Get the stop flag for external coordination.
    pub fn stop_flag(&self) -> Arc<AtomicBool> {
        self.stop_flag.clone()
    }

    pub fn records_applied(&self) -> u64 {
        self.records_applied
    }

    pub fn records_rejected(&self) -> u64 {
        self.records_rejected
    }

    pub fn canvas(&self) -> &CanvasInput {
        &self.canvas
    }
}
