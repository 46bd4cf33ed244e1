//! Input journal records.
//!
//! A journal is JSONL: a `# {header}` comment line followed by one
//! [`InputRecord`] per line. Records are timestamped in milliseconds since
//! the journal started, so a journal can be fed back through a
//! [`crate::backends::JournalBackend`] to rebuild the exact same session.

use std::path::Path;

use serde::{Deserialize, Serialize};

use inkcast_common::clock::TimeMs;
use inkcast_common::error::{InkcastError, InkcastResult};
use inkcast_session_model::{Rgb, StrokeTool};

use crate::canvas::CanvasGeometry;

/// First line of a journal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JournalHeader {
    pub schema_version: String,

    /// Wall-clock time the journal was started (RFC 3339).
    pub epoch_wall: String,

    /// Window geometry pixel positions refer to.
    pub canvas: CanvasGeometry,
}

impl JournalHeader {
    pub fn new(canvas: CanvasGeometry) -> Self {
        Self {
            schema_version: "1.0".to_string(),
            epoch_wall: chrono::Utc::now().to_rfc3339(),
            canvas,
        }
    }
}

/// One device or control input. Positions are window pixels.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PenInput {
    /// Start (or resume) recording.
    Record,
    Pause,
    Press {
        x: f64,
        y: f64,
    },
    Move {
        x: f64,
        y: f64,
    },
    Release {
        x: f64,
        y: f64,
    },
    Leave,
    Tool {
        tool: StrokeTool,
        color: Rgb,
        point_size: f32,
    },
    Undo,
    Scroll {
        offset: f64,
    },
    /// A chunk of raw PCM narration.
    Audio {
        pcm: Vec<u8>,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InputRecord {
    /// Milliseconds since the journal started.
    pub t: TimeMs,

    #[serde(flatten)]
    pub input: PenInput,
}

impl InputRecord {
    pub fn new(t: TimeMs, input: PenInput) -> Self {
        Self { t, input }
    }
}

/// Parse journal text. Returns the header, if present, and the records.
pub fn parse_journal(text: &str) -> InkcastResult<(Option<JournalHeader>, Vec<InputRecord>)> {
    let mut header = None;
    let mut records = Vec::new();
    for (idx, line) in text.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if let Some(body) = line.strip_prefix('#') {
            if idx == 0 {
                header = Some(serde_json::from_str(body.trim())?);
            }
            continue;
        }
        let record: InputRecord = serde_json::from_str(line).map_err(|e| {
            InkcastError::input(format!("Journal line {} is malformed: {e}", idx + 1))
        })?;
        records.push(record);
    }

    if !records.windows(2).all(|w| w[0].t <= w[1].t) {
        return Err(InkcastError::input("Journal timestamps go backwards"));
    }
    Ok((header, records))
}

/// Read and parse a journal file.
pub fn read_journal(path: &Path) -> InkcastResult<(Option<JournalHeader>, Vec<InputRecord>)> {
    if !path.exists() {
        return Err(InkcastError::FileNotFound {
            path: path.to_path_buf(),
        });
    }
    parse_journal(&std::fs::read_to_string(path)?)
}
