//! Append-only journal writer for crash-safe input logging.

use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use inkcast_common::error::{InkcastError, InkcastResult};

use crate::journal::{InputRecord, JournalHeader};

/// Records between forced flushes.
const FLUSH_EVERY: u64 = 1000;

/// Writes input records to a JSONL file.
pub struct JournalWriter {
    writer: BufWriter<File>,
    path: PathBuf,
    records_written: u64,
}

impl JournalWriter {
    /// Create a new journal, writing the header as the first line.
    pub fn new(path: PathBuf, header: &JournalHeader) -> InkcastResult<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(&path)?;

        let mut writer = BufWriter::new(file);
        let header_json = serde_json::to_string(header)?;
        writeln!(writer, "# {header_json}")
            .map_err(|e| InkcastError::input(format!("Failed to write journal header: {e}")))?;

        Ok(Self {
            writer,
            path,
            records_written: 0,
        })
    }

    pub fn write_record(&mut self, record: &InputRecord) -> InkcastResult<()> {
        let json = serde_json::to_string(record)?;
        writeln!(self.writer, "{json}")
            .map_err(|e| InkcastError::input(format!("Failed to write journal record: {e}")))?;
        self.records_written += 1;

        if self.records_written % FLUSH_EVERY == 0 {
            self.flush()?;
        }
        Ok(())
    }

    pub fn flush(&mut self) -> InkcastResult<()> {
        self.writer
            .flush()
            .map_err(|e| InkcastError::input(format!("Failed to flush journal: {e}")))
    }

    pub fn records_written(&self) -> u64 {
        self.records_written
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for JournalWriter {
    fn drop(&mut self) {
        let _ = self.flush();
    }
}
