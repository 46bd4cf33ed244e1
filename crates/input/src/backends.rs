//! Input backend implementations.

use std::collections::VecDeque;
use std::path::Path;

use inkcast_common::clock::ManualClock;
use inkcast_common::error::InkcastResult;

use crate::journal::{read_journal, InputRecord, JournalHeader};
use crate::InputBackend;

/// Replays a recorded journal.
///
/// Before a record is handed out, the shared clock is set to the record's
/// timestamp, so a timeline reading the same clock sees input arrive at
/// exactly the recorded times.
pub struct JournalBackend {
    header: Option<JournalHeader>,
    records: VecDeque<InputRecord>,
    clock: ManualClock,
}

impl JournalBackend {
    pub fn new(
        header: Option<JournalHeader>,
        records: Vec<InputRecord>,
        clock: ManualClock,
    ) -> Self {
        Self {
            header,
            records: records.into(),
            clock,
        }
    }

    pub fn open(path: &Path, clock: ManualClock) -> InkcastResult<Self> {
        let (header, records) = read_journal(path)?;
        tracing::debug!(path = %path.display(), records = records.len(), "Opened journal");
        Ok(Self::new(header, records, clock))
    }

    pub fn header(&self) -> Option<&JournalHeader> {
        self.header.as_ref()
    }

    pub fn remaining(&self) -> usize {
        self.records.len()
    }
}

impl InputBackend for JournalBackend {
    fn poll(&mut self) -> InkcastResult<Option<InputRecord>> {
        let record = self.records.pop_front();
        if let Some(r) = &record {
            self.clock.set(r.t);
        }
        Ok(record)
    }

    fn name(&self) -> &str {
        "journal"
    }

    fn is_exhausted(&self) -> bool {
        self.records.is_empty()
    }
}
