//! The time-sorted event log.
//!
//! The log keeps events sorted ascending by start time at all times. Every
//! mutation below either preserves the order in place or goes through a
//! sorted insertion. Edits only touch closed events.

use std::ops::Range;

use inkcast_common::clock::TimeMs;
use inkcast_session_model::{Event, EventId, EventKind, IdAllocator, TrimOutcome};

/// What a [`EventLog::delete_range`] call did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeleteSummary {
    /// Events erased outright, including ones emptied by a trim.
    pub removed: usize,

    /// Events shortened at one or both ends.
    pub trimmed: usize,

    /// Events cut in two, producing a new tail event.
    pub split: usize,
}

impl DeleteSummary {
    pub fn is_noop(&self) -> bool {
        self.removed == 0 && self.trimmed == 0
    }
}

/// Sorted sequence of events plus the id source for new ones.
#[derive(Debug, Clone, Default)]
pub struct EventLog {
    events: Vec<Event>,
    ids: IdAllocator,
}

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a log from stored events. Out-of-order input is stably sorted.
    pub fn from_events(mut events: Vec<Event>) -> Self {
        if !events.windows(2).all(|w| w[0].start_time <= w[1].start_time) {
            tracing::warn!(count = events.len(), "Sorting unsorted event log");
            events.sort_by_key(|e| e.start_time);
        }
        let ids = IdAllocator::after(&events);
        Self { events, ids }
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn events(&self) -> &[Event] {
        &self.events
    }

    pub(crate) fn events_mut(&mut self) -> &mut [Event] {
        &mut self.events
    }

    pub fn iter(&self) -> impl Iterator<Item = &Event> {
        self.events.iter()
    }

    pub fn into_events(self) -> Vec<Event> {
        self.events
    }

    pub fn next_id(&mut self) -> EventId {
        self.ids.next_id()
    }

    /// Index of the event with `id`. Recent events are found first.
    pub fn find(&self, id: EventId) -> Option<usize> {
        self.events.iter().rposition(|e| e.id == id)
    }

    pub fn get(&self, id: EventId) -> Option<&Event> {
        self.find(id).map(|i| &self.events[i])
    }

    pub fn get_mut(&mut self, id: EventId) -> Option<&mut Event> {
        self.find(id).map(move |i| &mut self.events[i])
    }

    /// Insert after every event starting at or before `ev`. Returns its index.
    pub fn insert_sorted(&mut self, ev: Event) -> usize {
        self.ids.observe(ev.id);
        let at = self
            .events
            .partition_point(|e| e.start_time <= ev.start_time);
        self.events.insert(at, ev);
        at
    }

    /// First index whose event starts at or after `t`.
    pub fn locate_by_start_time(&self, t: TimeMs) -> usize {
        self.events.partition_point(|e| e.start_time < t)
    }

    /// First index whose event ends at or after `t`, open events counting
    /// as unbounded.
    ///
    /// End times are only approximately sorted, so this is a binary-search
    /// estimate. [`EventLog::select_range`] corrects it.
    pub fn locate_by_end_time(&self, t: TimeMs) -> usize {
        self.events.partition_point(|e| e.end_or_max() < t)
    }

    /// Smallest index range holding every event that overlaps `[from, to)`.
    ///
    /// The range may contain non-overlapping events squeezed between
    /// overlapping ones. Empty when nothing overlaps.
    pub fn select_range(&self, from: TimeMs, to: TimeMs) -> Range<usize> {
        if from >= to || self.events.is_empty() {
            return 0..0;
        }
        let end = self.locate_by_start_time(to);
        let mut start = self.locate_by_end_time(from).min(end);

        // A long event can end after `from` while sitting before the guess.
        if let Some(first) = self.events[..start]
            .iter()
            .position(|e| e.overlaps(from, to))
        {
            start = first;
        }
        while start < end && !self.events[start].overlaps(from, to) {
            start += 1;
        }

        let mut end = end;
        while end > start && !self.events[end - 1].overlaps(from, to) {
            end -= 1;
        }
        start..end
    }

    /// Whether anything but pointer movement occupies `[from, to)`.
    pub fn check_collision(&self, from: TimeMs, to: TimeMs) -> bool {
        self.events[self.select_range(from, to)]
            .iter()
            .any(|e| e.kind() != EventKind::PointerMovement && e.overlaps(from, to))
    }

    /// Remove the window `[from, to)` from the log.
    ///
    /// Events fully inside are erased. Events crossing one boundary are
    /// trimmed back to it, events crossing both are split. Emptied events
    /// are excised. Open events are left alone.
    pub fn delete_range(&mut self, from: TimeMs, to: TimeMs) -> DeleteSummary {
        let mut summary = DeleteSummary::default();
        let range = self.select_range(from, to);
        if range.is_empty() {
            return summary;
        }

        let drained: Vec<Event> = self.events.drain(range.clone()).collect();
        let mut in_place = Vec::with_capacity(drained.len());
        let mut moved = Vec::new();
        let mut inserted = Vec::new();

        for mut ev in drained {
            if !ev.overlaps(from, to) {
                in_place.push(ev);
                continue;
            }
            if ev.is_open() {
                tracing::warn!(id = %ev.id, "Skipping open event during delete");
                in_place.push(ev);
                continue;
            }

            let original_start = ev.start_time;
            let end = ev.end_or_max();
            let outcome = if ev.start_time >= from && end < to {
                TrimOutcome::Emptied
            } else if ev.start_time < from && end >= to {
                let before = inserted.len();
                let outcome = ev.trim_range(from, to, &mut self.ids, &mut inserted);
                if inserted.len() > before {
                    summary.split += 1;
                }
                outcome
            } else if ev.start_time < from {
                ev.trim_from(from)
            } else {
                ev.trim_until(to)
            };

            match outcome {
                TrimOutcome::Emptied => {
                    tracing::trace!(id = %ev.id, "Removing event");
                    summary.removed += 1;
                }
                TrimOutcome::Trimmed => {
                    summary.trimmed += 1;
                    if ev.start_time == original_start {
                        in_place.push(ev);
                    } else {
                        moved.push(ev);
                    }
                }
            }
        }

        let rest = self.events.split_off(range.start);
        self.events.extend(in_place);
        self.events.extend(rest);
        for ev in moved.into_iter().chain(inserted) {
            self.insert_sorted(ev);
        }

        tracing::debug!(
            from,
            to,
            removed = summary.removed,
            trimmed = summary.trimmed,
            split = summary.split,
            "Deleted range"
        );
        summary
    }

    /// Deep copies of the events in `range`, with fresh ids.
    pub fn copy_range(&mut self, range: Range<usize>) -> Vec<Event> {
        let end = range.end.min(self.events.len());
        let start = range.start.min(end);
        let mut copies = Vec::with_capacity(end - start);
        for ev in &self.events[start..end] {
            copies.push(ev.duplicate(self.ids.next_id()));
        }
        copies
    }

    /// Copies of the parts of closed events that fall inside `[from, to)`,
    /// with fresh ids.
    pub fn copy_window(&mut self, from: TimeMs, to: TimeMs) -> Vec<Event> {
        let mut copies = self.copy_range(self.select_range(from, to));
        copies.retain_mut(|ev| {
            if !ev.overlaps(from, to) || ev.is_open() {
                return false;
            }
            if ev.start_time < from && ev.trim_until(from) == TrimOutcome::Emptied {
                return false;
            }
            ev.end_or_max() < to || ev.trim_from(to) == TrimOutcome::Trimmed
        });
        // Trimming a head moves its start, so the copies may be out of order.
        copies.sort_by_key(|e| e.start_time);
        copies
    }

    /// Paste copies of `clipboard` so that its earliest event starts at `t`.
    ///
    /// Pasted events go before existing events with the same start time.
    /// Returns the ids of the pasted events.
    pub fn paste_at(&mut self, clipboard: &[Event], t: TimeMs) -> Vec<EventId> {
        let Some(earliest) = earliest_start(clipboard) else {
            return Vec::new();
        };
        let dt = t - earliest;

        let mut pasted: Vec<Event> = Vec::with_capacity(clipboard.len());
        for ev in clipboard {
            let mut copy = ev.duplicate(self.ids.next_id());
            copy.time_shift(dt);
            pasted.push(copy);
        }
        pasted.sort_by_key(|e| e.start_time);
        let ids = pasted.iter().map(|e| e.id).collect();

        let at = self.locate_by_start_time(t);
        let tail = self.events.split_off(at);
        let mut tail = tail.into_iter().peekable();
        for ev in pasted {
            while let Some(existing) = tail.next_if(|e| e.start_time < ev.start_time) {
                self.events.push(existing);
            }
            self.events.push(ev);
        }
        self.events.extend(tail);

        tracing::debug!(at = t, count = clipboard.len(), "Pasted events");
        ids
    }

    /// Close every open event at `t`. Returns how many were closed.
    pub fn close_open_events(&mut self, t: TimeMs) -> usize {
        let mut closed = 0;
        for ev in self.events.iter_mut().filter(|e| e.is_open()) {
            ev.close(t);
            closed += 1;
        }
        closed
    }

    /// Latest end time over closed events and samples of open ones.
    pub fn last_time(&self) -> TimeMs {
        self.events
            .iter()
            .map(|e| e.end_time.unwrap_or(e.start_time))
            .max()
            .unwrap_or(0)
    }

    pub fn reset_draw_cursors(&mut self) {
        for ev in &mut self.events {
            ev.reset_draw_cursor();
        }
    }

    pub fn is_sorted(&self) -> bool {
        self.events
            .windows(2)
            .all(|w| w[0].start_time <= w[1].start_time)
    }
}

/// Smallest start time in `events`, whatever their order.
pub fn earliest_start(events: &[Event]) -> Option<TimeMs> {
    events.iter().map(|e| e.start_time).min()
}
