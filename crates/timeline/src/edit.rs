//! Selection, clipboard and the move/scale gesture.
//!
//! The controller only holds editing state. Every mutation goes through
//! [`EventLog`], and the caller is responsible for making sure the
//! transport is idle.

use inkcast_common::clock::TimeMs;
use inkcast_session_model::{Event, EventId};

use crate::error::{TimelineError, TimelineResult};
use crate::event_log::{earliest_start, DeleteSummary, EventLog};

/// A selected time window `[from, to)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Selection {
    pub from: TimeMs,
    pub to: TimeMs,
}

impl Selection {
    pub fn duration(&self) -> TimeMs {
        self.to - self.from
    }
}

/// Where a pending move would land.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MovePreview {
    pub from: TimeMs,
    pub to: TimeMs,

    /// The drop window overlaps content. Advisory only.
    pub collides: bool,
}

/// Events lifted out of the log by [`EditController::begin_move`].
#[derive(Debug, Clone)]
struct PendingMove {
    origin: Selection,
    events: Vec<Event>,
}

#[derive(Debug, Clone, Default)]
pub struct EditController {
    selection: Option<Selection>,
    clipboard: Vec<Event>,

    /// Selection start the clipboard was copied from.
    clipboard_origin: Option<TimeMs>,

    pending: Option<PendingMove>,
}

/// Reject non-positive or non-finite scale factors.
pub fn validate_scale(scale: f64) -> TimelineResult<()> {
    if scale.is_finite() && scale > 0.0 {
        Ok(())
    } else {
        Err(TimelineError::InvalidScale { scale })
    }
}

/// Apply `scale_and_move` to every event with a shared pivot.
pub fn scale_events(
    events: &mut [Event],
    scale: f64,
    dt: TimeMs,
    pivot: TimeMs,
) -> TimelineResult<()> {
    validate_scale(scale)?;
    for ev in events.iter_mut() {
        ev.scale_and_move(scale, dt, pivot);
    }
    events.sort_by_key(|e| e.start_time);
    Ok(())
}

fn scaled_len(len: TimeMs, scale: f64) -> TimeMs {
    (len as f64 * scale).round() as TimeMs
}

impl EditController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn selection(&self) -> Option<Selection> {
        self.selection
    }

    pub fn clipboard(&self) -> &[Event] {
        &self.clipboard
    }

    pub fn is_moving(&self) -> bool {
        self.pending.is_some()
    }

    /// Select `[from, to)`.
    ///
    /// Unless `exact`, the window snaps to the selected events: it starts
    /// at the earliest start and ends just past the latest end, so every
    /// selected event lies fully inside. Nothing is selected when no event
    /// overlaps a snapped window.
    pub fn select(
        &mut self,
        log: &EventLog,
        from: TimeMs,
        to: TimeMs,
        exact: bool,
    ) -> Option<Selection> {
        let (from, to) = if from <= to { (from, to) } else { (to, from) };
        self.selection = if exact {
            (from < to).then_some(Selection { from, to })
        } else {
            let range = log.select_range(from, to);
            let selected = log.events()[range]
                .iter()
                .filter(|e| e.overlaps(from, to) && !e.is_open());
            selected.fold(None, |acc: Option<Selection>, e| {
                let end = e.end_or_max() + 1;
                Some(match acc {
                    None => Selection {
                        from: e.start_time,
                        to: end,
                    },
                    Some(s) => Selection {
                        from: s.from.min(e.start_time),
                        to: s.to.max(end),
                    },
                })
            })
        };
        tracing::debug!(selection = ?self.selection, exact, "Selected");
        self.selection
    }

    pub fn clear_selection(&mut self) {
        self.selection = None;
    }

    fn require_selection(&self) -> TimelineResult<Selection> {
        self.selection.ok_or(TimelineError::NoSelection)
    }

    /// Copy the selected window into the clipboard.
    pub fn copy(&mut self, log: &mut EventLog) -> TimelineResult<usize> {
        let sel = self.require_selection()?;
        self.clipboard = log.copy_window(sel.from, sel.to);
        self.clipboard_origin = Some(sel.from);
        tracing::debug!(count = self.clipboard.len(), "Copied selection");
        Ok(self.clipboard.len())
    }

    /// Delete the selected window.
    pub fn delete(&mut self, log: &mut EventLog) -> TimelineResult<DeleteSummary> {
        let sel = self.require_selection()?;
        Ok(log.delete_range(sel.from, sel.to))
    }

    /// Copy, then delete.
    pub fn cut(&mut self, log: &mut EventLog) -> TimelineResult<DeleteSummary> {
        self.copy(log)?;
        self.delete(log)
    }

    /// Paste the clipboard so its first event starts at `t`.
    pub fn paste(&mut self, log: &mut EventLog, t: TimeMs) -> TimelineResult<Vec<EventId>> {
        if self.clipboard.is_empty() {
            return Err(TimelineError::EmptyClipboard);
        }
        Ok(log.paste_at(&self.clipboard, t))
    }

    /// Rescale the clipboard around the start of the selection it came from.
    pub fn scale_selection(&mut self, scale: f64, dt: TimeMs) -> TimelineResult<()> {
        let Some(earliest) = earliest_start(&self.clipboard) else {
            return Err(TimelineError::EmptyClipboard);
        };
        let pivot = self.clipboard_origin.unwrap_or(earliest);
        scale_events(&mut self.clipboard, scale, dt, pivot)
    }

    /// Lift the selection out of the log to start a move.
    pub fn begin_move(&mut self, log: &mut EventLog) -> TimelineResult<DeleteSummary> {
        let origin = self.require_selection()?;
        let events = log.copy_window(origin.from, origin.to);
        let summary = log.delete_range(origin.from, origin.to);
        self.pending = Some(PendingMove { origin, events });
        Ok(summary)
    }

    /// Where the moved selection would land after shifting by `dt` and
    /// stretching by `scale`, clamped to `[0, total]`.
    pub fn preview(
        &self,
        log: &EventLog,
        total: TimeMs,
        dt: TimeMs,
        scale: f64,
    ) -> TimelineResult<MovePreview> {
        let pending = self.pending.as_ref().ok_or(TimelineError::NoPendingMove)?;
        validate_scale(scale)?;
        Ok(Self::landing(log, pending.origin, total, dt, scale))
    }

    fn landing(
        log: &EventLog,
        origin: Selection,
        total: TimeMs,
        dt: TimeMs,
        scale: f64,
    ) -> MovePreview {
        let len = scaled_len(origin.duration(), scale);
        let from = (origin.from + dt).min(total - len).max(0);
        let to = from + len;
        MovePreview {
            from,
            to,
            collides: log.check_collision(from, to),
        }
    }

    /// Drop the lifted events at the previewed position.
    pub fn commit_move(
        &mut self,
        log: &mut EventLog,
        total: TimeMs,
        dt: TimeMs,
        scale: f64,
    ) -> TimelineResult<(MovePreview, Vec<EventId>)> {
        validate_scale(scale)?;
        let mut pending = self.pending.take().ok_or(TimelineError::NoPendingMove)?;
        let landing = Self::landing(log, pending.origin, total, dt, scale);
        if landing.collides {
            tracing::warn!(
                from = landing.from,
                to = landing.to,
                "Dropping move onto existing content"
            );
        }

        let shift = landing.from - pending.origin.from;
        scale_events(&mut pending.events, scale, shift, pending.origin.from)?;
        let ids = match earliest_start(&pending.events) {
            Some(at) => log.paste_at(&pending.events, at),
            None => Vec::new(),
        };
        self.selection = Some(Selection {
            from: landing.from,
            to: landing.to,
        });
        Ok((landing, ids))
    }

    /// Put the lifted events back where they were.
    pub fn cancel_move(&mut self, log: &mut EventLog) -> TimelineResult<Vec<EventId>> {
        let pending = self.pending.take().ok_or(TimelineError::NoPendingMove)?;
        let ids = match earliest_start(&pending.events) {
            Some(at) => log.paste_at(&pending.events, at),
            None => Vec::new(),
        };
        self.selection = Some(pending.origin);
        Ok(ids)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event_log::tests::{pointer, stroke};

    fn log_of(spans: &[(TimeMs, TimeMs)]) -> EventLog {
        let mut log = EventLog::new();
        for &(s, e) in spans {
            let ev = stroke(&mut log, s, e);
            log.insert_sorted(ev);
        }
        log
    }

    fn starts(log: &EventLog) -> Vec<TimeMs> {
        log.iter().map(|e| e.start_time).collect()
    }

    #[test]
    fn test_select_snaps_to_events() {
        let log = log_of(&[(100, 150), (170, 220), (400, 450)]);
        let mut edit = EditController::new();
        let sel = edit.select(&log, 120, 180, false).unwrap();
        assert_eq!(sel, Selection { from: 100, to: 221 });

        let exact = edit.select(&log, 180, 120, true).unwrap();
        assert_eq!(exact, Selection { from: 120, to: 180 });

        assert!(edit.select(&log, 300, 350, false).is_none());
    }

    #[test]
    fn test_snapped_cut_removes_whole_events() {
        let mut log = log_of(&[(100, 150), (170, 220), (400, 450)]);
        let mut edit = EditController::new();
        edit.select(&log, 120, 180, false);
        let summary = edit.cut(&mut log).unwrap();
        assert_eq!(summary.removed, 2);
        assert_eq!(edit.clipboard().len(), 2);
        assert_eq!(starts(&log), vec![400]);
    }

    #[test]
    fn test_paste_requires_clipboard() {
        let mut log = log_of(&[(0, 10)]);
        let mut edit = EditController::new();
        assert!(matches!(
            edit.paste(&mut log, 0),
            Err(TimelineError::EmptyClipboard)
        ));
        assert!(matches!(edit.copy(&mut log), Err(TimelineError::NoSelection)));
    }

    #[test]
    fn test_copy_delete_paste_roundtrip() {
        let mut log = log_of(&[(0, 20), (50, 60), (80, 100), (300, 320)]);
        let mut edit = EditController::new();
        edit.select(&log, 40, 110, false);
        edit.copy(&mut log).unwrap();
        let relative: Vec<TimeMs> = edit
            .clipboard()
            .iter()
            .map(|e| e.start_time - 50)
            .collect();
        edit.delete(&mut log).unwrap();
        let ids = edit.paste(&mut log, 500).unwrap();

        let pasted: Vec<TimeMs> = ids
            .iter()
            .map(|id| log.get(*id).unwrap().start_time - 500)
            .collect();
        assert_eq!(pasted, relative);
        assert!(log.is_sorted());
    }

    #[test]
    fn test_scale_selection_uses_selection_start_as_pivot() {
        let mut log = log_of(&[(100, 150)]);
        let mut edit = EditController::new();
        edit.select(&log, 90, 160, true);
        edit.copy(&mut log).unwrap();
        edit.scale_selection(2.0, 0).unwrap();
        let ev = &edit.clipboard()[0];
        assert_eq!(ev.start_time, 110);
        assert_eq!(ev.end_time, Some(210));

        assert!(matches!(
            edit.scale_selection(0.0, 0),
            Err(TimelineError::InvalidScale { .. })
        ));
    }

    #[test]
    fn test_move_preview_clamps_and_flags_collisions() {
        let mut log = log_of(&[(100, 150), (500, 600)]);
        let mut edit = EditController::new();
        edit.select(&log, 100, 120, false);
        edit.begin_move(&mut log).unwrap();
        assert_eq!(starts(&log), vec![500]);

        let p = edit.preview(&log, 1000, -500, 1.0).unwrap();
        assert_eq!((p.from, p.to), (0, 51));
        assert!(!p.collides);

        let p = edit.preview(&log, 1000, 2000, 1.0).unwrap();
        assert_eq!((p.from, p.to), (949, 1000));

        let p = edit.preview(&log, 1000, 400, 1.0).unwrap();
        assert!(p.collides);
    }

    #[test]
    fn test_commit_move_shifts_and_scales() {
        let mut log = log_of(&[(100, 150), (500, 600)]);
        let mut edit = EditController::new();
        edit.select(&log, 100, 120, false);
        edit.begin_move(&mut log).unwrap();

        let (landing, ids) = edit.commit_move(&mut log, 1000, 100, 2.0).unwrap();
        assert_eq!(landing.from, 200);
        let moved = log.get(ids[0]).unwrap();
        assert_eq!(moved.start_time, 200);
        assert_eq!(moved.end_time, Some(300));
        assert_eq!(starts(&log), vec![200, 500]);
        assert!(!edit.is_moving());
    }

    #[test]
    fn test_exact_move_over_overlapping_events_stays_sorted() {
        let mut log = log_of(&[(0, 100), (46, 60), (800, 810)]);
        let mut edit = EditController::new();
        edit.select(&log, 45, 200, true);
        edit.begin_move(&mut log).unwrap();
        assert_eq!(starts(&log), vec![0, 800]);

        let (landing, ids) = edit.commit_move(&mut log, 1000, 300, 1.0).unwrap();
        assert_eq!(landing.from, 345);
        assert_eq!(ids.len(), 2);
        assert_eq!(starts(&log), vec![0, 346, 350, 800]);
        assert!(log.is_sorted());
    }

    #[test]
    fn test_cancel_move_restores_events() {
        let mut log = log_of(&[(100, 150)]);
        let mut edit = EditController::new();
        edit.select(&log, 100, 110, false);
        edit.begin_move(&mut log).unwrap();
        assert!(log.is_empty());
        edit.cancel_move(&mut log).unwrap();
        assert_eq!(starts(&log), vec![100]);
        assert_eq!(log.events()[0].end_time, Some(150));
    }

    #[test]
    fn test_pointer_movement_does_not_block_moves() {
        let mut log = log_of(&[(100, 150)]);
        let p = pointer(&mut log, 300, 900);
        log.insert_sorted(p);
        let mut edit = EditController::new();
        edit.select(&log, 100, 110, false);
        edit.begin_move(&mut log).unwrap();
        let p = edit.preview(&log, 1000, 400, 1.0).unwrap();
        assert!(!p.collides);
    }
}
