//! Replay engine: turns the event log into draw requests for a time cursor.
//!
//! Two strategies share the same per-stroke logic:
//! - **Full replay** clears the surface and redraws everything up to `t`.
//!   Used after seeks, edits and loads.
//! - **Incremental replay** resumes from where the previous call stopped
//!   and only draws geometry revealed since then. Used every display
//!   refresh while recording or playing.
//!
//! For any monotonic sequence of incremental calls starting from a full
//! replay, the union of drawn ranges equals what one full replay at the
//! final time draws.

use std::collections::BTreeSet;
use std::ops::Range;

use serde::Serialize;

use inkcast_common::clock::TimeMs;
use inkcast_session_model::{Event, EventBody, EventId, Point2D, PointBuffer, Rgb, Transform2D};

use crate::event_log::EventLog;

/// One contiguous range of the point buffer to draw.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DrawRequest {
    pub from: usize,
    pub count: usize,
    pub color: Rgb,
    pub point_size: f32,
    pub transform: Transform2D,
    pub event: EventId,
}

impl DrawRequest {
    pub fn range(&self) -> Range<usize> {
        self.from..self.from + self.count
    }
}

/// The surface replay draws onto.
pub trait RenderBackend {
    /// Forget everything drawn so far.
    fn clear(&mut self);

    /// Draw one range of `points`.
    fn draw(&mut self, points: &PointBuffer, request: &DrawRequest);

    /// Move the playback cursor indicator.
    fn set_cursor(&mut self, _pos: Option<Point2D>) {}
}

/// A backend that records requests instead of drawing them.
#[derive(Debug, Clone, Default)]
pub struct RecordingBackend {
    pub clears: usize,
    pub requests: Vec<DrawRequest>,
    pub cursor: Option<Point2D>,
}

impl RecordingBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every point index drawn since the last clear.
    pub fn covered(&self) -> BTreeSet<usize> {
        self.requests.iter().flat_map(DrawRequest::range).collect()
    }

    /// Drop recorded requests without counting a clear.
    pub fn take_requests(&mut self) -> Vec<DrawRequest> {
        std::mem::take(&mut self.requests)
    }
}

impl RenderBackend for RecordingBackend {
    fn clear(&mut self) {
        self.clears += 1;
        self.requests.clear();
    }

    fn draw(&mut self, _points: &PointBuffer, request: &DrawRequest) {
        self.requests.push(request.clone());
    }

    fn set_cursor(&mut self, pos: Option<Point2D>) {
        self.cursor = pos;
    }
}

/// Replay progress between calls.
#[derive(Debug, Clone, Default)]
pub struct ReplayEngine {
    /// Log index incremental replay resumes from.
    event_idx: usize,

    /// Latest resolved cursor position.
    cursor: Option<Point2D>,
}

impl ReplayEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn event_index(&self) -> usize {
        self.event_idx
    }

    pub fn cursor(&self) -> Option<Point2D> {
        self.cursor
    }

    /// Clear the surface and redraw everything visible at `t`.
    /// Returns the number of draw requests issued.
    pub fn full_replay(
        &mut self,
        log: &mut EventLog,
        points: &PointBuffer,
        t: TimeMs,
        backend: &mut dyn RenderBackend,
    ) -> usize {
        backend.clear();
        log.reset_draw_cursors();

        let events = log.events_mut();
        let mut issued = 0;
        let mut idx = 0;
        let mut live = None;
        while idx < events.len() {
            let ev = &mut events[idx];
            if ev.start_time > t {
                break;
            }
            if let Some(step) = ev.draw_until(t) {
                issued += issue(backend, points, ev, step.range);
                if step.reached {
                    live = Some(step.cursor);
                    break;
                }
            }
            idx += 1;
        }

        self.event_idx = idx;
        self.cursor = self.settle_cursor(events, live, t);
        backend.set_cursor(self.cursor);
        tracing::trace!(t, issued, event_idx = idx, "Full replay");
        issued
    }

    /// Draw what became visible since the previous call, up to `t`.
    /// Returns the number of draw requests issued.
    pub fn incremental_replay(
        &mut self,
        log: &mut EventLog,
        points: &PointBuffer,
        t: TimeMs,
        backend: &mut dyn RenderBackend,
    ) -> usize {
        let events = log.events_mut();
        self.event_idx = self.event_idx.min(events.len());

        let mut issued = 0;
        let mut live = None;
        while self.event_idx < events.len() {
            let ev = &mut events[self.event_idx];
            if ev.start_time > t {
                break;
            }
            if let Some(step) = ev.draw_from_index_until(t) {
                issued += issue(backend, points, ev, step.range);
                if step.reached {
                    live = Some(step.cursor);
                    break;
                }
            }
            self.event_idx += 1;
        }

        self.cursor = self.settle_cursor(events, live, t);
        backend.set_cursor(self.cursor);
        issued
    }

    /// Use the live stroke position when there is one, otherwise the most
    /// recent stroke or pointer movement that has started.
    fn settle_cursor(
        &self,
        events: &[Event],
        live: Option<Option<Point2D>>,
        t: TimeMs,
    ) -> Option<Point2D> {
        if let Some(Some(pos)) = live {
            return Some(pos);
        }
        let scan_end = match live {
            Some(_) => (self.event_idx + 1).min(events.len()),
            None => self.event_idx,
        };
        events[..scan_end]
            .iter()
            .rev()
            .find(|e| !matches!(e.body, EventBody::Marker { .. }))
            .and_then(|e| e.cursor_position(t))
            .or(self.cursor)
    }
}

fn issue(
    backend: &mut dyn RenderBackend,
    points: &PointBuffer,
    ev: &Event,
    range: Range<usize>,
) -> usize {
    let Some(stroke) = ev.as_stroke() else {
        return 0;
    };
    let range = range.start..range.end.min(points.len());
    if range.is_empty() {
        return 0;
    }
    backend.draw(
        points,
        &DrawRequest {
            from: range.start,
            count: range.len(),
            color: stroke.color,
            point_size: stroke.point_size,
            transform: stroke.transform,
            event: ev.id,
        },
    );
    1
}

#[cfg(test)]
mod tests {
    use super::*;
    use inkcast_session_model::{Stroke, StrokeSample};

    /// Two strokes recorded back to back into a shared buffer, each sample
    /// adding two points.
    fn setup() -> (EventLog, PointBuffer) {
        let mut points = PointBuffer::default();
        let mut log = EventLog::new();
        for (start, color) in [(0, Rgb::BLACK), (100, Rgb::WHITE)] {
            let pb_start = points.len();
            let mut samples = (0..4).map(|i| {
                points.add_point(Point2D::new(0.0, 0.0));
                let pb = points.add_point(Point2D::new(0.1, 0.0));
                StrokeSample::new(start + i * 10, Point2D::new(i as f64 * 0.1, 0.0), pb)
            });
            let first = samples.next().unwrap();
            let rest: Vec<StrokeSample> = samples.collect();
            let mut ev = Event::stroke(
                log.next_id(),
                start,
                Stroke::pen(color, 3.0, pb_start),
                first,
            );
            for sample in rest {
                ev.push_stroke_sample(sample);
            }
            ev.close(start + 30);
            log.insert_sorted(ev);
        }
        (log, points)
    }

    #[test]
    fn test_full_replay_mid_second_stroke() {
        let (mut log, points) = setup();
        let mut engine = ReplayEngine::new();
        let mut backend = RecordingBackend::new();

        let issued = engine.full_replay(&mut log, &points, 115, &mut backend);

        assert_eq!(issued, 2);
        assert_eq!(backend.clears, 1);
        assert_eq!(backend.requests[0].range(), 0..8);
        assert_eq!(backend.requests[1].range(), 8..12);
        assert_eq!(backend.requests[1].color, Rgb::WHITE);
        assert_eq!(engine.event_index(), 1);
        assert!((backend.cursor.unwrap().x - 0.1).abs() < 1e-9);
    }

    #[test]
    fn test_full_replay_is_idempotent() {
        let (mut log, points) = setup();
        let mut engine = ReplayEngine::new();
        let mut first = RecordingBackend::new();
        let mut second = RecordingBackend::new();
        engine.full_replay(&mut log, &points, 57, &mut first);
        engine.full_replay(&mut log, &points, 57, &mut second);
        assert_eq!(first.requests, second.requests);
    }

    #[test]
    fn test_incremental_matches_full() {
        let (mut log, points) = setup();
        let mut engine = ReplayEngine::new();
        let mut incremental = RecordingBackend::new();
        engine.full_replay(&mut log, &points, 0, &mut incremental);
        for t in [5, 12, 12, 40, 99, 100, 125, 500] {
            engine.incremental_replay(&mut log, &points, t, &mut incremental);
        }

        let mut full = RecordingBackend::new();
        ReplayEngine::new().full_replay(&mut log, &points, 500, &mut full);
        assert_eq!(incremental.covered(), full.covered());
        assert_eq!(full.covered().len(), 16);
    }

    #[test]
    fn test_incremental_only_draws_new_geometry() {
        let (mut log, points) = setup();
        let mut engine = ReplayEngine::new();
        let mut backend = RecordingBackend::new();
        engine.full_replay(&mut log, &points, 10, &mut backend);
        backend.take_requests();

        engine.incremental_replay(&mut log, &points, 20, &mut backend);
        assert_eq!(backend.requests.len(), 1);
        assert_eq!(backend.requests[0].range(), 4..6);

        backend.take_requests();
        assert_eq!(
            engine.incremental_replay(&mut log, &points, 20, &mut backend),
            0
        );
    }

    #[test]
    fn test_cursor_resolved_in_gap() {
        let (mut log, points) = setup();
        let mut engine = ReplayEngine::new();
        let mut backend = RecordingBackend::new();
        engine.full_replay(&mut log, &points, 60, &mut backend);
        // Between strokes the cursor rests on the last sample of the first.
        assert_eq!(engine.event_index(), 1);
        assert!((backend.cursor.unwrap().x - 0.3).abs() < 1e-9);
    }

    #[test]
    fn test_incremental_on_empty_log_is_noop() {
        let mut log = EventLog::new();
        let points = PointBuffer::default();
        let mut engine = ReplayEngine::new();
        let mut backend = RecordingBackend::new();
        assert_eq!(
            engine.incremental_replay(&mut log, &points, 1000, &mut backend),
            0
        );
        assert!(backend.cursor.is_none());
    }
}
