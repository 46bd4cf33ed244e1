//! Timeline events.
//!
//! An [`Event`] is one time-extended recorded action. The common header
//! (id, start, end) lives on [`Event`]; variant data lives in [`EventBody`].
//! Events only expose data: strokes report which point buffer ranges are
//! revealed at a given time, and the replay engine turns that into draw
//! requests.
//!
//! Events are stored on disk as JSONL, one event per line, after a `#`
//! header line.

use std::ops::Range;

use serde::{Deserialize, Serialize};

use inkcast_common::clock::TimeMs;

use crate::geometry::{Point2D, Rgb, Transform2D};
use crate::sample::{self, PointerSample, StrokeSample, Timed};

/// Point size of eraser strokes.
pub const ERASER_POINT_SIZE: f32 = 20.0;

/// Stable identity of an event. Clones made by edits get fresh ids.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EventId(pub u64);

impl std::fmt::Display for EventId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Hands out event ids in increasing order.
#[derive(Debug, Clone, Default)]
pub struct IdAllocator {
    next: u64,
}

impl IdAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    /// An allocator that will never reissue an id already used in `events`.
    pub fn after<'a>(events: impl IntoIterator<Item = &'a Event>) -> Self {
        let mut ids = Self::new();
        for ev in events {
            ids.observe(ev.id);
        }
        ids
    }

    pub fn next_id(&mut self) -> EventId {
        let id = EventId(self.next);
        self.next += 1;
        id
    }

    /// Make sure `id` is never issued again.
    pub fn observe(&mut self, id: EventId) {
        self.next = self.next.max(id.0 + 1);
    }
}

/// Coarse event classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    Stroke,
    Eraser,
    PointerMovement,
    Marker,
}

/// Which pen produced a stroke.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum StrokeTool {
    #[default]
    Pen,
    Eraser,
}

/// Instantaneous marker payload.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MarkerKind {
    /// The user undid the previous stroke.
    Undo,
    /// The viewport was scrolled to `offset` (in canvas heights).
    Scroll { offset: f64 },
}

/// Result of a trim.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrimOutcome {
    /// The event still holds at least one sample.
    Trimmed,
    /// Nothing is left. The caller must remove the event from the log.
    Emptied,
}

/// What a stroke reveals during one replay step.
#[derive(Debug, Clone, PartialEq)]
pub struct DrawStep {
    /// Newly revealed point buffer range. May be empty.
    pub range: Range<usize>,

    /// Position of the latest revealed sample, transformed.
    pub cursor: Option<Point2D>,

    /// The stroke stopped because the time limit was reached inside it
    /// (or it is still being recorded). Replay must not advance past it.
    pub reached: bool,
}

/// A pen or eraser stroke.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stroke {
    #[serde(default)]
    pub tool: StrokeTool,
    pub color: Rgb,
    pub point_size: f32,
    #[serde(default)]
    pub transform: Transform2D,

    /// Point buffer index where this stroke's geometry begins.
    pub pb_start: usize,

    pub samples: Vec<StrokeSample>,

    /// Replay resumption index into `samples`.
    #[serde(skip)]
    draw_index: usize,
}

/// Pointer movement without drawn geometry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct PointerMovement {
    pub samples: Vec<PointerSample>,
}

/// Variant data of an event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EventBody {
    Stroke(Stroke),
    PointerMovement(PointerMovement),
    Marker { marker: MarkerKind },
}

/// A recorded, time-extended action.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub id: EventId,

    #[serde(rename = "start")]
    pub start_time: TimeMs,

    /// `None` while the event is still being recorded.
    #[serde(rename = "end")]
    pub end_time: Option<TimeMs>,

    #[serde(flatten)]
    pub body: EventBody,
}

/// Header line of an events JSONL file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventStreamHeader {
    pub schema_version: String,

    /// Wall-clock time the stream was written (RFC 3339).
    pub written_at: String,

    pub event_count: usize,
}

impl Stroke {
    pub fn new(tool: StrokeTool, color: Rgb, point_size: f32, pb_start: usize) -> Self {
        Self {
            tool,
            color,
            point_size,
            transform: Transform2D::IDENTITY,
            pb_start,
            samples: Vec::new(),
            draw_index: 0,
        }
    }

    pub fn pen(color: Rgb, point_size: f32, pb_start: usize) -> Self {
        Self::new(StrokeTool::Pen, color, point_size, pb_start)
    }

    /// Erasers paint white with a wide point.
    pub fn eraser(pb_start: usize) -> Self {
        Self::new(StrokeTool::Eraser, Rgb::WHITE, ERASER_POINT_SIZE, pb_start)
    }

    /// Exclusive end of this stroke's geometry.
    pub fn pb_end(&self) -> usize {
        self.samples.last().map_or(self.pb_start, |s| s.pb_index)
    }

    /// Full point buffer range of the stroke.
    pub fn pb_range(&self) -> Range<usize> {
        self.pb_start..self.pb_end().max(self.pb_start)
    }

    pub fn draw_index(&self) -> usize {
        self.draw_index
    }

    pub fn reset_draw_cursor(&mut self) {
        self.draw_index = 0;
    }

    /// Buffer index where the geometry of `samples[idx]` begins.
    fn pb_before(&self, idx: usize) -> usize {
        if idx == 0 {
            self.pb_start
        } else {
            self.samples[idx - 1].pb_index
        }
    }

    fn cursor_at(&self, idx: usize) -> Option<Point2D> {
        if idx == 0 {
            None
        } else {
            Some(self.transform.apply(self.samples[idx - 1].position()))
        }
    }

    /// Reveal everything up to `t` from scratch.
    fn draw_until(&mut self, t: TimeMs, open: bool) -> DrawStep {
        let idx = sample::upper_bound(&self.samples, t);
        let range = self.pb_start..self.pb_before(idx).max(self.pb_start);
        self.draw_index = idx;
        DrawStep {
            range,
            cursor: self.cursor_at(idx),
            reached: idx < self.samples.len() || open,
        }
    }

    /// Reveal the samples after the resumption index up to `limit`.
    fn draw_from_index_until(&mut self, limit: TimeMs, open: bool) -> DrawStep {
        let start = self.draw_index.min(self.samples.len());
        let from = self.pb_before(start);
        let mut idx = start;
        while idx < self.samples.len() && self.samples[idx].time <= limit {
            idx += 1;
        }
        self.draw_index = idx;
        DrawStep {
            range: from..self.pb_before(idx).max(from),
            cursor: self.cursor_at(idx),
            reached: idx < self.samples.len() || open,
        }
    }
}

impl PointerMovement {
    fn position_at(&self, t: TimeMs) -> Option<Point2D> {
        sample::latest_at(&self.samples, t)
            .or_else(|| self.samples.first())
            .map(PointerSample::position)
    }
}

impl Event {
    fn new(id: EventId, start_time: TimeMs, body: EventBody) -> Self {
        Self {
            id,
            start_time,
            end_time: None,
            body,
        }
    }

    /// Open a stroke whose first sample is at `start_time`.
    pub fn stroke(id: EventId, start_time: TimeMs, stroke: Stroke, first: StrokeSample) -> Self {
        let mut stroke = stroke;
        stroke.samples.push(first);
        Self::new(id, start_time, EventBody::Stroke(stroke))
    }

    /// Open a pointer movement.
    pub fn pointer(id: EventId, start_time: TimeMs, pos: Point2D) -> Self {
        Self::new(
            id,
            start_time,
            EventBody::PointerMovement(PointerMovement {
                samples: vec![PointerSample::new(start_time, pos)],
            }),
        )
    }

    /// An instantaneous, already closed marker.
    pub fn marker(id: EventId, at: TimeMs, marker: MarkerKind) -> Self {
        Self {
            id,
            start_time: at,
            end_time: Some(at),
            body: EventBody::Marker { marker },
        }
    }

    pub fn kind(&self) -> EventKind {
        match &self.body {
            EventBody::Stroke(s) if s.tool == StrokeTool::Eraser => EventKind::Eraser,
            EventBody::Stroke(_) => EventKind::Stroke,
            EventBody::PointerMovement(_) => EventKind::PointerMovement,
            EventBody::Marker { .. } => EventKind::Marker,
        }
    }

    pub fn is_open(&self) -> bool {
        self.end_time.is_none()
    }

    /// End time with open events treated as unbounded.
    pub fn end_or_max(&self) -> TimeMs {
        self.end_time.unwrap_or(TimeMs::MAX)
    }

    /// Whether the event overlaps the window `[from, to)`.
    pub fn overlaps(&self, from: TimeMs, to: TimeMs) -> bool {
        self.start_time < to && self.end_or_max() >= from
    }

    pub fn as_stroke(&self) -> Option<&Stroke> {
        match &self.body {
            EventBody::Stroke(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_stroke_mut(&mut self) -> Option<&mut Stroke> {
        match &mut self.body {
            EventBody::Stroke(s) => Some(s),
            _ => None,
        }
    }

    pub fn sample_count(&self) -> usize {
        match &self.body {
            EventBody::Stroke(s) => s.samples.len(),
            EventBody::PointerMovement(p) => p.samples.len(),
            EventBody::Marker { .. } => 1,
        }
    }

    /// Append a stroke sample. Returns false if this is not a stroke.
    pub fn push_stroke_sample(&mut self, sample: StrokeSample) -> bool {
        match &mut self.body {
            EventBody::Stroke(s) => {
                s.samples.push(sample);
                true
            }
            _ => false,
        }
    }

    /// Append a pointer sample. Returns false if this is not pointer movement.
    pub fn push_pointer_sample(&mut self, sample: PointerSample) -> bool {
        match &mut self.body {
            EventBody::PointerMovement(p) => {
                p.samples.push(sample);
                true
            }
            _ => false,
        }
    }

    /// Close the event at `t`, never before its last sample.
    pub fn close(&mut self, t: TimeMs) {
        let last = self.last_sample_time().unwrap_or(self.start_time);
        self.end_time = Some(t.max(last).max(self.start_time));
    }

    fn first_sample_time(&self) -> Option<TimeMs> {
        match &self.body {
            EventBody::Stroke(s) => s.samples.first().map(Timed::time),
            EventBody::PointerMovement(p) => p.samples.first().map(Timed::time),
            EventBody::Marker { .. } => Some(self.start_time),
        }
    }

    fn last_sample_time(&self) -> Option<TimeMs> {
        match &self.body {
            EventBody::Stroke(s) => s.samples.last().map(Timed::time),
            EventBody::PointerMovement(p) => p.samples.last().map(Timed::time),
            EventBody::Marker { .. } => Some(self.start_time),
        }
    }

    /// Shift every time value by `dt`.
    pub fn time_shift(&mut self, dt: TimeMs) {
        self.remap_times(|v| v + dt);
    }

    /// Remap every time value `v -> (v - pivot) * scale + pivot + dt`,
    /// rounded to the nearest millisecond. `scale` must be positive.
    pub fn scale_and_move(&mut self, scale: f64, dt: TimeMs, pivot: TimeMs) {
        self.remap_times(|v| ((v - pivot) as f64 * scale).round() as TimeMs + pivot + dt);
    }

    fn remap_times(&mut self, f: impl Fn(TimeMs) -> TimeMs) {
        self.start_time = f(self.start_time);
        self.end_time = self.end_time.map(&f);
        match &mut self.body {
            EventBody::Stroke(s) => sample::remap_times(&mut s.samples, &f),
            EventBody::PointerMovement(p) => sample::remap_times(&mut p.samples, &f),
            EventBody::Marker { .. } => {}
        }
    }

    /// Drop every sample at or after `t`. The end moves to the new last sample.
    pub fn trim_from(&mut self, t: TimeMs) -> TrimOutcome {
        match &mut self.body {
            EventBody::Stroke(s) => {
                sample::trim_tail(&mut s.samples, t);
                s.draw_index = s.draw_index.min(s.samples.len());
            }
            EventBody::PointerMovement(p) => {
                sample::trim_tail(&mut p.samples, t);
            }
            EventBody::Marker { .. } => {
                if self.start_time >= t {
                    return TrimOutcome::Emptied;
                }
            }
        }
        match self.last_sample_time() {
            Some(last) => {
                self.end_time = Some(last);
                TrimOutcome::Trimmed
            }
            None => TrimOutcome::Emptied,
        }
    }

    /// Drop every sample before `t`. The start moves to the new first sample.
    ///
    /// A stroke's geometry anchor moves past the dropped samples.
    pub fn trim_until(&mut self, t: TimeMs) -> TrimOutcome {
        match &mut self.body {
            EventBody::Stroke(s) => {
                let removed = sample::trim_head(&mut s.samples, t);
                if let Some(last) = removed.last() {
                    s.pb_start = last.pb_index;
                }
                s.draw_index = 0;
            }
            EventBody::PointerMovement(p) => {
                sample::trim_head(&mut p.samples, t);
            }
            EventBody::Marker { .. } => {
                if self.start_time < t {
                    return TrimOutcome::Emptied;
                }
            }
        }
        match self.first_sample_time() {
            Some(first) => {
                self.start_time = first;
                TrimOutcome::Trimmed
            }
            None => TrimOutcome::Emptied,
        }
    }

    /// Cut the window `[from, to)` out of the event.
    ///
    /// The receiver keeps the samples before `from`. Samples at or after
    /// `to` move into a new event with a fresh id, pushed onto `inserted`.
    /// When either side is empty this degrades to [`Event::trim_until`] or
    /// [`Event::trim_from`] and nothing is pushed.
    pub fn trim_range(
        &mut self,
        from: TimeMs,
        to: TimeMs,
        ids: &mut IdAllocator,
        inserted: &mut Vec<Event>,
    ) -> TrimOutcome {
        let (has_head, has_tail) = match &self.body {
            EventBody::Stroke(s) => (
                sample::lower_bound(&s.samples, from) > 0,
                sample::lower_bound(&s.samples, to) < s.samples.len(),
            ),
            EventBody::PointerMovement(p) => (
                sample::lower_bound(&p.samples, from) > 0,
                sample::lower_bound(&p.samples, to) < p.samples.len(),
            ),
            EventBody::Marker { .. } => (self.start_time < from, self.start_time >= to),
        };

        match (has_head, has_tail) {
            (false, false) => TrimOutcome::Emptied,
            (false, true) => self.trim_until(to),
            (true, false) => self.trim_from(from),
            (true, true) => {
                let mut tail = self.duplicate(ids.next_id());
                tail.trim_until(to);
                self.trim_from(from);
                inserted.push(tail);
                TrimOutcome::Trimmed
            }
        }
    }

    /// Deep copy with a fresh identity and a reset replay cursor.
    pub fn duplicate(&self, id: EventId) -> Event {
        let mut copy = self.clone();
        copy.id = id;
        if let Some(s) = copy.as_stroke_mut() {
            s.reset_draw_cursor();
        }
        copy
    }

    /// Move a stroke on the canvas. Returns false for other events.
    pub fn translate(&mut self, dx: f64, dy: f64) -> bool {
        match self.as_stroke_mut() {
            Some(s) => {
                s.transform.translate(dx, dy);
                true
            }
            None => false,
        }
    }

    /// Pointer position at time `t`: the latest sample at or before `t`,
    /// or the first sample if `t` precedes the event.
    pub fn cursor_position(&self, t: TimeMs) -> Option<Point2D> {
        match &self.body {
            EventBody::Stroke(s) => sample::latest_at(&s.samples, t)
                .or_else(|| s.samples.first())
                .map(|smp| s.transform.apply(smp.position())),
            EventBody::PointerMovement(p) => p.position_at(t),
            EventBody::Marker { .. } => None,
        }
    }

    /// Full-replay step. `None` for events without geometry.
    pub fn draw_until(&mut self, t: TimeMs) -> Option<DrawStep> {
        let open = self.is_open();
        self.as_stroke_mut().map(|s| s.draw_until(t, open))
    }

    /// Incremental-replay step. `None` for events without geometry.
    pub fn draw_from_index_until(&mut self, limit: TimeMs) -> Option<DrawStep> {
        let open = self.is_open();
        self.as_stroke_mut()
            .map(|s| s.draw_from_index_until(limit, open))
    }

    pub fn reset_draw_cursor(&mut self) {
        if let Some(s) = self.as_stroke_mut() {
            s.reset_draw_cursor();
        }
    }

    /// Whether the sample list is sorted and stroke geometry indices never
    /// go backwards. Samples whose points fell outside the canvas repeat
    /// the previous index.
    pub fn samples_well_formed(&self) -> bool {
        match &self.body {
            EventBody::Stroke(s) => {
                sample::is_time_sorted(&s.samples)
                    && s.samples.windows(2).all(|w| w[0].pb_index <= w[1].pb_index)
                    && s.samples.first().map_or(true, |f| f.pb_index >= s.pb_start)
            }
            EventBody::PointerMovement(p) => sample::is_time_sorted(&p.samples),
            EventBody::Marker { .. } => true,
        }
    }
}

/// Parse events from JSONL content, skipping `#` header lines.
pub fn parse_events(jsonl: &str) -> Result<Vec<Event>, serde_json::Error> {
    jsonl
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(serde_json::from_str)
        .collect()
}

/// Parse the `#` header line of an events JSONL file, if present.
pub fn parse_header(jsonl: &str) -> Option<EventStreamHeader> {
    let first = jsonl.lines().next()?.trim();
    let body = first.strip_prefix('#')?;
    serde_json::from_str(body.trim()).ok()
}

/// Serialize events to JSONL with a leading header line.
pub fn serialize_events(events: &[Event]) -> Result<String, serde_json::Error> {
    let header = EventStreamHeader {
        schema_version: "1.0".to_string(),
        written_at: chrono::Utc::now().to_rfc3339(),
        event_count: events.len(),
    };
    let mut output = format!("# {}\n", serde_json::to_string(&header)?);
    for event in events {
        output.push_str(&serde_json::to_string(event)?);
        output.push('\n');
    }
    Ok(output)
}
