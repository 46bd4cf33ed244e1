//! The timeline context.
//!
//! [`Timeline`] owns one session's worth of state (geometry, events, audio,
//! transport, editing and replay progress) and is the single entry point
//! input sources, editors and the display loop talk to. Nothing here is
//! global: every collaborator is constructed once and reached through the
//! context.
//!
//! Recording input is only accepted while recording. Edits require the
//! transport to be idle and fail with [`TimelineError::Busy`] otherwise.

use inkcast_common::clock::{DriftMeasurement, TimeMs, TimeSource};
use inkcast_common::config::ThumbnailDefaults;
use inkcast_session_model::{
    AudioFormat, Event, EventId, LoadedSession, MarkerKind, Point2D, PointBuffer, PointerSample,
    Rgb, SessionError, SessionMeta, Stroke, StrokeSample, StrokeTool,
};

use crate::audio::AudioTrack;
use crate::edit::{EditController, MovePreview, Selection};
use crate::error::{TimelineError, TimelineResult};
use crate::event_log::{earliest_start, DeleteSummary, EventLog};
use crate::replay::{RenderBackend, ReplayEngine};
use crate::thumbnail::ThumbnailStrip;
use crate::transport::{Transport, TransportState};

/// Audio/event drift above this is reported when a recording pauses.
const DRIFT_WARN_MS: TimeMs = 50;

/// Where the narration track is written inside a session directory.
pub const AUDIO_FILE: &str = "audio/narration.pcm";

/// Tool settings applied to the next stroke.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Brush {
    pub tool: StrokeTool,
    pub color: Rgb,
    pub point_size: f32,
}

impl Default for Brush {
    fn default() -> Self {
        Self {
            tool: StrokeTool::Pen,
            color: Rgb::BLACK,
            point_size: 3.0,
        }
    }
}

/// Narration lifted out by a pending move.
#[derive(Debug, Clone)]
struct MovedAudio {
    origin: TimeMs,
    bytes: Vec<u8>,
}

pub struct Timeline {
    points: PointBuffer,
    log: EventLog,
    replay: ReplayEngine,
    transport: Transport,
    edit: EditController,
    audio: AudioTrack,
    thumbnails: ThumbnailStrip,
    brush: Brush,

    open_stroke: Option<EventId>,
    open_pointer: Option<EventId>,

    /// The next frame clears the surface and replays from scratch.
    full_redraw: bool,

    audio_clipboard: Vec<u8>,

    /// How far the earliest copied event starts after the copied window.
    audio_lead: TimeMs,

    moved_audio: Option<MovedAudio>,
}

impl std::fmt::Debug for Timeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Timeline")
            .field("transport", &self.transport)
            .field("events", &self.log.len())
            .field("points", &self.points.len())
            .field("audio_ms", &self.audio.duration_ms())
            .finish()
    }
}

impl Timeline {
    /// An empty timeline configured from session metadata.
    pub fn new(
        meta: &SessionMeta,
        thumbnails: &ThumbnailDefaults,
        clock: Box<dyn TimeSource>,
    ) -> Self {
        Self::with_parts(
            PointBuffer::new(meta.canvas.resample, meta.canvas.point_capacity),
            EventLog::new(),
            AudioTrack::new(meta.audio),
            thumbnails,
            clock,
        )
    }

    fn with_parts(
        points: PointBuffer,
        log: EventLog,
        audio: AudioTrack,
        thumbnails: &ThumbnailDefaults,
        clock: Box<dyn TimeSource>,
    ) -> Self {
        Self {
            points,
            log,
            replay: ReplayEngine::new(),
            transport: Transport::new(clock),
            edit: EditController::new(),
            audio,
            thumbnails: ThumbnailStrip::new(thumbnails),
            brush: Brush::default(),
            open_stroke: None,
            open_pointer: None,
            full_redraw: true,
            audio_clipboard: Vec::new(),
            audio_lead: 0,
            moved_audio: None,
        }
    }

    /// Rebuild a timeline from a session loaded from disk.
    ///
    /// The session is validated first; open events left by an interrupted
    /// recording are closed at their last sample.
    pub fn from_session(
        session: &LoadedSession,
        thumbnails: &ThumbnailDefaults,
        clock: Box<dyn TimeSource>,
    ) -> TimelineResult<Self> {
        session.ensure_valid()?;

        let audio = match &session.meta.audio_file {
            Some(file) => {
                let path = session.root.join(file);
                AudioTrack::load(&path, session.meta.audio)
                    .map_err(|source| SessionError::IoError { path, source })?
            }
            None => AudioTrack::new(session.meta.audio),
        };

        let mut log = EventLog::from_events(session.events.clone());
        let closed = log.close_open_events(TimeMs::MIN);
        if closed > 0 {
            tracing::warn!(closed, "Closed events left open by an interrupted recording");
        }

        let mut timeline = Self::with_parts(
            session.points.clone(),
            log,
            audio,
            thumbnails,
            clock,
        );
        let total = session
            .meta
            .total_time_recorded
            .max(timeline.log.last_time())
            .max(timeline.audio.duration_ms());
        timeline.transport.set_total_time_recorded(total);
        timeline.thumbnails.repaint(&timeline.log);
        timeline.thumbnails.repaint_audio(&timeline.audio);

        tracing::info!(
            events = timeline.log.len(),
            points = timeline.points.len(),
            total,
            "Timeline loaded"
        );
        Ok(timeline)
    }

    /// Write the timeline back into `session` (and its audio file).
    pub fn save_into(&self, session: &mut LoadedSession) -> TimelineResult<()> {
        self.transport.require_idle()?;

        session.events = self.log.events().to_vec();
        session.points = self.points.clone();
        session.meta.total_time_recorded = self.transport.total_time_recorded();
        session.meta.audio = self.audio.format();

        if !self.audio.is_empty() {
            let path = session.root.join(AUDIO_FILE);
            if let Some(dir) = path.parent() {
                std::fs::create_dir_all(dir).map_err(|source| SessionError::IoError {
                    path: dir.to_path_buf(),
                    source,
                })?;
            }
            self.audio
                .save(&path)
                .map_err(|source| SessionError::IoError { path, source })?;
            session.meta.audio_file = Some(AUDIO_FILE.to_string());
        }
        session.meta.touch();
        Ok(())
    }

    // --- Accessors ---

    pub fn state(&self) -> TransportState {
        self.transport.state()
    }

    pub fn current_time(&self) -> TimeMs {
        self.transport.current_time()
    }

    pub fn total_time_recorded(&self) -> TimeMs {
        self.transport.total_time_recorded()
    }

    pub fn log(&self) -> &EventLog {
        &self.log
    }

    pub fn points(&self) -> &PointBuffer {
        &self.points
    }

    /// The geometry buffer input sources append stroke points to.
    pub fn points_mut(&mut self) -> &mut PointBuffer {
        &mut self.points
    }

    pub fn audio(&self) -> &AudioTrack {
        &self.audio
    }

    pub fn audio_format(&self) -> AudioFormat {
        self.audio.format()
    }

    pub fn thumbnails(&self) -> &ThumbnailStrip {
        &self.thumbnails
    }

    pub fn brush(&self) -> Brush {
        self.brush
    }

    pub fn set_brush(&mut self, brush: Brush) {
        self.brush = brush;
    }

    pub fn selection(&self) -> Option<Selection> {
        self.edit.selection()
    }

    pub fn clipboard(&self) -> &[Event] {
        self.edit.clipboard()
    }

    pub fn is_moving(&self) -> bool {
        self.edit.is_moving()
    }

    /// Latest cursor position resolved by replay.
    pub fn replay_cursor(&self) -> Option<Point2D> {
        self.replay.cursor()
    }

    pub fn request_redraw(&mut self) {
        self.full_redraw = true;
    }

    // --- Recording input ---

    fn require_recording(&self) -> TimelineResult<TimeMs> {
        if self.transport.is_recording() {
            Ok(self.transport.current_time())
        } else {
            Err(TimelineError::NotRecording)
        }
    }

    /// Open a stroke with the current brush. `pb_start` is the buffer
    /// length before the stroke's first point, `pb_index` after it.
    pub fn add_stroke_begin_event(
        &mut self,
        pos: Point2D,
        pb_start: usize,
        pb_index: usize,
    ) -> TimelineResult<EventId> {
        let t = self.require_recording()?;
        if self.open_stroke.is_some() {
            tracing::warn!("Stroke began while another was open; closing it");
            self.add_stroke_end_event()?;
        }

        let stroke = match self.brush.tool {
            StrokeTool::Pen => Stroke::pen(self.brush.color, self.brush.point_size, pb_start),
            StrokeTool::Eraser => Stroke::eraser(pb_start),
        };
        let id = self.log.next_id();
        let ev = Event::stroke(id, t, stroke, StrokeSample::new(t, pos, pb_index));
        self.log.insert_sorted(ev);
        self.open_stroke = Some(id);
        tracing::trace!(%id, t, pb_start, "Stroke begin");
        Ok(id)
    }

    /// Extend the open stroke. Without an open stroke this does nothing.
    pub fn add_stroke_move_event(&mut self, pos: Point2D, pb_index: usize) -> TimelineResult<()> {
        let t = self.require_recording()?;
        if let Some(ev) = self.open_stroke.and_then(|id| self.log.get_mut(id)) {
            ev.push_stroke_sample(StrokeSample::new(t, pos, pb_index));
        }
        Ok(())
    }

    /// Close the open stroke. Returns its id, if there was one.
    pub fn add_stroke_end_event(&mut self) -> TimelineResult<Option<EventId>> {
        let t = self.require_recording()?;
        let Some(id) = self.open_stroke.take() else {
            return Ok(None);
        };
        if let Some(ev) = self.log.get_mut(id) {
            ev.close(t);
            self.thumbnails.paint_event(ev);
        }
        tracing::trace!(%id, t, "Stroke end");
        Ok(Some(id))
    }

    /// Open a pointer movement. Ignored unless recording.
    pub fn add_pointer_begin_event(&mut self, pos: Point2D) -> Option<EventId> {
        let t = self.require_recording().ok()?;
        if self.open_pointer.is_some() {
            self.add_pointer_end_event();
        }
        let id = self.log.next_id();
        self.log.insert_sorted(Event::pointer(id, t, pos));
        self.open_pointer = Some(id);
        Some(id)
    }

    pub fn add_pointer_move_event(&mut self, pos: Point2D) {
        let Ok(t) = self.require_recording() else {
            return;
        };
        if let Some(ev) = self.open_pointer.and_then(|id| self.log.get_mut(id)) {
            ev.push_pointer_sample(PointerSample::new(t, pos));
        }
    }

    pub fn add_pointer_end_event(&mut self) -> Option<EventId> {
        let t = self.require_recording().ok()?;
        let id = self.open_pointer.take()?;
        if let Some(ev) = self.log.get_mut(id) {
            ev.close(t);
        }
        Some(id)
    }

    /// Record an instantaneous marker. Ignored unless recording.
    pub fn add_marker(&mut self, kind: MarkerKind) -> Option<EventId> {
        let t = self.require_recording().ok()?;
        let id = self.log.next_id();
        let ev = Event::marker(id, t, kind);
        self.thumbnails.paint_event(&ev);
        self.log.insert_sorted(ev);
        tracing::debug!(%id, t, ?kind, "Marker");
        Some(id)
    }

    /// Append captured narration. Returns false (dropping the chunk)
    /// unless recording.
    pub fn append_audio(&mut self, bytes: &[u8]) -> bool {
        if !self.transport.is_recording() {
            tracing::trace!(len = bytes.len(), "Dropping audio outside a recording");
            return false;
        }
        self.audio.append(bytes);
        true
    }

    // --- Transport ---

    /// Start recording at the end of the recorded time.
    pub fn start_recording(&mut self) -> TimelineResult<TimeMs> {
        let at = self.transport.start_recording()?;
        self.audio.begin_capture(at);
        self.edit.clear_selection();
        self.full_redraw = true;
        Ok(at)
    }

    /// Leave recording or playback.
    ///
    /// Pausing a recording closes every open event and raises the recorded
    /// time to cover the log and the narration track.
    pub fn pause(&mut self) -> TimeMs {
        match self.transport.state() {
            TransportState::Recording => {}
            TransportState::Playing => return self.transport.stop(),
            TransportState::Idle => return self.transport.current_time(),
        }

        let t = self.transport.stop_recording();
        let closed = self.log.close_open_events(t);
        self.open_stroke = None;
        self.open_pointer = None;

        let drift = DriftMeasurement {
            reference_ms: t,
            measured_ms: self.audio.duration_ms(),
        };
        if !self.audio.is_empty() && drift.exceeds_threshold_ms(DRIFT_WARN_MS) {
            tracing::warn!(drift_ms = drift.drift_ms(), "Audio drifted from the event timeline");
        }

        let total = t.max(self.log.last_time()).max(self.audio.duration_ms());
        self.transport.extend_total(total);
        self.thumbnails.repaint(&self.log);
        self.thumbnails.repaint_audio(&self.audio);
        tracing::info!(at = t, closed, total, "Recording paused");
        t
    }

    pub fn play(&mut self) -> TimelineResult<TimeMs> {
        let at = self.transport.play()?;
        self.full_redraw = true;
        Ok(at)
    }

    pub fn stop(&mut self) -> TimeMs {
        self.transport.stop()
    }

    /// Move the cursor and redraw from scratch on the next frame.
    pub fn seek(&mut self, t: TimeMs) -> TimelineResult<TimeMs> {
        let at = self.transport.seek(t)?;
        self.full_redraw = true;
        Ok(at)
    }

    /// Run once per display refresh. Returns the number of draw requests
    /// issued.
    pub fn frame(&mut self, backend: &mut dyn RenderBackend) -> usize {
        let finished = self.transport.tick();
        if finished {
            tracing::debug!(at = self.transport.current_time(), "Playback reached the end");
        }
        let t = self.transport.current_time();

        if std::mem::take(&mut self.full_redraw) {
            self.replay
                .full_replay(&mut self.log, &self.points, t, backend)
        } else if finished || !self.transport.is_idle() {
            self.replay
                .incremental_replay(&mut self.log, &self.points, t, backend)
        } else {
            0
        }
    }

    // --- Editing ---

    pub fn select(
        &mut self,
        from: TimeMs,
        to: TimeMs,
        exact: bool,
    ) -> TimelineResult<Option<Selection>> {
        self.transport.require_idle()?;
        Ok(self.edit.select(&self.log, from, to, exact))
    }

    pub fn clear_selection(&mut self) {
        self.edit.clear_selection();
    }

    /// Copy the selected events and narration.
    pub fn copy(&mut self) -> TimelineResult<usize> {
        self.transport.require_idle()?;
        let count = self.edit.copy(&mut self.log)?;
        if let Some(sel) = self.edit.selection() {
            self.audio_clipboard = self.audio.copy_range(sel.from, sel.to);
            self.audio_lead = earliest_start(self.edit.clipboard())
                .map_or(0, |start| (start - sel.from).max(0));
        }
        Ok(count)
    }

    /// Delete the selected window from the log and silence its narration.
    pub fn delete_selection(&mut self) -> TimelineResult<DeleteSummary> {
        self.transport.require_idle()?;
        let sel = self.edit.selection().ok_or(TimelineError::NoSelection)?;
        let summary = self.edit.delete(&mut self.log)?;
        self.erase_window(sel);
        tracing::info!(
            from = sel.from,
            to = sel.to,
            removed = summary.removed,
            trimmed = summary.trimmed,
            split = summary.split,
            "Deleted selection"
        );
        Ok(summary)
    }

    pub fn cut(&mut self) -> TimelineResult<DeleteSummary> {
        self.copy()?;
        self.delete_selection()
    }

    /// Paste the clipboard at `t`.
    ///
    /// The earliest pasted event starts at `t`. Copied narration keeps its
    /// offset from the events, so it starts `audio_lead` earlier and loses
    /// whatever would fall before zero.
    pub fn paste(&mut self, t: TimeMs) -> TimelineResult<Vec<EventId>> {
        self.transport.require_idle()?;
        let ids = self.edit.paste(&mut self.log, t)?;
        if !self.audio_clipboard.is_empty() {
            let at = t - self.audio_lead;
            let skip = if at < 0 {
                self.audio.byte_offset(-at).min(self.audio_clipboard.len())
            } else {
                0
            };
            self.audio.paste_at(at.max(0), &self.audio_clipboard[skip..]);
        }
        self.after_insert();
        tracing::info!(at = t, count = ids.len(), "Pasted clipboard");
        Ok(ids)
    }

    /// Stretch the clipboard around the start of its source selection.
    ///
    /// Narration is not resampled, so a stretched clipboard pastes without
    /// audio.
    pub fn scale_clipboard(&mut self, scale: f64, dt: TimeMs) -> TimelineResult<()> {
        self.transport.require_idle()?;
        self.edit.scale_selection(scale, dt)?;
        if !is_unit_scale(scale) && !self.audio_clipboard.is_empty() {
            tracing::debug!(scale, "Dropping copied narration from a stretched clipboard");
            self.audio_clipboard.clear();
        }
        Ok(())
    }

    /// Lift the selection out of the log to start a move gesture.
    pub fn begin_move(&mut self) -> TimelineResult<DeleteSummary> {
        self.transport.require_idle()?;
        let sel = self.edit.selection().ok_or(TimelineError::NoSelection)?;
        let summary = self.edit.begin_move(&mut self.log)?;
        self.moved_audio = Some(MovedAudio {
            origin: sel.from,
            bytes: self.audio.copy_range(sel.from, sel.to),
        });
        self.erase_window(sel);
        Ok(summary)
    }

    pub fn preview_move(&self, dt: TimeMs, scale: f64) -> TimelineResult<MovePreview> {
        self.edit
            .preview(&self.log, self.transport.total_time_recorded(), dt, scale)
    }

    /// Drop the lifted selection shifted by `dt` and stretched by `scale`.
    ///
    /// Narration follows an unscaled move. A stretched move leaves its
    /// original narration silenced.
    pub fn commit_move(&mut self, dt: TimeMs, scale: f64) -> TimelineResult<MovePreview> {
        self.transport.require_idle()?;
        let total = self.transport.total_time_recorded();
        let (landing, ids) = self.edit.commit_move(&mut self.log, total, dt, scale)?;

        if let Some(moved) = self.moved_audio.take() {
            if is_unit_scale(scale) {
                self.audio.paste_at(landing.from, &moved.bytes);
            } else if !moved.bytes.is_empty() {
                tracing::warn!(scale, "Narration is not stretched with a scaled move");
            }
        }
        self.after_insert();
        tracing::info!(
            from = landing.from,
            to = landing.to,
            scale,
            count = ids.len(),
            "Moved selection"
        );
        Ok(landing)
    }

    /// Abandon the move gesture, restoring the lifted selection.
    pub fn cancel_move(&mut self) -> TimelineResult<()> {
        self.transport.require_idle()?;
        self.edit.cancel_move(&mut self.log)?;
        if let Some(moved) = self.moved_audio.take() {
            self.audio.paste_at(moved.origin, &moved.bytes);
        }
        self.after_insert();
        Ok(())
    }

    /// Move a recorded stroke on the canvas.
    pub fn translate_stroke(&mut self, id: EventId, dx: f64, dy: f64) -> TimelineResult<()> {
        self.transport.require_idle()?;
        let ev = self
            .log
            .get_mut(id)
            .ok_or(TimelineError::UnknownEvent { id })?;
        if !ev.translate(dx, dy) {
            return Err(TimelineError::UnknownEvent { id });
        }
        self.full_redraw = true;
        Ok(())
    }

    fn erase_window(&mut self, sel: Selection) {
        self.audio.erase_range(sel.from, sel.to);
        self.thumbnails.clear_range(sel.from, sel.to);
        self.thumbnails.repaint_audio(&self.audio);
        self.full_redraw = true;
    }

    fn after_insert(&mut self) {
        let end = self.log.last_time().max(self.audio.duration_ms());
        self.transport.extend_total(end);
        self.thumbnails.repaint(&self.log);
        self.thumbnails.repaint_audio(&self.audio);
        self.full_redraw = true;
    }
}

fn is_unit_scale(scale: f64) -> bool {
    (scale - 1.0).abs() < 1e-9
}
