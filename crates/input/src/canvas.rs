//! Pixel-space pen input mapped onto the timeline.
//!
//! The canvas is a page `ratio` times taller than it is wide, seen through
//! a window that may show only part of it. Device positions arrive in
//! window pixels and are mapped to normalized canvas coordinates: x spans
//! `[-1, 1]` across the width, y runs from `1` at the top of the page to
//! `-1` at the bottom.
//!
//! Entry points are called in a fixed order so the log never holds an
//! open stroke and an open pointer movement at the same time: a press ends
//! the hover movement before the stroke begins, and a release begins a new
//! hover movement after the stroke ends.

use serde::{Deserialize, Serialize};

use inkcast_session_model::{MarkerKind, Point2D};
use inkcast_timeline::{Timeline, TimelineError, TimelineResult, TransportState};

/// Window and page dimensions.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CanvasGeometry {
    /// Window width in pixels.
    pub width: f64,

    /// Window height in pixels.
    pub height: f64,

    /// Page height / width ratio.
    pub ratio: f64,
}

impl Default for CanvasGeometry {
    fn default() -> Self {
        Self {
            width: 1280.0,
            height: 720.0,
            ratio: 2.0,
        }
    }
}

impl CanvasGeometry {
    /// Page height in pixels.
    pub fn total_height(&self) -> f64 {
        self.width * self.ratio
    }

    /// Largest viewport offset, as a fraction of the page height.
    pub fn max_scroll(&self) -> f64 {
        let total = self.total_height();
        if total <= 0.0 {
            return 0.0;
        }
        (1.0 - self.height / total).max(0.0)
    }
}

#[derive(Debug, Clone, Default)]
pub struct CanvasInput {
    geometry: CanvasGeometry,

    /// Top of the window as a fraction of the page height.
    viewport_start: f64,

    pen_down: bool,
    hovering: bool,
    last: Option<Point2D>,
}

impl CanvasInput {
    pub fn new(geometry: CanvasGeometry) -> Self {
        Self {
            geometry,
            ..Self::default()
        }
    }

    pub fn geometry(&self) -> CanvasGeometry {
        self.geometry
    }

    pub fn viewport_start(&self) -> f64 {
        self.viewport_start
    }

    pub fn is_pen_down(&self) -> bool {
        self.pen_down
    }

    /// Map a window pixel position to canvas coordinates.
    pub fn to_canvas(&self, px: f64, py: f64) -> Point2D {
        let g = &self.geometry;
        let x = px / g.width * 2.0 - 1.0;
        let y = (py / g.total_height() + self.viewport_start) * -2.0 + 1.0;
        Point2D::new(x, y)
    }

    /// Pen touched the canvas. Rejected unless recording, in which case no
    /// geometry is appended.
    pub fn press(&mut self, timeline: &mut Timeline, px: f64, py: f64) -> TimelineResult<()> {
        if timeline.state() != TransportState::Recording {
            return Err(TimelineError::NotRecording);
        }
        if self.pen_down {
            return Ok(());
        }
        let pos = self.to_canvas(px, py);

        self.end_hover(timeline);
        let points = timeline.points_mut();
        points.reset_spacing();
        let pb_start = points.len();
        let pb_index = points.add_point(pos);
        timeline.add_stroke_begin_event(pos, pb_start, pb_index)?;

        self.pen_down = true;
        self.last = Some(pos);
        Ok(())
    }

    /// Pen or pointer moved.
    pub fn motion(&mut self, timeline: &mut Timeline, px: f64, py: f64) -> TimelineResult<()> {
        let pos = self.to_canvas(px, py);
        if self.pen_down {
            let from = self.last.unwrap_or(pos);
            let pb_index = timeline.points_mut().add_segment(from, pos);
            timeline.add_stroke_move_event(pos, pb_index)?;
        } else if self.hovering {
            timeline.add_pointer_move_event(pos);
        } else {
            self.hovering = timeline.add_pointer_begin_event(pos).is_some();
        }
        self.last = Some(pos);
        Ok(())
    }

    /// Pen lifted. The pointer keeps being tracked as hover movement.
    pub fn release(&mut self, timeline: &mut Timeline, px: f64, py: f64) -> TimelineResult<()> {
        if !self.pen_down {
            return Ok(());
        }
        self.motion(timeline, px, py)?;
        self.pen_down = false;
        timeline.add_stroke_end_event()?;

        let pos = self.to_canvas(px, py);
        self.hovering = timeline.add_pointer_begin_event(pos).is_some();
        Ok(())
    }

    /// Pointer left the window.
    pub fn leave(&mut self, timeline: &mut Timeline) {
        self.end_hover(timeline);
    }

    fn end_hover(&mut self, timeline: &mut Timeline) {
        if self.hovering {
            timeline.add_pointer_end_event();
            self.hovering = false;
        }
    }

    /// Scroll the viewport to `offset` (fraction of the page height) and
    /// record it. Returns the clamped offset.
    pub fn scroll(&mut self, timeline: &mut Timeline, offset: f64) -> f64 {
        self.viewport_start = offset.clamp(0.0, self.geometry.max_scroll());
        timeline.add_marker(MarkerKind::Scroll {
            offset: self.viewport_start,
        });
        self.viewport_start
    }

    /// Forget pen and hover state, e.g. after the recording paused.
    pub fn reset(&mut self) {
        self.pen_down = false;
        self.hovering = false;
        self.last = None;
    }
}
