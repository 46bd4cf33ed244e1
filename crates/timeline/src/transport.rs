//! Transport state machine: idle, recording, playing.
//!
//! The transport owns the time cursor. While recording or playing, the
//! current time is the cursor at the moment the state was entered plus
//! the time elapsed on the clock since then.

use serde::{Deserialize, Serialize};

use inkcast_common::clock::{TimeMs, TimeSource};

use crate::error::{TimelineError, TimelineResult};

/// Starting playback this close to the end rewinds to the beginning.
pub const REWIND_MARGIN_MS: TimeMs = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransportState {
    Idle,
    Recording,
    Playing,
}

pub struct Transport {
    state: TransportState,
    clock: Box<dyn TimeSource>,

    /// Cursor position when the current state was entered (or the cursor
    /// itself while idle).
    cursor: TimeMs,

    /// Upper bound of recorded time.
    total_time_recorded: TimeMs,
}

impl std::fmt::Debug for Transport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Transport")
            .field("state", &self.state)
            .field("cursor", &self.cursor)
            .field("total_time_recorded", &self.total_time_recorded)
            .finish()
    }
}

impl Transport {
    pub fn new(clock: Box<dyn TimeSource>) -> Self {
        Self {
            state: TransportState::Idle,
            clock,
            cursor: 0,
            total_time_recorded: 0,
        }
    }

    pub fn state(&self) -> TransportState {
        self.state
    }

    pub fn is_idle(&self) -> bool {
        self.state == TransportState::Idle
    }

    pub fn is_recording(&self) -> bool {
        self.state == TransportState::Recording
    }

    pub fn is_playing(&self) -> bool {
        self.state == TransportState::Playing
    }

    /// Fail with [`TimelineError::Busy`] unless idle.
    pub fn require_idle(&self) -> TimelineResult<()> {
        if self.is_idle() {
            Ok(())
        } else {
            Err(TimelineError::Busy { state: self.state })
        }
    }

    /// Current position on the timeline.
    pub fn current_time(&self) -> TimeMs {
        match self.state {
            TransportState::Idle => self.cursor,
            TransportState::Recording | TransportState::Playing => {
                self.cursor + self.clock.elapsed_ms()
            }
        }
    }

    pub fn total_time_recorded(&self) -> TimeMs {
        self.total_time_recorded
    }

    /// Raise the recorded-time bound to at least `t`.
    pub fn extend_total(&mut self, t: TimeMs) {
        self.total_time_recorded = self.total_time_recorded.max(t);
    }

    pub fn set_total_time_recorded(&mut self, t: TimeMs) {
        self.total_time_recorded = t.max(0);
    }

    /// Start recording at the end of the recorded time.
    pub fn start_recording(&mut self) -> TimelineResult<TimeMs> {
        self.require_idle()?;
        self.cursor = self.total_time_recorded;
        self.clock.restart();
        self.state = TransportState::Recording;
        tracing::info!(at = self.cursor, "Recording started");
        Ok(self.cursor)
    }

    /// Stop recording. Returns the time recording stopped at.
    pub fn stop_recording(&mut self) -> TimeMs {
        if !self.is_recording() {
            return self.cursor;
        }
        self.cursor = self.current_time();
        self.state = TransportState::Idle;
        self.extend_total(self.cursor);
        tracing::info!(at = self.cursor, "Recording stopped");
        self.cursor
    }

    /// Start playback from the cursor, rewinding first if the cursor sits
    /// at the end.
    pub fn play(&mut self) -> TimelineResult<TimeMs> {
        self.require_idle()?;
        if self.cursor >= self.total_time_recorded - REWIND_MARGIN_MS {
            self.cursor = 0;
        }
        self.resume();
        tracing::info!(at = self.cursor, "Playback started");
        Ok(self.cursor)
    }

    fn resume(&mut self) {
        self.clock.restart();
        self.state = TransportState::Playing;
    }

    /// Stop playback, leaving the cursor where it was.
    pub fn stop(&mut self) -> TimeMs {
        if self.is_playing() {
            self.cursor = self.current_time().min(self.total_time_recorded);
            self.state = TransportState::Idle;
            tracing::info!(at = self.cursor, "Playback stopped");
        }
        self.cursor
    }

    /// Stop playback once the cursor passes the recorded time.
    /// Returns true if playback stopped on this call.
    pub fn tick(&mut self) -> bool {
        if self.is_playing() && self.current_time() > self.total_time_recorded {
            self.stop();
            return true;
        }
        false
    }

    /// Move the cursor. Playback continues from the new position.
    pub fn seek(&mut self, t: TimeMs) -> TimelineResult<TimeMs> {
        if self.is_recording() {
            return Err(TimelineError::Busy { state: self.state });
        }
        let was_playing = self.is_playing();
        self.stop();
        self.cursor = t.clamp(0, self.total_time_recorded);
        if was_playing {
            self.resume();
        }
        tracing::debug!(at = self.cursor, resumed = was_playing, "Seek");
        Ok(self.cursor)
    }
}
