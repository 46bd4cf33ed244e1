//! Clock and timing utilities for the session timeline.
//!
//! Event times are integer milliseconds on the session timeline. While
//! recording or playing, the timeline reads a monotonic clock started at
//! record/play begin and offsets it by the cursor position at that moment.
//! This module provides:
//! - The [`TimeSource`] abstraction and its monotonic/manual implementations
//! - Drift measurement between the audio stream and the event timeline
//! - A rate controller used to pace display refreshes

use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;
use std::time::Instant;

/// Milliseconds on the session timeline.
pub type TimeMs = i64;

/// A source of elapsed milliseconds since the last `restart`.
pub trait TimeSource: Send {
    /// Re-anchor the source so that `elapsed_ms` starts again from zero.
    fn restart(&mut self);

    /// Milliseconds elapsed since the last restart.
    fn elapsed_ms(&self) -> TimeMs;
}

/// A recording clock that provides monotonic timestamps relative to
/// a fixed epoch (the moment recording or playback started).
#[derive(Debug, Clone)]
pub struct RecordingClock {
    /// The instant the clock was (re)started.
    epoch: Instant,

    /// Wall-clock time at epoch (ISO 8601 string).
    epoch_wall: String,
}

impl RecordingClock {
    /// Create a new recording clock anchored to now.
    pub fn start() -> Self {
        Self {
            epoch: Instant::now(),
            epoch_wall: chrono::Utc::now().to_rfc3339(),
        }
    }

    /// Get milliseconds elapsed since the epoch.
    pub fn elapsed_ms(&self) -> TimeMs {
        self.epoch.elapsed().as_millis() as TimeMs
    }

    /// Wall-clock time at the epoch.
    pub fn epoch_wall(&self) -> &str {
        &self.epoch_wall
    }

    /// Convert milliseconds to fractional seconds.
    pub fn ms_to_secs(ms: TimeMs) -> f64 {
        ms as f64 / 1000.0
    }

    /// Convert fractional seconds to milliseconds.
    pub fn secs_to_ms(secs: f64) -> TimeMs {
        (secs * 1000.0) as TimeMs
    }
}

impl TimeSource for RecordingClock {
    fn restart(&mut self) {
        *self = Self::start();
    }

    fn elapsed_ms(&self) -> TimeMs {
        RecordingClock::elapsed_ms(self)
    }
}

/// A clock whose elapsed time is set explicitly.
///
/// Clones share the same underlying value, so a test or a journal replayer
/// can keep a handle and drive the timeline's notion of "now".
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    now: Arc<AtomicI64>,
    anchor: TimeMs,
}

impl ManualClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the absolute value of the underlying counter.
    pub fn set(&self, ms: TimeMs) {
        self.now.store(ms, Ordering::SeqCst);
    }

    /// Advance the underlying counter.
    pub fn advance(&self, ms: TimeMs) {
        self.now.fetch_add(ms, Ordering::SeqCst);
    }

    /// Current value of the underlying counter.
    pub fn now(&self) -> TimeMs {
        self.now.load(Ordering::SeqCst)
    }
}

impl TimeSource for ManualClock {
    fn restart(&mut self) {
        self.anchor = self.now();
    }

    fn elapsed_ms(&self) -> TimeMs {
        self.now() - self.anchor
    }
}

/// Drift measurement between two streams.
#[derive(Debug, Clone, Copy)]
pub struct DriftMeasurement {
    /// Timestamp in the reference stream (ms), usually the event timeline.
    pub reference_ms: TimeMs,
    /// Timestamp in the measured stream (ms), usually the audio track.
    pub measured_ms: TimeMs,
}

impl DriftMeasurement {
    /// Drift in milliseconds (positive = measured is ahead).
    pub fn drift_ms(&self) -> TimeMs {
        self.measured_ms - self.reference_ms
    }

    /// Whether drift exceeds an acceptable threshold.
    pub fn exceeds_threshold_ms(&self, threshold_ms: TimeMs) -> bool {
        self.drift_ms().abs() > threshold_ms
    }
}

/// Frame rate controller for display refresh pacing.
#[derive(Debug)]
pub struct RateController {
    target_interval_ns: u64,
    last_tick_ns: Option<u64>,
}

impl RateController {
    /// Create a controller targeting the given Hz rate.
    pub fn new(target_hz: u32) -> Self {
        Self {
            target_interval_ns: 1_000_000_000 / target_hz.max(1) as u64,
            last_tick_ns: None,
        }
    }

    /// Check if enough time has passed for the next tick.
    /// Returns true and updates internal state if ready.
    /// The first call always returns true.
    pub fn should_tick(&mut self, current_ns: u64) -> bool {
        match self.last_tick_ns {
            None => {
                self.last_tick_ns = Some(current_ns);
                true
            }
            Some(last) if current_ns >= last + self.target_interval_ns => {
                self.last_tick_ns = Some(current_ns);
                true
            }
            _ => false,
        }
    }

    /// Target interval in nanoseconds.
    pub fn interval_ns(&self) -> u64 {
        self.target_interval_ns
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clock_elapsed() {
        let clock = RecordingClock::start();
        assert!(clock.elapsed_ms() < 1_000);
    }

    #[test]
    fn test_ms_to_secs_conversion() {
        assert!((RecordingClock::ms_to_secs(1_500) - 1.5).abs() < 1e-9);
        assert_eq!(RecordingClock::secs_to_ms(2.0), 2_000);
    }

    #[test]
    fn test_manual_clock_restart_reanchors() {
        let handle = ManualClock::new();
        let mut clock = handle.clone();

        handle.set(400);
        assert_eq!(clock.elapsed_ms(), 400);

        clock.restart();
        assert_eq!(clock.elapsed_ms(), 0);

        handle.advance(25);
        assert_eq!(clock.elapsed_ms(), 25);
    }

    #[test]
    fn test_drift_measurement() {
        let drift = DriftMeasurement {
            reference_ms: 1_000,
            measured_ms: 1_050,
        };
        assert_eq!(drift.drift_ms(), 50);
        assert!(drift.exceeds_threshold_ms(10));
        assert!(!drift.exceeds_threshold_ms(100));
    }

    #[test]
    fn test_rate_controller() {
        let mut ctrl = RateController::new(60);
        assert!(ctrl.should_tick(0)); // first tick always fires
        assert!(!ctrl.should_tick(1_000_000)); // 1ms later, too soon
        assert!(ctrl.should_tick(17_000_000)); // ~17ms later, should fire (60Hz ~ 16.67ms)
    }
}
