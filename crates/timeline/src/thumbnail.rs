//! Timeline thumbnail strip.
//!
//! A low-resolution summary of the session, addressed in pixels per
//! millisecond: one row of colors marking where strokes happen and a row of
//! audio amplitude bars. It is a cache derived from the event log and the
//! audio track and can always be rebuilt from them.

use inkcast_common::clock::TimeMs;
use inkcast_common::config::ThumbnailDefaults;
use inkcast_session_model::{Event, EventBody, Rgb};

use crate::audio::AudioTrack;
use crate::event_log::EventLog;

const MARKER_COLOR: Rgb = Rgb {
    r: 0.4,
    g: 0.4,
    b: 0.4,
};

#[derive(Debug, Clone)]
pub struct ThumbnailStrip {
    pixels_per_ms: f64,
    samples_per_bar: usize,

    /// One entry per pixel column. `None` is empty time.
    video: Vec<Option<Rgb>>,

    /// Peak amplitude in `[0, 1]` per bar.
    audio: Vec<f32>,
}

impl Default for ThumbnailStrip {
    fn default() -> Self {
        Self::new(&ThumbnailDefaults::default())
    }
}

impl ThumbnailStrip {
    pub fn new(config: &ThumbnailDefaults) -> Self {
        Self {
            pixels_per_ms: config.pixels_per_second / 1000.0,
            samples_per_bar: config.samples_per_bar.max(1) as usize,
            video: Vec::new(),
            audio: Vec::new(),
        }
    }

    pub fn pixels_per_ms(&self) -> f64 {
        self.pixels_per_ms
    }

    /// Pixel column of time `t`.
    pub fn pixel_at(&self, t: TimeMs) -> usize {
        (t.max(0) as f64 * self.pixels_per_ms) as usize
    }

    /// Time at the left edge of pixel column `x`.
    pub fn time_at(&self, x: usize) -> TimeMs {
        if self.pixels_per_ms <= 0.0 {
            return 0;
        }
        (x as f64 / self.pixels_per_ms).round() as TimeMs
    }

    pub fn video(&self) -> &[Option<Rgb>] {
        &self.video
    }

    pub fn audio_bars(&self) -> &[f32] {
        &self.audio
    }

    pub fn width(&self) -> usize {
        self.video.len()
    }

    /// Paint one event over its span. Pointer movement leaves no trace.
    pub fn paint_event(&mut self, ev: &Event) {
        let color = match &ev.body {
            EventBody::Stroke(s) => s.color,
            EventBody::Marker { .. } => MARKER_COLOR,
            EventBody::PointerMovement(_) => return,
        };
        let end = ev.end_time.unwrap_or(ev.start_time);
        let from = self.pixel_at(ev.start_time);
        let to = self.pixel_at(end).max(from + 1);
        if self.video.len() < to {
            self.video.resize(to, None);
        }
        self.video[from..to].fill(Some(color));
    }

    /// Blank the columns covering `[from, to)`.
    pub fn clear_range(&mut self, from: TimeMs, to: TimeMs) {
        let end = self.pixel_at(to).min(self.video.len());
        let start = self.pixel_at(from).min(end);
        self.video[start..end].fill(None);
    }

    /// Rebuild the video row from the log.
    pub fn repaint(&mut self, log: &EventLog) {
        self.video.clear();
        for ev in log.iter() {
            self.paint_event(ev);
        }
    }

    /// Rebuild the audio row: one bar per `samples_per_bar` samples.
    pub fn repaint_audio(&mut self, audio: &AudioTrack) {
        let count = audio.sample_count();
        self.audio = (0..count)
            .step_by(self.samples_per_bar)
            .map(|first| {
                (first..(first + self.samples_per_bar).min(count))
                    .filter_map(|i| audio.sample(i))
                    .fold(0.0_f32, |peak, s| peak.max(s.abs()))
            })
            .collect();
    }

    /// Time covered by audio bar `bar`.
    pub fn bar_time(&self, audio: &AudioTrack, bar: usize) -> TimeMs {
        audio.sample_time(bar * self.samples_per_bar)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event_log::tests::{pointer, stroke};
    use inkcast_session_model::{AudioFormat, EventId, MarkerKind};

    #[test]
    fn test_paint_stroke_span() {
        let mut log = EventLog::new();
        let ev = stroke(&mut log, 1000, 2000);
        let mut strip = ThumbnailStrip::default();
        strip.paint_event(&ev);
        // 20 px per second.
        assert_eq!(strip.width(), 40);
        assert!(strip.video()[..20].iter().all(Option::is_none));
        assert!(strip.video()[20..40].iter().all(|c| *c == Some(Rgb::BLACK)));
    }

    #[test]
    fn test_pointer_movement_is_not_painted() {
        let mut log = EventLog::new();
        let ev = pointer(&mut log, 0, 5000);
        let mut strip = ThumbnailStrip::default();
        strip.paint_event(&ev);
        assert_eq!(strip.width(), 0);
    }

    #[test]
    fn test_marker_gets_one_column() {
        let mut strip = ThumbnailStrip::default();
        strip.paint_event(&Event::marker(EventId(0), 500, MarkerKind::Undo));
        assert_eq!(strip.width(), 11);
        assert_eq!(strip.video()[10], Some(MARKER_COLOR));
    }

    #[test]
    fn test_clear_and_repaint() {
        let mut log = EventLog::new();
        let a = stroke(&mut log, 0, 1000);
        let b = stroke(&mut log, 2000, 3000);
        log.insert_sorted(a);
        log.insert_sorted(b);
        let mut strip = ThumbnailStrip::default();
        strip.repaint(&log);
        assert_eq!(strip.width(), 60);

        strip.clear_range(0, 1000);
        assert!(strip.video()[..20].iter().all(Option::is_none));

        strip.repaint(&log);
        assert!(strip.video()[..20].iter().all(Option::is_some));
    }

    #[test]
    fn test_audio_bars_hold_peaks() {
        let mut audio = AudioTrack::new(AudioFormat {
            sample_rate: 1000,
            sample_size: 2,
        });
        for i in 0..25i16 {
            let v: i16 = if i == 12 { 16_384 } else { 0 };
            audio.append(&v.to_le_bytes());
        }
        let mut strip = ThumbnailStrip::default();
        strip.repaint_audio(&audio);
        assert_eq!(strip.audio_bars().len(), 3);
        assert_eq!(strip.audio_bars()[0], 0.0);
        assert_eq!(strip.audio_bars()[1], 0.5);
        assert_eq!(strip.bar_time(&audio, 2), 20);
    }
}
