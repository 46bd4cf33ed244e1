//! Timestamped samples inside multi-sample events.
//!
//! Sample lists are always sorted by time. The helpers here implement the
//! half-open trimming rules shared by every event variant: trimming from
//! `t` drops samples with `time >= t`, trimming until `t` drops samples
//! with `time < t`.

use serde::{Deserialize, Serialize};

use inkcast_common::clock::TimeMs;

use crate::geometry::Point2D;

/// Anything carrying a timeline timestamp.
pub trait Timed {
    fn time(&self) -> TimeMs;
    fn set_time(&mut self, t: TimeMs);
}

/// One sample of a pen stroke.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StrokeSample {
    #[serde(rename = "t")]
    pub time: TimeMs,
    pub x: f64,
    pub y: f64,
    /// Point buffer length right after this sample's geometry was appended.
    #[serde(rename = "pb")]
    pub pb_index: usize,
}

/// One sample of pointer movement. Pointer samples have no geometry.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PointerSample {
    #[serde(rename = "t")]
    pub time: TimeMs,
    pub x: f64,
    pub y: f64,
}

impl StrokeSample {
    pub fn new(time: TimeMs, pos: Point2D, pb_index: usize) -> Self {
        Self {
            time,
            x: pos.x,
            y: pos.y,
            pb_index,
        }
    }

    pub fn position(&self) -> Point2D {
        Point2D::new(self.x, self.y)
    }
}

impl PointerSample {
    pub fn new(time: TimeMs, pos: Point2D) -> Self {
        Self {
            time,
            x: pos.x,
            y: pos.y,
        }
    }

    pub fn position(&self) -> Point2D {
        Point2D::new(self.x, self.y)
    }
}

impl Timed for StrokeSample {
    fn time(&self) -> TimeMs {
        self.time
    }

    fn set_time(&mut self, t: TimeMs) {
        self.time = t;
    }
}

impl Timed for PointerSample {
    fn time(&self) -> TimeMs {
        self.time
    }

    fn set_time(&mut self, t: TimeMs) {
        self.time = t;
    }
}

/// Index of the first sample with `time >= t`.
pub fn lower_bound<S: Timed>(samples: &[S], t: TimeMs) -> usize {
    samples.partition_point(|s| s.time() < t)
}

/// Index of the first sample with `time > t`.
pub fn upper_bound<S: Timed>(samples: &[S], t: TimeMs) -> usize {
    samples.partition_point(|s| s.time() <= t)
}

/// Drop every sample with `time >= t`. Returns how many were dropped.
pub fn trim_tail<S: Timed>(samples: &mut Vec<S>, t: TimeMs) -> usize {
    let cut = lower_bound(samples, t);
    let dropped = samples.len() - cut;
    samples.truncate(cut);
    dropped
}

/// Drop every sample with `time < t` and return them.
pub fn trim_head<S: Timed>(samples: &mut Vec<S>, t: TimeMs) -> Vec<S> {
    let cut = lower_bound(samples, t);
    samples.drain(..cut).collect()
}

/// Split off the samples with `time >= to`, then drop those with
/// `time >= from` from the receiver. Returns `(removed_middle, tail)`.
pub fn split_out<S: Timed>(samples: &mut Vec<S>, from: TimeMs, to: TimeMs) -> (Vec<S>, Vec<S>) {
    let tail_start = lower_bound(samples, to.max(from));
    let tail = samples.split_off(tail_start);
    let head_end = lower_bound(samples, from);
    let middle = samples.split_off(head_end);
    (middle, tail)
}

/// Apply `f` to every sample time.
pub fn remap_times<S: Timed>(samples: &mut [S], f: impl Fn(TimeMs) -> TimeMs) {
    for s in samples {
        s.set_time(f(s.time()));
    }
}

/// Latest sample at or before `t`.
pub fn latest_at<S: Timed>(samples: &[S], t: TimeMs) -> Option<&S> {
    let idx = upper_bound(samples, t);
    if idx == 0 {
        None
    } else {
        samples.get(idx - 1)
    }
}

/// Whether a sample list is sorted by time.
pub fn is_time_sorted<S: Timed>(samples: &[S]) -> bool {
    samples.windows(2).all(|w| w[0].time() <= w[1].time())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn samples(times: &[TimeMs]) -> Vec<PointerSample> {
        times
            .iter()
            .map(|&t| PointerSample::new(t, Point2D::new(0.0, 0.0)))
            .collect()
    }

    fn times(samples: &[PointerSample]) -> Vec<TimeMs> {
        samples.iter().map(|s| s.time).collect()
    }

    #[test]
    fn test_trim_tail_is_inclusive_of_boundary() {
        let mut s = samples(&[0, 10, 20, 30]);
        assert_eq!(trim_tail(&mut s, 20), 2);
        assert_eq!(times(&s), vec![0, 10]);
    }

    #[test]
    fn test_trim_head_keeps_sample_at_boundary() {
        let mut s = samples(&[0, 10, 20, 30]);
        let removed = trim_head(&mut s, 20);
        assert_eq!(times(&removed), vec![0, 10]);
        assert_eq!(times(&s), vec![20, 30]);
    }

    #[test]
    fn test_split_out_middle() {
        let mut s = samples(&[0, 10, 20, 30, 40]);
        let (middle, tail) = split_out(&mut s, 10, 30);
        assert_eq!(times(&s), vec![0]);
        assert_eq!(times(&middle), vec![10, 20]);
        assert_eq!(times(&tail), vec![30, 40]);
    }

    #[test]
    fn test_latest_at() {
        let s = samples(&[5, 10, 20]);
        assert!(latest_at(&s, 4).is_none());
        assert_eq!(latest_at(&s, 10).unwrap().time, 10);
        assert_eq!(latest_at(&s, 19).unwrap().time, 10);
        assert_eq!(latest_at(&s, 100).unwrap().time, 20);
    }
}
