//! Append-only arena of quantized stroke geometry.
//!
//! Every rendered stroke point lives in one shared buffer. Indices are
//! issued in insertion order and stay valid for the lifetime of the
//! buffer: nothing is ever removed, compacted, or relocated. Events refer
//! to their geometry as contiguous `[from, to)` index ranges, and a
//! rendering backend draws any such range with a single request.

use std::ops::Range;

use serde::{Deserialize, Serialize};

use crate::geometry::Point2D;

/// A point quantized to 16 bits per axis over the `[-1, 1]` canvas range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct QuantizedPoint {
    pub x: u16,
    pub y: u16,
}

impl QuantizedPoint {
    /// Quantize a normalized canvas point. Callers must check the range first.
    pub fn quantize(p: Point2D) -> Self {
        Self {
            x: quantize_axis(p.x),
            y: quantize_axis(p.y),
        }
    }

    /// Map back to normalized canvas coordinates.
    pub fn to_point(self) -> Point2D {
        Point2D::new(dequantize_axis(self.x), dequantize_axis(self.y))
    }
}

fn quantize_axis(v: f64) -> u16 {
    ((v.clamp(-1.0, 1.0) + 1.0) * 0.5 * u16::MAX as f64).round() as u16
}

fn dequantize_axis(q: u16) -> f64 {
    q as f64 / u16::MAX as f64 * 2.0 - 1.0
}

/// Arc-length resampling parameters for [`PointBuffer::add_segment`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ResampleConfig {
    /// Distance between consecutive resampled points, in normalized x units.
    pub spacing: f64,

    /// Scale applied to y deltas before measuring distance. The canvas is
    /// taller than it is wide, so one normalized y unit covers more pixels.
    pub y_scale: f64,
}

impl Default for ResampleConfig {
    fn default() -> Self {
        Self {
            spacing: 0.002,
            y_scale: 2.0,
        }
    }
}

/// The shared geometry arena.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PointBuffer {
    points: Vec<QuantizedPoint>,

    #[serde(default)]
    config: ResampleConfig,

    /// Maximum number of points accepted. Appends past it are dropped.
    capacity: usize,

    /// Leftover distance carried into the next segment of the same stroke.
    #[serde(skip)]
    extra_dist: f64,
}

impl Default for PointBuffer {
    fn default() -> Self {
        Self::new(ResampleConfig::default(), 10_000_000)
    }
}

impl PointBuffer {
    pub fn new(config: ResampleConfig, capacity: usize) -> Self {
        Self {
            points: Vec::new(),
            config,
            capacity,
            extra_dist: 0.0,
        }
    }

    /// Number of points stored. This is the next index to be issued.
    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn config(&self) -> ResampleConfig {
        self.config
    }

    /// Append a single point.
    ///
    /// Returns the buffer length after the append, which is the exclusive
    /// end index samples record. Points outside the canvas (or past the
    /// capacity) are dropped and the unchanged length is returned.
    pub fn add_point(&mut self, p: Point2D) -> usize {
        if !p.in_canvas() {
            tracing::trace!(x = p.x, y = p.y, "Dropping point outside canvas");
            return self.points.len();
        }
        if self.points.len() >= self.capacity {
            tracing::warn!(capacity = self.capacity, "Point buffer is full");
            return self.points.len();
        }
        self.points.push(QuantizedPoint::quantize(p));
        self.points.len()
    }

    /// Resample the segment `p1 -> p2` at a fixed arc-length spacing and
    /// append one point per step.
    ///
    /// The distance left over after the last step is carried into the next
    /// call so consecutive segments of a stroke stay evenly spaced.
    /// Returns the buffer length after the last appended point.
    pub fn add_segment(&mut self, p1: Point2D, p2: Point2D) -> usize {
        let spacing = self.config.spacing;
        if spacing <= 0.0 || !spacing.is_finite() {
            return self.add_point(p2);
        }

        let w = p2.x - p1.x;
        let h = (p2.y - p1.y) * self.config.y_scale;
        let dist = (w * w + h * h).sqrt();

        let mut step = self.extra_dist;
        while step < dist {
            self.add_point(Point2D::lerp(&p1, &p2, step / dist));
            step += spacing;
        }
        self.extra_dist = step - dist;

        self.points.len()
    }

    /// Forget the carried-over distance. Called when a new stroke begins.
    pub fn reset_spacing(&mut self) {
        self.extra_dist = 0.0;
    }

    pub fn get(&self, index: usize) -> Option<QuantizedPoint> {
        self.points.get(index).copied()
    }

    /// Dequantized point at `index`.
    pub fn point(&self, index: usize) -> Option<Point2D> {
        self.get(index).map(QuantizedPoint::to_point)
    }

    /// The raw points of a range, clamped to the buffer.
    pub fn range(&self, range: Range<usize>) -> &[QuantizedPoint] {
        let end = range.end.min(self.points.len());
        let start = range.start.min(end);
        &self.points[start..end]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit_spacing_buffer() -> PointBuffer {
        PointBuffer::new(
            ResampleConfig {
                spacing: 0.1,
                y_scale: 1.0,
            },
            1_000,
        )
    }

    #[test]
    fn test_add_point_returns_length_after_append() {
        let mut buffer = PointBuffer::default();
        assert_eq!(buffer.add_point(Point2D::new(0.0, 0.0)), 1);
        assert_eq!(buffer.add_point(Point2D::new(0.5, -0.5)), 2);
        assert_eq!(buffer.len(), 2);
    }

    #[test]
    fn test_out_of_canvas_point_is_noop() {
        let mut buffer = PointBuffer::default();
        buffer.add_point(Point2D::new(0.0, 0.0));
        assert_eq!(buffer.add_point(Point2D::new(1.5, 0.0)), 1);
        assert_eq!(buffer.add_point(Point2D::new(0.0, -1.01)), 1);
        assert_eq!(buffer.len(), 1);
    }

    #[test]
    fn test_capacity_limits_appends() {
        let mut buffer = PointBuffer::new(ResampleConfig::default(), 2);
        buffer.add_point(Point2D::new(0.0, 0.0));
        buffer.add_point(Point2D::new(0.1, 0.0));
        assert_eq!(buffer.add_point(Point2D::new(0.2, 0.0)), 2);
    }

    #[test]
    fn test_quantization_is_close() {
        let p = Point2D::new(0.123, -0.877);
        let back = QuantizedPoint::quantize(p).to_point();
        assert!((back.x - p.x).abs() < 1e-4);
        assert!((back.y - p.y).abs() < 1e-4);
        assert_eq!(QuantizedPoint::quantize(Point2D::new(-1.0, 1.0)).x, 0);
        assert_eq!(QuantizedPoint::quantize(Point2D::new(-1.0, 1.0)).y, u16::MAX);
    }

    #[test]
    fn test_segment_resampled_at_fixed_spacing() {
        let mut buffer = unit_spacing_buffer();
        // Length 0.45 with spacing 0.1: steps at 0.0, 0.1, 0.2, 0.3, 0.4.
        let end = buffer.add_segment(Point2D::new(0.0, 0.0), Point2D::new(0.45, 0.0));
        assert_eq!(end, 5);
        let xs: Vec<f64> = (0..5).map(|i| buffer.point(i).unwrap().x).collect();
        for (i, x) in xs.iter().enumerate() {
            assert!((x - i as f64 * 0.1).abs() < 1e-3, "x[{i}] = {x}");
        }
    }

    #[test]
    fn test_leftover_distance_carries_across_segments() {
        let mut buffer = unit_spacing_buffer();
        buffer.add_segment(Point2D::new(0.0, 0.0), Point2D::new(0.45, 0.0));
        // The next step is 0.05 into the following segment.
        buffer.add_segment(Point2D::new(0.45, 0.0), Point2D::new(0.65, 0.0));
        assert_eq!(buffer.len(), 7);
        assert!((buffer.point(5).unwrap().x - 0.5).abs() < 1e-3);
        assert!((buffer.point(6).unwrap().x - 0.6).abs() < 1e-3);
    }

    #[test]
    fn test_y_scale_shortens_vertical_spacing() {
        let mut buffer = PointBuffer::new(
            ResampleConfig {
                spacing: 0.1,
                y_scale: 2.0,
            },
            1_000,
        );
        // A 0.23 vertical move measures 0.46 after scaling: 5 steps.
        buffer.add_segment(Point2D::new(0.0, 0.0), Point2D::new(0.0, 0.23));
        assert_eq!(buffer.len(), 5);
    }

    #[test]
    fn test_range_is_clamped() {
        let mut buffer = PointBuffer::default();
        buffer.add_point(Point2D::new(0.0, 0.0));
        buffer.add_point(Point2D::new(0.1, 0.0));
        assert_eq!(buffer.range(1..10).len(), 1);
        assert!(buffer.range(5..9).is_empty());
    }
}
