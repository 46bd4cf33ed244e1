//! Canvas geometry primitives.
//!
//! Canvas coordinates are normalized to `[-1.0, 1.0]` on both axes,
//! `(-1, -1)` being the bottom-left corner of the full canvas.

use serde::{Deserialize, Serialize};

/// A 2D normalized canvas point.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub struct Point2D {
    pub x: f64,
    pub y: f64,
}

impl Point2D {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Euclidean distance to another point.
    pub fn distance_to(&self, other: &Point2D) -> f64 {
        ((self.x - other.x).powi(2) + (self.y - other.y).powi(2)).sqrt()
    }

    /// Linear interpolation between two points.
    pub fn lerp(a: &Point2D, b: &Point2D, t: f64) -> Point2D {
        let t = t.clamp(0.0, 1.0);
        Point2D {
            x: a.x + (b.x - a.x) * t,
            y: a.y + (b.y - a.y) * t,
        }
    }

    /// Whether the point lies inside the normalized canvas square.
    pub fn in_canvas(&self) -> bool {
        (-1.0..=1.0).contains(&self.x) && (-1.0..=1.0).contains(&self.y)
    }
}

/// Spatial transform applied to a stroke when it is drawn.
///
/// Only translation is supported: strokes are moved on the canvas,
/// never rotated or resized.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub struct Transform2D {
    pub tx: f64,
    pub ty: f64,
}

impl Transform2D {
    pub const IDENTITY: Transform2D = Transform2D { tx: 0.0, ty: 0.0 };

    pub fn translation(tx: f64, ty: f64) -> Self {
        Self { tx, ty }
    }

    /// Compose an additional translation on top of this one.
    pub fn translate(&mut self, dx: f64, dy: f64) {
        self.tx += dx;
        self.ty += dy;
    }

    pub fn apply(&self, p: Point2D) -> Point2D {
        Point2D::new(p.x + self.tx, p.y + self.ty)
    }

    pub fn is_identity(&self) -> bool {
        self.tx == 0.0 && self.ty == 0.0
    }
}

/// An RGB color with components in `[0.0, 1.0]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rgb {
    pub r: f32,
    pub g: f32,
    pub b: f32,
}

impl Rgb {
    pub const BLACK: Rgb = Rgb {
        r: 0.0,
        g: 0.0,
        b: 0.0,
    };
    pub const WHITE: Rgb = Rgb {
        r: 1.0,
        g: 1.0,
        b: 1.0,
    };

    pub fn new(r: f32, g: f32, b: f32) -> Self {
        Self {
            r: r.clamp(0.0, 1.0),
            g: g.clamp(0.0, 1.0),
            b: b.clamp(0.0, 1.0),
        }
    }

    /// Build a color from 8-bit channels.
    pub fn from_u8(r: u8, g: u8, b: u8) -> Self {
        Self::new(r as f32 / 255.0, g as f32 / 255.0, b as f32 / 255.0)
    }

    /// Convert to 8-bit channels.
    pub fn to_u8(&self) -> [u8; 3] {
        [
            (self.r * 255.0).round() as u8,
            (self.g * 255.0).round() as u8,
            (self.b * 255.0).round() as u8,
        ]
    }
}

impl Default for Rgb {
    fn default() -> Self {
        Self::BLACK
    }
}
