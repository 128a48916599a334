//! Points, velocities and the viewport rectangle blocks live in.

#[cfg(test)]
#[path = "geom_test.rs"]
mod geom_test;

use crate::consts::{BLOCK_HEIGHT, BLOCK_WIDTH, VIEWPORT_HEIGHT, VIEWPORT_WIDTH};

/// A point in canvas coordinates. Origin is the top-left corner.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    #[must_use]
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Component-wise difference `self - other`.
    #[must_use]
    pub fn offset_from(self, other: Point) -> Point {
        Point::new(self.x - other.x, self.y - other.y)
    }
}

/// Velocity in canvas units per nominal frame.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Velocity {
    pub vx: f64,
    pub vy: f64,
}

impl Velocity {
    pub const ZERO: Velocity = Velocity { vx: 0.0, vy: 0.0 };

    #[must_use]
    pub fn new(vx: f64, vy: f64) -> Self {
        Self { vx, vy }
    }

    /// Whether either component's magnitude is strictly above `threshold`.
    #[must_use]
    pub fn exceeds(self, threshold: f64) -> bool {
        self.vx.abs() > threshold || self.vy.abs() > threshold
    }

    /// Whether both components' magnitudes are strictly below `threshold`.
    #[must_use]
    pub fn below(self, threshold: f64) -> bool {
        self.vx.abs() < threshold && self.vy.abs() < threshold
    }
}

/// Inclusive `[0, max_x] × [0, max_y]` rectangle a block origin may occupy.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    pub max_x: f64,
    pub max_y: f64,
}

impl Bounds {
    #[must_use]
    pub fn new(max_x: f64, max_y: f64) -> Self {
        Self { max_x: max_x.max(0.0), max_y: max_y.max(0.0) }
    }

    #[must_use]
    pub fn clamp(self, p: Point) -> Point {
        Point::new(p.x.clamp(0.0, self.max_x), p.y.clamp(0.0, self.max_y))
    }

    #[must_use]
    pub fn contains(self, p: Point) -> bool {
        (0.0..=self.max_x).contains(&p.x) && (0.0..=self.max_y).contains(&p.y)
    }
}

/// The canvas area and the size of the blocks drawn on it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub width: f64,
    pub height: f64,
    pub block_width: f64,
    pub block_height: f64,
}

impl Default for Viewport {
    fn default() -> Self {
        Self { width: VIEWPORT_WIDTH, height: VIEWPORT_HEIGHT, block_width: BLOCK_WIDTH, block_height: BLOCK_HEIGHT }
    }
}

impl Viewport {
    /// Bounds for a block origin: `[0, width - block_width] × [0, height - block_height]`.
    /// Collapses to zero when the block is larger than the canvas.
    #[must_use]
    pub fn bounds(&self) -> Bounds {
        Bounds::new(self.width - self.block_width, self.height - self.block_height)
    }

    #[must_use]
    pub fn clamp(&self, p: Point) -> Point {
        self.bounds().clamp(p)
    }
}
