//! Cosmetic glide for remote moves.
//!
//! When a peer's update lands, the logical position in the local render state
//! jumps straight to the new value. A [`Transition`] only affects where the
//! block is *drawn* for a short while afterwards.

use crate::geom::Point;

/// Eased interpolation from one drawn position to another.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transition {
    from: Point,
    to: Point,
    start_ms: f64,
    duration_ms: f64,
}

impl Transition {
    #[must_use]
    pub fn new(from: Point, to: Point, start_ms: f64, duration_ms: f64) -> Self {
        Self { from, to, start_ms, duration_ms }
    }

    #[must_use]
    pub fn is_finished(&self, now_ms: f64) -> bool {
        now_ms - self.start_ms >= self.duration_ms
    }

    /// Drawn position at `now_ms` (ease-out cubic).
    #[must_use]
    pub fn sample(&self, now_ms: f64) -> Point {
        if self.duration_ms <= 0.0 {
            return self.to;
        }
        let t = ((now_ms - self.start_ms) / self.duration_ms).clamp(0.0, 1.0);
        let eased = 1.0 - (1.0 - t).powi(3);
        Point::new(lerp(self.from.x, self.to.x, eased), lerp(self.from.y, self.to.y, eased))
    }
}

fn lerp(a: f64, b: f64, t: f64) -> f64 {
    a + (b - a) * t
}

#[cfg(test)]
mod tests {
    #![allow(clippy::float_cmp)]

    use super::*;

    #[test]
    fn sample_spans_from_start_to_target() {
        let tr = Transition::new(Point::new(0.0, 0.0), Point::new(100.0, 50.0), 1000.0, 100.0);
        assert_eq!(tr.sample(1000.0), Point::new(0.0, 0.0));
        assert_eq!(tr.sample(1100.0), Point::new(100.0, 50.0));
        assert_eq!(tr.sample(5000.0), Point::new(100.0, 50.0));
        let mid = tr.sample(1050.0);
        assert!(mid.x > 50.0 && mid.x < 100.0, "ease-out should be past halfway, got {}", mid.x);
    }

    #[test]
    fn finishes_after_duration() {
        let tr = Transition::new(Point::default(), Point::new(1.0, 1.0), 0.0, 120.0);
        assert!(!tr.is_finished(119.0));
        assert!(tr.is_finished(120.0));
    }

    #[test]
    fn zero_duration_snaps() {
        let tr = Transition::new(Point::default(), Point::new(7.0, 9.0), 0.0, 0.0);
        assert_eq!(tr.sample(0.0), Point::new(7.0, 9.0));
    }
}
