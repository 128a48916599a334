//! Throw physics: one block coasting across the canvas after a fast release.
//!
//! A [`Throw`] is advanced one step at a time by whoever owns the animation
//! timer. Each step moves the block by its velocity, bleeds speed through
//! friction, and bounces it off the viewport edges with damping. The throw
//! settles once both velocity components fall below the settle threshold.
//!
//! Time is measured in nominal frames ([`crate::consts::FRAME_MS`]), so a
//! step that arrives late covers more ground, up to the per-step cap.
//! There is no block-to-block collision; every throw is independent.

#[cfg(test)]
#[path = "physics_test.rs"]
mod physics_test;

use crate::consts::{BOUNCE_DAMPING, FRICTION, MAX_STEP_FRAMES, SETTLE_VELOCITY};
use crate::geom::{Bounds, Point, Velocity};

/// Tunables for the integrator.
///
/// `friction` and `bounce_damping` must lie in `(0, 1)` for a throw to be
/// guaranteed to settle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PhysicsParams {
    /// Velocity retained per nominal frame.
    pub friction: f64,
    /// Fraction of speed kept after an edge bounce.
    pub bounce_damping: f64,
    /// Both axes below this speed means settled.
    pub settle_velocity: f64,
    /// Cap on a single step, in nominal frames.
    pub max_step_frames: f64,
}

impl Default for PhysicsParams {
    fn default() -> Self {
        Self {
            friction: FRICTION,
            bounce_damping: BOUNCE_DAMPING,
            settle_velocity: SETTLE_VELOCITY,
            max_step_frames: MAX_STEP_FRAMES,
        }
    }
}

/// Result of a single integration step.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ThrowStep {
    pub position: Point,
    pub velocity: Velocity,
    /// An axis hit an edge during this step.
    pub bounced: bool,
    /// The throw is over; `position` is final.
    pub settled: bool,
}

/// An in-flight throw of one block.
#[derive(Debug, Clone)]
pub struct Throw {
    position: Point,
    velocity: Velocity,
    bounds: Bounds,
    params: PhysicsParams,
    settled: bool,
}

impl Throw {
    /// Start a throw. The starting position is clamped into `bounds`.
    #[must_use]
    pub fn new(position: Point, velocity: Velocity, bounds: Bounds, params: PhysicsParams) -> Self {
        Self { position: bounds.clamp(position), velocity, bounds, params, settled: false }
    }

    #[must_use]
    pub fn position(&self) -> Point {
        self.position
    }

    #[must_use]
    pub fn velocity(&self) -> Velocity {
        self.velocity
    }

    #[must_use]
    pub fn is_settled(&self) -> bool {
        self.settled
    }

    /// Advance by `dt_frames` nominal frames (capped at `max_step_frames`).
    ///
    /// Once settled, further calls return the final state unchanged.
    pub fn step(&mut self, dt_frames: f64) -> ThrowStep {
        if self.settled {
            return self.snapshot(false);
        }

        let dt = dt_frames.clamp(0.0, self.params.max_step_frames);
        let decay = self.params.friction.powf(dt);
        let damping = self.params.bounce_damping;

        let (x, vx, bounced_x) = advance_axis(self.position.x, self.velocity.vx, dt, decay, self.bounds.max_x, damping);
        let (y, vy, bounced_y) = advance_axis(self.position.y, self.velocity.vy, dt, decay, self.bounds.max_y, damping);

        self.position = Point::new(x, y);
        self.velocity = Velocity::new(vx, vy);
        self.settled = self.velocity.below(self.params.settle_velocity);
        self.snapshot(bounced_x || bounced_y)
    }

    /// Iterate the whole flight at a fixed step size, ending with the settled step.
    ///
    /// Non-positive step sizes fall back to one nominal frame.
    #[must_use]
    pub fn trajectory(self, dt_frames: f64) -> Trajectory {
        let dt_frames = if dt_frames > 0.0 { dt_frames } else { 1.0 };
        Trajectory { throw: self, dt_frames }
    }

    fn snapshot(&self, bounced: bool) -> ThrowStep {
        ThrowStep { position: self.position, velocity: self.velocity, bounced, settled: self.settled }
    }
}

/// Integrate one axis and resolve an edge hit. Returns `(position, velocity, bounced)`.
fn advance_axis(pos: f64, vel: f64, dt: f64, decay: f64, max: f64, damping: f64) -> (f64, f64, bool) {
    let next = pos + vel * dt;
    let vel = vel * decay;
    if next < 0.0 {
        (0.0, -vel * damping, true)
    } else if next > max {
        (max, -vel * damping, true)
    } else {
        (next, vel, false)
    }
}

/// Fixed-step iterator over a throw. See [`Throw::trajectory`].
#[derive(Debug, Clone)]
pub struct Trajectory {
    throw: Throw,
    dt_frames: f64,
}

impl Iterator for Trajectory {
    type Item = ThrowStep;

    fn next(&mut self) -> Option<ThrowStep> {
        if self.throw.is_settled() {
            return None;
        }
        Some(self.throw.step(self.dt_frames))
    }
}
