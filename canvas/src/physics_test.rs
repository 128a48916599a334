#![allow(clippy::float_cmp)]

use super::*;

fn params() -> PhysicsParams {
    PhysicsParams::default()
}

// =============================================================
// Scenario: straight throw toward the right edge
// =============================================================

#[test]
fn rightward_throw_decelerates_and_settles_inside_bound() {
    let throw = Throw::new(Point::new(0.0, 0.0), Velocity::new(10.0, 0.0), Bounds::new(200.0, 0.0), params());
    let steps: Vec<ThrowStep> = throw.trajectory(1.0).collect();

    let last = steps.last().copied().expect("at least one step");
    assert!(last.settled);
    assert!(last.velocity.vx.abs() < 0.5);

    let mut prev_x = 0.0;
    let mut prev_speed = 10.0;
    for step in &steps {
        assert!(step.position.x <= 200.0, "x={} exceeded bound", step.position.x);
        assert!(step.position.x >= prev_x, "block moved backwards");
        assert!(step.velocity.vx < prev_speed, "speed must strictly decrease");
        assert!(!step.bounced);
        prev_x = step.position.x;
        prev_speed = step.velocity.vx;
    }
    // Geometric series 10 * sum(0.95^n) stays short of 200.
    assert!(last.position.x > 150.0);
}

#[test]
fn first_step_moves_by_velocity_then_applies_friction() {
    let mut throw = Throw::new(Point::new(10.0, 10.0), Velocity::new(4.0, -2.0), Bounds::new(500.0, 500.0), params());
    let step = throw.step(1.0);
    assert_eq!(step.position, Point::new(14.0, 8.0));
    assert!((step.velocity.vx - 3.8).abs() < 1e-12);
    assert!((step.velocity.vy + 1.9).abs() < 1e-12);
    assert!(!step.settled);
}

// =============================================================
// Bounces
// =============================================================

#[test]
fn edge_hit_clamps_and_reverses_with_damping() {
    let mut throw = Throw::new(Point::new(195.0, 50.0), Velocity::new(10.0, 0.0), Bounds::new(200.0, 100.0), params());
    let step = throw.step(1.0);
    assert!(step.bounced);
    assert_eq!(step.position.x, 200.0);
    let expected = -(10.0 * 0.95) * 0.7;
    assert!((step.velocity.vx - expected).abs() < 1e-12);
}

#[test]
fn left_edge_bounce_sends_block_back_right() {
    let mut throw = Throw::new(Point::new(3.0, 0.0), Velocity::new(-8.0, 0.0), Bounds::new(300.0, 0.0), params());
    let step = throw.step(1.0);
    assert_eq!(step.position.x, 0.0);
    assert!(step.velocity.vx > 0.0);
}

#[test]
fn bouncing_throw_never_leaves_bounds() {
    let bounds = Bounds::new(300.0, 200.0);
    let throw = Throw::new(Point::new(150.0, 100.0), Velocity::new(-45.0, 37.0), bounds, params());
    let mut bounces = 0;
    let mut count = 0;
    for step in throw.trajectory(1.0) {
        assert!(bounds.contains(step.position), "escaped at {:?}", step.position);
        if step.bounced {
            bounces += 1;
        }
        count += 1;
    }
    assert!(bounces > 0);
    assert!(count < 10_000);
}

// =============================================================
// Termination and timing
// =============================================================

#[test]
fn throws_terminate_across_frictions_and_velocities() {
    for &friction in &[0.1, 0.5, 0.9, 0.95, 0.99] {
        for &(vx, vy) in &[(1.0, 0.0), (-50.0, 20.0), (300.0, -300.0), (0.6, 0.6)] {
            let p = PhysicsParams { friction, ..params() };
            let throw = Throw::new(Point::new(100.0, 100.0), Velocity::new(vx, vy), Bounds::new(400.0, 400.0), p);
            let steps = throw.trajectory(1.0).count();
            assert!(steps < 100_000, "friction {friction} v=({vx},{vy}) took {steps} steps");
        }
    }
}

#[test]
fn late_step_is_capped_at_max_frames() {
    let mut capped = Throw::new(Point::new(0.0, 0.0), Velocity::new(5.0, 0.0), Bounds::new(1000.0, 0.0), params());
    let mut reference = capped.clone();
    let late = capped.step(30.0);
    let two = reference.step(2.0);
    assert_eq!(late.position, two.position);
    assert_eq!(late.velocity, two.velocity);
}

#[test]
fn settled_throw_stays_put() {
    let mut throw = Throw::new(Point::new(40.0, 40.0), Velocity::new(0.3, 0.2), Bounds::new(100.0, 100.0), params());
    let first = throw.step(1.0);
    assert!(first.settled);
    let again = throw.step(1.0);
    assert_eq!(again.position, first.position);
    assert!(throw.is_settled());
}

#[test]
fn start_position_is_clamped() {
    let throw = Throw::new(Point::new(-20.0, 900.0), Velocity::ZERO, Bounds::new(100.0, 100.0), params());
    assert_eq!(throw.position(), Point::new(0.0, 100.0));
}

#[test]
fn zero_step_trajectory_still_advances() {
    let throw = Throw::new(Point::new(0.0, 0.0), Velocity::new(2.0, 0.0), Bounds::new(100.0, 0.0), params());
    let first = throw.trajectory(0.0).next().expect("one step");
    assert_eq!(first.position.x, 2.0);
}
