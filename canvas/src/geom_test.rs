#![allow(clippy::float_cmp)]

use super::*;

#[test]
fn viewport_bounds_subtract_block_size() {
    let vp = Viewport { width: 800.0, height: 600.0, block_width: 150.0, block_height: 100.0 };
    let b = vp.bounds();
    assert_eq!(b.max_x, 650.0);
    assert_eq!(b.max_y, 500.0);
}

#[test]
fn bounds_collapse_when_block_exceeds_canvas() {
    let vp = Viewport { width: 100.0, height: 100.0, block_width: 150.0, block_height: 150.0 };
    assert_eq!(vp.bounds(), Bounds::new(0.0, 0.0));
    assert_eq!(vp.clamp(Point::new(40.0, -3.0)), Point::new(0.0, 0.0));
}

#[test]
fn clamp_pins_each_axis_independently() {
    let b = Bounds::new(200.0, 100.0);
    assert_eq!(b.clamp(Point::new(-5.0, 50.0)), Point::new(0.0, 50.0));
    assert_eq!(b.clamp(Point::new(250.0, 150.0)), Point::new(200.0, 100.0));
    assert_eq!(b.clamp(Point::new(20.0, 30.0)), Point::new(20.0, 30.0));
}

#[test]
fn contains_is_inclusive() {
    let b = Bounds::new(200.0, 100.0);
    assert!(b.contains(Point::new(0.0, 0.0)));
    assert!(b.contains(Point::new(200.0, 100.0)));
    assert!(!b.contains(Point::new(200.1, 0.0)));
    assert!(!b.contains(Point::new(0.0, -0.1)));
}

#[test]
fn velocity_thresholds_use_either_or_both_axes() {
    let v = Velocity::new(0.2, -0.6);
    assert!(v.exceeds(0.5));
    assert!(!v.below(0.5));

    let slow = Velocity::new(0.49, -0.49);
    assert!(!slow.exceeds(0.5));
    assert!(slow.below(0.5));
}

#[test]
fn offset_from_is_component_difference() {
    assert_eq!(Point::new(10.0, 5.0).offset_from(Point::new(4.0, 8.0)), Point::new(6.0, -3.0));
}
