//! Shared numeric constants for the canvas crate.

// ── Timing ──────────────────────────────────────────────────────

/// Nominal animation frame interval in milliseconds (60 Hz).
pub const FRAME_MS: f64 = 1000.0 / 60.0;

/// Upper bound on a single integration step, in nominal frames. A late timer
/// never advances a throw by more than this.
pub const MAX_STEP_FRAMES: f64 = 2.0;

/// Cadence of position emits while a throw is animating, in milliseconds.
pub const THROW_EMIT_INTERVAL_MS: f64 = 50.0;

/// Minimum spacing between position emits while dragging, in milliseconds.
pub const DRAG_EMIT_INTERVAL_MS: f64 = 50.0;

/// A velocity sample older than this at release counts as zero.
pub const VELOCITY_STALE_MS: f64 = 100.0;

/// Duration of the cosmetic glide applied to remote moves, in milliseconds.
pub const SMOOTHING_MS: f64 = 120.0;

// ── Physics ─────────────────────────────────────────────────────

/// Velocity retained per nominal frame.
pub const FRICTION: f64 = 0.95;

/// Fraction of speed kept after hitting a viewport edge.
pub const BOUNCE_DAMPING: f64 = 0.7;

/// A throw settles once both velocity components drop below this (units/frame).
pub const SETTLE_VELOCITY: f64 = 0.5;

/// Release velocity (units/sample, either axis) above which a drag becomes a throw.
pub const THROW_THRESHOLD: f64 = 0.5;

/// Multiplier applied to sampled drag velocity so a flick carries visibly.
pub const THROW_VELOCITY_SCALE: f64 = 1.5;

// ── Layout ──────────────────────────────────────────────────────

/// Default block width in canvas units.
pub const BLOCK_WIDTH: f64 = 150.0;

/// Default block height in canvas units.
pub const BLOCK_HEIGHT: f64 = 150.0;

/// Default canvas width in canvas units.
pub const VIEWPORT_WIDTH: f64 = 1200.0;

/// Default canvas height in canvas units.
pub const VIEWPORT_HEIGHT: f64 = 800.0;
