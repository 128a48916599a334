//! Gesture state: the drag session and the per-block phase.
//!
//! A participant owns at most one drag at a time. `InputState::Dragging`
//! exists only between pointer-down and the release decision; throws that
//! outlive the gesture are tracked by the engine, not here.

#[cfg(test)]
#[path = "input_test.rs"]
mod input_test;

use crate::doc::BlockId;
use crate::geom::{Point, Velocity};

/// Where one block sits in the local gesture lifecycle.
///
/// `Idle → Dragging → {ThrowAnimating | Idle}`, and `ThrowAnimating → Idle`
/// on settle, or `→ Dragging` when a new press pre-empts the throw. Remote
/// updates are applied only in `Idle`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockPhase {
    Idle,
    Dragging,
    ThrowAnimating,
}

/// Context carried between pointer-down and pointer-up.
#[derive(Debug, Clone, PartialEq)]
pub struct DragSession {
    /// The block this participant owns for the gesture.
    pub id: BlockId,
    /// Pointer position minus block origin at press time.
    pub pointer_offset: Point,
    /// Block position at the last velocity sample.
    pub last_position: Point,
    /// Timestamp of the last velocity sample, in milliseconds.
    pub last_sample_ms: f64,
    /// Scaled velocity from the last sample, in units per nominal frame.
    pub velocity: Velocity,
    /// Timestamp of the last position emit while dragging.
    pub last_emit_ms: f64,
}

/// Internal state for the drag controller.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum InputState {
    /// No gesture in progress; waiting for the next pointer-down.
    #[default]
    Idle,
    /// A block is held under the pointer.
    Dragging(DragSession),
}

impl InputState {
    /// The block held by the current gesture, if any.
    #[must_use]
    pub fn dragged_id(&self) -> Option<&str> {
        match self {
            Self::Idle => None,
            Self::Dragging(session) => Some(session.id.as_str()),
        }
    }
}
