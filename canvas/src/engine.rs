//! Engine core: drag controller, throw driver and reconciliation.
//!
//! `EngineCore` owns the local render state and every piece of gesture state
//! for one participant. It never touches a socket or a timer. The host calls
//! one method per event (pointer input, timer firing, inbound broadcast) with
//! the current time, all on a single event loop, and carries out the returned
//! [`Action`]s: sending frames, scheduling callbacks, redrawing.
//!
//! OWNERSHIP
//! =========
//! A block is *owned* while it is being dragged or thrown. Hub broadcasts for
//! an owned block are dropped on arrival, because the hub echoes every move to
//! every participant including the one that sent it. The hub has no notion of
//! gesture ownership; suppressing the echo is the client's job alone.
//!
//! A throw is identified by an [`AnimationToken`]. Its step and emit callbacks
//! both carry the token, and both are ignored once a new press on the same
//! block has retired it.

#[cfg(test)]
#[path = "engine_test.rs"]
mod engine_test;

use std::collections::HashMap;

use frames::{BlockRecord, CreateRequest, PositionUpdate, Snapshot};
use tracing::debug;

use crate::animation::{AnimationToken, TokenSource};
use crate::consts::{
    DRAG_EMIT_INTERVAL_MS, FRAME_MS, SMOOTHING_MS, THROW_EMIT_INTERVAL_MS, THROW_THRESHOLD, THROW_VELOCITY_SCALE,
    VELOCITY_STALE_MS,
};
use crate::doc::{Block, BlockId, DocStore};
use crate::geom::{Point, Velocity, Viewport};
use crate::input::{BlockPhase, DragSession, InputState};
use crate::physics::{PhysicsParams, Throw};
use crate::transition::Transition;

/// Work the host must carry out on behalf of the engine.
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    /// Send an authoritative position for a block to the hub.
    SendMove(PositionUpdate),
    /// Ask the hub to create a block.
    SendCreate(CreateRequest),
    /// Call [`EngineCore::on_step`] with this id and token after `after_ms`.
    ScheduleStep { id: BlockId, token: AnimationToken, after_ms: f64 },
    /// Call [`EngineCore::on_emit_timer`] with this id and token after `after_ms`.
    ScheduleEmit { id: BlockId, token: AnimationToken, after_ms: f64 },
    /// The drawn scene changed.
    RenderNeeded,
}

#[derive(Debug)]
struct ActiveThrow {
    token: AnimationToken,
    throw: Throw,
    last_step_ms: f64,
}

/// Core engine state for one participant.
#[derive(Debug)]
pub struct EngineCore {
    pub doc: DocStore,
    pub input: InputState,
    pub viewport: Viewport,
    pub physics: PhysicsParams,
    throws: HashMap<BlockId, ActiveThrow>,
    transitions: HashMap<BlockId, Transition>,
    tokens: TokenSource,
}

impl Default for EngineCore {
    fn default() -> Self {
        Self::new(Viewport::default())
    }
}

impl EngineCore {
    #[must_use]
    pub fn new(viewport: Viewport) -> Self {
        Self {
            doc: DocStore::new(),
            input: InputState::Idle,
            viewport,
            physics: PhysicsParams::default(),
            throws: HashMap::new(),
            transitions: HashMap::new(),
            tokens: TokenSource::default(),
        }
    }

    // --- Queries ---

    /// Gesture phase of a block from this participant's point of view.
    #[must_use]
    pub fn phase(&self, id: &str) -> BlockPhase {
        if self.input.dragged_id() == Some(id) {
            BlockPhase::Dragging
        } else if self.throws.contains_key(id) {
            BlockPhase::ThrowAnimating
        } else {
            BlockPhase::Idle
        }
    }

    /// Whether this participant currently owns the block (dragging or throwing).
    #[must_use]
    pub fn is_owned(&self, id: &str) -> bool {
        self.phase(id) != BlockPhase::Idle
    }

    /// The active throw token for a block, if a throw is in flight.
    #[must_use]
    pub fn active_throw(&self, id: &str) -> Option<AnimationToken> {
        self.throws.get(id).map(|t| t.token)
    }

    /// Where the block should be drawn at `now_ms`. Differs from the logical
    /// position only while a remote move is gliding into place.
    #[must_use]
    pub fn display_position(&self, id: &str, now_ms: f64) -> Option<Point> {
        let logical = self.doc.position(id)?;
        match self.transitions.get(id) {
            Some(tr) if !tr.is_finished(now_ms) => Some(tr.sample(now_ms)),
            _ => Some(logical),
        }
    }

    /// Topmost block drawn under `p` at `now_ms`.
    #[must_use]
    pub fn block_at(&self, p: Point, now_ms: f64) -> Option<BlockId> {
        self.doc
            .sorted_blocks()
            .into_iter()
            .rev()
            .find(|b| {
                self.display_position(&b.id, now_ms).is_some_and(|at| {
                    p.x >= at.x
                        && p.x <= at.x + self.viewport.block_width
                        && p.y >= at.y
                        && p.y <= at.y + self.viewport.block_height
                })
            })
            .map(|b| b.id.clone())
    }

    /// Drop finished transitions. Returns whether any glide is still running.
    pub fn prune_transitions(&mut self, now_ms: f64) -> bool {
        self.transitions.retain(|_, tr| !tr.is_finished(now_ms));
        !self.transitions.is_empty()
    }

    // --- Drag controller ---

    /// Press on a block. Takes ownership, pre-empting any throw of that block.
    pub fn on_pointer_down(&mut self, id: &str, pointer: Point, now_ms: f64) -> Vec<Action> {
        if let InputState::Dragging(session) = &self.input {
            debug!(held = %session.id, pressed = %id, "pointer down ignored; gesture already active");
            return vec![];
        }
        let Some(origin) = self.doc.position(id) else {
            return vec![];
        };

        if self.cancel_throw(id) {
            debug!(%id, "throw pre-empted by new drag");
        }
        self.transitions.remove(id);

        self.input = InputState::Dragging(DragSession {
            id: id.to_owned(),
            pointer_offset: pointer.offset_from(origin),
            last_position: origin,
            last_sample_ms: now_ms,
            velocity: Velocity::ZERO,
            last_emit_ms: now_ms,
        });
        vec![Action::RenderNeeded]
    }

    /// Pointer moved while holding a block: clamp, write, sample velocity.
    pub fn on_pointer_move(&mut self, pointer: Point, now_ms: f64) -> Vec<Action> {
        let InputState::Dragging(session) = &mut self.input else {
            return vec![];
        };

        let candidate = self.viewport.clamp(pointer.offset_from(session.pointer_offset));
        let elapsed_ms = now_ms - session.last_sample_ms;
        if elapsed_ms > 0.0 {
            let frames = elapsed_ms / FRAME_MS;
            let delta = candidate.offset_from(session.last_position);
            session.velocity = Velocity::new(
                delta.x / frames * THROW_VELOCITY_SCALE,
                delta.y / frames * THROW_VELOCITY_SCALE,
            );
            session.last_position = candidate;
            session.last_sample_ms = now_ms;
        }

        if !self.doc.set_position(&session.id, candidate) {
            return vec![];
        }

        let mut actions = vec![Action::RenderNeeded];
        if now_ms - session.last_emit_ms >= DRAG_EMIT_INTERVAL_MS {
            session.last_emit_ms = now_ms;
            actions.push(Action::SendMove(position_update(&session.id, candidate)));
        }
        actions
    }

    /// Release. Either hands the block to a throw or emits its final position.
    pub fn on_pointer_up(&mut self, now_ms: f64) -> Vec<Action> {
        let InputState::Dragging(session) = std::mem::take(&mut self.input) else {
            return vec![];
        };
        let Some(position) = self.doc.position(&session.id) else {
            return vec![];
        };

        let velocity = if now_ms - session.last_sample_ms > VELOCITY_STALE_MS {
            Velocity::ZERO
        } else {
            session.velocity
        };

        if velocity.exceeds(THROW_THRESHOLD) {
            self.start_throw(session.id, position, velocity, now_ms)
        } else {
            vec![Action::SendMove(position_update(&session.id, position))]
        }
    }

    // --- Throw driver ---

    fn start_throw(&mut self, id: BlockId, position: Point, velocity: Velocity, now_ms: f64) -> Vec<Action> {
        let token = self.tokens.issue();
        let throw = Throw::new(position, velocity, self.viewport.bounds(), self.physics);
        debug!(%id, token = token.value(), vx = velocity.vx, vy = velocity.vy, "throw started");
        self.throws.insert(id.clone(), ActiveThrow { token, throw, last_step_ms: now_ms });
        vec![
            Action::ScheduleStep { id: id.clone(), token, after_ms: FRAME_MS },
            Action::ScheduleEmit { id, token, after_ms: THROW_EMIT_INTERVAL_MS },
        ]
    }

    /// Step timer for a throw. No-op unless `token` is still active for `id`.
    pub fn on_step(&mut self, id: &str, token: AnimationToken, now_ms: f64) -> Vec<Action> {
        let Some(active) = self.throws.get_mut(id) else {
            return vec![];
        };
        if active.token != token {
            return vec![];
        }

        let dt_frames = (now_ms - active.last_step_ms) / FRAME_MS;
        active.last_step_ms = now_ms;
        let step = active.throw.step(dt_frames);
        self.doc.set_position(id, step.position);

        if step.settled {
            self.throws.remove(id);
            debug!(%id, token = token.value(), x = step.position.x, y = step.position.y, "throw settled");
            return vec![Action::RenderNeeded, Action::SendMove(position_update(id, step.position))];
        }
        vec![Action::RenderNeeded, Action::ScheduleStep { id: id.to_owned(), token, after_ms: FRAME_MS }]
    }

    /// Periodic emit timer for a throw. No-op unless `token` is still active for `id`.
    pub fn on_emit_timer(&mut self, id: &str, token: AnimationToken) -> Vec<Action> {
        if self.active_throw(id) != Some(token) {
            return vec![];
        }
        let Some(position) = self.doc.position(id) else {
            return vec![];
        };
        vec![
            Action::SendMove(position_update(id, position)),
            Action::ScheduleEmit { id: id.to_owned(), token, after_ms: THROW_EMIT_INTERVAL_MS },
        ]
    }

    /// Retire a block's throw, if any. Returns whether one was running.
    pub fn cancel_throw(&mut self, id: &str) -> bool {
        self.throws.remove(id).is_some()
    }

    // --- Reconciliation ---

    /// Replace local state with a hub snapshot, keeping blocks this
    /// participant owns at their local positions.
    pub fn apply_snapshot(&mut self, snapshot: Snapshot) -> Vec<Action> {
        let owned: Vec<Block> = self
            .doc
            .sorted_blocks()
            .into_iter()
            .filter(|b| self.is_owned(&b.id))
            .cloned()
            .collect();

        self.doc.load_snapshot(snapshot.into_values().map(Block::from));
        for block in owned {
            self.doc.upsert(block);
        }
        self.transitions.clear();
        vec![Action::RenderNeeded]
    }

    /// Apply a hub position broadcast. Dropped for owned or unknown blocks.
    pub fn apply_moved(&mut self, update: &PositionUpdate, now_ms: f64) -> Vec<Action> {
        if self.is_owned(&update.id) {
            debug!(id = %update.id, "echo suppressed for owned block");
            return vec![];
        }
        let Some(drawn) = self.display_position(&update.id, now_ms) else {
            debug!(id = %update.id, "moved event for unknown block ignored");
            return vec![];
        };

        let target = Point::new(update.x, update.y);
        self.doc.set_position(&update.id, target);
        self.transitions
            .insert(update.id.clone(), Transition::new(drawn, target, now_ms, SMOOTHING_MS));
        vec![Action::RenderNeeded]
    }

    /// Apply a hub creation broadcast. Replays of a known id change nothing.
    pub fn apply_created(&mut self, record: BlockRecord) -> Vec<Action> {
        if self.doc.insert_if_absent(Block::from(record)) {
            vec![Action::RenderNeeded]
        } else {
            vec![]
        }
    }

    // --- Creation ---

    /// Request a new block centred under the pointer.
    #[must_use]
    pub fn request_create(&self, pointer: Point) -> Vec<Action> {
        let origin = self.viewport.clamp(Point::new(
            pointer.x - self.viewport.block_width / 2.0,
            pointer.y - self.viewport.block_height / 2.0,
        ));
        vec![Action::SendCreate(CreateRequest { x: origin.x, y: origin.y })]
    }
}

fn position_update(id: &str, p: Point) -> PositionUpdate {
    PositionUpdate { id: id.to_owned(), x: p.x, y: p.y }
}
