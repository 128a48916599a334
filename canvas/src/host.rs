//! Browser host: runs the engine inside a page.
//!
//! The page's script owns the WebSocket and the DOM listeners and forwards
//! everything here: connection changes, inbound text, pointer input with
//! canvas-relative coordinates, and one `tick` per animation frame. Throw
//! step and emit callbacks are kept on an internal timer list and fired from
//! `tick` in due order, so the engine sees every input on the page's single
//! event loop. Outbound frames are buffered until the script drains them.
//!
//! [`HostCore`] holds the logic and is exercised natively; [`BoardHost`] is the
//! thin `wasm-bindgen` wrapper that adds the 2D context.

#[cfg(test)]
#[path = "host_test.rs"]
mod host_test;

use frames::{Frame, decode_frame, encode_frame};
use tracing::warn;
use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;
use web_sys::{CanvasRenderingContext2d, HtmlCanvasElement};

use crate::animation::AnimationToken;
use crate::doc::BlockId;
use crate::engine::Action;
use crate::geom::{Point, Viewport};
use crate::render;
use crate::sync::SyncClient;

// =============================================================
// Timers
// =============================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TimerKind {
    Step,
    Emit,
}

#[derive(Debug, Clone)]
struct Timer {
    due_ms: f64,
    kind: TimerKind,
    id: BlockId,
    token: AnimationToken,
}

// =============================================================
// HostCore
// =============================================================

/// Engine plus the host-side plumbing a page needs.
#[derive(Debug)]
pub struct HostCore {
    client: SyncClient,
    timers: Vec<Timer>,
    outbound: Vec<Frame>,
    dirty: bool,
}

impl HostCore {
    #[must_use]
    pub fn new(viewport: Viewport) -> Self {
        Self { client: SyncClient::new(viewport), timers: Vec::new(), outbound: Vec::new(), dirty: true }
    }

    #[must_use]
    pub fn client(&self) -> &SyncClient {
        &self.client
    }

    /// Number of scheduled step and emit callbacks.
    #[must_use]
    pub fn pending_timers(&self) -> usize {
        self.timers.len()
    }

    pub fn connected(&mut self) {
        self.client.on_connected();
        self.dirty = true;
    }

    pub fn disconnected(&mut self) {
        self.client.on_disconnected();
        self.dirty = true;
    }

    /// Apply one inbound text message.
    pub fn receive(&mut self, text: &str, now_ms: f64) {
        match decode_frame(text) {
            Ok(frame) => {
                let actions = self.client.handle_frame(&frame, now_ms);
                self.apply(actions, now_ms);
            }
            Err(e) => warn!(error = %e, "undecodable frame from hub"),
        }
    }

    /// Press at `at`. Returns whether a block was grabbed.
    pub fn pointer_down(&mut self, at: Point, now_ms: f64) -> bool {
        let Some(id) = self.client.engine.block_at(at, now_ms) else {
            return false;
        };
        let actions = self.client.engine.on_pointer_down(&id, at, now_ms);
        self.apply(actions, now_ms);
        true
    }

    pub fn pointer_move(&mut self, at: Point, now_ms: f64) {
        let actions = self.client.engine.on_pointer_move(at, now_ms);
        self.apply(actions, now_ms);
    }

    pub fn pointer_up(&mut self, now_ms: f64) {
        let actions = self.client.engine.on_pointer_up(now_ms);
        self.apply(actions, now_ms);
    }

    /// Double-click. Creates a block centred on `at` unless a block is under it.
    pub fn double_click(&mut self, at: Point, now_ms: f64) -> bool {
        if self.client.engine.block_at(at, now_ms).is_some() {
            return false;
        }
        let actions = self.client.engine.request_create(at);
        self.apply(actions, now_ms);
        true
    }

    /// Fire every callback due by `now_ms`, earliest first, and drop finished
    /// glides. Returns whether the scene needs drawing.
    pub fn tick(&mut self, now_ms: f64) -> bool {
        while let Some(timer) = self.take_due(now_ms) {
            let actions = match timer.kind {
                TimerKind::Step => self.client.engine.on_step(&timer.id, timer.token, now_ms),
                TimerKind::Emit => self.client.engine.on_emit_timer(&timer.id, timer.token),
            };
            self.apply(actions, now_ms);
        }
        let gliding = self.client.engine.prune_transitions(now_ms);
        let draw = self.dirty || gliding;
        self.dirty = false;
        draw
    }

    /// Frames waiting to be sent, oldest first.
    pub fn take_outbound(&mut self) -> Vec<Frame> {
        std::mem::take(&mut self.outbound)
    }

    fn take_due(&mut self, now_ms: f64) -> Option<Timer> {
        let index = self
            .timers
            .iter()
            .enumerate()
            .filter(|(_, t)| t.due_ms <= now_ms)
            .min_by(|(_, a), (_, b)| a.due_ms.total_cmp(&b.due_ms))
            .map(|(i, _)| i)?;
        Some(self.timers.remove(index))
    }

    fn apply(&mut self, actions: Vec<Action>, now_ms: f64) {
        for action in actions {
            if let Some(frame) = SyncClient::outbound(&action) {
                self.outbound.push(frame);
                continue;
            }
            match action {
                Action::ScheduleStep { id, token, after_ms } => {
                    self.timers.push(Timer { due_ms: now_ms + after_ms, kind: TimerKind::Step, id, token });
                }
                Action::ScheduleEmit { id, token, after_ms } => {
                    self.timers.push(Timer { due_ms: now_ms + after_ms, kind: TimerKind::Emit, id, token });
                }
                Action::RenderNeeded => self.dirty = true,
                Action::SendMove(_) | Action::SendCreate(_) => {}
            }
        }
    }
}

// =============================================================
// BoardHost (wasm-bindgen surface)
// =============================================================

/// Page-facing handle. Coordinates are canvas-relative CSS pixels; times are
/// `performance.now()` milliseconds.
#[wasm_bindgen]
pub struct BoardHost {
    core: HostCore,
    ctx: CanvasRenderingContext2d,
}

#[wasm_bindgen]
impl BoardHost {
    /// Attach to a canvas. Its width and height become the viewport.
    ///
    /// # Errors
    ///
    /// Returns `Err` if the canvas has no 2D context.
    #[wasm_bindgen(constructor)]
    pub fn new(canvas: HtmlCanvasElement) -> Result<BoardHost, JsValue> {
        let ctx = canvas
            .get_context("2d")?
            .ok_or_else(|| JsValue::from_str("canvas has no 2d context"))?
            .dyn_into::<CanvasRenderingContext2d>()?;
        let viewport = Viewport {
            width: f64::from(canvas.width()),
            height: f64::from(canvas.height()),
            ..Viewport::default()
        };
        Ok(Self { core: HostCore::new(viewport), ctx })
    }

    pub fn connected(&mut self) {
        self.core.connected();
    }

    pub fn disconnected(&mut self) {
        self.core.disconnected();
    }

    /// Text for the connection indicator.
    #[wasm_bindgen(js_name = statusText)]
    pub fn status_text(&self) -> String {
        self.core.client().status.indicator().to_owned()
    }

    pub fn receive(&mut self, text: &str, now_ms: f64) {
        self.core.receive(text, now_ms);
    }

    #[wasm_bindgen(js_name = pointerDown)]
    pub fn pointer_down(&mut self, x: f64, y: f64, now_ms: f64) -> bool {
        self.core.pointer_down(Point::new(x, y), now_ms)
    }

    #[wasm_bindgen(js_name = pointerMove)]
    pub fn pointer_move(&mut self, x: f64, y: f64, now_ms: f64) {
        self.core.pointer_move(Point::new(x, y), now_ms);
    }

    #[wasm_bindgen(js_name = pointerUp)]
    pub fn pointer_up(&mut self, now_ms: f64) {
        self.core.pointer_up(now_ms);
    }

    #[wasm_bindgen(js_name = doubleClick)]
    pub fn double_click(&mut self, x: f64, y: f64, now_ms: f64) -> bool {
        self.core.double_click(Point::new(x, y), now_ms)
    }

    /// Advance timers and redraw if anything changed.
    ///
    /// # Errors
    ///
    /// Returns `Err` if a canvas call fails.
    pub fn tick(&mut self, now_ms: f64) -> Result<(), JsValue> {
        if self.core.tick(now_ms) {
            render::draw(&self.ctx, &self.core.client().engine, now_ms)?;
        }
        Ok(())
    }

    /// Encoded frames to send, oldest first. Frames that fail to encode are logged and skipped.
    #[wasm_bindgen(js_name = drainOutbound)]
    pub fn drain_outbound(&mut self) -> js_sys::Array {
        let out = js_sys::Array::new();
        for frame in self.core.take_outbound() {
            match encode_frame(&frame) {
                Ok(text) => {
                    out.push(&JsValue::from_str(&text));
                }
                Err(e) => warn!(error = %e, syscall = %frame.syscall, "failed to encode outbound frame"),
            }
        }
        out
    }
}
