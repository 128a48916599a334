//! Single-threaded participant runtime.
//!
//! DESIGN
//! ======
//! Everything that touches the [`SyncClient`] goes through one unbounded
//! queue of [`LoopEvent`]s and is handled on one task, one event at a time:
//! inbound frames, connection changes, scripted pointer input, and the throw
//! step/emit timers. Timers are spawned sleeps that post back into the queue
//! carrying their [`AnimationToken`], so a cancelled throw's callbacks arrive
//! like any other event and the engine discards them.
//!
//! The socket lives on its own task ([`spawn_connection`]). It reconnects
//! with exponential backoff and drops outbound frames queued while it is
//! down; the snapshot sent on reconnect is the only recovery path.

#[cfg(test)]
#[path = "runtime_test.rs"]
mod tests;

use std::collections::HashMap;
use std::time::Duration;

use canvas::animation::AnimationToken;
use canvas::doc::BlockId;
use canvas::engine::Action;
use canvas::geom::{Point, Viewport};
use canvas::sync::SyncClient;
use frames::{CreateRequest, Event, Frame, PositionUpdate, decode_frame, encode_frame};
use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, info, warn};

pub const INITIAL_BACKOFF: Duration = Duration::from_millis(250);
pub const MAX_BACKOFF: Duration = Duration::from_secs(5);

// =============================================================================
// EVENTS
// =============================================================================

/// Scripted pointer input.
#[derive(Debug, Clone, PartialEq)]
pub enum PointerEvent {
    Down { id: BlockId, at: Point },
    Move(Point),
    Up,
    /// Double-click on empty canvas.
    Create(Point),
}

/// Everything the runtime reacts to.
#[derive(Debug, Clone, PartialEq)]
pub enum LoopEvent {
    Connected,
    Disconnected,
    Inbound(Frame),
    Step { id: BlockId, token: AnimationToken },
    Emit { id: BlockId, token: AnimationToken },
    Pointer(PointerEvent),
}

// =============================================================================
// RUNTIME
// =============================================================================

pub struct Runtime {
    client: SyncClient,
    events_tx: mpsc::UnboundedSender<LoopEvent>,
    events_rx: mpsc::UnboundedReceiver<LoopEvent>,
    outbound: mpsc::Sender<Frame>,
    started: Instant,
    last_sent: HashMap<BlockId, PositionUpdate>,
    last_create: Option<CreateRequest>,
    released: bool,
}

impl Runtime {
    #[must_use]
    pub fn new(viewport: Viewport, outbound: mpsc::Sender<Frame>) -> Self {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        Self {
            client: SyncClient::new(viewport),
            events_tx,
            events_rx,
            outbound,
            started: Instant::now(),
            last_sent: HashMap::new(),
            last_create: None,
            released: false,
        }
    }

    /// Sender for posting events into this runtime's queue.
    #[must_use]
    pub fn sender(&self) -> mpsc::UnboundedSender<LoopEvent> {
        self.events_tx.clone()
    }

    #[must_use]
    pub fn client(&self) -> &SyncClient {
        &self.client
    }

    /// The last position this runtime sent for a block.
    #[must_use]
    pub fn last_sent(&self, id: &str) -> Option<&PositionUpdate> {
        self.last_sent.get(id)
    }

    /// The last create request this runtime sent.
    #[must_use]
    pub fn last_create(&self) -> Option<CreateRequest> {
        self.last_create
    }

    /// Whether a pointer release has been processed.
    #[must_use]
    pub fn released(&self) -> bool {
        self.released
    }

    /// Milliseconds since the runtime started.
    #[must_use]
    pub fn now_ms(&self) -> f64 {
        self.started.elapsed().as_secs_f64() * 1000.0
    }

    pub async fn next(&mut self) -> Option<LoopEvent> {
        self.events_rx.recv().await
    }

    /// Handle one event and carry out the resulting actions. Returns the typed
    /// protocol event when `event` was an inbound frame that parsed.
    pub fn dispatch(&mut self, event: LoopEvent) -> Option<Event> {
        let now = self.now_ms();
        let mut observed = None;
        let actions = match event {
            LoopEvent::Connected => {
                self.client.on_connected();
                vec![]
            }
            LoopEvent::Disconnected => {
                self.client.on_disconnected();
                vec![]
            }
            LoopEvent::Inbound(frame) => {
                observed = Event::from_frame(&frame).ok();
                self.client.handle_frame(&frame, now)
            }
            LoopEvent::Step { id, token } => self.client.engine.on_step(&id, token, now),
            LoopEvent::Emit { id, token } => self.client.engine.on_emit_timer(&id, token),
            LoopEvent::Pointer(PointerEvent::Down { id, at }) => self.client.engine.on_pointer_down(&id, at, now),
            LoopEvent::Pointer(PointerEvent::Move(at)) => self.client.engine.on_pointer_move(at, now),
            LoopEvent::Pointer(PointerEvent::Up) => {
                self.released = true;
                self.client.engine.on_pointer_up(now)
            }
            LoopEvent::Pointer(PointerEvent::Create(at)) => self.client.engine.request_create(at),
        };
        self.execute(actions);
        self.client.engine.prune_transitions(now);
        observed
    }

    fn execute(&mut self, actions: Vec<Action>) {
        for action in actions {
            match &action {
                Action::SendMove(update) => {
                    self.last_sent.insert(update.id.clone(), update.clone());
                }
                Action::SendCreate(request) => self.last_create = Some(*request),
                Action::ScheduleStep { id, token, after_ms } => {
                    self.schedule(*after_ms, LoopEvent::Step { id: id.clone(), token: *token });
                }
                Action::ScheduleEmit { id, token, after_ms } => {
                    self.schedule(*after_ms, LoopEvent::Emit { id: id.clone(), token: *token });
                }
                Action::RenderNeeded => {}
            }
            if let Some(frame) = SyncClient::outbound(&action) {
                if let Err(e) = self.outbound.try_send(frame) {
                    warn!(error = %e, "outbound queue rejected frame");
                }
            }
        }
    }

    fn schedule(&self, after_ms: f64, event: LoopEvent) {
        let tx = self.events_tx.clone();
        let delay = Duration::from_secs_f64(after_ms.max(0.0) / 1000.0);
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            if tx.send(event).is_err() {
                debug!("timer fired after runtime shut down");
            }
        });
    }
}

/// Post `script` into the runtime queue, sleeping before each event.
pub fn spawn_script(tx: mpsc::UnboundedSender<LoopEvent>, script: Vec<(Duration, PointerEvent)>) -> JoinHandle<()> {
    tokio::spawn(async move {
        for (delay, event) in script {
            tokio::time::sleep(delay).await;
            if tx.send(LoopEvent::Pointer(event)).is_err() {
                return;
            }
        }
    })
}

// =============================================================================
// GESTURE SCRIPTS
// =============================================================================

/// Frame interval used by scripted gestures.
fn frame_interval() -> Duration {
    Duration::from_secs_f64(canvas::consts::FRAME_MS / 1000.0)
}

/// Press at `from`, glide to `to` over `steps` frames, rest, then release with
/// no velocity so the block stays where it was dropped.
#[must_use]
pub fn drag_script(id: &str, from: Point, to: Point, steps: u32) -> Vec<(Duration, PointerEvent)> {
    let steps = steps.max(1);
    let mut script = vec![(Duration::ZERO, PointerEvent::Down { id: id.to_owned(), at: from })];
    for i in 1..=steps {
        let t = f64::from(i) / f64::from(steps);
        let at = Point::new(from.x + (to.x - from.x) * t, from.y + (to.y - from.y) * t);
        script.push((frame_interval(), PointerEvent::Move(at)));
    }
    let rest = Duration::from_secs_f64(canvas::consts::VELOCITY_STALE_MS / 1000.0) + Duration::from_millis(50);
    script.push((rest, PointerEvent::Up));
    script
}

/// Press at `from`, flick by `(dx, dy)` per frame for `frames` frames, release at speed.
#[must_use]
pub fn throw_script(id: &str, from: Point, dx: f64, dy: f64, frames: u32) -> Vec<(Duration, PointerEvent)> {
    let mut script = vec![(Duration::ZERO, PointerEvent::Down { id: id.to_owned(), at: from })];
    let mut at = from;
    for _ in 0..frames.max(1) {
        at = Point::new(at.x + dx, at.y + dy);
        script.push((frame_interval(), PointerEvent::Move(at)));
    }
    script.push((Duration::from_millis(5), PointerEvent::Up));
    script
}

// =============================================================================
// CONNECTION
// =============================================================================

/// Exponential reconnect delay.
#[derive(Debug, Clone)]
pub struct Backoff {
    next: Duration,
}

impl Default for Backoff {
    fn default() -> Self {
        Self { next: INITIAL_BACKOFF }
    }
}

impl Backoff {
    /// Delay before the next attempt; doubles up to [`MAX_BACKOFF`].
    pub fn next_delay(&mut self) -> Duration {
        let delay = self.next;
        self.next = (self.next * 2).min(MAX_BACKOFF);
        delay
    }

    pub fn reset(&mut self) {
        self.next = INITIAL_BACKOFF;
    }
}

/// Keep a WebSocket to `url` open, relaying frames both ways.
///
/// The task ends when the runtime drops its event receiver or its outbound sender.
pub fn spawn_connection(
    url: String,
    events: mpsc::UnboundedSender<LoopEvent>,
    outbound: mpsc::Receiver<Frame>,
) -> JoinHandle<()> {
    tokio::spawn(connection_loop(url, events, outbound))
}

async fn connection_loop(url: String, events: mpsc::UnboundedSender<LoopEvent>, mut outbound: mpsc::Receiver<Frame>) {
    let mut backoff = Backoff::default();
    loop {
        match connect_async(url.as_str()).await {
            Ok((stream, _)) => {
                backoff.reset();
                info!(%url, "connected");
                if events.send(LoopEvent::Connected).is_err() {
                    return;
                }
                if !relay(stream, &events, &mut outbound).await {
                    return;
                }
            }
            Err(e) => warn!(%url, error = %e, "connect failed"),
        }

        if events.send(LoopEvent::Disconnected).is_err() {
            return;
        }
        let mut discarded = 0_usize;
        while outbound.try_recv().is_ok() {
            discarded += 1;
        }
        if discarded > 0 {
            debug!(discarded, "dropped frames queued while disconnected");
        }
        let delay = backoff.next_delay();
        debug!(delay_ms = delay.as_millis(), "reconnecting");
        tokio::time::sleep(delay).await;
    }
}

type Socket = tokio_tungstenite::WebSocketStream<tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>>;

/// Pump one live socket. Returns false when the runtime is gone and the
/// connection task should stop.
async fn relay(stream: Socket, events: &mpsc::UnboundedSender<LoopEvent>, outbound: &mut mpsc::Receiver<Frame>) -> bool {
    let (mut sink, mut source) = stream.split();
    loop {
        tokio::select! {
            msg = source.next() => match msg {
                Some(Ok(Message::Text(text))) => match decode_frame(text.as_str()) {
                    Ok(frame) => {
                        if events.send(LoopEvent::Inbound(frame)).is_err() {
                            return false;
                        }
                    }
                    Err(e) => warn!(error = %e, "undecodable frame from hub"),
                },
                Some(Ok(Message::Close(_))) | None => return true,
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    warn!(error = %e, "socket error");
                    return true;
                }
            },
            frame = outbound.recv() => {
                let Some(frame) = frame else { return false };
                let text = match encode_frame(&frame) {
                    Ok(text) => text,
                    Err(e) => {
                        warn!(error = %e, "failed to encode outbound frame");
                        continue;
                    }
                };
                if let Err(e) = sink.send(Message::text(text)).await {
                    warn!(error = %e, "send failed");
                    return true;
                }
            }
        }
    }
}
