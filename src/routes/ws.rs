//! WebSocket handler: one participant's frame relay.
//!
//! DESIGN
//! ======
//! On upgrade, generates a participant id, joins the hub, then enters a
//! `select!` loop:
//! - Incoming client frames → parse + dispatch by syscall prefix
//! - Hub frames → forward to the client
//!
//! Dispatch never replies on success. A `block:move` or `block:create` is
//! queued for the hub, and the sender learns the outcome from the broadcast it
//! receives like everyone else. Only failures produce a direct reply.
//!
//! LIFECYCLE
//! =========
//! 1. Upgrade → join hub → hub queues `board:snapshot` first
//! 2. Client frames → dispatch → hub command
//! 3. Hub closes our queue (slow consumer) or client closes → part → done

#[cfg(test)]
#[path = "ws_test.rs"]
mod tests;

use axum::extract::State;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::response::Response;
use frames::{Event, EventError, Frame, Status, decode_frame, encode_frame};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::state::AppState;

// =============================================================================
// UPGRADE
// =============================================================================

pub async fn handle_ws(State(state): State<AppState>, ws: WebSocketUpgrade) -> Response {
    ws.on_upgrade(move |socket| run_ws(socket, state))
}

// =============================================================================
// CONNECTION
// =============================================================================

async fn run_ws(mut socket: WebSocket, state: AppState) {
    let participant = Uuid::new_v4();

    // The hub holds the only sender; when it drops us the loop ends.
    let (client_tx, mut client_rx) = mpsc::channel::<Frame>(state.client_queue_capacity);
    if let Err(e) = state.hub.join(participant, client_tx).await {
        warn!(%participant, error = %e, "ws: hub unavailable");
        return;
    }

    info!(%participant, "ws: client connected");

    loop {
        tokio::select! {
            msg = socket.recv() => {
                let Some(Ok(msg)) = msg else { break };
                match msg {
                    Message::Text(text) => {
                        let replies = process_inbound_text(&state, participant, text.as_str()).await;
                        if send_all(&mut socket, &replies).await.is_err() {
                            break;
                        }
                    }
                    Message::Close(_) => break,
                    _ => {}
                }
            }
            frame = client_rx.recv() => {
                let Some(frame) = frame else {
                    info!(%participant, "ws: dropped by hub");
                    break;
                };
                if send_frame(&mut socket, &frame).await.is_err() {
                    break;
                }
            }
        }
    }

    if let Err(e) = state.hub.part(participant).await {
        debug!(%participant, error = %e, "ws: part after hub shutdown");
    }
    info!(%participant, "ws: client disconnected");
}

// =============================================================================
// FRAME DISPATCH
// =============================================================================

/// Parse and process one inbound text frame and return frames for the sender.
///
/// Kept apart from the socket so tests can drive dispatch directly.
async fn process_inbound_text(state: &AppState, participant: Uuid, text: &str) -> Vec<Frame> {
    let req = match decode_frame(text) {
        Ok(r) => r,
        Err(e) => {
            warn!(%participant, error = %e, "ws: invalid inbound frame");
            return vec![Frame::gateway_error(format!("invalid json: {e}"))];
        }
    };

    debug!(%participant, id = %req.id, syscall = %req.syscall, "ws: recv frame");

    let prefix = req.prefix();
    let result = match prefix {
        "block" => handle_block(state, participant, &req).await,
        _ => Err(req.error(format!("unknown prefix: {prefix}"))),
    };

    match result {
        Ok(()) => vec![],
        Err(err_frame) => vec![err_frame],
    }
}

// =============================================================================
// BLOCK HANDLERS
// =============================================================================

async fn handle_block(state: &AppState, participant: Uuid, req: &Frame) -> Result<(), Frame> {
    let event = match Event::from_frame(req) {
        Ok(event) => event,
        Err(EventError::Malformed { syscall, source }) => {
            debug!(%participant, %syscall, error = %source, "ws: malformed payload ignored");
            return Ok(());
        }
        Err(EventError::UnknownSyscall(_)) => return Err(req.error(format!("unknown block op: {}", req.op()))),
    };

    let queued = match event {
        Event::Move(update) => state.hub.move_block(participant, update).await,
        Event::Create(request) => state.hub.create_block(participant, request).await,
        Event::Moved(_) | Event::Created(_) | Event::Snapshot(_) => {
            return Err(req.error(format!("unknown block op: {}", req.op())));
        }
    };
    queued.map_err(|e| req.error_from(&e))
}

// =============================================================================
// HELPERS
// =============================================================================

async fn send_all(socket: &mut WebSocket, frames: &[Frame]) -> Result<(), ()> {
    for frame in frames {
        send_frame(socket, frame).await?;
    }
    Ok(())
}

async fn send_frame(socket: &mut WebSocket, frame: &Frame) -> Result<(), ()> {
    let json = match encode_frame(frame) {
        Ok(j) => j,
        Err(e) => {
            warn!(error = %e, "ws: failed to serialize frame");
            return Err(());
        }
    };
    if frame.status == Status::Error {
        let message = frame.data.get(frames::FRAME_MESSAGE).and_then(|v| v.as_str()).unwrap_or("-");
        let code = frame.data.get(frames::FRAME_CODE).and_then(|v| v.as_str()).unwrap_or("-");
        warn!(id = %frame.id, syscall = %frame.syscall, code, message, "ws: send frame status=Error");
    }
    socket.send(Message::Text(json.into())).await.map_err(|_| ())
}
