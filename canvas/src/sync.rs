//! Sync client: routes hub frames into the engine and engine actions onto the wire.
//!
//! `SyncClient` is the participant's half of the protocol. Inbound frames are
//! typed through [`frames::Event`] and handed to the matching
//! [`EngineCore`] reconciliation method. Outbound, only
//! [`Action::SendMove`] and [`Action::SendCreate`] become frames; every other
//! action is for the host.
//!
//! ERROR HANDLING
//! ==============
//! A frame that fails to parse, or that carries an error status, is logged and
//! dropped. Nothing the hub sends can put the engine into a bad state.

#[cfg(test)]
#[path = "sync_test.rs"]
mod sync_test;

use frames::{Event, Frame, Status, FRAME_CODE, FRAME_MESSAGE};
use tracing::{debug, info, warn};

use crate::engine::{Action, EngineCore};
use crate::geom::Viewport;

/// Connection state as shown to the user.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ConnectionStatus {
    #[default]
    Connecting,
    Connected,
    Disconnected,
}

impl ConnectionStatus {
    /// Status line text for the indicator.
    #[must_use]
    pub fn indicator(self) -> &'static str {
        match self {
            Self::Connecting => "Connecting...",
            Self::Connected => "Connected - Start dragging blocks!",
            Self::Disconnected => "Disconnected - Reconnecting...",
        }
    }
}

/// One participant: engine plus connection status.
#[derive(Debug, Default)]
pub struct SyncClient {
    pub engine: EngineCore,
    pub status: ConnectionStatus,
}

impl SyncClient {
    #[must_use]
    pub fn new(viewport: Viewport) -> Self {
        Self { engine: EngineCore::new(viewport), status: ConnectionStatus::Connecting }
    }

    /// The transport is up. The hub will follow with a snapshot.
    pub fn on_connected(&mut self) {
        info!("connected to hub");
        self.status = ConnectionStatus::Connected;
    }

    /// The transport dropped. Local gestures keep running; the next
    /// connection's snapshot reconciles everything else.
    pub fn on_disconnected(&mut self) {
        if self.status != ConnectionStatus::Disconnected {
            warn!("disconnected from hub");
        }
        self.status = ConnectionStatus::Disconnected;
    }

    /// Apply one inbound frame at local time `now_ms`.
    pub fn handle_frame(&mut self, frame: &Frame, now_ms: f64) -> Vec<Action> {
        if frame.status == Status::Error {
            let message = frame.data.get(FRAME_MESSAGE).and_then(|v| v.as_str()).unwrap_or("");
            let code = frame.data.get(FRAME_CODE).and_then(|v| v.as_str()).unwrap_or("");
            warn!(syscall = %frame.syscall, %code, %message, "hub reported error");
            return vec![];
        }

        let event = match Event::from_frame(frame) {
            Ok(event) => event,
            Err(e) => {
                warn!(syscall = %frame.syscall, error = %e, "dropping inbound frame");
                return vec![];
            }
        };

        match event {
            Event::Snapshot(snapshot) => {
                debug!(blocks = snapshot.len(), "snapshot received");
                self.engine.apply_snapshot(snapshot)
            }
            Event::Moved(update) => self.engine.apply_moved(&update, now_ms),
            Event::Created(record) => self.engine.apply_created(record),
            Event::Move(_) | Event::Create(_) => {
                debug!(syscall = %frame.syscall, "ignoring client-bound request frame");
                vec![]
            }
        }
    }

    /// The frame to send for an engine action, if it has one.
    #[must_use]
    pub fn outbound(action: &Action) -> Option<Frame> {
        match action {
            Action::SendMove(update) => Some(Event::Move(update.clone()).to_frame()),
            Action::SendCreate(request) => Some(Event::Create(*request).to_frame()),
            Action::ScheduleStep { .. } | Action::ScheduleEmit { .. } | Action::RenderNeeded => None,
        }
    }
}
