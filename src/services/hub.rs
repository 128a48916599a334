//! Broadcast hub: the authoritative block map and its participants.
//!
//! DESIGN
//! ======
//! One tokio task owns the authoritative map, the participant registry and
//! the id generator. Connections talk to it through a cloneable [`HubHandle`]
//! over a bounded command queue. Commands run one at a time, each to
//! completion:
//!
//! 1. apply to the in-memory map
//! 2. await the store write
//! 3. broadcast to every participant, sender included
//!
//! so no participant ever sees a broadcast whose write has not finished, and
//! every participant sees broadcasts in the order the hub processed them.
//!
//! The hub has no notion of gesture ownership. Echoing a move back to its
//! sender is intentional; participants suppress their own echoes.
//!
//! ERROR HANDLING
//! ==============
//! Store failures are logged and the broadcast still goes out. Nothing is
//! retried; the next successful write for the same block repairs the row.
//! A participant whose queue is full or closed is unregistered on the spot.
//! Its connection then closes, and reconnecting delivers a fresh snapshot.

#[cfg(test)]
#[path = "hub_test.rs"]
mod tests;

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use frames::{BlockRecord, CreateRequest, ErrorCode, Event, Frame, PositionUpdate, Snapshot};
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use super::store::{BlockStore, StoreError, default_label};

// =============================================================================
// TYPES
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum HubError {
    #[error("hub is not running")]
    Closed,
}

impl ErrorCode for HubError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::Closed => "E_HUB_CLOSED",
        }
    }
}

/// Work queued for the hub task.
#[derive(Debug)]
pub enum HubCommand {
    /// Send the snapshot to `tx`, then register it for broadcasts.
    Join { participant: Uuid, tx: mpsc::Sender<Frame> },
    Part { participant: Uuid },
    Move { participant: Uuid, update: PositionUpdate },
    Create { participant: Uuid, request: CreateRequest },
    Snapshot { reply: oneshot::Sender<Snapshot> },
}

// =============================================================================
// ID GENERATOR
// =============================================================================

/// Largest stored id that still counts as a timestamp when seeding
/// (1 January 10000, in milliseconds).
const MAX_SEED_ID: u64 = 253_402_300_800_000;

/// Millisecond-timestamp ids, strictly increasing within the process.
#[derive(Debug, Default, Clone)]
pub struct BlockIdGenerator {
    last: u64,
}

impl BlockIdGenerator {
    /// Start above the largest numeric id already in use. Numeric ids past
    /// [`MAX_SEED_ID`] are not timestamps and are skipped.
    pub fn seeded<'a>(existing: impl IntoIterator<Item = &'a str>) -> Self {
        let last = existing
            .into_iter()
            .filter_map(|id| id.parse::<u64>().ok())
            .filter(|&id| id <= MAX_SEED_ID)
            .max()
            .unwrap_or(0);
        Self { last }
    }

    pub fn next_id(&mut self) -> String {
        self.next_at(now_ms())
    }

    /// The id for a creation at `now_ms`.
    pub fn next_at(&mut self, now_ms: u64) -> String {
        let id = now_ms.max(self.last.saturating_add(1));
        self.last = id;
        id.to_string()
    }
}

fn now_ms() -> u64 {
    let Ok(dur) = SystemTime::now().duration_since(UNIX_EPOCH) else {
        return 0;
    };
    u64::try_from(dur.as_millis()).unwrap_or(u64::MAX)
}

// =============================================================================
// HANDLE
// =============================================================================

/// Cloneable sender side of the hub.
#[derive(Clone, Debug)]
pub struct HubHandle {
    tx: mpsc::Sender<HubCommand>,
}

impl HubHandle {
    /// Register a participant. Its first frame will be the snapshot.
    ///
    /// # Errors
    ///
    /// Returns [`HubError::Closed`] if the hub task has stopped.
    pub async fn join(&self, participant: Uuid, tx: mpsc::Sender<Frame>) -> Result<(), HubError> {
        self.send(HubCommand::Join { participant, tx }).await
    }

    /// Unregister a participant.
    ///
    /// # Errors
    ///
    /// Returns [`HubError::Closed`] if the hub task has stopped.
    pub async fn part(&self, participant: Uuid) -> Result<(), HubError> {
        self.send(HubCommand::Part { participant }).await
    }

    /// # Errors
    ///
    /// Returns [`HubError::Closed`] if the hub task has stopped.
    pub async fn move_block(&self, participant: Uuid, update: PositionUpdate) -> Result<(), HubError> {
        self.send(HubCommand::Move { participant, update }).await
    }

    /// # Errors
    ///
    /// Returns [`HubError::Closed`] if the hub task has stopped.
    pub async fn create_block(&self, participant: Uuid, request: CreateRequest) -> Result<(), HubError> {
        self.send(HubCommand::Create { participant, request }).await
    }

    /// Current authoritative map, after every previously queued command.
    ///
    /// # Errors
    ///
    /// Returns [`HubError::Closed`] if the hub task has stopped.
    pub async fn snapshot(&self) -> Result<Snapshot, HubError> {
        let (reply, rx) = oneshot::channel();
        self.send(HubCommand::Snapshot { reply }).await?;
        rx.await.map_err(|_| HubError::Closed)
    }

    async fn send(&self, cmd: HubCommand) -> Result<(), HubError> {
        self.tx.send(cmd).await.map_err(|_| HubError::Closed)
    }
}

// =============================================================================
// HUB
// =============================================================================

pub struct Hub {
    blocks: Snapshot,
    participants: HashMap<Uuid, mpsc::Sender<Frame>>,
    store: Arc<dyn BlockStore>,
    ids: BlockIdGenerator,
}

impl Hub {
    /// Load the authoritative map from the store.
    ///
    /// # Errors
    ///
    /// Returns the store error if the initial load fails.
    pub async fn load(store: Arc<dyn BlockStore>) -> Result<Self, StoreError> {
        let blocks: Snapshot = store
            .load_all()
            .await?
            .into_iter()
            .map(|b| (b.id.clone(), b))
            .collect();
        let ids = BlockIdGenerator::seeded(blocks.keys().map(String::as_str));
        info!(blocks = blocks.len(), "hub loaded store");
        Ok(Self { blocks, participants: HashMap::new(), store, ids })
    }

    /// Run the hub on its own task. The task ends when every handle is dropped.
    #[must_use]
    pub fn spawn(self, queue_capacity: usize) -> (HubHandle, JoinHandle<()>) {
        let (tx, rx) = mpsc::channel(queue_capacity);
        let task = tokio::spawn(self.run(rx));
        (HubHandle { tx }, task)
    }

    async fn run(mut self, mut rx: mpsc::Receiver<HubCommand>) {
        while let Some(cmd) = rx.recv().await {
            self.handle(cmd).await;
        }
        info!(participants = self.participants.len(), "hub stopped");
    }

    async fn handle(&mut self, cmd: HubCommand) {
        match cmd {
            HubCommand::Join { participant, tx } => self.join(participant, tx),
            HubCommand::Part { participant } => {
                if self.participants.remove(&participant).is_some() {
                    info!(%participant, remaining = self.participants.len(), "participant left");
                }
            }
            HubCommand::Move { participant, update } => self.move_block(participant, update).await,
            HubCommand::Create { participant, request } => self.create_block(participant, request).await,
            HubCommand::Snapshot { reply } => {
                if reply.send(self.blocks.clone()).is_err() {
                    debug!("snapshot requester went away");
                }
            }
        }
    }

    fn join(&mut self, participant: Uuid, tx: mpsc::Sender<Frame>) {
        let frame = Event::Snapshot(self.blocks.clone()).to_frame();
        if let Err(e) = tx.try_send(frame) {
            warn!(%participant, error = %e, "could not deliver snapshot; participant not registered");
            return;
        }
        self.participants.insert(participant, tx);
        info!(%participant, participants = self.participants.len(), blocks = self.blocks.len(), "participant joined");
    }

    async fn move_block(&mut self, participant: Uuid, update: PositionUpdate) {
        let Some(block) = self.blocks.get_mut(&update.id) else {
            debug!(%participant, id = %update.id, "move for unknown block ignored");
            return;
        };
        block.x = update.x;
        block.y = update.y;

        if let Err(e) = self.store.upsert_position(&update.id, update.x, update.y).await {
            error!(id = %update.id, code = e.error_code(), error = %e, "position write failed; broadcasting anyway");
        }

        let frame = Event::Moved(update).to_frame().with_from(participant.to_string());
        self.broadcast(&frame);
    }

    async fn create_block(&mut self, participant: Uuid, request: CreateRequest) {
        let id = self.ids.next_id();
        let record = BlockRecord { label: default_label(&id), id: id.clone(), x: request.x, y: request.y };
        self.blocks.insert(id.clone(), record.clone());

        if let Err(e) = self.store.insert(&record).await {
            error!(%id, code = e.error_code(), error = %e, "block insert failed; broadcasting anyway");
        }
        info!(%participant, %id, x = record.x, y = record.y, "block created");

        let frame = Event::Created(record).to_frame().with_from(participant.to_string());
        self.broadcast(&frame);
    }

    /// Deliver to every participant; unregister the ones that cannot keep up.
    fn broadcast(&mut self, frame: &Frame) {
        let mut dropped = Vec::new();
        for (participant, tx) in &self.participants {
            match tx.try_send(frame.clone()) {
                Ok(()) => {}
                Err(TrySendError::Full(_)) => {
                    warn!(%participant, syscall = %frame.syscall, "participant queue full; disconnecting");
                    dropped.push(*participant);
                }
                Err(TrySendError::Closed(_)) => {
                    debug!(%participant, "participant queue closed");
                    dropped.push(*participant);
                }
            }
        }
        for participant in dropped {
            self.participants.remove(&participant);
        }
    }
}
