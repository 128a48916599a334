//! Shared application state.
//!
//! DESIGN
//! ======
//! `AppState` is injected into Axum handlers via the `State` extractor. The
//! block map itself lives inside the hub task; handlers only hold the
//! [`HubHandle`] that queues commands for it.

use crate::services::hub::HubHandle;

/// Shared application state, injected into Axum handlers via State extractor.
#[derive(Clone)]
pub struct AppState {
    pub hub: HubHandle,
    /// Capacity of each participant's outbound frame queue.
    pub client_queue_capacity: usize,
}

impl AppState {
    #[must_use]
    pub fn new(hub: HubHandle, client_queue_capacity: usize) -> Self {
        Self { hub, client_queue_capacity }
    }
}

#[cfg(test)]
#[path = "state_helpers_test.rs"]
pub mod test_helpers;
