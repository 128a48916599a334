//! Domain services used by the websocket route.
//!
//! ARCHITECTURE
//! ============
//! `hub` owns the authoritative block map and fan-out; `store` owns the rows
//! behind it. Routes only translate frames into hub commands.

pub mod hub;
pub mod store;
