//! Client core for the shared block canvas.
//!
//! This crate holds everything a participant needs between raw pointer input
//! and the wire: the drag controller, the throw physics, the local render
//! state, and the synchronization client that reconciles hub broadcasts. The
//! engine does no I/O. A host feeds it pointer events, timer callbacks and
//! inbound frames on one event loop and executes the [`engine::Action`]s it
//! returns. Two hosts exist: [`host::BoardHost`], compiled to wasm for
//! `public/index.html`, and the headless CLI.
//!
//! ## Module layout
//!
//! | Module | Role |
//! |--------|------|
//! | [`engine`] | [`engine::EngineCore`]: drag controller, throw driver, reconciliation |
//! | [`sync`] | Frame routing, outbound encoding, connection status |
//! | [`host`] | Browser host: timer list, outbound buffer, `wasm-bindgen` surface |
//! | [`render`] | Canvas 2D drawing of the local render state |
//! | [`doc`] | Local render state: the participant's mirror of every block |
//! | [`physics`] | Single-block throw integrator with friction and bounces |
//! | [`input`] | Drag session and per-block gesture phase |
//! | [`animation`] | Cancellation tokens for in-flight throws |
//! | [`transition`] | Cosmetic smoothing of remote moves |
//! | [`geom`] | Points, velocities, viewport bounds |
//! | [`consts`] | Shared numeric constants (friction, thresholds, cadences) |

pub mod animation;
pub mod consts;
pub mod doc;
pub mod engine;
pub mod geom;
pub mod host;
pub mod input;
pub mod physics;
pub mod render;
pub mod sync;
pub mod transition;
