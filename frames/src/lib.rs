//! Shared frame model and JSON codec for the realtime block protocol.
//!
//! This crate owns the wire representation used by both the hub and its
//! participants. Every message on a connection is a [`Frame`]; the five
//! protocol events (snapshot, moved, created, move, create) are typed through
//! [`Event`] so neither side has to dig through raw JSON.
//!
//! DESIGN
//! ======
//! - Flat data: the payload is a JSON value whose shape is fixed per syscall.
//! - Routing is by `syscall` prefix ("block:", "board:"), never by payload.
//! - Frames travel as WebSocket text messages.

use std::collections::BTreeMap;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

// =============================================================================
// SYSCALLS
// =============================================================================

/// Server → client: full store contents, sent once per connection.
pub const SYSCALL_SNAPSHOT: &str = "board:snapshot";
/// Server → client: authoritative position of one block.
pub const SYSCALL_MOVED: &str = "block:moved";
/// Server → client: a block was created.
pub const SYSCALL_CREATED: &str = "block:created";
/// Client → server: request to set a block position.
pub const SYSCALL_MOVE: &str = "block:move";
/// Client → server: request a new block at a position.
pub const SYSCALL_CREATE: &str = "block:create";
/// Server → client: the gateway could not process an inbound frame.
pub const SYSCALL_GATEWAY_ERROR: &str = "gateway:error";

/// Frame data key for error messages.
pub const FRAME_MESSAGE: &str = "message";

/// Frame data key for grepable error codes.
pub const FRAME_CODE: &str = "code";

// =============================================================================
// ERRORS
// =============================================================================

/// Error returned by [`decode_frame`] and [`encode_frame`].
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    /// The text could not be parsed (or produced) as a JSON frame.
    #[error("invalid json frame: {0}")]
    Json(#[from] serde_json::Error),
}

/// Error returned by [`Event::from_frame`].
#[derive(Debug, thiserror::Error)]
pub enum EventError {
    /// The frame's syscall is not part of the block protocol.
    #[error("unknown syscall: {0}")]
    UnknownSyscall(String),
    /// The syscall is known but its payload does not have the expected shape.
    #[error("malformed {syscall} payload: {source}")]
    Malformed {
        syscall: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Grepable error code for structured error frames.
pub trait ErrorCode: std::fmt::Display {
    fn error_code(&self) -> &'static str;
}

// =============================================================================
// FRAME
// =============================================================================

/// Lifecycle status of a frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    /// An event or request. Every protocol event carries this status.
    Request,
    /// Error reply to a frame the gateway could not handle.
    Error,
}

/// A single message on the realtime wire protocol.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Frame {
    /// Unique identifier for this frame (UUID string).
    pub id: String,
    /// ID of the frame this one replies to, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,
    /// Milliseconds since the Unix epoch when the frame was created.
    #[serde(default)]
    pub ts: i64,
    /// Sender label (participant id or system label).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from: Option<String>,
    /// Namespaced operation name, e.g. `"block:move"`.
    pub syscall: String,
    /// Lifecycle position of the frame.
    #[serde(default = "default_status")]
    pub status: Status,
    /// Syscall-specific JSON payload.
    #[serde(default)]
    pub data: Value,
}

fn default_status() -> Status {
    Status::Request
}

/// Current time as milliseconds since Unix epoch.
#[cfg(target_arch = "wasm32")]
#[allow(clippy::cast_possible_truncation)]
fn now_ms() -> i64 {
    js_sys::Date::now() as i64
}

/// Current time as milliseconds since Unix epoch.
#[cfg(not(target_arch = "wasm32"))]
fn now_ms() -> i64 {
    use std::time::{SystemTime, UNIX_EPOCH};

    let Ok(dur) = SystemTime::now().duration_since(UNIX_EPOCH) else {
        return 0;
    };
    i64::try_from(dur.as_millis()).unwrap_or(0)
}

impl Frame {
    /// Create a request frame.
    pub fn request(syscall: impl Into<String>, data: Value) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            parent_id: None,
            ts: now_ms(),
            from: None,
            syscall: syscall.into(),
            status: Status::Request,
            data,
        }
    }

    /// Create a gateway error frame that is not tied to a parseable request.
    pub fn gateway_error(message: impl Into<String>) -> Self {
        let mut frame = Self::request(SYSCALL_GATEWAY_ERROR, message_data(message.into(), None));
        frame.status = Status::Error;
        frame
    }

    /// Create an error reply from a plain string.
    #[must_use]
    pub fn error(&self, message: impl Into<String>) -> Self {
        self.reply_error(message_data(message.into(), None))
    }

    /// Create an error reply from a typed error.
    #[must_use]
    pub fn error_from(&self, err: &(impl ErrorCode + ?Sized)) -> Self {
        self.reply_error(message_data(err.to_string(), Some(err.error_code())))
    }

    fn reply_error(&self, data: Value) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            parent_id: Some(self.id.clone()),
            ts: now_ms(),
            from: None,
            syscall: self.syscall.clone(),
            status: Status::Error,
            data,
        }
    }

    #[must_use]
    pub fn with_from(mut self, from: impl Into<String>) -> Self {
        self.from = Some(from.into());
        self
    }

    /// Extract the syscall prefix (everything before the first ':').
    #[must_use]
    pub fn prefix(&self) -> &str {
        let Some((prefix, _)) = self.syscall.split_once(':') else {
            return &self.syscall;
        };
        prefix
    }

    /// Extract the operation (everything after the first ':').
    #[must_use]
    pub fn op(&self) -> &str {
        self.syscall.split_once(':').map_or("", |(_, op)| op)
    }
}

fn message_data(message: String, code: Option<&'static str>) -> Value {
    let mut data = serde_json::Map::new();
    data.insert(FRAME_MESSAGE.into(), Value::String(message));
    if let Some(code) = code {
        data.insert(FRAME_CODE.into(), Value::String(code.to_owned()));
    }
    Value::Object(data)
}

/// Encode a frame as JSON text.
///
/// # Errors
///
/// Returns [`CodecError::Json`] if serialization fails.
pub fn encode_frame(frame: &Frame) -> Result<String, CodecError> {
    Ok(serde_json::to_string(frame)?)
}

/// Decode JSON text into a frame.
///
/// # Errors
///
/// Returns [`CodecError::Json`] for malformed text.
pub fn decode_frame(text: &str) -> Result<Frame, CodecError> {
    Ok(serde_json::from_str(text)?)
}

// =============================================================================
// PAYLOADS
// =============================================================================

/// A block as carried by snapshot and created events.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BlockRecord {
    pub id: String,
    pub x: f64,
    pub y: f64,
    #[serde(alias = "text")]
    pub label: String,
}

/// Position of one block, used for both `block:move` and `block:moved`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PositionUpdate {
    pub id: String,
    pub x: f64,
    pub y: f64,
}

/// Payload of `block:create`.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct CreateRequest {
    pub x: f64,
    pub y: f64,
}

/// Snapshot payload: block id → block.
pub type Snapshot = BTreeMap<String, BlockRecord>;

// =============================================================================
// EVENTS
// =============================================================================

/// The typed view of every protocol frame.
#[derive(Clone, Debug, PartialEq)]
pub enum Event {
    Snapshot(Snapshot),
    Moved(PositionUpdate),
    Created(BlockRecord),
    Move(PositionUpdate),
    Create(CreateRequest),
}

impl Event {
    #[must_use]
    pub fn syscall(&self) -> &'static str {
        match self {
            Self::Snapshot(_) => SYSCALL_SNAPSHOT,
            Self::Moved(_) => SYSCALL_MOVED,
            Self::Created(_) => SYSCALL_CREATED,
            Self::Move(_) => SYSCALL_MOVE,
            Self::Create(_) => SYSCALL_CREATE,
        }
    }

    /// Wrap this event in a fresh request frame.
    #[must_use]
    pub fn to_frame(&self) -> Frame {
        let data = match self {
            Self::Snapshot(snapshot) => serde_json::to_value(snapshot),
            Self::Moved(update) | Self::Move(update) => serde_json::to_value(update),
            Self::Created(record) => serde_json::to_value(record),
            Self::Create(request) => serde_json::to_value(request),
        };
        Frame::request(self.syscall(), data.unwrap_or_default())
    }

    /// Parse the typed event out of a frame.
    ///
    /// # Errors
    ///
    /// Returns [`EventError::UnknownSyscall`] for syscalls outside the block
    /// protocol and [`EventError::Malformed`] when the payload has the wrong shape.
    pub fn from_frame(frame: &Frame) -> Result<Self, EventError> {
        match frame.syscall.as_str() {
            SYSCALL_SNAPSHOT => parse(frame).map(Self::Snapshot),
            SYSCALL_MOVED => parse(frame).map(Self::Moved),
            SYSCALL_CREATED => parse(frame).map(Self::Created),
            SYSCALL_MOVE => parse(frame).map(Self::Move),
            SYSCALL_CREATE => parse(frame).map(Self::Create),
            other => Err(EventError::UnknownSyscall(other.to_owned())),
        }
    }
}

fn parse<T: DeserializeOwned>(frame: &Frame) -> Result<T, EventError> {
    T::deserialize(&frame.data).map_err(|source| EventError::Malformed { syscall: frame.syscall.clone(), source })
}

#[cfg(test)]
#[path = "lib_test.rs"]
mod tests;
