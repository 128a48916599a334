use frames::{BlockRecord, PositionUpdate, Snapshot, SYSCALL_CREATE, SYSCALL_MOVE};
use serde_json::json;

use super::*;
use crate::geom::Point;

fn snapshot_frame() -> Frame {
    let mut snapshot = Snapshot::new();
    for (id, x, y) in [("1", 100.0, 100.0), ("2", 300.0, 150.0)] {
        snapshot.insert(id.into(), BlockRecord { id: id.into(), x, y, label: format!("Block {id}") });
    }
    Event::Snapshot(snapshot).to_frame()
}

#[test]
fn status_indicator_texts() {
    assert_eq!(ConnectionStatus::Connected.indicator(), "Connected - Start dragging blocks!");
    assert_eq!(ConnectionStatus::Disconnected.indicator(), "Disconnected - Reconnecting...");
    assert_eq!(SyncClient::default().status, ConnectionStatus::Connecting);
}

#[test]
fn connection_transitions() {
    let mut client = SyncClient::default();
    client.on_connected();
    assert_eq!(client.status, ConnectionStatus::Connected);
    client.on_disconnected();
    client.on_disconnected();
    assert_eq!(client.status, ConnectionStatus::Disconnected);
}

#[test]
fn snapshot_frame_populates_engine() {
    let mut client = SyncClient::default();
    let actions = client.handle_frame(&snapshot_frame(), 0.0);
    assert_eq!(actions, vec![Action::RenderNeeded]);
    assert_eq!(client.engine.doc.len(), 2);
    assert_eq!(client.engine.doc.position("2"), Some(Point::new(300.0, 150.0)));
}

#[test]
fn moved_frame_is_reconciled() {
    let mut client = SyncClient::default();
    client.handle_frame(&snapshot_frame(), 0.0);
    let frame = Event::Moved(PositionUpdate { id: "1".into(), x: 5.0, y: 6.0 }).to_frame();
    client.handle_frame(&frame, 10.0);
    assert_eq!(client.engine.doc.position("1"), Some(Point::new(5.0, 6.0)));
}

#[test]
fn moved_frame_for_dragged_block_is_suppressed() {
    let mut client = SyncClient::default();
    client.handle_frame(&snapshot_frame(), 0.0);
    client.engine.on_pointer_down("1", Point::new(100.0, 100.0), 0.0);

    let frame = Event::Moved(PositionUpdate { id: "1".into(), x: 5.0, y: 6.0 }).to_frame();
    assert!(client.handle_frame(&frame, 10.0).is_empty());
    assert_eq!(client.engine.doc.position("1"), Some(Point::new(100.0, 100.0)));
}

#[test]
fn created_frame_adds_block_once() {
    let mut client = SyncClient::default();
    let record = BlockRecord { id: "1700000000001".into(), x: 1.0, y: 2.0, label: "Block 1700000000001".into() };
    let frame = Event::Created(record).to_frame();
    client.handle_frame(&frame, 0.0);
    client.handle_frame(&frame, 1.0);
    assert_eq!(client.engine.doc.len(), 1);
}

#[test]
fn malformed_and_unknown_frames_are_dropped() {
    let mut client = SyncClient::default();
    client.handle_frame(&snapshot_frame(), 0.0);

    let bad = Frame::request("block:moved", json!({ "id": "1", "x": "far" }));
    assert!(client.handle_frame(&bad, 1.0).is_empty());
    let unknown = Frame::request("cursor:moved", json!({}));
    assert!(client.handle_frame(&unknown, 1.0).is_empty());
    assert_eq!(client.engine.doc.position("1"), Some(Point::new(100.0, 100.0)));
}

#[test]
fn error_frames_are_dropped() {
    let mut client = SyncClient::default();
    assert!(client.handle_frame(&Frame::gateway_error("invalid json"), 0.0).is_empty());
}

#[test]
fn outbound_encodes_only_wire_actions() {
    let moved = SyncClient::outbound(&Action::SendMove(PositionUpdate { id: "1".into(), x: 1.0, y: 2.0 }))
        .expect("move frame");
    assert_eq!(moved.syscall, SYSCALL_MOVE);
    assert_eq!(moved.data, json!({ "id": "1", "x": 1.0, "y": 2.0 }));

    let created = SyncClient::outbound(&Action::SendCreate(frames::CreateRequest { x: 3.0, y: 4.0 }))
        .expect("create frame");
    assert_eq!(created.syscall, SYSCALL_CREATE);

    assert!(SyncClient::outbound(&Action::RenderNeeded).is_none());
}
