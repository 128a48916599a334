use super::*;
use crate::state::test_helpers::test_app_state;
use frames::{CreateRequest, PositionUpdate, SYSCALL_GATEWAY_ERROR, SYSCALL_MOVED, SYSCALL_SNAPSHOT};
use futures_util::{SinkExt, StreamExt};
use serde_json::json;
use tokio::net::TcpListener;
use tokio::time::{Duration, timeout};
use tokio_tungstenite::tungstenite::Message as WsMessage;

fn text(frame: &Frame) -> String {
    encode_frame(frame).expect("encode")
}

async fn recv(rx: &mut mpsc::Receiver<Frame>) -> Frame {
    timeout(Duration::from_millis(500), rx.recv())
        .await
        .expect("frame timed out")
        .expect("channel closed")
}

/// Join `state`'s hub as an observer and consume the snapshot.
async fn observe(state: &AppState) -> mpsc::Receiver<Frame> {
    let (tx, mut rx) = mpsc::channel(16);
    state.hub.join(Uuid::new_v4(), tx).await.expect("join");
    assert_eq!(recv(&mut rx).await.syscall, SYSCALL_SNAPSHOT);
    rx
}

// =============================================================================
// DISPATCH
// =============================================================================

#[tokio::test]
async fn invalid_json_gets_gateway_error() {
    let state = test_app_state().await;
    let replies = process_inbound_text(&state, Uuid::new_v4(), "{oops").await;
    assert_eq!(replies.len(), 1);
    assert_eq!(replies[0].syscall, SYSCALL_GATEWAY_ERROR);
    assert_eq!(replies[0].status, Status::Error);
}

#[tokio::test]
async fn move_is_queued_without_direct_reply() {
    let state = test_app_state().await;
    let mut observer = observe(&state).await;

    let req = Event::Move(PositionUpdate { id: "1".into(), x: 12.0, y: 34.0 }).to_frame();
    let replies = process_inbound_text(&state, Uuid::new_v4(), &text(&req)).await;
    assert!(replies.is_empty());

    let frame = recv(&mut observer).await;
    assert_eq!(frame.syscall, SYSCALL_MOVED);
    assert_eq!(frame.data, json!({ "id": "1", "x": 12.0, "y": 34.0 }));
}

#[tokio::test]
async fn create_is_queued_and_broadcast() {
    let state = test_app_state().await;
    let mut observer = observe(&state).await;

    let req = Event::Create(CreateRequest { x: 5.0, y: 6.0 }).to_frame();
    assert!(process_inbound_text(&state, Uuid::new_v4(), &text(&req)).await.is_empty());

    let Event::Created(record) = Event::from_frame(&recv(&mut observer).await).expect("event") else {
        panic!("expected created");
    };
    assert_eq!((record.x, record.y), (5.0, 6.0));
}

#[tokio::test]
async fn malformed_block_payload_is_ignored() {
    let state = test_app_state().await;
    let mut observer = observe(&state).await;

    let req = Frame::request("block:move", json!({ "id": "1", "x": "left" }));
    assert!(process_inbound_text(&state, Uuid::new_v4(), &text(&req)).await.is_empty());
    assert!(timeout(Duration::from_millis(80), observer.recv()).await.is_err());
}

#[tokio::test]
async fn unknown_prefix_gets_error_reply() {
    let state = test_app_state().await;
    let req = Frame::request("cursor:moved", json!({}));
    let replies = process_inbound_text(&state, Uuid::new_v4(), &text(&req)).await;
    assert_eq!(replies.len(), 1);
    assert_eq!(replies[0].parent_id.as_deref(), Some(req.id.as_str()));
    assert_eq!(replies[0].data["message"], "unknown prefix: cursor");
}

#[tokio::test]
async fn unknown_block_op_gets_error_reply() {
    let state = test_app_state().await;
    let req = Frame::request("block:delete", json!({ "id": "1" }));
    let replies = process_inbound_text(&state, Uuid::new_v4(), &text(&req)).await;
    assert_eq!(replies[0].data["message"], "unknown block op: delete");
}

#[tokio::test]
async fn server_bound_syscalls_from_client_are_rejected() {
    let state = test_app_state().await;
    let req = Event::Moved(PositionUpdate { id: "1".into(), x: 0.0, y: 0.0 }).to_frame();
    let replies = process_inbound_text(&state, Uuid::new_v4(), &text(&req)).await;
    assert_eq!(replies[0].status, Status::Error);
    assert_eq!(replies[0].data["message"], "unknown block op: moved");
}

// =============================================================================
// END TO END
// =============================================================================

type Client = tokio_tungstenite::WebSocketStream<tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>>;

async fn serve() -> String {
    let state = test_app_state().await;
    let app = crate::routes::app(state, "does-not-exist");
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("addr");
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("serve");
    });
    format!("ws://{addr}/ws")
}

async fn next_frame(ws: &mut Client) -> Frame {
    loop {
        let msg = timeout(Duration::from_secs(2), ws.next())
            .await
            .expect("ws frame timed out")
            .expect("ws stream ended")
            .expect("ws error");
        if let WsMessage::Text(body) = msg {
            return decode_frame(body.as_str()).expect("decode");
        }
    }
}

#[tokio::test]
async fn two_clients_see_each_others_moves() {
    let url = serve().await;
    let (mut alice, _) = tokio_tungstenite::connect_async(&url).await.expect("alice connects");
    let (mut bob, _) = tokio_tungstenite::connect_async(&url).await.expect("bob connects");

    let Event::Snapshot(snapshot) = Event::from_frame(&next_frame(&mut alice).await).expect("event") else {
        panic!("alice's first frame must be the snapshot");
    };
    assert_eq!(snapshot.len(), 6);
    assert_eq!(next_frame(&mut bob).await.syscall, SYSCALL_SNAPSHOT);

    let req = Event::Move(PositionUpdate { id: "2".into(), x: 400.0, y: 410.0 }).to_frame();
    alice.send(WsMessage::text(text(&req))).await.expect("send");

    for ws in [&mut alice, &mut bob] {
        let frame = next_frame(ws).await;
        assert_eq!(
            Event::from_frame(&frame).expect("event"),
            Event::Moved(PositionUpdate { id: "2".into(), x: 400.0, y: 410.0 })
        );
    }
}

#[tokio::test]
async fn reconnect_receives_fresh_snapshot() {
    let url = serve().await;
    let (mut first, _) = tokio_tungstenite::connect_async(&url).await.expect("connect");
    next_frame(&mut first).await;
    let req = Event::Move(PositionUpdate { id: "4".into(), x: 1.0, y: 2.0 }).to_frame();
    first.send(WsMessage::text(text(&req))).await.expect("send");
    next_frame(&mut first).await;
    first.close(None).await.expect("close");

    let (mut second, _) = tokio_tungstenite::connect_async(&url).await.expect("reconnect");
    let Event::Snapshot(snapshot) = Event::from_frame(&next_frame(&mut second).await).expect("event") else {
        panic!("expected snapshot");
    };
    assert_eq!((snapshot["4"].x, snapshot["4"].y), (1.0, 2.0));
}
