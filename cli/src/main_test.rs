use super::*;
use std::collections::BTreeMap;

use frames::{BlockRecord, PositionUpdate};

#[test]
fn ws_url_follows_scheme() {
    assert_eq!(ws_url("http://127.0.0.1:3000").expect("http"), "ws://127.0.0.1:3000/ws");
    assert_eq!(ws_url("https://board.example/").expect("https"), "wss://board.example/ws");
}

#[test]
fn ws_url_rejects_other_schemes() {
    assert!(matches!(ws_url("ftp://host"), Err(CliError::InvalidBaseUrl(_))));
}

#[test]
fn centre_offsets_by_half_a_block() {
    assert_eq!(centre(Point::new(100.0, 50.0), Viewport::default()), Point::new(175.0, 125.0));
}

#[test]
fn block_origin_requires_known_block() {
    let client = SyncClient::new(Viewport::default());
    assert!(matches!(block_origin(&client, "9"), Err(CliError::UnknownBlock(id)) if id == "9"));
}

#[test]
fn describe_lists_snapshot_blocks() {
    let blocks = BTreeMap::from([(
        "1".to_owned(),
        BlockRecord { id: "1".into(), x: 10.0, y: 20.5, label: "Block 1".into() },
    )]);
    assert_eq!(describe(&Event::Snapshot(blocks)), "snapshot: 1 blocks\n  1 (10.0, 20.5) Block 1");
}

#[test]
fn describe_moves() {
    let event = Event::Moved(PositionUpdate { id: "3".into(), x: 1.0, y: 2.0 });
    assert_eq!(describe(&event), "moved 3 -> (1.0, 2.0)");
}

#[test]
fn cli_parses_drag() {
    let cli = Cli::try_parse_from(["blockboard", "drag", "2", "--to-x", "300", "--to-y", "40"]).expect("parse");
    assert!(matches!(cli.command, Commands::Drag { ref id, to_x, to_y } if id == "2" && to_x == 300.0 && to_y == 40.0));
}

#[test]
fn predicted_landing_carries_past_release_point() {
    let landing = predicted_landing(Point::new(100.0, 100.0), 10.0, 0.0, Viewport::default());
    assert!(landing.x > 150.0 && landing.x < 1050.0, "landing {landing:?}");
    assert_eq!(landing.y, 100.0);
}

#[test]
fn predicted_landing_without_flick_stays_put() {
    let landing = predicted_landing(Point::new(40.0, 60.0), 0.0, 0.0, Viewport::default());
    assert_eq!(landing, Point::new(40.0, 60.0));
}
