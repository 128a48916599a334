use super::*;
use crate::db;
use crate::state::test_helpers::{FailingStore, MemoryStore};

async fn sql_store() -> SqlBlockStore {
    SqlBlockStore::new(db::memory_pool().await)
}

fn record(id: &str, x: f64, y: f64) -> BlockRecord {
    BlockRecord { id: id.into(), x, y, label: default_label(id) }
}

#[tokio::test]
async fn sql_insert_then_load() {
    let store = sql_store().await;
    store.insert(&record("10", 1.5, 2.5)).await.unwrap();
    let rows = store.load_all().await.unwrap();
    assert_eq!(rows, vec![record("10", 1.5, 2.5)]);
}

#[tokio::test]
async fn sql_upsert_overwrites_position_and_keeps_label() {
    let store = sql_store().await;
    store
        .insert(&BlockRecord { id: "7".into(), x: 0.0, y: 0.0, label: "Custom".into() })
        .await
        .unwrap();
    store.upsert_position("7", 40.0, 50.0).await.unwrap();
    store.upsert_position("7", 60.0, 70.0).await.unwrap();

    let rows = store.load_all().await.unwrap();
    assert_eq!(rows, vec![BlockRecord { id: "7".into(), x: 60.0, y: 70.0, label: "Custom".into() }]);
}

#[tokio::test]
async fn sql_upsert_creates_missing_row_with_default_label() {
    let store = sql_store().await;
    store.upsert_position("42", 1.0, 2.0).await.unwrap();
    assert_eq!(store.load_all().await.unwrap(), vec![record("42", 1.0, 2.0)]);
}

#[tokio::test]
async fn sql_duplicate_insert_is_an_error() {
    let store = sql_store().await;
    store.insert(&record("1", 0.0, 0.0)).await.unwrap();
    let err = store.insert(&record("1", 5.0, 5.0)).await.unwrap_err();
    assert_eq!(err.error_code(), "E_DATABASE");
}

#[tokio::test]
async fn seed_fills_empty_store_once() {
    let store = sql_store().await;
    assert_eq!(seed_defaults(&store).await.unwrap(), 6);
    assert_eq!(seed_defaults(&store).await.unwrap(), 0);

    let rows = store.load_all().await.unwrap();
    assert_eq!(rows.len(), 6);
    let third = rows.iter().find(|r| r.id == "3").expect("block 3");
    assert_eq!((third.x, third.y, third.label.as_str()), (500.0, 200.0, "Block 3"));
}

#[tokio::test]
async fn seed_leaves_populated_store_alone() {
    let store = MemoryStore::with_blocks(vec![record("99", 1.0, 1.0)]);
    assert_eq!(seed_defaults(&store).await.unwrap(), 0);
    assert_eq!(store.load_all().await.unwrap().len(), 1);
}

#[tokio::test]
async fn seed_propagates_store_failure() {
    assert!(seed_defaults(&FailingStore).await.is_err());
}
