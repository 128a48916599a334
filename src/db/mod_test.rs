use super::*;

#[tokio::test]
async fn migrations_create_blocks_table() {
    let pool = memory_pool().await;
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM blocks")
        .fetch_one(&pool)
        .await
        .expect("blocks table should exist");
    assert_eq!(count, 0);
}

#[tokio::test]
async fn migrations_are_idempotent() {
    let pool = memory_pool().await;
    migrate(&pool).await.expect("second run should be a no-op");
}

#[tokio::test]
async fn init_pool_opens_memory_database() {
    let pool = init_pool("sqlite::memory:", 1).await.expect("pool");
    let one: i64 = sqlx::query_scalar("SELECT 1").fetch_one(&pool).await.expect("query");
    assert_eq!(one, 1);
}
