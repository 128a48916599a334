//! Block store: durable rows behind the hub's authoritative map.
//!
//! DESIGN
//! ======
//! The hub is the only caller. It loads every row once at startup, then writes
//! through one row at a time (`upsert_position` for moves, `insert` for
//! creates). Writes are blind: no version column, last writer wins.
//!
//! `BlockStore` is a trait so the hub can be tested against in-memory and
//! failing stores without a database.

#[cfg(test)]
#[path = "store_test.rs"]
mod tests;

use async_trait::async_trait;
use frames::{BlockRecord, ErrorCode};
use sqlx::SqlitePool;
use tracing::info;

// =============================================================================
// TYPES
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl ErrorCode for StoreError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::Database(_) => "E_DATABASE",
        }
    }
}

/// The blocks every fresh store starts with.
pub const DEFAULT_BLOCKS: [(&str, f64, f64); 6] = [
    ("1", 100.0, 100.0),
    ("2", 300.0, 150.0),
    ("3", 500.0, 200.0),
    ("4", 200.0, 350.0),
    ("5", 450.0, 400.0),
    ("6", 650.0, 300.0),
];

/// Label given to a block that has no other name.
#[must_use]
pub fn default_label(id: &str) -> String {
    format!("Block {id}")
}

#[async_trait]
pub trait BlockStore: Send + Sync {
    /// Every stored block.
    async fn load_all(&self) -> Result<Vec<BlockRecord>, StoreError>;

    /// Write a block's position, creating the row with its default label if missing.
    async fn upsert_position(&self, id: &str, x: f64, y: f64) -> Result<(), StoreError>;

    /// Insert a new block.
    async fn insert(&self, block: &BlockRecord) -> Result<(), StoreError>;
}

// =============================================================================
// SQL STORE
// =============================================================================

/// `BlockStore` over the `blocks` table.
#[derive(Clone)]
pub struct SqlBlockStore {
    pool: SqlitePool,
}

impl SqlBlockStore {
    #[must_use]
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl BlockStore for SqlBlockStore {
    async fn load_all(&self) -> Result<Vec<BlockRecord>, StoreError> {
        let rows = sqlx::query_as::<_, (String, f64, f64, String)>(
            "SELECT id, x, y, text FROM blocks ORDER BY created_at ASC, id ASC",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|(id, x, y, label)| BlockRecord { id, x, y, label })
            .collect())
    }

    async fn upsert_position(&self, id: &str, x: f64, y: f64) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO blocks (id, x, y, text) VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT (id) DO UPDATE SET x = excluded.x, y = excluded.y, updated_at = CURRENT_TIMESTAMP",
        )
        .bind(id)
        .bind(x)
        .bind(y)
        .bind(default_label(id))
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn insert(&self, block: &BlockRecord) -> Result<(), StoreError> {
        sqlx::query("INSERT INTO blocks (id, x, y, text) VALUES (?1, ?2, ?3, ?4)")
            .bind(&block.id)
            .bind(block.x)
            .bind(block.y)
            .bind(&block.label)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

// =============================================================================
// SEEDING
// =============================================================================

/// Insert [`DEFAULT_BLOCKS`] if the store is empty. Returns how many were inserted.
///
/// # Errors
///
/// Returns the first store error encountered.
pub async fn seed_defaults(store: &dyn BlockStore) -> Result<usize, StoreError> {
    if !store.load_all().await?.is_empty() {
        return Ok(0);
    }
    for (id, x, y) in DEFAULT_BLOCKS {
        store
            .insert(&BlockRecord { id: id.to_owned(), x, y, label: default_label(id) })
            .await?;
    }
    info!(count = DEFAULT_BLOCKS.len(), "seeded default blocks");
    Ok(DEFAULT_BLOCKS.len())
}
