//! Local render state: the participant's mirror of every block.
//!
//! `DocStore` is the single source of truth for what gets drawn. It is owned
//! by one [`crate::engine::EngineCore`] and mutated only through it: by the
//! drag controller, by throw steps, and by reconciled hub broadcasts.
//! Position writes always replace both coordinates at once.

#[cfg(test)]
#[path = "doc_test.rs"]
mod doc_test;

use std::collections::HashMap;

use frames::BlockRecord;
use serde::{Deserialize, Serialize};

use crate::geom::Point;

/// Hub-assigned block identifier. Opaque; never reassigned.
pub type BlockId = String;

/// A block as the participant currently believes it to be.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Block {
    pub id: BlockId,
    pub x: f64,
    pub y: f64,
    pub label: String,
}

impl Block {
    #[must_use]
    pub fn position(&self) -> Point {
        Point::new(self.x, self.y)
    }
}

impl From<BlockRecord> for Block {
    fn from(record: BlockRecord) -> Self {
        Self { id: record.id, x: record.x, y: record.y, label: record.label }
    }
}

/// In-memory store of blocks keyed by id.
#[derive(Debug, Default)]
pub struct DocStore {
    blocks: HashMap<BlockId, Block>,
}

impl DocStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a block unless its id is already present. Returns whether it was inserted.
    pub fn insert_if_absent(&mut self, block: Block) -> bool {
        if self.blocks.contains_key(&block.id) {
            return false;
        }
        self.blocks.insert(block.id.clone(), block);
        true
    }

    /// Insert or replace a block.
    pub fn upsert(&mut self, block: Block) {
        self.blocks.insert(block.id.clone(), block);
    }

    /// Replace a block's position. Returns false if the block is unknown.
    pub fn set_position(&mut self, id: &str, p: Point) -> bool {
        let Some(block) = self.blocks.get_mut(id) else {
            return false;
        };
        block.x = p.x;
        block.y = p.y;
        true
    }

    #[must_use]
    pub fn get(&self, id: &str) -> Option<&Block> {
        self.blocks.get(id)
    }

    #[must_use]
    pub fn position(&self, id: &str) -> Option<Point> {
        self.blocks.get(id).map(Block::position)
    }

    #[must_use]
    pub fn contains(&self, id: &str) -> bool {
        self.blocks.contains_key(id)
    }

    /// Replace all blocks with a full snapshot.
    pub fn load_snapshot(&mut self, blocks: impl IntoIterator<Item = Block>) {
        self.blocks.clear();
        for block in blocks {
            self.blocks.insert(block.id.clone(), block);
        }
    }

    /// All blocks in draw order. Ids are creation timestamps, so shorter ids
    /// sort first and equal-length ids compare lexically.
    #[must_use]
    pub fn sorted_blocks(&self) -> Vec<&Block> {
        let mut blocks: Vec<&Block> = self.blocks.values().collect();
        blocks.sort_by(|a, b| a.id.len().cmp(&b.id.len()).then_with(|| a.id.cmp(&b.id)));
        blocks
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }
}
