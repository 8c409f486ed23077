//! Block Store: the ordered collection of top-level blocks.
//!
//! Order is draw order (last = topmost). Every mutator is total: operations
//! on ids that are not present do nothing and report that through their
//! return value. Stack members are not top-level; they live inside their
//! stack's `stack_items`.

use crate::id::BlockId;
use crate::model::{Block, BlockPatch};
use indexmap::IndexMap;

#[derive(Debug, Clone, Default)]
pub struct BlockStore {
    blocks: IndexMap<BlockId, Block>,
}

impl BlockStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a block on top of the draw order. A block with the same id is
    /// replaced in place.
    pub fn add(&mut self, block: Block) -> BlockId {
        let id = block.id;
        if self.blocks.insert(id, block).is_some() {
            log::debug!("block {id} replaced");
        } else {
            log::debug!("block {id} added");
        }
        id
    }

    /// Insert at a draw-order position (clamped to the end).
    pub fn insert_at(&mut self, index: usize, block: Block) -> BlockId {
        let id = block.id;
        let index = index.min(self.blocks.len());
        self.blocks.shift_insert(index, id, block);
        id
    }

    /// Apply a partial update. Returns `false` when `id` is not a top-level block.
    pub fn update(&mut self, id: BlockId, patch: &BlockPatch) -> bool {
        match self.blocks.get_mut(&id) {
            Some(block) => {
                block.apply(patch);
                true
            }
            None => false,
        }
    }

    /// Remove a block, preserving the order of the rest.
    ///
    /// Connections are not touched here; `CanvasDocument::remove_block`
    /// performs the cascade.
    pub fn remove(&mut self, id: BlockId) -> Option<Block> {
        self.blocks.shift_remove(&id)
    }

    pub fn get(&self, id: BlockId) -> Option<&Block> {
        self.blocks.get(&id)
    }

    pub fn get_mut(&mut self, id: BlockId) -> Option<&mut Block> {
        self.blocks.get_mut(&id)
    }

    pub fn contains(&self, id: BlockId) -> bool {
        self.blocks.contains_key(&id)
    }

    /// Draw-order position of a block.
    pub fn index_of(&self, id: BlockId) -> Option<usize> {
        self.blocks.get_index_of(&id)
    }

    /// Move a block to the top of the draw order. Returns true if the order changed.
    pub fn bring_to_front(&mut self, id: BlockId) -> bool {
        let Some(index) = self.blocks.get_index_of(&id) else {
            return false;
        };
        let last = self.blocks.len() - 1;
        if index == last {
            return false;
        }
        self.blocks.move_index(index, last);
        true
    }

    pub fn iter(&self) -> impl Iterator<Item = &Block> {
        self.blocks.values()
    }

    pub fn ids(&self) -> impl Iterator<Item = BlockId> + '_ {
        self.blocks.keys().copied()
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }
}

impl FromIterator<Block> for BlockStore {
    fn from_iter<I: IntoIterator<Item = Block>>(iter: I) -> Self {
        let mut store = Self::new();
        for block in iter {
            store.add(block);
        }
        store
    }
}
