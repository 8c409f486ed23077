//! The canvas document: Block Store + Connection Store as one unit.
//!
//! Mutations that must touch both stores (cascading deletes, connection
//! creation against live blocks, snapshot load) live here so neither store
//! needs to know about the other.

use crate::blocks::BlockStore;
use crate::connections::{ConnectionRejected, ConnectionStore};
use crate::id::{BlockId, ConnectionId};
use crate::model::{Block, BlockPatch, Connection, ConnectionDraft, ConnectionPatch};
use crate::snapshot::Snapshot;

#[derive(Debug, Clone, Default)]
pub struct CanvasDocument {
    pub blocks: BlockStore,
    pub connections: ConnectionStore,
}

impl CanvasDocument {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a document from a snapshot. Visible connections whose endpoints
    /// are not top-level blocks are dropped.
    pub fn from_snapshot(snapshot: Snapshot) -> Self {
        let blocks: BlockStore = snapshot.blocks.into_iter().collect();
        let mut connections = ConnectionStore::new();
        for conn in snapshot.connections {
            if !conn.hidden && !(blocks.contains(conn.from_block) && blocks.contains(conn.to_block)) {
                log::warn!(
                    "dropping connection {}: endpoint {} or {} is not on the canvas",
                    conn.id,
                    conn.from_block,
                    conn.to_block
                );
                continue;
            }
            connections.insert_raw(conn);
        }
        Self {
            blocks,
            connections,
        }
    }

    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            blocks: self.blocks.iter().cloned().collect(),
            connections: self.connections.iter().cloned().collect(),
        }
    }

    // ─── Blocks ──────────────────────────────────────────────────────────

    pub fn add_block(&mut self, block: Block) -> BlockId {
        self.blocks.add(block)
    }

    pub fn update_block(&mut self, id: BlockId, patch: &BlockPatch) -> bool {
        self.blocks.update(id, patch)
    }

    /// Delete a block and every connection touching it. Deleting a stack
    /// also drops the connections of its members.
    pub fn remove_block(&mut self, id: BlockId) -> Option<Block> {
        let removed = self.blocks.remove(id)?;
        let mut gone = removed.member_ids();
        gone.push(id);
        let dropped = self.connections.remove_touching(&gone);
        log::debug!(
            "block {id} removed with {} connection(s)",
            dropped.len()
        );
        Some(removed)
    }

    // ─── Connections ─────────────────────────────────────────────────────

    /// Create a connection between two top-level blocks.
    pub fn connect(&mut self, draft: ConnectionDraft) -> Result<Connection, ConnectionRejected> {
        for block in [draft.from.block, draft.to.block] {
            if !self.blocks.contains(block) {
                return Err(ConnectionRejected::UnknownBlock(block));
            }
        }
        self.connections.add(draft)
    }

    pub fn update_connection(&mut self, id: ConnectionId, patch: &ConnectionPatch) -> bool {
        self.connections.update(id, patch)
    }

    pub fn remove_connection(&mut self, id: ConnectionId) -> Option<Connection> {
        self.connections.remove(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Anchor, BlockKind, Point, Side};

    fn block(id: &str) -> Block {
        Block::with_id(BlockId::intern(id), BlockKind::Text, Point::default(), "")
    }

    #[test]
    fn remove_block_cascades_connections() {
        let mut doc = CanvasDocument::new();
        let a = doc.add_block(block("doc_a"));
        let b = doc.add_block(block("doc_b"));
        let c = doc.add_block(block("doc_c"));
        doc.connect(ConnectionDraft::new(Anchor::new(a, Side::Right), Anchor::new(b, Side::Left)))
            .unwrap();
        doc.connect(ConnectionDraft::new(Anchor::new(b, Side::Right), Anchor::new(c, Side::Left)))
            .unwrap();

        assert!(doc.remove_block(b).is_some());
        assert!(doc.connections.is_empty());
        assert!(doc.remove_block(b).is_none());
    }

    #[test]
    fn connect_requires_live_blocks() {
        let mut doc = CanvasDocument::new();
        let a = doc.add_block(block("doc_live"));
        let ghost = BlockId::intern("doc_ghost");
        let err = doc
            .connect(ConnectionDraft::new(Anchor::new(a, Side::Right), Anchor::new(ghost, Side::Left)))
            .unwrap_err();
        assert_eq!(err, ConnectionRejected::UnknownBlock(ghost));
    }

    #[test]
    fn snapshot_load_drops_dangling_visible_connections() {
        let raw = r#"{
            "blocks": [
                {"id":"doc_s1","kind":"text","position":{"x":0,"y":0},"size":{"width":300,"height":"auto"}}
            ],
            "connections": [
                {"id":"doc_sc1","fromBlock":"doc_s1","fromSide":"right","toBlock":"doc_nowhere","toSide":"left"},
                {"id":"doc_sc2","fromBlock":"doc_s1","fromSide":"top","toBlock":"doc_inside","toSide":"left",
                 "hidden":true,"originalBlockId":"doc_inside"}
            ]
        }"#;
        let doc = CanvasDocument::from_snapshot(serde_json::from_str(raw).unwrap());
        assert_eq!(doc.blocks.len(), 1);
        assert_eq!(doc.connections.len(), 1);
        assert!(doc.connections.iter().all(|c| c.hidden));
    }
}
