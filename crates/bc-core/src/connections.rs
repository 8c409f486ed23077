//! Connection Store: the edge list between block anchors.
//!
//! Enforces two invariants on `add`, counted over non-hidden connections:
//!
//! - **Anchor uniqueness**: a `(block, side)` pair is referenced by at most
//!   one connection, as source or destination.
//! - **Role-lock**: an anchor that is already a destination cannot start a
//!   new connection. This is checked first so callers can reject a gesture
//!   before it begins.
//!
//! Stacking bookkeeping (`hidden`, `original_block_id`) is managed through
//! `hide_for_stack` / `restore_for_ids` / `release_member`.

use crate::id::{BlockId, ConnectionId};
use crate::model::{Anchor, Connection, ConnectionDraft, ConnectionPatch, Side};
use smallvec::SmallVec;
use thiserror::Error;

/// Why a connection was not created. Never fatal: the gesture simply ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ConnectionRejected {
    #[error("anchor {}:{} is already a connection destination", .0.block, .0.side.as_str())]
    RoleLocked(Anchor),
    #[error("anchor {}:{} is already in use", .0.block, .0.side.as_str())]
    AnchorOccupied(Anchor),
    #[error("cannot connect block {0} to itself")]
    SelfConnection(BlockId),
    #[error("block {0} is not on the canvas")]
    UnknownBlock(BlockId),
}

#[derive(Debug, Clone, Default)]
pub struct ConnectionStore {
    connections: Vec<Connection>,
}

impl ConnectionStore {
    pub fn new() -> Self {
        Self::default()
    }

    // ─── Invariant queries ───────────────────────────────────────────────

    /// True when `anchor` is the destination of a visible connection.
    pub fn is_role_locked(&self, anchor: Anchor) -> bool {
        self.visible().any(|c| c.to_anchor() == anchor)
    }

    /// True when any visible connection starts or ends at `anchor`.
    pub fn is_occupied(&self, anchor: Anchor) -> bool {
        self.visible()
            .any(|c| c.from_anchor() == anchor || c.to_anchor() == anchor)
    }

    /// Check a prospective connection against both invariants.
    pub fn validate(&self, draft: &ConnectionDraft) -> Result<(), ConnectionRejected> {
        if self.is_role_locked(draft.from) {
            return Err(ConnectionRejected::RoleLocked(draft.from));
        }
        if draft.from.block == draft.to.block {
            return Err(ConnectionRejected::SelfConnection(draft.from.block));
        }
        if self.is_occupied(draft.from) {
            return Err(ConnectionRejected::AnchorOccupied(draft.from));
        }
        if self.is_occupied(draft.to) {
            return Err(ConnectionRejected::AnchorOccupied(draft.to));
        }
        Ok(())
    }

    // ─── Mutators ────────────────────────────────────────────────────────

    /// Create a connection with a fresh id, or reject it without mutating.
    pub fn add(&mut self, draft: ConnectionDraft) -> Result<Connection, ConnectionRejected> {
        self.validate(&draft)?;
        let (control_point1, control_point2) = draft.control_points.unzip();
        let conn = Connection {
            id: ConnectionId::generate(),
            from_block: draft.from.block,
            from_side: draft.from.side,
            to_block: draft.to.block,
            to_side: draft.to.side,
            control_point1,
            control_point2,
            color: draft.color,
            hidden: false,
            original_block_id: None,
        };
        log::debug!(
            "connection {} added: {}:{} -> {}:{}",
            conn.id,
            conn.from_block,
            conn.from_side.as_str(),
            conn.to_block,
            conn.to_side.as_str()
        );
        self.connections.push(conn.clone());
        Ok(conn)
    }

    /// Insert a connection verbatim, bypassing validation (snapshot load).
    pub fn insert_raw(&mut self, conn: Connection) {
        self.connections.retain(|c| c.id != conn.id);
        self.connections.push(conn);
    }

    pub fn update(&mut self, id: ConnectionId, patch: &ConnectionPatch) -> bool {
        let Some(conn) = self.connections.iter_mut().find(|c| c.id == id) else {
            return false;
        };
        if let Some(points) = patch.control_points {
            let (cp1, cp2) = points.unzip();
            conn.control_point1 = cp1;
            conn.control_point2 = cp2;
        }
        if let Some(color) = &patch.color {
            conn.color = color.clone();
        }
        true
    }

    pub fn remove(&mut self, id: ConnectionId) -> Option<Connection> {
        let pos = self.connections.iter().position(|c| c.id == id)?;
        Some(self.connections.remove(pos))
    }

    /// Remove every connection (hidden or not) with an endpoint in `blocks`.
    pub fn remove_touching(&mut self, blocks: &[BlockId]) -> Vec<Connection> {
        let mut removed = Vec::new();
        self.connections.retain(|c| {
            if blocks.contains(&c.from_block) || blocks.contains(&c.to_block) {
                removed.push(c.clone());
                false
            } else {
                true
            }
        });
        removed
    }

    // ─── Stacking bookkeeping ────────────────────────────────────────────

    /// Rewrite connections after `blocks` were absorbed into `stack`.
    ///
    /// Visible links from the stack to an absorbed block are dropped.
    /// Both ends inside: hidden. One end inside: hidden, plus one visible
    /// connection between the stack and that external neighbour (stack on
    /// `Right` as source, `Left` as destination). Neighbours already linked
    /// to the stack by a visible connection get nothing new.
    ///
    /// Returns the number of synthesized connections.
    pub fn hide_for_stack(&mut self, blocks: &[BlockId], stack: BlockId) -> usize {
        // A stack link to a block the stack now absorbs has no outside end.
        self.connections
            .retain(|c| c.hidden || !c.other_end(stack).is_some_and(|o| blocks.contains(&o)));

        let mut linked: SmallVec<[BlockId; 8]> = self
            .visible()
            .filter_map(|c| c.other_end(stack))
            .collect();
        let mut synthesized = Vec::new();

        for conn in self.connections.iter_mut().filter(|c| !c.hidden) {
            let from_in = blocks.contains(&conn.from_block);
            let to_in = blocks.contains(&conn.to_block);
            let (owner, neighbour) = match (from_in, to_in) {
                (false, false) => continue,
                (true, true) => (conn.from_block, None),
                (true, false) => (conn.from_block, Some(conn.to_block)),
                (false, true) => (conn.to_block, Some(conn.from_block)),
            };
            conn.hidden = true;
            conn.original_block_id = Some(owner);

            let Some(neighbour) = neighbour else { continue };
            if neighbour == stack || linked.contains(&neighbour) {
                continue;
            }
            linked.push(neighbour);
            let (from, to) = if from_in {
                (
                    Anchor::new(stack, Side::Right),
                    Anchor::new(neighbour, conn.to_side),
                )
            } else {
                (
                    Anchor::new(neighbour, conn.from_side),
                    Anchor::new(stack, Side::Left),
                )
            };
            synthesized.push(synthesize(from, to, conn.color.clone()));
        }

        let count = synthesized.len();
        log::debug!(
            "stack {stack}: absorbed {} block(s), synthesized {count} connection(s)",
            blocks.len()
        );
        self.connections.extend(synthesized);
        count
    }

    /// Un-hide every hidden connection owned by one of `ids`, clearing its
    /// bookkeeping. Returns how many were restored.
    ///
    /// An anchor freed while its block was stacked may have been claimed by
    /// a newer connection; the hidden connection on that anchor is dropped.
    pub fn restore_for_ids(&mut self, ids: &[BlockId]) -> usize {
        let owned: Vec<ConnectionId> = self
            .connections
            .iter()
            .filter(|c| c.hidden && c.original_block_id.is_some_and(|owner| ids.contains(&owner)))
            .map(|c| c.id)
            .collect();
        self.restore_checked(&owned)
    }

    fn restore_checked(&mut self, ids: &[ConnectionId]) -> usize {
        let mut restored = 0;
        for &id in ids {
            let Some(conn) = self.get(id) else { continue };
            let (from, to) = (conn.from_anchor(), conn.to_anchor());
            if let Some(taken) = [from, to].into_iter().find(|&a| self.is_occupied(a)) {
                log::warn!(
                    "dropping hidden connection {id}: anchor {}:{} was claimed while stacked",
                    taken.block,
                    taken.side.as_str()
                );
                self.remove(id);
                continue;
            }
            if let Some(conn) = self.connections.iter_mut().find(|c| c.id == id) {
                conn.hidden = false;
                conn.original_block_id = None;
                restored += 1;
            }
        }
        restored
    }

    /// Point every connection at `old` to `new` instead. Connections that
    /// become self-loops on `new` are dropped, and duplicate visible links
    /// between `new` and the same neighbour collapse to the first one.
    pub fn retarget(&mut self, old: BlockId, new: BlockId) {
        for conn in &mut self.connections {
            if conn.from_block == old {
                conn.from_block = new;
            }
            if conn.to_block == old {
                conn.to_block = new;
            }
        }
        let mut seen: SmallVec<[BlockId; 8]> = SmallVec::new();
        self.connections.retain(|c| {
            if c.from_block == new && c.to_block == new {
                return false;
            }
            if c.hidden {
                return true;
            }
            match c.other_end(new) {
                Some(neighbour) if seen.contains(&neighbour) => false,
                Some(neighbour) => {
                    seen.push(neighbour);
                    true
                }
                None => true,
            }
        });
    }

    /// Rewrite connections after `item` left `stack`, with `remaining`
    /// members still inside.
    ///
    /// - Hidden links between `item` and a remaining member stay hidden, are
    ///   re-owned by that member, and are represented by one visible link
    ///   between `item` and the stack.
    /// - Hidden links owned by `item` to anything else are restored, subject
    ///   to the same anchor check as `restore_for_ids`.
    /// - Stack links to a restored neighbour are re-derived: kept only while
    ///   some remaining member still has a hidden link to that neighbour,
    ///   and then attached to that link's anchor on the neighbour.
    pub fn release_member(&mut self, item: BlockId, remaining: &[BlockId], stack: BlockId) {
        let mut neighbours: SmallVec<[BlockId; 8]> = SmallVec::new();
        let mut owned: Vec<ConnectionId> = Vec::new();
        let mut link: Option<(Anchor, Anchor, Option<String>)> = None;

        for conn in self.connections.iter_mut().filter(|c| c.hidden) {
            let Some(other) = conn.other_end(item) else {
                continue;
            };
            if remaining.contains(&other) {
                conn.original_block_id = Some(other);
                if link.is_none() {
                    link = Some(if conn.from_block == item {
                        (
                            Anchor::new(item, conn.from_side),
                            Anchor::new(stack, Side::Left),
                            conn.color.clone(),
                        )
                    } else {
                        (
                            Anchor::new(stack, Side::Right),
                            Anchor::new(item, conn.to_side),
                            conn.color.clone(),
                        )
                    });
                }
            } else if conn.original_block_id == Some(item) {
                owned.push(conn.id);
                if !neighbours.contains(&other) {
                    neighbours.push(other);
                }
            }
        }

        self.connections
            .retain(|c| c.hidden || !c.other_end(stack).is_some_and(|n| neighbours.contains(&n)));
        self.restore_checked(&owned);

        for neighbour in neighbours {
            let backing = self.connections.iter().find(|c| {
                c.hidden
                    && c.touches(neighbour)
                    && c.original_block_id.is_some_and(|o| remaining.contains(&o))
            });
            let Some(backing) = backing else { continue };
            let (from, to) = if backing.to_block == neighbour {
                (Anchor::new(stack, Side::Right), Anchor::new(neighbour, backing.to_side))
            } else {
                (Anchor::new(neighbour, backing.from_side), Anchor::new(stack, Side::Left))
            };
            let color = backing.color.clone();
            let outside = if from.block == stack { to } else { from };
            if self.is_occupied(outside) {
                log::debug!("stack {stack} keeps no visible link to {neighbour}: anchor taken");
                continue;
            }
            self.connections.push(synthesize(from, to, color));
        }

        if let Some((from, to, color)) = link {
            let outside = if from.block == stack { to } else { from };
            let already = self.visible().any(|c| c.other_end(stack) == Some(item));
            if !already && !self.is_occupied(outside) {
                self.connections.push(synthesize(from, to, color));
            }
        }
    }

    // ─── Queries ─────────────────────────────────────────────────────────

    pub fn get(&self, id: ConnectionId) -> Option<&Connection> {
        self.connections.iter().find(|c| c.id == id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Connection> {
        self.connections.iter()
    }

    /// Connections that are currently rendered.
    pub fn visible(&self) -> impl Iterator<Item = &Connection> {
        self.connections.iter().filter(|c| !c.hidden)
    }

    /// Visible connections with an endpoint on `block`.
    pub fn touching(&self, block: BlockId) -> impl Iterator<Item = &Connection> {
        self.visible().filter(move |c| c.touches(block))
    }

    pub fn len(&self) -> usize {
        self.connections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.connections.is_empty()
    }
}

fn synthesize(from: Anchor, to: Anchor, color: Option<String>) -> Connection {
    Connection {
        id: ConnectionId::generate(),
        from_block: from.block,
        from_side: from.side,
        to_block: to.block,
        to_side: to.side,
        control_point1: None,
        control_point2: None,
        color,
        hidden: false,
        original_block_id: None,
    }
}
