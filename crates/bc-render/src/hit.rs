//! Hit testing: point → block, connection, or anchor lookup.
//!
//! Blocks are walked front-to-back (last in draw order = topmost). Anchor
//! search is brute force over every `(block, side)` pair, which is fine at
//! canvas scale.

use crate::anchor::AnchorResolver;
use crate::geometry::distance_to_path;
use crate::route::route_connection;
use bc_core::blocks::BlockStore;
use bc_core::connections::ConnectionStore;
use bc_core::id::{BlockId, ConnectionId};
use bc_core::model::{Anchor, Point, Side};

/// Find the topmost block at `(px, py)`. `None` means background.
pub fn hit_test_block(blocks: &BlockStore, resolver: &AnchorResolver<'_>, px: f32, py: f32) -> Option<BlockId> {
    let ids: Vec<BlockId> = blocks.ids().collect();
    ids.into_iter()
        .rev()
        .find(|&id| resolver.bounds(id).is_some_and(|b| b.contains(px, py)))
}

/// Find the visible connection whose curve passes within `tolerance` of
/// `p`, preferring the closest.
pub fn hit_test_connection(
    connections: &ConnectionStore,
    resolver: &AnchorResolver<'_>,
    p: Point,
    tolerance: f32,
) -> Option<ConnectionId> {
    connections
        .visible()
        .filter_map(|c| {
            let routed = route_connection(c, resolver)?;
            let d = distance_to_path(&routed.path, p);
            (d <= tolerance).then_some((c.id, d))
        })
        .min_by(|(_, a), (_, b)| a.total_cmp(b))
        .map(|(id, _)| id)
}

/// An anchor a connection draft can lock onto.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SnapTarget {
    pub anchor: Anchor,
    /// Exact anchor coordinate; the draft's endpoint jumps here.
    pub point: Point,
}

/// Nearest free, non-role-locked anchor strictly within `radius` of
/// `pointer`, on any block other than `source`.
pub fn nearest_free_anchor(
    blocks: &BlockStore,
    connections: &ConnectionStore,
    resolver: &AnchorResolver<'_>,
    pointer: Point,
    source: BlockId,
    radius: f32,
) -> Option<SnapTarget> {
    let radius_sq = radius * radius;
    let mut best: Option<(SnapTarget, f32)> = None;

    for id in blocks.ids().filter(|&id| id != source) {
        let Some(bounds) = resolver.bounds(id) else {
            continue;
        };
        for side in Side::ALL {
            let anchor = Anchor::new(id, side);
            let point = bounds.anchor(side);
            let d = point.distance_sq(pointer);
            if d >= radius_sq || best.is_some_and(|(_, bd)| bd <= d) {
                continue;
            }
            if connections.is_occupied(anchor) || connections.is_role_locked(anchor) {
                continue;
            }
            best = Some((SnapTarget { anchor, point }, d));
        }
    }
    best.map(|(target, _)| target)
}
