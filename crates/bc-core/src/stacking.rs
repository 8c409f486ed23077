//! Stacking engine: merge blocks into stacks and take them apart again.
//!
//! A stack is a block of kind `Stack` whose `stack_items` keep the merged
//! blocks intact (ids included). Connections into absorbed blocks are hidden
//! and tagged with the block that owns them, so unstacking can restore them
//! verbatim.

use crate::document::CanvasDocument;
use crate::id::BlockId;
use crate::model::{Block, BlockKind, Point, Size};
use smallvec::SmallVec;

// ─── Merge ───────────────────────────────────────────────────────────────

/// Merge `dragged` into `target`, returning the new stack's id.
///
/// The stack always gets a fresh id and takes the target's place in draw
/// order, its position and its width. Items are the target's items (or the
/// target itself) followed by the dragged block's items (or the dragged
/// block itself). Returns `None` if either id is missing or they are equal.
pub fn merge_into_stack(
    doc: &mut CanvasDocument,
    dragged: BlockId,
    target: BlockId,
) -> Option<BlockId> {
    if dragged == target {
        return None;
    }
    let target_block = doc.blocks.get(target)?.clone();
    let dragged_block = doc.blocks.get(dragged)?.clone();
    let stack_id = BlockId::generate();

    let mut items: Vec<Block> = Vec::new();
    let mut absorbed: SmallVec<[BlockId; 2]> = SmallVec::new();
    for source in [target_block.clone(), dragged_block] {
        if source.is_stack() {
            doc.connections.retarget(source.id, stack_id);
            items.extend(source.stack_items.unwrap_or_default());
        } else {
            absorbed.push(source.id);
            items.push(source);
        }
    }

    doc.blocks.remove(dragged);
    let index = doc.blocks.index_of(target).unwrap_or(doc.blocks.len());
    doc.blocks.remove(target);

    let stack = Block {
        id: stack_id,
        kind: BlockKind::Stack,
        position: target_block.position,
        size: Size::auto(target_block.size.width),
        content: String::new(),
        color_tag: None,
        stack_items: Some(items),
    };
    doc.blocks.insert_at(index, stack);
    doc.connections.hide_for_stack(&absorbed, stack_id);

    log::debug!("merged {dragged} into {target} as stack {stack_id}");
    Some(stack_id)
}

// ─── Split ───────────────────────────────────────────────────────────────

/// Dissolve a stack back into its items.
///
/// Connections touching the stack are removed, hidden connections owned by
/// the re-emerging items are restored, and items are laid out from the
/// stack's position with a cascading `offset` per item. Returns the items
/// (empty when `stack` is not a stack on the canvas).
pub fn split_stack(doc: &mut CanvasDocument, stack: BlockId, offset: f32) -> Vec<Block> {
    let Some(index) = doc.blocks.index_of(stack) else {
        return Vec::new();
    };
    if doc.blocks.get(stack).is_none_or(|b| !b.is_stack()) {
        return Vec::new();
    }
    let Some(stack_block) = doc.blocks.remove(stack) else {
        return Vec::new();
    };
    let origin = stack_block.position;
    let mut items = stack_block.stack_items.unwrap_or_default();
    let ids: Vec<BlockId> = items.iter().map(|b| b.id).collect();

    doc.connections.remove_touching(&[stack]);
    for (i, item) in items.iter_mut().enumerate() {
        let step = i as f32 * offset;
        item.position = origin.offset(step, step);
        doc.blocks.insert_at(index + i, item.clone());
    }
    let restored = doc.connections.restore_for_ids(&ids);

    log::debug!(
        "split stack {stack} into {} block(s), restored {restored} connection(s)",
        items.len()
    );
    items
}

// ─── Extract ─────────────────────────────────────────────────────────────

/// Pull a single item out of a stack and drop it at `position`.
///
/// If fewer than two items would remain, the stack dissolves: a lone
/// remaining item takes the stack's place and position, and all owned
/// hidden connections are restored. Otherwise the stack keeps the rest and
/// only the item's connections are rewritten.
pub fn extract_from_stack(
    doc: &mut CanvasDocument,
    stack: BlockId,
    item: BlockId,
    position: Point,
) -> Option<Block> {
    let stack_block = doc.blocks.get(stack).filter(|b| b.is_stack())?;
    let items = stack_block.stack_items.as_deref().unwrap_or_default();
    let pos = items.iter().position(|b| b.id == item)?;
    let mut remaining = items.to_vec();
    let mut extracted = remaining.remove(pos);
    extracted.position = position;

    if remaining.len() <= 1 {
        let index = doc.blocks.index_of(stack).unwrap_or(doc.blocks.len());
        let origin = stack_block.position;
        let mut ids: Vec<BlockId> = remaining.iter().map(|b| b.id).collect();
        ids.push(item);

        doc.blocks.remove(stack);
        doc.connections.remove_touching(&[stack]);
        if let Some(mut last) = remaining.pop() {
            last.position = origin;
            doc.blocks.insert_at(index, last);
        }
        doc.blocks.add(extracted.clone());
        doc.connections.restore_for_ids(&ids);
        log::debug!("extracted {item} from {stack}; stack dissolved");
        return Some(extracted);
    }

    let remaining_ids: Vec<BlockId> = remaining.iter().map(|b| b.id).collect();
    if let Some(block) = doc.blocks.get_mut(stack) {
        block.stack_items = Some(remaining);
    }
    doc.blocks.add(extracted.clone());
    doc.connections.release_member(item, &remaining_ids, stack);
    log::debug!(
        "extracted {item} from {stack}; {} item(s) remain",
        remaining_ids.len()
    );
    Some(extracted)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Anchor, ConnectionDraft, Side};

    fn place(doc: &mut CanvasDocument, id: &str, x: f32) -> BlockId {
        doc.add_block(Block::with_id(
            BlockId::intern(id),
            BlockKind::Text,
            Point::new(x, 0.0),
            id,
        ))
    }

    #[test]
    fn merge_appends_dragged_after_target() {
        let mut doc = CanvasDocument::new();
        let c = place(&mut doc, "st_c", 0.0);
        let d = place(&mut doc, "st_d", 400.0);
        let stack = merge_into_stack(&mut doc, c, d).unwrap();

        assert_ne!(stack, c);
        assert_ne!(stack, d);
        let block = doc.blocks.get(stack).unwrap();
        assert_eq!(block.kind, BlockKind::Stack);
        assert_eq!(block.position, Point::new(400.0, 0.0));
        assert_eq!(block.member_ids().as_slice(), &[d, c]);
        assert_eq!(doc.blocks.len(), 1);
    }

    #[test]
    fn merge_into_existing_stack_flattens() {
        let mut doc = CanvasDocument::new();
        let a = place(&mut doc, "st_fa", 0.0);
        let b = place(&mut doc, "st_fb", 400.0);
        let c = place(&mut doc, "st_fc", 800.0);
        let s1 = merge_into_stack(&mut doc, a, b).unwrap();
        let s2 = merge_into_stack(&mut doc, c, s1).unwrap();

        assert_ne!(s1, s2);
        assert!(doc.blocks.get(s1).is_none());
        let stack = doc.blocks.get(s2).unwrap();
        assert_eq!(stack.member_ids().as_slice(), &[b, a, c]);
    }

    #[test]
    fn merge_missing_ids_is_noop() {
        let mut doc = CanvasDocument::new();
        let a = place(&mut doc, "st_only", 0.0);
        assert!(merge_into_stack(&mut doc, a, BlockId::intern("st_missing")).is_none());
        assert!(merge_into_stack(&mut doc, a, a).is_none());
        assert_eq!(doc.blocks.len(), 1);
    }

    #[test]
    fn split_cascades_positions() {
        let mut doc = CanvasDocument::new();
        let a = place(&mut doc, "st_pa", 0.0);
        let b = place(&mut doc, "st_pb", 100.0);
        let s = merge_into_stack(&mut doc, a, b).unwrap();
        let items = split_stack(&mut doc, s, 30.0);
        assert_eq!(items.len(), 2);
        assert_eq!(doc.blocks.get(b).unwrap().position, Point::new(100.0, 0.0));
        assert_eq!(doc.blocks.get(a).unwrap().position, Point::new(130.0, 30.0));
    }

    #[test]
    fn split_non_stack_is_noop() {
        let mut doc = CanvasDocument::new();
        let a = place(&mut doc, "st_plain", 0.0);
        assert!(split_stack(&mut doc, a, 30.0).is_empty());
        assert!(split_stack(&mut doc, BlockId::intern("st_nothing"), 30.0).is_empty());
        assert!(doc.blocks.contains(a));
    }

    #[test]
    fn extract_leaving_one_item_dissolves() {
        let mut doc = CanvasDocument::new();
        let x = place(&mut doc, "st_ex", -500.0);
        let a = place(&mut doc, "st_ea", 0.0);
        let b = place(&mut doc, "st_eb", 400.0);
        doc.connect(ConnectionDraft::new(Anchor::new(x, Side::Right), Anchor::new(a, Side::Left)))
            .unwrap();
        let s = merge_into_stack(&mut doc, a, b).unwrap();

        let out = extract_from_stack(&mut doc, s, a, Point::new(900.0, 900.0)).unwrap();
        assert_eq!(out.id, a);
        assert!(doc.blocks.get(s).is_none());
        assert_eq!(doc.blocks.get(b).unwrap().position, Point::new(400.0, 0.0));
        assert_eq!(doc.blocks.get(a).unwrap().position, Point::new(900.0, 900.0));
        let visible: Vec<_> = doc.connections.visible().collect();
        assert_eq!(visible.len(), 1);
        assert_eq!(visible[0].to_block, a);
        assert_eq!(doc.connections.len(), 1);
    }

    #[test]
    fn extract_from_larger_stack_rewrites_links() {
        let mut doc = CanvasDocument::new();
        let x = place(&mut doc, "st_lx", -500.0);
        let a = place(&mut doc, "st_la", 0.0);
        let b = place(&mut doc, "st_lb", 400.0);
        let c = place(&mut doc, "st_lc", 800.0);
        // x -> a (external), a -> b (becomes internal)
        doc.connect(ConnectionDraft::new(Anchor::new(x, Side::Right), Anchor::new(a, Side::Left)))
            .unwrap();
        doc.connect(ConnectionDraft::new(Anchor::new(a, Side::Right), Anchor::new(b, Side::Left)))
            .unwrap();
        let s1 = merge_into_stack(&mut doc, a, b).unwrap();
        let s = merge_into_stack(&mut doc, c, s1).unwrap();

        extract_from_stack(&mut doc, s, a, Point::new(0.0, 600.0)).unwrap();

        let stack = doc.blocks.get(s).unwrap();
        assert_eq!(stack.member_ids().as_slice(), &[b, c]);
        // x -> a restored; x -> stack dropped; a -> stack synthesized for the hidden a -> b.
        let visible: Vec<_> = doc.connections.visible().collect();
        assert_eq!(visible.len(), 2);
        assert!(visible.iter().any(|c| c.from_block == x && c.to_block == a));
        assert!(visible.iter().any(|c| c.from_block == a && c.to_block == s));
        let hidden: Vec<_> = doc.connections.iter().filter(|c| c.hidden).collect();
        assert_eq!(hidden.len(), 1);
        assert_eq!(hidden[0].original_block_id, Some(b));
    }

    #[test]
    fn extract_unknown_item_is_noop() {
        let mut doc = CanvasDocument::new();
        let a = place(&mut doc, "st_ua", 0.0);
        let b = place(&mut doc, "st_ub", 100.0);
        let s = merge_into_stack(&mut doc, a, b).unwrap();
        assert!(extract_from_stack(&mut doc, s, BlockId::intern("st_unone"), Point::default()).is_none());
        assert!(extract_from_stack(&mut doc, a, b, Point::default()).is_none());
        assert_eq!(doc.blocks.len(), 1);
    }
}
