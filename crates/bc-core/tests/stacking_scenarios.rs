//! Integration tests: merge → hide/synthesize → split → restore.
//!
//! Exercises the stacking engine against a full `CanvasDocument`, including
//! snapshot round-trips through JSON in between steps.

use bc_core::model::*;
use bc_core::{
    BlockId, CanvasConfig, CanvasDocument, Snapshot, find_merge_target, merge_into_stack,
    split_stack,
};
use pretty_assertions::assert_eq;

// ─── Helpers ─────────────────────────────────────────────────────────────

fn init_logs() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn text_block(doc: &mut CanvasDocument, id: &str, x: f32, y: f32) -> BlockId {
    doc.add_block(
        Block::with_id(BlockId::intern(id), BlockKind::Text, Point::new(x, y), id)
            .sized(Size::fixed(300.0, 200.0)),
    )
}

fn link(doc: &mut CanvasDocument, from: BlockId, fs: Side, to: BlockId, ts: Side) -> Connection {
    doc.connect(ConnectionDraft::new(Anchor::new(from, fs), Anchor::new(to, ts)))
        .expect("connection should be accepted")
}

fn reload(doc: &CanvasDocument) -> CanvasDocument {
    let json = doc.snapshot().to_json().expect("snapshot serializes");
    CanvasDocument::from_snapshot(Snapshot::load(&json, &CanvasConfig::default()))
}

// ─── Drop onto a neighbour ───────────────────────────────────────────────

#[test]
fn drop_near_center_creates_stack_with_target_first() {
    init_logs();
    let mut doc = CanvasDocument::new();
    let c = text_block(&mut doc, "sc2_c", 0.0, 600.0);
    let d = text_block(&mut doc, "sc2_d", 400.0, 0.0);

    // C dropped with its centre 100 units from D's centre (550, 100).
    let dropped = Bounds::new(400.0, 100.0, 300.0, 200.0);
    let candidates = doc.blocks.iter().map(|b| (b.id, b.static_bounds(200.0)));
    let target = find_merge_target(c, dropped.center(), candidates, 150.0);
    assert_eq!(target, Some(d));

    let stack = merge_into_stack(&mut doc, c, d).expect("merge");
    let block = doc.blocks.get(stack).unwrap();
    assert_eq!(block.kind, BlockKind::Stack);
    assert_ne!(stack, c);
    assert_ne!(stack, d);
    assert_eq!(block.member_ids().as_slice(), &[d, c]);
}

// ─── Hide and restore ────────────────────────────────────────────────────

#[test]
fn stacked_connection_is_hidden_then_restored_verbatim() {
    init_logs();
    let mut doc = CanvasDocument::new();
    let a = text_block(&mut doc, "sc3_a", 0.0, 0.0);
    let b = text_block(&mut doc, "sc3_b", 500.0, 0.0);
    let c = text_block(&mut doc, "sc3_c", 500.0, 400.0);
    let original = link(&mut doc, a, Side::Right, b, Side::Left);

    let s = merge_into_stack(&mut doc, b, c).expect("merge");

    let hidden = doc.connections.get(original.id).unwrap();
    assert!(hidden.hidden);
    assert_eq!(hidden.original_block_id, Some(b));
    let visible: Vec<_> = doc.connections.visible().collect();
    assert_eq!(visible.len(), 1);
    assert_eq!(visible[0].from_anchor(), Anchor::new(a, Side::Right));
    assert_eq!(visible[0].to_block, s);

    // Persist and reopen while stacked.
    let mut doc = reload(&doc);

    split_stack(&mut doc, s, 30.0);
    let restored: Vec<_> = doc.connections.iter().cloned().collect();
    assert_eq!(restored, vec![original]);
    assert!(doc.connections.touching(s).next().is_none());
}

#[test]
fn every_stack_has_at_least_two_items() {
    init_logs();
    let mut doc = CanvasDocument::new();
    let ids: Vec<BlockId> = (0..6)
        .map(|i| text_block(&mut doc, &format!("card_{i}"), i as f32 * 350.0, 0.0))
        .collect();

    let s1 = merge_into_stack(&mut doc, ids[0], ids[1]).unwrap();
    let s2 = merge_into_stack(&mut doc, ids[2], ids[3]).unwrap();
    let s3 = merge_into_stack(&mut doc, s1, s2).unwrap();
    merge_into_stack(&mut doc, ids[4], s3).unwrap();

    for block in doc.blocks.iter().filter(|b| b.is_stack()) {
        let items = block.stack_items.as_deref().unwrap_or_default();
        assert!(items.len() >= 2, "stack {} has {} item(s)", block.id, items.len());
        assert!(items.iter().all(|i| !i.is_stack()), "nested stack in {}", block.id);
    }
    assert_eq!(doc.blocks.len(), 2);
}

#[test]
fn split_after_merge_restores_block_set_and_connections() {
    init_logs();
    let mut doc = CanvasDocument::new();
    let hub = text_block(&mut doc, "rt_hub", 0.0, 0.0);
    let p = text_block(&mut doc, "rt_p", 500.0, 0.0);
    let q = text_block(&mut doc, "rt_q", 500.0, 400.0);
    let tail = text_block(&mut doc, "rt_tail", 1000.0, 0.0);
    link(&mut doc, hub, Side::Right, p, Side::Left);
    link(&mut doc, hub, Side::Bottom, q, Side::Left);
    link(&mut doc, p, Side::Bottom, q, Side::Top);
    link(&mut doc, q, Side::Right, tail, Side::Left);

    let mut before_blocks: Vec<BlockId> = doc.blocks.ids().collect();
    before_blocks.sort();
    let mut before_conns: Vec<Connection> = doc.connections.iter().cloned().collect();
    before_conns.sort_by_key(|c| c.id);

    let s = merge_into_stack(&mut doc, q, p).unwrap();
    // hub feeds both members and q feeds tail: one link per neighbour.
    assert_eq!(doc.connections.touching(s).count(), 2);
    split_stack(&mut doc, s, 30.0);

    let mut after_blocks: Vec<BlockId> = doc.blocks.ids().collect();
    after_blocks.sort();
    let mut after_conns: Vec<Connection> = doc.connections.iter().cloned().collect();
    after_conns.sort_by_key(|c| c.id);

    assert_eq!(after_blocks, before_blocks);
    assert_eq!(after_conns, before_conns);
}

#[test]
fn deleting_stack_drops_member_connections() {
    init_logs();
    let mut doc = CanvasDocument::new();
    let a = text_block(&mut doc, "del_a", 0.0, 0.0);
    let b = text_block(&mut doc, "del_b", 500.0, 0.0);
    let c = text_block(&mut doc, "del_c", 500.0, 400.0);
    link(&mut doc, a, Side::Right, b, Side::Left);
    let s = merge_into_stack(&mut doc, b, c).unwrap();

    doc.remove_block(s);
    assert!(doc.connections.is_empty());
    assert_eq!(doc.blocks.ids().collect::<Vec<_>>(), vec![a]);
}

// ─── Snapshot ────────────────────────────────────────────────────────────

#[test]
fn empty_then_malformed_snapshot_load() {
    init_logs();
    let config = CanvasConfig::default();
    let empty = CanvasDocument::from_snapshot(Snapshot::load(
        r#"{"blocks":[],"connections":[]}"#,
        &config,
    ));
    assert!(empty.blocks.is_empty());
    assert!(empty.connections.is_empty());

    let fallback = CanvasDocument::from_snapshot(Snapshot::load("}{not json", &config));
    let blocks: Vec<&Block> = fallback.blocks.iter().collect();
    assert_eq!(blocks.len(), 1);
    assert_eq!(blocks[0].kind, BlockKind::Text);
    assert_eq!(blocks[0].content, "}{not json");
}

#[test]
fn generated_ids_never_collide_with_loaded_ones() {
    init_logs();
    let raw = r#"{"blocks":[
        {"id":"block_1","kind":"text","position":{"x":0,"y":0},"size":{"width":300,"height":"auto"}},
        {"id":"block_2","kind":"text","position":{"x":400,"y":0},"size":{"width":300,"height":"auto"}}
    ]}"#;
    let mut doc = CanvasDocument::from_snapshot(Snapshot::load(raw, &CanvasConfig::default()));
    let fresh = doc.add_block(Block::new(BlockKind::Text, Point::default(), ""));
    assert_eq!(doc.blocks.len(), 3);
    assert_ne!(fresh.as_str(), "block_1");
    assert_ne!(fresh.as_str(), "block_2");
}
