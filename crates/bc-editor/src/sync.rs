//! Host boundary: the canvas engine.
//!
//! The engine owns the authoritative `CanvasDocument` together with the
//! per-gesture session state, and is the only place that decides when a
//! gesture becomes a structural mutation:
//!
//! - **Continuous feedback** (block drag, control-point drag, connection
//!   draft) goes to session state and the paint layer, never the document.
//! - **Structural mutations** (`CanvasMutation`s, drag release, connection
//!   release, handle release) hit the document once, bump the revision so
//!   the host re-renders, grow the canvas extent, and schedule a commit.

use crate::connect::{ConnectionGesture, DraftPreview};
use crate::drag::{DragSession, Handle, HandleDrag};
use crate::live::{LiveRenderLoop, LoopControl};
use crate::schedule::CommitScheduler;
use crate::shortcuts::{ShortcutAction, ShortcutMap};
use bc_core::config::CanvasConfig;
use bc_core::connections::ConnectionRejected;
use bc_core::document::CanvasDocument;
use bc_core::id::{BlockId, ConnectionId};
use bc_core::layout::{Viewport, expand_to_fit, find_merge_target, snap_to_column};
use bc_core::model::*;
use bc_core::paste::{PastePayload, block_from_paste};
use bc_core::snapshot::Snapshot;
use bc_core::stacking::{extract_from_stack, merge_into_stack, split_stack};
use bc_render::anchor::{AnchorResolver, Measurer};
use bc_render::hit::{hit_test_block, hit_test_connection};
use bc_render::paint::PaintLayer;
use bc_render::route::route_connection;

/// A structural change requested by the host.
#[derive(Debug, Clone, PartialEq)]
pub enum CanvasMutation {
    AddBlock {
        block: Box<Block>,
    },
    UpdateBlock {
        id: BlockId,
        patch: BlockPatch,
    },
    RemoveBlock {
        id: BlockId,
    },
    Connect {
        draft: ConnectionDraft,
    },
    UpdateConnection {
        id: ConnectionId,
        patch: ConnectionPatch,
    },
    RemoveConnection {
        id: ConnectionId,
    },
    Merge {
        dragged: BlockId,
        target: BlockId,
    },
    Split {
        stack: BlockId,
    },
    /// Pull one item out of a stack and drop it at `position`.
    Extract {
        stack: BlockId,
        item: BlockId,
        position: Point,
    },
    BringToFront {
        id: BlockId,
    },
    /// Create a block from a pasted or dropped payload.
    Paste {
        payload: PastePayload,
        position: Point,
    },
}

/// What a mutation produced.
#[derive(Debug, Clone, PartialEq)]
pub enum Applied {
    /// The mutation referred to something missing; nothing changed.
    Nothing,
    Block(BlockId),
    Blocks(Vec<BlockId>),
    Connection(ConnectionId),
}

/// How a block drag was resolved on release.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DropOutcome {
    Merged { stack: BlockId },
    Moved { block: BlockId, position: Point },
}

pub struct CanvasEngine {
    /// The document (single source of truth).
    pub doc: CanvasDocument,
    pub config: CanvasConfig,
    /// Scrollable extent of the virtual canvas.
    pub extent: Viewport,
    pub selected: Option<BlockId>,
    session: DragSession,
    handle: Option<HandleDrag>,
    gesture: ConnectionGesture,
    live: LiveRenderLoop,
    scheduler: CommitScheduler,
    /// Bumped on every structural mutation.
    revision: u64,
}

impl CanvasEngine {
    pub fn new(config: CanvasConfig) -> Self {
        Self::from_document(CanvasDocument::new(), config)
    }

    /// Open whatever the host persisted. Never fails; see `Snapshot::load`.
    pub fn from_snapshot_text(raw: &str, config: CanvasConfig) -> Self {
        let snapshot = Snapshot::load(raw, &config);
        Self::from_document(CanvasDocument::from_snapshot(snapshot), config)
    }

    fn from_document(doc: CanvasDocument, config: CanvasConfig) -> Self {
        let extent = expand_to_fit(
            Viewport::default(),
            doc.blocks.iter().map(|b| b.static_bounds(config.auto_height_estimate)),
            &config,
        );
        Self {
            doc,
            extent,
            selected: None,
            session: DragSession::default(),
            handle: None,
            gesture: ConnectionGesture::new(&config),
            live: LiveRenderLoop::new(&config),
            scheduler: CommitScheduler::new(config.commit_debounce_ms),
            revision: 0,
            config,
        }
    }

    // ─── Structural mutations ────────────────────────────────────────────

    /// Apply a host mutation. Only connection creation can be rejected.
    pub fn apply(&mut self, mutation: CanvasMutation, now_ms: f64) -> Result<Applied, ConnectionRejected> {
        let applied = match mutation {
            CanvasMutation::AddBlock { block } => Applied::Block(self.doc.add_block(*block)),
            CanvasMutation::UpdateBlock { id, patch } => {
                if self.doc.update_block(id, &patch) {
                    Applied::Block(id)
                } else {
                    Applied::Nothing
                }
            }
            CanvasMutation::RemoveBlock { id } => match self.doc.remove_block(id) {
                Some(_) => {
                    if self.selected == Some(id) {
                        self.selected = None;
                    }
                    Applied::Block(id)
                }
                None => Applied::Nothing,
            },
            CanvasMutation::Connect { draft } => Applied::Connection(self.doc.connect(draft)?.id),
            CanvasMutation::UpdateConnection { id, patch } => {
                if self.doc.update_connection(id, &patch) {
                    Applied::Connection(id)
                } else {
                    Applied::Nothing
                }
            }
            CanvasMutation::RemoveConnection { id } => match self.doc.remove_connection(id) {
                Some(_) => Applied::Connection(id),
                None => Applied::Nothing,
            },
            CanvasMutation::Merge { dragged, target } => {
                match merge_into_stack(&mut self.doc, dragged, target) {
                    Some(stack) => Applied::Block(stack),
                    None => Applied::Nothing,
                }
            }
            CanvasMutation::Split { stack } => {
                let items = split_stack(&mut self.doc, stack, self.config.stack_cascade_offset);
                if items.is_empty() {
                    Applied::Nothing
                } else {
                    Applied::Blocks(items.iter().map(|b| b.id).collect())
                }
            }
            CanvasMutation::Extract {
                stack,
                item,
                position,
            } => match extract_from_stack(&mut self.doc, stack, item, position) {
                Some(block) => Applied::Block(block.id),
                None => Applied::Nothing,
            },
            CanvasMutation::BringToFront { id } => {
                if self.doc.blocks.bring_to_front(id) {
                    Applied::Block(id)
                } else {
                    Applied::Nothing
                }
            }
            CanvasMutation::Paste { payload, position } => {
                Applied::Block(self.doc.add_block(block_from_paste(payload, position)))
            }
        };
        if applied != Applied::Nothing {
            self.structural_change(now_ms);
        }
        Ok(applied)
    }

    fn structural_change(&mut self, now_ms: f64) {
        self.revision += 1;
        self.extent = expand_to_fit(
            self.extent,
            self.doc
                .blocks
                .iter()
                .map(|b| b.static_bounds(self.config.auto_height_estimate)),
            &self.config,
        );
        self.scheduler.schedule_commit(now_ms);
    }

    /// Structural revision; the host re-renders when it changes.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    // ─── Block drag ──────────────────────────────────────────────────────

    /// Start moving `block`, grabbed at `pointer`. Selects it; writes no
    /// geometry. Any drag already in progress is replaced.
    pub fn begin_drag(&mut self, block: BlockId, pointer: Point) -> bool {
        let Some(origin) = self.doc.blocks.get(block).map(|b| b.position) else {
            return false;
        };
        self.handle = None;
        self.session.begin(block, origin, pointer);
        self.selected = Some(block);
        true
    }

    /// Follow the pointer; returns the block's live origin for the host to
    /// move its node to.
    pub fn drag_to(&mut self, pointer: Point) -> Option<Point> {
        self.session.move_to(pointer)
    }

    /// Run one frame of the live render loop for whatever is being dragged.
    pub fn frame(&mut self, measurer: &dyn Measurer, paint: &mut dyn PaintLayer) -> LoopControl {
        match &self.handle {
            Some(handle) => self.live.handle_frame(handle, &self.doc, measurer, paint),
            None => self.live.frame(&self.session, &self.doc, measurer, paint),
        }
    }

    /// Pointer-up: merge into the nearest block within `merge_radius`, or
    /// commit a plain (column-snapped) move and raise the block.
    pub fn end_drag(&mut self, now_ms: f64, measurer: &dyn Measurer) -> Option<DropOutcome> {
        let release = self.session.end()?;
        let target = {
            let resolver = AnchorResolver::new(&self.doc.blocks, measurer, self.config.auto_height_estimate)
                .with_moved(release.block, release.position);
            let dropped = resolver.bounds(release.block)?;
            let candidates = self
                .doc
                .blocks
                .ids()
                .filter_map(|id| resolver.bounds(id).map(|b| (id, b)));
            find_merge_target(release.block, dropped.center(), candidates, self.config.merge_radius)
        };

        let outcome = match target.and_then(|t| merge_into_stack(&mut self.doc, release.block, t)) {
            Some(stack) => {
                self.selected = Some(stack);
                DropOutcome::Merged { stack }
            }
            None => {
                let position = Point::new(
                    snap_to_column(release.position.x, &self.config),
                    release.position.y,
                );
                self.doc
                    .update_block(release.block, &BlockPatch::position(position));
                self.doc.blocks.bring_to_front(release.block);
                DropOutcome::Moved {
                    block: release.block,
                    position,
                }
            }
        };
        log::debug!("drag of {} ended: {outcome:?}", release.block);
        self.structural_change(now_ms);
        Some(outcome)
    }

    pub fn is_dragging(&self) -> bool {
        self.session.is_dragging()
    }

    // ─── Control-point handles ───────────────────────────────────────────

    /// Start dragging one control point of a visible connection. Unstored
    /// control points start from their routed defaults.
    pub fn begin_handle_drag(&mut self, connection: ConnectionId, handle: Handle, measurer: &dyn Measurer) -> bool {
        let Some(conn) = self.doc.connections.get(connection).filter(|c| !c.hidden) else {
            return false;
        };
        let resolver = AnchorResolver::new(&self.doc.blocks, measurer, self.config.auto_height_estimate);
        let Some(routed) = route_connection(conn, &resolver) else {
            return false;
        };
        self.session.cancel();
        self.handle = Some(HandleDrag {
            connection,
            handle,
            control_points: routed.control_points,
        });
        true
    }

    pub fn handle_drag_to(&mut self, point: Point) -> bool {
        match &mut self.handle {
            Some(handle) => {
                handle.move_to(point);
                true
            }
            None => false,
        }
    }

    /// Commit the dragged control points to the connection.
    pub fn end_handle_drag(&mut self, now_ms: f64) -> bool {
        let Some(handle) = self.handle.take() else {
            return false;
        };
        let patch = ConnectionPatch {
            control_points: Some(Some(handle.control_points)),
            ..Default::default()
        };
        let updated = self.doc.update_connection(handle.connection, &patch);
        if updated {
            self.structural_change(now_ms);
        }
        updated
    }

    // ─── Connection gesture ──────────────────────────────────────────────

    pub fn begin_connection(&mut self, from: Anchor) -> Result<(), ConnectionRejected> {
        self.gesture.begin(from, &self.doc)
    }

    pub fn connection_move(&mut self, pointer: Point, now_ms: f64, measurer: &dyn Measurer) -> Option<DraftPreview> {
        self.gesture.pointer_move(pointer, now_ms, &self.doc, measurer)
    }

    pub fn release_connection(
        &mut self,
        now_ms: f64,
        measurer: &dyn Measurer,
    ) -> Result<Option<Connection>, ConnectionRejected> {
        let created = self.gesture.release(&mut self.doc, measurer)?;
        if created.is_some() {
            self.structural_change(now_ms);
        }
        Ok(created)
    }

    /// Abandon whatever gesture is in progress. Nothing is committed.
    pub fn cancel(&mut self) {
        self.session.cancel();
        self.handle = None;
        self.gesture.cancel();
    }

    // ─── Hit testing ─────────────────────────────────────────────────────

    pub fn block_at(&self, point: Point, measurer: &dyn Measurer) -> Option<BlockId> {
        let resolver = AnchorResolver::new(&self.doc.blocks, measurer, self.config.auto_height_estimate);
        hit_test_block(&self.doc.blocks, &resolver, point.x, point.y)
    }

    pub fn connection_at(&self, point: Point, tolerance: f32, measurer: &dyn Measurer) -> Option<ConnectionId> {
        let resolver = AnchorResolver::new(&self.doc.blocks, measurer, self.config.auto_height_estimate);
        hit_test_connection(&self.doc.connections, &resolver, point, tolerance)
    }

    // ─── Keyboard ────────────────────────────────────────────────────────

    /// Resolve and perform a shortcut. Returns the action taken, if any.
    pub fn handle_key(
        &mut self,
        key: &str,
        ctrl: bool,
        shift: bool,
        alt: bool,
        meta: bool,
        now_ms: f64,
    ) -> Option<ShortcutAction> {
        let action = ShortcutMap::resolve(key, ctrl, shift, alt, meta)?;
        match action {
            ShortcutAction::Cancel => self.cancel(),
            ShortcutAction::Delete => {
                let id = self.selected?;
                self.apply(CanvasMutation::RemoveBlock { id }, now_ms).ok()?;
            }
            ShortcutAction::Unstack => {
                let stack = self.selected?;
                match self.apply(CanvasMutation::Split { stack }, now_ms) {
                    Ok(Applied::Blocks(_)) => self.selected = None,
                    _ => return None,
                }
            }
            ShortcutAction::BringToFront => {
                let id = self.selected?;
                self.apply(CanvasMutation::BringToFront { id }, now_ms).ok()?;
            }
        }
        Some(action)
    }

    // ─── Persistence ─────────────────────────────────────────────────────

    /// The snapshot to hand to persistence once the debounce window has
    /// elapsed since the last structural mutation.
    pub fn poll_commit(&mut self, now_ms: f64) -> Option<Snapshot> {
        self.scheduler.poll(now_ms).then(|| self.doc.snapshot())
    }

    /// Emit any pending commit immediately.
    pub fn flush_commit(&mut self) -> Option<Snapshot> {
        self.scheduler.flush().then(|| self.doc.snapshot())
    }

    pub fn snapshot(&self) -> Snapshot {
        self.doc.snapshot()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bc_render::anchor::StaticLayout;
    use bc_render::paint::RecordingLayer;
    use pretty_assertions::assert_eq;

    fn engine_with(blocks: &[(&str, f32, f32)]) -> CanvasEngine {
        let mut engine = CanvasEngine::new(CanvasConfig::default());
        for (id, x, y) in blocks {
            engine
                .apply(
                    CanvasMutation::AddBlock {
                        block: Box::new(
                            Block::with_id(BlockId::intern(id), BlockKind::Text, Point::new(*x, *y), *id)
                                .sized(Size::fixed(300.0, 200.0)),
                        ),
                    },
                    0.0,
                )
                .unwrap();
        }
        engine
    }

    #[test]
    fn drag_commits_once_at_release() {
        let mut engine = engine_with(&[("eng_a", 0.0, 0.0)]);
        let a = BlockId::intern("eng_a");
        let before = engine.revision();
        assert!(engine.begin_drag(a, Point::new(10.0, 10.0)));
        for step in 1..=20 {
            engine.drag_to(Point::new(10.0 + step as f32 * 20.0, 10.0));
        }
        assert_eq!(engine.revision(), before);
        assert_eq!(engine.doc.blocks.get(a).unwrap().position, Point::new(0.0, 0.0));

        let outcome = engine.end_drag(100.0, &StaticLayout).unwrap();
        assert_eq!(
            outcome,
            DropOutcome::Moved {
                block: a,
                position: Point::new(400.0, 0.0)
            }
        );
        assert_eq!(engine.revision(), before + 1);
    }

    #[test]
    fn drop_near_column_line_snaps() {
        let mut engine = engine_with(&[("eng_col", 0.0, 0.0)]);
        let id = BlockId::intern("eng_col");
        engine.begin_drag(id, Point::new(0.0, 0.0));
        engine.drag_to(Point::new(380.0, 50.0));
        let outcome = engine.end_drag(0.0, &StaticLayout).unwrap();
        assert_eq!(
            outcome,
            DropOutcome::Moved {
                block: id,
                position: Point::new(348.0, 50.0)
            }
        );
    }

    #[test]
    fn cancelled_drag_does_not_commit() {
        let mut engine = engine_with(&[("eng_c", 0.0, 0.0)]);
        let id = BlockId::intern("eng_c");
        engine.begin_drag(id, Point::new(0.0, 0.0));
        engine.drag_to(Point::new(500.0, 500.0));
        assert_eq!(
            engine.handle_key("Escape", false, false, false, false, 0.0),
            Some(ShortcutAction::Cancel)
        );
        assert!(engine.end_drag(0.0, &StaticLayout).is_none());
        assert_eq!(engine.doc.blocks.get(id).unwrap().position, Point::new(0.0, 0.0));
    }

    #[test]
    fn frame_paints_without_touching_revision() {
        let mut engine = engine_with(&[("eng_fa", 0.0, 0.0), ("eng_fb", 600.0, 0.0)]);
        let a = BlockId::intern("eng_fa");
        let b = BlockId::intern("eng_fb");
        let conn = engine
            .apply(
                CanvasMutation::Connect {
                    draft: ConnectionDraft::new(Anchor::new(a, Side::Right), Anchor::new(b, Side::Left)),
                },
                0.0,
            )
            .unwrap();
        let Applied::Connection(conn) = conn else {
            panic!("expected a connection");
        };
        let revision = engine.revision();
        let mut paint = RecordingLayer::new();
        engine.begin_drag(a, Point::new(0.0, 0.0));
        for i in 0..5 {
            engine.drag_to(Point::new(0.0, i as f32 * 10.0));
            assert_eq!(engine.frame(&StaticLayout, &mut paint), LoopControl::Continue);
        }
        assert_eq!(paint.writes(), 5);
        assert!(paint.path(conn).is_some());
        assert_eq!(engine.revision(), revision);
    }

    #[test]
    fn handle_drag_commits_control_points() {
        let mut engine = engine_with(&[("eng_ha", 0.0, 0.0), ("eng_hb", 600.0, 0.0)]);
        let a = BlockId::intern("eng_ha");
        let b = BlockId::intern("eng_hb");
        let Ok(Applied::Connection(conn)) = engine.apply(
            CanvasMutation::Connect {
                draft: ConnectionDraft::new(Anchor::new(a, Side::Right), Anchor::new(b, Side::Left)),
            },
            0.0,
        ) else {
            panic!("expected a connection");
        };

        assert!(engine.begin_handle_drag(conn, Handle::Second, &StaticLayout));
        assert!(engine.handle_drag_to(Point::new(500.0, 300.0)));
        let mut paint = RecordingLayer::new();
        engine.frame(&StaticLayout, &mut paint);
        assert!(paint.path(conn).is_some());
        assert!(engine.end_handle_drag(10.0));

        let stored = engine.doc.connections.get(conn).unwrap();
        assert_eq!(stored.control_point2, Some(Point::new(500.0, 300.0)));
        assert!(stored.control_point1.is_some());
    }

    #[test]
    fn delete_key_removes_selection() {
        let mut engine = engine_with(&[("eng_d", 0.0, 0.0)]);
        let id = BlockId::intern("eng_d");
        engine.begin_drag(id, Point::new(0.0, 0.0));
        engine.end_drag(0.0, &StaticLayout);
        assert_eq!(
            engine.handle_key("Delete", false, false, false, false, 0.0),
            Some(ShortcutAction::Delete)
        );
        assert!(engine.doc.blocks.is_empty());
        assert_eq!(engine.selected, None);
    }

    #[test]
    fn unstack_on_plain_block_keeps_selection() {
        let mut engine = engine_with(&[("eng_u", 0.0, 0.0)]);
        let id = BlockId::intern("eng_u");
        engine.selected = Some(id);
        let revision = engine.revision();
        assert_eq!(engine.handle_key("g", true, true, false, false, 0.0), None);
        assert_eq!(engine.selected, Some(id));
        assert_eq!(engine.revision(), revision);
    }

    #[test]
    fn unstack_key_splits_selected_stack() {
        let mut engine = engine_with(&[("eng_ua", 0.0, 0.0), ("eng_ub", 400.0, 0.0)]);
        let Ok(Applied::Block(stack)) = engine.apply(
            CanvasMutation::Merge {
                dragged: BlockId::intern("eng_ua"),
                target: BlockId::intern("eng_ub"),
            },
            0.0,
        ) else {
            panic!("expected a stack");
        };
        engine.selected = Some(stack);
        assert_eq!(
            engine.handle_key("g", true, true, false, false, 0.0),
            Some(ShortcutAction::Unstack)
        );
        assert_eq!(engine.selected, None);
        assert_eq!(engine.doc.blocks.len(), 2);
    }

    #[test]
    fn connection_at_finds_curve_near_point() {
        let mut engine = engine_with(&[("eng_ca", 0.0, 0.0), ("eng_cb", 500.0, 0.0)]);
        let Ok(Applied::Connection(conn)) = engine.apply(
            CanvasMutation::Connect {
                draft: ConnectionDraft::new(
                    Anchor::new(BlockId::intern("eng_ca"), Side::Right),
                    Anchor::new(BlockId::intern("eng_cb"), Side::Left),
                ),
            },
            0.0,
        ) else {
            panic!("expected a connection");
        };
        assert_eq!(engine.connection_at(Point::new(400.0, 102.0), 8.0, &StaticLayout), Some(conn));
        assert_eq!(engine.connection_at(Point::new(400.0, 400.0), 8.0, &StaticLayout), None);
    }

    #[test]
    fn commit_is_debounced() {
        let mut engine = engine_with(&[("eng_p", 0.0, 0.0)]);
        assert!(engine.poll_commit(500.0).is_none());
        let snapshot = engine.poll_commit(1000.0).unwrap();
        assert_eq!(snapshot.blocks.len(), 1);
        assert!(engine.poll_commit(3000.0).is_none());
        assert!(engine.flush_commit().is_none());
    }

    #[test]
    fn missing_ids_are_nothing() {
        let mut engine = CanvasEngine::new(CanvasConfig::default());
        let ghost = BlockId::intern("eng_ghost");
        assert_eq!(
            engine.apply(CanvasMutation::RemoveBlock { id: ghost }, 0.0),
            Ok(Applied::Nothing)
        );
        assert_eq!(
            engine.apply(CanvasMutation::Split { stack: ghost }, 0.0),
            Ok(Applied::Nothing)
        );
        assert_eq!(engine.revision(), 0);
        assert!(!engine.begin_drag(ghost, Point::default()));
    }

    #[test]
    fn extent_grows_with_content() {
        let mut engine = engine_with(&[("eng_far", 1500.0, 100.0)]);
        assert_eq!(engine.extent.width, 2200.0);
        assert_eq!(engine.extent.height, 1200.0);
        engine
            .apply(
                CanvasMutation::UpdateBlock {
                    id: BlockId::intern("eng_far"),
                    patch: BlockPatch::position(Point::new(0.0, 0.0)),
                },
                0.0,
            )
            .unwrap();
        assert_eq!(engine.extent.width, 2200.0);
    }
}
