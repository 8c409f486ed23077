//! Connection-Creation Gesture: anchor drag → snapped draft → connection.
//!
//! The draft is session state only. Pointer moves are throttled and each
//! accepted move yields a [`DraftPreview`] for the host to draw; nothing
//! touches the document until `release`.

use bc_core::config::CanvasConfig;
use bc_core::connections::ConnectionRejected;
use bc_core::document::CanvasDocument;
use bc_core::model::{Anchor, Connection, ConnectionDraft, Point};
use bc_render::anchor::{AnchorResolver, Measurer};
use bc_render::hit::{SnapTarget, nearest_free_anchor};
use bc_render::route::route_draft;

#[derive(Debug, Clone, Copy, PartialEq)]
struct Draft {
    from: Anchor,
    pointer: Point,
    snapped: Option<SnapTarget>,
    last_tick_ms: Option<f64>,
}

/// What the host should draw for the in-progress draft.
#[derive(Debug, Clone, PartialEq)]
pub struct DraftPreview {
    /// The rendered endpoint: the snapped anchor if any, else the pointer.
    pub end: Point,
    pub snapped: Option<Anchor>,
    pub path: String,
}

#[derive(Debug, Clone)]
pub struct ConnectionGesture {
    draft: Option<Draft>,
    throttle_ms: f64,
    snap_radius: f32,
    auto_height_estimate: f32,
}

impl ConnectionGesture {
    pub fn new(config: &CanvasConfig) -> Self {
        Self {
            draft: None,
            throttle_ms: config.connect_throttle_ms,
            snap_radius: config.anchor_snap_radius,
            auto_height_estimate: config.auto_height_estimate,
        }
    }

    /// Start a draft from `from`. Role-locked anchors are refused before
    /// any feedback is shown. Replaces any draft already in progress.
    pub fn begin(&mut self, from: Anchor, doc: &CanvasDocument) -> Result<(), ConnectionRejected> {
        if !doc.blocks.contains(from.block) {
            return Err(ConnectionRejected::UnknownBlock(from.block));
        }
        if doc.connections.is_role_locked(from) {
            log::debug!("connection start refused: {}:{} is a destination", from.block, from.side.as_str());
            return Err(ConnectionRejected::RoleLocked(from));
        }
        self.draft = Some(Draft {
            from,
            pointer: Point::default(),
            snapped: None,
            last_tick_ms: None,
        });
        Ok(())
    }

    /// Track the pointer. Returns `None` when idle or when this move falls
    /// inside the throttle window.
    pub fn pointer_move(
        &mut self,
        pointer: Point,
        now_ms: f64,
        doc: &CanvasDocument,
        measurer: &dyn Measurer,
    ) -> Option<DraftPreview> {
        let throttle_ms = self.throttle_ms;
        let draft = self.draft.as_mut()?;
        draft.pointer = pointer;
        if draft.last_tick_ms.is_some_and(|last| now_ms - last < throttle_ms) {
            return None;
        }
        draft.last_tick_ms = Some(now_ms);

        let resolver = AnchorResolver::new(&doc.blocks, measurer, self.auto_height_estimate);
        let start = resolver.resolve_anchor(draft.from)?;
        draft.snapped = nearest_free_anchor(
            &doc.blocks,
            &doc.connections,
            &resolver,
            pointer,
            draft.from.block,
            self.snap_radius,
        );

        let (end, end_side) = match draft.snapped {
            Some(target) => (target.point, Some(target.anchor.side)),
            None => (pointer, None),
        };
        Some(DraftPreview {
            end,
            snapped: draft.snapped.map(|t| t.anchor),
            path: route_draft(start, draft.from.side, end, end_side).path_data(),
        })
    }

    /// Finish the gesture. The snap is recomputed at the final pointer
    /// position, since throttled moves skip it. Commits when the draft is
    /// locked onto an anchor; `Ok(None)` when there was nothing to commit.
    pub fn release(
        &mut self,
        doc: &mut CanvasDocument,
        measurer: &dyn Measurer,
    ) -> Result<Option<Connection>, ConnectionRejected> {
        let Some(draft) = self.draft.take() else {
            return Ok(None);
        };
        let snapped = {
            let resolver = AnchorResolver::new(&doc.blocks, measurer, self.auto_height_estimate);
            nearest_free_anchor(
                &doc.blocks,
                &doc.connections,
                &resolver,
                draft.pointer,
                draft.from.block,
                self.snap_radius,
            )
        };
        let Some(target) = snapped else {
            log::debug!("connection draft from {} discarded", draft.from.block);
            return Ok(None);
        };
        doc.connect(ConnectionDraft::new(draft.from, target.anchor)).map(Some)
    }

    /// Drop the draft without touching the document.
    pub fn cancel(&mut self) -> bool {
        self.draft.take().is_some()
    }

    pub fn is_active(&self) -> bool {
        self.draft.is_some()
    }
}
