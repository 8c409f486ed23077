//! Drag Coordinator: the ephemeral, singly-owned state of a move gesture.
//!
//! Two states only. Pointer moves update the live position here and nowhere
//! else; the document learns the final position once, from the
//! [`DragRelease`] handed back at pointer-up.

use bc_core::id::{BlockId, ConnectionId};
use bc_core::model::Point;

/// A block being moved.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ActiveDrag {
    pub block: BlockId,
    /// Pointer position minus block origin at drag start.
    pub grab_offset: Point,
    /// Where the block's origin currently is.
    pub position: Point,
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum DragSession {
    #[default]
    Idle,
    Dragging(ActiveDrag),
}

/// The outcome of a completed drag, for the host boundary to commit.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DragRelease {
    pub block: BlockId,
    pub position: Point,
}

impl DragSession {
    /// Start dragging `block`, whose origin is at `origin`, grabbed at
    /// `pointer`. Returns the block whose drag was replaced, if any.
    pub fn begin(&mut self, block: BlockId, origin: Point, pointer: Point) -> Option<BlockId> {
        let replaced = self.active().map(|d| d.block);
        if let Some(prev) = replaced {
            log::debug!("drag of {prev} replaced by {block}");
        }
        *self = DragSession::Dragging(ActiveDrag {
            block,
            grab_offset: Point::new(pointer.x - origin.x, pointer.y - origin.y),
            position: origin,
        });
        replaced
    }

    /// Follow the pointer. Returns the new live origin, or `None` when idle.
    pub fn move_to(&mut self, pointer: Point) -> Option<Point> {
        match self {
            DragSession::Dragging(drag) => {
                drag.position = Point::new(pointer.x - drag.grab_offset.x, pointer.y - drag.grab_offset.y);
                Some(drag.position)
            }
            DragSession::Idle => None,
        }
    }

    /// Pointer-up: back to idle, reporting where the block was dropped.
    pub fn end(&mut self) -> Option<DragRelease> {
        match std::mem::take(self) {
            DragSession::Dragging(drag) => Some(DragRelease {
                block: drag.block,
                position: drag.position,
            }),
            DragSession::Idle => None,
        }
    }

    /// Abandon the drag without a release. Returns the block that was moving.
    pub fn cancel(&mut self) -> Option<BlockId> {
        let block = self.active().map(|d| d.block);
        *self = DragSession::Idle;
        block
    }

    pub fn active(&self) -> Option<&ActiveDrag> {
        match self {
            DragSession::Dragging(drag) => Some(drag),
            DragSession::Idle => None,
        }
    }

    pub fn is_dragging(&self) -> bool {
        matches!(self, DragSession::Dragging(_))
    }
}

// ─── Control-point handles ───────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Handle {
    First,
    Second,
}

/// A connection control point being dragged. Committed on release.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HandleDrag {
    pub connection: ConnectionId,
    pub handle: Handle,
    /// The control-point pair as it would be stored right now.
    pub control_points: (Point, Point),
}

impl HandleDrag {
    pub fn move_to(&mut self, point: Point) {
        match self.handle {
            Handle::First => self.control_points.0 = point,
            Handle::Second => self.control_points.1 = point,
        }
    }
}
