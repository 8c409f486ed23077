//! Anchor resolution: block id + side → canvas point.
//!
//! The rendering host knows the real on-screen box of each block, which can
//! exceed the stored size for `auto`-height or reflowed content. That
//! knowledge is injected through [`Measurer`]; when it has nothing to say,
//! the resolver falls back to stored position and size.

use bc_core::blocks::BlockStore;
use bc_core::id::BlockId;
use bc_core::model::{Anchor, Bounds, Point, Side};

// ─── Presentation surface capabilities ───────────────────────────────────

/// Measures a block's current rendered box, in canvas coordinates.
pub trait Measurer {
    /// `None` when the block has no live box right now (not mounted,
    /// briefly detached, headless host).
    fn measure(&self, block: BlockId) -> Option<Bounds>;
}

/// Translates client/screen positions into canvas-local coordinates.
pub trait CoordinateSpace {
    fn to_canvas(&self, client_x: f32, client_y: f32) -> Point;
}

/// A measurer that never measures. Every anchor uses stored geometry.
#[derive(Debug, Clone, Copy, Default)]
pub struct StaticLayout;

impl Measurer for StaticLayout {
    fn measure(&self, _block: BlockId) -> Option<Bounds> {
        None
    }
}

/// Canvas and client space differ by a scroll/pan offset only.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct OffsetSpace {
    pub origin: Point,
}

impl CoordinateSpace for OffsetSpace {
    fn to_canvas(&self, client_x: f32, client_y: f32) -> Point {
        Point::new(client_x - self.origin.x, client_y - self.origin.y)
    }
}

// ─── Resolver ────────────────────────────────────────────────────────────

pub struct AnchorResolver<'a> {
    blocks: &'a BlockStore,
    measurer: &'a dyn Measurer,
    auto_height_estimate: f32,
    /// Live position of a block whose stored position is stale (mid-drag).
    moved: Option<(BlockId, Point)>,
}

impl<'a> AnchorResolver<'a> {
    pub fn new(blocks: &'a BlockStore, measurer: &'a dyn Measurer, auto_height_estimate: f32) -> Self {
        Self {
            blocks,
            measurer,
            auto_height_estimate,
            moved: None,
        }
    }

    /// Treat `block` as sitting at `position`, whatever the store says.
    pub fn with_moved(mut self, block: BlockId, position: Point) -> Self {
        self.moved = Some((block, position));
        self
    }

    /// Current box of a block: live measurement if available, else stored
    /// geometry. `None` if the block is neither measurable nor top-level.
    pub fn bounds(&self, block: BlockId) -> Option<Bounds> {
        let measured = self.measurer.measure(block);
        let mut bounds = match measured {
            Some(b) => b,
            None => {
                let stored = self.blocks.get(block)?;
                log::trace!("no live box for {block}; using stored geometry");
                stored.static_bounds(self.auto_height_estimate)
            }
        };
        if let Some((id, position)) = self.moved
            && id == block
        {
            bounds.x = position.x;
            bounds.y = position.y;
        }
        Some(bounds)
    }

    pub fn resolve(&self, block: BlockId, side: Side) -> Option<Point> {
        self.bounds(block).map(|b| b.anchor(side))
    }

    pub fn resolve_anchor(&self, anchor: Anchor) -> Option<Point> {
        self.resolve(anchor.block, anchor.side)
    }
}
