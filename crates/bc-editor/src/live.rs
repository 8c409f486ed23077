//! Live Render Loop: per-frame connection patches during a drag.
//!
//! Runs once per display frame while a drag is active. It reads the stores
//! through shared references and writes only to the [`PaintLayer`], so a
//! frame can never turn into a structural mutation.

use crate::drag::{DragSession, HandleDrag};
use bc_core::config::CanvasConfig;
use bc_core::document::CanvasDocument;
use bc_render::anchor::{AnchorResolver, Measurer};
use bc_render::paint::PaintLayer;
use bc_render::route::{RoutedPath, route_touching};

/// Whether the host should request another animation frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopControl {
    Continue,
    Stop,
}

#[derive(Debug, Clone)]
pub struct LiveRenderLoop {
    auto_height_estimate: f32,
    frames: u64,
}

impl LiveRenderLoop {
    pub fn new(config: &CanvasConfig) -> Self {
        Self {
            auto_height_estimate: config.auto_height_estimate,
            frames: 0,
        }
    }

    /// Repaint every visible connection touching the dragged block.
    pub fn frame(
        &mut self,
        session: &DragSession,
        doc: &CanvasDocument,
        measurer: &dyn Measurer,
        paint: &mut dyn PaintLayer,
    ) -> LoopControl {
        let Some(drag) = session.active() else {
            return LoopControl::Stop;
        };
        let resolver = AnchorResolver::new(&doc.blocks, measurer, self.auto_height_estimate)
            .with_moved(drag.block, drag.position);
        let patches = route_touching(&doc.connections, drag.block, &resolver);
        for (id, d) in &patches {
            paint.set_path_data(*id, d);
        }
        self.frames += 1;
        log::trace!(
            "frame {}: {} path(s) patched for {}",
            self.frames,
            patches.len(),
            drag.block
        );
        LoopControl::Continue
    }

    /// Repaint the connection whose control point is being dragged.
    pub fn handle_frame(
        &mut self,
        handle: &HandleDrag,
        doc: &CanvasDocument,
        measurer: &dyn Measurer,
        paint: &mut dyn PaintLayer,
    ) -> LoopControl {
        let Some(conn) = doc.connections.get(handle.connection) else {
            return LoopControl::Stop;
        };
        let resolver = AnchorResolver::new(&doc.blocks, measurer, self.auto_height_estimate);
        let (Some(start), Some(end)) = (
            resolver.resolve_anchor(conn.from_anchor()),
            resolver.resolve_anchor(conn.to_anchor()),
        ) else {
            return LoopControl::Stop;
        };
        let routed = RoutedPath::new(
            start,
            end,
            conn.from_side,
            conn.to_side,
            Some(handle.control_points),
        );
        paint.set_path_data(conn.id, &routed.path_data());
        self.frames += 1;
        LoopControl::Continue
    }

    /// Frames painted since creation.
    pub fn frames(&self) -> u64 {
        self.frames
    }
}
