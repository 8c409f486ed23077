//! Presentation surface on top of the browser DOM.
//!
//! Blocks are rendered by the host as elements with id `block-{id}`, and
//! connections as SVG `<path>` elements with id `conn-{id}`, all inside one
//! scrollable root element that defines canvas space.

use bc_core::id::{BlockId, ConnectionId};
use bc_core::model::{Bounds, Point};
use bc_render::anchor::{CoordinateSpace, Measurer};
use bc_render::paint::PaintLayer;
use web_sys::{Document, Element};

pub fn block_element_id(id: BlockId) -> String {
    format!("block-{id}")
}

pub fn connection_element_id(id: ConnectionId) -> String {
    format!("conn-{id}")
}

/// Canvas-space origin of `root` in client coordinates.
fn canvas_origin(root: &Element) -> Point {
    let rect = root.get_bounding_client_rect();
    Point::new(
        rect.left() as f32 - root.scroll_left() as f32,
        rect.top() as f32 - root.scroll_top() as f32,
    )
}

// ─── Measurement ─────────────────────────────────────────────────────────

/// Measures block elements and maps client coordinates into canvas space.
pub struct DomMeasurer {
    document: Document,
    root: Element,
}

impl DomMeasurer {
    pub fn new(document: Document, root: Element) -> Self {
        Self { document, root }
    }
}

impl Measurer for DomMeasurer {
    fn measure(&self, block: BlockId) -> Option<Bounds> {
        let element = self.document.get_element_by_id(&block_element_id(block))?;
        let rect = element.get_bounding_client_rect();
        if rect.width() == 0.0 && rect.height() == 0.0 {
            // Detached or display:none; let the resolver fall back.
            return None;
        }
        let origin = canvas_origin(&self.root);
        Some(Bounds::new(
            rect.left() as f32 - origin.x,
            rect.top() as f32 - origin.y,
            rect.width() as f32,
            rect.height() as f32,
        ))
    }
}

impl CoordinateSpace for DomMeasurer {
    fn to_canvas(&self, client_x: f32, client_y: f32) -> Point {
        let origin = canvas_origin(&self.root);
        Point::new(client_x - origin.x, client_y - origin.y)
    }
}

// ─── Paint ───────────────────────────────────────────────────────────────

/// Writes path data straight onto rendered connection paths.
pub struct DomPaint {
    document: Document,
}

impl DomPaint {
    pub fn new(document: Document) -> Self {
        Self { document }
    }
}

impl PaintLayer for DomPaint {
    fn set_path_data(&mut self, connection: ConnectionId, d: &str) {
        let Some(path) = self.document.get_element_by_id(&connection_element_id(connection)) else {
            log::trace!("no rendered path for {connection}");
            return;
        };
        if let Err(e) = path.set_attribute("d", d) {
            log::warn!("failed to patch path for {connection}: {e:?}");
        }
    }
}
