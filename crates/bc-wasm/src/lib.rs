//! WASM bridge for Block Canvas: exposes the canvas engine to JavaScript.
//!
//! Compiled via `wasm-pack build --target web`. The host page renders blocks
//! and connection paths itself (ids `block-{id}` / `conn-{id}` inside one
//! scrollable root) and forwards pointer, key and paste events here. Pointer
//! coordinates are client coordinates; timestamps come from `Date.now()`.

mod dom;
mod json;

use bc_core::config::CanvasConfig;
use bc_core::id::{BlockId, ConnectionId};
use bc_core::model::{Anchor, BlockPatch, ConnectionPatch, Point};
use bc_core::paste::PastePayload;
use bc_editor::drag::Handle;
use bc_editor::live::LoopControl;
use bc_editor::sync::{CanvasEngine, CanvasMutation};
use bc_render::anchor::{AnchorResolver, CoordinateSpace, Measurer};
use bc_render::route::route_all;
use dom::{DomMeasurer, DomPaint};
use wasm_bindgen::prelude::*;

fn now_ms() -> f64 {
    js_sys::Date::now()
}

/// The main WASM-facing canvas controller.
///
/// Owns the engine plus the DOM-backed measurer and paint layer. All
/// interaction from the page goes through this struct.
#[wasm_bindgen]
pub struct BlockCanvas {
    engine: CanvasEngine,
    measurer: DomMeasurer,
    paint: DomPaint,
}

#[wasm_bindgen]
impl BlockCanvas {
    /// Open a canvas over the element `root_id`.
    ///
    /// `snapshot` is whatever was persisted (JSON snapshot, legacy plain
    /// text, or empty). `config_json` may be empty for defaults.
    #[wasm_bindgen(constructor)]
    pub fn new(root_id: &str, snapshot: &str, config_json: &str) -> Result<BlockCanvas, JsValue> {
        console_error_panic_hook_setup();
        let document = web_sys::window()
            .and_then(|w| w.document())
            .ok_or_else(|| JsValue::from_str("no document"))?;
        let root = document
            .get_element_by_id(root_id)
            .ok_or_else(|| JsValue::from_str(&format!("no element with id {root_id}")))?;
        let config = if config_json.trim().is_empty() {
            CanvasConfig::default()
        } else {
            CanvasConfig::from_json(config_json)
        };
        Ok(BlockCanvas {
            engine: CanvasEngine::from_snapshot_text(snapshot, config),
            measurer: DomMeasurer::new(document.clone(), root),
            paint: DomPaint::new(document),
        })
    }

    /// Structural revision; re-render blocks and paths when it changes.
    pub fn revision(&self) -> u64 {
        self.engine.revision()
    }

    pub fn selected(&self) -> Option<String> {
        self.engine.selected.map(|id| id.to_string())
    }

    // ─── Block drag ──────────────────────────────────────────────────────

    /// Pointer-down on the canvas. Starts a drag on the topmost block under
    /// the pointer and returns its id.
    pub fn pointer_down(&mut self, client_x: f32, client_y: f32) -> Option<String> {
        let point = self.measurer.to_canvas(client_x, client_y);
        let block = self.engine.block_at(point, &self.measurer)?;
        self.engine.begin_drag(block, point).then(|| block.to_string())
    }

    /// Id of the connection whose curve passes within `tolerance` px of the
    /// pointer, if any. Used for click-to-select on paths.
    pub fn connection_at(&self, client_x: f32, client_y: f32, tolerance: f32) -> Option<String> {
        let point = self.measurer.to_canvas(client_x, client_y);
        connection_id_at(&self.engine, point, tolerance, &self.measurer)
    }

    /// Start dragging a specific block (e.g. from its drag handle).
    pub fn begin_drag(&mut self, block_id: &str, client_x: f32, client_y: f32) -> bool {
        let point = self.measurer.to_canvas(client_x, client_y);
        self.engine.begin_drag(BlockId::intern(block_id), point)
    }

    /// Follow the pointer. Returns the block's live origin as JSON, or
    /// `null` when nothing is being dragged.
    pub fn pointer_move(&mut self, client_x: f32, client_y: f32) -> String {
        let point = self.measurer.to_canvas(client_x, client_y);
        if self.engine.is_dragging() {
            return match self.engine.drag_to(point) {
                Some(origin) => serde_json::to_string(&origin).unwrap_or_else(json::error_json),
                None => "null".to_string(),
            };
        }
        if self.engine.handle_drag_to(point) {
            return serde_json::to_string(&point).unwrap_or_else(json::error_json);
        }
        "null".to_string()
    }

    /// Paint one animation frame. Returns `false` once there is nothing
    /// left to animate; the host stops requesting frames.
    pub fn frame(&mut self) -> bool {
        self.engine.frame(&self.measurer, &mut self.paint) == LoopControl::Continue
    }

    /// Pointer-up: resolve the drag as a merge or a move.
    pub fn pointer_up(&mut self) -> String {
        if self.engine.end_handle_drag(now_ms()) {
            return r#"{"outcome":"handle"}"#.to_string();
        }
        json::drop_outcome_json(self.engine.end_drag(now_ms(), &self.measurer))
    }

    // ─── Control-point handles ───────────────────────────────────────────

    /// Grab control point `1` or `2` of a connection.
    pub fn begin_handle_drag(&mut self, connection_id: &str, handle: u8) -> bool {
        let handle = match handle {
            1 => Handle::First,
            2 => Handle::Second,
            _ => return false,
        };
        self.engine
            .begin_handle_drag(ConnectionId::intern(connection_id), handle, &self.measurer)
    }

    // ─── Connection gesture ──────────────────────────────────────────────

    pub fn begin_connection(&mut self, block_id: &str, side: &str) -> String {
        let side = match json::parse_side(side) {
            Ok(side) => side,
            Err(e) => return json::error_json(e),
        };
        match self.engine.begin_connection(Anchor::new(BlockId::intern(block_id), side)) {
            Ok(()) => r#"{"ok":true}"#.to_string(),
            Err(rejected) => json::error_json(rejected),
        }
    }

    /// Update the draft. Returns the preview JSON, or `null` when the move
    /// was throttled or no draft is active.
    pub fn connection_move(&mut self, client_x: f32, client_y: f32) -> String {
        let point = self.measurer.to_canvas(client_x, client_y);
        match self.engine.connection_move(point, now_ms(), &self.measurer) {
            Some(preview) => json::preview_json(&preview),
            None => "null".to_string(),
        }
    }

    pub fn release_connection(&mut self) -> String {
        match self.engine.release_connection(now_ms(), &self.measurer) {
            Ok(Some(conn)) => serde_json::json!({ "ok": true, "connection": conn.id }).to_string(),
            Ok(None) => r#"{"ok":true,"connection":null}"#.to_string(),
            Err(rejected) => json::error_json(rejected),
        }
    }

    /// Abandon any drag, handle drag, or connection draft.
    pub fn cancel(&mut self) {
        self.engine.cancel();
    }

    // ─── Keyboard ────────────────────────────────────────────────────────

    /// Returns `{"action":"..."}` or `{"action":null}`.
    pub fn handle_key(&mut self, key: &str, ctrl: bool, shift: bool, alt: bool, meta: bool) -> String {
        json::shortcut_json(self.engine.handle_key(key, ctrl, shift, alt, meta, now_ms()))
    }

    // ─── Structural mutations ────────────────────────────────────────────

    pub fn add_block(&mut self, block_json: &str) -> String {
        match json::parse_new_block(block_json) {
            Ok(block) => self.apply(CanvasMutation::AddBlock { block: Box::new(block) }),
            Err(e) => json::error_json(e),
        }
    }

    pub fn update_block(&mut self, block_id: &str, patch_json: &str) -> String {
        match serde_json::from_str::<BlockPatch>(patch_json) {
            Ok(patch) => self.apply(CanvasMutation::UpdateBlock {
                id: BlockId::intern(block_id),
                patch,
            }),
            Err(e) => json::error_json(e),
        }
    }

    pub fn remove_block(&mut self, block_id: &str) -> String {
        self.apply(CanvasMutation::RemoveBlock {
            id: BlockId::intern(block_id),
        })
    }

    pub fn add_connection(&mut self, connection_json: &str) -> String {
        match json::parse_connection_draft(connection_json) {
            Ok(draft) => self.apply(CanvasMutation::Connect { draft }),
            Err(e) => json::error_json(e),
        }
    }

    pub fn update_connection(&mut self, connection_id: &str, patch_json: &str) -> String {
        match serde_json::from_str::<ConnectionPatch>(patch_json) {
            Ok(patch) => self.apply(CanvasMutation::UpdateConnection {
                id: ConnectionId::intern(connection_id),
                patch,
            }),
            Err(e) => json::error_json(e),
        }
    }

    pub fn remove_connection(&mut self, connection_id: &str) -> String {
        self.apply(CanvasMutation::RemoveConnection {
            id: ConnectionId::intern(connection_id),
        })
    }

    pub fn merge(&mut self, dragged_id: &str, target_id: &str) -> String {
        self.apply(CanvasMutation::Merge {
            dragged: BlockId::intern(dragged_id),
            target: BlockId::intern(target_id),
        })
    }

    pub fn unstack(&mut self, stack_id: &str) -> String {
        self.apply(CanvasMutation::Split {
            stack: BlockId::intern(stack_id),
        })
    }

    /// Drag one item out of a stack, dropping it at a client position.
    pub fn extract(&mut self, stack_id: &str, item_id: &str, client_x: f32, client_y: f32) -> String {
        let position = self.measurer.to_canvas(client_x, client_y);
        self.apply(CanvasMutation::Extract {
            stack: BlockId::intern(stack_id),
            item: BlockId::intern(item_id),
            position,
        })
    }

    pub fn bring_to_front(&mut self, block_id: &str) -> String {
        self.apply(CanvasMutation::BringToFront {
            id: BlockId::intern(block_id),
        })
    }

    pub fn paste_text(&mut self, text: &str, canvas_x: f32, canvas_y: f32) -> String {
        self.apply(CanvasMutation::Paste {
            payload: PastePayload::Text(text.to_string()),
            position: Point::new(canvas_x, canvas_y),
        })
    }

    /// Paste an image already uploaded by the host; `src` is its blob or
    /// asset reference.
    pub fn paste_image(&mut self, src: &str, canvas_x: f32, canvas_y: f32) -> String {
        self.apply(CanvasMutation::Paste {
            payload: PastePayload::Image(src.to_string()),
            position: Point::new(canvas_x, canvas_y),
        })
    }

    // ─── Rendering ───────────────────────────────────────────────────────

    /// Path data for every visible connection: `{"<id>":"M…C…", …}`.
    pub fn render_paths(&self) -> String {
        let resolver = AnchorResolver::new(
            &self.engine.doc.blocks,
            &self.measurer,
            self.engine.config.auto_height_estimate,
        );
        json::paths_json(&route_all(&self.engine.doc.connections, &resolver))
    }

    /// Blocks in draw order plus visible connections, for the host renderer.
    pub fn scene_json(&self) -> String {
        let blocks: Vec<_> = self.engine.doc.blocks.iter().collect();
        let connections: Vec<_> = self.engine.doc.connections.visible().collect();
        serde_json::json!({ "blocks": blocks, "connections": connections }).to_string()
    }

    pub fn extent_json(&self) -> String {
        json::extent_json(self.engine.extent)
    }

    // ─── Persistence ─────────────────────────────────────────────────────

    pub fn snapshot_json(&self) -> String {
        self.engine.snapshot().to_json().unwrap_or_else(json::error_json)
    }

    /// The snapshot to persist once edits have settled, or `undefined`.
    pub fn poll_commit(&mut self) -> Option<String> {
        let snapshot = self.engine.poll_commit(now_ms())?;
        match snapshot.to_json() {
            Ok(json) => Some(json),
            Err(e) => {
                log::error!("snapshot encoding failed: {e}");
                None
            }
        }
    }

    /// Emit any pending commit now (page hide, explicit save).
    pub fn flush_commit(&mut self) -> Option<String> {
        self.engine.flush_commit()?.to_json().ok()
    }
}

impl BlockCanvas {
    fn apply(&mut self, mutation: CanvasMutation) -> String {
        json::applied_json(self.engine.apply(mutation, now_ms()))
    }
}

fn connection_id_at(
    engine: &CanvasEngine,
    point: Point,
    tolerance: f32,
    measurer: &dyn Measurer,
) -> Option<String> {
    engine.connection_at(point, tolerance, measurer).map(|id| id.to_string())
}

/// Set up panic hook for better error messages in browser console.
fn console_error_panic_hook_setup() {
    #[cfg(target_arch = "wasm32")]
    {
        use std::sync::Once;
        static SET_HOOK: Once = Once::new();
        SET_HOOK.call_once(|| {
            std::panic::set_hook(Box::new(|info| {
                let msg = format!("Block Canvas WASM panic: {info}");
                web_sys::console::error_1(&msg.into());
            }));
        });
    }
}

// ─── Standalone helpers (no canvas needed) ───────────────────────────────

/// Classify pasted text without a canvas: `"embed"`, `"code"` or `"text"`.
#[wasm_bindgen]
pub fn classify_paste(text: &str) -> String {
    let kind = bc_core::paste::classify(&PastePayload::Text(text.to_string()));
    serde_json::to_value(kind)
        .ok()
        .and_then(|v| v.as_str().map(str::to_string))
        .unwrap_or_default()
}

/// Normalise whatever was persisted into a JSON snapshot.
#[wasm_bindgen]
pub fn normalize_snapshot(raw: &str, config_json: &str) -> String {
    let config = if config_json.trim().is_empty() {
        CanvasConfig::default()
    } else {
        CanvasConfig::from_json(config_json)
    };
    bc_core::snapshot::Snapshot::load(raw, &config)
        .to_json()
        .unwrap_or_else(json::error_json)
}

#[cfg(test)]
mod tests {
    use super::*;
    use bc_core::model::{Block, BlockKind, ConnectionDraft, Side, Size};
    use bc_render::anchor::StaticLayout;
    use pretty_assertions::assert_eq;

    #[test]
    fn connection_lookup_reports_id_near_curve() {
        let mut engine = CanvasEngine::new(CanvasConfig::default());
        for (id, x) in [("wl_a", 0.0), ("wl_b", 500.0)] {
            let block = Block::with_id(BlockId::intern(id), BlockKind::Text, Point::new(x, 0.0), id)
                .sized(Size::fixed(300.0, 200.0));
            engine
                .apply(CanvasMutation::AddBlock { block: Box::new(block) }, 0.0)
                .unwrap();
        }
        let draft = ConnectionDraft::new(
            Anchor::new(BlockId::intern("wl_a"), Side::Right),
            Anchor::new(BlockId::intern("wl_b"), Side::Left),
        );
        let conn = engine.apply(CanvasMutation::Connect { draft }, 0.0).unwrap();
        let bc_editor::Applied::Connection(conn) = conn else {
            panic!("expected a connection");
        };

        assert_eq!(
            connection_id_at(&engine, Point::new(400.0, 100.0), 8.0, &StaticLayout),
            Some(conn.to_string())
        );
        assert_eq!(connection_id_at(&engine, Point::new(400.0, 500.0), 8.0, &StaticLayout), None);
    }

    #[test]
    fn classify_paste_names_kinds() {
        assert_eq!(classify_paste("https://example.com"), "embed");
        assert_eq!(classify_paste("hello there"), "text");
    }

    #[test]
    fn plain_text_normalizes_to_one_block() {
        let json = normalize_snapshot("an old note", "");
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["blocks"].as_array().unwrap().len(), 1);
        assert_eq!(value["blocks"][0]["content"], "an old note");
    }
}
