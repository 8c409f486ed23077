//! JSON shapes exchanged with the host page.
//!
//! Everything crossing the boundary is a JSON string; these helpers keep the
//! encoding in plain Rust so it can be tested without a browser.

use bc_core::connections::ConnectionRejected;
use bc_core::id::{BlockId, ConnectionId};
use bc_core::layout::Viewport;
use bc_core::model::{Anchor, Block, BlockKind, ConnectionDraft, Point, Side, Size};
use bc_editor::{Applied, DraftPreview, DropOutcome, ShortcutAction};
use serde::{Deserialize, Serialize};
use serde_json::json;

pub fn error_json(message: impl std::fmt::Display) -> String {
    json!({ "ok": false, "error": message.to_string() }).to_string()
}

pub fn parse_side(side: &str) -> Result<Side, String> {
    Side::parse(side).ok_or_else(|| format!("unknown side: {side}"))
}

// ─── Inbound ─────────────────────────────────────────────────────────────

/// A block as the host describes it. Id and size are optional.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct NewBlock {
    #[serde(default)]
    id: Option<BlockId>,
    kind: BlockKind,
    position: Point,
    #[serde(default)]
    size: Option<Size>,
    #[serde(default)]
    content: String,
    #[serde(default)]
    color_tag: Option<String>,
}

pub fn parse_new_block(json: &str) -> Result<Block, String> {
    let new: NewBlock = serde_json::from_str(json).map_err(|e| e.to_string())?;
    let mut block = match new.id {
        Some(id) => Block::with_id(id, new.kind, new.position, new.content),
        None => Block::new(new.kind, new.position, new.content),
    };
    if let Some(size) = new.size {
        block = block.sized(size);
    }
    block.color_tag = new.color_tag;
    Ok(block)
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct NewConnection {
    from_block: BlockId,
    from_side: Side,
    to_block: BlockId,
    to_side: Side,
    #[serde(default)]
    control_point1: Option<Point>,
    #[serde(default)]
    control_point2: Option<Point>,
    #[serde(default)]
    color: Option<String>,
}

pub fn parse_connection_draft(json: &str) -> Result<ConnectionDraft, String> {
    let new: NewConnection = serde_json::from_str(json).map_err(|e| e.to_string())?;
    let mut draft = ConnectionDraft::new(
        Anchor::new(new.from_block, new.from_side),
        Anchor::new(new.to_block, new.to_side),
    );
    draft.control_points = new.control_point1.zip(new.control_point2);
    draft.color = new.color;
    Ok(draft)
}

// ─── Outbound ────────────────────────────────────────────────────────────

pub fn applied_json(applied: Result<Applied, ConnectionRejected>) -> String {
    match applied {
        Ok(Applied::Nothing) => json!({ "ok": true, "changed": false }).to_string(),
        Ok(Applied::Block(id)) => json!({ "ok": true, "changed": true, "block": id }).to_string(),
        Ok(Applied::Blocks(ids)) => json!({ "ok": true, "changed": true, "blocks": ids }).to_string(),
        Ok(Applied::Connection(id)) => json!({ "ok": true, "changed": true, "connection": id }).to_string(),
        Err(rejected) => error_json(rejected),
    }
}

pub fn drop_outcome_json(outcome: Option<DropOutcome>) -> String {
    match outcome {
        Some(DropOutcome::Merged { stack }) => json!({ "outcome": "merged", "stack": stack }).to_string(),
        Some(DropOutcome::Moved { block, position }) => {
            json!({ "outcome": "moved", "block": block, "position": position }).to_string()
        }
        None => json!({ "outcome": "none" }).to_string(),
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct PreviewReply<'a> {
    end: Point,
    snapped_block: Option<BlockId>,
    snapped_side: Option<&'static str>,
    path: &'a str,
}

pub fn preview_json(preview: &DraftPreview) -> String {
    let reply = PreviewReply {
        end: preview.end,
        snapped_block: preview.snapped.map(|a| a.block),
        snapped_side: preview.snapped.map(|a| a.side.as_str()),
        path: &preview.path,
    };
    serde_json::to_string(&reply).unwrap_or_else(error_json)
}

pub fn shortcut_json(action: Option<ShortcutAction>) -> String {
    let name = match action {
        Some(ShortcutAction::Cancel) => "cancel",
        Some(ShortcutAction::Delete) => "delete",
        Some(ShortcutAction::Unstack) => "unstack",
        Some(ShortcutAction::BringToFront) => "bringToFront",
        None => return r#"{"action":null}"#.to_string(),
    };
    json!({ "action": name }).to_string()
}

pub fn paths_json(paths: &[(ConnectionId, String)]) -> String {
    let map: serde_json::Map<String, serde_json::Value> = paths
        .iter()
        .map(|(id, d)| (id.to_string(), serde_json::Value::String(d.clone())))
        .collect();
    serde_json::Value::Object(map).to_string()
}

pub fn extent_json(extent: Viewport) -> String {
    json!({ "width": extent.width, "height": extent.height }).to_string()
}
