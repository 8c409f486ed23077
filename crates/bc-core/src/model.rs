//! Core data model for the block canvas.
//!
//! A canvas is a flat, ordered list of `Block`s plus a list of directed
//! `Connection`s between block anchors. Blocks own their geometry in canvas
//! space; connections own only anchor references and optional waypoints. The
//! router derives everything else at render time.

use crate::id::{BlockId, ConnectionId};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use smallvec::SmallVec;

// ─── Geometry primitives ─────────────────────────────────────────────────

/// A point in canvas space.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn distance(self, other: Point) -> f32 {
        self.distance_sq(other).sqrt()
    }

    pub fn distance_sq(self, other: Point) -> f32 {
        let dx = other.x - self.x;
        let dy = other.y - self.y;
        dx * dx + dy * dy
    }

    pub fn offset(self, dx: f32, dy: f32) -> Self {
        Self::new(self.x + dx, self.y + dy)
    }
}

/// Axis-aligned box in canvas space (stored or measured).
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Bounds {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Bounds {
    pub const fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn contains(&self, px: f32, py: f32) -> bool {
        px >= self.x && px <= self.x + self.width && py >= self.y && py <= self.y + self.height
    }

    pub fn center(&self) -> Point {
        Point::new(self.x + self.width / 2.0, self.y + self.height / 2.0)
    }

    pub fn right(&self) -> f32 {
        self.x + self.width
    }

    pub fn bottom(&self) -> f32 {
        self.y + self.height
    }

    /// The attachment point for `side` on this box's boundary.
    pub fn anchor(&self, side: Side) -> Point {
        match side {
            Side::Top => Point::new(self.x + self.width / 2.0, self.y),
            Side::Right => Point::new(self.x + self.width, self.y + self.height / 2.0),
            Side::Bottom => Point::new(self.x + self.width / 2.0, self.y + self.height),
            Side::Left => Point::new(self.x, self.y + self.height / 2.0),
        }
    }
}

// ─── Anchors ─────────────────────────────────────────────────────────────

/// One of the four fixed attachment points on a block's boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Top,
    Right,
    Bottom,
    Left,
}

impl Side {
    pub const ALL: [Side; 4] = [Side::Top, Side::Right, Side::Bottom, Side::Left];

    /// Unit outward normal of this side (canvas y grows downward).
    pub fn normal(self) -> (f32, f32) {
        match self {
            Side::Top => (0.0, -1.0),
            Side::Right => (1.0, 0.0),
            Side::Bottom => (0.0, 1.0),
            Side::Left => (-1.0, 0.0),
        }
    }

    pub fn opposite(self) -> Self {
        match self {
            Side::Top => Side::Bottom,
            Side::Right => Side::Left,
            Side::Bottom => Side::Top,
            Side::Left => Side::Right,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Side::Top => "top",
            Side::Right => "right",
            Side::Bottom => "bottom",
            Side::Left => "left",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "top" => Some(Side::Top),
            "right" => Some(Side::Right),
            "bottom" => Some(Side::Bottom),
            "left" => Some(Side::Left),
            _ => None,
        }
    }
}

/// A `(block, side)` pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Anchor {
    pub block: BlockId,
    pub side: Side,
}

impl Anchor {
    pub const fn new(block: BlockId, side: Side) -> Self {
        Self { block, side }
    }
}

// ─── Blocks ──────────────────────────────────────────────────────────────

/// What a block holds. `Stack` blocks carry their merged members.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BlockKind {
    Text,
    Image,
    Embed,
    Code,
    Stack,
}

impl BlockKind {
    /// Size given to a freshly created block of this kind.
    pub fn default_size(self) -> Size {
        match self {
            BlockKind::Text => Size::auto(300.0),
            BlockKind::Code => Size::auto(400.0),
            BlockKind::Image => Size::fixed(300.0, 200.0),
            BlockKind::Embed => Size::fixed(400.0, 300.0),
            BlockKind::Stack => Size::auto(300.0),
        }
    }
}

/// Block height: an explicit value, or `"auto"` (content-driven, measured
/// by the presentation surface).
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum Height {
    Fixed(f32),
    #[default]
    Auto,
}

impl Height {
    /// The stored height, or `estimate` when the height is content-driven.
    pub fn or_estimate(self, estimate: f32) -> f32 {
        match self {
            Height::Fixed(h) => h,
            Height::Auto => estimate,
        }
    }
}

impl Serialize for Height {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Height::Fixed(h) => serializer.serialize_f32(*h),
            Height::Auto => serializer.serialize_str("auto"),
        }
    }
}

impl<'de> Deserialize<'de> for Height {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Repr {
            Number(f32),
            Keyword(String),
        }
        match Repr::deserialize(deserializer)? {
            Repr::Number(h) => Ok(Height::Fixed(h)),
            Repr::Keyword(k) if k == "auto" => Ok(Height::Auto),
            Repr::Keyword(k) => Err(serde::de::Error::custom(format!(
                "expected a number or \"auto\", got \"{k}\""
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Size {
    pub width: f32,
    #[serde(default)]
    pub height: Height,
}

impl Size {
    pub const fn fixed(width: f32, height: f32) -> Self {
        Self {
            width,
            height: Height::Fixed(height),
        }
    }

    pub const fn auto(width: f32) -> Self {
        Self {
            width,
            height: Height::Auto,
        }
    }
}

/// A positioned, sized, typed content unit on the canvas.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Block {
    pub id: BlockId,
    pub kind: BlockKind,
    pub position: Point,
    pub size: Size,
    /// Kind-dependent payload (markup, blob reference, URL, code). Opaque here.
    #[serde(default)]
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color_tag: Option<String>,
    /// Merged members, in merge order. Only present on `Stack` blocks.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stack_items: Option<Vec<Block>>,
}

impl Block {
    /// A new block of `kind` with a generated id and the kind's default size.
    pub fn new(kind: BlockKind, position: Point, content: impl Into<String>) -> Self {
        Self::with_id(BlockId::generate(), kind, position, content)
    }

    pub fn with_id(id: BlockId, kind: BlockKind, position: Point, content: impl Into<String>) -> Self {
        Self {
            id,
            kind,
            position,
            size: kind.default_size(),
            content: content.into(),
            color_tag: None,
            stack_items: None,
        }
    }

    pub fn sized(mut self, size: Size) -> Self {
        self.size = size;
        self
    }

    pub fn is_stack(&self) -> bool {
        self.kind == BlockKind::Stack
    }

    /// Ids of the blocks merged into this stack (empty for non-stacks).
    pub fn member_ids(&self) -> SmallVec<[BlockId; 4]> {
        self.stack_items
            .as_deref()
            .unwrap_or_default()
            .iter()
            .map(|b| b.id)
            .collect()
    }

    /// Stored geometry, estimating `auto` heights.
    pub fn static_bounds(&self, auto_height_estimate: f32) -> Bounds {
        Bounds::new(
            self.position.x,
            self.position.y,
            self.size.width,
            self.size.height.or_estimate(auto_height_estimate),
        )
    }

    /// Apply a partial update in place.
    pub fn apply(&mut self, patch: &BlockPatch) {
        if let Some(position) = patch.position {
            self.position = position;
        }
        if let Some(size) = patch.size {
            self.size = size;
        }
        if let Some(content) = &patch.content {
            self.content = content.clone();
        }
        if let Some(color_tag) = &patch.color_tag {
            self.color_tag = color_tag.clone();
        }
    }
}

/// Partial block update. `None` fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockPatch {
    #[serde(default)]
    pub position: Option<Point>,
    #[serde(default)]
    pub size: Option<Size>,
    #[serde(default)]
    pub content: Option<String>,
    /// `Some(None)` clears the tag.
    #[serde(default, deserialize_with = "double_option")]
    pub color_tag: Option<Option<String>>,
}

impl BlockPatch {
    pub fn position(position: Point) -> Self {
        Self {
            position: Some(position),
            ..Default::default()
        }
    }

    pub fn size(size: Size) -> Self {
        Self {
            size: Some(size),
            ..Default::default()
        }
    }

    pub fn content(content: impl Into<String>) -> Self {
        Self {
            content: Some(content.into()),
            ..Default::default()
        }
    }
}

/// Distinguishes an explicit `null` (`Some(None)`) from a missing field (`None`).
fn double_option<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

// ─── Connections ─────────────────────────────────────────────────────────

/// A directed edge between two block anchors, rendered as a curve.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Connection {
    pub id: ConnectionId,
    pub from_block: BlockId,
    pub from_side: Side,
    pub to_block: BlockId,
    pub to_side: Side,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub control_point1: Option<Point>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub control_point2: Option<Point>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    /// Set while an endpoint is absorbed into a stack.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub hidden: bool,
    /// The pre-stack block this hidden connection belongs to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_block_id: Option<BlockId>,
}

impl Connection {
    pub fn from_anchor(&self) -> Anchor {
        Anchor::new(self.from_block, self.from_side)
    }

    pub fn to_anchor(&self) -> Anchor {
        Anchor::new(self.to_block, self.to_side)
    }

    pub fn touches(&self, block: BlockId) -> bool {
        self.from_block == block || self.to_block == block
    }

    /// The endpoint that is not `block`, if `block` is one of them.
    pub fn other_end(&self, block: BlockId) -> Option<BlockId> {
        if self.from_block == block {
            Some(self.to_block)
        } else if self.to_block == block {
            Some(self.from_block)
        } else {
            None
        }
    }

    pub fn control_points(&self) -> Option<(Point, Point)> {
        self.control_point1.zip(self.control_point2)
    }
}

/// The caller-supplied part of a new connection; the store assigns the id.
#[derive(Debug, Clone, PartialEq)]
pub struct ConnectionDraft {
    pub from: Anchor,
    pub to: Anchor,
    pub control_points: Option<(Point, Point)>,
    pub color: Option<String>,
}

impl ConnectionDraft {
    pub fn new(from: Anchor, to: Anchor) -> Self {
        Self {
            from,
            to,
            control_points: None,
            color: None,
        }
    }
}

/// Partial connection update. Endpoints are immutable once created.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionPatch {
    /// `Some(None)` drops both stored control points back to router defaults.
    #[serde(default, deserialize_with = "double_option")]
    pub control_points: Option<Option<(Point, Point)>>,
    #[serde(default, deserialize_with = "double_option")]
    pub color: Option<Option<String>>,
}
