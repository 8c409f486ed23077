//! Connection routing: anchors + control points → spline path.
//!
//! A connection's curve always runs `start → cp1 → cp2 → end`. When no
//! control points are stored, they are sampled from the ideal cubic bezier
//! whose handles point outward along each anchor's side normal, so the
//! default curve already sits on a smooth bezier before anyone edits it.

use crate::anchor::AnchorResolver;
use crate::geometry::{SPLINE_TENSION, build_spline, cubic_point};
use bc_core::connections::ConnectionStore;
use bc_core::id::{BlockId, ConnectionId};
use bc_core::model::{Connection, Point, Side};
use kurbo::BezPath;

const HANDLE_MIN: f32 = 30.0;
const HANDLE_MAX: f32 = 200.0;

/// Where default control points are sampled on the ideal bezier.
pub const DEFAULT_SAMPLE_T: (f32, f32) = (0.33, 0.66);

/// Outward handle length for an anchor pair `distance` apart.
pub fn handle_offset(distance: f32) -> f32 {
    (0.5 * distance).clamp(HANDLE_MIN, HANDLE_MAX)
}

/// Outward bezier handles for a curve from `start` (leaving `from_side`) to
/// `end` (entering `to_side`).
pub fn default_handles(start: Point, end: Point, from_side: Side, to_side: Side) -> (Point, Point) {
    let offset = handle_offset(start.distance(end));
    let (fx, fy) = from_side.normal();
    let (tx, ty) = to_side.normal();
    (
        start.offset(fx * offset, fy * offset),
        end.offset(tx * offset, ty * offset),
    )
}

/// Control points sampled from the ideal bezier through the default handles.
pub fn default_control_points(start: Point, end: Point, from_side: Side, to_side: Side) -> (Point, Point) {
    let (h1, h2) = default_handles(start, end, from_side, to_side);
    let (t1, t2) = DEFAULT_SAMPLE_T;
    (
        cubic_point(start, h1, h2, end, t1),
        cubic_point(start, h1, h2, end, t2),
    )
}

/// A fully resolved connection curve.
#[derive(Debug, Clone)]
pub struct RoutedPath {
    pub start: Point,
    pub end: Point,
    pub control_points: (Point, Point),
    pub path: BezPath,
}

impl RoutedPath {
    pub fn new(
        start: Point,
        end: Point,
        from_side: Side,
        to_side: Side,
        control_points: Option<(Point, Point)>,
    ) -> Self {
        let control_points = control_points
            .unwrap_or_else(|| default_control_points(start, end, from_side, to_side));
        let (cp1, cp2) = control_points;
        Self {
            start,
            end,
            control_points,
            path: build_spline(&[start, cp1, cp2, end], SPLINE_TENSION),
        }
    }

    /// SVG path data for the paint layer.
    pub fn path_data(&self) -> String {
        self.path.to_svg()
    }
}

/// Route a stored connection. `None` when either endpoint cannot be resolved.
pub fn route_connection(conn: &Connection, resolver: &AnchorResolver<'_>) -> Option<RoutedPath> {
    let start = resolver.resolve_anchor(conn.from_anchor())?;
    let end = resolver.resolve_anchor(conn.to_anchor())?;
    Some(RoutedPath::new(
        start,
        end,
        conn.from_side,
        conn.to_side,
        conn.control_points(),
    ))
}

/// Path data for every visible connection touching `block`.
pub fn route_touching(
    connections: &ConnectionStore,
    block: BlockId,
    resolver: &AnchorResolver<'_>,
) -> Vec<(ConnectionId, String)> {
    connections
        .touching(block)
        .filter_map(|c| route_connection(c, resolver).map(|r| (c.id, r.path_data())))
        .collect()
}

/// Path data for every visible connection (full render).
pub fn route_all(connections: &ConnectionStore, resolver: &AnchorResolver<'_>) -> Vec<(ConnectionId, String)> {
    connections
        .visible()
        .filter_map(|c| match route_connection(c, resolver) {
            Some(r) => Some((c.id, r.path_data())),
            None => {
                log::warn!("connection {} has an unresolvable endpoint", c.id);
                None
            }
        })
        .collect()
}

/// Curve for an in-progress connection draft. An unsnapped endpoint enters
/// from the side facing the source.
pub fn route_draft(start: Point, from_side: Side, end: Point, end_side: Option<Side>) -> RoutedPath {
    RoutedPath::new(
        start,
        end,
        from_side,
        end_side.unwrap_or(from_side.opposite()),
        None,
    )
}
