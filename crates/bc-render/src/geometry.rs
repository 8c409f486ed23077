//! Geometry utilities: cubic sampling, spline construction, path distance.
//!
//! Canvas coordinates are `f32` in the model; curve math runs through kurbo
//! in `f64` and converts back at the edges.

use bc_core::model::Point;
use kurbo::{BezPath, CubicBez, ParamCurve, ParamCurveNearest};

/// Catmull-Rom tension used for connection splines.
pub const SPLINE_TENSION: f32 = 0.5;

/// Accuracy passed to kurbo's nearest-point solver, in canvas units.
const NEAREST_ACCURACY: f64 = 1e-3;

pub fn to_kurbo(p: Point) -> kurbo::Point {
    kurbo::Point::new(p.x as f64, p.y as f64)
}

pub fn from_kurbo(p: kurbo::Point) -> Point {
    Point::new(p.x as f32, p.y as f32)
}

/// Evaluate the cubic bezier `p0 p1 p2 p3` at `t`.
pub fn cubic_point(p0: Point, p1: Point, p2: Point, p3: Point, t: f32) -> Point {
    let curve = CubicBez::new(to_kurbo(p0), to_kurbo(p1), to_kurbo(p2), to_kurbo(p3));
    from_kurbo(curve.eval(t as f64))
}

/// Smooth path through every point in `points`.
///
/// Each consecutive pair becomes one cubic segment whose handles follow the
/// Catmull-Rom tangent rule: `(next - prev) * tension / 3`, with a missing
/// neighbour at either end replaced by the endpoint itself. The path starts
/// and ends exactly at the first and last point. Fewer than two points give
/// an empty path.
pub fn build_spline(points: &[Point], tension: f32) -> BezPath {
    let mut path = BezPath::new();
    if points.len() < 2 {
        return path;
    }
    let k = tension / 3.0;
    let last = points.len() - 1;

    path.move_to(to_kurbo(points[0]));
    for i in 0..last {
        let prev = points[i.saturating_sub(1)];
        let from = points[i];
        let to = points[i + 1];
        let next = points[(i + 2).min(last)];

        let c1 = Point::new(from.x + (to.x - prev.x) * k, from.y + (to.y - prev.y) * k);
        let c2 = Point::new(to.x - (next.x - from.x) * k, to.y - (next.y - from.y) * k);
        path.curve_to(to_kurbo(c1), to_kurbo(c2), to_kurbo(to));
    }
    path
}

/// SVG path data (`d` attribute) for a spline through `points`.
pub fn spline_path_data(points: &[Point]) -> String {
    build_spline(points, SPLINE_TENSION).to_svg()
}

/// Shortest distance from `p` to any segment of `path`.
/// Returns `f32::INFINITY` for an empty path.
pub fn distance_to_path(path: &BezPath, p: Point) -> f32 {
    let target = to_kurbo(p);
    path.segments()
        .map(|seg| seg.nearest(target, NEAREST_ACCURACY).distance_sq)
        .fold(f64::INFINITY, f64::min)
        .sqrt() as f32
}
