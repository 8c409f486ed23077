pub mod anchor;
pub mod geometry;
pub mod hit;
pub mod paint;
pub mod route;

pub use anchor::{AnchorResolver, CoordinateSpace, Measurer, OffsetSpace, StaticLayout};
pub use geometry::{build_spline, cubic_point, distance_to_path, spline_path_data};
pub use hit::{SnapTarget, hit_test_block, hit_test_connection, nearest_free_anchor};
pub use paint::{PaintLayer, RecordingLayer};
pub use route::{RoutedPath, default_control_points, default_handles, route_connection, route_draft};
