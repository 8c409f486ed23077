//! Canvas-level placement rules: extent growth, column snapping, and
//! merge-target search on drop.
//!
//! These functions take block geometry as `(id, Bounds)` pairs so callers
//! can feed either stored geometry or live measurements.

use crate::config::CanvasConfig;
use crate::id::BlockId;
use crate::model::{Bounds, Point};

/// The scrollable size of the virtual canvas.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub width: f32,
    pub height: f32,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            width: 1600.0,
            height: 1200.0,
        }
    }
}

// ─── Extent growth ───────────────────────────────────────────────────────

/// Grow `current` so the content keeps room to expand. Never shrinks.
///
/// Each axis grows independently to `content_max + growth_padding` once the
/// content's far edge exceeds `growth_trigger` of that axis.
pub fn expand_to_fit(
    current: Viewport,
    bounds: impl IntoIterator<Item = Bounds>,
    config: &CanvasConfig,
) -> Viewport {
    let (max_x, max_y) = bounds
        .into_iter()
        .fold((0.0f32, 0.0f32), |(mx, my), b| (mx.max(b.right()), my.max(b.bottom())));

    let grow = |extent: f32, content: f32| {
        if content > extent * config.growth_trigger {
            extent.max(content + config.growth_padding)
        } else {
            extent
        }
    };

    let next = Viewport {
        width: grow(current.width, max_x),
        height: grow(current.height, max_y),
    };
    if next != current {
        log::debug!(
            "canvas extent {}x{} -> {}x{}",
            current.width,
            current.height,
            next.width,
            next.height
        );
    }
    next
}

// ─── Column snap ─────────────────────────────────────────────────────────

/// Snap `x` to the nearest column line (`gap + k * (width + gap)`, `k >= 0`)
/// when it lies within `column_snap_threshold` of it; otherwise return `x`.
pub fn snap_to_column(x: f32, config: &CanvasConfig) -> f32 {
    let pitch = config.column_pitch();
    if pitch <= 0.0 {
        return x;
    }
    let k = ((x - config.column_gap) / pitch).round().max(0.0);
    let line = config.column_gap + k * pitch;
    if (x - line).abs() <= config.column_snap_threshold {
        line
    } else {
        x
    }
}

// ─── Merge target ────────────────────────────────────────────────────────

/// Find the block whose centre is nearest to `center`, strictly within
/// `radius`, ignoring `dragged`. Equidistant candidates resolve to the
/// lowest id.
pub fn find_merge_target(
    dragged: BlockId,
    center: Point,
    candidates: impl IntoIterator<Item = (BlockId, Bounds)>,
    radius: f32,
) -> Option<BlockId> {
    let radius_sq = radius * radius;
    candidates
        .into_iter()
        .filter(|(id, _)| *id != dragged)
        .map(|(id, b)| (id, b.center().distance_sq(center)))
        .filter(|(_, d)| *d < radius_sq)
        .min_by(|(ia, da), (ib, db)| da.total_cmp(db).then_with(|| ia.cmp(ib)))
        .map(|(id, _)| id)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> CanvasConfig {
        CanvasConfig::default()
    }

    #[test]
    fn column_lines_are_gap_plus_pitch() {
        let c = config();
        assert_eq!(snap_to_column(30.0, &c), 24.0);
        assert_eq!(snap_to_column(340.0, &c), 348.0);
        assert_eq!(snap_to_column(700.0, &c), 672.0);
    }

    #[test]
    fn column_snap_threshold_boundary() {
        let c = config();
        assert_eq!(snap_to_column(348.0 + 49.0, &c), 348.0);
        assert_eq!(snap_to_column(348.0 - 49.0, &c), 348.0);
        assert_eq!(snap_to_column(348.0 + 51.0, &c), 399.0);
        assert_eq!(snap_to_column(348.0 - 51.0, &c), 297.0);
    }

    #[test]
    fn negative_x_snaps_to_first_column_only_when_close() {
        let c = config();
        assert_eq!(snap_to_column(-20.0, &c), 24.0);
        assert_eq!(snap_to_column(-200.0, &c), -200.0);
    }

    #[test]
    fn extent_grows_past_trigger_and_never_shrinks() {
        let c = config();
        let start = Viewport {
            width: 1000.0,
            height: 1000.0,
        };
        let grown = expand_to_fit(start, [Bounds::new(600.0, 0.0, 300.0, 200.0)], &c);
        assert_eq!(grown.width, 1300.0);
        assert_eq!(grown.height, 1000.0);

        let same = expand_to_fit(grown, [Bounds::new(0.0, 0.0, 10.0, 10.0)], &c);
        assert_eq!(same, grown);
    }

    #[test]
    fn extent_unchanged_below_trigger() {
        let c = config();
        let start = Viewport {
            width: 1000.0,
            height: 1000.0,
        };
        let out = expand_to_fit(start, [Bounds::new(0.0, 0.0, 800.0, 800.0)], &c);
        assert_eq!(out, start);
    }

    #[test]
    fn merge_target_nearest_within_radius() {
        let dragged = BlockId::intern("lay_drag");
        let near = BlockId::intern("lay_near");
        let far = BlockId::intern("lay_far");
        let found = find_merge_target(
            dragged,
            Point::new(150.0, 100.0),
            [
                (dragged, Bounds::new(0.0, 0.0, 300.0, 200.0)),
                (near, Bounds::new(50.0, 0.0, 300.0, 200.0)),
                (far, Bounds::new(1000.0, 0.0, 300.0, 200.0)),
            ],
            150.0,
        );
        assert_eq!(found, Some(near));
    }

    #[test]
    fn merge_target_ties_break_to_lowest_id() {
        let dragged = BlockId::intern("lay_tie_drag");
        let b = BlockId::intern("lay_tie_b");
        let a = BlockId::intern("lay_tie_a");
        let found = find_merge_target(
            dragged,
            Point::new(0.0, 0.0),
            [
                (b, Bounds::new(40.0, -10.0, 20.0, 20.0)),
                (a, Bounds::new(-60.0, -10.0, 20.0, 20.0)),
            ],
            150.0,
        );
        assert_eq!(found, Some(a));
    }

    #[test]
    fn merge_target_none_outside_radius() {
        let dragged = BlockId::intern("lay_out_drag");
        let other = BlockId::intern("lay_out_other");
        let found = find_merge_target(
            dragged,
            Point::new(0.0, 0.0),
            [(other, Bounds::new(140.0, -10.0, 20.0, 20.0))],
            150.0,
        );
        assert_eq!(found, None);
    }
}
