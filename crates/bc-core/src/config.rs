//! Tunable constants for canvas interaction.
//!
//! Hosts may supply a JSON object with any subset of these fields
//! (camelCase); missing fields keep their defaults.

use crate::model::Point;
use serde::{Deserialize, Serialize};

// ─── Config ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CanvasConfig {
    /// Centre-to-centre distance under which a dropped block merges into a stack.
    pub merge_radius: f32,
    /// Distance under which a connection draft locks onto an anchor.
    pub anchor_snap_radius: f32,
    /// Minimum interval between connection-draft recomputations.
    pub connect_throttle_ms: f64,
    /// Quiescence window before a structural change is handed to persistence.
    pub commit_debounce_ms: f64,
    pub column_width: f32,
    pub column_gap: f32,
    /// A drop within this horizontal distance of a column line snaps to it (inclusive).
    pub column_snap_threshold: f32,
    /// Fraction of the current extent that content may reach before the extent grows.
    pub growth_trigger: f32,
    /// Room added past the content's far edge when the extent grows.
    pub growth_padding: f32,
    /// Per-item offset used when re-placing blocks that leave a stack.
    pub stack_cascade_offset: f32,
    /// Height assumed for `auto`-height blocks when nothing was measured.
    pub auto_height_estimate: f32,
    /// Where synthesized blocks (e.g. snapshot fallback) are placed.
    pub default_block_position: Point,
}

impl Default for CanvasConfig {
    fn default() -> Self {
        Self {
            merge_radius: 150.0,
            anchor_snap_radius: 20.0,
            connect_throttle_ms: 24.0,
            commit_debounce_ms: 1000.0,
            column_width: 300.0,
            column_gap: 24.0,
            column_snap_threshold: 50.0,
            growth_trigger: 0.8,
            growth_padding: 400.0,
            stack_cascade_offset: 30.0,
            auto_height_estimate: 200.0,
            default_block_position: Point::new(100.0, 100.0),
        }
    }
}

impl CanvasConfig {
    /// Parse a host-supplied JSON config, falling back to defaults on error.
    pub fn from_json(json: &str) -> Self {
        match serde_json::from_str(json) {
            Ok(config) => config,
            Err(e) => {
                log::warn!("ignoring invalid canvas config: {e}");
                Self::default()
            }
        }
    }

    /// Distance between consecutive column lines.
    pub fn column_pitch(&self) -> f32 {
        self.column_width + self.column_gap
    }
}
