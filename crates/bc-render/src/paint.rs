//! Imperative paint layer: direct path updates on already-rendered curves.
//!
//! This is the only way per-frame feedback reaches the screen. A paint layer
//! can rewrite a curve's geometry by id and nothing else, and it is only
//! ever handed shared references to the stores, so frame-rate updates cannot
//! leak into the document.

use bc_core::id::ConnectionId;
use std::collections::HashMap;

pub trait PaintLayer {
    /// Replace the path data of the rendered curve for `connection`.
    fn set_path_data(&mut self, connection: ConnectionId, d: &str);
}

/// Keeps the last path written per connection. Used by headless hosts and
/// to observe what a frame painted.
#[derive(Debug, Clone, Default)]
pub struct RecordingLayer {
    paths: HashMap<ConnectionId, String>,
    writes: usize,
}

impl RecordingLayer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn path(&self, connection: ConnectionId) -> Option<&str> {
        self.paths.get(&connection).map(String::as_str)
    }

    /// Total `set_path_data` calls since creation.
    pub fn writes(&self) -> usize {
        self.writes
    }
}

impl PaintLayer for RecordingLayer {
    fn set_path_data(&mut self, connection: ConnectionId, d: &str) {
        self.writes += 1;
        self.paths.insert(connection, d.to_owned());
    }
}
