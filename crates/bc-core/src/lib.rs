pub mod blocks;
pub mod config;
pub mod connections;
pub mod document;
pub mod id;
pub mod layout;
pub mod model;
pub mod paste;
pub mod snapshot;
pub mod stacking;

pub use blocks::BlockStore;
pub use config::CanvasConfig;
pub use connections::{ConnectionRejected, ConnectionStore};
pub use document::CanvasDocument;
pub use id::{BlockId, ConnectionId};
pub use layout::{Viewport, expand_to_fit, find_merge_target, snap_to_column};
pub use model::*;
pub use paste::{PastePayload, block_from_paste, classify};
pub use snapshot::{Snapshot, SnapshotError};
pub use stacking::{extract_from_stack, merge_into_stack, split_stack};
