//! Serializable canvas snapshot: the only thing the core hands to, or
//! accepts from, persistence.
//!
//! Loading never fails. Empty input is an empty canvas; anything that does
//! not parse as a snapshot becomes a single text block holding the raw text,
//! so legacy plain-text notes survive being opened on the canvas.

use crate::config::CanvasConfig;
use crate::model::{Block, BlockKind, Connection};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("snapshot JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("snapshot encode: {0}")]
    Encode(#[from] rmp_serde::encode::Error),
    #[error("snapshot decode: {0}")]
    Decode(#[from] rmp_serde::decode::Error),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    #[serde(default)]
    pub blocks: Vec<Block>,
    #[serde(default)]
    pub connections: Vec<Connection>,
}

impl Snapshot {
    /// Parse host input, falling back per the rules in the module docs.
    pub fn load(raw: &str, config: &CanvasConfig) -> Self {
        if raw.trim().is_empty() {
            return Self::default();
        }
        match serde_json::from_str::<Snapshot>(raw) {
            Ok(snapshot) => snapshot,
            Err(e) => {
                log::warn!("snapshot did not parse ({e}); wrapping raw text in a text block");
                Self::from_text(raw, config)
            }
        }
    }

    /// A snapshot holding one text block with `text` verbatim.
    pub fn from_text(text: &str, config: &CanvasConfig) -> Self {
        Self {
            blocks: vec![Block::new(
                BlockKind::Text,
                config.default_block_position,
                text,
            )],
            connections: Vec::new(),
        }
    }

    pub fn to_json(&self) -> Result<String, SnapshotError> {
        Ok(serde_json::to_string(self)?)
    }

    /// Compact binary form (MessagePack, named fields).
    pub fn to_msgpack(&self) -> Result<Vec<u8>, SnapshotError> {
        Ok(rmp_serde::to_vec_named(self)?)
    }

    pub fn from_msgpack(bytes: &[u8]) -> Result<Self, SnapshotError> {
        Ok(rmp_serde::from_slice(bytes)?)
    }
}
