//! Best-effort classification of pasted or dropped foreign payloads.
//!
//! Images become image blocks, a lone URL becomes an embed, multi-line text
//! that looks like source code becomes a code block, and anything else is
//! plain text.

use crate::model::{Block, BlockKind, Point};
use regex::Regex;
use std::sync::LazyLock;

static URL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(https?://|www\.)[^\s/$.?#][^\s]*$").expect("valid URL regex")
});

static CODE_TOKEN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"\b(function|const|let|var|return|import|export|class|def|fn|pub|impl|struct|if|else|for|while|async|await)\b|=>|[{};]|\(\)|==",
    )
    .expect("valid code regex")
});

/// Code-looking tokens needed before multi-line text is treated as code.
const CODE_TOKEN_THRESHOLD: usize = 4;

/// Something the host received from a paste or drop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PastePayload {
    /// An image, already stored by the host; carries its blob reference.
    Image(String),
    Text(String),
}

/// Decide which block kind a payload should become.
pub fn classify(payload: &PastePayload) -> BlockKind {
    match payload {
        PastePayload::Image(_) => BlockKind::Image,
        PastePayload::Text(text) => {
            let trimmed = text.trim();
            if URL.is_match(trimmed) {
                BlockKind::Embed
            } else if looks_like_code(text) {
                BlockKind::Code
            } else {
                BlockKind::Text
            }
        }
    }
}

/// Multiple lines and at least `CODE_TOKEN_THRESHOLD` keyword/symbol hits.
pub fn looks_like_code(text: &str) -> bool {
    text.lines().filter(|l| !l.trim().is_empty()).count() > 1
        && CODE_TOKEN.find_iter(text).count() >= CODE_TOKEN_THRESHOLD
}

/// Build the block a payload turns into at `position`.
pub fn block_from_paste(payload: PastePayload, position: Point) -> Block {
    let kind = classify(&payload);
    let content = match payload {
        PastePayload::Image(reference) => reference,
        PastePayload::Text(text) if kind == BlockKind::Embed => text.trim().to_string(),
        PastePayload::Text(text) => text,
    };
    Block::new(kind, position, content)
}
