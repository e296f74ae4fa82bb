//! Journal content blocks
//!
//! One block is one typed unit of journal content. Blocks are plain
//! values: editing flows clone an existing block, adjust the copy, and
//! hand it back through the repository, which rebuilds the owning entry.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A single content unit inside a journal entry.
///
/// Entry order is defined by `order_index`, not insertion order. Two
/// blocks may briefly share an index mid-edit; stable iteration sorts by
/// `order_index` and keeps ties in their previous relative order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Block {
    pub id: String,
    pub order_index: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub content: BlockContent,
}

/// The closed set of block payloads.
///
/// Every consumer matches exhaustively, so adding a variant fails to
/// compile until metrics and markdown rendering handle it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BlockContent {
    Text {
        text: String,
        #[serde(default)]
        style: TextStyle,
        #[serde(default)]
        format: TextFormat,
    },
    Image {
        image_id: String,
        caption: Option<String>,
        #[serde(default)]
        layout: ImageLayout,
        crop: Option<CropRect>,
    },
    Todo {
        text: String,
        #[serde(default)]
        completed: bool,
    },
    Divider,
    Quote {
        text: String,
        author: Option<String>,
    },
    Heading {
        text: String,
        /// Nominal range is 1-6; the model does not enforce it. The
        /// markdown renderer clamps out-of-range levels at render time.
        level: u8,
    },
}

impl BlockContent {
    /// Plain text paragraph with default styling.
    pub fn text(text: impl Into<String>) -> Self {
        BlockContent::Text {
            text: text.into(),
            style: TextStyle::default(),
            format: TextFormat::default(),
        }
    }

    /// Full-width image without caption or crop.
    pub fn image(image_id: impl Into<String>) -> Self {
        BlockContent::Image {
            image_id: image_id.into(),
            caption: None,
            layout: ImageLayout::default(),
            crop: None,
        }
    }

    pub fn todo(text: impl Into<String>, completed: bool) -> Self {
        BlockContent::Todo {
            text: text.into(),
            completed,
        }
    }

    /// Quote without attribution.
    pub fn quote(text: impl Into<String>) -> Self {
        BlockContent::Quote {
            text: text.into(),
            author: None,
        }
    }

    pub fn heading(text: impl Into<String>, level: u8) -> Self {
        BlockContent::Heading {
            text: text.into(),
            level,
        }
    }
}

/// Inline styling for text blocks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct TextStyle {
    #[serde(default)]
    pub bold: bool,
    #[serde(default)]
    pub italic: bool,
    pub size: Option<f32>,
    pub color: Option<String>,
    #[serde(default)]
    pub alignment: Alignment,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Alignment {
    #[default]
    Leading,
    Center,
    Trailing,
}

/// Interpretation of a text block's `text` field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum TextFormat {
    #[default]
    Plain,
    MarkdownLite,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ImageLayout {
    #[default]
    FullWidth,
    Inline,
    Grid,
}

/// Crop rectangle in fractions of the source image.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CropRect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

/// Payload for adding a block to a journal entry. The repository mints
/// the block id and timestamps.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateBlockRequest {
    pub order_index: i64,
    pub content: BlockContent,
}

/// Stable sort ascending by `order_index`.
pub fn sort_blocks(blocks: &mut [Block]) {
    blocks.sort_by_key(|b| b.order_index);
}
