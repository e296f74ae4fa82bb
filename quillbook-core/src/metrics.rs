//! Metrics calculator
//!
//! Pure derivation of a journal entry's word and image counts from its
//! block sequence. The repository calls this on every block mutation so
//! the cached counts can never drift from the content.

use crate::database::blocks::{Block, BlockContent};
use crate::database::models::MetricsCache;

/// Compute the metrics cache for a block sequence.
///
/// Only text blocks contribute words and only image blocks contribute to
/// the image count; todos, dividers, quotes, and headings carry text or
/// payloads that the journal statistics deliberately ignore.
pub fn compute_metrics(blocks: &[Block]) -> MetricsCache {
    let mut metrics = MetricsCache::default();

    for block in blocks {
        match &block.content {
            BlockContent::Text { text, .. } => {
                metrics.word_count += count_words(text);
            }
            BlockContent::Image { .. } => {
                metrics.image_count += 1;
            }
            BlockContent::Todo { .. }
            | BlockContent::Divider
            | BlockContent::Quote { .. }
            | BlockContent::Heading { .. } => {}
        }
    }

    metrics
}

/// Whitespace-separated token count. Empty and whitespace-only text
/// counts zero words.
pub fn count_words(text: &str) -> u64 {
    text.split_whitespace().count() as u64
}
