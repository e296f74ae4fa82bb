//! Markdown rendering
//!
//! Turns a journal entry's block sequence into a Markdown document for
//! the export bundle. Every block kind renders to something; unknown
//! kinds cannot occur because the block content enum is closed.

use crate::database::blocks::{Block, BlockContent, TextFormat, TextStyle};
use crate::database::models::JournalEntry;

/// Render a whole entry: title heading, tag line, then each block in
/// order, blank-line separated.
pub fn render_journal(entry: &JournalEntry) -> String {
    let mut out = String::new();

    out.push_str(&format!("# {}\n", entry.title));
    if !entry.tags.is_empty() {
        out.push_str(&format!("Tags: {}\n", entry.tags.join(", ")));
    }

    for block in entry.sorted_blocks() {
        out.push('\n');
        out.push_str(&render_block(&block));
        out.push('\n');
    }

    out
}

/// Render a single block, without trailing newline.
pub fn render_block(block: &Block) -> String {
    match &block.content {
        BlockContent::Text { text, style, format } => render_text(text, style, format),
        BlockContent::Image { image_id, caption, .. } => {
            let alt = caption.as_deref().unwrap_or("");
            format!("![{alt}](media/{image_id})")
        }
        BlockContent::Todo { text, completed } => {
            let mark = if *completed { "x" } else { " " };
            format!("- [{mark}] {text}")
        }
        BlockContent::Divider => "---".to_string(),
        BlockContent::Quote { text, author } => {
            let mut quoted: String = text
                .lines()
                .map(|line| format!("> {line}"))
                .collect::<Vec<_>>()
                .join("\n");
            if quoted.is_empty() {
                quoted.push_str("> ");
            }
            if let Some(author) = author {
                quoted.push_str(&format!("\n> -- {author}"));
            }
            quoted
        }
        BlockContent::Heading { text, level } => {
            // The model does not restrict the level; clamp at render time.
            let level = (*level).clamp(1, 6) as usize;
            format!("{} {text}", "#".repeat(level))
        }
    }
}

fn render_text(text: &str, style: &TextStyle, format: &TextFormat) -> String {
    match format {
        // Markdown-lite text is already marked up by the author.
        TextFormat::MarkdownLite => text.to_string(),
        TextFormat::Plain => {
            let mut rendered = text.to_string();
            if style.italic {
                rendered = format!("*{rendered}*");
            }
            if style.bold {
                rendered = format!("**{rendered}**");
            }
            rendered
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::blocks::Alignment;
    use crate::database::models::{MetricsCache, Visibility};
    use chrono::Utc;

    fn block(order_index: i64, content: BlockContent) -> Block {
        let now = Utc::now();
        Block {
            id: format!("block-{order_index}"),
            order_index,
            created_at: now,
            updated_at: now,
            content,
        }
    }

    fn entry_with(blocks: Vec<Block>) -> JournalEntry {
        let now = Utc::now();
        JournalEntry {
            id: "journal-1".to_string(),
            owner_id: "user-1".to_string(),
            book_id: "book-1".to_string(),
            title: "A day out".to_string(),
            visibility: Visibility::Private,
            tags: vec!["travel".to_string()],
            blocks,
            metrics: MetricsCache::default(),
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_render_plain_text_with_style() {
        let styled = TextStyle {
            bold: true,
            italic: true,
            size: None,
            color: None,
            alignment: Alignment::Leading,
        };
        let b = block(
            0,
            BlockContent::Text {
                text: "hello".into(),
                style: styled,
                format: TextFormat::Plain,
            },
        );
        assert_eq!(render_block(&b), "***hello***");
    }

    #[test]
    fn test_markdown_lite_passes_through() {
        let b = block(
            0,
            BlockContent::Text {
                text: "already **bold**".into(),
                style: TextStyle::default(),
                format: TextFormat::MarkdownLite,
            },
        );
        assert_eq!(render_block(&b), "already **bold**");
    }

    #[test]
    fn test_render_todo_and_divider() {
        assert_eq!(render_block(&block(0, BlockContent::todo("buy film", false))), "- [ ] buy film");
        assert_eq!(render_block(&block(1, BlockContent::todo("develop film", true))), "- [x] develop film");
        assert_eq!(render_block(&block(2, BlockContent::Divider)), "---");
    }

    #[test]
    fn test_render_quote_with_author() {
        let b = block(
            0,
            BlockContent::Quote {
                text: "line one\nline two".into(),
                author: Some("A. Writer".into()),
            },
        );
        assert_eq!(render_block(&b), "> line one\n> line two\n> -- A. Writer");
    }

    #[test]
    fn test_render_image_uses_caption_as_alt() {
        let b = block(
            0,
            BlockContent::Image {
                image_id: "abc123".into(),
                caption: Some("sunset".into()),
                layout: Default::default(),
                crop: None,
            },
        );
        assert_eq!(render_block(&b), "![sunset](media/abc123)");
        assert_eq!(render_block(&block(1, BlockContent::image("def456"))), "![](media/def456)");
    }

    #[test]
    fn test_heading_level_is_clamped() {
        assert_eq!(render_block(&block(0, BlockContent::heading("Top", 1))), "# Top");
        assert_eq!(render_block(&block(1, BlockContent::heading("Deep", 9))), "###### Deep");
        assert_eq!(render_block(&block(2, BlockContent::heading("Zero", 0))), "# Zero");
    }

    #[test]
    fn test_render_journal_orders_blocks_and_lists_tags() {
        let entry = entry_with(vec![
            block(1, BlockContent::text("world")),
            block(0, BlockContent::heading("hello", 2)),
        ]);

        let doc = render_journal(&entry);
        assert!(doc.starts_with("# A day out\nTags: travel\n"));
        let hello = doc.find("## hello").unwrap();
        let world = doc.find("world").unwrap();
        assert!(hello < world);
    }
}
