//! Fenced diagram block extraction.
//!
//! Extraction is purely textual: it does not know about other markdown
//! constructs. A block starts at a fence carrying the dialect tag and ends
//! at the next triple backtick, whatever that fence belongs to. A block
//! with no closing fence runs to the end of the input.

use std::ops::Range;

use crate::dialect::Dialect;

const FENCE: &str = "```";

/// A fenced diagram block found in document text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiagramBlock {
    /// Dialect from the opening fence.
    pub dialect: Dialect,
    /// Zero-based position among blocks of the same dialect.
    pub index: usize,
    /// Byte range of the whole block, fences included.
    pub span: Range<usize>,
    /// Text between the fences, untrimmed.
    pub source: String,
    /// Whether the block ran to end of input without a closing fence.
    pub unterminated: bool,
}

impl DiagramBlock {
    /// Diagram source with surrounding whitespace removed.
    pub fn code(&self) -> &str {
        self.source.trim()
    }
}

/// Find all fenced blocks of one dialect, in source order.
pub fn extract(text: &str, dialect: Dialect) -> Vec<DiagramBlock> {
    let opener = format!("{FENCE}{}", dialect.fence_tag());
    let mut blocks = Vec::new();
    let mut pos = 0;

    while let Some(found) = text[pos..].find(&opener) {
        let start = pos + found;
        let after_tag = start + opener.len();

        // The tag must end the opening line (```mermaid, not ```mermaidjs).
        let line_end = text[after_tag..]
            .find('\n')
            .map_or(text.len(), |i| after_tag + i);
        if !text[after_tag..line_end].trim().is_empty() {
            pos = after_tag;
            continue;
        }

        let body_start = (line_end + 1).min(text.len());
        let (source, end, unterminated) = match text[body_start..].find(FENCE) {
            Some(close) => (
                &text[body_start..body_start + close],
                body_start + close + FENCE.len(),
                false,
            ),
            None => (&text[body_start..], text.len(), true),
        };

        blocks.push(DiagramBlock {
            dialect,
            index: blocks.len(),
            span: start..end,
            source: source.to_owned(),
            unterminated,
        });
        pos = end;
    }

    blocks
}

/// Find blocks of several dialects, merged in source order.
///
/// Blocks overlapping an earlier block (a fence inside another dialect's
/// block) are dropped; indices stay per dialect.
pub fn extract_all(text: &str, dialects: &[Dialect]) -> Vec<DiagramBlock> {
    let mut blocks: Vec<_> = dialects.iter().flat_map(|d| extract(text, *d)).collect();
    blocks.sort_by_key(|b| b.span.start);

    let mut merged: Vec<DiagramBlock> = Vec::with_capacity(blocks.len());
    for block in blocks {
        if merged
            .last()
            .is_some_and(|prev| block.span.start < prev.span.end)
        {
            tracing::debug!(
                dialect = %block.dialect,
                index = block.index,
                "Skipping diagram block nested in another block"
            );
            continue;
        }
        merged.push(block);
    }
    merged
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn test_extract_single_block() {
        let text = "before\n```mermaid\ngraph TD\n  A --> B\n```\nafter";
        let blocks = extract(text, Dialect::Mermaid);

        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0].source, "graph TD\n  A --> B\n");
        assert_eq!(blocks[0].code(), "graph TD\n  A --> B");
        assert_eq!(&text[blocks[0].span.clone()], "```mermaid\ngraph TD\n  A --> B\n```");
        assert!(!blocks[0].unterminated);
    }

    #[test]
    fn test_extract_n_blocks_in_order() {
        let text = (0..5).fold(String::new(), |mut acc, i| {
            acc.push_str(&format!("Paragraph {i}\n\n```nomnoml\n[A{i}] -> [B{i}]\n```\n\n"));
            acc
        });
        let blocks = extract(&text, Dialect::Nomnoml);

        assert_eq!(blocks.len(), 5);
        for (i, block) in blocks.iter().enumerate() {
            assert_eq!(block.index, i);
            assert_eq!(block.code(), format!("[A{i}] -> [B{i}]"));
        }
        assert!(blocks.windows(2).all(|w| w[0].span.end <= w[1].span.start));
    }

    #[test]
    fn test_extract_ignores_other_tags() {
        let text = "```rust\nfn main() {}\n```\n```mermaidjs\nx\n```\n```nomnoml\n[A]\n```";
        assert!(extract(text, Dialect::Mermaid).is_empty());
        assert_eq!(extract(text, Dialect::Nomnoml).len(), 1);
    }

    #[test]
    fn test_unterminated_block_runs_to_end() {
        let text = "intro\n```mermaid\ngraph LR\n  A --> B";
        let blocks = extract(text, Dialect::Mermaid);

        assert_eq!(blocks.len(), 1);
        assert!(blocks[0].unterminated);
        assert_eq!(blocks[0].span.end, text.len());
        assert_eq!(blocks[0].code(), "graph LR\n  A --> B");
    }

    #[test]
    fn test_opener_at_end_of_input() {
        let blocks = extract("text ```mermaid", Dialect::Mermaid);
        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0].source, "");
    }

    #[test]
    fn test_extract_all_merges_dialects() {
        let text = "```nomnoml\n[A]\n```\n```mermaid\ngraph TD\n```\n```nomnoml\n[B]\n```";
        let blocks = extract_all(text, &Dialect::ALL);

        let summary: Vec<_> = blocks.iter().map(|b| (b.dialect, b.index)).collect();
        assert_eq!(
            summary,
            vec![
                (Dialect::Nomnoml, 0),
                (Dialect::Mermaid, 0),
                (Dialect::Nomnoml, 1),
            ]
        );
    }

    #[test]
    fn test_extract_all_drops_overlapping_blocks() {
        // The mermaid block closes on the backticks of the nomnoml opener.
        let text = "```mermaid\ngraph TD\n\n```nomnoml\n[A]\n```";
        let blocks = extract_all(text, &Dialect::ALL);
        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0].dialect, Dialect::Mermaid);
    }
}
