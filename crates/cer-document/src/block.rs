//! Block-level document model produced by the parser.
//!
//! The model is format-neutral: each projection (print, word, preview)
//! walks the same block sequence and decides how to present it.

/// A run of inline text with a single emphasis state.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct InlineRun {
    /// Text content of the run.
    pub text: String,
    /// Whether the run is bold.
    pub bold: bool,
}

impl InlineRun {
    /// Create a plain (non-bold) run.
    #[must_use]
    pub fn plain(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            bold: false,
        }
    }

    /// Create a bold run.
    #[must_use]
    pub fn bold(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            bold: true,
        }
    }
}

/// Presentation kind of an embedded diagram.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum EmbedKind {
    /// Pixel image stored next to the document.
    Raster,
    /// Inline vector markup or markup rendered by the presentation surface.
    Vector,
}

/// Where the diagram content comes from.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum EmbedSource {
    /// Path to a rendered image file, relative to the document.
    Path(String),
    /// Inline markup (e.g. an SVG container).
    Markup(String),
    /// Diagram source that was never rendered.
    Pending {
        /// Fence tag of the diagram ("mermaid", "nomnoml").
        dialect: String,
        /// Raw diagram source.
        code: String,
    },
}

/// One block of a parsed document.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Block {
    /// Section heading. Levels 1-4 map from `##` through `#####`.
    Heading {
        level: u8,
        text: String,
        /// Set for levels 1 and 2, which appear in the table of contents.
        anchor_id: Option<String>,
    },
    Paragraph {
        runs: Vec<InlineRun>,
    },
    ListItem {
        runs: Vec<InlineRun>,
        bullet_level: u8,
    },
    Table {
        header: Vec<String>,
        rows: Vec<Vec<String>>,
    },
    CodeBlock {
        /// Empty when the fence carries no language tag.
        language: String,
        text: String,
    },
    Image {
        src: String,
        alt: String,
    },
    DiagramEmbed {
        kind: EmbedKind,
        source: EmbedSource,
        alt_text: String,
    },
    /// A line starting with `<`, passed through untouched.
    RawPassthrough(String),
    /// Horizontal rule (`---`).
    Rule,
}

impl Block {
    /// Plain text carried by the block, with inline markers resolved.
    ///
    /// Used by projections that need a textual fallback and by
    /// round-trip checks.
    pub fn plain_text(&self) -> String {
        match self {
            Self::Heading { text, .. } => text.clone(),
            Self::Paragraph { runs } | Self::ListItem { runs, .. } => {
                runs.iter().map(|r| r.text.as_str()).collect()
            }
            Self::Table { header, rows } => std::iter::once(header)
                .chain(rows)
                .map(|row| row.join(" "))
                .collect::<Vec<_>>()
                .join("\n"),
            Self::CodeBlock { text, .. } => text.clone(),
            Self::Image { alt, .. } | Self::DiagramEmbed { alt_text: alt, .. } => alt.clone(),
            Self::RawPassthrough(raw) => raw.clone(),
            Self::Rule => String::new(),
        }
    }
}

/// Table of contents entry for a level 1 or level 2 heading.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TocEntry {
    /// Heading level (1 or 2).
    pub level: u8,
    /// Heading text.
    pub title: String,
    /// Anchor ID (`section-N` or `subsection-N`).
    pub id: String,
}

/// Result of parsing a document.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ParsedDocument {
    /// Content blocks in source order, cover lines excluded.
    pub blocks: Vec<Block>,
    /// Table of contents entries in source order.
    pub toc: Vec<TocEntry>,
    /// Up to four lines captured for the cover page.
    pub cover_lines: Vec<String>,
    /// Non-fatal issues found while parsing (e.g. unterminated fences).
    pub warnings: Vec<String>,
}

impl ParsedDocument {
    /// Cover title (first captured line).
    pub fn cover_title(&self) -> Option<&str> {
        self.cover_lines.first().map(String::as_str)
    }

    /// Cover subtitle lines (everything after the title).
    pub fn cover_subtitles(&self) -> &[String] {
        self.cover_lines.get(1..).unwrap_or_default()
    }

    /// Heading blocks with their levels, in source order.
    pub fn headings(&self) -> impl Iterator<Item = (u8, &str)> {
        self.blocks.iter().filter_map(|block| match block {
            Block::Heading { level, text, .. } => Some((*level, text.as_str())),
            _ => None,
        })
    }
}
