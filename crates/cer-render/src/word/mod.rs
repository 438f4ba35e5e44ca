//! Word-processor projection.
//!
//! Unlike the print projection, this one is organized by report section,
//! not by linear block order. Level 1 headings whose text starts with one
//! of the known section titles switch the current section; every other
//! block lands in whichever section is open. Blocks before the first
//! known section go to a centered header bucket.
//!
//! The resulting [`WordDocument`] tree is serialized by [`write_flat_opc`]
//! into a single-file WordprocessingML package.

mod media;
mod xml;

use std::sync::LazyLock;

use cer_document::{
    Block, EmbedSource, InlineRun, ParsedDocument, TocEntry, resolve_bold, strip_bold,
};
use regex::Regex;

pub use media::{FsImageSource, ImageSource, decode_data_uri, svg_data_uri};
pub use xml::{WordError, write_flat_opc};

/// Paragraph spacing after a body paragraph, in twentieths of a point.
const PARAGRAPH_SPACING: u32 = 150;
/// Paragraph spacing after bullets and header lines.
const COMPACT_SPACING: u32 = 100;
/// Header bucket font size, in half-points.
const HEADER_FONT_SIZE: u32 = 24;

static IMG_TAG_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"<img\s[^>]*?src="([^"]+)"(?:[^>]*?alt="([^"]*)")?"#).expect("invalid regex")
});

static TAG_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<[^>]*>").expect("invalid regex"));

/// Fixed report sections, in output order.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SectionKind {
    /// Cover lines and anything before the first known section.
    Header,
    TableOfContents,
    Introduction,
    Research,
    Conclusion,
}

impl SectionKind {
    /// All sections in output order.
    pub const ALL: [Self; 5] = [
        Self::Header,
        Self::TableOfContents,
        Self::Introduction,
        Self::Research,
        Self::Conclusion,
    ];

    /// Title emitted as a level 1 heading, if the section has one.
    pub fn title(self) -> Option<&'static str> {
        match self {
            Self::Header => None,
            Self::TableOfContents => Some("Table des matières"),
            Self::Introduction => Some("Introduction"),
            Self::Research => Some("Recherches & Expérimentations"),
            Self::Conclusion => Some("Bilan"),
        }
    }

    /// Recognize a section from level 1 heading text (prefix match).
    pub fn from_heading(text: &str) -> Option<Self> {
        let text = text.trim();
        [
            ("Table des matières", Self::TableOfContents),
            ("Introduction", Self::Introduction),
            ("Recherches", Self::Research),
            ("Bilan", Self::Conclusion),
        ]
        .into_iter()
        .find_map(|(prefix, kind)| text.starts_with(prefix).then_some(kind))
    }

    fn position(self) -> usize {
        match self {
            Self::Header => 0,
            Self::TableOfContents => 1,
            Self::Introduction => 2,
            Self::Research => 3,
            Self::Conclusion => 4,
        }
    }
}

/// Named paragraph styles defined in the package stylesheet.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ParagraphStyle {
    Heading1,
    Heading2,
    Heading3,
    Code,
}

impl ParagraphStyle {
    /// Style ID as referenced from `w:pStyle`.
    pub fn style_id(self) -> &'static str {
        match self {
            Self::Heading1 => "Heading1",
            Self::Heading2 => "Heading2",
            Self::Heading3 => "Heading3",
            Self::Code => "Code",
        }
    }
}

/// A formatted text run.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TextRun {
    pub text: String,
    pub bold: bool,
    pub italic: bool,
    /// Font size in half-points; `None` uses the style default.
    pub size: Option<u32>,
}

impl TextRun {
    /// Plain run with default formatting.
    #[must_use]
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Self::default()
        }
    }
}

impl From<&InlineRun> for TextRun {
    fn from(run: &InlineRun) -> Self {
        Self {
            text: run.text.clone(),
            bold: run.bold,
            ..Self::default()
        }
    }
}

/// Inline content of a paragraph.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum WordRun {
    Text(TextRun),
    /// Picture resolved through an [`ImageSource`] at serialization time.
    Image { src: String, alt: String },
    /// Line break inside the paragraph.
    Break,
}

/// One paragraph with its layout properties.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct WordParagraph {
    pub style: Option<ParagraphStyle>,
    pub centered: bool,
    /// Spacing after, in twentieths of a point.
    pub spacing_after: Option<u32>,
    /// Bullet nesting level; `None` for non-list paragraphs.
    pub bullet_level: Option<u8>,
    pub runs: Vec<WordRun>,
}

impl WordParagraph {
    fn styled(style: ParagraphStyle, text: &str) -> Self {
        Self {
            style: Some(style),
            runs: vec![WordRun::Text(TextRun::new(text))],
            ..Self::default()
        }
    }

    fn centered(runs: Vec<WordRun>) -> Self {
        Self {
            centered: true,
            runs,
            ..Self::default()
        }
    }

    /// Concatenated text of all text runs.
    pub fn text(&self) -> String {
        self.runs
            .iter()
            .filter_map(|run| match run {
                WordRun::Text(t) => Some(t.text.as_str()),
                WordRun::Image { .. } | WordRun::Break => None,
            })
            .collect()
    }
}

/// A table with a highlighted header row.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WordTable {
    /// Header cell text, bold markers removed.
    pub header: Vec<String>,
    /// Body rows; each cell is a sequence of runs. Rows keep their own
    /// cell count.
    pub rows: Vec<Vec<Vec<TextRun>>>,
}

impl WordTable {
    /// Grid width: the widest row, header included.
    pub fn columns(&self) -> usize {
        self.rows
            .iter()
            .map(Vec::len)
            .chain(std::iter::once(self.header.len()))
            .max()
            .unwrap_or(0)
            .max(1)
    }
}

/// Block-level element of a section.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum WordBlock {
    Paragraph(WordParagraph),
    Table(WordTable),
    /// Horizontal divider.
    Rule,
}

/// One section of the output document.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WordSection {
    pub kind: SectionKind,
    pub content: Vec<WordBlock>,
}

/// Section/paragraph/run tree of a word-processor document.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WordDocument {
    /// Sections in output order. The header section is present only when
    /// it has content; the four named sections are always present.
    pub sections: Vec<WordSection>,
    /// Entries listed in the table of contents field.
    pub toc: Vec<TocEntry>,
}

impl WordDocument {
    /// Section of the given kind, if present.
    pub fn section(&self, kind: SectionKind) -> Option<&WordSection> {
        self.sections.iter().find(|s| s.kind == kind)
    }
}

/// Build the word-processor tree for a parsed document.
pub fn build_word_document(doc: &ParsedDocument) -> WordDocument {
    let mut buckets: [Vec<WordBlock>; 5] = Default::default();

    for line in &doc.cover_lines {
        buckets[0].push(header_line(line));
    }

    let mut current = SectionKind::Header;
    for block in &doc.blocks {
        if let Block::Heading { level: 1, text, .. } = block
            && let Some(kind) = SectionKind::from_heading(text)
        {
            current = kind;
            continue;
        }
        match current {
            // Replaced by the generated table of contents.
            SectionKind::TableOfContents => {}
            SectionKind::Header => push_header_block(&mut buckets[0], block),
            _ => push_content_block(&mut buckets[current.position()], block),
        }
    }

    let sections = SectionKind::ALL
        .into_iter()
        .zip(buckets)
        .filter(|(kind, content)| *kind != SectionKind::Header || !content.is_empty())
        .map(|(kind, content)| WordSection { kind, content })
        .collect();

    WordDocument {
        sections,
        toc: doc.toc.clone(),
    }
}

fn header_line(text: &str) -> WordBlock {
    WordBlock::Paragraph(WordParagraph {
        spacing_after: Some(COMPACT_SPACING),
        ..WordParagraph::centered(vec![WordRun::Text(TextRun {
            text: strip_bold(text.trim()),
            size: Some(HEADER_FONT_SIZE),
            ..TextRun::default()
        })])
    })
}

fn push_header_block(out: &mut Vec<WordBlock>, block: &Block) {
    match block {
        Block::Heading { .. } | Block::Paragraph { .. } | Block::ListItem { .. } => {
            out.push(header_line(&block.plain_text()));
        }
        _ => push_content_block(out, block),
    }
}

fn push_content_block(out: &mut Vec<WordBlock>, block: &Block) {
    match block {
        Block::Heading { level, text, .. } => {
            let style = if *level <= 1 {
                ParagraphStyle::Heading2
            } else {
                ParagraphStyle::Heading3
            };
            out.push(WordBlock::Paragraph(WordParagraph::styled(style, text)));
        }
        Block::Paragraph { runs } => out.push(WordBlock::Paragraph(WordParagraph {
            spacing_after: Some(PARAGRAPH_SPACING),
            runs: text_runs(runs),
            ..WordParagraph::default()
        })),
        Block::ListItem { runs, bullet_level } => out.push(WordBlock::Paragraph(WordParagraph {
            spacing_after: Some(COMPACT_SPACING),
            bullet_level: Some(*bullet_level),
            runs: text_runs(runs),
            ..WordParagraph::default()
        })),
        Block::Table { header, rows } => out.push(WordBlock::Table(WordTable {
            header: header.iter().map(|cell| strip_bold(cell)).collect(),
            rows: rows
                .iter()
                .map(|row| {
                    row.iter()
                        .map(|cell| resolve_bold(cell).iter().map(TextRun::from).collect())
                        .collect()
                })
                .collect(),
        })),
        Block::CodeBlock { text, .. } => out.push(code_paragraph(text)),
        Block::Image { src, alt } => out.push(image_paragraph(src, alt)),
        Block::DiagramEmbed {
            source, alt_text, ..
        } => match source {
            EmbedSource::Path(src) => out.push(image_paragraph(src, alt_text)),
            EmbedSource::Markup(markup) => match svg_data_uri(markup) {
                Some(uri) => out.push(image_paragraph(&uri, alt_text)),
                None => out.push(WordBlock::Paragraph(WordParagraph::centered(vec![
                    WordRun::Text(TextRun {
                        text: format!("[{alt_text}]"),
                        italic: true,
                        ..TextRun::default()
                    }),
                ]))),
            },
            EmbedSource::Pending { code, .. } => out.push(code_paragraph(code)),
        },
        Block::RawPassthrough(markup) => push_raw(out, markup),
        Block::Rule => out.push(WordBlock::Rule),
    }
}

fn text_runs(runs: &[InlineRun]) -> Vec<WordRun> {
    runs.iter().map(|r| WordRun::Text(r.into())).collect()
}

fn code_paragraph(code: &str) -> WordBlock {
    let mut runs = Vec::new();
    for (i, line) in code.trim_end().lines().enumerate() {
        if i > 0 {
            runs.push(WordRun::Break);
        }
        runs.push(WordRun::Text(TextRun::new(line)));
    }
    WordBlock::Paragraph(WordParagraph {
        style: Some(ParagraphStyle::Code),
        runs,
        ..WordParagraph::default()
    })
}

fn image_paragraph(src: &str, alt: &str) -> WordBlock {
    WordBlock::Paragraph(WordParagraph::centered(vec![WordRun::Image {
        src: src.to_owned(),
        alt: alt.to_owned(),
    }]))
}

/// Raw HTML: keep `<img>` tags as pictures, otherwise keep the visible text.
fn push_raw(out: &mut Vec<WordBlock>, markup: &str) {
    if let Some(caps) = IMG_TAG_RE.captures(markup) {
        let alt = caps.get(2).map_or("", |m| m.as_str());
        out.push(image_paragraph(&caps[1], alt));
        return;
    }
    let text = TAG_RE.replace_all(markup, "");
    let text = text.trim();
    if !text.is_empty() {
        out.push(WordBlock::Paragraph(WordParagraph {
            spacing_after: Some(PARAGRAPH_SPACING),
            runs: vec![WordRun::Text(TextRun::new(text))],
            ..WordParagraph::default()
        }));
    }
}
