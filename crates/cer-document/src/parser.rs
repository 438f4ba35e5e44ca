//! Line-oriented document parser.
//!
//! The parser is a small state machine over input lines. Fenced regions
//! (code, diagram fences, multi-line diagram containers) consume lines
//! verbatim until their terminator; everything else is classified one
//! trimmed line at a time. Tables are the only construct that looks
//! ahead, by exactly one line, to decide when the table ends.

use std::sync::LazyLock;

use regex::Regex;

use crate::block::{Block, EmbedKind, EmbedSource, ParsedDocument, TocEntry};
use crate::inline::{resolve_bold, strip_bold};

/// Default number of leading lines captured for the cover page.
pub const DEFAULT_COVER_LINES: usize = 4;

/// Alt text used when an image or diagram has none.
pub const DEFAULT_ALT_TEXT: &str = "Diagramme";

/// Fence tags recognized as diagram dialects by default.
const DEFAULT_DIAGRAM_LANGUAGES: &[&str] = &["mermaid", "nomnoml"];

/// Opening tag of an inline vector diagram container.
const DIAGRAM_CONTAINER_OPEN: &str = r#"<div class="mermaid-diagram""#;

static BULLET_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[-•*]\s+(.*)$").expect("invalid regex"));

static IMAGE_LINE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"^!\[([^\]]*)\]\(([^)\s]+)(?:\s+"[^"]*")?\)$"#).expect("invalid regex")
});

/// File names produced by the raster diagram pipeline.
static RASTER_DIAGRAM_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?:^|/)diagram_\d+_\d+\.png$").expect("invalid regex"));

/// Heading prefixes and the level they map to, longest first.
const HEADING_PREFIXES: &[(&str, u8)] = &[("##### ", 4), ("#### ", 3), ("### ", 2), ("## ", 1)];

/// Document parser configuration.
///
/// # Example
///
/// ```
/// use cer_document::{Block, DocumentParser};
///
/// let doc = DocumentParser::new().parse("Title\n## Intro\nHello");
/// assert_eq!(doc.cover_lines, vec!["Title"]);
/// assert_eq!(doc.toc[0].id, "section-0");
/// assert_eq!(doc.blocks.len(), 2);
/// ```
#[derive(Clone, Debug)]
pub struct DocumentParser {
    diagram_languages: Vec<String>,
    cover_lines: usize,
}

impl Default for DocumentParser {
    fn default() -> Self {
        Self::new()
    }
}

impl DocumentParser {
    /// Create a parser with default settings.
    #[must_use]
    pub fn new() -> Self {
        Self {
            diagram_languages: DEFAULT_DIAGRAM_LANGUAGES
                .iter()
                .map(|s| (*s).to_owned())
                .collect(),
            cover_lines: DEFAULT_COVER_LINES,
        }
    }

    /// Set the fence tags treated as diagram dialects.
    #[must_use]
    pub fn with_diagram_languages<I, S>(mut self, languages: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.diagram_languages = languages.into_iter().map(Into::into).collect();
        self
    }

    /// Set how many leading lines are captured for the cover page.
    ///
    /// Zero disables cover capture.
    #[must_use]
    pub fn with_cover_lines(mut self, count: usize) -> Self {
        self.cover_lines = count;
        self
    }

    /// Parse markdown text into a document model.
    pub fn parse(&self, input: &str) -> ParsedDocument {
        let mut state = ParseState::new(self);
        let mut lines = input.lines().peekable();
        while let Some(line) = lines.next() {
            state.feed(line, lines.peek().copied());
        }
        state.finish()
    }

    fn is_diagram_language(&self, tag: &str) -> bool {
        self.diagram_languages.iter().any(|l| l == tag)
    }
}

/// Parse markdown text with the default parser.
pub fn parse_document(input: &str) -> ParsedDocument {
    DocumentParser::new().parse(input)
}

#[derive(Default)]
enum Mode {
    #[default]
    Default,
    Table {
        header: Vec<String>,
        rows: Vec<Vec<String>>,
    },
    CodeFence {
        language: String,
        lines: Vec<String>,
    },
    DiagramFence {
        dialect: String,
        lines: Vec<String>,
    },
    DiagramContainer {
        depth: isize,
        lines: Vec<String>,
    },
}

struct ParseState<'a> {
    parser: &'a DocumentParser,
    mode: Mode,
    capturing_cover: bool,
    cover_lines: Vec<String>,
    blocks: Vec<Block>,
    toc: Vec<TocEntry>,
    warnings: Vec<String>,
}

impl<'a> ParseState<'a> {
    fn new(parser: &'a DocumentParser) -> Self {
        Self {
            parser,
            mode: Mode::Default,
            capturing_cover: parser.cover_lines > 0,
            cover_lines: Vec::new(),
            blocks: Vec::new(),
            toc: Vec::new(),
            warnings: Vec::new(),
        }
    }

    fn feed(&mut self, raw: &str, next: Option<&str>) {
        match std::mem::take(&mut self.mode) {
            Mode::Default => self.feed_default(raw, next),
            Mode::Table { header, mut rows } => {
                // Only entered when the previous row saw this line is a row too.
                if let Some(cells) = table_row(raw.trim(), false) {
                    rows.push(cells);
                }
                self.continue_table(header, rows, next);
            }
            Mode::CodeFence {
                language,
                mut lines,
            } => {
                if is_fence(raw) {
                    self.blocks.push(Block::CodeBlock {
                        language,
                        text: lines.join("\n"),
                    });
                } else {
                    lines.push(raw.to_owned());
                    self.mode = Mode::CodeFence { language, lines };
                }
            }
            Mode::DiagramFence { dialect, mut lines } => {
                if is_fence(raw) {
                    self.push_pending_diagram(dialect, lines.join("\n"));
                } else {
                    lines.push(raw.to_owned());
                    self.mode = Mode::DiagramFence { dialect, lines };
                }
            }
            Mode::DiagramContainer { depth, mut lines } => {
                lines.push(raw.to_owned());
                let depth = depth + div_depth_delta(raw);
                if depth <= 0 {
                    self.push_vector_markup(lines.join("\n"));
                } else {
                    self.mode = Mode::DiagramContainer { depth, lines };
                }
            }
        }
    }

    fn feed_default(&mut self, raw: &str, next: Option<&str>) {
        let line = raw.trim();
        if line.is_empty() {
            return;
        }

        if let Some(tag) = line.strip_prefix("```") {
            let tag = tag.split_whitespace().next().unwrap_or_default().to_owned();
            self.mode = if self.parser.is_diagram_language(&tag) {
                Mode::DiagramFence {
                    dialect: tag,
                    lines: Vec::new(),
                }
            } else {
                Mode::CodeFence {
                    language: tag,
                    lines: Vec::new(),
                }
            };
            return;
        }

        if self.capturing_cover {
            if line.starts_with("##") {
                self.capturing_cover = false;
            } else {
                self.cover_lines.push(line.to_owned());
                if self.cover_lines.len() >= self.parser.cover_lines {
                    self.capturing_cover = false;
                }
                return;
            }
        }

        if let Some((level, text)) = heading(line) {
            self.push_heading(level, text);
            return;
        }

        if line.starts_with("---") {
            self.blocks.push(Block::Rule);
            return;
        }

        if let Some(header) = table_row(line, true) {
            self.continue_table(header, Vec::new(), next);
            return;
        }

        if let Some(caps) = BULLET_RE.captures(line) {
            let indent = raw.len() - raw.trim_start().len();
            self.blocks.push(Block::ListItem {
                runs: resolve_bold(&caps[1]),
                bullet_level: u8::try_from(indent / 2).unwrap_or(u8::MAX).min(8),
            });
            return;
        }

        if let Some(caps) = IMAGE_LINE_RE.captures(line) {
            self.push_image(&caps[2], &caps[1]);
            return;
        }

        if line.starts_with('<') {
            if line.starts_with(DIAGRAM_CONTAINER_OPEN) {
                let depth = div_depth_delta(line);
                if depth <= 0 {
                    self.push_vector_markup(line.to_owned());
                } else {
                    self.mode = Mode::DiagramContainer {
                        depth,
                        lines: vec![line.to_owned()],
                    };
                }
            } else {
                self.blocks.push(Block::RawPassthrough(line.to_owned()));
            }
            return;
        }

        self.blocks.push(Block::Paragraph {
            runs: resolve_bold(line),
        });
    }

    /// Keep the table open if the next line is a row, otherwise emit it.
    fn continue_table(&mut self, header: Vec<String>, rows: Vec<Vec<String>>, next: Option<&str>) {
        if next.is_some_and(|n| n.trim().starts_with('|')) {
            self.mode = Mode::Table { header, rows };
        } else {
            self.blocks.push(Block::Table { header, rows });
        }
    }

    fn push_heading(&mut self, level: u8, text: &str) {
        let text = strip_bold(text);
        let anchor_id = match level {
            1 | 2 => {
                let prefix = if level == 1 { "section" } else { "subsection" };
                let id = format!("{prefix}-{}", self.toc.len());
                self.toc.push(TocEntry {
                    level,
                    title: text.clone(),
                    id: id.clone(),
                });
                Some(id)
            }
            _ => None,
        };
        self.blocks.push(Block::Heading {
            level,
            text,
            anchor_id,
        });
    }

    fn push_image(&mut self, src: &str, alt: &str) {
        let alt = if alt.is_empty() { DEFAULT_ALT_TEXT } else { alt }.to_owned();
        if RASTER_DIAGRAM_RE.is_match(src) {
            self.blocks.push(Block::DiagramEmbed {
                kind: EmbedKind::Raster,
                source: EmbedSource::Path(src.to_owned()),
                alt_text: alt,
            });
        } else {
            self.blocks.push(Block::Image {
                src: src.to_owned(),
                alt,
            });
        }
    }

    fn push_pending_diagram(&mut self, dialect: String, code: String) {
        // Only mermaid has an in-surface renderer; other dialects need a raster pass.
        let kind = if dialect == "mermaid" {
            EmbedKind::Vector
        } else {
            EmbedKind::Raster
        };
        self.blocks.push(Block::DiagramEmbed {
            kind,
            source: EmbedSource::Pending { dialect, code },
            alt_text: DEFAULT_ALT_TEXT.to_owned(),
        });
    }

    fn push_vector_markup(&mut self, markup: String) {
        self.blocks.push(Block::DiagramEmbed {
            kind: EmbedKind::Vector,
            source: EmbedSource::Markup(markup),
            alt_text: DEFAULT_ALT_TEXT.to_owned(),
        });
    }

    fn finish(mut self) -> ParsedDocument {
        match std::mem::take(&mut self.mode) {
            Mode::Default => {}
            Mode::Table { header, rows } => self.blocks.push(Block::Table { header, rows }),
            Mode::CodeFence { language, lines } => {
                self.warnings
                    .push("unterminated code fence at end of document".to_owned());
                self.blocks.push(Block::CodeBlock {
                    language,
                    text: lines.join("\n"),
                });
            }
            Mode::DiagramFence { dialect, lines } => {
                self.warnings
                    .push(format!("unterminated {dialect} fence at end of document"));
                self.push_pending_diagram(dialect, lines.join("\n"));
            }
            Mode::DiagramContainer { lines, .. } => {
                self.warnings
                    .push("unclosed diagram container at end of document".to_owned());
                self.push_vector_markup(lines.join("\n"));
            }
        }

        ParsedDocument {
            blocks: self.blocks,
            toc: self.toc,
            cover_lines: self.cover_lines,
            warnings: self.warnings,
        }
    }
}

fn is_fence(raw: &str) -> bool {
    raw.trim_start().starts_with("```")
}

fn heading(line: &str) -> Option<(u8, &str)> {
    HEADING_PREFIXES
        .iter()
        .find_map(|(prefix, level)| line.strip_prefix(prefix).map(|text| (*level, text.trim())))
}

/// Split a `| a | b |` line into trimmed cells.
///
/// Separator rows (containing `---`) yield `None` unless they are the
/// first row of a table.
fn table_row(line: &str, first: bool) -> Option<Vec<String>> {
    let inner = line.strip_prefix('|')?;
    if !first && inner.contains("---") {
        return None;
    }
    let inner = inner.strip_suffix('|').unwrap_or(inner);
    Some(inner.split('|').map(|cell| cell.trim().to_owned()).collect())
}

fn div_depth_delta(line: &str) -> isize {
    let opens = line.matches("<div").count();
    let closes = line.matches("</div>").count();
    opens.cast_signed() - closes.cast_signed()
}
