//! Print projection: a standalone HTML document laid out for pagination.
//!
//! The output is meant for a headless browser that prints it to PDF. Page
//! size, margins, running header and page counter are declared in CSS
//! `@page` rules so the printing surface needs no extra configuration.
//!
//! Layout, in order:
//! - cover page built from the captured cover lines
//! - table of contents page linking every TOC entry to its heading anchor
//! - content, where each level 1 heading starts a new page
//!
//! Consecutive `>` lines form one blockquote. A first line such as
//! `[!WARNING]` turns it into a styled callout, which is how diagram
//! failures show up in the printed report.

use std::fmt::Write;
use std::sync::LazyLock;

use cer_document::{
    Block, EmbedSource, InlineRun, ParsedDocument, escape_html, resolve_bold, strip_bold,
};
use regex::Regex;

const PRINT_CSS: &str = include_str!("print.css");

/// Default running header text.
pub const DEFAULT_HEADER_TEXT: &str = "CER - Compte-Rendu";

/// Default document title.
pub const DEFAULT_TITLE: &str = "CER - Compte Rendu";

/// Default location of the in-surface mermaid runtime.
pub const DEFAULT_MERMAID_SCRIPT_URL: &str =
    "https://cdn.jsdelivr.net/npm/mermaid@10.9.0/dist/mermaid.min.js";

/// Heading of the generated table of contents page.
const TOC_HEADING: &str = "Table des matières";

/// Callout marker on the first quoted line, e.g. `[!WARNING]`.
static CALLOUT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\[!([A-Za-z]+)\]$").expect("invalid regex"));

/// Inline image syntax inside already-escaped paragraph text.
static INLINE_IMAGE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"!\[([^\]]*)\]\(([^)\s]+)\)").expect("invalid regex"));

/// Options for the print projection.
#[derive(Clone, Debug)]
pub struct PrintOptions {
    /// Document `<title>`.
    pub title: String,
    /// Text shown in the top-right page margin.
    pub header_text: String,
    /// Script loaded when unrendered mermaid blocks remain.
    pub mermaid_script_url: String,
    /// Base URL for relative image paths (e.g. `file:///out/`).
    pub base_href: Option<String>,
}

impl Default for PrintOptions {
    fn default() -> Self {
        Self {
            title: DEFAULT_TITLE.to_owned(),
            header_text: DEFAULT_HEADER_TEXT.to_owned(),
            mermaid_script_url: DEFAULT_MERMAID_SCRIPT_URL.to_owned(),
            base_href: None,
        }
    }
}

impl PrintOptions {
    /// Set the running header text.
    #[must_use]
    pub fn with_header_text(mut self, text: impl Into<String>) -> Self {
        self.header_text = text.into();
        self
    }

    /// Set the base URL for relative resources.
    #[must_use]
    pub fn with_base_href(mut self, href: impl Into<String>) -> Self {
        self.base_href = Some(href.into());
        self
    }
}

/// Render a parsed document as a complete, print-ready HTML page.
pub fn render_print_html(doc: &ParsedDocument, options: &PrintOptions) -> String {
    let needs_mermaid = doc.blocks.iter().any(is_pending_mermaid);
    let mut out = String::with_capacity(16 * 1024);

    out.push_str("<!DOCTYPE html>\n<html lang=\"fr\">\n<head>\n<meta charset=\"UTF-8\">\n");
    if let Some(base) = &options.base_href {
        writeln!(out, "<base href=\"{}\">", escape_html(base)).unwrap();
    }
    writeln!(out, "<title>{}</title>", escape_html(&options.title)).unwrap();
    out.push_str("<style>\n");
    out.push_str(PRINT_CSS);
    writeln!(
        out,
        "@page {{ @top-right {{ content: \"{}\"; font-size: 8px; color: #7f8c8d; }} }}",
        css_string(&options.header_text)
    )
    .unwrap();
    out.push_str("</style>\n");
    if needs_mermaid {
        write_mermaid_runtime(&mut out, &options.mermaid_script_url);
    }
    out.push_str("</head>\n<body>\n");

    write_cover(&mut out, doc);
    write_toc(&mut out, doc);

    out.push_str("<div class=\"content page-break\">\n");
    let mut quote = Vec::new();
    for block in &doc.blocks {
        if let Some(line) = quoted_line(block) {
            quote.push(line);
            continue;
        }
        write_quote(&mut out, &mut quote);
        write_block(&mut out, block);
    }
    write_quote(&mut out, &mut quote);
    out.push_str("</div>\n</body>\n</html>\n");
    out
}

fn write_cover(out: &mut String, doc: &ParsedDocument) {
    let Some(title) = doc.cover_title() else {
        return;
    };
    out.push_str("<div class=\"cover-page\">");
    write!(out, "<div class=\"cover-title\">{}</div>", inline_html(title)).unwrap();
    for subtitle in doc.cover_subtitles() {
        write!(out, "<div class=\"cover-subtitle\">{}</div>", inline_html(subtitle)).unwrap();
    }
    out.push_str("<div class=\"cover-divider\"></div></div>\n");
}

fn write_toc(out: &mut String, doc: &ParsedDocument) {
    if doc.toc.is_empty() {
        return;
    }
    writeln!(
        out,
        "<div class=\"toc-container page-break\"><h1>{TOC_HEADING}</h1><ul class=\"toc-list\">"
    )
    .unwrap();
    for entry in &doc.toc {
        let (indent, weight, size) = if entry.level == 1 {
            ("0", "600", "12pt")
        } else {
            ("20px", "400", "11pt")
        };
        writeln!(
            out,
            "<li style=\"margin-left: {indent}; font-weight: {weight}; font-size: {size}\"><a href=\"#{}\"><span class=\"toc-title\">{}</span><span class=\"toc-dots\"></span><span class=\"toc-page\">➤</span></a></li>",
            entry.id,
            escape_html(&entry.title)
        )
        .unwrap();
    }
    out.push_str("</ul></div>\n");
}

fn write_block(out: &mut String, block: &Block) {
    match block {
        Block::Heading {
            level,
            text,
            anchor_id,
        } => {
            let tag = format!("h{}", (*level).clamp(1, 4));
            let text = escape_html(text);
            match (anchor_id, level) {
                (Some(id), 1) => {
                    writeln!(out, "<{tag} id=\"{id}\" class=\"page-break\">{text}</{tag}>")
                }
                (Some(id), _) => writeln!(out, "<{tag} id=\"{id}\">{text}</{tag}>"),
                (None, _) => writeln!(out, "<{tag}>{text}</{tag}>"),
            }
            .unwrap();
        }
        Block::Paragraph { runs } => {
            writeln!(out, "<p>{}</p>", runs_html(runs)).unwrap();
        }
        // One list per item; consecutive bullets are not merged here.
        Block::ListItem { runs, .. } => {
            writeln!(out, "<ul><li>{}</li></ul>", runs_html(runs)).unwrap();
        }
        Block::Table { header, rows } => write_table(out, header, rows),
        Block::CodeBlock { language, text } => {
            writeln!(
                out,
                "<pre><code class=\"language-{}\">{}</code></pre>",
                escape_html(language),
                escape_html(text.trim())
            )
            .unwrap();
        }
        Block::Image { src, alt } => {
            writeln!(out, "<img src=\"{}\" alt=\"{}\" />", escape_html(src), escape_html(alt))
                .unwrap();
        }
        Block::DiagramEmbed {
            source, alt_text, ..
        } => write_diagram(out, source, alt_text),
        Block::RawPassthrough(markup) => {
            out.push_str(markup);
            out.push('\n');
        }
        Block::Rule => out.push_str("<hr>\n"),
    }
}

/// Runs of a `>` paragraph with the marker removed.
fn quoted_line(block: &Block) -> Option<Vec<InlineRun>> {
    let Block::Paragraph { runs } = block else {
        return None;
    };
    let first = runs.first().filter(|r| !r.bold)?;
    let rest = first.text.strip_prefix('>')?;
    let rest = rest.strip_prefix(' ').unwrap_or(rest);

    let mut line = Vec::with_capacity(runs.len());
    line.push(InlineRun::plain(rest));
    line.extend(runs[1..].iter().cloned());
    line.retain(|r| !r.text.is_empty());
    Some(line)
}

/// Flush pending quote lines as one blockquote.
fn write_quote(out: &mut String, lines: &mut Vec<Vec<InlineRun>>) {
    if lines.is_empty() {
        return;
    }
    let marker = lines.first().and_then(|first| match first.as_slice() {
        [run] if !run.bold => CALLOUT_RE
            .captures(run.text.trim())
            .map(|caps| caps[1].to_ascii_lowercase()),
        _ => None,
    });
    let body = if marker.is_some() { &lines[1..] } else { &lines[..] };

    match &marker {
        Some(kind) => write!(out, "<blockquote class=\"callout {kind}\">").unwrap(),
        None => out.push_str("<blockquote>"),
    }
    for line in body.iter().filter(|line| !line.is_empty()) {
        write!(out, "<p>{}</p>", runs_html(line)).unwrap();
    }
    out.push_str("</blockquote>\n");
    lines.clear();
}

fn write_table(out: &mut String, header: &[String], rows: &[Vec<String>]) {
    out.push_str("<table class=\"avoid-break\"><thead><tr>");
    for cell in header {
        write!(out, "<th>{}</th>", escape_html(&strip_bold(cell))).unwrap();
    }
    out.push_str("</tr></thead><tbody>");
    for row in rows {
        out.push_str("<tr>");
        for cell in row {
            write!(out, "<td>{}</td>", inline_html(cell)).unwrap();
        }
        out.push_str("</tr>");
    }
    out.push_str("</tbody></table>\n");
}

fn write_diagram(out: &mut String, source: &EmbedSource, alt: &str) {
    match source {
        EmbedSource::Path(src) => {
            writeln!(out, "<img src=\"{}\" alt=\"{}\" />", escape_html(src), escape_html(alt))
                .unwrap();
        }
        EmbedSource::Markup(markup) => {
            out.push_str(markup);
            out.push('\n');
        }
        EmbedSource::Pending { dialect, code } if dialect == "mermaid" => {
            writeln!(
                out,
                "<div class=\"mermaid-container\"><div class=\"mermaid\">\n{}\n</div></div>",
                escape_html(code.trim())
            )
            .unwrap();
        }
        EmbedSource::Pending { dialect, code } => {
            writeln!(
                out,
                "<pre><code class=\"language-{}\">{}</code></pre>",
                escape_html(dialect),
                escape_html(code.trim())
            )
            .unwrap();
        }
    }
}

fn write_mermaid_runtime(out: &mut String, script_url: &str) {
    writeln!(out, "<script src=\"{}\"></script>", escape_html(script_url)).unwrap();
    out.push_str(
        "<script>\n\
         mermaid.initialize({ startOnLoad: false, theme: 'default', securityLevel: 'loose', flowchart: { useMaxWidth: true, htmlLabels: true } });\n\
         document.addEventListener('DOMContentLoaded', () => { mermaid.run({ querySelector: '.mermaid' }); });\n\
         </script>\n",
    );
}

fn is_pending_mermaid(block: &Block) -> bool {
    matches!(
        block,
        Block::DiagramEmbed {
            source: EmbedSource::Pending { dialect, .. },
            ..
        } if dialect == "mermaid"
    )
}

/// Escape text, then render bold runs and inline images.
fn inline_html(text: &str) -> String {
    runs_html(&resolve_bold(text))
}

fn runs_html(runs: &[InlineRun]) -> String {
    let mut html = String::new();
    for run in runs {
        let text = with_inline_images(&escape_html(&run.text));
        if run.bold {
            write!(html, "<strong>{text}</strong>").unwrap();
        } else {
            html.push_str(&text);
        }
    }
    html
}

fn with_inline_images(escaped: &str) -> String {
    INLINE_IMAGE_RE
        .replace_all(escaped, "<img src=\"$2\" alt=\"$1\" />")
        .into_owned()
}

/// Quote a value for a CSS string literal.
fn css_string(value: &str) -> String {
    value
        .chars()
        .filter(|c| !c.is_control())
        .fold(String::with_capacity(value.len()), |mut acc, c| {
            if matches!(c, '"' | '\\') {
                acc.push('\\');
            }
            acc.push(c);
            acc
        })
}
