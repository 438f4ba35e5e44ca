//! Markdown fragments spliced in place of diagram blocks.
//!
//! Successful renders become an image reference or an inline SVG
//! container. Failures become a warning callout that keeps the original
//! source in a plain-text fence, so the author can fix and re-export.

use std::sync::LazyLock;

use regex::Regex;

use crate::dialect::Dialect;

/// Alt text for raster diagram references.
pub const RASTER_ALT_TEXT: &str = "Schéma";

static XML_PROLOG_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<\?xml.*?\?>|<!DOCTYPE[^>]*>").expect("invalid regex"));

static GOOGLE_FONTS_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"@import\s+url\([^)]*fonts\.googleapis\.com[^)]*\)\s*;?").expect("invalid regex")
});

static LINE_BREAK_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s*\r?\n\s*").expect("invalid regex"));

/// Prepare SVG for inline embedding.
///
/// Drops the XML prolog and doctype, strips Google Fonts imports to avoid
/// external requests, and folds the markup onto one line so the document
/// parser sees the container as a single raw line.
pub fn inline_svg(svg: &str) -> String {
    let svg = XML_PROLOG_RE.replace_all(svg, "");
    let svg = GOOGLE_FONTS_RE.replace_all(&svg, "");
    LINE_BREAK_RE.replace_all(svg.trim(), " ").into_owned()
}

/// Markdown for a rendered vector diagram.
pub fn vector_embed(markup: &str) -> String {
    format!("\n\n<div class=\"mermaid-diagram\">{markup}</div>\n\n")
}

/// Markdown for a rendered raster diagram.
pub fn raster_embed(link: &str) -> String {
    format!("\n![{RASTER_ALT_TEXT}]({link})\n")
}

/// Warning callout shown in place of a diagram that failed to render.
///
/// `index` is the zero-based position among diagrams of the same dialect.
pub fn failure_callout(dialect: Dialect, index: usize, message: &str, code: &str) -> String {
    let message = single_line(message);
    match dialect {
        Dialect::Mermaid => format!(
            "\n> [!WARNING]\n> **Schéma {} non-généré**\n> Erreur: {message}\n>\n> **Code original:**\n\n```text\n{code}\n```\n",
            index + 1
        ),
        Dialect::Nomnoml => format!(
            "\n> [!WARNING]\n> **Schéma non-généré**\n> Erreur de génération: {message}\n\n```\n{code}\n```\n"
        ),
    }
}

fn single_line(message: &str) -> String {
    message.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn test_inline_svg() {
        let svg = "<?xml version=\"1.0\"?>\n<!DOCTYPE svg>\n<svg>\n  <style>@import url('https://fonts.googleapis.com/x');</style>\n  <g/>\n</svg>\n";
        assert_eq!(inline_svg(svg), "<svg> <style></style> <g/> </svg>");
    }

    #[test]
    fn test_vector_embed() {
        assert_eq!(
            vector_embed("<svg/>"),
            "\n\n<div class=\"mermaid-diagram\"><svg/></div>\n\n"
        );
    }

    #[test]
    fn test_raster_embed() {
        assert_eq!(
            raster_embed("diagrams/diagram_0_1.png"),
            "\n![Schéma](diagrams/diagram_0_1.png)\n"
        );
    }

    #[test]
    fn test_mermaid_callout_keeps_source() {
        let callout = failure_callout(Dialect::Mermaid, 1, "HTTP 400:\nSyntax error", "graph TD\n  A -->");
        assert!(callout.contains("**Schéma 2 non-généré**"));
        assert!(callout.contains("> Erreur: HTTP 400: Syntax error\n"));
        assert!(callout.contains("```text\ngraph TD\n  A -->\n```"));
        assert!(!callout.contains("```mermaid"));
    }

    #[test]
    fn test_nomnoml_callout_keeps_source() {
        let callout = failure_callout(Dialect::Nomnoml, 0, "boom", "[A] -> [B]");
        assert!(callout.contains("> Erreur de génération: boom\n"));
        assert!(callout.contains("```\n[A] -> [B]\n```"));
        assert!(!callout.contains("```nomnoml"));
    }
}
