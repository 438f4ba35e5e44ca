//! Preview projection: fast regex conversion of raw report text.
//!
//! This path does not use the document parser. It trades strictness for
//! speed and never fails: anything it does not recognize is passed
//! through as paragraph text.
//!
//! Fenced code blocks are pulled out first and replaced by placeholders,
//! so the inline rules below never touch code. Each non-diagram code
//! block carries a `data-code-index` attribute counting fenced code blocks
//! in source order; the export path uses the same numbering when it swaps
//! captured code images back in.

use std::sync::LazyLock;

use cer_diagrams::Dialect;
use cer_document::escape_html;
use regex::{Captures, Regex};

static FENCE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"```([\w-]+)?[^\S\n]*\n([\s\S]*?)```").expect("invalid regex"));

static INLINE_CODE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"`([^`\n]+)`").expect("invalid regex"));

static HEADING_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^(#{1,5}) +(.+?)[ \t]*$").expect("invalid regex"));

static BOLD_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\*\*(.+?)\*\*").expect("invalid regex"));

static ITALIC_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\*([^*\n]+)\*").expect("invalid regex"));

static LIST_ITEM_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^[ \t]*[*\-•] +(.+?)[ \t]*$").expect("invalid regex"));

static RULE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^---+[ \t]*$").expect("invalid regex"));

static CHUNK_SPLIT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\n[ \t]*\n").expect("invalid regex"));

static PLACEHOLDER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\x00CODE(\d+)\x00").expect("invalid regex"));

/// Tags that already form a block and are not wrapped in `<p>`.
const BLOCK_PREFIXES: [&str; 7] = ["<h", "<ul", "<li", "<pre", "<hr", "<div", "<table"];

/// Convert raw report text to an HTML fragment for live display.
pub fn render_preview(markdown: &str) -> String {
    let text = markdown.replace("\r\n", "\n");

    let mut code_blocks = Vec::new();
    let mut code_index = 0usize;
    let text = FENCE_RE.replace_all(&text, |caps: &Captures| {
        let language = caps.get(1).map_or("", |m| m.as_str());
        let code = caps[2].trim();
        let html = if let Some(dialect) = Dialect::parse(language) {
            format!(
                "<pre class=\"{}\"><code>{}</code></pre>",
                dialect.fence_tag(),
                escape_html(code)
            )
        } else {
            let language = if language.is_empty() {
                detect_language(code)
            } else {
                language
            };
            let html = format!(
                "<pre><code class=\"language-{language}\" data-code-index=\"{code_index}\">{}</code></pre>",
                escape_html(code)
            );
            code_index += 1;
            html
        };
        code_blocks.push(html);
        format!("\n\n\x00CODE{}\x00\n\n", code_blocks.len() - 1)
    });

    let text = INLINE_CODE_RE.replace_all(&text, "<code>$1</code>");
    let text = HEADING_RE.replace_all(&text, |caps: &Captures| {
        let level = caps[1].len();
        format!("<h{level}>{}</h{level}>", &caps[2])
    });
    let text = BOLD_RE.replace_all(&text, "<strong>$1</strong>");
    let text = LIST_ITEM_RE.replace_all(&text, "<li>$1</li>");
    let text = ITALIC_RE.replace_all(&text, "<em>$1</em>");
    let text = RULE_RE.replace_all(&text, "<hr>");

    let mut html = String::with_capacity(text.len() + 256);
    for chunk in CHUNK_SPLIT_RE.split(&text) {
        let chunk = chunk.trim();
        if chunk.is_empty() {
            continue;
        }
        if !html.is_empty() {
            html.push('\n');
        }
        write_chunk(&mut html, chunk);
    }

    PLACEHOLDER_RE
        .replace_all(&html, |caps: &Captures| {
            caps[1]
                .parse::<usize>()
                .ok()
                .and_then(|i| code_blocks.get(i))
                .cloned()
                .unwrap_or_default()
        })
        .into_owned()
}

/// Wrap one blank-line-delimited chunk.
///
/// Consecutive `<li>` lines become one list, block-level tag lines pass
/// through, and remaining lines form a paragraph joined with `<br>`.
fn write_chunk(html: &mut String, chunk: &str) {
    if chunk.starts_with('\x00') {
        html.push_str(chunk);
        return;
    }

    let mut parts: Vec<String> = Vec::new();
    let mut items: Vec<&str> = Vec::new();
    let mut text: Vec<&str> = Vec::new();

    for line in chunk.lines().map(str::trim) {
        if line.starts_with("<li>") {
            flush_paragraph(&mut parts, &mut text);
            items.push(line);
        } else if line.starts_with("</") || BLOCK_PREFIXES.iter().any(|p| line.starts_with(p)) {
            flush_paragraph(&mut parts, &mut text);
            flush_list(&mut parts, &mut items);
            parts.push(line.to_owned());
        } else {
            flush_list(&mut parts, &mut items);
            text.push(line);
        }
    }
    flush_paragraph(&mut parts, &mut text);
    flush_list(&mut parts, &mut items);

    html.push_str(&parts.join("\n"));
}

fn flush_paragraph(parts: &mut Vec<String>, text: &mut Vec<&str>) {
    if !text.is_empty() {
        parts.push(format!("<p>{}</p>", text.join("<br>")));
        text.clear();
    }
}

fn flush_list(parts: &mut Vec<String>, items: &mut Vec<&str>) {
    if !items.is_empty() {
        parts.push(format!("<ul>{}</ul>", items.concat()));
        items.clear();
    }
}

/// Guess the language of an untagged code block.
///
/// Checks run in a fixed order and the first hit wins; `plaintext` when
/// nothing matches.
pub fn detect_language(code: &str) -> &'static str {
    let has = |needle: &str| code.contains(needle);

    if has("function") || has("const ") || has("let ") {
        "javascript"
    } else if has("def ") || has("import ") || has("print(") {
        "python"
    } else if has("<?php") {
        "php"
    } else if has("public class") || has("import java") {
        "java"
    } else if has("SELECT") || has("INSERT") || has("FROM") {
        "sql"
    } else if has("<html") || has("<!DOCTYPE") {
        "html"
    } else if has("{") && (has("color:") || has("margin:")) {
        "css"
    } else if has("$ ") || has("cd ") || has("ls ") {
        "bash"
    } else {
        "plaintext"
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn test_headings_and_paragraphs() {
        let html = render_preview("# Titre\n\n## Section\n\nUn paragraphe\nsur deux lignes.");
        assert_eq!(
            html,
            "<h1>Titre</h1>\n<h2>Section</h2>\n<p>Un paragraphe<br>sur deux lignes.</p>"
        );
    }

    #[test]
    fn test_bold_and_italic() {
        let html = render_preview("Du **gras** et de l'*italique*.");
        assert_eq!(
            html,
            "<p>Du <strong>gras</strong> et de l'<em>italique</em>.</p>"
        );
    }

    #[test]
    fn test_list_items_grouped() {
        let html = render_preview("- un\n- deux\n* trois");
        assert_eq!(html, "<ul><li>un</li><li>deux</li><li>trois</li></ul>");
    }

    #[test]
    fn test_heading_then_list_in_one_chunk() {
        let html = render_preview("### Points\n- un\n- deux");
        assert_eq!(html, "<h3>Points</h3>\n<ul><li>un</li><li>deux</li></ul>");
    }

    #[test]
    fn test_paragraph_then_list_in_one_chunk() {
        let html = render_preview("Deux points :\n- un\n- deux");
        assert_eq!(html, "<p>Deux points :</p>\n<ul><li>un</li><li>deux</li></ul>");
    }

    #[test]
    fn test_rule() {
        assert_eq!(render_preview("avant\n\n---\n\naprès"), "<p>avant</p>\n<hr>\n<p>après</p>");
    }

    #[test]
    fn test_code_blocks_are_indexed_and_protected() {
        let html = render_preview(
            "```rust\nlet x = a * b * c;\n```\n\ntexte\n\n```\nSELECT * FROM t;\n```",
        );
        assert!(html.contains(
            "<pre><code class=\"language-rust\" data-code-index=\"0\">let x = a * b * c;</code></pre>"
        ));
        assert!(html.contains(
            "<pre><code class=\"language-sql\" data-code-index=\"1\">SELECT * FROM t;</code></pre>"
        ));
        assert!(!html.contains("<em>"));
        assert!(html.contains("<p>texte</p>"));
    }

    #[test]
    fn test_diagram_fences_are_not_indexed() {
        let html = render_preview("```mermaid\ngraph TD\n  A --> B\n```\n\n```js\nconst a = 1;\n```");
        assert!(html.contains("<pre class=\"mermaid\"><code>graph TD\n  A --&gt; B</code></pre>"));
        assert!(html.contains("data-code-index=\"0\">const a = 1;"));
    }

    #[test]
    fn test_prefixed_diagram_tag_is_code() {
        let html = render_preview("```kroki-mermaid\ngraph TD\n```");
        assert!(html.contains(
            "<pre><code class=\"language-kroki-mermaid\" data-code-index=\"0\">graph TD</code></pre>"
        ));
        assert!(!html.contains("<pre class="));
    }

    #[test]
    fn test_inline_code() {
        assert_eq!(
            render_preview("Utiliser `cargo build` ici"),
            "<p>Utiliser <code>cargo build</code> ici</p>"
        );
    }

    #[test]
    fn test_unterminated_fence_passes_through() {
        let html = render_preview("```rust\nfn main() {}");
        assert_eq!(html, "<p>```rust<br>fn main() {}</p>");
    }

    #[test]
    fn test_detect_language() {
        assert_eq!(detect_language("function f() {}"), "javascript");
        assert_eq!(detect_language("def f():\n    pass"), "python");
        assert_eq!(detect_language("<?php echo 1;"), "php");
        assert_eq!(detect_language("public class A {}"), "java");
        assert_eq!(detect_language("SELECT 1"), "sql");
        assert_eq!(detect_language("<!DOCTYPE html>"), "html");
        assert_eq!(detect_language("body { color: red; }"), "css");
        assert_eq!(detect_language("$ cargo test"), "bash");
        assert_eq!(detect_language("hello"), "plaintext");
    }

    #[test]
    fn test_text_survives_projection() {
        let input = "## Introduction\n\nPremier paragraphe.\n\n### Détails\n\n- point un\n- point deux";
        let html = render_preview(input);
        for text in ["Introduction", "Premier paragraphe.", "Détails", "point un", "point deux"] {
            assert!(html.contains(text), "missing {text:?}");
        }
    }
}
