//! Inline text helpers: bold run resolution and HTML escaping.

use std::sync::LazyLock;

use regex::Regex;

use crate::block::InlineRun;

/// Non-overlapping `**text**` pairs, matched left to right.
static BOLD_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\*\*(.*?)\*\*").expect("invalid regex"));

/// Split text into runs at `**` pairs.
///
/// Markers are removed; an unpaired `**` stays in the plain text.
/// Empty runs are dropped, but a non-empty input always yields at
/// least one run.
///
/// # Example
///
/// ```
/// use cer_document::{InlineRun, resolve_bold};
///
/// let runs = resolve_bold("a **b** c");
/// assert_eq!(runs, vec![
///     InlineRun::plain("a "),
///     InlineRun::bold("b"),
///     InlineRun::plain(" c"),
/// ]);
/// ```
pub fn resolve_bold(text: &str) -> Vec<InlineRun> {
    let mut runs = Vec::new();
    let mut last = 0;

    for caps in BOLD_RE.captures_iter(text) {
        let Some(whole) = caps.get(0) else {
            continue;
        };
        if whole.start() > last {
            runs.push(InlineRun::plain(&text[last..whole.start()]));
        }
        let inner = &caps[1];
        if !inner.is_empty() {
            runs.push(InlineRun::bold(inner));
        }
        last = whole.end();
    }

    if last < text.len() {
        runs.push(InlineRun::plain(&text[last..]));
    }
    if runs.is_empty() && !text.is_empty() {
        runs.push(InlineRun::plain(text));
    }
    runs
}

/// Remove `**` bold markers, keeping the enclosed text.
pub fn strip_bold(text: &str) -> String {
    BOLD_RE.replace_all(text, "$1").into_owned()
}

/// Escape HTML special characters.
pub fn escape_html(s: &str) -> String {
    let mut result = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => result.push_str("&amp;"),
            '<' => result.push_str("&lt;"),
            '>' => result.push_str("&gt;"),
            '"' => result.push_str("&quot;"),
            '\'' => result.push_str("&#x27;"),
            _ => result.push(c),
        }
    }
    result
}
