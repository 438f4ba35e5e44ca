//! Swapping fenced code blocks for captured images.
//!
//! The preview numbers every non-diagram code block with
//! `data-code-index`. A captured image is keyed by that index and
//! replaces the matching fence in the source text before export.

use std::collections::HashMap;
use std::sync::LazyLock;

use cer_diagrams::Dialect;
use cer_document::escape_html;
use regex::{Captures, Regex};

static FENCE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"```([\w-]+)?[^\S\n]*\n([\s\S]*?)```").expect("invalid regex"));

/// Characters of code shown in the alt text of an untagged block.
const SNIPPET_LEN: usize = 30;

/// Replace code blocks that have a captured image with an `<img>` line.
///
/// `images` maps a code block index to an image URI, usually a `data:`
/// URI. Diagram fences are skipped and do not consume an index.
pub fn embed_code_images(markdown: &str, images: &HashMap<usize, String>) -> String {
    if images.is_empty() {
        return markdown.to_owned();
    }

    let mut index = 0usize;
    let mut embedded = 0usize;
    let result = FENCE_RE.replace_all(markdown, |caps: &Captures| {
        let language = caps.get(1).map(|m| m.as_str());
        if language.and_then(Dialect::parse).is_some() {
            return caps[0].to_owned();
        }

        let current = index;
        index += 1;
        let Some(src) = images.get(&current) else {
            return caps[0].to_owned();
        };
        embedded += 1;

        let label = match language {
            Some(lang) => lang.to_owned(),
            None => caps[2].trim().chars().take(SNIPPET_LEN).collect(),
        };
        format!(
            "<img src=\"{}\" class=\"code-image\" alt=\"Code {}\" />",
            escape_html(src),
            escape_html(&label)
        )
    });

    tracing::debug!(embedded, "Embedded code images");
    result.into_owned()
}
