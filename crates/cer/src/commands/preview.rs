//! `cer preview` command implementation.

use std::fmt::Write;
use std::path::PathBuf;

use cer_render::{DEFAULT_MERMAID_SCRIPT_URL, render_preview};
use clap::Args;

use crate::error::CliError;
use crate::output::Output;

const PREVIEW_CSS: &str = "body{font-family:'Segoe UI',Arial,sans-serif;max-width:900px;\
margin:2rem auto;padding:0 1rem;line-height:1.6;color:#2C3E50}\
h1,h2{color:#2C3E50;border-bottom:2px solid #3498DB;padding-bottom:.3rem}\
pre{background:#F8F9FA;border-left:4px solid #3498DB;padding:1rem;overflow-x:auto}\
code{font-family:Consolas,monospace}\
pre.mermaid,pre.nomnoml{background:none;border:none;text-align:center}";

/// Arguments for the preview command.
#[derive(Args)]
pub(crate) struct PreviewArgs {
    /// Path to the report markdown file.
    input: PathBuf,

    /// Output HTML file (default: `<input>.preview.html`).
    #[arg(short, long)]
    output: Option<PathBuf>,
}

impl PreviewArgs {
    /// Execute the preview command.
    ///
    /// # Errors
    ///
    /// Returns an error if the input cannot be read or the page cannot be written.
    pub(crate) fn execute(self) -> Result<(), CliError> {
        let output = Output::new();

        let markdown = std::fs::read_to_string(&self.input)?;
        let page = preview_page(&render_preview(&markdown));

        let target = self
            .output
            .unwrap_or_else(|| self.input.with_extension("preview.html"));
        std::fs::write(&target, page)?;

        output.written("Preview", &target);
        Ok(())
    }
}

/// Wrap a preview fragment in a standalone page.
///
/// The mermaid runtime draws the `<pre class="mermaid">` blocks in place.
fn preview_page(fragment: &str) -> String {
    let mut page = String::with_capacity(fragment.len() + 1024);
    page.push_str("<!DOCTYPE html>\n<html lang=\"fr\">\n<head>\n<meta charset=\"UTF-8\">\n");
    page.push_str("<title>Aperçu CER</title>\n");
    writeln!(page, "<style>{PREVIEW_CSS}</style>").unwrap();
    writeln!(page, "<script src=\"{DEFAULT_MERMAID_SCRIPT_URL}\"></script>").unwrap();
    page.push_str("<script>mermaid.initialize({ startOnLoad: true });</script>\n");
    page.push_str("</head>\n<body>\n");
    page.push_str(fragment);
    page.push_str("\n</body>\n</html>\n");
    page
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_preview_page_wraps_fragment() {
        let page = preview_page("<h2>Introduction</h2>");
        assert!(page.starts_with("<!DOCTYPE html>"));
        assert!(page.contains("<body>\n<h2>Introduction</h2>\n</body>"));
        assert!(page.contains(DEFAULT_MERMAID_SCRIPT_URL));
    }
}
