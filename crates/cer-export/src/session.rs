//! Per-export state, moved from one pipeline stage to the next.
//!
//! Each stage consumes the previous one and returns a new value, so a
//! stage can only run on the output it depends on and the text at every
//! step is a fresh immutable string.

use std::collections::HashMap;

use cer_diagrams::{DiagramAdapter, DiagramBlock, DiagramPass, Dialect, extract_all};
use cer_document::{ParsedDocument, parse_document};

use crate::code_images::embed_code_images;

/// Raw report text owned for the duration of one export.
#[derive(Clone, Debug)]
pub struct ExportSession {
    source: String,
}

impl ExportSession {
    pub fn new(source: impl Into<String>) -> Self {
        Self {
            source: source.into().replace("\r\n", "\n"),
        }
    }

    /// Replace captured code blocks with their images.
    #[must_use]
    pub fn with_code_images(self, images: &HashMap<usize, String>) -> Self {
        Self {
            source: embed_code_images(&self.source, images),
        }
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    /// Locate every diagram block in the text.
    pub fn extract(self) -> ExtractedSession {
        let blocks = extract_all(&self.source, &Dialect::ALL);
        tracing::debug!(count = blocks.len(), "Extracted diagram blocks");
        ExtractedSession {
            source: self.source,
            blocks,
        }
    }
}

/// Text with its diagram blocks located but not yet rendered.
#[derive(Debug)]
pub struct ExtractedSession {
    source: String,
    blocks: Vec<DiagramBlock>,
}

impl ExtractedSession {
    pub fn blocks(&self) -> &[DiagramBlock] {
        &self.blocks
    }

    /// Render the diagrams and substitute them into the text.
    ///
    /// Without an adapter the text is kept as is: diagram fences stay in
    /// place and the projections treat them as pending diagrams.
    pub fn render(self, adapter: Option<&DiagramAdapter>) -> RenderedSession {
        let pass = match adapter {
            Some(adapter) => adapter.render_blocks(&self.source, self.blocks),
            None => DiagramPass {
                text: self.source.clone(),
                ..DiagramPass::default()
            },
        };
        RenderedSession {
            source: self.source,
            pass,
        }
    }
}

/// Text after diagram substitution.
#[derive(Debug)]
pub struct RenderedSession {
    source: String,
    pass: DiagramPass,
}

impl RenderedSession {
    pub fn text(&self) -> &str {
        &self.pass.text
    }

    /// Parse the substituted text into the document model.
    pub fn parse(self) -> ParsedSession {
        let document = parse_document(&self.pass.text);
        for warning in &document.warnings {
            tracing::warn!(warning = %warning, "Document parse warning");
        }
        ParsedSession {
            source: self.source,
            pass: self.pass,
            document,
        }
    }
}

/// Fully processed export input, ready for projection.
#[derive(Debug)]
pub struct ParsedSession {
    source: String,
    pass: DiagramPass,
    document: ParsedDocument,
}

impl ParsedSession {
    /// Text as it was before diagram substitution.
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Diagram artifacts, failures and substituted text.
    pub fn diagrams(&self) -> &DiagramPass {
        &self.pass
    }

    pub fn document(&self) -> &ParsedDocument {
        &self.document
    }

    /// Give up the diagram results once projections are done.
    pub fn into_diagrams(self) -> DiagramPass {
        self.pass
    }
}
