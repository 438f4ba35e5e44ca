//! Output projections for CER documents.
//!
//! Three projections share the same input model:
//! - [`render_print_html`]: a complete HTML page with print CSS, cover
//!   page and table of contents, ready for a PDF printing surface
//! - [`build_word_document`] + [`write_flat_opc`]: a section-grouped
//!   word-processor tree serialized as a WordprocessingML package
//! - [`render_preview`]: a lightweight HTML fragment built straight from
//!   raw text for live display
//!
//! Projections never fail on content shape. Unknown syntax degrades to
//! paragraphs or passthrough; only writing the word package can fail,
//! and only on I/O.
//!
//! # Example
//!
//! ```
//! use cer_document::parse_document;
//! use cer_render::{PrintOptions, render_print_html};
//!
//! let doc = parse_document("Titre\n## Introduction\nTexte");
//! let html = render_print_html(&doc, &PrintOptions::default());
//! assert!(html.contains("<h1 id=\"section-0\" class=\"page-break\">Introduction</h1>"));
//! ```

mod preview;
mod print;
pub mod word;

pub use preview::{detect_language, render_preview};
pub use print::{
    DEFAULT_HEADER_TEXT, DEFAULT_MERMAID_SCRIPT_URL, DEFAULT_TITLE, PrintOptions,
    render_print_html,
};
pub use word::{
    FsImageSource, ImageSource, WordDocument, WordError, build_word_document, svg_data_uri,
    write_flat_opc,
};
