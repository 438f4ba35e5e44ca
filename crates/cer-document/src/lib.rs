//! Document model for CER reports.
//!
//! This crate turns report markdown into a flat sequence of typed blocks
//! plus a table of contents and cover-page lines. Every output format is
//! a projection of this one model, so the classification rules live in a
//! single place.
//!
//! The dialect is deliberately narrow: `##` through `#####` headings,
//! pipe tables, `-`/`*`/`•` bullets, fenced code and diagram blocks,
//! whole-line images, `**bold**` and raw lines starting with `<`.
//!
//! # Example
//!
//! ```
//! use cer_document::{Block, parse_document};
//!
//! let doc = parse_document("## Introduction\nLe **contexte** du prosit.");
//! assert_eq!(doc.toc[0].title, "Introduction");
//! assert!(matches!(&doc.blocks[1], Block::Paragraph { runs } if runs.len() == 3));
//! ```

mod block;
mod inline;
mod parser;

pub use block::{Block, EmbedKind, EmbedSource, InlineRun, ParsedDocument, TocEntry};
pub use inline::{escape_html, resolve_bold, strip_bold};
pub use parser::{DEFAULT_ALT_TEXT, DEFAULT_COVER_LINES, DocumentParser, parse_document};
