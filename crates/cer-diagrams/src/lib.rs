//! Diagram extraction and rendering for CER documents.
//!
//! Reports embed two diagram dialects in fenced blocks:
//! - `mermaid` flowcharts, rendered to SVG and inlined in a
//!   `<div class="mermaid-diagram">` container
//! - `nomnoml` UML-style diagrams, fetched as SVG, drawn onto a canvas
//!   sized from the source and saved as PNG files under a `diagrams/`
//!   directory, referenced with image syntax
//!
//! Rendering goes through the [`DiagramRenderer`] trait; [`KrokiRenderer`]
//! is the HTTP implementation. [`DiagramAdapter`] runs the whole
//! substitution pass: extract, render in parallel, splice back once.
//!
//! # Example
//!
//! ```
//! use cer_diagrams::{Dialect, extract};
//!
//! let text = "Intro\n```mermaid\ngraph TD\n  A --> B\n```\n";
//! let blocks = extract(text, Dialect::Mermaid);
//! assert_eq!(blocks.len(), 1);
//! assert_eq!(blocks[0].code(), "graph TD\n  A --> B");
//! ```

mod adapter;
mod cache;
mod canvas;
mod consts;
mod dialect;
mod embed;
mod extract;
mod kroki;
mod naming;
mod png;
mod raster;
mod renderer;

pub use adapter::{ArtifactRef, DiagramAdapter, DiagramArtifact, DiagramFailure, DiagramPass};
pub use cache::{CacheBucket, DiagramKey, FileCache, NullCache};
pub use canvas::{BASE_CANVAS, Canvas, LARGE_CANVAS, MEDIUM_CANVAS};
pub use consts::{DEFAULT_DIAGRAMS_DIR, DEFAULT_KROKI_URL, DEFAULT_TIMEOUT};
pub use dialect::{DiagramFormat, Dialect};
pub use embed::{RASTER_ALT_TEXT, failure_callout, inline_svg};
pub use extract::{DiagramBlock, extract, extract_all};
pub use kroki::{KrokiRenderer, create_agent};
pub use naming::{diagram_file_name, service_image_file_name, unix_millis};
pub use png::png_dimensions;
pub use raster::{is_svg, rasterize_svg, rasterize_svg_within};
pub use renderer::{DiagramError, DiagramErrorKind, DiagramRenderer, DiagramRequest};
