//! Diagram renderer abstraction.

use crate::canvas::Canvas;
use crate::dialect::{DiagramFormat, Dialect};

/// Diagram info for rendering.
#[derive(Debug, Clone)]
pub struct DiagramRequest {
    /// Position among diagrams of the same dialect.
    pub index: usize,
    pub dialect: Dialect,
    pub source: String,
    pub format: DiagramFormat,
    /// Target canvas for raster output, when the dialect is drawn on one.
    pub canvas: Option<Canvas>,
}

impl DiagramRequest {
    /// Create a request using the dialect's output format.
    ///
    /// Raster dialects get a canvas sized from the source.
    pub fn new(index: usize, dialect: Dialect, source: impl Into<String>) -> Self {
        let source = source.into();
        let format = dialect.format();
        let canvas = (format == DiagramFormat::Png).then(|| Canvas::for_source(&source));
        Self {
            index,
            dialect,
            source,
            format,
            canvas,
        }
    }
}

/// Turns diagram source into rendered bytes (SVG text or PNG data).
///
/// Implementations must be shareable across the rendering thread pool.
pub trait DiagramRenderer: Send + Sync {
    fn render(&self, request: &DiagramRequest) -> Result<Vec<u8>, DiagramError>;
}

/// Single diagram rendering error.
#[derive(Debug, thiserror::Error)]
#[error("diagram {index}: {kind}")]
pub struct DiagramError {
    pub index: usize,
    pub kind: DiagramErrorKind,
}

impl DiagramError {
    pub fn new(index: usize, kind: DiagramErrorKind) -> Self {
        Self { index, kind }
    }
}

/// Kind of diagram rendering error.
#[derive(Debug, thiserror::Error)]
pub enum DiagramErrorKind {
    #[error("HTTP error: {0}")]
    Http(String),
    #[error("I/O error: {0}")]
    Io(String),
    #[error("invalid PNG data")]
    InvalidPng,
    #[error("rasterization failed: {0}")]
    Raster(String),
    #[error("{0}")]
    Render(String),
}
