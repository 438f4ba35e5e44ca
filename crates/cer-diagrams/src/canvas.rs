//! Canvas sizing for raster diagrams.
//!
//! Larger diagrams get a larger canvas. Two complexity signals are used,
//! the number of source lines and the number of `->` arrow tokens, and
//! either one alone is enough to move a diagram up a tier.

/// Canvas dimensions in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Canvas {
    pub width: u32,
    pub height: u32,
}

/// Base canvas for simple diagrams.
pub const BASE_CANVAS: Canvas = Canvas {
    width: 800,
    height: 600,
};

/// Canvas for diagrams with more than 15 lines or 10 arrows.
pub const MEDIUM_CANVAS: Canvas = Canvas {
    width: 1000,
    height: 800,
};

/// Canvas for diagrams with more than 25 lines or 20 arrows.
pub const LARGE_CANVAS: Canvas = Canvas {
    width: 1200,
    height: 1000,
};

const MEDIUM_LINES: usize = 15;
const MEDIUM_ARROWS: usize = 10;
const LARGE_LINES: usize = 25;
const LARGE_ARROWS: usize = 20;

impl Canvas {
    /// Pick a canvas size from diagram source complexity.
    ///
    /// # Example
    ///
    /// ```
    /// use cer_diagrams::{BASE_CANVAS, Canvas};
    ///
    /// assert_eq!(Canvas::for_source("[A] -> [B]"), BASE_CANVAS);
    /// ```
    #[must_use]
    pub fn for_source(source: &str) -> Self {
        Self::for_counts(source.trim().lines().count(), source.matches("->").count())
    }

    /// Pick a canvas size from line and arrow counts.
    #[must_use]
    pub fn for_counts(lines: usize, arrows: usize) -> Self {
        if lines > LARGE_LINES || arrows > LARGE_ARROWS {
            LARGE_CANVAS
        } else if lines > MEDIUM_LINES || arrows > MEDIUM_ARROWS {
            MEDIUM_CANVAS
        } else {
            BASE_CANVAS
        }
    }
}
