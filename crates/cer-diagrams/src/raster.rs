//! SVG rasterization onto fixed-size canvases.
//!
//! Kroki serves nomnoml as SVG only, and word packages cannot carry SVG
//! pictures, so both paths draw the vector markup into a PNG here.

use std::sync::{Arc, LazyLock};

use resvg::tiny_skia::{Color, Pixmap, Transform};
use resvg::usvg::{self, fontdb};

use crate::canvas::Canvas;
use crate::renderer::DiagramErrorKind;

static FONTS: LazyLock<Arc<fontdb::Database>> = LazyLock::new(|| {
    let mut db = fontdb::Database::new();
    db.load_system_fonts();
    tracing::debug!(faces = db.len(), "Loaded system fonts for rasterization");
    Arc::new(db)
});

/// Draw `svg` centered on a white canvas of exactly `canvas` pixels.
///
/// The drawing is scaled to fit while keeping its aspect ratio.
///
/// # Example
///
/// ```
/// use cer_diagrams::{MEDIUM_CANVAS, png_dimensions, rasterize_svg};
///
/// let svg = br#"<svg xmlns="http://www.w3.org/2000/svg" width="10" height="10"/>"#;
/// let png = rasterize_svg(svg, MEDIUM_CANVAS).unwrap();
/// assert_eq!(png_dimensions(&png), Some((1000, 800)));
/// ```
pub fn rasterize_svg(svg: &[u8], canvas: Canvas) -> Result<Vec<u8>, DiagramErrorKind> {
    let tree = parse_tree(svg)?;
    draw(&tree, canvas)
}

/// Draw `svg` at its own aspect ratio, scaled to fit inside `bounds`.
///
/// Used where the picture frame follows the image, as in word packages.
pub fn rasterize_svg_within(svg: &[u8], bounds: Canvas) -> Result<Vec<u8>, DiagramErrorKind> {
    let tree = parse_tree(svg)?;
    let size = tree.size();
    let scale = fit_scale(size.width(), size.height(), bounds);
    let canvas = Canvas {
        width: to_pixels(size.width() * scale),
        height: to_pixels(size.height() * scale),
    };
    draw(&tree, canvas)
}

/// Whether `data` looks like SVG markup rather than binary image data.
pub fn is_svg(data: &[u8]) -> bool {
    let head = &data[..data.len().min(512)];
    String::from_utf8_lossy(head).contains("<svg")
}

fn parse_tree(svg: &[u8]) -> Result<usvg::Tree, DiagramErrorKind> {
    let options = usvg::Options {
        fontdb: Arc::clone(&FONTS),
        ..usvg::Options::default()
    };
    usvg::Tree::from_data(svg, &options).map_err(|e| DiagramErrorKind::Raster(e.to_string()))
}

fn draw(tree: &usvg::Tree, canvas: Canvas) -> Result<Vec<u8>, DiagramErrorKind> {
    let mut pixmap = Pixmap::new(canvas.width, canvas.height).ok_or_else(|| {
        DiagramErrorKind::Raster(format!(
            "invalid canvas {}x{}",
            canvas.width, canvas.height
        ))
    })?;
    pixmap.fill(Color::WHITE);

    let size = tree.size();
    let scale = fit_scale(size.width(), size.height(), canvas);
    let dx = (canvas_len(canvas.width) - size.width() * scale) / 2.0;
    let dy = (canvas_len(canvas.height) - size.height() * scale) / 2.0;
    let transform = Transform::from_row(scale, 0.0, 0.0, scale, dx, dy);
    resvg::render(tree, transform, &mut pixmap.as_mut());

    pixmap
        .encode_png()
        .map_err(|e| DiagramErrorKind::Raster(e.to_string()))
}

fn fit_scale(width: f32, height: f32, canvas: Canvas) -> f32 {
    (canvas_len(canvas.width) / width).min(canvas_len(canvas.height) / height)
}

#[allow(clippy::cast_precision_loss)]
fn canvas_len(pixels: u32) -> f32 {
    pixels as f32
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn to_pixels(len: f32) -> u32 {
    (len.round() as u32).max(1)
}
