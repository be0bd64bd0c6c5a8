//! Signature rasterization with tiny-skia
//!
//! Strokes are drawn onto a transparent canvas sized from their bounds, a
//! padding margin and a supersampling factor. The output depends only on the
//! inputs, so repeated exports produce identical pixels.

use crate::constants::MAX_BITMAP_SIDE;
use crate::types::{InkStroke, OverlayError, Point, Rect, Result};
use tiny_skia::{FillRule, LineCap, LineJoin, Paint, PathBuilder, Pixmap, Stroke, Transform};

/// RGBA raster produced by [`rasterize`]
#[derive(Clone)]
pub struct Bitmap {
    pixmap: Pixmap,
}

impl Bitmap {
    /// Fully transparent bitmap
    pub fn transparent(width: u32, height: u32) -> Result<Self> {
        let pixmap = Pixmap::new(width, height).ok_or_else(|| {
            OverlayError::Config(format!("cannot allocate a {width}x{height} bitmap"))
        })?;
        Ok(Self { pixmap })
    }

    pub fn width(&self) -> u32 {
        self.pixmap.width()
    }

    pub fn height(&self) -> u32 {
        self.pixmap.height()
    }

    /// Straight (non-premultiplied) RGBA of one pixel
    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        self.pixmap.pixel(x, y).map(|p| {
            let c = p.demultiply();
            [c.red(), c.green(), c.blue(), c.alpha()]
        })
    }

    /// Premultiplied RGBA bytes, row-major
    pub fn data(&self) -> &[u8] {
        self.pixmap.data()
    }

    pub fn is_fully_transparent(&self) -> bool {
        self.pixmap.pixels().iter().all(|p| p.alpha() == 0)
    }

    pub fn encode_png(&self) -> Result<Vec<u8>> {
        self.pixmap
            .encode_png()
            .map_err(|e| OverlayError::Encode(e.to_string()))
    }

    pub(crate) fn pixmap_mut(&mut self) -> &mut Pixmap {
        &mut self.pixmap
    }
}

impl PartialEq for Bitmap {
    fn eq(&self, other: &Self) -> bool {
        self.width() == other.width() && self.height() == other.height() && self.data() == other.data()
    }
}

impl std::fmt::Debug for Bitmap {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Bitmap")
            .field("width", &self.width())
            .field("height", &self.height())
            .finish()
    }
}

/// Render `strokes` into a bitmap covering `bounds` plus `padding` on each side.
///
/// The bitmap is `ceil((w + 2p) * s)` by `ceil((h + 2p) * s)` pixels. Every
/// point is translated by `(-min_x + p, -min_y + p)` and then scaled by `s`.
/// Bounds with a zero side yield a 1x1 transparent bitmap.
pub fn rasterize(strokes: &[InkStroke], bounds: &Rect, supersample: f64, padding: f64) -> Result<Bitmap> {
    if !supersample.is_finite() || supersample <= 0.0 {
        return Err(OverlayError::Config(format!(
            "supersample must be a positive number, got {supersample}"
        )));
    }
    if !padding.is_finite() || padding < 0.0 {
        return Err(OverlayError::Config(format!(
            "padding must be zero or positive, got {padding}"
        )));
    }
    if !bounds.is_finite() {
        return Err(OverlayError::Config("signature bounds are not finite".to_string()));
    }

    let bounds = bounds.normalized();
    if bounds.is_degenerate() {
        log::debug!("Degenerate signature bounds, returning a 1x1 bitmap");
        return Bitmap::transparent(1, 1);
    }

    let width = ((bounds.width() + 2.0 * padding) * supersample).ceil();
    let height = ((bounds.height() + 2.0 * padding) * supersample).ceil();
    let limit = MAX_BITMAP_SIDE as f64;
    if width > limit || height > limit {
        return Err(OverlayError::Config(format!(
            "signature bitmap of {width}x{height} exceeds the {MAX_BITMAP_SIDE} pixel limit"
        )));
    }

    let mut bitmap = Bitmap::transparent(width as u32, height as u32)?;
    let origin = Point::new(bounds.min_x - padding, bounds.min_y - padding);
    draw_strokes(bitmap.pixmap_mut(), strokes, origin, supersample);
    Ok(bitmap)
}

/// Draw strokes with `origin` mapped to the canvas' top-left corner.
pub(crate) fn draw_strokes(pixmap: &mut Pixmap, strokes: &[InkStroke], origin: Point, scale: f64) {
    for stroke in strokes {
        let points: Vec<(f32, f32)> = stroke
            .points
            .iter()
            .filter(|p| p.is_finite())
            .map(|p| {
                (
                    ((p.x - origin.x) * scale) as f32,
                    ((p.y - origin.y) * scale) as f32,
                )
            })
            .collect();
        let Some(&(first_x, first_y)) = points.first() else {
            continue;
        };

        let style = &stroke.style;
        let width = (style.stroke_width * scale).max(0.0) as f32;
        if width <= 0.0 {
            continue;
        }
        let mut paint = Paint::default();
        paint.set_color_rgba8(
            style.color.r,
            style.color.g,
            style.color.b,
            (style.opacity.clamp(0.0, 1.0) * 255.0).round() as u8,
        );
        paint.anti_alias = true;

        let is_dot = points
            .iter()
            .all(|&(x, y)| x == first_x && y == first_y);
        if is_dot {
            // A tap leaves a round dot the size of the pen
            if let Some(path) = PathBuilder::from_circle(first_x, first_y, width / 2.0) {
                pixmap.fill_path(&path, &paint, FillRule::Winding, Transform::identity(), None);
            }
            continue;
        }

        let mut builder = PathBuilder::new();
        builder.move_to(first_x, first_y);
        for &(x, y) in &points[1..] {
            builder.line_to(x, y);
        }
        let Some(path) = builder.finish() else {
            continue;
        };

        let pen = Stroke {
            width,
            line_cap: LineCap::Round,
            line_join: LineJoin::Round,
            ..Stroke::default()
        };
        pixmap.stroke_path(&path, &paint, &pen, Transform::identity(), None);
    }
}
