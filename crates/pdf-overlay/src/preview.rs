//! Companion preview raster of a page's overlay
//!
//! Draws the page's ink and highlights onto a transparent canvas the size of
//! the rendered page, so a caller can composite it over its own page render.

use crate::annotation::{AnnotationKind, AnnotationRecord};
use crate::constants::MAX_BITMAP_SIDE;
use crate::options::{ExportOptions, MissingContextPolicy};
use crate::raster::{Bitmap, draw_strokes};
use crate::types::{OverlayError, Point, Result};
use tiny_skia::{Paint, Rect as SkiaRect, Transform};

/// PNG preview of `page_index`, or `None` when no annotation on that page
/// carries a coordinate context to size the canvas from.
pub fn render_overlay_preview(
    annotations: &[AnnotationRecord],
    page_index: usize,
    options: &ExportOptions,
) -> Result<Option<Vec<u8>>> {
    let on_page: Vec<&AnnotationRecord> = annotations
        .iter()
        .filter(|a| a.page_index == page_index && a.has_usable_geometry())
        .collect();
    let Some(canvas_ctx) = on_page
        .iter()
        .find_map(|a| a.context().filter(|c| c.has_valid_scale()))
    else {
        return Ok(None);
    };

    let width = canvas_ctx.rendered_page_width().ceil();
    let height = canvas_ctx.rendered_page_height().ceil();
    let limit = MAX_BITMAP_SIDE as f64;
    if width > limit || height > limit {
        return Err(OverlayError::Config(format!(
            "preview of {width}x{height} exceeds the {MAX_BITMAP_SIDE} pixel limit"
        )));
    }
    let mut bitmap = Bitmap::transparent(width as u32, height as u32)?;

    for annotation in on_page {
        // Annotations captured at another zoom level are rescaled to the canvas
        let scale = match annotation.context() {
            Some(ctx) if ctx.has_valid_scale() && ctx.rendered_page_width() > 0.0 => {
                canvas_ctx.rendered_page_width() / ctx.rendered_page_width()
            }
            _ if options.missing_context == MissingContextPolicy::Unpositioned => 1.0,
            _ => continue,
        };

        match annotation.kind {
            AnnotationKind::Ink | AnnotationKind::Stamp => {
                draw_strokes(
                    bitmap.pixmap_mut(),
                    annotation.ink_strokes(),
                    Point::default(),
                    scale,
                );
            }
            AnnotationKind::Highlight => {
                let Some(rect) = annotation.pixel_geometry().rect else {
                    continue;
                };
                let rect = rect.normalized();
                let Some(area) = SkiaRect::from_xywh(
                    (rect.min_x * scale) as f32,
                    (rect.min_y * scale) as f32,
                    (rect.width() * scale) as f32,
                    (rect.height() * scale) as f32,
                ) else {
                    continue;
                };
                let style = annotation.style();
                let mut paint = Paint::default();
                paint.set_color_rgba8(
                    style.color.r,
                    style.color.g,
                    style.color.b,
                    (style.opacity.clamp(0.0, 1.0) * 255.0).round() as u8,
                );
                bitmap
                    .pixmap_mut()
                    .fill_rect(area, &paint, Transform::identity(), None);
            }
            AnnotationKind::Text => {}
        }
    }

    bitmap.encode_png().map(Some)
}
