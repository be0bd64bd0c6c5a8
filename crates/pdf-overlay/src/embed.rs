//! Placing rasterized signatures on PDF pages

use crate::annotation::AnnotationRecord;
use crate::geometry::{CoordinateSpaceContext, require_context};
use crate::pdf::PdfHandle;
use crate::raster::Bitmap;
use crate::types::{OverlayError, Placement, Rect, Result};

/// PDF-space placement of pixel-space signature bounds.
///
/// Pixel `min_y` is the top of the signature, so the bottom-left anchor is
/// `pdf_height - min_y * sy - height * sy`.
pub fn calculate_position(bounds: &Rect, ctx: &CoordinateSpaceContext) -> Result<Placement> {
    let ctx = require_context(Some(ctx))?;
    let bounds = bounds.normalized();
    let (sx, sy) = (ctx.scale_x(), ctx.scale_y());
    Ok(Placement::new(
        bounds.min_x * sx,
        ctx.pdf_page_height() - bounds.min_y * sy - bounds.height() * sy,
        bounds.width() * sx,
        bounds.height() * sy,
    ))
}

/// Where an annotation's signature goes.
///
/// The PDF rect already derived on the annotation wins; otherwise the
/// position is recomputed from `pixel_bounds` and the annotation's context.
pub fn resolve_position(annotation: &AnnotationRecord, pixel_bounds: &Rect) -> Result<Placement> {
    if let Some(rect) = annotation
        .pdf_geometry()
        .and_then(|g| g.rect)
        .filter(|r| r.is_finite())
    {
        return Ok(Placement::from_rect(&rect));
    }
    let ctx = require_context(annotation.context())?;
    calculate_position(pixel_bounds, ctx)
}

/// Draw `bitmap` on a page, stretched to `placement`, optionally flattening
/// the form afterwards.
///
/// `placement` is relative to the page's MediaBox origin. The bitmap's pixel
/// size does not affect the drawn size. An out-of-range page or a placement
/// without area fails before the document is touched.
pub fn embed(
    pdf: &mut PdfHandle,
    page_index: usize,
    bitmap: &Bitmap,
    placement: &Placement,
    flatten: bool,
) -> Result<()> {
    let page = pdf.page(page_index)?;
    let finite = [placement.x, placement.y, placement.width, placement.height]
        .iter()
        .all(|v| v.is_finite());
    if !finite {
        return Err(OverlayError::Config(
            "signature placement is not finite".to_string(),
        ));
    }
    if placement.width <= 0.0 || placement.height <= 0.0 {
        return Err(OverlayError::IncompleteAnnotation(format!(
            "signature placement has no area ({}x{})",
            placement.width, placement.height
        )));
    }

    let png = bitmap.encode_png()?;
    let image = pdf.embed_png(&png)?;
    let target = Placement::new(
        placement.x + page.media_box.min_x,
        placement.y + page.media_box.min_y,
        placement.width,
        placement.height,
    );
    pdf.draw_image(&page, &image, &target)?;
    log::debug!(
        "Embedded {}x{} signature on page {} at ({:.2}, {:.2}) size {:.2}x{:.2}",
        image.width,
        image.height,
        page_index,
        target.x,
        target.y,
        target.width,
        target.height
    );

    if flatten {
        match pdf.flatten_form() {
            Ok(count) => log::debug!("Flattened {count} widgets after embedding"),
            Err(OverlayError::FormNotFound) => log::debug!("No form to flatten"),
            Err(e) => return Err(e),
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_position_anchors_bottom_left() {
        let ctx = CoordinateSpaceContext::capture(816.0, 1056.0, 612.0, 792.0, 1.0, 1.0);
        let placement = calculate_position(&Rect::new(100.0, 200.0, 300.0, 280.0), &ctx).unwrap();
        assert!((placement.x - 75.0).abs() < 1e-9);
        assert!((placement.width - 150.0).abs() < 1e-9);
        assert!((placement.height - 60.0).abs() < 1e-9);
        // 792 - 150 - 60
        assert!((placement.y - 582.0).abs() < 1e-9);
    }

    #[test]
    fn test_position_requires_context() {
        let ctx = CoordinateSpaceContext::capture(0.0, 1056.0, 612.0, 792.0, 1.0, 1.0);
        let result = calculate_position(&Rect::new(0.0, 0.0, 1.0, 1.0), &ctx);
        assert!(matches!(result, Err(OverlayError::MissingCoordinateContext)));
    }
}
