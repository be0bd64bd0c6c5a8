//! Conversion between pixel space and PDF space
//!
//! Pixel space has its origin at the top-left with Y growing downward.
//! PDF space has its origin at the bottom-left with Y growing upward.

use super::context::CoordinateSpaceContext;
use crate::types::{InkStroke, OverlayError, Point, Rect, Result};

/// Unwrap an optional context, rejecting one without usable scale factors.
pub fn require_context(ctx: Option<&CoordinateSpaceContext>) -> Result<&CoordinateSpaceContext> {
    match ctx {
        Some(ctx) if ctx.has_valid_scale() => Ok(ctx),
        _ => Err(OverlayError::MissingCoordinateContext),
    }
}

/// Map a pixel-space point to PDF space.
pub fn to_pdf_space(point: Point, ctx: &CoordinateSpaceContext) -> Result<Point> {
    let ctx = require_context(Some(ctx))?;
    Ok(Point::new(
        point.x * ctx.scale_x(),
        ctx.pdf_page_height() - point.y * ctx.scale_y(),
    ))
}

/// Map a PDF-space point back to pixel space (inverse of [`to_pdf_space`]).
pub fn to_pixel_space(point: Point, ctx: &CoordinateSpaceContext) -> Result<Point> {
    let ctx = require_context(Some(ctx))?;
    Ok(Point::new(
        point.x / ctx.scale_x(),
        (ctx.pdf_page_height() - point.y) / ctx.scale_y(),
    ))
}

/// Convert both corners of a pixel rect and re-normalize after the flip.
pub fn to_pdf_rect(rect: &Rect, ctx: &CoordinateSpaceContext) -> Result<Rect> {
    let a = to_pdf_space(Point::new(rect.min_x, rect.min_y), ctx)?;
    let b = to_pdf_space(Point::new(rect.max_x, rect.max_y), ctx)?;
    Ok(Rect::from_corners(a, b))
}

pub fn to_pixel_rect(rect: &Rect, ctx: &CoordinateSpaceContext) -> Result<Rect> {
    let a = to_pixel_space(Point::new(rect.min_x, rect.min_y), ctx)?;
    let b = to_pixel_space(Point::new(rect.max_x, rect.max_y), ctx)?;
    Ok(Rect::from_corners(a, b))
}

/// Convert every point of every stroke. Stroke widths are scaled by the
/// mean of the two scale factors so they keep their visual weight.
pub fn to_pdf_strokes(strokes: &[InkStroke], ctx: &CoordinateSpaceContext) -> Result<Vec<InkStroke>> {
    let ctx = require_context(Some(ctx))?;
    let width_scale = (ctx.scale_x() + ctx.scale_y()) / 2.0;

    strokes
        .iter()
        .map(|stroke| {
            let points = stroke
                .points
                .iter()
                .map(|p| to_pdf_space(*p, ctx))
                .collect::<Result<Vec<_>>>()?;
            let mut style = stroke.style;
            style.stroke_width *= width_scale;
            Ok(InkStroke::new(points, style))
        })
        .collect()
}

/// A pixel rect spanning more than `max_ratio` of either rendered page
/// dimension is treated as unreliable.
pub fn is_unreliable_rect(rect: &Rect, ctx: &CoordinateSpaceContext, max_ratio: f64) -> bool {
    let rect = rect.normalized();
    rect.width() > ctx.rendered_page_width() * max_ratio
        || rect.height() > ctx.rendered_page_height() * max_ratio
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_scale_is_rejected() {
        let ctx = CoordinateSpaceContext::capture(0.0, 0.0, 612.0, 792.0, 1.0, 1.0);
        let result = to_pdf_space(Point::new(1.0, 1.0), &ctx);
        assert!(matches!(result, Err(OverlayError::MissingCoordinateContext)));
        assert!(require_context(None).is_err());
    }

    #[test]
    fn test_stroke_width_follows_scale() {
        let ctx = CoordinateSpaceContext::capture(1224.0, 1584.0, 612.0, 792.0, 1.0, 1.0);
        let stroke = InkStroke::new(vec![Point::new(0.0, 0.0)], Default::default());
        let converted = to_pdf_strokes(&[stroke], &ctx).unwrap();
        assert!((converted[0].style.stroke_width - 1.0).abs() < 1e-12);
        assert_eq!(converted[0].points[0], Point::new(0.0, 792.0));
    }
}
