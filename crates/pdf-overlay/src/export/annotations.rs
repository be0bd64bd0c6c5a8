//! Drawing stored annotations onto a loaded document

use super::report::ExportReport;
use crate::annotation::{AnnotationKind, AnnotationRecord};
use crate::embed::{embed, resolve_position};
use crate::geometry::{CoordinateSpaceContext, reconcile_bounds};
use crate::options::{ExportOptions, MissingContextPolicy};
use crate::pdf::{PageHandle, PdfHandle};
use crate::raster::rasterize;
use crate::types::{OverlayError, Rect, Result};

/// Apply every annotation, recording the ones that cannot be applied.
pub(crate) fn apply_annotations(
    pdf: &mut PdfHandle,
    annotations: &[AnnotationRecord],
    options: &ExportOptions,
    report: &mut ExportReport,
) {
    for annotation in annotations {
        if !annotation.has_usable_geometry() {
            report.skip(&annotation.id, "no usable geometry");
            continue;
        }
        let page = match pdf.page(annotation.page_index) {
            Ok(page) => page,
            Err(e) => {
                report.skip(&annotation.id, e.to_string());
                continue;
            }
        };

        let (working, degraded) = match positioned(annotation, &page, options) {
            Ok(found) => found,
            Err(e) => {
                report.skip(&annotation.id, e.to_string());
                continue;
            }
        };

        match apply_one(pdf, &page, &working, options) {
            Ok(()) => {
                report.annotations_applied += 1;
                if degraded {
                    report.annotations_degraded += 1;
                    log::warn!(
                        "Annotation {} placed without a coordinate context",
                        annotation.id
                    );
                }
            }
            Err(e) => report.skip(&annotation.id, e.to_string()),
        }
    }
}

/// The annotation with PDF geometry derived under the export's bounds
/// policy, and whether it had to be positioned without its own coordinate
/// context. Stored PDF geometry is never reused.
fn positioned(
    annotation: &AnnotationRecord,
    page: &PageHandle,
    options: &ExportOptions,
) -> Result<(AnnotationRecord, bool)> {
    let (ctx, degraded) = match annotation.context().filter(|c| c.has_valid_scale()) {
        Some(ctx) => (*ctx, false),
        None => match options.missing_context {
            MissingContextPolicy::Skip => return Err(OverlayError::MissingCoordinateContext),
            MissingContextPolicy::Unpositioned => (
                CoordinateSpaceContext::identity(page.width(), page.height()),
                true,
            ),
        },
    };
    let mut working = annotation.clone();
    working.derive_pdf_geometry(ctx, &options.bounds)?;
    Ok((working, degraded))
}

fn apply_one(
    pdf: &mut PdfHandle,
    page: &PageHandle,
    annotation: &AnnotationRecord,
    options: &ExportOptions,
) -> Result<()> {
    match annotation.kind {
        AnnotationKind::Ink | AnnotationKind::Stamp => {
            let strokes = annotation.ink_strokes();
            let (bounds, source) = reconcile_bounds(
                annotation.pixel_geometry().rect.as_ref(),
                strokes,
                annotation.context(),
                &options.bounds,
            )?;
            log::debug!("Annotation {} bounds from {:?}", annotation.id, source);
            let bitmap = rasterize(strokes, &bounds, options.supersample, options.padding)?;
            let placement = resolve_position(annotation, &bounds)?;
            embed(pdf, page.index, &bitmap, &placement, false)
        }
        AnnotationKind::Highlight => {
            let rect = page_rect(annotation, page)?;
            let style = annotation.style();
            pdf.draw_rect(page, &rect, style.color, style.opacity)
        }
        AnnotationKind::Text => {
            let contents = annotation
                .contents()
                .filter(|c| !c.trim().is_empty())
                .ok_or_else(|| OverlayError::IncompleteAnnotation("text has no contents".to_string()))?;
            let rect = page_rect(annotation, page)?;
            pdf.draw_text(page, contents, (rect.min_x, rect.max_y), annotation.style().color)
        }
    }
}

/// Derived PDF rect moved into the page's MediaBox
fn page_rect(annotation: &AnnotationRecord, page: &PageHandle) -> Result<Rect> {
    let rect = annotation
        .pdf_geometry()
        .and_then(|g| g.rect)
        .ok_or_else(|| OverlayError::IncompleteAnnotation("no rect".to_string()))?;
    Ok(Rect::new(
        rect.min_x + page.media_box.min_x,
        rect.min_y + page.media_box.min_y,
        rect.max_x + page.media_box.min_x,
        rect.max_y + page.media_box.min_y,
    ))
}
