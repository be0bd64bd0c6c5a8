//! Boundary with the rendering engine that collects ink
//!
//! The engine implements [`AnnotationProvider`] once. Everything it hands
//! over is turned into [`AnnotationRecord`]s right here, so the rest of the
//! crate never sees engine-shaped data.

use crate::annotation::{AnnotationKind, AnnotationRecord, Geometry};
use crate::geometry::{BoundsPolicy, CoordinateSpaceContext};
use crate::store::{DocumentId, DocumentStore, FieldValueMap};
use crate::types::{InkStroke, Result};
use std::future::Future;

/// In-progress ink of one page, in pixel space
#[derive(Debug, Clone, PartialEq)]
pub struct PageInk {
    pub page_index: usize,
    pub strokes: Vec<InkStroke>,
    /// Context active when the strokes were drawn
    pub context: Option<CoordinateSpaceContext>,
}

/// Snapshot of the engine's annotation state
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ProviderState {
    pub active_tool: Option<AnnotationKind>,
    pub pages: Vec<PageInk>,
}

pub trait AnnotationProvider: Send + Sync {
    /// Switch the engine's active drawing tool
    fn toggle_tool(&mut self, kind: AnnotationKind);

    /// Finish any in-progress stroke. [`state`](Self::state) is only final
    /// once this resolves.
    fn commit(&mut self) -> impl Future<Output = Result<()>> + Send;

    /// Drop all uncommitted and committed ink
    fn clear(&mut self);

    fn state(&self) -> ProviderState;
}

/// Commit the provider's ink and append it to the document's annotations.
///
/// One ink annotation is created per page with strokes. Pages without a
/// usable context keep their pixel geometry only. Returns the new records.
pub async fn capture_annotations<P, S>(
    provider: &mut P,
    store: &S,
    id: &DocumentId,
    policy: &BoundsPolicy,
) -> Result<Vec<AnnotationRecord>>
where
    P: AnnotationProvider,
    S: DocumentStore,
{
    provider.commit().await?;
    let state = provider.state();

    let mut captured = Vec::new();
    for page in state.pages {
        let geometry = Geometry::from_strokes(page.strokes);
        if !geometry.is_usable() {
            continue;
        }
        let mut record = AnnotationRecord::new(page.page_index, AnnotationKind::Ink, geometry);
        match page.context {
            Some(ctx) => {
                if let Err(e) = record.derive_pdf_geometry(ctx, policy) {
                    log::warn!(
                        "Page {} ink kept without PDF geometry: {e}",
                        page.page_index
                    );
                }
            }
            None => log::warn!(
                "Page {} ink has no coordinate context, storing pixel geometry only",
                page.page_index
            ),
        }
        captured.push(record);
    }

    if captured.is_empty() {
        log::debug!("No ink to capture for document {id}");
        return Ok(captured);
    }

    let record = store.get(id).await?;
    let mut annotations = record.annotations;
    annotations.extend(captured.iter().cloned());
    store.put_annotations(id, annotations).await?;
    store
        .put_export_metadata(id, record.export_metadata.bumped())
        .await?;

    log::debug!("Captured {} ink annotations for document {id}", captured.len());
    Ok(captured)
}

/// Replace the stored form values and bump the document version
pub async fn record_form_values<S: DocumentStore>(
    store: &S,
    id: &DocumentId,
    values: FieldValueMap,
) -> Result<()> {
    let metadata = store.get_metadata(id).await?;
    store.put_form_field_values(id, values).await?;
    store.put_export_metadata(id, metadata.bumped()).await
}
