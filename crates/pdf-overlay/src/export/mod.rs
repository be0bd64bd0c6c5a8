//! Export orchestration
//!
//! An export loads a fresh copy of the stored original, fills the form,
//! draws annotations, optionally flattens, and serializes. The original is
//! never written back; the only durable write is the metadata update once
//! the bytes exist. Dropping an in-flight export discards its document.

mod annotations;
mod report;

pub use report::{ExportReport, SkippedAnnotation};

use crate::annotation::AnnotationRecord;
use crate::form::fill;
use crate::options::ExportOptions;
use crate::pdf::{PdfHandle, verify_header};
use crate::preview::render_overlay_preview;
use crate::store::{DocumentId, DocumentStore, ExportMetadata, FieldValueMap};
use crate::types::OverlayError;
use annotations::apply_annotations;
use chrono::Utc;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

/// Steps of one export, in order. `Error` absorbs a failure from any step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExportStage {
    Idle,
    LoadingOriginal,
    ApplyingFormData,
    ApplyingAnnotations,
    Flattening,
    Saved,
    Error,
}

impl fmt::Display for ExportStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ExportStage::Idle => "idle",
            ExportStage::LoadingOriginal => "loading the original",
            ExportStage::ApplyingFormData => "applying form data",
            ExportStage::ApplyingAnnotations => "applying annotations",
            ExportStage::Flattening => "flattening",
            ExportStage::Saved => "saving",
            ExportStage::Error => "running the export task",
        };
        f.write_str(label)
    }
}

/// A failed export and the stage it failed in
#[derive(Error, Debug)]
#[error("export failed while {stage}: {source}")]
pub struct ExportError {
    pub stage: ExportStage,
    #[source]
    pub source: OverlayError,
}

impl ExportError {
    pub fn new(stage: ExportStage, source: OverlayError) -> Self {
        Self { stage, source }
    }
}

/// Result of a successful export
#[derive(Debug, Clone)]
pub struct ExportArtifact {
    pub document_id: DocumentId,
    /// The exported PDF
    pub bytes: Vec<u8>,
    /// Metadata written for this export
    pub metadata: ExportMetadata,
    pub report: ExportReport,
    /// Stages passed through, in order
    pub stages: Vec<ExportStage>,
    /// PNG of the requested page's overlay
    pub preview_png: Option<Vec<u8>>,
}

impl ExportArtifact {
    /// Whether the document changed after this export was produced
    pub fn is_stale(&self, current: &ExportMetadata) -> bool {
        current.is_newer_than(&self.metadata)
    }
}

/// Runs exports against a [`DocumentStore`].
///
/// Cheap to clone. Exports of different documents share no mutable state
/// and may run concurrently.
#[derive(Debug)]
pub struct ExportPipeline<S> {
    store: Arc<S>,
    options: ExportOptions,
}

impl<S> Clone for ExportPipeline<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            options: self.options.clone(),
        }
    }
}

impl<S: DocumentStore> ExportPipeline<S> {
    pub fn new(store: Arc<S>, options: ExportOptions) -> Self {
        Self { store, options }
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    pub fn options(&self) -> &ExportOptions {
        &self.options
    }

    /// Export with the pipeline's own options
    pub async fn export(&self, id: &DocumentId) -> Result<ExportArtifact, ExportError> {
        let options = self.options.clone();
        self.export_with(id, &options).await
    }

    /// Export with one-off options
    pub async fn export_with(
        &self,
        id: &DocumentId,
        options: &ExportOptions,
    ) -> Result<ExportArtifact, ExportError> {
        options
            .validate()
            .map_err(|e| ExportError::new(ExportStage::Idle, e))?;

        log::debug!("Exporting document {id}");
        let record = self
            .store
            .get(id)
            .await
            .map_err(|e| ExportError::new(ExportStage::LoadingOriginal, e))?;
        verify_header(&record.original)
            .map_err(|e| ExportError::new(ExportStage::LoadingOriginal, e))?;

        let original = Arc::clone(&record.original);
        let values = record.form_field_values.clone();
        let annotations = record.annotations.clone();
        let task_options = options.clone();
        let rendered = tokio::task::spawn_blocking(move || {
            render_export(&original, &values, &annotations, &task_options)
        })
        .await
        .map_err(|e| ExportError::new(ExportStage::Error, e.into()))??;

        let metadata = record
            .export_metadata
            .next(rendered.report.flattened, Utc::now());
        self.store
            .put_export_metadata(id, metadata)
            .await
            .map_err(|e| ExportError::new(ExportStage::Saved, e))?;

        log::info!(
            "Exported document {id} (version {}): {}",
            metadata.version,
            rendered.report.summary()
        );

        Ok(ExportArtifact {
            document_id: id.clone(),
            bytes: rendered.bytes,
            metadata,
            report: rendered.report,
            stages: rendered.stages,
            preview_png: rendered.preview_png,
        })
    }
}

struct Rendered {
    bytes: Vec<u8>,
    report: ExportReport,
    stages: Vec<ExportStage>,
    preview_png: Option<Vec<u8>>,
}

/// The CPU-bound part of an export, run off the async runtime
fn render_export(
    original: &[u8],
    values: &FieldValueMap,
    annotations: &[AnnotationRecord],
    options: &ExportOptions,
) -> Result<Rendered, ExportError> {
    let mut stages = vec![ExportStage::LoadingOriginal];
    let mut report = ExportReport::default();

    let mut pdf = PdfHandle::load(original)
        .map_err(|e| ExportError::new(ExportStage::LoadingOriginal, e))?;

    stages.push(ExportStage::ApplyingFormData);
    if !values.is_empty() {
        let stage = |e: OverlayError| ExportError::new(ExportStage::ApplyingFormData, e);
        let mut form = match pdf.form() {
            Ok(form) => form,
            Err(OverlayError::FormNotFound) => {
                return Err(stage(OverlayError::NoFieldsFilled {
                    attempted: values.len(),
                }));
            }
            Err(e) => return Err(stage(e)),
        };
        report.fill = fill(&mut form, values);
        if report.fill.missing.len() == report.fill.attempted_count {
            return Err(stage(OverlayError::NoFieldsFilled {
                attempted: values.len(),
            }));
        }
    } else {
        log::debug!("No form values to apply");
    }

    stages.push(ExportStage::ApplyingAnnotations);
    apply_annotations(&mut pdf, annotations, options, &mut report);

    if options.flatten {
        stages.push(ExportStage::Flattening);
        if !report.fill.appearances_ok() && !options.flatten_with_stale_appearances {
            report.warn(
                "Form left unflattened: some field appearances could not be regenerated",
            );
        } else {
            match pdf.flatten_form() {
                Ok(count) => {
                    log::debug!("Flattened {count} widgets");
                    report.flattened = true;
                }
                Err(OverlayError::FormNotFound) => log::debug!("No form to flatten"),
                Err(e) => report.warn(format!("Flattening failed: {e}")),
            }
        }
    }

    let preview_png = match options.preview_page {
        Some(page) => match render_overlay_preview(annotations, page, options) {
            Ok(png) => png,
            Err(e) => {
                report.warn(format!("Preview of page {page} failed: {e}"));
                None
            }
        },
        None => None,
    };

    stages.push(ExportStage::Saved);
    let bytes = pdf
        .save()
        .map_err(|e| ExportError::new(ExportStage::Saved, e))?;

    Ok(Rendered {
        bytes,
        report,
        stages,
        preview_png,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_names_stage() {
        let err = ExportError::new(
            ExportStage::ApplyingFormData,
            OverlayError::NoFieldsFilled { attempted: 2 },
        );
        assert_eq!(
            err.to_string(),
            "export failed while applying form data: None of the 2 form values matched a field in the document"
        );
    }

    #[test]
    fn test_stale_after_newer_write() {
        let artifact = ExportArtifact {
            document_id: DocumentId::new("doc"),
            bytes: Vec::new(),
            metadata: ExportMetadata {
                version: 3,
                ..ExportMetadata::default()
            },
            report: ExportReport::default(),
            stages: Vec::new(),
            preview_png: None,
        };
        assert!(!artifact.is_stale(&artifact.metadata));
        assert!(artifact.is_stale(&artifact.metadata.bumped()));
    }
}
