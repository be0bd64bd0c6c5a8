mod worker;

// Re-export types from library crates
pub use pdf_overlay::{
    DocumentId, ExportArtifact, ExportOptions, ExportPipeline, ExportStage, FieldValueMap,
};
pub use worker::worker_task;

/// Commands sent from the UI to the worker
#[derive(Debug, Clone)]
pub enum ExportCommand {
    /// Export a document; `options` overrides the pipeline's own
    Export {
        doc_id: DocumentId,
        options: Option<ExportOptions>,
    },
    /// Replace a document's stored form values
    RecordFormValues {
        doc_id: DocumentId,
        values: FieldValueMap,
    },
    Shutdown,
}

/// Updates sent from the worker to the UI
#[derive(Debug, Clone)]
pub enum ExportUpdate {
    Started {
        doc_id: DocumentId,
    },
    Completed {
        doc_id: DocumentId,
        artifact: Box<ExportArtifact>,
    },
    ValuesRecorded {
        doc_id: DocumentId,
    },
    Failed {
        doc_id: DocumentId,
        /// Export stage that failed, if the failure came from an export
        stage: Option<ExportStage>,
        message: String,
    },
}

impl ExportUpdate {
    pub fn doc_id(&self) -> &DocumentId {
        match self {
            ExportUpdate::Started { doc_id }
            | ExportUpdate::Completed { doc_id, .. }
            | ExportUpdate::ValuesRecorded { doc_id }
            | ExportUpdate::Failed { doc_id, .. } => doc_id,
        }
    }
}
