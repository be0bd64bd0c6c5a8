//! In-process document store

use super::{DocumentId, DocumentRecord, DocumentStore, ExportMetadata, FieldValueMap};
use crate::annotation::AnnotationRecord;
use crate::types::{OverlayError, Result};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Store backed by a map behind a tokio `RwLock`
#[derive(Debug, Default)]
pub struct MemoryStore {
    records: RwLock<HashMap<DocumentId, DocumentRecord>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a record for new original bytes. Replaces any record with the
    /// same id.
    pub async fn insert(&self, id: DocumentId, original: impl Into<Arc<[u8]>>) {
        let record = DocumentRecord::new(id.clone(), original);
        self.records.write().await.insert(id, record);
    }

    pub async fn remove(&self, id: &DocumentId) -> Option<DocumentRecord> {
        self.records.write().await.remove(id)
    }

    pub async fn ids(&self) -> Vec<DocumentId> {
        let mut ids: Vec<_> = self.records.read().await.keys().cloned().collect();
        ids.sort();
        ids
    }

    async fn update(&self, id: &DocumentId, f: impl FnOnce(&mut DocumentRecord)) -> Result<()> {
        let mut records = self.records.write().await;
        let record = records
            .get_mut(id)
            .ok_or_else(|| OverlayError::DocumentNotFound(id.to_string()))?;
        f(record);
        Ok(())
    }
}

impl DocumentStore for MemoryStore {
    async fn get(&self, id: &DocumentId) -> Result<DocumentRecord> {
        self.records
            .read()
            .await
            .get(id)
            .cloned()
            .ok_or_else(|| OverlayError::DocumentNotFound(id.to_string()))
    }

    async fn get_metadata(&self, id: &DocumentId) -> Result<ExportMetadata> {
        self.records
            .read()
            .await
            .get(id)
            .map(|record| record.export_metadata)
            .ok_or_else(|| OverlayError::DocumentNotFound(id.to_string()))
    }

    async fn put_annotations(&self, id: &DocumentId, annotations: Vec<AnnotationRecord>) -> Result<()> {
        self.update(id, |record| record.annotations = annotations).await
    }

    async fn put_form_field_values(&self, id: &DocumentId, values: FieldValueMap) -> Result<()> {
        self.update(id, |record| record.form_field_values = values).await
    }

    async fn put_export_metadata(&self, id: &DocumentId, metadata: ExportMetadata) -> Result<()> {
        self.update(id, |record| record.export_metadata = metadata).await
    }
}
