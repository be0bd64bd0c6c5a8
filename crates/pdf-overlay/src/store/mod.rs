//! Document records and the store they live in
//!
//! A record pairs immutable original bytes with a metadata overlay
//! (annotations, form values, export metadata). Each part is written
//! independently; there is no multi-part transaction, and the last writer
//! wins.

mod file;
mod memory;

pub use file::FileStore;
pub use memory::MemoryStore;

use crate::annotation::AnnotationRecord;
use crate::types::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

/// Field name to value. Ordered so filling is deterministic.
pub type FieldValueMap = BTreeMap<String, String>;

/// Identifier of a stored document
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DocumentId(String);

impl DocumentId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Fresh random id
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for DocumentId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for DocumentId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// Version counter and last export state of a document
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ExportMetadata {
    /// Monotonic per document; bumped by every write that can change output
    pub version: u64,
    pub last_exported_at: Option<DateTime<Utc>>,
    pub flattened: bool,
}

impl ExportMetadata {
    /// Metadata after a completed export
    pub fn next(&self, flattened: bool, now: DateTime<Utc>) -> Self {
        Self {
            version: self.version + 1,
            last_exported_at: Some(now),
            flattened,
        }
    }

    /// Metadata after an overlay write (annotations or form values)
    pub fn bumped(&self) -> Self {
        Self {
            version: self.version + 1,
            ..*self
        }
    }

    /// Whether `self` was written after `other`
    pub fn is_newer_than(&self, other: &ExportMetadata) -> bool {
        self.version > other.version
    }
}

/// Everything stored for one document
#[derive(Debug, Clone)]
pub struct DocumentRecord {
    pub id: DocumentId,
    /// Never changes for the life of the id
    pub original: Arc<[u8]>,
    pub annotations: Vec<AnnotationRecord>,
    pub form_field_values: FieldValueMap,
    pub export_metadata: ExportMetadata,
}

impl DocumentRecord {
    pub fn new(id: DocumentId, original: impl Into<Arc<[u8]>>) -> Self {
        Self {
            id,
            original: original.into(),
            annotations: Vec::new(),
            form_field_values: FieldValueMap::new(),
            export_metadata: ExportMetadata::default(),
        }
    }
}

/// Persistent store for document records.
///
/// All writes are partial updates of one part of the overlay.
pub trait DocumentStore: Send + Sync {
    fn get(&self, id: &DocumentId) -> impl Future<Output = Result<DocumentRecord>> + Send;

    /// Export metadata alone, without reading the original bytes
    fn get_metadata(&self, id: &DocumentId) -> impl Future<Output = Result<ExportMetadata>> + Send;

    fn put_annotations(
        &self,
        id: &DocumentId,
        annotations: Vec<AnnotationRecord>,
    ) -> impl Future<Output = Result<()>> + Send;

    fn put_form_field_values(
        &self,
        id: &DocumentId,
        values: FieldValueMap,
    ) -> impl Future<Output = Result<()>> + Send;

    fn put_export_metadata(
        &self,
        id: &DocumentId,
        metadata: ExportMetadata,
    ) -> impl Future<Output = Result<()>> + Send;
}
