//! Directory-backed document store
//!
//! Layout, one directory per document id:
//!
//! ```text
//! <root>/<id>/original.pdf
//! <root>/<id>/annotations.json
//! <root>/<id>/form_values.json
//! <root>/<id>/export.json
//! ```
//!
//! JSON parts are written to a temporary file and renamed into place, so a
//! reader never sees a half-written part.

use super::{DocumentId, DocumentRecord, DocumentStore, ExportMetadata, FieldValueMap};
use crate::annotation::AnnotationRecord;
use crate::types::{OverlayError, Result};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;

const ORIGINAL_FILE: &str = "original.pdf";
const ANNOTATIONS_FILE: &str = "annotations.json";
const FORM_VALUES_FILE: &str = "form_values.json";
const EXPORT_FILE: &str = "export.json";

#[derive(Debug, Clone)]
pub struct FileStore {
    root: PathBuf,
}

impl FileStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Store original bytes under a new id. Existing documents are never
    /// overwritten, since their bytes must not change.
    pub async fn insert(&self, id: &DocumentId, original: &[u8]) -> Result<()> {
        let dir = self.document_dir(id)?;
        if tokio::fs::try_exists(dir.join(ORIGINAL_FILE)).await? {
            return Err(OverlayError::DocumentExists(id.to_string()));
        }
        tokio::fs::create_dir_all(&dir).await?;
        write_atomic(&dir.join(ORIGINAL_FILE), original).await?;
        log::debug!("Stored original for document {id} ({} bytes)", original.len());
        Ok(())
    }

    /// Ids of every stored document, sorted
    pub async fn ids(&self) -> Result<Vec<DocumentId>> {
        let mut ids = Vec::new();
        let mut entries = match tokio::fs::read_dir(&self.root).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(ids),
            Err(e) => return Err(e.into()),
        };
        while let Some(entry) = entries.next_entry().await? {
            if tokio::fs::try_exists(entry.path().join(ORIGINAL_FILE)).await? {
                ids.push(DocumentId::new(entry.file_name().to_string_lossy()));
            }
        }
        ids.sort();
        Ok(ids)
    }

    fn document_dir(&self, id: &DocumentId) -> Result<PathBuf> {
        let raw = id.as_str();
        let valid = !raw.is_empty()
            && !raw.starts_with('.')
            && raw
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'));
        if !valid {
            return Err(OverlayError::Config(format!("invalid document id '{raw}'")));
        }
        Ok(self.root.join(raw))
    }

    /// Directory of an existing document
    async fn existing_dir(&self, id: &DocumentId) -> Result<PathBuf> {
        let dir = self.document_dir(id)?;
        if tokio::fs::try_exists(dir.join(ORIGINAL_FILE)).await? {
            Ok(dir)
        } else {
            Err(OverlayError::DocumentNotFound(id.to_string()))
        }
    }

    async fn put_json<T: Serialize>(&self, id: &DocumentId, file: &str, value: &T) -> Result<()> {
        let dir = self.existing_dir(id).await?;
        let json = serde_json::to_vec_pretty(value)?;
        write_atomic(&dir.join(file), &json).await
    }
}

async fn read_json<T: DeserializeOwned + Default>(path: &Path) -> Result<T> {
    match tokio::fs::read(path).await {
        Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(T::default()),
        Err(e) => Err(e.into()),
    }
}

async fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(format!(".{}.tmp", uuid::Uuid::new_v4().simple()));
    let tmp = PathBuf::from(tmp);
    tokio::fs::write(&tmp, bytes).await?;
    tokio::fs::rename(&tmp, path).await?;
    Ok(())
}

impl DocumentStore for FileStore {
    async fn get(&self, id: &DocumentId) -> Result<DocumentRecord> {
        let dir = self.document_dir(id)?;
        let original = match tokio::fs::read(dir.join(ORIGINAL_FILE)).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(OverlayError::DocumentNotFound(id.to_string()));
            }
            Err(e) => return Err(e.into()),
        };

        Ok(DocumentRecord {
            id: id.clone(),
            original: Arc::from(original),
            annotations: read_json(&dir.join(ANNOTATIONS_FILE)).await?,
            form_field_values: read_json(&dir.join(FORM_VALUES_FILE)).await?,
            export_metadata: read_json(&dir.join(EXPORT_FILE)).await?,
        })
    }

    async fn get_metadata(&self, id: &DocumentId) -> Result<ExportMetadata> {
        let dir = self.existing_dir(id).await?;
        read_json(&dir.join(EXPORT_FILE)).await
    }

    async fn put_annotations(&self, id: &DocumentId, annotations: Vec<AnnotationRecord>) -> Result<()> {
        self.put_json(id, ANNOTATIONS_FILE, &annotations).await
    }

    async fn put_form_field_values(&self, id: &DocumentId, values: FieldValueMap) -> Result<()> {
        self.put_json(id, FORM_VALUES_FILE, &values).await
    }

    async fn put_export_metadata(&self, id: &DocumentId, metadata: ExportMetadata) -> Result<()> {
        self.put_json(id, EXPORT_FILE, &metadata).await
    }
}
