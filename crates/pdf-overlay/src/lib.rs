pub mod annotation;
pub mod constants;
pub mod embed;
pub mod export;
pub mod form;
pub mod geometry;
mod options;
pub mod pdf;
mod preview;
pub mod provider;
pub mod raster;
pub mod store;
mod types;

pub use annotation::{AnnotationKind, AnnotationRecord, Geometry};
pub use embed::{calculate_position, embed, resolve_position};
pub use export::{
    ExportArtifact, ExportError, ExportPipeline, ExportReport, ExportStage, SkippedAnnotation,
};
pub use form::{FieldInfo, FieldKind, FillReport, FormHandle, fill};
pub use geometry::*;
pub use options::*;
pub use pdf::{PageHandle, PdfHandle};
pub use preview::render_overlay_preview;
pub use provider::{AnnotationProvider, PageInk, ProviderState, capture_annotations, record_form_values};
pub use raster::{Bitmap, rasterize};
pub use store::{
    DocumentId, DocumentRecord, DocumentStore, ExportMetadata, FieldValueMap, FileStore,
    MemoryStore,
};
pub use types::*;
