//! Shared constants for overlay export
//!
//! This module centralizes magic numbers and names used throughout
//! the rasterization, form filling and embedding steps.

// =============================================================================
// Document Validation
// =============================================================================

/// Every PDF file starts with this marker
pub const PDF_HEADER: &[u8] = b"%PDF-";

/// How far into the file the header may appear (some producers emit junk first)
pub const PDF_HEADER_SEARCH_LIMIT: usize = 1024;

// =============================================================================
// Rasterization
// =============================================================================

/// Default supersampling factor for signature bitmaps
pub const DEFAULT_SUPERSAMPLE: f64 = 3.0;

/// Default transparent padding around a signature (pixel-space units)
pub const DEFAULT_PADDING: f64 = 4.0;

/// Upper bound on either bitmap side, protects against runaway bounds
pub const MAX_BITMAP_SIDE: u32 = 8192;

// =============================================================================
// Bounds Reconciliation
// =============================================================================

/// A stored rect covering more than this share of the page is not trusted
pub const DEFAULT_UNRELIABLE_RECT_RATIO: f64 = 0.8;

/// A stored rect this many times larger than the stroke bounds is not trusted
pub const DEFAULT_MAX_RECT_INFLATION: f64 = 2.0;

// =============================================================================
// Form Fields
// =============================================================================

/// Values that switch a checkbox on
pub const CHECKBOX_TRUTHY_VALUES: [&str; 4] = ["Yes", "On", "YES", "HOURS"];

/// On-state name used when a checkbox has no appearance dictionary
pub const DEFAULT_ON_STATE: &str = "Yes";

/// Off-state name mandated by the PDF format
pub const OFF_STATE: &str = "Off";

/// Resource name of the fallback font registered in /AcroForm /DR
pub const FALLBACK_FONT_RESOURCE: &str = "Helv";

/// Standard 14 font used as fallback
pub const FALLBACK_BASE_FONT: &str = "Helvetica";

/// Default font size when neither /DA nor auto sizing yields one
pub const DEFAULT_FONT_SIZE: f64 = 12.0;

/// Auto-sized text never goes below this size
pub const MIN_AUTO_FONT_SIZE: f64 = 4.0;

/// Auto-sized text never goes above this size
pub const MAX_AUTO_FONT_SIZE: f64 = 12.0;

/// Inner padding between a widget border and its text (points)
pub const TEXT_FIELD_PADDING: f64 = 2.0;

/// Approximate character width ratio for Helvetica
pub const HELVETICA_CHAR_WIDTH_RATIO: f64 = 0.5;

/// Line height as a multiple of the font size
pub const LINE_HEIGHT_FACTOR: f64 = 1.15;

/// Guard against cyclic /Kids references
pub const MAX_FIELD_DEPTH: usize = 64;

// =============================================================================
// Page Content
// =============================================================================

/// Name prefix for embedded signature images in page resources
pub const IMAGE_RESOURCE_PREFIX: &str = "OvImg";

/// Name prefix for flattened widget appearances in page resources
pub const FLATTEN_RESOURCE_PREFIX: &str = "OvFlat";

/// Name prefix for graphics states in page resources
pub const GSTATE_RESOURCE_PREFIX: &str = "OvGs";

/// Name prefix for fonts added to page resources
pub const FONT_RESOURCE_PREFIX: &str = "OvF";

/// Font size for text annotations drawn into page content
pub const TEXT_ANNOTATION_FONT_SIZE: f64 = 11.0;

/// Default page dimensions (US Letter) when a page has no MediaBox
pub const DEFAULT_PAGE_DIMENSIONS: (f64, f64) = (612.0, 792.0);
