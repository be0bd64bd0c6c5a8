use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum OverlayError {
    #[error("Coordinate space context is missing or has a zero scale factor")]
    MissingCoordinateContext,
    #[error("Stroke set contains no finite points")]
    EmptyStrokeSet,
    #[error("Annotation is incomplete: {0}")]
    IncompleteAnnotation(String),
    #[error("Invalid document: {0}")]
    InvalidDocument(String),
    #[error("Page index {index} is out of range (document has {page_count} pages)")]
    PageIndexOutOfRange { index: usize, page_count: usize },
    #[error("Form field not found: {0}")]
    FieldNotFound(String),
    #[error("Could not set field '{field}': {reason}")]
    FieldValue { field: String, reason: String },
    #[error("Appearance regeneration failed: {0}")]
    AppearanceRegenerationFailed(String),
    #[error("None of the {attempted} form values matched a field in the document")]
    NoFieldsFilled { attempted: usize },
    #[error("Document has no interactive form")]
    FormNotFound,
    #[error("Document not found: {0}")]
    DocumentNotFound(String),
    #[error("Document already exists: {0}")]
    DocumentExists(String),
    #[error("Invalid configuration: {0}")]
    Config(String),
    #[error("Encoding error: {0}")]
    Encode(String),
    #[error("PDF error: {0}")]
    Pdf(#[from] lopdf::Error),
    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Task join error: {0}")]
    TaskJoin(#[from] tokio::task::JoinError),
}

impl OverlayError {
    /// Whether this error aborts a whole export rather than a single field or annotation.
    pub fn is_fatal(&self) -> bool {
        !matches!(
            self,
            OverlayError::MissingCoordinateContext
                | OverlayError::EmptyStrokeSet
                | OverlayError::IncompleteAnnotation(_)
                | OverlayError::PageIndexOutOfRange { .. }
                | OverlayError::FieldNotFound(_)
                | OverlayError::FieldValue { .. }
                | OverlayError::AppearanceRegenerationFailed(_)
                | OverlayError::FormNotFound
        )
    }
}

pub type Result<T> = std::result::Result<T, OverlayError>;

/// A point in either pixel space or PDF space.
///
/// The coordinate space is implied by where the point came from; the type
/// does not track it.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

/// An axis-aligned rectangle stored as min/max corners.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Rect {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
}

impl Rect {
    pub fn new(min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Self {
        Self {
            min_x,
            min_y,
            max_x,
            max_y,
        }
    }

    /// Build from an origin and a size (x/y is the min corner)
    pub fn from_xywh(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self::new(x, y, x + width, y + height)
    }

    /// Rectangle spanning two arbitrary corners
    pub fn from_corners(a: Point, b: Point) -> Self {
        Self::new(a.x, a.y, b.x, b.y).normalized()
    }

    /// Swap coordinates so that min <= max on both axes
    pub fn normalized(self) -> Self {
        Self {
            min_x: self.min_x.min(self.max_x),
            min_y: self.min_y.min(self.max_y),
            max_x: self.min_x.max(self.max_x),
            max_y: self.min_y.max(self.max_y),
        }
    }

    pub fn width(&self) -> f64 {
        self.max_x - self.min_x
    }

    pub fn height(&self) -> f64 {
        self.max_y - self.min_y
    }

    pub fn is_finite(&self) -> bool {
        self.min_x.is_finite()
            && self.min_y.is_finite()
            && self.max_x.is_finite()
            && self.max_y.is_finite()
    }

    /// True when either side has zero length
    pub fn is_degenerate(&self) -> bool {
        self.width() <= 0.0 || self.height() <= 0.0
    }

    pub fn union(&self, other: &Rect) -> Rect {
        Rect::new(
            self.min_x.min(other.min_x),
            self.min_y.min(other.min_y),
            self.max_x.max(other.max_x),
            self.max_y.max(other.max_y),
        )
    }

    pub fn contains(&self, point: Point) -> bool {
        point.x >= self.min_x && point.x <= self.max_x && point.y >= self.min_y && point.y <= self.max_y
    }
}

/// RGB color, 0-255 per channel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Default for Color {
    fn default() -> Self {
        Color::BLACK
    }
}

impl Color {
    pub const BLACK: Color = Color { r: 0, g: 0, b: 0 };
    pub const YELLOW: Color = Color { r: 255, g: 255, b: 0 };

    pub fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Parse `#RRGGBB` or `RRGGBB`
    pub fn from_hex(hex: &str) -> Option<Self> {
        let hex = hex.trim().trim_start_matches('#');
        if hex.len() != 6 || !hex.is_ascii() {
            return None;
        }
        let r = u8::from_str_radix(&hex[0..2], 16).ok()?;
        let g = u8::from_str_radix(&hex[2..4], 16).ok()?;
        let b = u8::from_str_radix(&hex[4..6], 16).ok()?;
        Some(Self { r, g, b })
    }

    /// Normalized components for PDF color operators
    pub fn to_normalized(&self) -> (f64, f64, f64) {
        (
            self.r as f64 / 255.0,
            self.g as f64 / 255.0,
            self.b as f64 / 255.0,
        )
    }
}

/// Visual style of a stroke or annotation
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StrokeStyle {
    pub color: Color,
    /// Pen width in the units of the points it is applied to
    pub stroke_width: f64,
    /// 0.0 (invisible) to 1.0 (opaque)
    pub opacity: f64,
}

impl Default for StrokeStyle {
    fn default() -> Self {
        Self {
            color: Color::BLACK,
            stroke_width: 2.0,
            opacity: 1.0,
        }
    }
}

/// One continuous pen movement together with the style it is drawn with.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InkStroke {
    pub points: Vec<Point>,
    pub style: StrokeStyle,
}

impl InkStroke {
    pub fn new(points: Vec<Point>, style: StrokeStyle) -> Self {
        Self { points, style }
    }
}

/// Target placement of an image on a page, in PDF points
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Placement {
    /// Left edge
    pub x: f64,
    /// Bottom edge
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Placement {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn from_rect(rect: &Rect) -> Self {
        Self::new(rect.min_x, rect.min_y, rect.width(), rect.height())
    }

    pub fn to_rect(&self) -> Rect {
        Rect::from_xywh(self.x, self.y, self.width, self.height)
    }
}
