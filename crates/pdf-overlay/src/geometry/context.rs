//! Coordinate space snapshot taken when annotations are created

use serde::{Deserialize, Serialize};

/// Relationship between a rendered page (pixels) and its PDF page (points).
///
/// Captured once per page at the moment annotations are created. Scale
/// factors are always derived from the dimensions, both on construction and
/// on deserialization, so a stale scale can never be carried over.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "ContextRecord", into = "ContextRecord")]
pub struct CoordinateSpaceContext {
    rendered_page_width: f64,
    rendered_page_height: f64,
    pdf_page_width: f64,
    pdf_page_height: f64,
    scale_x: f64,
    scale_y: f64,
    device_pixel_ratio: f64,
    zoom_level: f64,
}

impl CoordinateSpaceContext {
    /// Capture a context from rendered and native page dimensions.
    pub fn capture(
        rendered_page_width: f64,
        rendered_page_height: f64,
        pdf_page_width: f64,
        pdf_page_height: f64,
        device_pixel_ratio: f64,
        zoom_level: f64,
    ) -> Self {
        Self {
            rendered_page_width,
            rendered_page_height,
            pdf_page_width,
            pdf_page_height,
            scale_x: ratio(pdf_page_width, rendered_page_width),
            scale_y: ratio(pdf_page_height, rendered_page_height),
            device_pixel_ratio,
            zoom_level,
        }
    }

    /// Context where one pixel maps to one point
    pub fn identity(pdf_page_width: f64, pdf_page_height: f64) -> Self {
        Self::capture(
            pdf_page_width,
            pdf_page_height,
            pdf_page_width,
            pdf_page_height,
            1.0,
            1.0,
        )
    }

    /// Context for a new render session of the same page.
    ///
    /// The snapshot is reused only when the rendered dimensions match
    /// exactly; otherwise the scale factors are recomputed.
    pub fn for_render(&self, rendered_page_width: f64, rendered_page_height: f64) -> Self {
        if self.rendered_page_width == rendered_page_width
            && self.rendered_page_height == rendered_page_height
        {
            return *self;
        }
        Self::capture(
            rendered_page_width,
            rendered_page_height,
            self.pdf_page_width,
            self.pdf_page_height,
            self.device_pixel_ratio,
            self.zoom_level,
        )
    }

    /// Both scale factors are finite and strictly positive
    pub fn has_valid_scale(&self) -> bool {
        self.scale_x.is_finite()
            && self.scale_y.is_finite()
            && self.scale_x > 0.0
            && self.scale_y > 0.0
            && self.pdf_page_height.is_finite()
    }

    pub fn rendered_page_width(&self) -> f64 {
        self.rendered_page_width
    }

    pub fn rendered_page_height(&self) -> f64 {
        self.rendered_page_height
    }

    pub fn pdf_page_width(&self) -> f64 {
        self.pdf_page_width
    }

    pub fn pdf_page_height(&self) -> f64 {
        self.pdf_page_height
    }

    pub fn scale_x(&self) -> f64 {
        self.scale_x
    }

    pub fn scale_y(&self) -> f64 {
        self.scale_y
    }

    pub fn device_pixel_ratio(&self) -> f64 {
        self.device_pixel_ratio
    }

    pub fn zoom_level(&self) -> f64 {
        self.zoom_level
    }
}

fn ratio(numerator: f64, denominator: f64) -> f64 {
    if denominator == 0.0 {
        0.0
    } else {
        numerator / denominator
    }
}

/// Serialized form. Scale factors are written for readers but ignored on load.
#[derive(Serialize, Deserialize)]
struct ContextRecord {
    rendered_page_width: f64,
    rendered_page_height: f64,
    pdf_page_width: f64,
    pdf_page_height: f64,
    #[serde(default, skip_deserializing)]
    scale_x: f64,
    #[serde(default, skip_deserializing)]
    scale_y: f64,
    #[serde(default = "one")]
    device_pixel_ratio: f64,
    #[serde(default = "one")]
    zoom_level: f64,
}

fn one() -> f64 {
    1.0
}

impl From<ContextRecord> for CoordinateSpaceContext {
    fn from(record: ContextRecord) -> Self {
        Self::capture(
            record.rendered_page_width,
            record.rendered_page_height,
            record.pdf_page_width,
            record.pdf_page_height,
            record.device_pixel_ratio,
            record.zoom_level,
        )
    }
}

impl From<CoordinateSpaceContext> for ContextRecord {
    fn from(ctx: CoordinateSpaceContext) -> Self {
        Self {
            rendered_page_width: ctx.rendered_page_width,
            rendered_page_height: ctx.rendered_page_height,
            pdf_page_width: ctx.pdf_page_width,
            pdf_page_height: ctx.pdf_page_height,
            scale_x: ctx.scale_x,
            scale_y: ctx.scale_y,
            device_pixel_ratio: ctx.device_pixel_ratio,
            zoom_level: ctx.zoom_level,
        }
    }
}
