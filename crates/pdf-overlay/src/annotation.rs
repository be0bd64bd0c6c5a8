//! Annotation records stored in a document's metadata overlay
//!
//! Pixel geometry is the source of truth. PDF geometry is derived from it
//! through a [`CoordinateSpaceContext`] and is never edited by hand.

use crate::geometry::{
    BoundsPolicy, CoordinateSpaceContext, reconcile_bounds, require_context, to_pdf_rect,
    to_pdf_strokes,
};
use crate::types::{InkStroke, Rect, Result, StrokeStyle};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Kind of mark an annotation leaves on the page
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnnotationKind {
    Ink,
    Text,
    Highlight,
    Stamp,
}

impl AnnotationKind {
    /// Kinds drawn by rasterizing their strokes
    pub fn is_stroked(self) -> bool {
        matches!(self, AnnotationKind::Ink | AnnotationKind::Stamp)
    }
}

/// Shapes of an annotation in one coordinate space
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Geometry {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rect: Option<Rect>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub strokes: Vec<InkStroke>,
}

impl Geometry {
    pub fn from_rect(rect: Rect) -> Self {
        Self {
            rect: Some(rect),
            strokes: Vec::new(),
        }
    }

    pub fn from_strokes(strokes: Vec<InkStroke>) -> Self {
        Self {
            rect: None,
            strokes,
        }
    }

    /// At least one finite point, or a finite rect
    pub fn is_usable(&self) -> bool {
        self.strokes
            .iter()
            .flat_map(|s| s.points.iter())
            .any(|p| p.is_finite())
            || self.rect.is_some_and(|r| r.is_finite())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnnotationRecord {
    pub id: String,
    /// 0-based
    pub page_index: usize,
    pub kind: AnnotationKind,
    pixel_geometry: Geometry,
    #[serde(default)]
    pdf_geometry: Option<Geometry>,
    #[serde(default)]
    context: Option<CoordinateSpaceContext>,
    #[serde(default)]
    style: StrokeStyle,
    /// Text drawn for `text` annotations
    #[serde(default, skip_serializing_if = "Option::is_none")]
    contents: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    pub created_at: DateTime<Utc>,
    pub modified_at: DateTime<Utc>,
}

impl AnnotationRecord {
    /// Create a record from pixel-space geometry. PDF geometry stays empty
    /// until a context is attached.
    pub fn new(page_index: usize, kind: AnnotationKind, pixel_geometry: Geometry) -> Self {
        let now = Utc::now();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            page_index,
            kind,
            pixel_geometry,
            pdf_geometry: None,
            context: None,
            style: StrokeStyle::default(),
            contents: None,
            author: None,
            created_at: now,
            modified_at: now,
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    pub fn with_style(mut self, style: StrokeStyle) -> Self {
        self.style = style;
        self
    }

    pub fn with_contents(mut self, contents: impl Into<String>) -> Self {
        self.contents = Some(contents.into());
        self
    }

    pub fn with_author(mut self, author: impl Into<String>) -> Self {
        self.author = Some(author.into());
        self
    }

    /// Attach a context and derive PDF geometry from it.
    pub fn with_context(
        mut self,
        ctx: CoordinateSpaceContext,
        policy: &BoundsPolicy,
    ) -> Result<Self> {
        self.derive_pdf_geometry(ctx, policy)?;
        Ok(self)
    }

    pub fn pixel_geometry(&self) -> &Geometry {
        &self.pixel_geometry
    }

    pub fn pdf_geometry(&self) -> Option<&Geometry> {
        self.pdf_geometry.as_ref()
    }

    pub fn context(&self) -> Option<&CoordinateSpaceContext> {
        self.context.as_ref()
    }

    pub fn style(&self) -> &StrokeStyle {
        &self.style
    }

    pub fn contents(&self) -> Option<&str> {
        self.contents.as_deref()
    }

    /// Pixel-space strokes ready for rasterization
    pub fn ink_strokes(&self) -> &[InkStroke] {
        &self.pixel_geometry.strokes
    }

    pub fn has_usable_geometry(&self) -> bool {
        self.pixel_geometry.is_usable()
    }

    /// Recompute PDF geometry for `ctx`.
    ///
    /// For stroked kinds the PDF rect is the reconciled pixel bounds
    /// converted to PDF space; other kinds convert their stored rect.
    /// On failure the derived geometry is cleared.
    pub fn derive_pdf_geometry(
        &mut self,
        ctx: CoordinateSpaceContext,
        policy: &BoundsPolicy,
    ) -> Result<()> {
        self.context = Some(ctx);
        self.pdf_geometry = None;

        let ctx = require_context(Some(&ctx))?;
        let strokes = to_pdf_strokes(&self.pixel_geometry.strokes, ctx)?;

        let pixel_rect = if self.kind.is_stroked() && !self.pixel_geometry.strokes.is_empty() {
            reconcile_bounds(
                self.pixel_geometry.rect.as_ref(),
                &self.pixel_geometry.strokes,
                Some(ctx),
                policy,
            )
            .ok()
            .map(|(rect, _)| rect)
        } else {
            self.pixel_geometry.rect.filter(|r| r.is_finite())
        };

        let rect = pixel_rect.map(|r| to_pdf_rect(&r, ctx)).transpose()?;
        self.pdf_geometry = Some(Geometry { rect, strokes });
        Ok(())
    }

    /// Replace the pixel geometry; derived geometry follows.
    pub fn set_pixel_geometry(&mut self, geometry: Geometry, policy: &BoundsPolicy) -> Result<()> {
        self.pixel_geometry = geometry;
        self.touch();
        match self.context {
            Some(ctx) => self.derive_pdf_geometry(ctx, policy),
            None => {
                self.pdf_geometry = None;
                Ok(())
            }
        }
    }

    pub fn set_style(&mut self, style: StrokeStyle) {
        self.style = style;
        self.touch();
    }

    pub fn set_contents(&mut self, contents: Option<String>) {
        self.contents = contents;
        self.touch();
    }

    fn touch(&mut self) {
        self.modified_at = Utc::now();
    }
}
