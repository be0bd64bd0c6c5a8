//! PDF object-model access
//!
//! [`PdfHandle`] wraps one freshly loaded `lopdf::Document`. A handle is
//! created per export and dropped at the end of it; nothing here caches a
//! mutated document.

mod flatten;
mod image;
mod objects;
mod resources;

pub use image::ImageRef;
pub(crate) use objects::{
    acroform_id, content_string, dict_entry, encode_text_string, helvetica_font, name_of, num,
    real, rect_from_object, rect_to_object, text_of,
};
pub(crate) use resources::{indirect_dict_entry, with_category};

use crate::constants::{
    FONT_RESOURCE_PREFIX, GSTATE_RESOURCE_PREFIX, IMAGE_RESOURCE_PREFIX, PDF_HEADER,
    PDF_HEADER_SEARCH_LIMIT, TEXT_ANNOTATION_FONT_SIZE,
};
use crate::form::FormHandle;
use crate::types::{Color, OverlayError, Placement, Rect, Result};
use lopdf::{Dictionary, Document, Object, ObjectId};
use std::collections::HashSet;

/// Check that `bytes` look like a PDF before handing them to the parser.
pub fn verify_header(bytes: &[u8]) -> Result<()> {
    let window = &bytes[..bytes.len().min(PDF_HEADER_SEARCH_LIMIT)];
    if window.windows(PDF_HEADER.len()).any(|w| w == PDF_HEADER) {
        Ok(())
    } else {
        Err(OverlayError::InvalidDocument(
            "missing %PDF- header".to_string(),
        ))
    }
}

/// One page of a loaded document
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageHandle {
    /// 0-based
    pub index: usize,
    pub id: ObjectId,
    pub media_box: Rect,
}

impl PageHandle {
    pub fn width(&self) -> f64 {
        self.media_box.width()
    }

    pub fn height(&self) -> f64 {
        self.media_box.height()
    }
}

pub struct PdfHandle {
    doc: Document,
    /// Pages whose original content is already wrapped in q/Q
    wrapped_pages: HashSet<ObjectId>,
}

impl PdfHandle {
    /// Parse a document from bytes
    pub fn load(bytes: &[u8]) -> Result<Self> {
        verify_header(bytes)?;
        let doc = Document::load_mem(bytes)
            .map_err(|e| OverlayError::InvalidDocument(e.to_string()))?;
        if doc.get_pages().is_empty() {
            return Err(OverlayError::InvalidDocument(
                "document has no pages".to_string(),
            ));
        }
        Ok(Self::from_document(doc))
    }

    pub fn from_document(doc: Document) -> Self {
        Self {
            doc,
            wrapped_pages: HashSet::new(),
        }
    }

    pub fn document(&self) -> &Document {
        &self.doc
    }

    pub fn page_count(&self) -> usize {
        self.doc.get_pages().len()
    }

    pub fn pages(&self) -> Result<Vec<PageHandle>> {
        self.doc
            .get_pages()
            .into_values()
            .enumerate()
            .map(|(index, id)| {
                Ok(PageHandle {
                    index,
                    id,
                    media_box: objects::page_media_box(&self.doc, id)?,
                })
            })
            .collect()
    }

    pub fn page(&self, index: usize) -> Result<PageHandle> {
        let page_count = self.page_count();
        let id = self
            .doc
            .get_pages()
            .into_values()
            .nth(index)
            .ok_or(OverlayError::PageIndexOutOfRange { index, page_count })?;
        Ok(PageHandle {
            index,
            id,
            media_box: objects::page_media_box(&self.doc, id)?,
        })
    }

    pub fn has_form(&self) -> bool {
        objects::catalog_id(&self.doc)
            .and_then(|root| Ok(self.doc.get_dictionary(root)?.has(b"AcroForm")))
            .unwrap_or(false)
    }

    /// Index the interactive form. Fails with `FormNotFound` when there is none.
    pub fn form(&mut self) -> Result<FormHandle<'_>> {
        FormHandle::open(&mut self.doc)
    }

    pub fn embed_png(&mut self, png: &[u8]) -> Result<ImageRef> {
        image::embed_png(&mut self.doc, png)
    }

    /// Draw an embedded image stretched to `placement` (PDF points)
    pub fn draw_image(&mut self, page: &PageHandle, image: &ImageRef, placement: &Placement) -> Result<()> {
        let name = resources::add_resource(
            &mut self.doc,
            page.id,
            "XObject",
            IMAGE_RESOURCE_PREFIX,
            Object::Reference(image.id),
        )?;
        let ops = format!(
            "q {} 0 0 {} {} {} cm /{} Do Q\n",
            num(placement.width),
            num(placement.height),
            num(placement.x),
            num(placement.y),
            name
        );
        self.append(page, ops)
    }

    /// Fill a rectangle with `color` at `opacity`, multiplied over the page
    pub fn draw_rect(&mut self, page: &PageHandle, rect: &Rect, color: Color, opacity: f64) -> Result<()> {
        let opacity = opacity.clamp(0.0, 1.0);
        let mut gs = Dictionary::new();
        gs.set("Type", Object::Name(b"ExtGState".to_vec()));
        gs.set("ca", real(opacity));
        gs.set("CA", real(opacity));
        gs.set("BM", Object::Name(b"Multiply".to_vec()));
        let gs_id = self.doc.add_object(gs);
        let gs_name = resources::add_resource(
            &mut self.doc,
            page.id,
            "ExtGState",
            GSTATE_RESOURCE_PREFIX,
            Object::Reference(gs_id),
        )?;

        let (r, g, b) = color.to_normalized();
        let ops = format!(
            "q /{} gs {} {} {} rg {} {} {} {} re f Q\n",
            gs_name,
            num(r),
            num(g),
            num(b),
            num(rect.min_x),
            num(rect.min_y),
            num(rect.width()),
            num(rect.height())
        );
        self.append(page, ops)
    }

    /// Draw text with Helvetica, first baseline just below `top_left`
    pub fn draw_text(&mut self, page: &PageHandle, text: &str, top_left: (f64, f64), color: Color) -> Result<()> {
        let font_id = self.doc.add_object(helvetica_font());
        let font_name = resources::add_resource(
            &mut self.doc,
            page.id,
            "Font",
            FONT_RESOURCE_PREFIX,
            Object::Reference(font_id),
        )?;

        let size = TEXT_ANNOTATION_FONT_SIZE;
        let leading = size * crate::constants::LINE_HEIGHT_FACTOR;
        let (r, g, b) = color.to_normalized();
        let mut ops = format!(
            "q BT /{} {} Tf {} TL {} {} {} rg {} {} Td\n",
            font_name,
            num(size),
            num(leading),
            num(r),
            num(g),
            num(b),
            num(top_left.0),
            num(top_left.1 - size)
        );
        for (i, line) in text.lines().enumerate() {
            if i > 0 {
                ops.push_str("T*\n");
            }
            ops.push_str(&content_string(line));
            ops.push_str(" Tj\n");
        }
        ops.push_str("ET Q\n");
        self.append(page, ops)
    }

    /// Flatten the interactive form into page content.
    pub fn flatten_form(&mut self) -> Result<usize> {
        flatten::flatten_form(&mut self.doc, &mut self.wrapped_pages)
    }

    /// Serialize the document
    pub fn save(mut self) -> Result<Vec<u8>> {
        let mut out = Vec::new();
        self.doc.save_to(&mut out)?;
        Ok(out)
    }

    fn append(&mut self, page: &PageHandle, ops: String) -> Result<()> {
        resources::append_page_content(&mut self.doc, page.id, ops, &mut self.wrapped_pages)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_may_follow_junk() {
        assert!(verify_header(b"\x00\x00%PDF-1.7\n").is_ok());
        assert!(matches!(
            verify_header(b"<html></html>"),
            Err(OverlayError::InvalidDocument(_))
        ));
        assert!(verify_header(b"").is_err());
    }
}
