//! Form flattening
//!
//! Each widget's normal appearance is drawn into its page's content as a form
//! XObject, then the widget annotations and the `/AcroForm` entry are
//! removed. The result has no interactive fields left.

use super::objects::{catalog_id, dict_entry, name_of, num, number, rect_from_object};
use super::resources::{add_resource, append_page_content};
use crate::constants::FLATTEN_RESOURCE_PREFIX;
use crate::types::{OverlayError, Rect, Result};
use lopdf::{Document, Object, ObjectId};
use std::collections::HashSet;

/// Annotation flags that keep a widget off the page
const HIDDEN_FLAGS: i64 = 0b10 | 0b10_0000;

/// Flatten every widget in the document. Returns how many were stamped.
pub fn flatten_form(doc: &mut Document, wrapped: &mut HashSet<ObjectId>) -> Result<usize> {
    let root = catalog_id(doc)?;
    if !doc.get_dictionary(root)?.has(b"AcroForm") {
        return Err(OverlayError::FormNotFound);
    }

    let pages: Vec<ObjectId> = doc.get_pages().into_values().collect();
    let mut stamped = 0;
    for page_id in pages {
        stamped += flatten_page(doc, page_id, wrapped)?;
    }

    doc.get_dictionary_mut(root)?.remove(b"AcroForm");
    log::debug!("Flattened {stamped} widget appearances");
    Ok(stamped)
}

struct WidgetStamp {
    appearance: ObjectId,
    rect: Rect,
    bbox: Rect,
}

fn flatten_page(doc: &mut Document, page_id: ObjectId, wrapped: &mut HashSet<ObjectId>) -> Result<usize> {
    let (annots_owner, annots) = match page_annots(doc, page_id)? {
        Some(found) => found,
        None => return Ok(0),
    };

    let mut kept = Vec::with_capacity(annots.len());
    let mut stamps = Vec::new();
    for annot in annots {
        let Ok((_, Object::Dictionary(dict))) = doc.dereference(&annot) else {
            kept.push(annot);
            continue;
        };
        if name_of(doc, dict, b"Subtype") != Some(b"Widget".as_slice()) {
            kept.push(annot);
            continue;
        }
        if widget_flags(dict) & HIDDEN_FLAGS != 0 {
            continue;
        }
        if let Some(stamp) = widget_stamp(doc, dict) {
            stamps.push(stamp);
        }
    }

    let mut ops = String::new();
    for stamp in &stamps {
        if let Ok(Object::Stream(stream)) = doc.get_object_mut(stamp.appearance) {
            if !stream.dict.has(b"Subtype") {
                stream.dict.set("Type", Object::Name(b"XObject".to_vec()));
                stream.dict.set("Subtype", Object::Name(b"Form".to_vec()));
            }
        }
        let name = add_resource(
            doc,
            page_id,
            "XObject",
            FLATTEN_RESOURCE_PREFIX,
            Object::Reference(stamp.appearance),
        )?;
        ops.push_str(&placement_ops(&name, &stamp.rect, &stamp.bbox));
    }
    if !ops.is_empty() {
        append_page_content(doc, page_id, ops, wrapped)?;
    }

    match annots_owner {
        Some(array_id) => *doc.get_object_mut(array_id)? = Object::Array(kept),
        None => {
            doc.get_dictionary_mut(page_id)?
                .set("Annots", Object::Array(kept));
        }
    }
    Ok(stamps.len())
}

/// `/Annots` array of a page, with the id of the array object when it is
/// stored indirectly
fn page_annots(doc: &Document, page_id: ObjectId) -> Result<Option<(Option<ObjectId>, Vec<Object>)>> {
    let page = doc.get_dictionary(page_id)?;
    let Ok(entry) = page.get(b"Annots") else {
        return Ok(None);
    };
    let (owner, obj) = doc.dereference(entry)?;
    Ok(obj.as_array().ok().map(|arr| (owner, arr.clone())))
}

/// Appearance stream selected by `/AS`, with where and how large to draw it
fn widget_stamp(doc: &Document, widget: &lopdf::Dictionary) -> Option<WidgetStamp> {
    let rect = rect_from_object(doc, widget.get(b"Rect").ok()?)?;
    if rect.is_degenerate() {
        return None;
    }
    let ap = dict_entry(doc, widget, b"AP")?;
    let normal = ap.get(b"N").ok()?;

    let appearance = match doc.dereference(normal).ok()? {
        (Some(id), Object::Stream(_)) => id,
        (_, Object::Dictionary(states)) => {
            let state = name_of(doc, widget, b"AS")?;
            states.get(state).ok()?.as_reference().ok()?
        }
        _ => return None,
    };

    let stream = doc.get_object(appearance).ok()?.as_stream().ok()?;
    let bbox = stream
        .dict
        .get(b"BBox")
        .ok()
        .and_then(|b| rect_from_object(doc, b))
        .unwrap_or_else(|| Rect::new(0.0, 0.0, rect.width(), rect.height()));
    Some(WidgetStamp {
        appearance,
        rect,
        bbox,
    })
}

/// Map the appearance BBox onto the widget rect
fn placement_ops(name: &str, rect: &Rect, bbox: &Rect) -> String {
    let sx = if bbox.width() > 0.0 { rect.width() / bbox.width() } else { 1.0 };
    let sy = if bbox.height() > 0.0 { rect.height() / bbox.height() } else { 1.0 };
    let tx = rect.min_x - bbox.min_x * sx;
    let ty = rect.min_y - bbox.min_y * sy;
    format!(
        "q {} 0 0 {} {} {} cm /{} Do Q\n",
        num(sx),
        num(sy),
        num(tx),
        num(ty),
        name
    )
}

fn widget_flags(widget: &lopdf::Dictionary) -> i64 {
    widget.get(b"F").ok().and_then(number).map(|f| f as i64).unwrap_or(0)
}
