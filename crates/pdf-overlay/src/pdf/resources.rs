//! Page resources and content stream appends

use super::objects::inherited_attribute;
use crate::types::{OverlayError, Result};
use lopdf::{Dictionary, Document, Object, ObjectId, Stream};

// =============================================================================
// Resources
// =============================================================================

/// Register `value` under a fresh name in the page's `category` resources
/// (`XObject`, `ExtGState`, `Font`). Returns the chosen name.
pub fn add_resource(
    doc: &mut Document,
    page_id: ObjectId,
    category: &str,
    prefix: &str,
    value: Object,
) -> Result<String> {
    let resources_id = resources_id(doc, page_id)?;
    with_category(doc, resources_id, category, |dict| {
        let name = unique_name(dict, prefix);
        dict.set(name.as_bytes(), value);
        name
    })
}

/// Give the page its own indirect `/Resources` object.
///
/// Inline dictionaries are moved out, inherited ones are copied.
fn resources_id(doc: &mut Document, page_id: ObjectId) -> Result<ObjectId> {
    let page = doc.get_dictionary(page_id)?;
    let resources = match page.get(b"Resources") {
        Ok(Object::Reference(id)) => return Ok(*id),
        Ok(Object::Dictionary(dict)) => dict.clone(),
        _ => match inherited_attribute(doc, page, b"Resources") {
            Some(Object::Dictionary(dict)) => dict.clone(),
            _ => Dictionary::new(),
        },
    };
    let id = doc.add_object(resources);
    doc.get_dictionary_mut(page_id)?
        .set("Resources", Object::Reference(id));
    Ok(id)
}

/// Id of the dictionary stored at `owner[key]`, moving an inline one into
/// its own object and creating an empty one when absent.
pub fn indirect_dict_entry(doc: &mut Document, owner: ObjectId, key: &str) -> Result<ObjectId> {
    let dict = match doc.get_dictionary(owner)?.get(key.as_bytes()) {
        Ok(Object::Reference(id)) => return Ok(*id),
        Ok(Object::Dictionary(dict)) => dict.clone(),
        _ => Dictionary::new(),
    };
    let id = doc.add_object(dict);
    doc.get_dictionary_mut(owner)?.set(key, Object::Reference(id));
    Ok(id)
}

/// Run `f` on the `category` sub-dictionary of a resource dictionary
pub fn with_category<R>(
    doc: &mut Document,
    resources_id: ObjectId,
    category: &str,
    f: impl FnOnce(&mut Dictionary) -> R,
) -> Result<R> {
    let referenced = match doc.get_dictionary(resources_id)?.get(category.as_bytes()) {
        Ok(Object::Reference(id)) => Some(*id),
        _ => None,
    };
    if let Some(id) = referenced {
        return Ok(f(doc.get_dictionary_mut(id)?));
    }

    let resources = doc.get_dictionary_mut(resources_id)?;
    if !matches!(resources.get(category.as_bytes()), Ok(Object::Dictionary(_))) {
        resources.set(category, Object::Dictionary(Dictionary::new()));
    }
    let dict = resources.get_mut(category.as_bytes())?.as_dict_mut()?;
    Ok(f(dict))
}

fn unique_name(dict: &Dictionary, prefix: &str) -> String {
    (1..)
        .map(|n| format!("{prefix}{n}"))
        .find(|name| !dict.has(name.as_bytes()))
        .unwrap_or_else(|| prefix.to_string())
}

// =============================================================================
// Content Streams
// =============================================================================

/// Append operators to the end of a page's content.
///
/// The first append for a page (tracked by `wrapped`) brackets the existing
/// content in `q ... Q` so its graphics state cannot leak into ours.
pub fn append_page_content(
    doc: &mut Document,
    page_id: ObjectId,
    ops: String,
    wrapped: &mut std::collections::HashSet<ObjectId>,
) -> Result<()> {
    let existing: Vec<Object> = match doc.get_dictionary(page_id)?.get(b"Contents") {
        Ok(Object::Reference(id)) => vec![Object::Reference(*id)],
        Ok(Object::Array(arr)) => arr.clone(),
        Ok(_) => {
            return Err(OverlayError::InvalidDocument(
                "page /Contents is neither a stream reference nor an array".to_string(),
            ));
        }
        Err(_) => Vec::new(),
    };

    let mut contents = Vec::with_capacity(existing.len() + 2);
    let body = if wrapped.insert(page_id) && !existing.is_empty() {
        let open = doc.add_object(Stream::new(Dictionary::new(), b"q\n".to_vec()));
        contents.push(Object::Reference(open));
        contents.extend(existing);
        format!("Q\n{ops}")
    } else {
        contents.extend(existing);
        ops
    };

    let stream_id = doc.add_object(Stream::new(Dictionary::new(), body.into_bytes()));
    contents.push(Object::Reference(stream_id));
    doc.get_dictionary_mut(page_id)?
        .set("Contents", Object::Array(contents));
    Ok(())
}
