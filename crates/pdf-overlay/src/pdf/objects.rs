//! Small helpers over the lopdf object model

use crate::constants::{DEFAULT_PAGE_DIMENSIONS, MAX_FIELD_DEPTH};
use crate::types::{Rect, Result};
use lopdf::{Dictionary, Document, Object, ObjectId, StringFormat};

// =============================================================================
// Numbers and Rectangles
// =============================================================================

/// Extract a numeric value from a PDF object
pub fn number(obj: &Object) -> Option<f64> {
    match obj {
        Object::Integer(i) => Some(*i as f64),
        Object::Real(r) => Some(*r as f64),
        _ => None,
    }
}

/// Read a 4-element rectangle array, following a reference if needed
pub fn rect_from_object(doc: &Document, obj: &Object) -> Option<Rect> {
    let (_, obj) = doc.dereference(obj).ok()?;
    let arr = obj.as_array().ok()?;
    if arr.len() != 4 {
        return None;
    }
    let mut values = [0.0; 4];
    for (slot, item) in values.iter_mut().zip(arr) {
        let (_, item) = doc.dereference(item).ok()?;
        *slot = number(item)?;
    }
    Some(Rect::new(values[0], values[1], values[2], values[3]).normalized())
}

pub fn rect_to_object(rect: &Rect) -> Object {
    Object::Array(vec![
        real(rect.min_x),
        real(rect.min_y),
        real(rect.max_x),
        real(rect.max_y),
    ])
}

pub fn real(value: f64) -> Object {
    Object::Real(value as f32)
}

/// Format a number for a content stream: at most 4 decimals, no trailing zeros
pub fn num(value: f64) -> String {
    if !value.is_finite() {
        return "0".to_string();
    }
    let s = format!("{:.4}", value);
    let s = s.trim_end_matches('0').trim_end_matches('.');
    match s {
        "" | "-0" => "0".to_string(),
        _ => s.to_string(),
    }
}

// =============================================================================
// Dictionary Lookups
// =============================================================================

/// Follow `/Parent` links until `key` is found.
///
/// Used for inheritable page attributes (`/MediaBox`, `/Resources`) and field
/// attributes (`/FT`, `/Ff`, `/DA`, `/Q`).
pub fn inherited_attribute<'a>(
    doc: &'a Document,
    dict: &'a Dictionary,
    key: &[u8],
) -> Option<&'a Object> {
    let mut current = dict;
    for _ in 0..MAX_FIELD_DEPTH {
        if let Ok(value) = current.get(key) {
            return doc.dereference(value).ok().map(|(_, obj)| obj);
        }
        let parent = current.get(b"Parent").ok()?.as_reference().ok()?;
        current = doc.get_dictionary(parent).ok()?;
    }
    None
}

/// Look up a name-valued entry
pub fn name_of<'a>(doc: &'a Document, dict: &'a Dictionary, key: &[u8]) -> Option<&'a [u8]> {
    let obj = dict.get(key).ok()?;
    let (_, obj) = doc.dereference(obj).ok()?;
    obj.as_name().ok()
}

/// Resolve an entry to a dictionary, whether inline or referenced
pub fn dict_entry<'a>(doc: &'a Document, dict: &'a Dictionary, key: &[u8]) -> Option<&'a Dictionary> {
    let obj = dict.get(key).ok()?;
    match doc.dereference(obj).ok()?.1 {
        Object::Dictionary(d) => Some(d),
        Object::Stream(s) => Some(&s.dict),
        _ => None,
    }
}

/// Object id of the document catalog
pub fn catalog_id(doc: &Document) -> Result<ObjectId> {
    Ok(doc.trailer.get(b"Root")?.as_reference()?)
}

/// Object id of `/AcroForm`, moving an inline form dictionary into its own object.
pub fn acroform_id(doc: &mut Document) -> Result<Option<ObjectId>> {
    let root = catalog_id(doc)?;
    let entry = match doc.get_dictionary(root)?.get(b"AcroForm") {
        Ok(obj) => obj.clone(),
        Err(_) => return Ok(None),
    };
    match entry {
        Object::Reference(id) => Ok(Some(id)),
        Object::Dictionary(dict) => {
            let id = doc.add_object(dict);
            doc.get_dictionary_mut(root)?
                .set("AcroForm", Object::Reference(id));
            Ok(Some(id))
        }
        _ => Ok(None),
    }
}

/// Page size from the (possibly inherited) MediaBox, US Letter when absent
pub fn page_media_box(doc: &Document, page_id: ObjectId) -> Result<Rect> {
    let page = doc.get_dictionary(page_id)?;
    let rect = inherited_attribute(doc, page, b"MediaBox").and_then(|obj| rect_from_object(doc, obj));
    Ok(rect.unwrap_or_else(|| {
        Rect::new(0.0, 0.0, DEFAULT_PAGE_DIMENSIONS.0, DEFAULT_PAGE_DIMENSIONS.1)
    }))
}

// =============================================================================
// Strings
// =============================================================================

/// Decode a PDF text string (UTF-16BE with BOM, otherwise PDFDocEncoding)
pub fn decode_text_string(bytes: &[u8]) -> String {
    if bytes.len() >= 2 && bytes[0] == 0xFE && bytes[1] == 0xFF {
        let units: Vec<u16> = bytes[2..]
            .chunks_exact(2)
            .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
            .collect();
        return String::from_utf16_lossy(&units);
    }
    // PDFDocEncoding matches Latin-1 for the characters forms actually use
    bytes.iter().map(|&b| b as char).collect()
}

/// Read a string or name entry as text
pub fn text_of(doc: &Document, obj: &Object) -> Option<String> {
    match doc.dereference(obj).ok()?.1 {
        Object::String(bytes, _) => Some(decode_text_string(bytes)),
        Object::Name(name) => Some(String::from_utf8_lossy(name).into_owned()),
        _ => None,
    }
}

/// Encode a value as a PDF text string.
///
/// Latin-1 text stays a literal string; anything else becomes UTF-16BE
/// with a byte order mark.
pub fn encode_text_string(value: &str) -> Object {
    if value.chars().all(|c| (c as u32) <= 0xFF) {
        Object::String(value.chars().map(|c| c as u8).collect(), StringFormat::Literal)
    } else {
        let mut bytes = vec![0xFE, 0xFF];
        for unit in value.encode_utf16() {
            bytes.extend_from_slice(&unit.to_be_bytes());
        }
        Object::String(bytes, StringFormat::Hexadecimal)
    }
}

/// Escape text for a `( ... ) Tj` operand in WinAnsi encoding.
///
/// Characters outside Latin-1 are replaced with `?`.
pub fn content_string(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 2);
    out.push('(');
    for c in value.chars() {
        match c {
            '(' | ')' | '\\' => {
                out.push('\\');
                out.push(c);
            }
            '\r' | '\n' => out.push(' '),
            c if (c as u32) < 0x20 => {}
            c if (c as u32) < 0x80 => out.push(c),
            c if (c as u32) <= 0xFF => out.push_str(&format!("\\{:03o}", c as u32)),
            _ => out.push('?'),
        }
    }
    out.push(')');
    out
}

/// Dictionary for a standard 14 Helvetica font in WinAnsi encoding
pub fn helvetica_font() -> Dictionary {
    let mut font = Dictionary::new();
    font.set("Type", Object::Name(b"Font".to_vec()));
    font.set("Subtype", Object::Name(b"Type1".to_vec()));
    font.set("BaseFont", Object::Name(crate::constants::FALLBACK_BASE_FONT.as_bytes().to_vec()));
    font.set("Encoding", Object::Name(b"WinAnsiEncoding".to_vec()));
    font
}
