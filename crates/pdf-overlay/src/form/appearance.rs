//! Appearance stream generation for filled fields
//!
//! Viewers draw a widget from its `/AP /N` stream, and flattening stamps that
//! same stream into the page. A value written without a fresh appearance is
//! invisible once flattened.

use super::{FieldEntry, FieldFlags, FieldKind};
use crate::constants::{
    DEFAULT_FONT_SIZE, DEFAULT_ON_STATE, FALLBACK_FONT_RESOURCE, HELVETICA_CHAR_WIDTH_RATIO,
    LINE_HEIGHT_FACTOR, MAX_AUTO_FONT_SIZE, MIN_AUTO_FONT_SIZE, OFF_STATE, TEXT_FIELD_PADDING,
};
use crate::pdf::{
    content_string, dict_entry, helvetica_font, indirect_dict_entry, num, rect_from_object,
    rect_to_object, text_of, with_category,
};
use crate::types::{OverlayError, Rect, Result};
use lopdf::{Dictionary, Document, Object, ObjectId, Stream};

/// Font, size and colour parsed from a `/DA` string
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct DefaultAppearance {
    pub font: Option<String>,
    /// 0 means auto size
    pub size: f64,
    pub color: String,
}

impl DefaultAppearance {
    pub fn parse(da: &str) -> Self {
        let mut font = None;
        let mut size = DEFAULT_FONT_SIZE;
        let mut color = "0 g".to_string();
        let mut operands: Vec<&str> = Vec::new();

        for token in da.split_whitespace() {
            match token {
                "Tf" if operands.len() >= 2 => {
                    let n = operands.len();
                    font = Some(operands[n - 2].trim_start_matches('/').to_string());
                    size = operands[n - 1].parse().unwrap_or(DEFAULT_FONT_SIZE);
                    operands.clear();
                }
                "g" | "rg" | "k" => {
                    let arity = match token {
                        "g" => 1,
                        "rg" => 3,
                        _ => 4,
                    };
                    if operands.len() >= arity {
                        let args = &operands[operands.len() - arity..];
                        color = format!("{} {}", args.join(" "), token);
                    }
                    operands.clear();
                }
                t if t.chars().next().is_some_and(|c| c.is_ascii_alphabetic()) => {
                    operands.clear();
                }
                t => operands.push(t),
            }
        }

        Self { font, size, color }
    }
}

/// Rebuild the appearance of every widget of one field
pub(crate) fn regenerate(doc: &mut Document, acroform: ObjectId, entry: &FieldEntry) -> Result<()> {
    match entry.kind {
        FieldKind::Text | FieldKind::ComboBox | FieldKind::ListBox => {
            text_appearance(doc, acroform, entry)
        }
        FieldKind::Checkbox => {
            for &widget in &entry.widgets {
                ensure_checkbox_states(doc, widget)?;
            }
            Ok(())
        }
        FieldKind::Radio | FieldKind::PushButton | FieldKind::Signature | FieldKind::Unknown => {
            Ok(())
        }
    }
}

// =============================================================================
// Text and Choice Fields
// =============================================================================

fn text_appearance(doc: &mut Document, acroform: ObjectId, entry: &FieldEntry) -> Result<()> {
    let value = displayed_value(doc, entry);
    let da = DefaultAppearance::parse(entry.da.as_deref().unwrap_or_default());
    let (font_name, font) = resolve_font(doc, acroform, da.font.as_deref())?;

    for &widget in &entry.widgets {
        let rect = doc
            .get_dictionary(widget)
            .ok()
            .and_then(|w| w.get(b"Rect").ok())
            .and_then(|r| rect_from_object(doc, r))
            .ok_or_else(|| {
                OverlayError::AppearanceRegenerationFailed("widget has no /Rect".to_string())
            })?;
        let bbox = Rect::new(0.0, 0.0, rect.width(), rect.height());
        let content = text_stream(&value, &bbox, &font_name, &da, entry);

        let mut fonts = Dictionary::new();
        fonts.set(font_name.as_bytes(), font.clone());
        let mut resources = Dictionary::new();
        resources.set("Font", Object::Dictionary(fonts));

        let stream_id = doc.add_object(Stream::new(form_dict(&bbox, resources), content.into_bytes()));
        let mut ap = Dictionary::new();
        ap.set("N", Object::Reference(stream_id));
        doc.get_dictionary_mut(widget)?.set("AP", Object::Dictionary(ap));
    }
    Ok(())
}

/// Text the widget shows: the value, its display label for choices, or
/// asterisks for passwords
fn displayed_value(doc: &Document, entry: &FieldEntry) -> String {
    let value = doc
        .get_dictionary(entry.id)
        .ok()
        .and_then(|d| d.get(b"V").ok())
        .and_then(|v| text_of(doc, v))
        .unwrap_or_default();

    if entry.kind.is_choice() {
        return entry
            .options
            .iter()
            .find(|o| o.export == value)
            .map(|o| o.display.clone())
            .unwrap_or(value);
    }
    if entry.flags.contains(FieldFlags::PASSWORD) {
        return "*".repeat(value.chars().count());
    }
    value
}

/// Font resource name and object for a `/DA` font, registering Helvetica
/// as `/Helv` in `/AcroForm /DR` when the font is missing.
fn resolve_font(doc: &mut Document, acroform: ObjectId, requested: Option<&str>) -> Result<(String, Object)> {
    let dr = indirect_dict_entry(doc, acroform, "DR")?;
    if let Some(name) = requested {
        let found = with_category(doc, dr, "Font", |fonts| fonts.get(name.as_bytes()).ok().cloned())?;
        if let Some(font) = found {
            return Ok((name.to_string(), font));
        }
        log::debug!("Font /{name} is not in the form resources, using /{FALLBACK_FONT_RESOURCE}");
    }

    let existing = with_category(doc, dr, "Font", |fonts| {
        fonts.get(FALLBACK_FONT_RESOURCE.as_bytes()).ok().cloned()
    })?;
    let font = match existing {
        Some(font) => font,
        None => {
            let font = Object::Reference(doc.add_object(helvetica_font()));
            let value = font.clone();
            with_category(doc, dr, "Font", move |fonts| {
                fonts.set(FALLBACK_FONT_RESOURCE, value);
            })?;
            font
        }
    };
    Ok((FALLBACK_FONT_RESOURCE.to_string(), font))
}

fn text_stream(value: &str, bbox: &Rect, font_name: &str, da: &DefaultAppearance, entry: &FieldEntry) -> String {
    let pad = TEXT_FIELD_PADDING;
    let inner_width = (bbox.width() - 2.0 * pad).max(0.0);
    let multiline = entry.flags.contains(FieldFlags::MULTILINE);

    let size = if da.size > 0.0 {
        da.size
    } else {
        auto_font_size(value, bbox, multiline)
    };
    let leading = size * LINE_HEIGHT_FACTOR;

    let lines = if multiline {
        wrap_lines(value, inner_width, size)
    } else {
        vec![value.replace(['\r', '\n'], " ")]
    };

    let mut out = String::from("/Tx BMC\nq\n");
    out.push_str(&format!(
        "{} {} {} {} re W n\n",
        num(pad / 2.0),
        num(pad / 2.0),
        num((bbox.width() - pad).max(0.0)),
        num((bbox.height() - pad).max(0.0))
    ));
    if !value.is_empty() {
        out.push_str(&format!("BT\n/{} {} Tf\n{}\n", font_name, num(size), da.color));
        let first_baseline = if multiline {
            bbox.height() - pad - size
        } else {
            (bbox.height() - size) / 2.0 + size * 0.22
        };
        for (i, line) in lines.iter().enumerate() {
            let width = text_width(line, size);
            let x = match entry.quadding {
                1 => (bbox.width() - width) / 2.0,
                2 => bbox.width() - pad - width,
                _ => pad,
            };
            let y = first_baseline - i as f64 * leading;
            out.push_str(&format!(
                "1 0 0 1 {} {} Tm\n{} Tj\n",
                num(x),
                num(y),
                content_string(line)
            ));
        }
        out.push_str("ET\n");
    }
    out.push_str("Q\nEMC\n");
    out
}

fn text_width(text: &str, size: f64) -> f64 {
    text.chars().count() as f64 * size * HELVETICA_CHAR_WIDTH_RATIO
}

/// Largest size that fits the widget, within the auto-size bounds
fn auto_font_size(value: &str, bbox: &Rect, multiline: bool) -> f64 {
    let pad = TEXT_FIELD_PADDING;
    let by_height = (bbox.height() - 2.0 * pad) / LINE_HEIGHT_FACTOR;
    let size = if multiline || value.is_empty() {
        by_height
    } else {
        let chars = value.chars().count() as f64;
        let by_width = (bbox.width() - 2.0 * pad) / (chars * HELVETICA_CHAR_WIDTH_RATIO);
        by_height.min(by_width)
    };
    size.clamp(MIN_AUTO_FONT_SIZE, MAX_AUTO_FONT_SIZE)
}

/// Greedy word wrap against the approximate Helvetica width
fn wrap_lines(value: &str, max_width: f64, size: f64) -> Vec<String> {
    let mut lines = Vec::new();
    for paragraph in value.split('\n') {
        let mut current = String::new();
        for word in paragraph.split_whitespace() {
            let candidate = if current.is_empty() {
                word.to_string()
            } else {
                format!("{current} {word}")
            };
            if !current.is_empty() && text_width(&candidate, size) > max_width {
                lines.push(std::mem::replace(&mut current, word.to_string()));
            } else {
                current = candidate;
            }
        }
        lines.push(current);
    }
    lines
}

// =============================================================================
// Checkboxes
// =============================================================================

/// Give a checkbox widget on/off appearances when it has none
fn ensure_checkbox_states(doc: &mut Document, widget: ObjectId) -> Result<()> {
    let dict = doc.get_dictionary(widget)?;
    let has_states = dict_entry(doc, dict, b"AP")
        .and_then(|ap| dict_entry(doc, ap, b"N"))
        .is_some_and(|n| !n.is_empty());
    if has_states {
        return Ok(());
    }

    let rect = dict
        .get(b"Rect")
        .ok()
        .and_then(|r| rect_from_object(doc, r))
        .ok_or_else(|| {
            OverlayError::AppearanceRegenerationFailed("checkbox widget has no /Rect".to_string())
        })?;
    let bbox = Rect::new(0.0, 0.0, rect.width(), rect.height());

    let on = doc.add_object(Stream::new(
        form_dict(&bbox, Dictionary::new()),
        check_mark(&bbox).into_bytes(),
    ));
    let off = doc.add_object(Stream::new(form_dict(&bbox, Dictionary::new()), Vec::new()));

    let mut states = Dictionary::new();
    states.set(DEFAULT_ON_STATE, Object::Reference(on));
    states.set(OFF_STATE, Object::Reference(off));
    let mut ap = Dictionary::new();
    ap.set("N", Object::Dictionary(states));

    let widget = doc.get_dictionary_mut(widget)?;
    widget.set("AP", Object::Dictionary(ap));
    if !widget.has(b"AS") {
        widget.set("AS", Object::Name(OFF_STATE.as_bytes().to_vec()));
    }
    Ok(())
}

fn check_mark(bbox: &Rect) -> String {
    let (w, h) = (bbox.width(), bbox.height());
    let margin = w * 0.2;
    format!(
        "q 0 G {} w 1 J 1 j {} {} m {} {} l {} {} l S Q\n",
        num(w * 0.1),
        num(margin),
        num(h * 0.5),
        num(w * 0.4),
        num(margin),
        num(w - margin),
        num(h - margin)
    )
}

fn form_dict(bbox: &Rect, resources: Dictionary) -> Dictionary {
    let mut dict = Dictionary::new();
    dict.set("Type", Object::Name(b"XObject".to_vec()));
    dict.set("Subtype", Object::Name(b"Form".to_vec()));
    dict.set("BBox", rect_to_object(bbox));
    dict.set("Resources", Object::Dictionary(resources));
    dict
}
