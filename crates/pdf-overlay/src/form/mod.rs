//! Interactive form access
//!
//! [`FormHandle`] indexes the `/AcroForm` field tree by fully qualified name
//! and writes typed values back into it. Appearance streams for changed
//! fields are rebuilt by [`FormHandle::update_appearances`].

mod appearance;
mod fill;
mod flags;

pub use fill::{FillReport, fill};
pub use flags::FieldFlags;

use crate::constants::{DEFAULT_ON_STATE, MAX_FIELD_DEPTH, OFF_STATE};
use crate::pdf::{acroform_id, dict_entry, encode_text_string, name_of, text_of};
use crate::types::{OverlayError, Result};
use lopdf::{Document, Object, ObjectId};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet, HashSet};

/// What kind of value a field holds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldKind {
    Text,
    Checkbox,
    Radio,
    ComboBox,
    ListBox,
    PushButton,
    Signature,
    Unknown,
}

impl FieldKind {
    fn classify(field_type: Option<&[u8]>, flags: FieldFlags) -> Self {
        match field_type {
            Some(b"Tx") => FieldKind::Text,
            Some(b"Btn") if flags.contains(FieldFlags::PUSHBUTTON) => FieldKind::PushButton,
            Some(b"Btn") if flags.contains(FieldFlags::RADIO) => FieldKind::Radio,
            Some(b"Btn") => FieldKind::Checkbox,
            Some(b"Ch") if flags.contains(FieldFlags::COMBO) => FieldKind::ComboBox,
            Some(b"Ch") => FieldKind::ListBox,
            Some(b"Sig") => FieldKind::Signature,
            _ => FieldKind::Unknown,
        }
    }

    pub fn is_choice(self) -> bool {
        matches!(self, FieldKind::ComboBox | FieldKind::ListBox)
    }
}

impl std::fmt::Display for FieldKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            FieldKind::Text => "text",
            FieldKind::Checkbox => "checkbox",
            FieldKind::Radio => "radio",
            FieldKind::ComboBox => "combo box",
            FieldKind::ListBox => "list box",
            FieldKind::PushButton => "push button",
            FieldKind::Signature => "signature",
            FieldKind::Unknown => "unknown",
        };
        f.write_str(name)
    }
}

/// Public summary of one terminal field
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldInfo {
    pub name: String,
    pub kind: FieldKind,
    pub value: Option<String>,
    /// Export values of a choice field, or on-states of a button
    pub options: Vec<String>,
    pub read_only: bool,
}

/// Choice option as export value and display text
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct ChoiceOption {
    pub export: String,
    pub display: String,
}

#[derive(Debug, Clone)]
pub(crate) struct FieldEntry {
    pub id: ObjectId,
    pub kind: FieldKind,
    pub flags: FieldFlags,
    pub widgets: Vec<ObjectId>,
    /// Default appearance, inherited from ancestors or the form
    pub da: Option<String>,
    /// Alignment: 0 left, 1 centered, 2 right
    pub quadding: i64,
    pub max_len: Option<usize>,
    pub options: Vec<ChoiceOption>,
}

/// Attributes a field inherits from its ancestors
#[derive(Clone, Default)]
struct Inherited {
    field_type: Option<Vec<u8>>,
    flags: Option<i64>,
    da: Option<String>,
    quadding: Option<i64>,
    max_len: Option<i64>,
}

pub struct FormHandle<'a> {
    doc: &'a mut Document,
    acroform: ObjectId,
    fields: BTreeMap<String, FieldEntry>,
    dirty: BTreeSet<String>,
}

impl<'a> FormHandle<'a> {
    /// Index every terminal field of the document's form
    pub fn open(doc: &'a mut Document) -> Result<Self> {
        let acroform = acroform_id(doc)?.ok_or(OverlayError::FormNotFound)?;
        let fields = index_fields(doc, acroform)?;
        log::debug!("Indexed {} form fields", fields.len());
        Ok(Self {
            doc,
            acroform,
            fields,
            dirty: BTreeSet::new(),
        })
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.fields.contains_key(name)
    }

    pub fn kind(&self, name: &str) -> Option<FieldKind> {
        self.fields.get(name).map(|entry| entry.kind)
    }

    /// All terminal fields in name order
    pub fn fields(&self) -> Vec<FieldInfo> {
        self.fields
            .iter()
            .map(|(name, entry)| self.info(name, entry))
            .collect()
    }

    pub fn field(&self, name: &str) -> Option<FieldInfo> {
        self.fields.get(name).map(|entry| self.info(name, entry))
    }

    /// Current `/V` of a field as text
    pub fn value(&self, name: &str) -> Option<String> {
        let entry = self.fields.get(name)?;
        let dict = self.doc.get_dictionary(entry.id).ok()?;
        text_of(self.doc, dict.get(b"V").ok()?)
    }

    fn info(&self, name: &str, entry: &FieldEntry) -> FieldInfo {
        let options = match entry.kind {
            FieldKind::Checkbox | FieldKind::Radio => entry
                .widgets
                .iter()
                .filter_map(|&w| on_state(self.doc, w))
                .collect::<BTreeSet<_>>()
                .into_iter()
                .collect(),
            _ => entry.options.iter().map(|o| o.export.clone()).collect(),
        };
        FieldInfo {
            name: name.to_string(),
            kind: entry.kind,
            value: self.value(name),
            options,
            read_only: entry.flags.contains(FieldFlags::READ_ONLY),
        }
    }

    fn entry(&self, name: &str) -> Result<&FieldEntry> {
        self.fields
            .get(name)
            .ok_or_else(|| OverlayError::FieldNotFound(name.to_string()))
    }

    /// Write a text value. Respects `/MaxLen`.
    pub fn set_text(&mut self, name: &str, value: &str) -> Result<()> {
        let entry = self.entry(name)?;
        if entry.kind != FieldKind::Text {
            return Err(field_error(name, format!("{} field does not take text", entry.kind)));
        }
        if let Some(max_len) = entry.max_len {
            if value.chars().count() > max_len {
                return Err(field_error(
                    name,
                    format!("value is longer than the field limit of {max_len} characters"),
                ));
            }
        }
        let id = entry.id;
        self.doc
            .get_dictionary_mut(id)?
            .set("V", encode_text_string(value));
        self.dirty.insert(name.to_string());
        Ok(())
    }

    /// Check or uncheck a checkbox.
    ///
    /// The on-state name comes from each widget's appearance dictionary,
    /// `Yes` when it has none.
    pub fn set_checked(&mut self, name: &str, checked: bool) -> Result<()> {
        let entry = self.entry(name)?;
        if entry.kind != FieldKind::Checkbox {
            return Err(field_error(name, format!("{} field cannot be checked", entry.kind)));
        }
        let (id, widgets) = (entry.id, entry.widgets.clone());

        let mut value = OFF_STATE.to_string();
        for widget in widgets {
            let on = on_state(self.doc, widget).unwrap_or_else(|| DEFAULT_ON_STATE.to_string());
            let state = if checked { on } else { OFF_STATE.to_string() };
            if checked && value == OFF_STATE {
                value = state.clone();
            }
            self.doc
                .get_dictionary_mut(widget)?
                .set("AS", Object::Name(state.into_bytes()));
        }
        self.doc
            .get_dictionary_mut(id)?
            .set("V", Object::Name(value.into_bytes()));
        self.dirty.insert(name.to_string());
        Ok(())
    }

    /// Select an option of a radio group, combo box or list box.
    pub fn select(&mut self, name: &str, value: &str) -> Result<()> {
        let entry = self.entry(name)?.clone();
        match entry.kind {
            FieldKind::Radio => self.select_radio(name, &entry, value)?,
            FieldKind::ComboBox | FieldKind::ListBox => self.select_choice(name, &entry, value)?,
            kind => return Err(field_error(name, format!("{kind} field has no options"))),
        }
        self.dirty.insert(name.to_string());
        Ok(())
    }

    fn select_radio(&mut self, name: &str, entry: &FieldEntry, value: &str) -> Result<()> {
        let states: Vec<(ObjectId, Option<String>)> = entry
            .widgets
            .iter()
            .map(|&w| (w, on_state(self.doc, w)))
            .collect();

        let turning_off = value == OFF_STATE;
        if turning_off && entry.flags.contains(FieldFlags::NO_TOGGLE_TO_OFF) {
            return Err(field_error(name, "radio group cannot be switched off"));
        }
        if !turning_off && !states.iter().any(|(_, s)| s.as_deref() == Some(value)) {
            return Err(field_error(name, format!("no radio option named '{value}'")));
        }

        for (widget, state) in states {
            let selected = !turning_off && state.as_deref() == Some(value);
            let appearance = if selected { value } else { OFF_STATE };
            self.doc
                .get_dictionary_mut(widget)?
                .set("AS", Object::Name(appearance.as_bytes().to_vec()));
        }
        self.doc
            .get_dictionary_mut(entry.id)?
            .set("V", Object::Name(value.as_bytes().to_vec()));
        Ok(())
    }

    fn select_choice(&mut self, name: &str, entry: &FieldEntry, value: &str) -> Result<()> {
        let index = entry
            .options
            .iter()
            .position(|o| o.export == value || o.display == value);
        let export = match index {
            Some(i) => entry.options[i].export.clone(),
            None if entry.options.is_empty() || entry.flags.contains(FieldFlags::EDIT) => {
                value.to_string()
            }
            None => {
                return Err(field_error(name, format!("'{value}' is not one of the field's options")));
            }
        };

        let dict = self.doc.get_dictionary_mut(entry.id)?;
        dict.set("V", encode_text_string(&export));
        match (entry.kind, index) {
            (FieldKind::ListBox, Some(i)) => {
                dict.set("I", Object::Array(vec![Object::Integer(i as i64)]));
            }
            _ => {
                dict.remove(b"I");
            }
        }
        Ok(())
    }

    /// Write a value to a field of any settable kind
    pub fn set_value(&mut self, name: &str, value: &str) -> Result<()> {
        let entry = self.entry(name)?;
        match entry.kind {
            FieldKind::PushButton | FieldKind::Signature => {
                Err(field_error(name, format!("{} fields do not hold a value", entry.kind)))
            }
            _ => {
                let id = entry.id;
                self.doc
                    .get_dictionary_mut(id)?
                    .set("V", encode_text_string(value));
                self.dirty.insert(name.to_string());
                Ok(())
            }
        }
    }

    /// Rebuild appearance streams of every field changed so far.
    ///
    /// Returns the fields whose appearance could not be rebuilt, with why.
    pub fn update_appearances(&mut self) -> Vec<(String, String)> {
        let mut failures = Vec::new();
        let dirty = std::mem::take(&mut self.dirty);
        for name in dirty {
            let Some(entry) = self.fields.get(&name) else {
                continue;
            };
            if let Err(e) = appearance::regenerate(self.doc, self.acroform, entry) {
                log::warn!("Could not rebuild appearance of field '{name}': {e}");
                failures.push((name, e.to_string()));
            }
        }
        failures
    }
}

fn field_error(name: &str, reason: impl Into<String>) -> OverlayError {
    OverlayError::FieldValue {
        field: name.to_string(),
        reason: reason.into(),
    }
}

/// First non-Off state in a widget's `/AP /N` dictionary
pub(crate) fn on_state(doc: &Document, widget: ObjectId) -> Option<String> {
    let dict = doc.get_dictionary(widget).ok()?;
    let ap = dict_entry(doc, dict, b"AP")?;
    let normal = dict_entry(doc, ap, b"N")?;
    normal
        .iter()
        .map(|(key, _)| key)
        .find(|key| key.as_slice() != OFF_STATE.as_bytes())
        .map(|key| String::from_utf8_lossy(key).into_owned())
}

// =============================================================================
// Field Tree
// =============================================================================

fn index_fields(doc: &Document, acroform: ObjectId) -> Result<BTreeMap<String, FieldEntry>> {
    let form = doc.get_dictionary(acroform)?;
    let roots: Vec<Object> = match form.get(b"Fields") {
        Ok(obj) => doc
            .dereference(obj)?
            .1
            .as_array()
            .map(|arr| arr.clone())
            .unwrap_or_default(),
        Err(_) => Vec::new(),
    };
    let inherited = Inherited {
        da: form.get(b"DA").ok().and_then(|da| text_of(doc, da)),
        quadding: form.get(b"Q").ok().and_then(|q| q.as_i64().ok()),
        ..Inherited::default()
    };

    let mut fields = BTreeMap::new();
    let mut visited = HashSet::new();
    for root in roots {
        if let Object::Reference(id) = root {
            walk_field(doc, id, None, &inherited, 0, &mut visited, &mut fields);
        }
    }
    Ok(fields)
}

fn walk_field(
    doc: &Document,
    id: ObjectId,
    parent_name: Option<&str>,
    inherited: &Inherited,
    depth: usize,
    visited: &mut HashSet<ObjectId>,
    fields: &mut BTreeMap<String, FieldEntry>,
) {
    if depth >= MAX_FIELD_DEPTH || !visited.insert(id) {
        return;
    }
    let Ok(dict) = doc.get_dictionary(id) else {
        return;
    };

    let partial = dict.get(b"T").ok().and_then(|t| text_of(doc, t));
    let full_name = match (parent_name, partial) {
        (Some(parent), Some(name)) => format!("{parent}.{name}"),
        (Some(parent), None) => parent.to_string(),
        (None, Some(name)) => name,
        (None, None) => String::new(),
    };

    let inherited = Inherited {
        field_type: name_of(doc, dict, b"FT")
            .map(|ft| ft.to_vec())
            .or_else(|| inherited.field_type.clone()),
        flags: dict
            .get(b"Ff")
            .ok()
            .and_then(|f| f.as_i64().ok())
            .or(inherited.flags),
        da: dict
            .get(b"DA")
            .ok()
            .and_then(|da| text_of(doc, da))
            .or_else(|| inherited.da.clone()),
        quadding: dict
            .get(b"Q")
            .ok()
            .and_then(|q| q.as_i64().ok())
            .or(inherited.quadding),
        max_len: dict
            .get(b"MaxLen")
            .ok()
            .and_then(|m| m.as_i64().ok())
            .or(inherited.max_len),
    };

    let kids: Vec<ObjectId> = dict
        .get(b"Kids")
        .ok()
        .and_then(|k| doc.dereference(k).ok())
        .and_then(|(_, k)| k.as_array().ok())
        .map(|arr| arr.iter().filter_map(|k| k.as_reference().ok()).collect())
        .unwrap_or_default();

    let has_child_fields = kids.iter().any(|&kid| {
        doc.get_dictionary(kid)
            .map(|d| d.has(b"T"))
            .unwrap_or(false)
    });
    if has_child_fields {
        for kid in kids {
            walk_field(doc, kid, Some(&full_name), &inherited, depth + 1, visited, fields);
        }
        return;
    }

    if full_name.is_empty() {
        return;
    }
    let widgets = if kids.is_empty() { vec![id] } else { kids };
    let flags = FieldFlags::from_raw(inherited.flags.unwrap_or(0));
    let kind = FieldKind::classify(inherited.field_type.as_deref(), flags);

    fields.insert(
        full_name,
        FieldEntry {
            id,
            kind,
            flags,
            widgets,
            da: inherited.da,
            quadding: inherited.quadding.unwrap_or(0),
            max_len: inherited
                .max_len
                .filter(|&m| m > 0)
                .map(|m| m as usize),
            options: choice_options(doc, dict),
        },
    );
}

fn choice_options(doc: &Document, dict: &lopdf::Dictionary) -> Vec<ChoiceOption> {
    let Some(options) = dict
        .get(b"Opt")
        .ok()
        .and_then(|o| doc.dereference(o).ok())
        .and_then(|(_, o)| o.as_array().ok())
    else {
        return Vec::new();
    };

    options
        .iter()
        .filter_map(|item| match doc.dereference(item).ok()?.1 {
            Object::Array(pair) if pair.len() >= 2 => Some(ChoiceOption {
                export: text_of(doc, &pair[0])?,
                display: text_of(doc, &pair[1])?,
            }),
            other => {
                let text = text_of(doc, other)?;
                Some(ChoiceOption {
                    export: text.clone(),
                    display: text,
                })
            }
        })
        .collect()
}
