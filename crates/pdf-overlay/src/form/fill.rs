//! Applying a value map to a form

use super::{FieldKind, FormHandle};
use crate::constants::CHECKBOX_TRUTHY_VALUES;
use crate::store::FieldValueMap;
use crate::types::OverlayError;
use serde::Serialize;

/// Outcome of one [`fill`] call
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FillReport {
    pub filled_count: usize,
    pub attempted_count: usize,
    /// Names absent from the form
    pub missing: Vec<String>,
    /// Fields that exist but rejected their value
    pub errors: Vec<(String, String)>,
    /// Set when appearance regeneration failed for at least one field.
    /// Values may then be invisible after flattening.
    pub appearance_failure: Option<String>,
}

impl FillReport {
    pub fn appearances_ok(&self) -> bool {
        self.appearance_failure.is_none()
    }

    /// Values were supplied but none landed in a field
    pub fn nothing_filled(&self) -> bool {
        self.attempted_count > 0 && self.filled_count == 0
    }
}

/// Write every value of `values` into the matching field, then rebuild
/// appearance streams. Missing or rejected fields are recorded, never raised.
pub fn fill(form: &mut FormHandle<'_>, values: &FieldValueMap) -> FillReport {
    let mut report = FillReport {
        attempted_count: values.len(),
        ..FillReport::default()
    };

    for (name, value) in values {
        let Some(kind) = form.kind(name) else {
            log::warn!("Form field '{name}' not found, skipping");
            report.missing.push(name.clone());
            continue;
        };

        let result = match kind {
            FieldKind::Text => form.set_text(name, value),
            FieldKind::Checkbox => form.set_checked(name, is_truthy(value)),
            FieldKind::Radio | FieldKind::ComboBox | FieldKind::ListBox => form.select(name, value),
            _ => form.set_value(name, value),
        };

        match result {
            Ok(()) => report.filled_count += 1,
            Err(OverlayError::FieldNotFound(_)) => report.missing.push(name.clone()),
            Err(e) => {
                log::warn!("Could not fill field '{name}': {e}");
                report.errors.push((name.clone(), e.to_string()));
            }
        }
    }

    let failures = form.update_appearances();
    if !failures.is_empty() {
        let names: Vec<&str> = failures.iter().map(|(name, _)| name.as_str()).collect();
        let message = OverlayError::AppearanceRegenerationFailed(format!(
            "{} field(s): {}",
            failures.len(),
            names.join(", ")
        ))
        .to_string();
        report.appearance_failure = Some(message);
        report.errors.extend(failures);
    }

    log::debug!(
        "Filled {} of {} form values ({} missing, {} errors)",
        report.filled_count,
        report.attempted_count,
        report.missing.len(),
        report.errors.len()
    );
    report
}

/// Whether a value switches a checkbox on
pub fn is_truthy(value: &str) -> bool {
    CHECKBOX_TRUTHY_VALUES.contains(&value.trim())
}
