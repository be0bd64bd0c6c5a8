use crate::form::FillReport;
use serde::Serialize;

/// An annotation left out of an export, and why
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SkippedAnnotation {
    pub id: String,
    pub reason: String,
}

/// Per-field and per-annotation outcome of one export
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ExportReport {
    pub fill: FillReport,
    pub annotations_applied: usize,
    /// Applied without a coordinate context, as if pixels were points
    pub annotations_degraded: usize,
    pub skipped_annotations: Vec<SkippedAnnotation>,
    pub flattened: bool,
    pub warnings: Vec<String>,
}

impl ExportReport {
    pub(crate) fn skip(&mut self, id: &str, reason: impl Into<String>) {
        let reason = reason.into();
        log::warn!("Skipping annotation {id}: {reason}");
        self.skipped_annotations.push(SkippedAnnotation {
            id: id.to_string(),
            reason,
        });
    }

    pub(crate) fn warn(&mut self, message: impl Into<String>) {
        let message = message.into();
        log::warn!("{message}");
        self.warnings.push(message);
    }

    /// True when nothing was skipped, missing or rejected
    pub fn is_clean(&self) -> bool {
        self.fill.missing.is_empty()
            && self.fill.errors.is_empty()
            && self.fill.appearance_failure.is_none()
            && self.skipped_annotations.is_empty()
            && self.annotations_degraded == 0
            && self.warnings.is_empty()
    }

    /// One-line count summary for display
    pub fn summary(&self) -> String {
        let mut summary = format!(
            "{}/{} fields filled, {} missing, {} failed; {} annotations applied, {} skipped",
            self.fill.filled_count,
            self.fill.attempted_count,
            self.fill.missing.len(),
            self.fill.errors.len(),
            self.annotations_applied,
            self.skipped_annotations.len()
        );
        if self.annotations_degraded > 0 {
            summary.push_str(&format!(" ({} unpositioned)", self.annotations_degraded));
        }
        if self.flattened {
            summary.push_str("; flattened");
        }
        if !self.warnings.is_empty() {
            summary.push_str(&format!("; {} warning(s)", self.warnings.len()));
        }
        summary
    }
}
