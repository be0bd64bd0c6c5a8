use crate::constants::{DEFAULT_PADDING, DEFAULT_SUPERSAMPLE};
use crate::geometry::BoundsPolicy;
use crate::types::{OverlayError, Result};
use serde::{Deserialize, Serialize};

/// What to do with an annotation whose coordinate context is missing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MissingContextPolicy {
    /// Skip the annotation and record it in the report
    #[default]
    Skip,
    /// Treat pixels as points on the target page and embed anyway
    Unpositioned,
}

/// Options for one export
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportOptions {
    /// Rasterization scale for signatures
    pub supersample: f64,
    /// Transparent margin around a signature, in pixel-space units
    pub padding: f64,
    /// Flatten the form after drawing
    pub flatten: bool,
    pub bounds: BoundsPolicy,
    pub missing_context: MissingContextPolicy,
    /// Flatten even when some appearance streams could not be rebuilt
    pub flatten_with_stale_appearances: bool,
    /// Render a PNG preview of this page's overlay alongside the export
    pub preview_page: Option<usize>,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self {
            supersample: DEFAULT_SUPERSAMPLE,
            padding: DEFAULT_PADDING,
            flatten: false,
            bounds: BoundsPolicy::default(),
            missing_context: MissingContextPolicy::default(),
            flatten_with_stale_appearances: false,
            preview_page: None,
        }
    }
}

impl ExportOptions {
    /// Load options from JSON file
    pub async fn load(path: impl AsRef<std::path::Path>) -> Result<Self> {
        let bytes = tokio::fs::read(path).await?;
        let options: Self = serde_json::from_slice(&bytes)
            .map_err(|e| OverlayError::Config(format!("Failed to parse options: {}", e)))?;
        options.validate()?;
        Ok(options)
    }

    /// Save options to JSON file
    pub async fn save(&self, path: impl AsRef<std::path::Path>) -> Result<()> {
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| OverlayError::Config(format!("Failed to serialize options: {}", e)))?;
        tokio::fs::write(path, json).await?;
        Ok(())
    }

    /// Validate the options
    pub fn validate(&self) -> Result<()> {
        if !self.supersample.is_finite() || self.supersample < 1.0 {
            return Err(OverlayError::Config(format!(
                "Supersample must be at least 1, got {}",
                self.supersample
            )));
        }
        if !self.padding.is_finite() || self.padding < 0.0 {
            return Err(OverlayError::Config(format!(
                "Padding must not be negative, got {}",
                self.padding
            )));
        }

        let ratio = self.bounds.unreliable_rect_ratio;
        if !ratio.is_finite() || ratio <= 0.0 || ratio > 1.0 {
            return Err(OverlayError::Config(format!(
                "Unreliable rect ratio must be in (0, 1], got {}",
                ratio
            )));
        }
        let inflation = self.bounds.max_rect_inflation;
        if !inflation.is_finite() || inflation < 1.0 {
            return Err(OverlayError::Config(format!(
                "Max rect inflation must be at least 1, got {}",
                inflation
            )));
        }

        Ok(())
    }
}
