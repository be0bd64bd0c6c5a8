//! Geometry for moving annotations between pixel space and PDF space
//!
//! - Per-page coordinate space snapshots
//! - Point and rectangle conversion with the Y-axis flip
//! - Tight bounds from stroke data and reconciliation with stored rects

mod bounds;
mod context;
mod convert;

pub use bounds::*;
pub use context::*;
pub use convert::*;
