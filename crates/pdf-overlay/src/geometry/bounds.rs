//! Tight bounding boxes from stroke data

use super::context::CoordinateSpaceContext;
use super::convert::is_unreliable_rect;
use crate::constants::{DEFAULT_MAX_RECT_INFLATION, DEFAULT_UNRELIABLE_RECT_RATIO};
use crate::types::{InkStroke, OverlayError, Point, Rect, Result};
use serde::{Deserialize, Serialize};

/// Thresholds for deciding when a stored annotation rect is not trusted
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BoundsPolicy {
    /// Share of a rendered page dimension above which a rect is unreliable
    pub unreliable_rect_ratio: f64,
    /// How many times larger than the stroke bounds a rect may be
    pub max_rect_inflation: f64,
}

impl Default for BoundsPolicy {
    fn default() -> Self {
        Self {
            unreliable_rect_ratio: DEFAULT_UNRELIABLE_RECT_RATIO,
            max_rect_inflation: DEFAULT_MAX_RECT_INFLATION,
        }
    }
}

/// Where reconciled bounds came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoundsSource {
    StoredRect,
    Strokes,
}

/// Minimal rectangle covering every finite point of every stroke.
///
/// Works in whichever space the points are already expressed in.
/// Non-finite coordinates are dropped before min/max.
pub fn compute_bounds(strokes: &[Vec<Point>]) -> Result<Rect> {
    bounds_of(strokes.iter().flatten())
}

/// Same as [`compute_bounds`] for styled strokes
pub fn compute_ink_bounds(strokes: &[InkStroke]) -> Result<Rect> {
    bounds_of(strokes.iter().flat_map(|s| s.points.iter()))
}

fn bounds_of<'a>(points: impl Iterator<Item = &'a Point>) -> Result<Rect> {
    points
        .filter(|p| p.is_finite())
        .fold(None, |acc: Option<Rect>, p| {
            Some(match acc {
                None => Rect::new(p.x, p.y, p.x, p.y),
                Some(r) => Rect::new(
                    r.min_x.min(p.x),
                    r.min_y.min(p.y),
                    r.max_x.max(p.x),
                    r.max_y.max(p.y),
                ),
            })
        })
        .ok_or(OverlayError::EmptyStrokeSet)
}

/// Pick between an annotation's stored rect and the bounds of its strokes.
///
/// The stored rect is an upper bound at best. Stroke bounds win when the rect
/// is unreliable relative to the page, or more than `max_rect_inflation`
/// times larger than the strokes on either axis. Without usable strokes the
/// stored rect is the only option.
pub fn reconcile_bounds(
    stored: Option<&Rect>,
    strokes: &[InkStroke],
    ctx: Option<&CoordinateSpaceContext>,
    policy: &BoundsPolicy,
) -> Result<(Rect, BoundsSource)> {
    let stored = stored.filter(|r| r.is_finite()).map(|r| r.normalized());
    let stroke_bounds = compute_ink_bounds(strokes);

    let (rect, stroke_bounds) = match (stored, stroke_bounds) {
        (None, stroke_bounds) => return stroke_bounds.map(|b| (b, BoundsSource::Strokes)),
        (Some(rect), Err(_)) => return Ok((rect, BoundsSource::StoredRect)),
        (Some(rect), Ok(bounds)) => (rect, bounds),
    };

    if let Some(ctx) = ctx {
        if is_unreliable_rect(&rect, ctx, policy.unreliable_rect_ratio) {
            log::debug!("Stored rect spans most of the page, using stroke bounds");
            return Ok((stroke_bounds, BoundsSource::Strokes));
        }
    }

    let inflated = rect.width() > stroke_bounds.width() * policy.max_rect_inflation
        || rect.height() > stroke_bounds.height() * policy.max_rect_inflation;
    if inflated {
        log::debug!("Stored rect is much larger than its strokes, using stroke bounds");
        return Ok((stroke_bounds, BoundsSource::Strokes));
    }

    Ok((rect, BoundsSource::StoredRect))
}
