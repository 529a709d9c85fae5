//! Lasso selection: path reduction, card membership and ink capture.
//!
//! A lasso is a free-form path that is only ever used through its
//! axis-aligned bounding box. A card belongs to the lasso when its center
//! falls inside the box (inclusive), not when it is fully contained.

#[cfg(test)]
#[path = "lasso_test.rs"]
mod lasso_test;

use std::collections::BTreeSet;

use tracing::debug;

use crate::camera::{Bounds, Point};
use crate::consts::HANDWRITING_CLEAR_PADDING;
use crate::doc::{CardId, DocStore};
use crate::raster::{Surface, SurfaceError};

/// Reduce a lasso path to its bounding box.
///
/// Paths with fewer than three points or a degenerate box are invalid
/// gestures and yield `None`.
#[must_use]
pub fn reduce_path(points: &[Point]) -> Option<Bounds> {
    if points.len() < 3 {
        return None;
    }
    Bounds::from_points(points).filter(|b| b.width() > 0.0 && b.height() > 0.0)
}

/// Visible cards whose center lies inside `bounds`.
#[must_use]
pub fn cards_in_bounds(doc: &DocStore, bounds: &Bounds) -> BTreeSet<CardId> {
    doc.iter().filter(|c| c.visible && bounds.contains(c.center())).map(|c| c.id).collect()
}

/// Ink pixels under a lasso box, ready to hand to the recognizer.
#[derive(Debug, Clone)]
pub struct InkCapture {
    /// Scene box the capture was taken from.
    pub bounds: Bounds,
    pub png: Vec<u8>,
    /// No ink at all under the box.
    pub blank: bool,
}

/// Copy the ink under `bounds` into a standalone PNG.
///
/// Returns `Ok(None)` when the box lies entirely outside the surface.
///
/// # Errors
///
/// Propagates PNG encoding failures.
pub fn capture_ink(ink: &Surface, bounds: &Bounds) -> Result<Option<InkCapture>, SurfaceError> {
    let Some(region) = ink.extract(bounds) else {
        return Ok(None);
    };
    let blank = region.is_blank();
    let png = region.encode_png()?;
    debug!(width = region.width(), height = region.height(), blank, "captured lasso ink");
    Ok(Some(InkCapture { bounds: *bounds, png, blank }))
}

/// Erase the ink under `bounds` plus the handwriting margin.
pub fn clear_captured(ink: &mut Surface, bounds: &Bounds) {
    ink.clear_region(&bounds.expand(HANDWRITING_CLEAR_PADDING));
}
