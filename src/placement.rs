//! Placement planner: finds a free spot in the viewport for a new card.
//!
//! A bounded grid of candidate cells is scanned row-major from the visible
//! top-left corner. Each cell is the new card's footprint plus padding; the
//! first cell whose padded box does not overlap any existing card's padded box
//! wins. Hidden cards still count as occupied. When the grid is exhausted the
//! planner falls back to the viewport corner with a little jitter so repeated
//! fallbacks do not stack exactly.

#[cfg(test)]
#[path = "placement_test.rs"]
mod placement_test;

use rand::Rng;
use tracing::warn;

use crate::camera::{Bounds, Camera, Point};
use crate::consts::{
    PLACEMENT_COLUMNS, PLACEMENT_FALLBACK_JITTER, PLACEMENT_MARGIN, PLACEMENT_PADDING, PLACEMENT_ROWS,
};
use crate::doc::Card;

/// Where the planner put a card.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Placement {
    /// A grid cell clear of every existing card.
    Free(Point),
    /// The grid was full; jittered viewport corner.
    Fallback(Point),
}

impl Placement {
    /// Top-left corner of the planned card.
    #[must_use]
    pub fn point(self) -> Point {
        match self {
            Self::Free(p) | Self::Fallback(p) => p,
        }
    }
}

/// Box used for overlap tests: `bounds` grown by half the padding per side.
#[must_use]
pub fn padded(bounds: &Bounds) -> Bounds {
    bounds.expand(PLACEMENT_PADDING * 0.5)
}

/// Plan the top-left corner for a card of `size` (width, height).
pub fn plan_position<'a, R: Rng>(
    cards: impl IntoIterator<Item = &'a Card>,
    camera: &Camera,
    viewport_width: f64,
    viewport_height: f64,
    size: (f64, f64),
    rng: &mut R,
) -> Placement {
    let (width, height) = size;
    let occupied: Vec<Bounds> = cards.into_iter().map(|c| padded(&c.bounds())).collect();
    let view = camera.visible_world_rect(viewport_width, viewport_height);
    let origin_x = view.min_x + PLACEMENT_MARGIN;
    let origin_y = view.min_y + PLACEMENT_MARGIN;

    for row in 0..PLACEMENT_ROWS {
        for col in 0..PLACEMENT_COLUMNS {
            let x = origin_x + grid_offset(col, width);
            let y = origin_y + grid_offset(row, height);
            let candidate = padded(&Bounds::from_xywh(x, y, width, height));
            if !occupied.iter().any(|b| b.overlaps(&candidate)) {
                return Placement::Free(Point::new(x, y));
            }
        }
    }

    let jx = rng.random_range(-PLACEMENT_FALLBACK_JITTER..=PLACEMENT_FALLBACK_JITTER);
    let jy = rng.random_range(-PLACEMENT_FALLBACK_JITTER..=PLACEMENT_FALLBACK_JITTER);
    warn!(cards = occupied.len(), "placement grid exhausted; using jittered fallback");
    Placement::Fallback(Point::new(origin_x + jx, origin_y + jy))
}

#[allow(clippy::cast_precision_loss)]
fn grid_offset(index: usize, extent: f64) -> f64 {
    index as f64 * (extent + PLACEMENT_PADDING)
}
