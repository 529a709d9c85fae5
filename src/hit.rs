//! Hit-testing: which card, and which part of it, lies under a scene point.
//!
//! Cards are tested topmost first in their own rotated frame. Hidden cards
//! are skipped. The single selected card also exposes eight resize handles
//! and a rotate handle above its top edge; handle radii are fixed in screen
//! pixels and converted through the camera zoom.

#[cfg(test)]
#[path = "hit_test.rs"]
mod hit_test;

use crate::camera::{Camera, Point};
use crate::consts::{HANDLE_RADIUS_PX, ROTATE_HANDLE_OFFSET_PX};
use crate::doc::{Card, CardId, DocStore};

/// Which part of a card was hit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HitPart {
    Body,
    ResizeHandle(ResizeAnchor),
    RotateHandle,
}

/// Anchor position for resize handles.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResizeAnchor {
    N,
    Ne,
    E,
    Se,
    S,
    Sw,
    W,
    Nw,
}

impl ResizeAnchor {
    pub const ALL: [ResizeAnchor; 8] = [
        ResizeAnchor::N,
        ResizeAnchor::Ne,
        ResizeAnchor::E,
        ResizeAnchor::Se,
        ResizeAnchor::S,
        ResizeAnchor::Sw,
        ResizeAnchor::W,
        ResizeAnchor::Nw,
    ];

    /// Unit offset of the handle from the card center, in half-extents.
    #[must_use]
    pub fn unit(self) -> (f64, f64) {
        match self {
            Self::N => (0.0, -1.0),
            Self::Ne => (1.0, -1.0),
            Self::E => (1.0, 0.0),
            Self::Se => (1.0, 1.0),
            Self::S => (0.0, 1.0),
            Self::Sw => (-1.0, 1.0),
            Self::W => (-1.0, 0.0),
            Self::Nw => (-1.0, -1.0),
        }
    }
}

/// Result of a hit test.
#[derive(Debug, Clone, Copy)]
pub struct Hit {
    pub card_id: CardId,
    pub part: HitPart,
}

/// Express `world_pt` in the card's unrotated frame, relative to its center.
#[must_use]
pub fn to_card_local(card: &Card, world_pt: Point) -> Point {
    let c = card.center();
    let (sin, cos) = card.rotation.to_radians().sin_cos();
    let dx = world_pt.x - c.x;
    let dy = world_pt.y - c.y;
    Point::new(dx * cos + dy * sin, -dx * sin + dy * cos)
}

/// Rotate a scene-space delta into a frame rotated by `rotation_deg`.
#[must_use]
pub fn delta_to_local(dx: f64, dy: f64, rotation_deg: f64) -> (f64, f64) {
    let (sin, cos) = rotation_deg.to_radians().sin_cos();
    (dx * cos + dy * sin, -dx * sin + dy * cos)
}

/// Whether `world_pt` lies inside the card's rotated box.
#[must_use]
pub fn card_contains(card: &Card, world_pt: Point) -> bool {
    let local = to_card_local(card, world_pt);
    local.x.abs() <= card.width_or_default() * 0.5 && local.y.abs() <= card.height_or_default() * 0.5
}

/// Test which card (if any) is under `world_pt`.
///
/// Handles of the selected card are checked first, then card bodies from the
/// top of the stack down. Hidden cards are never hit. Handle slop is
/// screen-constant.
#[must_use]
pub fn hit_test(world_pt: Point, doc: &DocStore, camera: &Camera, selected_id: Option<CardId>) -> Option<Hit> {
    if let Some(card) = selected_id.and_then(|id| doc.get(&id)).filter(|c| c.visible) {
        if let Some(part) = hit_handles(card, world_pt, camera) {
            return Some(Hit { card_id: card.id, part });
        }
    }

    doc.sorted_cards()
        .into_iter()
        .rev()
        .filter(|c| c.visible)
        .find(|c| card_contains(c, world_pt))
        .map(|c| Hit { card_id: c.id, part: HitPart::Body })
}

fn hit_handles(card: &Card, world_pt: Point, camera: &Camera) -> Option<HitPart> {
    let local = to_card_local(card, world_pt);
    let slop = camera.screen_dist_to_world(HANDLE_RADIUS_PX);
    let hw = card.width_or_default() * 0.5;
    let hh = card.height_or_default() * 0.5;

    let rotate = Point::new(0.0, -hh - camera.screen_dist_to_world(ROTATE_HANDLE_OFFSET_PX));
    if local.distance(rotate) <= slop {
        return Some(HitPart::RotateHandle);
    }

    ResizeAnchor::ALL
        .into_iter()
        .find(|anchor| {
            let (ux, uy) = anchor.unit();
            local.distance(Point::new(ux * hw, uy * hh)) <= slop
        })
        .map(HitPart::ResizeHandle)
}

/// New `(x, y, width, height)` after dragging `anchor` by a card-local delta.
///
/// Edges opposite the anchor stay put; each dimension is clamped to `min_size`.
#[must_use]
pub fn resize_rect(
    anchor: ResizeAnchor,
    orig: (f64, f64, f64, f64),
    local_dx: f64,
    local_dy: f64,
    min_size: f64,
) -> (f64, f64, f64, f64) {
    let (x, y, w, h) = orig;
    let (ux, uy) = anchor.unit();

    let (new_x, new_w) = if ux < 0.0 {
        let w2 = (w - local_dx).max(min_size);
        (x + w - w2, w2)
    } else if ux > 0.0 {
        (x, (w + local_dx).max(min_size))
    } else {
        (x, w)
    };

    let (new_y, new_h) = if uy < 0.0 {
        let h2 = (h - local_dy).max(min_size);
        (y + h - h2, h2)
    } else if uy > 0.0 {
        (y, (h + local_dy).max(min_size))
    } else {
        (y, h)
    };

    (new_x, new_y, new_w, new_h)
}
