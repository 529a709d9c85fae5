//! Scene export: ink and every visible card composed into one bitmap.
//!
//! The export ignores the camera. It covers the tight box around the ink and
//! the visible cards in scene units, one pixel per unit, plus a margin. Ink
//! sits beneath the cards. Card text is not rasterized; it is returned as
//! positioned [`TextBlock`]s for the external exporter to typeset.

#[cfg(test)]
#[path = "render_test.rs"]
mod render_test;

use tiny_skia::{Paint, PathBuilder, Pixmap, PixmapPaint, Rect, Stroke, Transform};
use tracing::{debug, info};

use crate::camera::{Bounds, Point};
use crate::doc::{Card, CardContent, CardId};
use crate::engine::EngineCore;
use crate::ink::parse_hex_rgb;
use crate::raster::{Surface, SurfaceError};

/// Blank margin around the exported content, in scene units.
pub const EXPORT_MARGIN: f64 = 20.0;

const BACKGROUND_RGB: (u8, u8, u8) = (0xFF, 0xFF, 0xFF);
const BORDER_RGB: (u8, u8, u8) = (0x1F, 0x1A, 0x17);
const FALLBACK_CARD_RGB: (u8, u8, u8) = (0xFE, 0xF3, 0xC7);

#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error("nothing to export")]
    EmptyScene,
    #[error(transparent)]
    Surface(#[from] SurfaceError),
}

/// Card text positioned in export pixels.
#[derive(Debug, Clone, PartialEq)]
pub struct TextBlock {
    pub card_id: CardId,
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    /// Degrees clockwise around the block center.
    pub rotation: f64,
    pub text: String,
}

/// A rendered scene.
#[derive(Debug, Clone)]
pub struct SceneExport {
    pub png: Vec<u8>,
    /// Scene position of the top-left pixel.
    pub origin: Point,
    pub width: u32,
    pub height: u32,
    pub text_blocks: Vec<TextBlock>,
}

/// Render the session's ink and visible cards.
///
/// # Errors
///
/// [`RenderError::EmptyScene`] when there is no ink and no visible card,
/// [`RenderError::Surface`] when the output cannot be allocated or encoded.
pub fn export_scene(core: &EngineCore) -> Result<SceneExport, RenderError> {
    let cards: Vec<&Card> = core.doc.sorted_cards().into_iter().filter(|c| c.visible).collect();
    let content = cards
        .iter()
        .map(|c| rotated_bounds(c))
        .chain(core.ink().content_bounds())
        .reduce(|a, b| a.union(&b))
        .ok_or(RenderError::EmptyScene)?;

    let area = content.expand(EXPORT_MARGIN);
    let origin = Point::new(area.min_x.floor(), area.min_y.floor());
    let (width, height) = (pixels(area.max_x - origin.x), pixels(area.max_y - origin.y));
    let mut out = Surface::new(width, height)?;
    let (r, g, b) = BACKGROUND_RGB;
    out.pixmap_mut().fill(tiny_skia::Color::from_rgba8(r, g, b, 255));

    #[allow(clippy::cast_possible_truncation)]
    out.draw_surface(core.ink(), -origin.x as i32, -origin.y as i32);

    let mut text_blocks = Vec::new();
    for card in &cards {
        draw_card(out.pixmap_mut(), card, origin);
        let text = card.content.plain_text().trim();
        if !text.is_empty() && !matches!(card.content, CardContent::Image { .. }) {
            text_blocks.push(TextBlock {
                card_id: card.id,
                x: card.x - origin.x,
                y: card.y - origin.y,
                width: card.width_or_default(),
                height: card.height_or_default(),
                rotation: card.rotation,
                text: text.to_owned(),
            });
        }
    }

    let png = out.encode_png()?;
    info!(width, height, cards = cards.len(), bytes = png.len(), "scene exported");
    Ok(SceneExport { png, origin, width, height, text_blocks })
}

/// Axis-aligned box around the card's rotated corners.
#[must_use]
pub fn rotated_bounds(card: &Card) -> Bounds {
    let c = card.center();
    let (hw, hh) = (card.width_or_default() * 0.5, card.height_or_default() * 0.5);
    let (sin, cos) = card.rotation.to_radians().sin_cos();
    let corners: Vec<Point> = [(-hw, -hh), (hw, -hh), (hw, hh), (-hw, hh)]
        .iter()
        .map(|&(lx, ly)| Point::new(c.x + lx * cos - ly * sin, c.y + lx * sin + ly * cos))
        .collect();
    Bounds::from_points(&corners).unwrap_or_else(|| card.bounds())
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn pixels(extent: f64) -> u32 {
    extent.ceil().max(1.0) as u32
}

#[allow(clippy::cast_possible_truncation)]
fn draw_card(pixmap: &mut Pixmap, card: &Card, origin: Point) {
    let c = card.center();
    let transform = Transform::from_rotate_at(card.rotation as f32, c.x as f32, c.y as f32)
        .post_translate(-origin.x as f32, -origin.y as f32);
    let (w, h) = (card.width_or_default(), card.height_or_default());
    let Some(rect) = Rect::from_xywh(card.x as f32, card.y as f32, w as f32, h as f32) else {
        return;
    };

    if let CardContent::Image { png } = &card.content {
        draw_image(pixmap, card, png, transform);
    } else if card.kind.is_bordered() {
        let (r, g, b) = parse_hex_rgb(&card.color).unwrap_or(FALLBACK_CARD_RGB);
        let mut fill = Paint { anti_alias: true, ..Paint::default() };
        fill.set_color_rgba8(r, g, b, 255);
        pixmap.fill_rect(rect, &fill, transform, None);
    }

    if card.kind.is_bordered() {
        let (r, g, b) = BORDER_RGB;
        let mut paint = Paint { anti_alias: true, ..Paint::default() };
        paint.set_color_rgba8(r, g, b, 255);
        let path = PathBuilder::from_rect(rect);
        pixmap.stroke_path(&path, &paint, &Stroke { width: 1.0, ..Stroke::default() }, transform, None);
    }
}

/// Scale the decoded image to the card box. Undecodable bytes (such as an
/// image card still loading) leave the box empty.
#[allow(clippy::cast_possible_truncation)]
fn draw_image(pixmap: &mut Pixmap, card: &Card, png: &[u8], card_transform: Transform) {
    if png.is_empty() {
        return;
    }
    let image = match Surface::decode_png(png) {
        Ok(image) => image,
        Err(e) => {
            debug!(card = %card.id, error = %e, "image card skipped in export");
            return;
        }
    };
    let sx = card.width_or_default() / f64::from(image.width());
    let sy = card.height_or_default() / f64::from(image.height());
    let transform = Transform::from_scale(sx as f32, sy as f32)
        .post_translate(card.x as f32, card.y as f32)
        .post_concat(card_transform);
    pixmap.draw_pixmap(0, 0, image.pixmap().as_ref(), &PixmapPaint::default(), transform, None);
}
