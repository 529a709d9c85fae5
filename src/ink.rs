//! Ink drawing: freehand strokes and committed shapes rasterized into a [`Surface`].
//!
//! All geometry arrives in scene coordinates. Widths in [`BrushSettings`] are
//! screen pixels and are divided by the current zoom, so a stroke looks the
//! same thickness on screen at any zoom level. Dash patterns and arrowheads
//! follow the same rule.

#[cfg(test)]
#[path = "ink_test.rs"]
mod ink_test;

use serde::{Deserialize, Serialize};
use tiny_skia::{BlendMode, FillRule, LineCap, LineJoin, Paint, Path, PathBuilder, Rect, Stroke, StrokeDash, Transform};

use crate::camera::{Bounds, Point};
use crate::consts::{
    ARROW_HEAD_ANGLE, ARROW_HEAD_PX, ERASER_WIDTH_MULTIPLIER, HIGHLIGHTER_ALPHA, HIGHLIGHTER_WIDTH_MULTIPLIER,
};
use crate::raster::Surface;

const DEFAULT_INK_RGB: (u8, u8, u8) = (0x1F, 0x1A, 0x17);
const PREVIEW_RGB: (u8, u8, u8) = (0x3B, 0x82, 0xF6);

/// Freehand tools that paint directly into the ink layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InkTool {
    Pen,
    /// Translucent, multiply-composited, four times the pen width.
    Highlighter,
    /// Removes pixels, twice the pen width.
    Eraser,
}

/// Vector shapes previewed live and committed once on release.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShapeKind {
    Rect,
    Ellipse,
    Line,
    Arrow,
}

/// Dash style applied to pen strokes and shapes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LineStyle {
    #[default]
    Solid,
    Dashed,
    Dotted,
}

/// User-adjustable brush state shared by every ink tool.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BrushSettings {
    /// `#rgb` or `#rrggbb`; unparsable values fall back to charcoal.
    pub color: String,
    /// Stroke width in screen pixels.
    pub width: f64,
    pub line_style: LineStyle,
}

impl Default for BrushSettings {
    fn default() -> Self {
        Self { color: "#1F1A17".to_owned(), width: 3.0, line_style: LineStyle::Solid }
    }
}

/// Parse `#RGB` or `#RRGGBB` values into RGB channels.
#[must_use]
#[allow(clippy::cast_possible_truncation)]
pub fn parse_hex_rgb(raw: &str) -> Option<(u8, u8, u8)> {
    let hex = raw.trim().strip_prefix('#')?;
    // Hex digits are below 16, so the narrowing is lossless.
    let digits: Vec<u8> = hex.chars().map(|c| c.to_digit(16).map(|d| d as u8)).collect::<Option<_>>()?;
    match digits.as_slice() {
        [r, g, b] => Some((r * 17, g * 17, b * 17)),
        [r1, r2, g1, g2, b1, b2] => Some((r1 * 16 + r2, g1 * 16 + g2, b1 * 16 + b2)),
        _ => None,
    }
}

/// Stroke width in scene units for `tool` at the given zoom.
#[must_use]
pub fn scene_stroke_width(tool: InkTool, brush: &BrushSettings, zoom: f64) -> f64 {
    let multiplier = match tool {
        InkTool::Pen => 1.0,
        InkTool::Highlighter => HIGHLIGHTER_WIDTH_MULTIPLIER,
        InkTool::Eraser => ERASER_WIDTH_MULTIPLIER,
    };
    brush.width.max(0.5) * multiplier / zoom
}

/// Dash intervals for a stroke of `scene_width`. `None` means solid.
#[must_use]
pub fn dash_intervals(style: LineStyle, scene_width: f64) -> Option<[f64; 2]> {
    match style {
        LineStyle::Solid => None,
        LineStyle::Dashed => Some([scene_width * 3.0, scene_width * 2.0]),
        // Near-zero dash with round caps renders as dots.
        LineStyle::Dotted => Some([scene_width * 0.1, scene_width * 2.0]),
    }
}

/// Arrowhead wing endpoints `(left, right)` for a shaft from `from` to `to`.
///
/// Wings sit at ±30° from the reversed shaft with a length of
/// [`ARROW_HEAD_PX`] divided by zoom. `left` is on the left of the direction
/// of travel with y pointing down. `None` for a zero-length shaft.
#[must_use]
pub fn arrow_head(from: Point, to: Point, zoom: f64) -> Option<(Point, Point)> {
    let dx = to.x - from.x;
    let dy = to.y - from.y;
    if dx.hypot(dy) <= f64::EPSILON {
        return None;
    }
    let angle = dy.atan2(dx);
    let len = ARROW_HEAD_PX / zoom;
    let wing = |offset: f64| {
        Point::new(to.x - len * (angle - offset).cos(), to.y - len * (angle - offset).sin())
    };
    Some((wing(-ARROW_HEAD_ANGLE), wing(ARROW_HEAD_ANGLE)))
}

/// Scene box a freehand stroke through `points` can touch, caps and
/// anti-aliasing included. `None` for an empty path.
#[must_use]
pub fn stroke_bounds(points: &[Point], tool: InkTool, brush: &BrushSettings, zoom: f64) -> Option<Bounds> {
    let half = scene_stroke_width(tool, brush, zoom) * 0.5;
    Bounds::from_points(points).map(|b| b.expand(half + 2.0))
}

/// Paint a freehand stroke through `points` into `surface`.
pub fn stroke_polyline(surface: &mut Surface, points: &[Point], tool: InkTool, brush: &BrushSettings, zoom: f64) {
    let width = scene_stroke_width(tool, brush, zoom);
    let paint = tool_paint(tool, brush);
    // Dashes only make sense for the pen; highlighter and eraser stay continuous.
    let style = if tool == InkTool::Pen { brush.line_style } else { LineStyle::Solid };

    if let [only] = points {
        fill_dot(surface, *only, width * 0.5, &paint);
        return;
    }
    let Some(path) = polyline_path(points) else {
        return;
    };
    let stroke = make_stroke(width, style);
    surface.pixmap_mut().stroke_path(&path, &paint, &stroke, Transform::identity(), None);
}

/// Paint a shape spanned by `from` and `to` into `surface` with the pen paint.
pub fn draw_shape(surface: &mut Surface, shape: ShapeKind, from: Point, to: Point, brush: &BrushSettings, zoom: f64) {
    let width = scene_stroke_width(InkTool::Pen, brush, zoom);
    let paint = tool_paint(InkTool::Pen, brush);
    let stroke = make_stroke(width, brush.line_style);

    let path = match shape {
        ShapeKind::Rect => rect_of(Bounds::from_corners(from, to)).map(PathBuilder::from_rect),
        ShapeKind::Ellipse => rect_of(Bounds::from_corners(from, to)).and_then(PathBuilder::from_oval),
        ShapeKind::Line | ShapeKind::Arrow => polyline_path(&[from, to]),
    };
    let Some(path) = path else {
        return;
    };
    surface.pixmap_mut().stroke_path(&path, &paint, &stroke, Transform::identity(), None);

    if shape == ShapeKind::Arrow {
        if let Some((left, right)) = arrow_head(from, to, zoom) {
            // The head is always solid, even on a dashed shaft.
            let solid = make_stroke(width, LineStyle::Solid);
            if let Some(head) = polyline_path(&[left, to, right]) {
                surface.pixmap_mut().stroke_path(&head, &paint, &solid, Transform::identity(), None);
            }
        }
    }
}

/// Dashed outline of a lasso path in progress (preview layer only).
pub fn draw_lasso_path(surface: &mut Surface, points: &[Point], zoom: f64) {
    let Some(path) = polyline_path(points) else {
        return;
    };
    let stroke = make_stroke(1.5 / zoom, LineStyle::Dashed);
    surface.pixmap_mut().stroke_path(&path, &preview_paint(), &stroke, Transform::identity(), None);
}

/// Dashed rectangle outline (preview layer only), used while sizing a sticky note.
pub fn draw_outline(surface: &mut Surface, bounds: Bounds, zoom: f64) {
    let Some(rect) = rect_of(bounds) else {
        return;
    };
    let path = PathBuilder::from_rect(rect);
    let stroke = make_stroke(1.5 / zoom, LineStyle::Dashed);
    surface.pixmap_mut().stroke_path(&path, &preview_paint(), &stroke, Transform::identity(), None);
}

// =============================================================
// Helpers
// =============================================================

fn tool_paint(tool: InkTool, brush: &BrushSettings) -> Paint<'static> {
    let (r, g, b) = parse_hex_rgb(&brush.color).unwrap_or(DEFAULT_INK_RGB);
    let mut paint = Paint { anti_alias: true, ..Paint::default() };
    match tool {
        InkTool::Pen => paint.set_color_rgba8(r, g, b, 255),
        InkTool::Highlighter => {
            paint.set_color_rgba8(r, g, b, HIGHLIGHTER_ALPHA);
            paint.blend_mode = BlendMode::Multiply;
        }
        InkTool::Eraser => {
            paint.set_color_rgba8(0, 0, 0, 255);
            paint.blend_mode = BlendMode::Clear;
        }
    }
    paint
}

fn preview_paint() -> Paint<'static> {
    let (r, g, b) = PREVIEW_RGB;
    let mut paint = Paint { anti_alias: true, ..Paint::default() };
    paint.set_color_rgba8(r, g, b, 220);
    paint
}

#[allow(clippy::cast_possible_truncation)]
fn make_stroke(width: f64, style: LineStyle) -> Stroke {
    let dash = dash_intervals(style, width)
        .and_then(|[on, off]| StrokeDash::new(vec![on as f32, off as f32], 0.0));
    Stroke {
        width: width as f32,
        line_cap: LineCap::Round,
        line_join: LineJoin::Round,
        dash,
        ..Stroke::default()
    }
}

#[allow(clippy::cast_possible_truncation)]
fn polyline_path(points: &[Point]) -> Option<Path> {
    let (first, rest) = points.split_first()?;
    if rest.is_empty() {
        return None;
    }
    let mut pb = PathBuilder::new();
    pb.move_to(first.x as f32, first.y as f32);
    for p in rest {
        pb.line_to(p.x as f32, p.y as f32);
    }
    pb.finish()
}

#[allow(clippy::cast_possible_truncation)]
fn rect_of(bounds: Bounds) -> Option<Rect> {
    Rect::from_ltrb(bounds.min_x as f32, bounds.min_y as f32, bounds.max_x as f32, bounds.max_y as f32)
}

#[allow(clippy::cast_possible_truncation)]
fn fill_dot(surface: &mut Surface, center: Point, radius: f64, paint: &Paint<'_>) {
    let Some(path) = PathBuilder::from_circle(center.x as f32, center.y as f32, radius.max(0.5) as f32) else {
        return;
    };
    surface.pixmap_mut().fill_path(&path, paint, FillRule::Winding, Transform::identity(), None);
}
