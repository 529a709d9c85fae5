#![allow(clippy::float_cmp)]

use super::*;

const EPSILON: f64 = 1e-9;

fn surface() -> Surface {
    Surface::new(100, 100).unwrap()
}

fn pen(width: f64) -> BrushSettings {
    BrushSettings { color: "#000000".to_owned(), width, line_style: LineStyle::Solid }
}

fn horizontal(y: f64) -> Vec<Point> {
    vec![Point::new(10.0, y), Point::new(50.0, y), Point::new(90.0, y)]
}

// =============================================================
// parse_hex_rgb
// =============================================================

#[test]
fn parse_hex_rgb_long_and_short() {
    assert_eq!(parse_hex_rgb("#1F1A17"), Some((0x1F, 0x1A, 0x17)));
    assert_eq!(parse_hex_rgb(" #abc "), Some((0xAA, 0xBB, 0xCC)));
}

#[test]
fn parse_hex_rgb_rejects_invalid() {
    assert_eq!(parse_hex_rgb("1F1A17"), None);
    assert_eq!(parse_hex_rgb("#12345"), None);
    assert_eq!(parse_hex_rgb("#zzzzzz"), None);
    assert_eq!(parse_hex_rgb("#ééé"), None);
}

// =============================================================
// Widths, dashes, arrowheads
// =============================================================

#[test]
fn stroke_width_multipliers() {
    let brush = pen(2.0);
    assert_eq!(scene_stroke_width(InkTool::Pen, &brush, 1.0), 2.0);
    assert_eq!(scene_stroke_width(InkTool::Highlighter, &brush, 1.0), 8.0);
    assert_eq!(scene_stroke_width(InkTool::Eraser, &brush, 1.0), 4.0);
}

#[test]
fn stroke_width_is_zoom_compensated() {
    let brush = pen(4.0);
    assert_eq!(scene_stroke_width(InkTool::Pen, &brush, 2.0), 2.0);
    assert_eq!(scene_stroke_width(InkTool::Pen, &brush, 0.5), 8.0);
}

#[test]
fn dash_intervals_scale_with_width() {
    assert_eq!(dash_intervals(LineStyle::Solid, 2.0), None);
    assert_eq!(dash_intervals(LineStyle::Dashed, 2.0), Some([6.0, 4.0]));
    let dotted = dash_intervals(LineStyle::Dotted, 2.0).unwrap();
    assert!(dotted[0] < dotted[1]);
}

#[test]
fn arrow_head_wings_at_thirty_degrees() {
    let (left, right) = arrow_head(Point::new(0.0, 0.0), Point::new(100.0, 0.0), 1.0).unwrap();
    let len = ARROW_HEAD_PX;
    assert!((left.x - (100.0 - len * ARROW_HEAD_ANGLE.cos())).abs() < EPSILON);
    assert!((left.y + len * ARROW_HEAD_ANGLE.sin()).abs() < EPSILON);
    assert!((right.x - left.x).abs() < EPSILON);
    assert!((right.y + left.y).abs() < EPSILON);
}

#[test]
fn arrow_head_left_wing_follows_travel() {
    // Heading down the screen, the left hand points to +x.
    let (left, right) = arrow_head(Point::new(0.0, 0.0), Point::new(0.0, 100.0), 1.0).unwrap();
    assert!(left.x > 0.0);
    assert!(right.x < 0.0);
    assert!(left.y < 100.0 && right.y < 100.0);
}

#[test]
fn arrow_head_length_shrinks_with_zoom() {
    let tip = Point::new(100.0, 0.0);
    let (at_one, _) = arrow_head(Point::new(0.0, 0.0), tip, 1.0).unwrap();
    let (at_two, _) = arrow_head(Point::new(0.0, 0.0), tip, 2.0).unwrap();
    assert!((at_one.distance(tip) - ARROW_HEAD_PX).abs() < EPSILON);
    assert!((at_two.distance(tip) - ARROW_HEAD_PX / 2.0).abs() < EPSILON);
}

#[test]
fn arrow_head_zero_length_is_none() {
    assert!(arrow_head(Point::new(5.0, 5.0), Point::new(5.0, 5.0), 1.0).is_none());
}

// =============================================================
// Rasterization
// =============================================================

#[test]
fn stroke_bounds_contain_painted_pixels() {
    let points = [Point::new(20.0, 30.0), Point::new(70.0, 60.0), Point::new(40.0, 80.0)];
    let brush = pen(9.0);
    let mut ink = surface();
    ink.pixmap_mut().fill(tiny_skia::Color::BLACK);
    stroke_polyline(&mut ink, &points, InkTool::Eraser, &brush, 0.5);
    let box_ = stroke_bounds(&points, InkTool::Eraser, &brush, 0.5).unwrap();
    for y in 0..100 {
        for x in 0..100 {
            if ink.alpha_at(x, y) != Some(255) {
                assert!(box_.contains(Point::new(f64::from(x) + 0.5, f64::from(y) + 0.5)), "({x}, {y}) outside");
            }
        }
    }
    assert!(stroke_bounds(&[], InkTool::Pen, &brush, 1.0).is_none());
}

#[test]
fn pen_stroke_paints_along_path() {
    let mut s = surface();
    stroke_polyline(&mut s, &horizontal(50.0), InkTool::Pen, &pen(4.0), 1.0);
    assert_eq!(s.alpha_at(50, 50), Some(255));
    assert_eq!(s.alpha_at(50, 10), Some(0));
}

#[test]
fn single_point_stroke_leaves_a_dot() {
    let mut s = surface();
    stroke_polyline(&mut s, &[Point::new(20.0, 20.0)], InkTool::Pen, &pen(6.0), 1.0);
    assert!(s.alpha_at(20, 20).unwrap() > 0);
    assert_eq!(s.alpha_at(40, 40), Some(0));
}

#[test]
fn empty_stroke_is_noop() {
    let mut s = surface();
    stroke_polyline(&mut s, &[], InkTool::Pen, &pen(4.0), 1.0);
    assert!(s.is_blank());
}

#[test]
fn eraser_clears_pixels() {
    let mut s = surface();
    stroke_polyline(&mut s, &horizontal(50.0), InkTool::Pen, &pen(6.0), 1.0);
    let eraser_path = vec![Point::new(50.0, 10.0), Point::new(50.0, 90.0)];
    stroke_polyline(&mut s, &eraser_path, InkTool::Eraser, &pen(6.0), 1.0);
    assert_eq!(s.alpha_at(50, 50), Some(0));
    assert_eq!(s.alpha_at(15, 50), Some(255));
}

#[test]
fn highlighter_darkens_instead_of_occluding() {
    let mut s = surface();
    stroke_polyline(&mut s, &horizontal(50.0), InkTool::Pen, &pen(6.0), 1.0);
    let yellow = BrushSettings { color: "#FFEB3B".to_owned(), width: 6.0, line_style: LineStyle::Solid };
    let across = vec![Point::new(50.0, 10.0), Point::new(50.0, 90.0)];
    stroke_polyline(&mut s, &across, InkTool::Highlighter, &yellow, 1.0);

    let under = s.pixmap().pixel(50, 50).unwrap();
    assert_eq!((under.red(), under.green(), under.blue(), under.alpha()), (0, 0, 0, 255));

    let alone = s.pixmap().pixel(50, 20).unwrap();
    assert!(alone.alpha() > 0 && alone.alpha() < 255);
}

#[test]
fn rect_shape_outlines_only() {
    let mut s = surface();
    draw_shape(&mut s, ShapeKind::Rect, Point::new(20.0, 20.0), Point::new(80.0, 80.0), &pen(2.0), 1.0);
    assert!(s.alpha_at(20, 50).unwrap() > 0);
    assert_eq!(s.alpha_at(50, 50), Some(0));
}

#[test]
fn rect_shape_accepts_reversed_corners() {
    let mut s = surface();
    draw_shape(&mut s, ShapeKind::Rect, Point::new(80.0, 80.0), Point::new(20.0, 20.0), &pen(2.0), 1.0);
    assert!(s.alpha_at(80, 50).unwrap() > 0);
}

#[test]
fn ellipse_shape_touches_extremes() {
    let mut s = surface();
    draw_shape(&mut s, ShapeKind::Ellipse, Point::new(10.0, 30.0), Point::new(90.0, 70.0), &pen(3.0), 1.0);
    assert!(s.alpha_at(10, 50).unwrap() > 0);
    assert!(s.alpha_at(50, 30).unwrap() > 0);
    assert_eq!(s.alpha_at(50, 50), Some(0));
}

#[test]
fn arrow_shape_draws_head() {
    let mut plain = surface();
    let mut arrow = surface();
    let (from, to) = (Point::new(10.0, 50.0), Point::new(90.0, 50.0));
    draw_shape(&mut plain, ShapeKind::Line, from, to, &pen(4.0), 1.0);
    draw_shape(&mut arrow, ShapeKind::Arrow, from, to, &pen(4.0), 1.0);
    let (left, _) = arrow_head(from, to, 1.0).unwrap();
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let (wx, wy) = (left.x.round() as u32, left.y.round() as u32);
    assert_eq!(plain.alpha_at(wx, wy), Some(0));
    assert!(arrow.alpha_at(wx, wy).unwrap() > 0);
}

#[test]
fn dashed_line_leaves_gaps() {
    let mut s = surface();
    let brush = BrushSettings { color: "#000".to_owned(), width: 4.0, line_style: LineStyle::Dashed };
    draw_shape(&mut s, ShapeKind::Line, Point::new(0.0, 50.0), Point::new(100.0, 50.0), &brush, 1.0);
    let painted = (0..100).filter(|x| s.alpha_at(*x, 50).unwrap_or(0) > 0).count();
    assert!(painted > 20 && painted < 95, "painted {painted}");
}

#[test]
fn preview_helpers_paint() {
    let mut s = surface();
    draw_lasso_path(&mut s, &[Point::new(10.0, 10.0), Point::new(90.0, 10.0), Point::new(90.0, 90.0)], 1.0);
    draw_outline(&mut s, Bounds::from_xywh(20.0, 20.0, 30.0, 30.0), 1.0);
    assert!(!s.is_blank());
}
