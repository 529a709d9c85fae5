//! Shared numeric constants for the whiteboard engine.

// ── Camera ──────────────────────────────────────────────────────

/// Smallest allowed zoom factor.
pub const MIN_ZOOM: f64 = 0.1;

/// Largest allowed zoom factor.
pub const MAX_ZOOM: f64 = 5.0;

/// Multiplicative step used by the zoom buttons.
pub const ZOOM_STEP: f64 = 1.2;

/// Wheel delta (pixels) to zoom exponent.
pub const WHEEL_ZOOM_SENSITIVITY: f64 = 0.0015;

// ── Gestures ────────────────────────────────────────────────────

/// Screen-space movement below which a press/release pair counts as a click.
pub const CLICK_THRESHOLD_PX: f64 = 5.0;

/// Minimum sticky-note width and height in scene units.
pub const MIN_STICKY_SIZE: f64 = 10.0;

/// Shapes whose extent is below this (scene units) on both axes are discarded.
pub const MIN_SHAPE_SIZE: f64 = 2.0;

/// Minimum card width and height enforced while resizing, in scene units.
pub const MIN_CARD_SIZE: f64 = 40.0;

/// Rotation snap increment in degrees when shift is held.
pub const ROTATION_SNAP_DEG: f64 = 15.0;

// ── Hit-testing ─────────────────────────────────────────────────

/// Screen-space hit slop in pixels for resize handles.
pub const HANDLE_RADIUS_PX: f64 = 8.0;

/// Distance from the card's top edge to the rotate handle, in screen pixels.
pub const ROTATE_HANDLE_OFFSET_PX: f64 = 24.0;

// ── Cards ───────────────────────────────────────────────────────

/// Footprint used for a card without an explicit size.
pub const DEFAULT_CARD_WIDTH: f64 = 300.0;
pub const DEFAULT_CARD_HEIGHT: f64 = 200.0;

/// Largest rotation jitter (either direction) applied to hand-placed cards.
pub const ROTATION_JITTER_DEG: f64 = 2.0;

// ── Placement ───────────────────────────────────────────────────

/// Gap kept between planned cards; each box is grown by half of it per side.
pub const PLACEMENT_PADDING: f64 = 50.0;

/// Offset of the first grid cell from the visible top-left corner.
pub const PLACEMENT_MARGIN: f64 = 100.0;

pub const PLACEMENT_COLUMNS: usize = 10;
pub const PLACEMENT_ROWS: usize = 20;

/// Largest fallback jitter (either direction) when the grid is exhausted.
pub const PLACEMENT_FALLBACK_JITTER: f64 = 40.0;

// ── Ink ─────────────────────────────────────────────────────────

pub const HIGHLIGHTER_WIDTH_MULTIPLIER: f64 = 4.0;
pub const ERASER_WIDTH_MULTIPLIER: f64 = 2.0;

/// Highlighter alpha (0-255) before multiply compositing.
pub const HIGHLIGHTER_ALPHA: u8 = 110;

/// Arrowhead wing length in screen pixels; divided by zoom when drawn.
pub const ARROW_HEAD_PX: f64 = 12.0;

/// Arrowhead half-angle in radians (30°).
pub const ARROW_HEAD_ANGLE: f64 = std::f64::consts::PI / 6.0;

/// Margin cleared around recognized handwriting, in scene units.
pub const HANDWRITING_CLEAR_PADDING: f64 = 4.0;
