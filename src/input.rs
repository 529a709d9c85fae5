//! Input model: tools, modifier keys, mouse buttons, and the gesture state machine.
//!
//! `Tool` is the active interaction mode; exactly one is active at a time.
//! Its transition table (`Tool::after_placement`) decides whether the tool
//! reverts to `Select` once it has produced something. `InputState` is the
//! gesture tracked between pointer-down and pointer-up, carrying the context
//! needed to compute deltas and to commit on release.

#[cfg(test)]
#[path = "input_test.rs"]
mod input_test;

use std::collections::BTreeSet;

use crate::camera::{Bounds, Point};
use crate::doc::CardId;
use crate::hit::ResizeAnchor;
use crate::ink::{BrushSettings, InkTool, ShapeKind};

/// Which tool is currently active.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Tool {
    /// Pan the canvas and manipulate cards (default).
    #[default]
    Select,
    /// Free-form selection reduced to a bounding box.
    Lasso,
    /// Click to place a borderless text box.
    Text,
    /// Drag to size a sticky note.
    StickyNote,
    Pen,
    Highlighter,
    Eraser,
    Rectangle,
    Ellipse,
    Line,
    Arrow,
}

impl Tool {
    pub const ALL: [Tool; 11] = [
        Tool::Select,
        Tool::Lasso,
        Tool::Text,
        Tool::StickyNote,
        Tool::Pen,
        Tool::Highlighter,
        Tool::Eraser,
        Tool::Rectangle,
        Tool::Ellipse,
        Tool::Line,
        Tool::Arrow,
    ];

    /// The freehand ink tool this maps to, if any.
    #[must_use]
    pub fn ink_tool(self) -> Option<InkTool> {
        match self {
            Self::Pen => Some(InkTool::Pen),
            Self::Highlighter => Some(InkTool::Highlighter),
            Self::Eraser => Some(InkTool::Eraser),
            _ => None,
        }
    }

    /// The vector shape this maps to, if any.
    #[must_use]
    pub fn shape(self) -> Option<ShapeKind> {
        match self {
            Self::Rectangle => Some(ShapeKind::Rect),
            Self::Ellipse => Some(ShapeKind::Ellipse),
            Self::Line => Some(ShapeKind::Line),
            Self::Arrow => Some(ShapeKind::Arrow),
            _ => None,
        }
    }

    /// Tool to activate after this tool has placed something.
    ///
    /// Text and sticky notes are one-shot; ink and shape tools stay armed.
    #[must_use]
    pub fn after_placement(self) -> Tool {
        match self {
            Self::Text | Self::StickyNote => Self::Select,
            other => other,
        }
    }

    /// Single-key shortcut.
    #[must_use]
    pub fn from_shortcut(key: &str) -> Option<Tool> {
        match key {
            "v" | "V" => Some(Self::Select),
            "l" | "L" => Some(Self::Lasso),
            "t" | "T" => Some(Self::Text),
            "n" | "N" => Some(Self::StickyNote),
            "p" | "P" => Some(Self::Pen),
            "h" | "H" => Some(Self::Highlighter),
            "e" | "E" => Some(Self::Eraser),
            "r" | "R" => Some(Self::Rectangle),
            "o" | "O" => Some(Self::Ellipse),
            "i" | "I" => Some(Self::Line),
            "a" | "A" => Some(Self::Arrow),
            _ => None,
        }
    }
}

/// Keyboard/mouse modifier keys held during an event.
#[allow(clippy::struct_excessive_bools)]
#[derive(Debug, Clone, Copy, Default)]
pub struct Modifiers {
    /// Shift key is held.
    pub shift: bool,
    /// Ctrl key is held.
    pub ctrl: bool,
    /// Alt / Option key is held.
    pub alt: bool,
    /// Meta / Command key is held.
    pub meta: bool,
}

impl Modifiers {
    /// Shift, ctrl or meta: toggles selection membership instead of replacing it.
    #[must_use]
    pub fn is_additive(self) -> bool {
        self.shift || self.ctrl || self.meta
    }

    /// Ctrl on most platforms, Cmd on macOS.
    #[must_use]
    pub fn command(self) -> bool {
        self.ctrl || self.meta
    }
}

/// Mouse button identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Button {
    /// Left mouse button, pen, or single-finger touch.
    Primary,
    /// Middle mouse button (scroll wheel click).
    Middle,
    /// Right mouse button.
    Secondary,
}

/// A keyboard key as reported by the host (e.g. `"Delete"`, `"Escape"`, `"z"`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Key(pub String);

/// Wheel / trackpad scroll delta.
#[derive(Debug, Clone, Copy)]
pub struct WheelDelta {
    /// Horizontal scroll amount in pixels.
    pub dx: f64,
    /// Vertical scroll amount in pixels (positive = down).
    pub dy: f64,
}

/// Persistent UI state visible to the renderer.
#[derive(Debug, Clone, Default)]
pub struct UiState {
    /// Currently active tool.
    pub tool: Tool,
    /// Selected cards, populated by click-select or lasso release.
    pub selected_ids: BTreeSet<CardId>,
    /// Bounding box of the last lasso, until the next tool change or action.
    pub lasso_bounds: Option<Bounds>,
    /// Card whose text editor is open.
    pub editing: Option<CardId>,
    pub brush: BrushSettings,
}

impl UiState {
    /// Clear both card selection and lasso box.
    pub fn clear_selection(&mut self) {
        self.selected_ids.clear();
        self.lasso_bounds = None;
    }
}

/// Internal state for the input state machine.
///
/// Each active variant carries gesture context needed to compute deltas and
/// commit on pointer-up.
#[derive(Debug, Clone, Default)]
pub enum InputState {
    /// No gesture in progress; waiting for the next pointer-down.
    #[default]
    Idle,
    /// Dragging the canvas.
    Panning {
        /// Viewport position of the previous pointer event.
        last_screen: Point,
    },
    /// Moving the selected cards.
    DraggingCards {
        /// Each dragged card with its top-left at pointer-down.
        origins: Vec<(CardId, Point)>,
        /// Viewport position at pointer-down; the total delta is divided by zoom.
        start_screen: Point,
        moved: bool,
    },
    /// Resizing one card by a handle.
    ResizingCard {
        id: CardId,
        anchor: ResizeAnchor,
        /// Scene position of the pointer at the start of the resize.
        start_world: Point,
        orig_x: f64,
        orig_y: f64,
        orig_w: f64,
        orig_h: f64,
        /// Card rotation in degrees; deltas are mapped into the card frame.
        rotation: f64,
    },
    /// Rotating one card around its center.
    RotatingCard {
        id: CardId,
        center: Point,
        /// Pointer angle in degrees at the start of the gesture.
        start_angle: f64,
        orig_rotation: f64,
    },
    /// Accumulating a free-form lasso path.
    Lasso { points: Vec<Point> },
    /// Text tool pressed; becomes a text box if released without moving.
    PlacingText { start_screen: Point, start_world: Point },
    /// Sizing a sticky note.
    DrawingSticky { anchor_world: Point, current_world: Point },
    /// Freehand stroke in progress. On every move the ink under `dirty` is
    /// restored from the last committed snapshot and `points` is re-stroked.
    Inking { tool: InkTool, points: Vec<Point>, dirty: Option<Bounds> },
    /// Shape previewed in the preview layer until release.
    DrawingShape { shape: ShapeKind, anchor_world: Point, current_world: Point },
}

impl InputState {
    #[must_use]
    pub fn is_idle(&self) -> bool {
        matches!(self, Self::Idle)
    }
}
