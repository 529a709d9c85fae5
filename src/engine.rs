use std::collections::HashMap;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::ai::{AiError, AiKind, AiOutput, AiRequest, SummaryPoint};
use crate::camera::{Bounds, Camera, Point};
use crate::config::EngineConfig;
use crate::consts::{
    CLICK_THRESHOLD_PX, DEFAULT_CARD_HEIGHT, DEFAULT_CARD_WIDTH, MIN_CARD_SIZE, MIN_SHAPE_SIZE, MIN_STICKY_SIZE,
    ROTATION_JITTER_DEG, ROTATION_SNAP_DEG, WHEEL_ZOOM_SENSITIVITY, ZOOM_STEP,
};
use crate::doc::{Card, CardContent, CardId, CardKind, CardStatus, DocStore, PartialCard, RequestToken};
use crate::hit::{self, HitPart};
use crate::history::InkHistory;
use crate::ink::{self, ShapeKind};
use crate::input::{Button, InputState, Key, Modifiers, Tool, UiState, WheelDelta};
use crate::lasso;
use crate::placement;
use crate::raster::{Surface, SurfaceError};

#[cfg(test)]
#[path = "engine_test.rs"]
mod engine_test;

/// Errors from engine operations that need host input to succeed.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error(transparent)]
    Surface(#[from] SurfaceError),

    /// An AI action was requested with no usable source text.
    #[error("no text to send: select at least one card with text")]
    EmptySelection,

    /// Handwriting recognition needs a lasso box first.
    #[error("no lasso selection")]
    NoLasso,

    /// The lasso box holds no ink.
    #[error("no ink inside the lasso")]
    NoInk,

    #[error("card {0} not found")]
    CardNotFound(CardId),

    /// The card was not produced by an AI action.
    #[error("card {0} cannot be regenerated")]
    NotRegenerable(CardId),
}

/// Severity of a transient, non-blocking notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Info,
    Warning,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

impl Notice {
    fn error(message: impl Into<String>) -> Self {
        Self { level: NoticeLevel::Error, message: message.into() }
    }

    fn warning(message: impl Into<String>) -> Self {
        Self { level: NoticeLevel::Warning, message: message.into() }
    }
}

/// Actions returned from engine operations for the host to process.
#[derive(Debug, Clone)]
pub enum Action {
    CardCreated(Card),
    CardUpdated { id: CardId, fields: PartialCard },
    CardDeleted { id: CardId },
    /// Open the text editor for a card.
    EditRequested { id: CardId },
    /// Show the AI action menu for a finished lasso.
    LassoMenuRequested { anchor: Point, bounds: Bounds, card_ids: Vec<CardId> },
    /// Hand this request to the AI dispatcher.
    AiRequested(AiRequest),
    /// The session was assigned a category.
    CategoryAssigned(String),
    /// The committed ink layer changed (commit, undo, redo).
    InkChanged,
    ToolChanged(Tool),
    SetCursor(String),
    Notify(Notice),
    RenderNeeded,
}

/// Core engine state for one session.
///
/// Every input handler runs synchronously and returns the actions the host
/// must carry out. Ink lives in a raster surface backed by a snapshot
/// history; cards live in the [`DocStore`]. Both share the camera.
pub struct EngineCore {
    pub doc: DocStore,
    pub camera: Camera,
    pub ui: UiState,
    pub input: InputState,
    pub viewport_width: f64,
    pub viewport_height: f64,
    ink: Surface,
    preview: Surface,
    history: InkHistory,
    rng: StdRng,
    /// Lasso boxes waiting on handwriting recognition.
    pending_handwriting: HashMap<RequestToken, Bounds>,
    pending_category: Option<RequestToken>,
}

impl EngineCore {
    /// Create an empty session engine.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Surface`] when the ink surfaces cannot be allocated.
    pub fn new(config: &EngineConfig) -> Result<Self, EngineError> {
        Self::from_parts(config, Vec::new(), InkHistory::new(config.history_limit))
    }

    /// Rebuild an engine from persisted cards and ink history.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Surface`] when the ink surfaces cannot be allocated.
    pub fn from_parts(config: &EngineConfig, cards: Vec<Card>, history: InkHistory) -> Result<Self, EngineError> {
        let mut ink = Surface::new(config.surface_width, config.surface_height)?;
        if let Some(current) = history.current() {
            ink.restore_from(current);
        }
        let preview = Surface::new(config.surface_width, config.surface_height)?;
        let rng = match config.jitter_seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        let mut doc = DocStore::new();
        doc.load_snapshot(cards);
        Ok(Self {
            doc,
            camera: Camera::default(),
            ui: UiState::default(),
            input: InputState::default(),
            viewport_width: 0.0,
            viewport_height: 0.0,
            ink,
            preview,
            history,
            rng,
            pending_handwriting: HashMap::new(),
            pending_category: None,
        })
    }

    // --- Queries ---

    /// Committed ink plus any stroke in progress.
    #[must_use]
    pub fn ink(&self) -> &Surface {
        &self.ink
    }

    /// In-progress shape, sticky or lasso geometry. Blank between gestures.
    #[must_use]
    pub fn preview(&self) -> &Surface {
        &self.preview
    }

    #[must_use]
    pub fn history(&self) -> &InkHistory {
        &self.history
    }

    #[must_use]
    pub fn card(&self, id: &CardId) -> Option<&Card> {
        self.doc.get(id)
    }

    /// Whether any AI request issued by this session is still outstanding.
    #[must_use]
    pub fn has_pending_requests(&self) -> bool {
        !self.pending_handwriting.is_empty()
            || self.pending_category.is_some()
            || self.doc.iter().any(|c| c.pending.is_some())
    }

    // --- Viewport ---

    pub fn set_viewport(&mut self, width: f64, height: f64) {
        self.viewport_width = width;
        self.viewport_height = height;
    }

    /// Zoom in one step around the viewport center.
    pub fn zoom_in(&mut self) -> Vec<Action> {
        self.zoom_centered(ZOOM_STEP)
    }

    /// Zoom out one step around the viewport center.
    pub fn zoom_out(&mut self) -> Vec<Action> {
        self.zoom_centered(1.0 / ZOOM_STEP)
    }

    /// Back to the identity transform.
    pub fn reset_view(&mut self) -> Vec<Action> {
        self.camera = Camera::default();
        vec![Action::RenderNeeded]
    }

    fn zoom_centered(&mut self, factor: f64) -> Vec<Action> {
        let center = Point::new(self.viewport_width * 0.5, self.viewport_height * 0.5);
        self.camera.zoom_at(center, factor);
        vec![Action::RenderNeeded]
    }

    // --- Tools ---

    /// Switch tools. Any gesture in progress is discarded and the selection cleared.
    pub fn set_tool(&mut self, tool: Tool) -> Vec<Action> {
        self.abandon_gesture();
        self.ui.clear_selection();
        self.ui.tool = tool;
        vec![Action::ToolChanged(tool), Action::SetCursor(cursor_for(tool).to_owned()), Action::RenderNeeded]
    }

    /// Drop the active gesture without committing anything.
    ///
    /// Ink returns to the last committed snapshot, the preview is cleared and
    /// cards touched by a drag, resize or rotate go back where they started.
    pub fn abandon_gesture(&mut self) {
        match std::mem::take(&mut self.input) {
            InputState::Inking { .. } => self.restore_committed_ink(),
            InputState::DraggingCards { origins, .. } => {
                for (id, origin) in origins {
                    self.doc.apply_partial(&id, &PartialCard::position(origin.x, origin.y));
                }
            }
            InputState::ResizingCard { id, orig_x, orig_y, orig_w, orig_h, .. } => {
                let patch = PartialCard {
                    x: Some(orig_x),
                    y: Some(orig_y),
                    width: Some(orig_w),
                    height: Some(orig_h),
                    ..PartialCard::default()
                };
                self.doc.apply_partial(&id, &patch);
            }
            InputState::RotatingCard { id, orig_rotation, .. } => {
                self.doc.apply_partial(&id, &PartialCard { rotation: Some(orig_rotation), ..PartialCard::default() });
            }
            _ => {}
        }
        self.preview.clear();
    }

    fn restore_committed_ink(&mut self) {
        match self.history.current() {
            Some(snapshot) => self.ink.restore_from(snapshot),
            None => self.ink.clear(),
        }
    }

    // --- Pointer input ---

    pub fn on_pointer_down(&mut self, screen_pt: Point, button: Button, modifiers: Modifiers) -> Vec<Action> {
        if !self.input.is_idle() {
            return Vec::new();
        }
        match button {
            Button::Middle => {
                self.input = InputState::Panning { last_screen: screen_pt };
                return vec![Action::SetCursor("grabbing".to_owned())];
            }
            Button::Secondary => return Vec::new(),
            Button::Primary => {}
        }

        let world = self.camera.screen_to_world(screen_pt);
        match self.ui.tool {
            Tool::Select => return self.select_down(screen_pt, world, modifiers),
            Tool::Lasso => {
                self.ui.clear_selection();
                self.input = InputState::Lasso { points: vec![world] };
            }
            Tool::Text => {
                self.input = InputState::PlacingText { start_screen: screen_pt, start_world: world };
            }
            Tool::StickyNote => {
                self.input = InputState::DrawingSticky { anchor_world: world, current_world: world };
            }
            tool => {
                if let Some(ink_tool) = tool.ink_tool() {
                    let points = vec![world];
                    let dirty = ink::stroke_bounds(&points, ink_tool, &self.ui.brush, self.camera.zoom);
                    ink::stroke_polyline(&mut self.ink, &points, ink_tool, &self.ui.brush, self.camera.zoom);
                    self.input = InputState::Inking { tool: ink_tool, points, dirty };
                } else if let Some(shape) = tool.shape() {
                    self.input = InputState::DrawingShape { shape, anchor_world: world, current_world: world };
                }
            }
        }
        vec![Action::RenderNeeded]
    }

    fn select_down(&mut self, screen_pt: Point, world: Point, modifiers: Modifiers) -> Vec<Action> {
        let single = if self.ui.selected_ids.len() == 1 { self.ui.selected_ids.first().copied() } else { None };
        let Some(hit) = hit::hit_test(world, &self.doc, &self.camera, single) else {
            if !modifiers.is_additive() {
                self.ui.clear_selection();
            }
            self.input = InputState::Panning { last_screen: screen_pt };
            return vec![Action::SetCursor("grabbing".to_owned()), Action::RenderNeeded];
        };
        let Some(card) = self.doc.get(&hit.card_id) else {
            return Vec::new();
        };

        match hit.part {
            HitPart::ResizeHandle(anchor) => {
                self.input = InputState::ResizingCard {
                    id: card.id,
                    anchor,
                    start_world: world,
                    orig_x: card.x,
                    orig_y: card.y,
                    orig_w: card.width_or_default(),
                    orig_h: card.height_or_default(),
                    rotation: card.rotation,
                };
            }
            HitPart::RotateHandle => {
                let center = card.center();
                self.input = InputState::RotatingCard {
                    id: card.id,
                    center,
                    start_angle: angle_deg(center, world),
                    orig_rotation: card.rotation,
                };
            }
            HitPart::Body => {
                let id = card.id;
                self.ui.lasso_bounds = None;
                if modifiers.is_additive() {
                    if !self.ui.selected_ids.remove(&id) {
                        self.ui.selected_ids.insert(id);
                    }
                    return vec![Action::RenderNeeded];
                }
                if !self.ui.selected_ids.contains(&id) {
                    self.ui.selected_ids.clear();
                    self.ui.selected_ids.insert(id);
                }
                let origins = self
                    .ui
                    .selected_ids
                    .iter()
                    .filter_map(|id| self.doc.get(id).map(|c| (c.id, Point::new(c.x, c.y))))
                    .collect();
                self.input = InputState::DraggingCards { origins, start_screen: screen_pt, moved: false };
                if let Some(z) = self.doc.bring_to_front(&id) {
                    let fields = PartialCard { z_index: Some(z), ..PartialCard::default() };
                    return vec![Action::CardUpdated { id, fields }, Action::RenderNeeded];
                }
            }
        }
        vec![Action::RenderNeeded]
    }

    pub fn on_pointer_move(&mut self, screen_pt: Point, modifiers: Modifiers) -> Vec<Action> {
        let world = self.camera.screen_to_world(screen_pt);
        let zoom = self.camera.zoom;
        match &mut self.input {
            InputState::Idle | InputState::PlacingText { .. } => return Vec::new(),
            InputState::Panning { last_screen } => {
                let (dx, dy) = (screen_pt.x - last_screen.x, screen_pt.y - last_screen.y);
                *last_screen = screen_pt;
                self.camera.pan(dx, dy);
            }
            InputState::DraggingCards { origins, start_screen, moved } => {
                let dx = (screen_pt.x - start_screen.x) / zoom;
                let dy = (screen_pt.y - start_screen.y) / zoom;
                *moved = *moved || dx != 0.0 || dy != 0.0;
                for (id, origin) in &*origins {
                    self.doc.apply_partial(id, &PartialCard::position(origin.x + dx, origin.y + dy));
                }
            }
            InputState::ResizingCard { id, anchor, start_world, orig_x, orig_y, orig_w, orig_h, rotation } => {
                let patch = resized_patch(
                    *anchor,
                    (*orig_x, *orig_y, *orig_w, *orig_h),
                    *rotation,
                    world.x - start_world.x,
                    world.y - start_world.y,
                );
                self.doc.apply_partial(id, &patch);
            }
            InputState::RotatingCard { id, center, start_angle, orig_rotation } => {
                let mut rotation = *orig_rotation + angle_deg(*center, world) - *start_angle;
                if modifiers.shift {
                    rotation = (rotation / ROTATION_SNAP_DEG).round() * ROTATION_SNAP_DEG;
                }
                let rotation = rotation.rem_euclid(360.0);
                self.doc.apply_partial(id, &PartialCard { rotation: Some(rotation), ..PartialCard::default() });
            }
            InputState::Lasso { points } => {
                points.push(world);
                self.preview.clear();
                ink::draw_lasso_path(&mut self.preview, points, zoom);
            }
            InputState::DrawingSticky { anchor_world, current_world } => {
                *current_world = world;
                self.preview.clear();
                ink::draw_outline(&mut self.preview, Bounds::from_corners(*anchor_world, world), zoom);
            }
            InputState::Inking { tool, points, dirty } => {
                points.push(world);
                // `dirty` covers every earlier pass, even across a zoom change.
                // Re-stroke whole so highlighter overlaps and dash phase match
                // the stroke as it will be committed.
                let next = ink::stroke_bounds(points, *tool, &self.ui.brush, zoom);
                let region = match (*dirty, next) {
                    (Some(a), Some(b)) => Some(a.union(&b)),
                    (a, b) => a.or(b),
                };
                if let Some(region) = region {
                    match self.history.current() {
                        Some(snapshot) => self.ink.restore_region_from(snapshot, &region),
                        None => self.ink.clear_region(&region),
                    }
                }
                *dirty = next;
                ink::stroke_polyline(&mut self.ink, points, *tool, &self.ui.brush, zoom);
            }
            InputState::DrawingShape { shape, anchor_world, current_world } => {
                *current_world = world;
                self.preview.clear();
                ink::draw_shape(&mut self.preview, *shape, *anchor_world, world, &self.ui.brush, zoom);
            }
        }
        vec![Action::RenderNeeded]
    }

    pub fn on_pointer_up(&mut self, screen_pt: Point, _button: Button, _modifiers: Modifiers) -> Vec<Action> {
        let state = std::mem::take(&mut self.input);
        self.preview.clear();
        match state {
            InputState::Idle => Vec::new(),
            InputState::Panning { .. } => {
                vec![Action::SetCursor(cursor_for(self.ui.tool).to_owned()), Action::RenderNeeded]
            }
            InputState::DraggingCards { origins, moved, .. } => {
                if !moved {
                    return vec![Action::RenderNeeded];
                }
                let mut actions: Vec<Action> = origins
                    .iter()
                    .filter_map(|(id, _)| self.doc.get(id))
                    .map(|c| Action::CardUpdated { id: c.id, fields: PartialCard::position(c.x, c.y) })
                    .collect();
                actions.push(Action::RenderNeeded);
                actions
            }
            InputState::ResizingCard { id, .. } => match self.doc.get(&id) {
                Some(c) => vec![
                    Action::CardUpdated {
                        id,
                        fields: PartialCard {
                            x: Some(c.x),
                            y: Some(c.y),
                            width: c.width,
                            height: c.height,
                            ..PartialCard::default()
                        },
                    },
                    Action::RenderNeeded,
                ],
                None => vec![Action::RenderNeeded],
            },
            InputState::RotatingCard { id, .. } => match self.doc.get(&id) {
                Some(c) => vec![
                    Action::CardUpdated { id, fields: PartialCard { rotation: Some(c.rotation), ..PartialCard::default() } },
                    Action::RenderNeeded,
                ],
                None => vec![Action::RenderNeeded],
            },
            InputState::Lasso { points } => self.finish_lasso(screen_pt, &points),
            InputState::PlacingText { start_screen, start_world } => {
                if start_screen.distance(screen_pt) >= CLICK_THRESHOLD_PX {
                    return vec![Action::RenderNeeded];
                }
                let (_, mut actions) = self.create_card(CardKind::FreeText, Some(start_world), None, CardContent::default());
                actions.extend(self.after_placement());
                actions
            }
            InputState::DrawingSticky { anchor_world, current_world } => {
                let rect = Bounds::from_corners(anchor_world, current_world);
                if rect.width() <= MIN_STICKY_SIZE || rect.height() <= MIN_STICKY_SIZE {
                    return vec![Action::RenderNeeded];
                }
                let (_, mut actions) = self.create_card(
                    CardKind::Sticky,
                    Some(Point::new(rect.min_x, rect.min_y)),
                    Some((rect.width(), rect.height())),
                    CardContent::default(),
                );
                actions.extend(self.after_placement());
                actions
            }
            InputState::Inking { .. } => self.commit_ink(),
            InputState::DrawingShape { shape, anchor_world, current_world } => {
                if shape_is_degenerate(shape, anchor_world, current_world) {
                    return vec![Action::RenderNeeded];
                }
                ink::draw_shape(&mut self.ink, shape, anchor_world, current_world, &self.ui.brush, self.camera.zoom);
                self.commit_ink()
            }
        }
    }

    fn finish_lasso(&mut self, screen_pt: Point, points: &[Point]) -> Vec<Action> {
        let Some(bounds) = lasso::reduce_path(points) else {
            return vec![Action::RenderNeeded];
        };
        let selected = lasso::cards_in_bounds(&self.doc, &bounds);
        debug!(points = points.len(), cards = selected.len(), "lasso released");
        let card_ids = selected.iter().copied().collect();
        self.ui.selected_ids = selected;
        self.ui.lasso_bounds = Some(bounds);
        vec![Action::LassoMenuRequested { anchor: screen_pt, bounds, card_ids }, Action::RenderNeeded]
    }

    /// Apply the active tool's post-placement transition.
    fn after_placement(&mut self) -> Vec<Action> {
        let next = self.ui.tool.after_placement();
        if next == self.ui.tool {
            return Vec::new();
        }
        self.ui.tool = next;
        vec![Action::ToolChanged(next), Action::SetCursor(cursor_for(next).to_owned())]
    }

    // --- Wheel / keyboard ---

    /// Ctrl/Cmd + wheel zooms around the pointer; a plain wheel pans.
    pub fn on_wheel(&mut self, screen_pt: Point, delta: WheelDelta, modifiers: Modifiers) -> Vec<Action> {
        if modifiers.command() {
            self.camera.zoom_at(screen_pt, (-delta.dy * WHEEL_ZOOM_SENSITIVITY).exp());
        } else {
            self.camera.pan(-delta.dx, -delta.dy);
        }
        vec![Action::RenderNeeded]
    }

    pub fn on_key_down(&mut self, key: &Key, modifiers: Modifiers) -> Vec<Action> {
        let name = key.0.as_str();
        if modifiers.command() {
            return match name {
                "z" | "Z" if modifiers.shift => self.redo(),
                "z" | "Z" => self.undo(),
                "y" | "Y" => self.redo(),
                _ => Vec::new(),
            };
        }
        match name {
            "Escape" => {
                self.abandon_gesture();
                self.ui.clear_selection();
                self.ui.editing = None;
                vec![Action::RenderNeeded]
            }
            "Delete" | "Backspace" if self.ui.editing.is_none() => {
                let ids: Vec<CardId> = self.ui.selected_ids.iter().copied().collect();
                ids.iter().flat_map(|id| self.delete_card(id)).collect()
            }
            "Enter" if self.ui.editing.is_none() && self.ui.selected_ids.len() == 1 => {
                match self.ui.selected_ids.first().copied() {
                    Some(id) => self.begin_edit(&id),
                    None => Vec::new(),
                }
            }
            _ if self.ui.editing.is_none() && self.input.is_idle() => match Tool::from_shortcut(name) {
                Some(tool) => self.set_tool(tool),
                None => Vec::new(),
            },
            _ => Vec::new(),
        }
    }

    // --- Cards ---

    /// Create a card. Without a position the placement planner picks one.
    ///
    /// Hand-placed kinds get a small random tilt. Text-bearing kinds placed by
    /// hand open their editor once through `just_created`.
    pub fn create_card(
        &mut self,
        kind: CardKind,
        position: Option<Point>,
        size: Option<(f64, f64)>,
        content: CardContent,
    ) -> (CardId, Vec<Action>) {
        let at = position.unwrap_or_else(|| self.plan(size));
        let mut card = Card::new(kind, at.x, at.y, content);
        if let Some((w, h)) = size {
            card.width = Some(w);
            card.height = Some(h);
        }
        if kind.is_hand_placed() {
            card.rotation = self.rng.random_range(-ROTATION_JITTER_DEG..=ROTATION_JITTER_DEG);
        }
        card.just_created = kind.is_textual() && kind != CardKind::AiResult;
        let id = card.id;
        let mut actions = self.insert_card(card);
        actions.extend(self.settle_just_created(&id));
        (id, actions)
    }

    /// Create a file card from a host-extracted document.
    pub fn add_file_card(&mut self, name: impl Into<String>, text: impl Into<String>) -> (CardId, Vec<Action>) {
        self.create_card(CardKind::File, None, None, CardContent::File { name: name.into(), text: text.into() })
    }

    /// Create an image card from PNG bytes.
    pub fn add_image_card(&mut self, png: Vec<u8>) -> (CardId, Vec<Action>) {
        self.create_card(CardKind::Image, None, None, CardContent::Image { png })
    }

    fn plan(&mut self, size: Option<(f64, f64)>) -> Point {
        let size = size.unwrap_or((DEFAULT_CARD_WIDTH, DEFAULT_CARD_HEIGHT));
        placement::plan_position(
            self.doc.iter(),
            &self.camera,
            self.viewport_width,
            self.viewport_height,
            size,
            &mut self.rng,
        )
        .point()
    }

    fn insert_card(&mut self, card: Card) -> Vec<Action> {
        info!(id = %card.id, kind = ?card.kind, x = card.x, y = card.y, "card created");
        let id = card.id;
        self.doc.insert(card);
        match self.doc.get(&id) {
            Some(stored) => vec![Action::CardCreated(stored.clone()), Action::RenderNeeded],
            None => Vec::new(),
        }
    }

    /// Consume `just_created`: open the editor once, then clear the flag.
    fn settle_just_created(&mut self, id: &CardId) -> Vec<Action> {
        if !self.doc.get(id).is_some_and(|c| c.just_created) {
            return Vec::new();
        }
        let fields = PartialCard { just_created: Some(false), ..PartialCard::default() };
        self.doc.apply_partial(id, &fields);
        self.ui.editing = Some(*id);
        vec![Action::EditRequested { id: *id }, Action::CardUpdated { id: *id, fields }]
    }

    /// Apply a sparse update. Unknown ids are a no-op.
    pub fn update_card(&mut self, id: &CardId, fields: PartialCard) -> Vec<Action> {
        if !self.doc.apply_partial(id, &fields) {
            return Vec::new();
        }
        vec![Action::CardUpdated { id: *id, fields }, Action::RenderNeeded]
    }

    /// Remove a card and any selection or edit state pointing at it.
    /// Ink history is untouched.
    pub fn delete_card(&mut self, id: &CardId) -> Vec<Action> {
        if self.doc.remove(id).is_none() {
            return Vec::new();
        }
        self.ui.selected_ids.remove(id);
        if self.ui.editing == Some(*id) {
            self.ui.editing = None;
        }
        info!(%id, "card deleted");
        vec![Action::CardDeleted { id: *id }, Action::RenderNeeded]
    }

    /// Show or hide a card. Hidden cards leave the selection.
    pub fn set_visible(&mut self, id: &CardId, visible: bool) -> Vec<Action> {
        if !visible {
            self.ui.selected_ids.remove(id);
        }
        self.update_card(id, PartialCard { visible: Some(visible), ..PartialCard::default() })
    }

    /// Move a card's top-left corner to a scene position.
    pub fn drag_to(&mut self, id: &CardId, position: Point) -> Vec<Action> {
        self.update_card(id, PartialCard::position(position.x, position.y))
    }

    pub fn begin_edit(&mut self, id: &CardId) -> Vec<Action> {
        match self.doc.get(id) {
            Some(card) if card.kind.is_textual() || card.kind == CardKind::File => {
                self.ui.editing = Some(*id);
                vec![Action::EditRequested { id: *id }]
            }
            _ => Vec::new(),
        }
    }

    /// Store edited text and close the editor. File cards keep their name.
    pub fn commit_edit(&mut self, id: &CardId, text: impl Into<String>) -> Vec<Action> {
        if self.ui.editing == Some(*id) {
            self.ui.editing = None;
        }
        let text = text.into();
        let content = match self.doc.get(id).map(|c| &c.content) {
            Some(CardContent::File { name, .. }) => CardContent::File { name: name.clone(), text },
            Some(CardContent::Image { .. }) | None => return Vec::new(),
            Some(CardContent::Text { .. }) => CardContent::Text { text },
        };
        self.update_card(id, PartialCard { content: Some(content), ..PartialCard::default() })
    }

    // --- Ink history ---

    /// Snapshot the ink layer as a new history entry.
    fn commit_ink(&mut self) -> Vec<Action> {
        self.history.commit(self.ink.clone());
        vec![Action::InkChanged, Action::RenderNeeded]
    }

    pub fn undo(&mut self) -> Vec<Action> {
        self.abandon_gesture();
        match self.history.undo() {
            Some(Some(snapshot)) => self.ink.restore_from(snapshot),
            Some(None) => self.ink.clear(),
            None => return Vec::new(),
        }
        debug!(index = ?self.history.index(), "ink undo");
        vec![Action::InkChanged, Action::RenderNeeded]
    }

    pub fn redo(&mut self) -> Vec<Action> {
        self.abandon_gesture();
        match self.history.redo() {
            Some(snapshot) => self.ink.restore_from(snapshot),
            None => return Vec::new(),
        }
        debug!(index = ?self.history.index(), "ink redo");
        vec![Action::InkChanged, Action::RenderNeeded]
    }

    // --- AI actions ---

    /// Source text of the selected cards, top to bottom then left to right.
    #[must_use]
    pub fn selection_text(&self) -> String {
        let mut cards: Vec<&Card> = self.ui.selected_ids.iter().filter_map(|id| self.doc.get(id)).collect();
        cards.sort_by(|a, b| a.y.total_cmp(&b.y).then(a.x.total_cmp(&b.x)));
        joined_text(cards)
    }

    /// Start an AI action.
    ///
    /// Text actions use the selected cards; categorize uses the whole session;
    /// handwriting uses the lasso's ink. Card-producing actions insert a
    /// loading placeholder positioned by the planner. The selection is cleared.
    ///
    /// # Errors
    ///
    /// [`EngineError::EmptySelection`] when there is no source text, plus the
    /// errors of [`EngineCore::convert_handwriting`].
    pub fn request_ai(&mut self, kind: AiKind) -> Result<Vec<Action>, EngineError> {
        if kind == AiKind::Handwriting {
            return self.convert_handwriting();
        }
        let text =
            if kind.uses_placeholder() { self.selection_text() } else { joined_text(self.doc.sorted_cards()) };
        if text.trim().is_empty() {
            return Err(EngineError::EmptySelection);
        }
        self.ui.clear_selection();
        if kind.uses_placeholder() {
            return Ok(self.spawn_placeholder(kind, text));
        }
        let token = Uuid::new_v4();
        self.pending_category = Some(token);
        info!(%token, "requesting session category");
        Ok(vec![Action::AiRequested(AiRequest { token, kind, text, image: None }), Action::RenderNeeded])
    }

    fn spawn_placeholder(&mut self, kind: AiKind, text: String) -> Vec<Action> {
        let token = Uuid::new_v4();
        let at = self.plan(None);
        let content = if kind == AiKind::Image {
            CardContent::Image { png: Vec::new() }
        } else {
            CardContent::text(format!("{}…", kind.label()))
        };
        let mut card = Card::new(CardKind::AiResult, at.x, at.y, content);
        card.status = CardStatus::Loading;
        card.pending = Some(token);
        card.prompt = Some(text.clone());
        card.ai_kind = Some(kind);
        info!(%token, ?kind, card = %card.id, "requesting AI content");
        let mut actions = self.insert_card(card);
        actions.push(Action::AiRequested(AiRequest { token, kind, text, image: None }));
        actions
    }

    /// Re-run the action that produced an AI card under a new token.
    /// An older response still in flight is ignored when it lands.
    ///
    /// # Errors
    ///
    /// [`EngineError::CardNotFound`] or [`EngineError::NotRegenerable`].
    pub fn regenerate_card(&mut self, id: &CardId) -> Result<Vec<Action>, EngineError> {
        let card = self.doc.get(id).ok_or(EngineError::CardNotFound(*id))?;
        let (Some(kind), Some(text)) = (card.ai_kind, card.prompt.clone()) else {
            return Err(EngineError::NotRegenerable(*id));
        };
        let token = Uuid::new_v4();
        let fields =
            PartialCard { status: Some(CardStatus::Loading), pending: Some(Some(token)), ..PartialCard::default() };
        self.doc.apply_partial(id, &fields);
        info!(%token, ?kind, card = %id, "regenerating AI card");
        Ok(vec![
            Action::CardUpdated { id: *id, fields },
            Action::AiRequested(AiRequest { token, kind, text, image: None }),
            Action::RenderNeeded,
        ])
    }

    /// Send the ink under the lasso box to handwriting recognition.
    ///
    /// # Errors
    ///
    /// [`EngineError::NoLasso`] without a lasso box, [`EngineError::NoInk`]
    /// when the box holds no ink, [`EngineError::Surface`] if encoding fails.
    pub fn convert_handwriting(&mut self) -> Result<Vec<Action>, EngineError> {
        let bounds = self.ui.lasso_bounds.ok_or(EngineError::NoLasso)?;
        let capture = lasso::capture_ink(&self.ink, &bounds)?.ok_or(EngineError::NoInk)?;
        if capture.blank {
            return Err(EngineError::NoInk);
        }
        let token = Uuid::new_v4();
        self.pending_handwriting.insert(token, bounds);
        self.ui.clear_selection();
        info!(%token, bytes = capture.png.len(), "requesting handwriting recognition");
        Ok(vec![
            Action::AiRequested(AiRequest { token, kind: AiKind::Handwriting, text: String::new(), image: Some(capture.png) }),
            Action::RenderNeeded,
        ])
    }

    /// Apply a finished AI call.
    ///
    /// Results are matched by token. A token no card or pending capture is
    /// waiting on (deleted card, regenerated card, reloaded session) is
    /// dropped without effect. Failures mark the card failed and notify.
    pub fn apply_ai_result(&mut self, token: RequestToken, result: Result<AiOutput, AiError>) -> Vec<Action> {
        if let Some(bounds) = self.pending_handwriting.remove(&token) {
            return self.apply_handwriting(bounds, result);
        }
        if self.pending_category == Some(token) {
            self.pending_category = None;
            return match result {
                Ok(output) => match output.to_card_text() {
                    Some(category) if !category.trim().is_empty() => {
                        vec![Action::CategoryAssigned(category.trim().to_owned())]
                    }
                    _ => vec![Action::Notify(Notice::warning("No category suggested"))],
                },
                Err(e) => vec![Action::Notify(Notice::error(format!("Categorize failed: {e}")))],
            };
        }
        let Some(id) = self.doc.find_pending(token) else {
            debug!(%token, "stale AI result dropped");
            return Vec::new();
        };

        let output = match result {
            Ok(output) => output,
            Err(e) => {
                warn!(%token, card = %id, error = %e, "AI result failed");
                let fields =
                    PartialCard { status: Some(CardStatus::Failed), pending: Some(None), ..PartialCard::default() };
                self.doc.apply_partial(&id, &fields);
                return vec![
                    Action::CardUpdated { id, fields },
                    Action::Notify(Notice::error(format!("AI request failed: {e}"))),
                    Action::RenderNeeded,
                ];
            }
        };

        let mut extra_points = Vec::new();
        let mut fields = PartialCard { status: Some(CardStatus::Ready), pending: Some(None), ..PartialCard::default() };
        match output {
            AiOutput::Image(png) => fields.content = Some(CardContent::Image { png }),
            AiOutput::Summary(mut points) if !points.is_empty() => {
                extra_points = points.split_off(1);
                let first = points.remove(0);
                fields.content = Some(CardContent::text(first.text));
                fields.source_excerpt = Some(first.source_quote);
            }
            other => fields.content = Some(CardContent::text(other.to_card_text().unwrap_or_default())),
        }
        self.doc.apply_partial(&id, &fields);
        debug!(%token, card = %id, extra = extra_points.len(), "AI result applied");

        let mut actions = vec![Action::CardUpdated { id, fields }];
        let prompt = self.doc.get(&id).and_then(|c| c.prompt.clone());
        for point in extra_points {
            actions.extend(self.spawn_summary_card(point, prompt.clone()));
        }
        actions.push(Action::RenderNeeded);
        actions
    }

    fn spawn_summary_card(&mut self, point: SummaryPoint, prompt: Option<String>) -> Vec<Action> {
        let at = self.plan(None);
        let mut card = Card::new(CardKind::AiResult, at.x, at.y, CardContent::text(point.text));
        card.source_excerpt = point.source_quote;
        card.prompt = prompt;
        card.ai_kind = Some(AiKind::Summarize);
        self.insert_card(card)
    }

    /// Recognized text replaces the ink it came from, as one undoable step.
    fn apply_handwriting(&mut self, bounds: Bounds, result: Result<AiOutput, AiError>) -> Vec<Action> {
        let text = match result {
            Ok(output) => output.to_card_text().unwrap_or_default(),
            Err(e) => {
                warn!(error = %e, "handwriting recognition failed");
                return vec![Action::Notify(Notice::error(format!("Handwriting recognition failed: {e}")))];
            }
        };
        if text.trim().is_empty() {
            return vec![Action::Notify(Notice::warning("No handwriting recognized"))];
        }

        let mut card = Card::new(CardKind::FreeText, bounds.min_x, bounds.min_y, CardContent::text(text.trim()));
        card.width = Some(bounds.width());
        card.height = Some(bounds.height());
        card.ai_kind = Some(AiKind::Handwriting);
        let mut actions = self.insert_card(card);

        // Edit the committed layer, then put any stroke in progress back on top.
        self.restore_committed_ink();
        lasso::clear_captured(&mut self.ink, &bounds);
        actions.extend(self.commit_ink());
        if let InputState::Inking { tool, points, .. } = &self.input {
            ink::stroke_polyline(&mut self.ink, points, *tool, &self.ui.brush, self.camera.zoom);
        }
        if self.ui.lasso_bounds == Some(bounds) {
            self.ui.lasso_bounds = None;
        }
        actions
    }

    /// Mark every loading card failed. Used when a session is restored and
    /// its in-flight requests can no longer resume.
    pub fn fail_pending(&mut self) -> Vec<Action> {
        let ids: Vec<CardId> =
            self.doc.iter().filter(|c| c.status == CardStatus::Loading || c.pending.is_some()).map(|c| c.id).collect();
        let fields = PartialCard { status: Some(CardStatus::Failed), pending: Some(None), ..PartialCard::default() };
        ids.into_iter()
            .map(|id| {
                self.doc.apply_partial(&id, &fields);
                Action::CardUpdated { id, fields: fields.clone() }
            })
            .collect()
    }
}

fn joined_text<'a>(cards: impl IntoIterator<Item = &'a Card>) -> String {
    cards
        .into_iter()
        .map(|c| c.content.plain_text().trim())
        .filter(|t| !t.is_empty())
        .collect::<Vec<_>>()
        .join("\n\n")
}

fn cursor_for(tool: Tool) -> &'static str {
    match tool {
        Tool::Select => "default",
        Tool::Text => "text",
        Tool::Eraser => "cell",
        _ => "crosshair",
    }
}

/// Pointer angle around `center` in degrees, 0 pointing up, clockwise positive.
fn angle_deg(center: Point, p: Point) -> f64 {
    (p.x - center.x).atan2(-(p.y - center.y)).to_degrees()
}

fn shape_is_degenerate(shape: ShapeKind, a: Point, b: Point) -> bool {
    match shape {
        ShapeKind::Rect | ShapeKind::Ellipse => {
            (a.x - b.x).abs() < MIN_SHAPE_SIZE || (a.y - b.y).abs() < MIN_SHAPE_SIZE
        }
        ShapeKind::Line | ShapeKind::Arrow => a.distance(b) < MIN_SHAPE_SIZE,
    }
}

/// Resize in the card's own frame, then place the new box so the edges
/// opposite the anchor stay put in the scene.
fn resized_patch(
    anchor: hit::ResizeAnchor,
    orig: (f64, f64, f64, f64),
    rotation: f64,
    world_dx: f64,
    world_dy: f64,
) -> PartialCard {
    let (ox, oy, ow, oh) = orig;
    let (ldx, ldy) = hit::delta_to_local(world_dx, world_dy, rotation);
    let (nx, ny, nw, nh) = hit::resize_rect(anchor, orig, ldx, ldy, MIN_CARD_SIZE);

    // Center shift in the card frame, rotated back to the scene.
    let sx = (nx + nw * 0.5) - (ox + ow * 0.5);
    let sy = (ny + nh * 0.5) - (oy + oh * 0.5);
    let (sin, cos) = rotation.to_radians().sin_cos();
    let cx = ox + ow * 0.5 + sx * cos - sy * sin;
    let cy = oy + oh * 0.5 + sx * sin + sy * cos;

    PartialCard {
        x: Some(cx - nw * 0.5),
        y: Some(cy - nh * 0.5),
        width: Some(nw),
        height: Some(nh),
        ..PartialCard::default()
    }
}
