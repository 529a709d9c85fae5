//! Card model: structured whiteboard entities and the in-memory store.
//!
//! This module defines what sits on the canvas besides ink: `Card` and its
//! `CardKind`, the tagged `CardContent`, a sparse-update type for incremental
//! edits (`PartialCard`), and the store that owns all live cards
//! (`DocStore`). Cards are positioned by their top-left corner in scene
//! coordinates; a card without an explicit size uses the default footprint.
//!
//! Results from the AI collaborator are matched to cards through
//! `RequestToken`s stored on the card itself. A result whose token does not
//! match is stale and is dropped by the engine.

#[cfg(test)]
#[path = "doc_test.rs"]
mod doc_test;

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::ai::AiKind;
use crate::camera::{Bounds, Point};
use crate::consts::{DEFAULT_CARD_HEIGHT, DEFAULT_CARD_WIDTH};

/// Unique identifier for a card.
pub type CardId = Uuid;

/// Identifier of one outstanding AI request.
pub type RequestToken = Uuid;

/// What a card is. Styling lives in [`Card::color`], not here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CardKind {
    /// Bordered text note.
    TextNote,
    /// Borderless, free-floating text box created by the text tool.
    FreeText,
    /// Sticky note sized by dragging.
    Sticky,
    /// Bitmap image.
    Image,
    /// Uploaded document with its extracted text.
    File,
    /// Output of an AI action.
    AiResult,
}

impl CardKind {
    /// Whether freshly created cards of this kind get a small random tilt.
    #[must_use]
    pub fn is_hand_placed(self) -> bool {
        matches!(self, Self::TextNote | Self::Sticky | Self::Image | Self::File)
    }

    /// Whether the card carries editable text.
    #[must_use]
    pub fn is_textual(self) -> bool {
        matches!(self, Self::TextNote | Self::FreeText | Self::Sticky | Self::AiResult)
    }

    /// Whether the card is drawn with a border.
    #[must_use]
    pub fn is_bordered(self) -> bool {
        !matches!(self, Self::FreeText)
    }
}

/// Body of a card.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CardContent {
    Text { text: String },
    /// PNG bytes. Empty while an image is still being generated.
    Image { png: Vec<u8> },
    File { name: String, text: String },
}

impl CardContent {
    #[must_use]
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text { text: text.into() }
    }

    /// Text usable as AI input. Images contribute nothing.
    #[must_use]
    pub fn plain_text(&self) -> &str {
        match self {
            Self::Text { text } | Self::File { text, .. } => text,
            Self::Image { .. } => "",
        }
    }
}

impl Default for CardContent {
    fn default() -> Self {
        Self::Text { text: String::new() }
    }
}

/// Lifecycle of a card's AI-backed content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CardStatus {
    #[default]
    Ready,
    Loading,
    Failed,
}

fn default_true() -> bool {
    true
}

fn default_color() -> String {
    "#FEF3C7".to_owned()
}

/// A structured entity on the whiteboard.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Card {
    /// Stable for the card's lifetime.
    pub id: CardId,
    pub kind: CardKind,
    /// Left edge in scene coordinates.
    pub x: f64,
    /// Top edge in scene coordinates.
    pub y: f64,
    /// `None` means the default footprint.
    #[serde(default)]
    pub width: Option<f64>,
    #[serde(default)]
    pub height: Option<f64>,
    /// Clockwise rotation in degrees around the card center.
    #[serde(default)]
    pub rotation: f64,
    /// Stacking order; lower values are drawn beneath higher values.
    #[serde(default)]
    pub z_index: i64,
    #[serde(default)]
    pub content: CardContent,
    /// Verbatim quote linking a summary card back to its source text.
    #[serde(default)]
    pub source_excerpt: Option<String>,
    /// Source text that produced an AI card; used to regenerate it.
    #[serde(default)]
    pub prompt: Option<String>,
    /// Action that produced an AI card.
    #[serde(default)]
    pub ai_kind: Option<AiKind>,
    /// Background color as `#rrggbb`.
    #[serde(default = "default_color")]
    pub color: String,
    /// Hidden cards stay in the model and still occupy placement space.
    #[serde(default = "default_true")]
    pub visible: bool,
    /// Consumed once to open the editor, then cleared.
    #[serde(default)]
    pub just_created: bool,
    #[serde(default)]
    pub status: CardStatus,
    /// Token of the AI request this card is waiting on.
    #[serde(default)]
    pub pending: Option<RequestToken>,
}

impl Card {
    /// A card of `kind` at `(x, y)` with everything else defaulted.
    #[must_use]
    pub fn new(kind: CardKind, x: f64, y: f64, content: CardContent) -> Self {
        Self {
            id: Uuid::new_v4(),
            kind,
            x,
            y,
            width: None,
            height: None,
            rotation: 0.0,
            z_index: 0,
            content,
            source_excerpt: None,
            prompt: None,
            ai_kind: None,
            color: default_color(),
            visible: true,
            just_created: false,
            status: CardStatus::Ready,
            pending: None,
        }
    }

    #[must_use]
    pub fn width_or_default(&self) -> f64 {
        self.width.unwrap_or(DEFAULT_CARD_WIDTH)
    }

    #[must_use]
    pub fn height_or_default(&self) -> f64 {
        self.height.unwrap_or(DEFAULT_CARD_HEIGHT)
    }

    /// Unrotated box `{x, y, x + width, y + height}`, used for placement.
    #[must_use]
    pub fn bounds(&self) -> Bounds {
        Bounds::from_xywh(self.x, self.y, self.width_or_default(), self.height_or_default())
    }

    /// Center point, used for lasso membership and as the rotation pivot.
    #[must_use]
    pub fn center(&self) -> Point {
        self.bounds().center()
    }
}

/// Sparse update for a card. Only present fields are applied.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PartialCard {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub x: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub y: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub width: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub height: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rotation: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub z_index: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<CardContent>,
    /// `Some(None)` clears the excerpt.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_excerpt: Option<Option<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub visible: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub just_created: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<CardStatus>,
    /// `Some(None)` clears the pending token.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pending: Option<Option<RequestToken>>,
}

impl PartialCard {
    /// Patch that moves a card.
    #[must_use]
    pub fn position(x: f64, y: f64) -> Self {
        Self { x: Some(x), y: Some(y), ..Self::default() }
    }
}

/// In-memory store of cards.
pub struct DocStore {
    cards: HashMap<CardId, Card>,
    next_z: i64,
}

impl DocStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self { cards: HashMap::new(), next_z: 0 }
    }

    /// Insert a card on top of the stack. An existing card with the same `id` is replaced.
    pub fn insert(&mut self, mut card: Card) {
        card.z_index = self.next_z;
        self.next_z += 1;
        self.cards.insert(card.id, card);
    }

    /// Remove a card by id, returning it if it was present.
    pub fn remove(&mut self, id: &CardId) -> Option<Card> {
        self.cards.remove(id)
    }

    #[must_use]
    pub fn get(&self, id: &CardId) -> Option<&Card> {
        self.cards.get(id)
    }

    /// Find the card waiting on `token`.
    #[must_use]
    pub fn find_pending(&self, token: RequestToken) -> Option<CardId> {
        self.cards.values().find(|c| c.pending == Some(token)).map(|c| c.id)
    }

    /// Apply a partial update to an existing card. Returns false if the card doesn't exist.
    pub fn apply_partial(&mut self, id: &CardId, partial: &PartialCard) -> bool {
        let Some(card) = self.cards.get_mut(id) else {
            return false;
        };
        if let Some(x) = partial.x {
            card.x = x;
        }
        if let Some(y) = partial.y {
            card.y = y;
        }
        if let Some(w) = partial.width {
            card.width = Some(w);
        }
        if let Some(h) = partial.height {
            card.height = Some(h);
        }
        if let Some(r) = partial.rotation {
            card.rotation = r;
        }
        if let Some(z) = partial.z_index {
            card.z_index = z;
            self.next_z = self.next_z.max(z + 1);
        }
        if let Some(ref content) = partial.content {
            card.content = content.clone();
        }
        if let Some(ref excerpt) = partial.source_excerpt {
            card.source_excerpt = excerpt.clone();
        }
        if let Some(ref color) = partial.color {
            card.color = color.clone();
        }
        if let Some(v) = partial.visible {
            card.visible = v;
        }
        if let Some(j) = partial.just_created {
            card.just_created = j;
        }
        if let Some(s) = partial.status {
            card.status = s;
        }
        if let Some(p) = partial.pending {
            card.pending = p;
        }
        true
    }

    /// Replace all cards with a full snapshot, keeping their stored z-order.
    pub fn load_snapshot(&mut self, cards: Vec<Card>) {
        self.cards.clear();
        self.next_z = 0;
        for card in cards {
            self.next_z = self.next_z.max(card.z_index + 1);
            self.cards.insert(card.id, card);
        }
    }

    /// Raise a card above every other card.
    pub fn bring_to_front(&mut self, id: &CardId) -> Option<i64> {
        let z = self.next_z;
        let card = self.cards.get_mut(id)?;
        card.z_index = z;
        self.next_z += 1;
        Some(z)
    }

    /// Return all cards sorted by `(z_index, id)` for draw-order.
    #[must_use]
    pub fn sorted_cards(&self) -> Vec<&Card> {
        let mut cards: Vec<&Card> = self.cards.values().collect();
        cards.sort_by(|a, b| a.z_index.cmp(&b.z_index).then_with(|| a.id.cmp(&b.id)));
        cards
    }

    /// Every card, in no particular order.
    pub fn iter(&self) -> impl Iterator<Item = &Card> {
        self.cards.values()
    }

    /// Number of cards currently in the store.
    #[must_use]
    pub fn len(&self) -> usize {
        self.cards.len()
    }

    /// Returns `true` if the store contains no cards.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cards.is_empty()
    }
}

impl Default for DocStore {
    fn default() -> Self {
        Self::new()
    }
}
