//! Sessions and the multi-session workspace.
//!
//! DESIGN
//! ======
//! A `Session` owns one `EngineCore`: ink layer, cards, camera, tool state
//! and selection. Switching sessions swaps all of them as a unit. The
//! `Workspace` keeps every session in creation order with exactly one
//! active, and routes AI completions back to the session that asked.
//!
//! PERSISTENCE
//! ===========
//! `SessionSnapshot` is the serialized form: cards plus ink history as PNG
//! frames. Camera, tool and selection are not persisted. Every field has a
//! serde default so older payloads keep loading. Restoring a session marks
//! cards still waiting on AI as failed, since their requests died with the
//! previous process.

#[cfg(test)]
#[path = "session_test.rs"]
mod session_test;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use uuid::Uuid;

use crate::ai::AiCompletion;
use crate::config::EngineConfig;
use crate::doc::Card;
use crate::engine::{Action, EngineCore, EngineError};
use crate::history::InkHistory;
use crate::raster::{Surface, SurfaceError};
use crate::store::PersistencePolicy;

pub type SessionId = Uuid;

const DEFAULT_TITLE: &str = "Untitled session";

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("session not found: {0}")]
    NotFound(SessionId),
    #[error(transparent)]
    Engine(#[from] EngineError),
}

// =============================================================================
// SESSION
// =============================================================================

/// One whiteboard and everything drawn on it.
pub struct Session {
    pub id: SessionId,
    pub title: String,
    /// Set by the categorize action.
    pub category: Option<String>,
    pub core: EngineCore,
}

impl Session {
    /// A blank session.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Surface`] when the ink surfaces cannot be allocated.
    pub fn new(config: &EngineConfig, title: impl Into<String>) -> Result<Self, EngineError> {
        Ok(Self { id: Uuid::new_v4(), title: title.into(), category: None, core: EngineCore::new(config)? })
    }

    /// Serialize cards and ink history.
    ///
    /// With `exclude_ink_history`, only the frame currently shown is kept, so
    /// the drawing survives but undo does not.
    ///
    /// # Errors
    ///
    /// Returns [`SurfaceError::Encode`] when a frame cannot be encoded.
    pub fn snapshot(&self, policy: PersistencePolicy) -> Result<SessionSnapshot, SurfaceError> {
        let history = self.core.history();
        let (ink_history, history_index) = if policy.exclude_ink_history {
            match history.current() {
                Some(frame) => (vec![frame.encode_png()?], Some(0)),
                None => (Vec::new(), None),
            }
        } else {
            let frames = history.entries().iter().map(Surface::encode_png).collect::<Result<Vec<_>, _>>()?;
            (frames, history.index())
        };
        Ok(SessionSnapshot {
            id: self.id,
            title: self.title.clone(),
            category: self.category.clone(),
            cards: self.core.doc.sorted_cards().into_iter().cloned().collect(),
            ink_history,
            history_index,
            baseline_evicted: history.baseline_evicted(),
        })
    }

    /// Rebuild a session from its snapshot.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Surface`] for an undecodable ink frame or when
    /// the surfaces cannot be allocated.
    pub fn restore(config: &EngineConfig, snapshot: SessionSnapshot) -> Result<Self, EngineError> {
        let frames = snapshot.ink_history.iter().map(|png| Surface::decode_png(png)).collect::<Result<Vec<_>, _>>()?;
        let history =
            InkHistory::from_parts(frames, snapshot.history_index, config.history_limit, snapshot.baseline_evicted);
        let mut core = EngineCore::from_parts(config, snapshot.cards, history)?;
        let failed = core.fail_pending().len();
        info!(id = %snapshot.id, cards = core.doc.len(), failed, "session restored");
        Ok(Self { id: snapshot.id, title: snapshot.title, category: snapshot.category, core })
    }
}

/// Persisted form of a [`Session`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSnapshot {
    pub id: SessionId,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub cards: Vec<Card>,
    /// PNG-encoded ink frames, oldest first.
    #[serde(default)]
    pub ink_history: Vec<Vec<u8>>,
    /// Index of the frame on screen; `None` is the blank baseline.
    #[serde(default)]
    pub history_index: Option<usize>,
    /// Undo stops at the oldest frame instead of reaching a blank layer.
    #[serde(default)]
    pub baseline_evicted: bool,
}

/// Persisted form of a [`Workspace`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WorkspaceSnapshot {
    #[serde(default)]
    pub sessions: Vec<SessionSnapshot>,
    #[serde(default)]
    pub active: Option<SessionId>,
}

// =============================================================================
// WORKSPACE
// =============================================================================

/// All sessions, exactly one of them active.
pub struct Workspace {
    config: EngineConfig,
    sessions: Vec<Session>,
    active: SessionId,
}

impl Workspace {
    /// A workspace holding a single blank session.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Surface`] when the ink surfaces cannot be allocated.
    pub fn new(config: EngineConfig) -> Result<Self, EngineError> {
        let first = Session::new(&config, DEFAULT_TITLE)?;
        let active = first.id;
        Ok(Self { config, sessions: vec![first], active })
    }

    /// Rebuild from a snapshot. An empty snapshot yields a fresh workspace;
    /// an unknown or missing active id falls back to the first session.
    ///
    /// # Errors
    ///
    /// Any [`Session::restore`] failure.
    pub fn restore(config: EngineConfig, snapshot: WorkspaceSnapshot) -> Result<Self, EngineError> {
        let sessions = snapshot
            .sessions
            .into_iter()
            .map(|s| Session::restore(&config, s))
            .collect::<Result<Vec<_>, _>>()?;
        let Some(first) = sessions.first().map(|s| s.id) else {
            return Self::new(config);
        };
        let active = snapshot.active.filter(|id| sessions.iter().any(|s| s.id == *id)).unwrap_or(first);
        Ok(Self { config, sessions, active })
    }

    /// Serialize every session.
    ///
    /// # Errors
    ///
    /// Returns [`SurfaceError::Encode`] when a frame cannot be encoded.
    pub fn snapshot(&self, policy: PersistencePolicy) -> Result<WorkspaceSnapshot, SurfaceError> {
        let sessions = self.sessions.iter().map(|s| s.snapshot(policy)).collect::<Result<Vec<_>, _>>()?;
        Ok(WorkspaceSnapshot { sessions, active: Some(self.active) })
    }

    #[must_use]
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Sessions in creation order.
    pub fn sessions(&self) -> impl Iterator<Item = &Session> {
        self.sessions.iter()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    /// Always `false`: a workspace holds at least one session.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    #[must_use]
    pub fn active_id(&self) -> SessionId {
        self.active
    }

    /// The active session. Falls back to the first one if the active id is
    /// somehow stale; the workspace is never empty.
    #[must_use]
    pub fn active(&self) -> &Session {
        let index = self.index_of(self.active).unwrap_or(0);
        &self.sessions[index]
    }

    pub fn active_mut(&mut self) -> &mut Session {
        let index = self.index_of(self.active).unwrap_or(0);
        &mut self.sessions[index]
    }

    #[must_use]
    pub fn session(&self, id: SessionId) -> Option<&Session> {
        self.sessions.iter().find(|s| s.id == id)
    }

    pub fn session_mut(&mut self, id: SessionId) -> Option<&mut Session> {
        self.sessions.iter_mut().find(|s| s.id == id)
    }

    fn index_of(&self, id: SessionId) -> Option<usize> {
        self.sessions.iter().position(|s| s.id == id)
    }

    /// Create a blank session and make it active.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Surface`] when the ink surfaces cannot be allocated.
    pub fn create(&mut self, title: impl Into<String>) -> Result<SessionId, EngineError> {
        let session = Session::new(&self.config, title)?;
        let id = session.id;
        self.active_mut().core.abandon_gesture();
        self.sessions.push(session);
        self.active = id;
        info!(%id, sessions = self.sessions.len(), "session created");
        Ok(id)
    }

    /// Make `id` the active session. The outgoing session's gesture is abandoned.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::NotFound`] for an unknown id.
    pub fn switch(&mut self, id: SessionId) -> Result<(), SessionError> {
        if self.index_of(id).is_none() {
            return Err(SessionError::NotFound(id));
        }
        if id != self.active {
            self.active_mut().core.abandon_gesture();
            self.active = id;
            debug!(%id, "session switched");
        }
        Ok(())
    }

    /// # Errors
    ///
    /// Returns [`SessionError::NotFound`] for an unknown id.
    pub fn rename(&mut self, id: SessionId, title: impl Into<String>) -> Result<(), SessionError> {
        let session = self.session_mut(id).ok_or(SessionError::NotFound(id))?;
        session.title = title.into();
        Ok(())
    }

    /// Delete a session. Deleting the active one activates its neighbor;
    /// deleting the last one leaves a fresh blank session in its place.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::NotFound`] for an unknown id, or
    /// [`SessionError::Engine`] if the replacement session cannot be allocated.
    pub fn delete(&mut self, id: SessionId) -> Result<(), SessionError> {
        let index = self.index_of(id).ok_or(SessionError::NotFound(id))?;
        if self.sessions.len() == 1 {
            let replacement = Session::new(&self.config, DEFAULT_TITLE)?;
            self.active = replacement.id;
            self.sessions = vec![replacement];
        } else {
            self.sessions.remove(index);
            if self.active == id {
                self.active = self.sessions[index.min(self.sessions.len() - 1)].id;
            }
        }
        info!(%id, sessions = self.sessions.len(), "session deleted");
        Ok(())
    }

    /// Apply a finished AI call to the session that issued it.
    ///
    /// Completions for deleted sessions are dropped. A category result is
    /// stored on the session as well as returned.
    pub fn deliver(&mut self, completion: AiCompletion) -> Vec<Action> {
        let Some(session) = self.session_mut(completion.session_id) else {
            debug!(session = %completion.session_id, token = %completion.token, "completion for deleted session dropped");
            return Vec::new();
        };
        let actions = session.core.apply_ai_result(completion.token, completion.result);
        for action in &actions {
            if let Action::CategoryAssigned(category) = action {
                session.category = Some(category.clone());
            }
        }
        actions
    }
}
