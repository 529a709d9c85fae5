//! Workspace persistence.
//!
//! DESIGN
//! ======
//! The workspace never reaches for storage on its own. A `SessionStore` is
//! handed to `save_workspace` / `load_workspace`, which makes swapping the
//! JSON file store for an in-memory one (tests) a one-line change.
//!
//! ERROR HANDLING
//! ==============
//! Stores enforce a byte quota. When a save exceeds it, the save is retried
//! once under `PersistencePolicy { exclude_ink_history: true }`, keeping only
//! the ink frame on screen. The caller gets `SaveOutcome::Degraded` and a
//! notice for the user. Any other failure is returned unchanged.

#[cfg(test)]
#[path = "store_test.rs"]
mod store_test;

use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use tracing::{debug, info, warn};

use crate::config::{EngineConfig, StoreConfig};
use crate::engine::{EngineError, Notice, NoticeLevel};
use crate::raster::SurfaceError;
use crate::session::{Workspace, WorkspaceSnapshot};

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("payload of {size} bytes exceeds the {max}-byte quota")]
    QuotaExceeded { size: usize, max: usize },
    #[error("storage io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("payload (de)serialization failed: {0}")]
    Serde(#[from] serde_json::Error),
    #[error(transparent)]
    Surface(#[from] SurfaceError),
    #[error("restore failed: {0}")]
    Restore(#[from] EngineError),
}

/// What to leave out of a persisted payload.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PersistencePolicy {
    /// Keep only the ink frame currently shown, dropping undo history.
    pub exclude_ink_history: bool,
}

/// Load/save boundary for workspace snapshots.
pub trait SessionStore: Send + Sync {
    /// The last saved snapshot, or `None` if nothing was ever saved.
    ///
    /// # Errors
    ///
    /// Storage or deserialization failures.
    fn load(&self) -> Result<Option<WorkspaceSnapshot>, StoreError>;

    /// Replace the saved snapshot.
    ///
    /// # Errors
    ///
    /// [`StoreError::QuotaExceeded`] when the payload is too large, or any
    /// storage failure.
    fn save(&self, snapshot: &WorkspaceSnapshot) -> Result<(), StoreError>;
}

fn encode_within_quota(snapshot: &WorkspaceSnapshot, max_bytes: usize) -> Result<Vec<u8>, StoreError> {
    let payload = serde_json::to_vec(snapshot)?;
    if payload.len() > max_bytes {
        return Err(StoreError::QuotaExceeded { size: payload.len(), max: max_bytes });
    }
    Ok(payload)
}

// =============================================================================
// JSON FILE STORE
// =============================================================================

/// Single JSON document on disk, written through a temp file and a rename.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
    max_bytes: usize,
}

impl JsonFileStore {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>, config: StoreConfig) -> Self {
        Self { path: path.into(), max_bytes: config.max_bytes }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SessionStore for JsonFileStore {
    fn load(&self) -> Result<Option<WorkspaceSnapshot>, StoreError> {
        let raw = match std::fs::read(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        if raw.iter().all(u8::is_ascii_whitespace) {
            return Ok(None);
        }
        let snapshot: WorkspaceSnapshot = serde_json::from_slice(&raw)?;
        debug!(path = %self.path.display(), bytes = raw.len(), sessions = snapshot.sessions.len(), "workspace loaded");
        Ok(Some(snapshot))
    }

    fn save(&self, snapshot: &WorkspaceSnapshot) -> Result<(), StoreError> {
        let payload = encode_within_quota(snapshot, self.max_bytes)?;
        if let Some(dir) = self.path.parent().filter(|d| !d.as_os_str().is_empty()) {
            std::fs::create_dir_all(dir)?;
        }
        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, &payload)?;
        std::fs::rename(&tmp, &self.path)?;
        debug!(path = %self.path.display(), bytes = payload.len(), "workspace saved");
        Ok(())
    }
}

// =============================================================================
// MEMORY STORE
// =============================================================================

/// Keeps the serialized payload in memory. Same quota rules as the file store.
#[derive(Debug)]
pub struct MemoryStore {
    payload: Mutex<Option<Vec<u8>>>,
    max_bytes: usize,
}

impl MemoryStore {
    #[must_use]
    pub fn new(config: StoreConfig) -> Self {
        Self { payload: Mutex::new(None), max_bytes: config.max_bytes }
    }

    /// Size of the stored payload in bytes, if any.
    #[must_use]
    pub fn stored_bytes(&self) -> Option<usize> {
        self.payload.lock().unwrap_or_else(PoisonError::into_inner).as_ref().map(Vec::len)
    }
}

impl SessionStore for MemoryStore {
    fn load(&self) -> Result<Option<WorkspaceSnapshot>, StoreError> {
        let guard = self.payload.lock().unwrap_or_else(PoisonError::into_inner);
        match guard.as_deref() {
            Some(raw) => Ok(Some(serde_json::from_slice(raw)?)),
            None => Ok(None),
        }
    }

    fn save(&self, snapshot: &WorkspaceSnapshot) -> Result<(), StoreError> {
        let payload = encode_within_quota(snapshot, self.max_bytes)?;
        *self.payload.lock().unwrap_or_else(PoisonError::into_inner) = Some(payload);
        Ok(())
    }
}

// =============================================================================
// SAVE / LOAD
// =============================================================================

/// How a save went.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveOutcome {
    Saved,
    /// Saved without ink undo history to fit the quota.
    Degraded,
}

impl SaveOutcome {
    /// Notice to show the user, if any.
    #[must_use]
    pub fn notice(self) -> Option<Notice> {
        match self {
            Self::Saved => None,
            Self::Degraded => Some(Notice {
                level: NoticeLevel::Warning,
                message: "Storage is full: drawing undo history was not saved".to_owned(),
            }),
        }
    }
}

/// Persist the workspace under `policy`, degrading once on quota errors.
///
/// # Errors
///
/// Any store failure other than a quota error that the degraded retry fixes.
pub fn save_workspace(
    store: &dyn SessionStore,
    workspace: &Workspace,
    policy: PersistencePolicy,
) -> Result<SaveOutcome, StoreError> {
    let snapshot = workspace.snapshot(policy)?;
    match store.save(&snapshot) {
        Ok(()) => Ok(SaveOutcome::Saved),
        Err(StoreError::QuotaExceeded { size, max }) if !policy.exclude_ink_history => {
            warn!(size, max, "storage quota exceeded; retrying without ink history");
            let lean = workspace.snapshot(PersistencePolicy { exclude_ink_history: true })?;
            store.save(&lean)?;
            info!(sessions = lean.sessions.len(), "workspace saved without ink history");
            Ok(SaveOutcome::Degraded)
        }
        Err(e) => Err(e),
    }
}

/// Load the saved workspace, or start a fresh one when nothing was saved.
///
/// # Errors
///
/// Store failures, or [`StoreError::Restore`] when a snapshot cannot be rebuilt.
pub fn load_workspace(store: &dyn SessionStore, config: EngineConfig) -> Result<Workspace, StoreError> {
    let workspace = match store.load()? {
        Some(snapshot) => Workspace::restore(config, snapshot)?,
        None => Workspace::new(config)?,
    };
    info!(sessions = workspace.len(), "workspace ready");
    Ok(workspace)
}
