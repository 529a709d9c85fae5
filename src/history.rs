//! Snapshot-based undo/redo for the ink layer.
//!
//! Each commit stores a full copy of the ink surface. The cursor is `None`
//! while the layer is at its blank baseline (nothing committed, or everything
//! undone). History is linear: committing after an undo discards the redo
//! branch. The stack is capped; when the oldest entry is evicted the blank
//! baseline becomes unreachable and undo stops at the oldest kept snapshot.
//!
//! Card mutations are not recorded here.

#[cfg(test)]
#[path = "history_test.rs"]
mod history_test;

use tracing::debug;

use crate::raster::Surface;

/// Bounded linear undo stack of ink snapshots.
#[derive(Debug, Clone)]
pub struct InkHistory {
    entries: Vec<Surface>,
    cursor: Option<usize>,
    limit: usize,
    baseline_evicted: bool,
}

impl InkHistory {
    /// Empty history keeping at most `limit` snapshots (minimum 1).
    #[must_use]
    pub fn new(limit: usize) -> Self {
        Self { entries: Vec::new(), cursor: None, limit: limit.max(1), baseline_evicted: false }
    }

    /// Rebuild a history from persisted parts. Out-of-range cursors are
    /// clamped. Trimming entries down to `limit` also evicts the baseline.
    #[must_use]
    pub fn from_parts(entries: Vec<Surface>, cursor: Option<usize>, limit: usize, baseline_evicted: bool) -> Self {
        let mut history = Self::new(limit);
        let overflow = entries.len().saturating_sub(history.limit);
        history.baseline_evicted = baseline_evicted || overflow > 0;
        history.entries = entries.into_iter().skip(overflow).collect();
        history.cursor = match cursor {
            _ if history.entries.is_empty() => None,
            Some(i) => Some(i.saturating_sub(overflow).min(history.entries.len() - 1)),
            None => None,
        };
        history
    }

    /// Record `snapshot` as the newest state, dropping any redo branch.
    pub fn commit(&mut self, snapshot: Surface) {
        let keep = self.cursor.map_or(0, |i| i + 1);
        self.entries.truncate(keep);
        self.entries.push(snapshot);
        if self.entries.len() > self.limit {
            self.entries.remove(0);
            self.baseline_evicted = true;
        }
        self.cursor = Some(self.entries.len() - 1);
        debug!(index = self.entries.len() - 1, len = self.entries.len(), "ink history commit");
    }

    /// Step back. Returns the snapshot to display (`None` = blank baseline)
    /// wrapped in `Some`, or `None` when there is nothing to undo.
    pub fn undo(&mut self) -> Option<Option<&Surface>> {
        match self.cursor {
            Some(0) if !self.baseline_evicted => {
                self.cursor = None;
                Some(None)
            }
            Some(i) if i > 0 => {
                self.cursor = Some(i - 1);
                Some(self.entries.get(i - 1))
            }
            _ => None,
        }
    }

    /// Step forward. Returns the snapshot to display, or `None` when there is nothing to redo.
    pub fn redo(&mut self) -> Option<&Surface> {
        let next = self.cursor.map_or(0, |i| i + 1);
        if next >= self.entries.len() {
            return None;
        }
        self.cursor = Some(next);
        self.entries.get(next)
    }

    #[must_use]
    pub fn can_undo(&self) -> bool {
        match self.cursor {
            Some(0) => !self.baseline_evicted,
            Some(_) => true,
            None => false,
        }
    }

    #[must_use]
    pub fn can_redo(&self) -> bool {
        self.cursor.map_or(0, |i| i + 1) < self.entries.len()
    }

    /// The committed state the ink layer should currently show. `None` = blank.
    #[must_use]
    pub fn current(&self) -> Option<&Surface> {
        self.cursor.and_then(|i| self.entries.get(i))
    }

    /// Whether the cap has dropped the blank baseline out of reach.
    #[must_use]
    pub fn baseline_evicted(&self) -> bool {
        self.baseline_evicted
    }

    /// Index of the current snapshot, `None` at the blank baseline.
    #[must_use]
    pub fn index(&self) -> Option<usize> {
        self.cursor
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[must_use]
    pub fn limit(&self) -> usize {
        self.limit
    }

    /// All stored snapshots, oldest first.
    #[must_use]
    pub fn entries(&self) -> &[Surface] {
        &self.entries
    }
}
