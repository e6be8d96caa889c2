//! # Undo/Redo Stack
//!
//! Tracks document history one transaction at a time.
//!
//! ## Design
//!
//! - Each transaction that changed the tree records the snapshot taken
//!   before it ran
//! - Undo restores that snapshot and keeps the current state for redo
//! - Redo swaps them back
//! - Recording a new transaction clears the redo stack
//! - History depth is bounded; the oldest entries are dropped first
//!
//! ## Example
//!
//! ```rust,ignore
//! let mut stack = UndoStack::new();
//!
//! let before = session.checkpoint();
//! // ... run a transaction ...
//! stack.record(before, "insert-text");
//!
//! if let Some(previous) = stack.undo(session.checkpoint()) {
//!     session.restore(previous);
//! }
//! ```

use crate::Snapshot;

/// One undoable step
#[derive(Debug, Clone)]
pub struct HistoryEntry {
    /// State to return to
    pub snapshot: Snapshot,

    /// Optional description of the step
    pub description: Option<String>,
}

/// Undo/redo stack for document editing
#[derive(Debug)]
pub struct UndoStack {
    /// States before each applied transaction (most recent last)
    undo_stack: Vec<HistoryEntry>,

    /// States undone from (most recent last)
    redo_stack: Vec<HistoryEntry>,

    /// Maximum number of undo levels (0 = unlimited)
    max_levels: usize,
}

impl UndoStack {
    /// Create a new undo stack with default max levels (100)
    pub fn new() -> Self {
        Self::with_max_levels(100)
    }

    /// Create an undo stack with custom max levels
    pub fn with_max_levels(max_levels: usize) -> Self {
        Self {
            undo_stack: Vec::new(),
            redo_stack: Vec::new(),
            max_levels,
        }
    }

    /// Record the state before a transaction that changed the tree
    pub fn record(&mut self, before: Snapshot, description: impl Into<String>) {
        self.undo_stack.push(HistoryEntry {
            snapshot: before,
            description: Some(description.into()),
        });

        if self.max_levels > 0 && self.undo_stack.len() > self.max_levels {
            self.undo_stack.remove(0);
        }

        // New action invalidates the future
        self.redo_stack.clear();
    }

    /// Step back; `current` is kept for redo. Returns the state to restore.
    pub fn undo(&mut self, current: Snapshot) -> Option<Snapshot> {
        let entry = self.undo_stack.pop()?;
        self.redo_stack.push(HistoryEntry {
            snapshot: current,
            description: entry.description.clone(),
        });
        Some(entry.snapshot)
    }

    /// Step forward again; `current` is kept for undo
    pub fn redo(&mut self, current: Snapshot) -> Option<Snapshot> {
        let entry = self.redo_stack.pop()?;
        self.undo_stack.push(HistoryEntry {
            snapshot: current,
            description: entry.description.clone(),
        });
        Some(entry.snapshot)
    }

    /// Check if undo is available
    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    /// Check if redo is available
    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    /// Get the number of undo levels available
    pub fn undo_levels(&self) -> usize {
        self.undo_stack.len()
    }

    /// Get the number of redo levels available
    pub fn redo_levels(&self) -> usize {
        self.redo_stack.len()
    }

    /// Clear all undo/redo history
    pub fn clear(&mut self) {
        self.undo_stack.clear();
        self.redo_stack.clear();
    }

    /// Get description of the next undo operation
    pub fn undo_description(&self) -> Option<&str> {
        self.undo_stack
            .last()
            .and_then(|entry| entry.description.as_deref())
    }

    /// Get description of the next redo operation
    pub fn redo_description(&self) -> Option<&str> {
        self.redo_stack
            .last()
            .and_then(|entry| entry.description.as_deref())
    }
}

impl Default for UndoStack {
    fn default() -> Self {
        Self::new()
    }
}
