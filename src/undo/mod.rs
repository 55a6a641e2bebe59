//! Snapshot history for undo/redo
//!
//! Each committed edit stores the complete `(Document, EditContext)` pair.
//! Because pages and movements are shared through `Arc`, consecutive
//! snapshots only pay for the subtrees an edit actually touched.

use std::collections::VecDeque;

use crate::models::{Document, EditContext};

/// One state of the editor
#[derive(Clone, Debug, PartialEq)]
pub struct Snapshot {
    pub document: Document,
    pub context: EditContext,
}

impl Snapshot {
    pub fn new(document: Document, context: EditContext) -> Self {
        Self { document, context }
    }
}

/// Linear history of snapshots with a cursor on the present one
#[derive(Clone, Debug)]
pub struct History {
    snapshots: VecDeque<Snapshot>,
    /// Index of the present snapshot; meaningless while empty
    current_index: usize,
    /// Maximum number of snapshots kept, the present one included
    max_size: usize,
}

impl Default for History {
    fn default() -> Self {
        Self::new(100)
    }
}

impl History {
    pub fn new(max_size: usize) -> Self {
        Self {
            snapshots: VecDeque::new(),
            current_index: 0,
            max_size: max_size.max(1),
        }
    }

    /// Forget everything and start over from `initial`
    pub fn reset(&mut self, initial: Snapshot) {
        self.snapshots.clear();
        self.snapshots.push_back(initial);
        self.current_index = 0;
    }

    /// Record a new present state, dropping any redo branch
    pub fn commit(&mut self, snapshot: Snapshot) {
        if !self.snapshots.is_empty() {
            self.snapshots.truncate(self.current_index + 1);
        }
        self.snapshots.push_back(snapshot);
        self.current_index = self.snapshots.len() - 1;

        if self.snapshots.len() > self.max_size {
            self.snapshots.pop_front();
            self.current_index = self.current_index.saturating_sub(1);
        }
    }

    /// Step back; returns the state that is now present
    pub fn undo(&mut self) -> Option<&Snapshot> {
        if !self.can_undo() {
            return None;
        }
        self.current_index -= 1;
        self.snapshots.get(self.current_index)
    }

    /// Step forward again after an undo
    pub fn redo(&mut self) -> Option<&Snapshot> {
        if !self.can_redo() {
            return None;
        }
        self.current_index += 1;
        self.snapshots.get(self.current_index)
    }

    pub fn can_undo(&self) -> bool {
        self.current_index > 0
    }

    pub fn can_redo(&self) -> bool {
        self.current_index + 1 < self.snapshots.len()
    }

    pub fn clear(&mut self) {
        self.snapshots.clear();
        self.current_index = 0;
    }

    pub fn undo_count(&self) -> usize {
        self.current_index
    }

    pub fn redo_count(&self) -> usize {
        self.snapshots.len().saturating_sub(self.current_index + 1)
    }
}
