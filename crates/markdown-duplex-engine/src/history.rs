//! Snapshot-based undo/redo that survives switching between editing modes.

use std::time::Instant;

use crate::coordinator::EditorMode;
use crate::sync::{MdPosition, clamp};

/// Selection in markdown coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub struct Selection {
    pub anchor: MdPosition,
    pub head: MdPosition,
    pub collapsed: bool,
}

impl Selection {
    pub fn new(anchor: MdPosition, head: MdPosition) -> Self {
        Self {
            anchor,
            head,
            collapsed: anchor == head,
        }
    }

    pub fn caret(at: MdPosition) -> Self {
        Self::new(at, at)
    }

    /// Same selection with both ends clamped into `markdown`.
    pub fn clamped(self, markdown: &str) -> Self {
        Self::new(clamp(markdown, self.anchor), clamp(markdown, self.head))
    }
}

impl Default for Selection {
    fn default() -> Self {
        Self::caret(MdPosition::start())
    }
}

/// Immutable point-in-time copy of the editable state.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    pub md: String,
    pub selection: Selection,
    pub scroll_top: Option<f32>,
    pub mode: EditorMode,
    pub time: Instant,
}

/// Current stack depths.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub struct HistorySize {
    pub undo: usize,
    pub redo: usize,
}

/// Two-stack undo/redo history.
///
/// The top of the undo stack is the current state; its bottom entry is the
/// floor that can never be undone past. Pushing discards the redo stack.
#[derive(Debug, Clone, Default)]
pub struct SnapshotHistory {
    undo_stack: Vec<Snapshot>,
    redo_stack: Vec<Snapshot>,
    limit: Option<usize>,
}

impl SnapshotHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// History keeping at most `limit` undo entries (at least one).
    pub fn with_limit(limit: usize) -> Self {
        Self {
            limit: Some(limit.max(1)),
            ..Self::default()
        }
    }

    pub fn push(&mut self, snapshot: Snapshot) {
        self.undo_stack.push(snapshot);
        self.redo_stack.clear();

        if let Some(limit) = self.limit
            && self.undo_stack.len() > limit
        {
            let excess = self.undo_stack.len() - limit;
            self.undo_stack.drain(..excess);
        }
    }

    pub fn can_undo(&self) -> bool {
        self.undo_stack.len() > 1
    }

    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    /// Move the current state to the redo stack and return the state to restore.
    pub fn undo(&mut self) -> Option<&Snapshot> {
        if !self.can_undo() {
            return None;
        }
        let current = self.undo_stack.pop()?;
        self.redo_stack.push(current);
        self.undo_stack.last()
    }

    /// Move the most recently undone state back and return it.
    pub fn redo(&mut self) -> Option<&Snapshot> {
        let next = self.redo_stack.pop()?;
        self.undo_stack.push(next);
        self.undo_stack.last()
    }

    /// The current state.
    pub fn current(&self) -> Option<&Snapshot> {
        self.undo_stack.last()
    }

    pub fn size(&self) -> HistorySize {
        HistorySize {
            undo: self.undo_stack.len(),
            redo: self.redo_stack.len(),
        }
    }

    pub fn clear(&mut self) {
        self.undo_stack.clear();
        self.redo_stack.clear();
    }
}
