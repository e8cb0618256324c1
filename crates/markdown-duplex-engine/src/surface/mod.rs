//! # Structured Editing Surface
//!
//! The coordinator never edits the structured tree itself. It talks to the
//! rich-editing surface through [`StructuredSurface`]: reading the current
//! model wholesale, replacing it wholesale, moving the selection and
//! serializing block ranges back to markdown.
//!
//! [`BlockSurface`] is the in-crate surface: a flat sequence of top-level
//! blocks with stable identifiers kept in a side table.

pub mod block;
pub mod ids;

use std::fmt;

use crate::error::SyncError;
use crate::sync::{BlockRange, EditRange};

pub use block::{BlockSurface, BlockTree, TreeBlock};
pub use ids::BlockIds;

/// Flags carried by every wholesale content replacement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReplaceOptions {
    /// Place the cursor at the end of the new content.
    pub move_cursor_to_end: bool,
    /// Record the replacement as an undoable step.
    pub add_to_history: bool,
    /// Internal re-render rather than user intent; never recorded in history.
    pub programmatic: bool,
}

impl Default for ReplaceOptions {
    fn default() -> Self {
        Self::user()
    }
}

impl ReplaceOptions {
    /// A replacement requested by the user, recorded in history.
    pub fn user() -> Self {
        Self {
            move_cursor_to_end: false,
            add_to_history: true,
            programmatic: false,
        }
    }

    /// An internal replacement that must not pollute history.
    pub fn programmatic() -> Self {
        Self {
            move_cursor_to_end: false,
            add_to_history: false,
            programmatic: true,
        }
    }

    pub fn with_cursor_at_end(mut self) -> Self {
        self.move_cursor_to_end = true;
        self
    }

    /// Whether the replacement should produce a history snapshot.
    pub fn records_history(&self) -> bool {
        self.add_to_history && !self.programmatic
    }
}

/// Notification emitted by the surface after the user mutates the tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StructuredChange {
    /// Blocks `old` of the pre-edit tree became blocks `new` of the post-edit tree.
    Ranged(EditRange),
    /// The extent of the change is not known.
    Unknown,
}

impl StructuredChange {
    pub fn ranged(old: BlockRange, new: BlockRange) -> Self {
        Self::Ranged(EditRange::new(old, new))
    }

    /// The edit range to record; unknown changes cover everything.
    pub fn edit_range(self) -> EditRange {
        match self {
            StructuredChange::Ranged(range) => range,
            StructuredChange::Unknown => EditRange::unknown(),
        }
    }
}

/// The rich-editing surface as seen by the coordinator.
pub trait StructuredSurface {
    /// The structured tree. Equality is structural and backs no-op detection.
    type Model: Clone + PartialEq + fmt::Debug;

    /// Current structured tree.
    fn model(&self) -> &Self::Model;

    /// Replace the whole tree.
    fn set_model(&mut self, model: Self::Model, options: ReplaceOptions);

    /// Number of top-level blocks in the current tree.
    fn block_count(&self) -> usize;

    /// Current selection as flat offsets `(from, to)`.
    fn selection(&self) -> (usize, usize);

    fn set_selection(&mut self, from: usize, to: usize);

    /// Render the top-level blocks `range` of the current tree as
    /// self-contained markdown. `None` when the range does not fit the tree.
    fn serialize_range(&self, range: BlockRange) -> Option<String>;

    /// Render the whole current tree as markdown.
    fn serialize_all(&self) -> String {
        self.model_to_markdown(self.model())
    }

    /// Render a tree (not necessarily the installed one) as markdown.
    fn model_to_markdown(&self, model: &Self::Model) -> String;

    /// Derive a tree from markdown without installing it.
    fn model_from_markdown(&self, markdown: &str) -> Self::Model;

    /// Derive a tree from HTML without installing it.
    fn model_from_html(&self, html: &str) -> Result<Self::Model, SyncError>;

    /// Render a tree (not necessarily the installed one) as HTML.
    fn model_to_html(&self, model: &Self::Model) -> String;
}
