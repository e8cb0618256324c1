use uuid::Uuid;

use crate::error::SyncError;
use crate::html;
use crate::parsing::{LineIndex, NodeKind, parse};
use crate::surface::{BlockIds, ReplaceOptions, StructuredChange, StructuredSurface};
use crate::sync::BlockRange;

/// Separator placed between serialized top-level blocks.
const BLOCK_SEPARATOR: &str = "\n\n";

/// A top-level block of the structured tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeBlock {
    pub kind: NodeKind,
    /// Markdown source of the block, without a trailing line terminator.
    pub markdown: String,
}

impl TreeBlock {
    /// Build a block from its markdown, classifying it by its first parsed block.
    pub fn from_markdown(markdown: impl Into<String>) -> Self {
        let markdown = markdown.into();
        let kind = parse(&markdown)
            .blocks
            .first()
            .map(|b| b.kind)
            .unwrap_or(NodeKind::Paragraph);
        Self { kind, markdown }
    }

    /// Length in the flat text projection: one boundary on each side of the content.
    pub fn flat_size(&self) -> usize {
        self.markdown.chars().count() + 2
    }
}

/// Structured tree of top-level blocks.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BlockTree {
    pub blocks: Vec<TreeBlock>,
}

impl BlockTree {
    pub fn new(blocks: Vec<TreeBlock>) -> Self {
        Self { blocks }
    }

    /// Split markdown into its top-level blocks.
    pub fn from_markdown(markdown: &str) -> Self {
        let tree = parse(markdown);
        let index = LineIndex::new(markdown);
        let blocks = tree
            .blocks
            .iter()
            .map(|node| TreeBlock {
                kind: node.kind,
                markdown: index.slice_lines(node.lines),
            })
            .collect();
        Self { blocks }
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    /// Markdown of blocks `range`, separated by blank lines.
    pub fn serialize_range(&self, range: BlockRange) -> Option<String> {
        if range.start > range.end || range.end >= self.blocks.len() {
            return None;
        }
        let parts: Vec<&str> = self.blocks[range.start..=range.end]
            .iter()
            .map(|b| b.markdown.as_str())
            .collect();
        Some(parts.join(BLOCK_SEPARATOR))
    }

    /// Markdown of the whole tree with a single trailing newline.
    pub fn to_markdown(&self) -> String {
        if self.blocks.is_empty() {
            return String::new();
        }
        let parts: Vec<&str> = self.blocks.iter().map(|b| b.markdown.as_str()).collect();
        let mut out = parts.join(BLOCK_SEPARATOR);
        out.push('\n');
        out
    }

    /// Total length of the flat text projection.
    pub fn flat_len(&self) -> usize {
        self.blocks.iter().map(TreeBlock::flat_size).sum()
    }
}

/// In-crate structured editing surface over a [`BlockTree`].
///
/// Every editing operation returns the [`StructuredChange`] the coordinator
/// needs to track what was touched.
#[derive(Debug, Clone, Default)]
pub struct BlockSurface {
    tree: BlockTree,
    ids: BlockIds,
    selection: (usize, usize),
}

impl BlockSurface {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_markdown(markdown: &str) -> Self {
        let tree = BlockTree::from_markdown(markdown);
        let ids = BlockIds::fresh(tree.len());
        Self {
            tree,
            ids,
            selection: (0, 0),
        }
    }

    pub fn tree(&self) -> &BlockTree {
        &self.tree
    }

    pub fn block(&self, index: usize) -> Option<&TreeBlock> {
        self.tree.blocks.get(index)
    }

    pub fn block_id(&self, index: usize) -> Option<Uuid> {
        self.ids.id_at(index)
    }

    pub fn index_of(&self, id: Uuid) -> Option<usize> {
        self.ids.index_of(id)
    }

    /// Replace the markdown of block `index`.
    ///
    /// Markdown that parses as several blocks is split into that many tree
    /// blocks; the reported new range covers all of them.
    pub fn replace_block(
        &mut self,
        index: usize,
        markdown: impl Into<String>,
    ) -> Option<StructuredChange> {
        if index >= self.tree.len() {
            return None;
        }
        let blocks = split_blocks(markdown.into());
        let added = blocks.len();
        self.tree.blocks.splice(index..=index, blocks);
        for offset in 1..added {
            self.ids.insert(index + offset);
        }
        Some(StructuredChange::ranged(
            BlockRange::single(index),
            BlockRange::new(index, index + added - 1),
        ))
    }

    /// Replace the markdown of the block identified by `id`.
    pub fn replace_block_by_id(
        &mut self,
        id: Uuid,
        markdown: impl Into<String>,
    ) -> Option<StructuredChange> {
        let index = self.ids.index_of(id)?;
        self.replace_block(index, markdown)
    }

    /// Insert a block so that it ends up at `index`.
    ///
    /// The reported ranges include the preceding block (or the following one
    /// when inserting at the front) so neither range is ever empty. Markdown
    /// that parses as several blocks is inserted as that many blocks.
    pub fn insert_block(&mut self, index: usize, markdown: impl Into<String>) -> StructuredChange {
        let was_empty = self.tree.is_empty();
        let index = index.min(self.tree.len());
        let blocks = split_blocks(markdown.into());
        let added = blocks.len();
        self.tree.blocks.splice(index..index, blocks);
        for offset in 0..added {
            self.ids.insert(index + offset);
        }

        if was_empty {
            StructuredChange::Unknown
        } else if index == 0 {
            StructuredChange::ranged(BlockRange::single(0), BlockRange::new(0, added))
        } else {
            StructuredChange::ranged(
                BlockRange::single(index - 1),
                BlockRange::new(index - 1, index - 1 + added),
            )
        }
    }

    /// Remove block `index`, reporting the neighbour that absorbs the gap.
    pub fn remove_block(&mut self, index: usize) -> Option<StructuredChange> {
        if index >= self.tree.len() {
            return None;
        }
        self.tree.blocks.remove(index);
        self.ids.remove(index);

        let change = if self.tree.is_empty() {
            StructuredChange::Unknown
        } else if index == 0 {
            StructuredChange::ranged(BlockRange::new(0, 1), BlockRange::single(0))
        } else {
            StructuredChange::ranged(
                BlockRange::new(index - 1, index),
                BlockRange::single(index - 1),
            )
        };
        Some(change)
    }

    /// Replace the whole tree as a user edit of unknown extent.
    pub fn replace_all(&mut self, tree: BlockTree) -> StructuredChange {
        self.ids = BlockIds::fresh(tree.len());
        self.tree = tree;
        StructuredChange::Unknown
    }
}

/// Tree blocks for markdown entered as one block: one per top-level block it
/// parses as, or a single block when it parses as none.
fn split_blocks(markdown: String) -> Vec<TreeBlock> {
    let tree = BlockTree::from_markdown(&markdown);
    if tree.is_empty() {
        vec![TreeBlock::from_markdown(markdown)]
    } else {
        tree.blocks
    }
}

impl StructuredSurface for BlockSurface {
    type Model = BlockTree;

    fn model(&self) -> &BlockTree {
        &self.tree
    }

    fn set_model(&mut self, model: BlockTree, options: ReplaceOptions) {
        self.ids = BlockIds::fresh(model.len());
        self.tree = model;
        let end = self.tree.flat_len();
        self.selection = if options.move_cursor_to_end {
            (end, end)
        } else {
            (self.selection.0.min(end), self.selection.1.min(end))
        };
    }

    fn block_count(&self) -> usize {
        self.tree.len()
    }

    fn selection(&self) -> (usize, usize) {
        self.selection
    }

    fn set_selection(&mut self, from: usize, to: usize) {
        let end = self.tree.flat_len();
        self.selection = (from.min(end), to.min(end));
    }

    fn serialize_range(&self, range: BlockRange) -> Option<String> {
        self.tree.serialize_range(range)
    }

    fn model_to_markdown(&self, model: &BlockTree) -> String {
        model.to_markdown()
    }

    fn model_from_markdown(&self, markdown: &str) -> BlockTree {
        BlockTree::from_markdown(markdown)
    }

    fn model_from_html(&self, html: &str) -> Result<BlockTree, SyncError> {
        let markdown = html::html_to_markdown(html);
        if markdown.trim().is_empty() && !html.trim().is_empty() {
            return Err(SyncError::UnsupportedHtml(html::preview(html, 40)));
        }
        Ok(BlockTree::from_markdown(&markdown))
    }

    fn model_to_html(&self, model: &BlockTree) -> String {
        html::markdown_to_html(&model.to_markdown())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sync::EditRange;
    use pretty_assertions::assert_eq;

    const DOC: &str = "# H\n\npara one\n\npara two\n";

    fn ranged(old: (usize, usize), new: (usize, usize)) -> StructuredChange {
        StructuredChange::Ranged(EditRange::new(
            BlockRange::new(old.0, old.1),
            BlockRange::new(new.0, new.1),
        ))
    }

    #[test]
    fn test_from_markdown_splits_top_level_blocks() {
        let surface = BlockSurface::from_markdown(DOC);
        let blocks = &surface.tree().blocks;
        assert_eq!(blocks.len(), 3);
        assert_eq!(blocks[0].kind, NodeKind::Heading { level: 1 });
        assert_eq!(blocks[0].markdown, "# H");
        assert_eq!(blocks[1].markdown, "para one");
        assert_eq!(blocks[2].markdown, "para two");
    }

    #[test]
    fn test_serialize_all_round_trips_normalized_markdown() {
        let surface = BlockSurface::from_markdown(DOC);
        assert_eq!(surface.serialize_all(), DOC);
    }

    #[test]
    fn test_serialize_range_validates_bounds() {
        let surface = BlockSurface::from_markdown(DOC);
        assert_eq!(
            surface.serialize_range(BlockRange::new(1, 2)),
            Some("para one\n\npara two".to_string())
        );
        assert_eq!(surface.serialize_range(BlockRange::new(2, 3)), None);
        assert_eq!(surface.serialize_range(BlockRange::new(2, 1)), None);
    }

    #[test]
    fn test_replace_block_reports_single_block_range() {
        let mut surface = BlockSurface::from_markdown(DOC);
        let change = surface.replace_block(1, "para ONE");
        assert_eq!(change, Some(ranged((1, 1), (1, 1))));
        assert_eq!(surface.block(1).map(|b| b.markdown.as_str()), Some("para ONE"));
        assert_eq!(surface.replace_block(5, "nope"), None);
    }

    #[test]
    fn test_insert_block_reports_neighbour_ranges() {
        let mut surface = BlockSurface::from_markdown(DOC);
        assert_eq!(surface.insert_block(1, "new"), ranged((0, 0), (0, 1)));
        assert_eq!(surface.insert_block(0, "first"), ranged((0, 0), (0, 1)));
        assert_eq!(surface.block_count(), 5);

        let mut empty = BlockSurface::new();
        assert_eq!(empty.insert_block(0, "only"), StructuredChange::Unknown);
    }

    #[test]
    fn test_remove_block_reports_neighbour_ranges() {
        let mut surface = BlockSurface::from_markdown(DOC);
        assert_eq!(surface.remove_block(2), Some(ranged((1, 2), (1, 1))));
        assert_eq!(surface.remove_block(0), Some(ranged((0, 1), (0, 0))));
        assert_eq!(surface.remove_block(0), Some(StructuredChange::Unknown));
        assert_eq!(surface.remove_block(0), None);
    }

    #[test]
    fn test_multi_block_markdown_is_split() {
        let mut surface = BlockSurface::from_markdown(DOC);
        let last = surface.block_id(2).unwrap();

        let change = surface.replace_block(1, "x\n\ny");
        assert_eq!(change, Some(ranged((1, 1), (1, 2))));
        assert_eq!(surface.block_count(), 4);
        assert_eq!(surface.block(2).map(|b| b.markdown.as_str()), Some("y"));
        assert_eq!(surface.index_of(last), Some(3));

        assert_eq!(surface.insert_block(4, "a\n\nb"), ranged((3, 3), (3, 5)));
        assert_eq!(surface.serialize_all(), "# H\n\nx\n\ny\n\npara two\n\na\n\nb\n");
    }

    #[test]
    fn test_reference_definitions_survive_full_serialization() {
        let md = "See [docs][d].\n\n[d]: https://example.com\n\nmore\n";
        let surface = BlockSurface::from_markdown(md);
        assert_eq!(surface.block_count(), 3);
        assert_eq!(surface.block(1).map(|b| b.kind), Some(NodeKind::Definition));
        assert_eq!(surface.serialize_all(), md);
    }

    #[test]
    fn test_block_ids_survive_neighbouring_edits() {
        let mut surface = BlockSurface::from_markdown(DOC);
        let last = surface.block_id(2).unwrap();

        surface.insert_block(1, "inserted");
        assert_eq!(surface.index_of(last), Some(3));

        surface.replace_block_by_id(last, "para TWO");
        assert_eq!(surface.block(3).map(|b| b.markdown.as_str()), Some("para TWO"));
    }

    #[test]
    fn test_set_model_moves_cursor_to_end() {
        let mut surface = BlockSurface::new();
        surface.set_model(
            BlockTree::from_markdown("ab\n\ncd\n"),
            ReplaceOptions::user().with_cursor_at_end(),
        );
        assert_eq!(surface.selection(), (8, 8));
    }

    #[test]
    fn test_model_from_html_rejects_unconvertible_input() {
        let surface = BlockSurface::new();
        assert!(surface.model_from_html("<div></div>").is_err());
        assert_eq!(surface.model_from_html("").map(|t| t.len()).ok(), Some(0));
        let tree = surface.model_from_html("<h2>Two</h2><p>body</p>").unwrap();
        assert_eq!(tree.to_markdown(), "## Two\n\nbody\n");
    }
}
