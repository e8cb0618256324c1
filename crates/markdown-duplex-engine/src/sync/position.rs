//! Conversion between markdown (line, column) coordinates and flat offsets
//! into the structured tree's linear text projection.
//!
//! In the flat projection every top-level block occupies its content length
//! plus one boundary position on each side. Mapping never fails: positions
//! that fall outside the document are clamped.

use crate::parsing::{LineIndex, ParseTree, parse};

/// A 1-based (line, column) position in markdown text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize)]
pub struct MdPosition {
    pub line: usize,
    pub column: usize,
}

impl MdPosition {
    pub fn new(line: usize, column: usize) -> Self {
        Self { line, column }
    }

    /// The first position of any document.
    pub fn start() -> Self {
        Self::new(1, 1)
    }
}

/// Nearest valid position inside `markdown`.
///
/// The line is clamped to `[1, line count]` and the column to
/// `[1, line length + 1]`, allowing the caret just past the last character.
pub fn clamp(markdown: &str, position: MdPosition) -> MdPosition {
    let index = LineIndex::new(markdown);
    let line = position.line.clamp(1, index.line_count());
    let length = index.line_text(line).chars().count();
    MdPosition::new(line, position.column.clamp(1, length + 1))
}

/// Position just past the last character of `markdown`.
pub fn end_of(markdown: &str) -> MdPosition {
    let index = LineIndex::new(markdown);
    let line = index.line_count();
    MdPosition::new(line, index.line_text(line).chars().count() + 1)
}

#[derive(Debug, Clone)]
struct MappedBlock {
    start_line: usize,
    /// Character length of each source line of the block.
    line_lengths: Vec<usize>,
    /// Flat offset of the block's opening boundary.
    flat_start: usize,
    /// Characters of content, counting one per line break.
    content_len: usize,
}

impl MappedBlock {
    fn content_start(&self) -> usize {
        self.flat_start + 1
    }

    fn content_end(&self) -> usize {
        self.content_start() + self.content_len
    }
}

/// Maps positions for one version of the markdown text.
#[derive(Debug, Clone)]
pub struct PositionMapper {
    blocks: Vec<MappedBlock>,
}

impl PositionMapper {
    pub fn new(markdown: &str) -> Self {
        Self::from_tree(markdown, &parse(markdown))
    }

    /// Build from an already parsed tree of `markdown`.
    pub fn from_tree(markdown: &str, tree: &ParseTree) -> Self {
        let index = LineIndex::new(markdown);
        let mut flat = 0;
        let blocks = tree
            .blocks
            .iter()
            .map(|node| {
                let line_lengths: Vec<usize> = (node.lines.start..=node.lines.end)
                    .map(|line| index.line_text(line).chars().count())
                    .collect();
                let content_len =
                    line_lengths.iter().sum::<usize>() + line_lengths.len().saturating_sub(1);
                let block = MappedBlock {
                    start_line: node.lines.start,
                    line_lengths,
                    flat_start: flat,
                    content_len,
                };
                flat += content_len + 2;
                block
            })
            .collect();
        Self { blocks }
    }

    /// Total size of the flat projection.
    pub fn flat_len(&self) -> usize {
        self.blocks.last().map_or(0, |b| b.content_end() + 1)
    }

    /// Resolve a flat offset to a markdown position.
    ///
    /// An offset on a block's opening boundary resolves to column 1 of the
    /// block's first line, the same position as its first character.
    pub fn to_markdown_position(&self, offset: usize) -> MdPosition {
        let Some(block) = self
            .blocks
            .iter()
            .rev()
            .find(|b| b.flat_start <= offset)
            .or(self.blocks.first())
        else {
            return MdPosition::start();
        };

        let mut remaining = offset
            .saturating_sub(block.content_start())
            .min(block.content_len);

        for (i, length) in block.line_lengths.iter().enumerate() {
            if remaining <= *length {
                return MdPosition::new(block.start_line + i, remaining + 1);
            }
            remaining -= length + 1;
        }

        let last = block.line_lengths.len().saturating_sub(1);
        let length = block.line_lengths.last().copied().unwrap_or(0);
        MdPosition::new(block.start_line + last, length + 1)
    }

    /// Resolve a markdown position to a flat offset.
    ///
    /// Positions before the first block map to its first character; positions
    /// on blank lines between blocks map to the end of the preceding block.
    pub fn to_structured_offset(&self, position: MdPosition) -> usize {
        let Some(block) = self
            .blocks
            .iter()
            .rev()
            .find(|b| b.start_line <= position.line)
            .or(self.blocks.first())
        else {
            return 0;
        };

        if position.line < block.start_line {
            return block.content_start();
        }

        let line_in_block = position.line - block.start_line;
        let Some(length) = block.line_lengths.get(line_in_block) else {
            return block.content_end();
        };

        let preceding: usize = block.line_lengths[..line_in_block]
            .iter()
            .map(|len| len + 1)
            .sum();
        let column = position.column.saturating_sub(1).min(*length);
        block.content_start() + preceding + column
    }
}
