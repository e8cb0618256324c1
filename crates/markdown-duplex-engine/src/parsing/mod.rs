//! # Positioned Markdown Parsing
//!
//! Builds a block tree from markdown text where every node knows its sibling
//! index and the 1-based, inclusive source lines it occupies.
//!
//! The tree is a pure function of the text: it is rebuilt whenever it is
//! needed (serialization flushes, mode switches) and discarded afterwards.
//! Inline content is not represented; only block-level structure matters for
//! locating the source lines of a block range.

pub mod lines;

use std::fmt;

use pulldown_cmark::{CodeBlockKind, Event, Options, Parser, Tag};

pub use lines::{LineIndex, LineRange};

/// Markdown extensions enabled for both parsing and HTML rendering.
pub fn markdown_options() -> Options {
    Options::ENABLE_TABLES
        | Options::ENABLE_STRIKETHROUGH
        | Options::ENABLE_TASKLISTS
        | Options::ENABLE_FOOTNOTES
}

/// Block type tag of a parse node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub enum NodeKind {
    Heading { level: u8 },
    Paragraph,
    BlockQuote,
    CodeBlock { fenced: bool },
    List { ordered: bool },
    ListItem,
    ThematicBreak,
    Table,
    HtmlBlock,
    FootnoteDefinition,
    /// Source lines outside every block, such as link reference definitions,
    /// which produce no parser events of their own.
    Definition,
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NodeKind::Heading { level } => write!(f, "Heading({level})"),
            NodeKind::Paragraph => write!(f, "Paragraph"),
            NodeKind::BlockQuote => write!(f, "BlockQuote"),
            NodeKind::CodeBlock { fenced: true } => write!(f, "CodeBlock(fenced)"),
            NodeKind::CodeBlock { fenced: false } => write!(f, "CodeBlock(indented)"),
            NodeKind::List { ordered: true } => write!(f, "List(ordered)"),
            NodeKind::List { ordered: false } => write!(f, "List(unordered)"),
            NodeKind::ListItem => write!(f, "ListItem"),
            NodeKind::ThematicBreak => write!(f, "ThematicBreak"),
            NodeKind::Table => write!(f, "Table"),
            NodeKind::HtmlBlock => write!(f, "HtmlBlock"),
            NodeKind::FootnoteDefinition => write!(f, "FootnoteDefinition"),
            NodeKind::Definition => write!(f, "Definition"),
        }
    }
}

/// A block node with its position in the source.
#[derive(Debug, Clone, PartialEq)]
pub struct ParseNode {
    pub kind: NodeKind,
    /// Ordinal among its siblings.
    pub index: usize,
    /// Source lines, 1-based and inclusive.
    pub lines: LineRange,
    pub children: Vec<ParseNode>,
}

/// Positioned parse tree of a markdown document.
#[derive(Debug, Clone, PartialEq)]
pub struct ParseTree {
    /// Top-level blocks in document order.
    pub blocks: Vec<ParseNode>,
    /// Number of lines in the parsed source.
    pub line_count: usize,
}

impl ParseTree {
    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    /// The `index`th top-level block.
    pub fn block(&self, index: usize) -> Option<&ParseNode> {
        self.blocks.get(index)
    }

    /// Resolves the inclusive top-level block interval `first..=last` to the
    /// source lines it spans.
    ///
    /// Returns `None` when either index does not name a block in this tree.
    pub fn line_range_of(&self, first: usize, last: usize) -> Option<LineRange> {
        let start = self.block(first)?.lines.start;
        let end = self.block(last)?.lines.end.max(start);
        Some(LineRange::new(start, end))
    }

    /// Index of the top-level block whose lines contain `line`.
    pub fn block_at_line(&self, line: usize) -> Option<usize> {
        self.blocks.iter().position(|b| b.lines.contains(line))
    }

    /// Human-readable outline, one node per line, children indented.
    pub fn format_outline(&self) -> String {
        let mut out = String::new();
        for block in &self.blocks {
            format_node(&mut out, block, 0);
        }
        out
    }
}

fn format_node(out: &mut String, node: &ParseNode, depth: usize) {
    use std::fmt::Write;

    let _ = writeln!(
        out,
        "{}{} [{}..{}]",
        "  ".repeat(depth),
        node.kind,
        node.lines.start,
        node.lines.end
    );
    for child in &node.children {
        format_node(out, child, depth + 1);
    }
}

/// Parse markdown into a positioned block tree.
pub fn parse(text: &str) -> ParseTree {
    let index = LineIndex::new(text);
    let mut blocks = Vec::new();
    // Every start tag gets a frame so end tags stay balanced; inline tags carry None.
    let mut stack: Vec<Option<ParseNode>> = Vec::new();

    for (event, range) in Parser::new_ext(text, markdown_options()).into_offset_iter() {
        match event {
            Event::Start(tag) => {
                let node = block_kind(&tag).map(|kind| new_node(kind, range, text, &index));
                stack.push(node);
            }
            Event::End(_) => {
                if let Some(Some(node)) = stack.pop() {
                    attach(&mut stack, &mut blocks, node);
                }
            }
            Event::Rule => {
                let node = new_node(NodeKind::ThematicBreak, range, text, &index);
                attach(&mut stack, &mut blocks, node);
            }
            _ => {}
        }
    }

    let uncovered = uncovered_runs(&blocks, &index);
    if !uncovered.is_empty() {
        blocks.extend(uncovered);
        blocks.sort_by_key(|b| b.lines.start);
        for (i, block) in blocks.iter_mut().enumerate() {
            block.index = i;
        }
    }

    ParseTree {
        blocks,
        line_count: index.line_count(),
    }
}

/// Runs of non-blank lines that no top-level block covers.
fn uncovered_runs(blocks: &[ParseNode], index: &LineIndex) -> Vec<ParseNode> {
    let line_count = index.line_count();
    let mut covered = vec![false; line_count + 1];
    for block in blocks {
        for line in block.lines.start..=block.lines.end.min(line_count) {
            covered[line] = true;
        }
    }

    let mut runs = Vec::new();
    let mut open: Option<usize> = None;
    for line in 1..=line_count + 1 {
        let text_line = line <= line_count
            && !covered[line]
            && !index.line_text(line).trim().is_empty();
        match (text_line, open) {
            (true, None) => open = Some(line),
            (false, Some(start)) => {
                runs.push(ParseNode {
                    kind: NodeKind::Definition,
                    index: 0,
                    lines: LineRange::new(start, line - 1),
                    children: Vec::new(),
                });
                open = None;
            }
            _ => {}
        }
    }
    runs
}

fn block_kind(tag: &Tag<'_>) -> Option<NodeKind> {
    let kind = match tag {
        Tag::Paragraph => NodeKind::Paragraph,
        Tag::Heading { level, .. } => NodeKind::Heading {
            level: *level as u8,
        },
        Tag::BlockQuote(_) => NodeKind::BlockQuote,
        Tag::CodeBlock(kind) => NodeKind::CodeBlock {
            fenced: matches!(kind, CodeBlockKind::Fenced(_)),
        },
        Tag::HtmlBlock => NodeKind::HtmlBlock,
        Tag::List(start) => NodeKind::List {
            ordered: start.is_some(),
        },
        Tag::Item => NodeKind::ListItem,
        Tag::FootnoteDefinition(_) => NodeKind::FootnoteDefinition,
        Tag::Table(_) => NodeKind::Table,
        _ => return None,
    };
    Some(kind)
}

fn new_node(
    kind: NodeKind,
    range: std::ops::Range<usize>,
    text: &str,
    index: &LineIndex,
) -> ParseNode {
    let start = range.start.min(text.len());
    let mut end = range.end.clamp(start, text.len());
    // Block ranges may swallow the line terminators that follow them.
    while end > start && matches!(text.as_bytes()[end - 1], b'\n' | b'\r') {
        end -= 1;
    }

    let start_line = index.line_of(start);
    let end_line = if end > start {
        index.line_of(end - 1)
    } else {
        start_line
    };

    ParseNode {
        kind,
        index: 0,
        lines: LineRange::new(start_line, end_line),
        children: Vec::new(),
    }
}

fn attach(stack: &mut [Option<ParseNode>], blocks: &mut Vec<ParseNode>, mut node: ParseNode) {
    let siblings = match stack.iter_mut().rev().find_map(|frame| frame.as_mut()) {
        Some(parent) => &mut parent.children,
        None => blocks,
    };
    node.index = siblings.len();
    siblings.push(node);
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn top_level_lines(text: &str) -> Vec<(usize, usize)> {
        parse(text)
            .blocks
            .iter()
            .map(|b| (b.lines.start, b.lines.end))
            .collect()
    }

    #[rstest]
    #[case("# H\n\npara one\n\npara two\n", vec![(1, 1), (3, 3), (5, 5)])]
    #[case("```rust\nfn main() {}\n```\n\ntext", vec![(1, 3), (5, 5)])]
    #[case("Title\n=====\n", vec![(1, 2)])]
    #[case("> quote\n> more\n", vec![(1, 2)])]
    #[case("line one\nline two\n\nnext", vec![(1, 2), (4, 4)])]
    #[case("", vec![])]
    #[case("See [d].\n\n[d]: https://example.com\n[e]: /e\n\nmore\n", vec![(1, 1), (3, 4), (6, 6)])]
    fn test_top_level_line_ranges(#[case] text: &str, #[case] expected: Vec<(usize, usize)>) {
        assert_eq!(top_level_lines(text), expected);
    }

    #[test]
    fn test_sibling_indices_follow_document_order() {
        let tree = parse("# A\n\nb\n\nc\n");
        let indices: Vec<usize> = tree.blocks.iter().map(|b| b.index).collect();
        assert_eq!(indices, vec![0, 1, 2]);
        assert_eq!(tree.block(0).map(|b| b.kind), Some(NodeKind::Heading { level: 1 }));
        assert_eq!(tree.block(1).map(|b| b.kind), Some(NodeKind::Paragraph));
    }

    #[test]
    fn test_line_range_of_spans_intervening_blank_lines() {
        let tree = parse("# H\n\npara one\n\npara two\n");
        assert_eq!(tree.line_range_of(0, 2), Some(LineRange::new(1, 5)));
        assert_eq!(tree.line_range_of(1, 1), Some(LineRange::new(3, 3)));
        assert_eq!(tree.line_range_of(1, 3), None);
        assert_eq!(tree.line_range_of(7, 7), None);
    }

    #[test]
    fn test_reference_definitions_become_definition_nodes() {
        let tree = parse("[d]: https://example.com\n\nSee [docs][d].\n");
        assert_eq!(tree.len(), 2);
        assert_eq!(tree.block(0).map(|b| b.kind), Some(NodeKind::Definition));
        assert_eq!(tree.block(0).map(|b| b.index), Some(0));
        assert_eq!(tree.block(1).map(|b| b.kind), Some(NodeKind::Paragraph));
        assert_eq!(tree.block(1).map(|b| b.index), Some(1));
    }

    #[test]
    fn test_block_at_line() {
        let tree = parse("# H\n\npara one\n");
        assert_eq!(tree.block_at_line(1), Some(0));
        assert_eq!(tree.block_at_line(2), None);
        assert_eq!(tree.block_at_line(3), Some(1));
    }

    #[test]
    fn test_outline_snapshot() {
        let tree = parse("# Title\n\n> quote\n\n- a\n- b\n\n---\n");
        insta::assert_snapshot!(tree.format_outline(), @r"
        Heading(1) [1..1]
        BlockQuote [3..3]
          Paragraph [3..3]
        List(unordered) [5..6]
          ListItem [5..5]
          ListItem [6..6]
        ThematicBreak [8..8]
        ");
    }
}
