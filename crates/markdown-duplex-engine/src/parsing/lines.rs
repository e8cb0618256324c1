use xi_rope::{LinesMetric, Rope};

/// An inclusive, 1-based range of source lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, serde::Serialize)]
pub struct LineRange {
    pub start: usize,
    pub end: usize,
}

impl LineRange {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    /// Number of lines covered. A range whose end precedes its start still
    /// covers its start line.
    pub fn line_count(self) -> usize {
        self.end.saturating_sub(self.start) + 1
    }

    pub fn contains(self, line: usize) -> bool {
        self.start <= line && line <= self.end
    }
}

/// Line lookups over a markdown source backed by an xi-rope buffer.
///
/// Lines are 1-based. A trailing newline opens a final empty line, so
/// `"a\n"` has two lines, matching `str::split('\n')`.
#[derive(Debug, Clone)]
pub struct LineIndex {
    rope: Rope,
}

impl LineIndex {
    pub fn new(text: &str) -> Self {
        Self {
            rope: Rope::from(text),
        }
    }

    /// Total number of lines, never less than one.
    pub fn line_count(&self) -> usize {
        self.rope.measure::<LinesMetric>() + 1
    }

    /// 1-based line containing `offset`. Offsets past the end clamp to the last line.
    pub fn line_of(&self, offset: usize) -> usize {
        self.rope.line_of_offset(offset.min(self.rope.len())) + 1
    }

    /// Byte offset where `line` starts.
    pub fn line_start(&self, line: usize) -> usize {
        self.rope.offset_of_line(line.saturating_sub(1))
    }

    /// Byte offset just past the content of `line`, before its line terminator.
    pub fn line_end(&self, line: usize) -> usize {
        let start = self.line_start(line);
        let next = self.rope.offset_of_line(line.max(1));
        let cow = self.rope.slice_to_cow(start..next);
        let raw: &str = &cow;
        let content = raw.strip_suffix('\n').unwrap_or(raw);
        let content = content.strip_suffix('\r').unwrap_or(content);
        start + content.len()
    }

    /// Text of `line` without its line terminator. Out-of-range lines are empty.
    pub fn line_text(&self, line: usize) -> String {
        if line == 0 || line > self.line_count() {
            return String::new();
        }
        let start = self.line_start(line);
        let end = self.line_end(line);
        self.rope.slice_to_cow(start..end).into_owned()
    }

    /// Text of the inclusive line range, joined with `\n`, without a trailing terminator.
    pub fn slice_lines(&self, range: LineRange) -> String {
        let last = self.line_count();
        let start = range.start.clamp(1, last);
        let end = range.end.clamp(start, last);
        let from = self.line_start(start);
        let to = self.line_end(end);
        self.rope.slice_to_cow(from..to).into_owned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn line_count_counts_trailing_empty_line() {
        assert_eq!(LineIndex::new("").line_count(), 1);
        assert_eq!(LineIndex::new("a").line_count(), 1);
        assert_eq!(LineIndex::new("a\n").line_count(), 2);
        assert_eq!(LineIndex::new("a\n\nb").line_count(), 3);
    }

    #[test]
    fn line_of_maps_newline_to_the_line_it_ends() {
        let index = LineIndex::new("# H\n\npara");
        assert_eq!(index.line_of(0), 1);
        assert_eq!(index.line_of(3), 1);
        assert_eq!(index.line_of(4), 2);
        assert_eq!(index.line_of(5), 3);
        assert_eq!(index.line_of(500), 3);
    }

    #[test]
    fn line_text_strips_terminators() {
        let index = LineIndex::new("one\r\ntwo\n\nfour");
        assert_eq!(index.line_text(1), "one");
        assert_eq!(index.line_text(2), "two");
        assert_eq!(index.line_text(3), "");
        assert_eq!(index.line_text(4), "four");
        assert_eq!(index.line_text(5), "");
        assert_eq!(index.line_text(0), "");
    }

    #[test]
    fn slice_lines_joins_inclusive_range() {
        let index = LineIndex::new("```\ncode\n```\n\ntext\n");
        assert_eq!(index.slice_lines(LineRange::new(1, 3)), "```\ncode\n```");
        assert_eq!(index.slice_lines(LineRange::new(5, 5)), "text");
    }
}
