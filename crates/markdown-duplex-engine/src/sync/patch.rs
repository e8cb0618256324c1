use std::borrow::Cow;

use crate::parsing::LineRange;

/// Replacement of an inclusive, 1-based line range of the canonical markdown.
///
/// Line numbers always refer to the markdown the patch was computed against,
/// not to the text produced by earlier patches of the same batch.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct MdPatch {
    pub range: LineRange,
    pub text: String,
}

impl MdPatch {
    pub fn new(start_line: usize, end_line: usize, text: impl Into<String>) -> Self {
        Self {
            range: LineRange::new(start_line, end_line),
            text: text.into(),
        }
    }
}

/// Apply a batch of patches computed against `markdown`.
///
/// Patches are applied in ascending start-line order. Each one replaces its
/// lines with its text split on `\n`; the running difference in line count
/// shifts the patches that follow. A document using `\r\n` keeps it: patch
/// lines are terminated the same way.
pub fn apply_patches(markdown: &str, patches: &[MdPatch]) -> String {
    let mut ordered: Vec<&MdPatch> = patches.iter().collect();
    ordered.sort_by_key(|p| p.range.start);

    let crlf = markdown.contains("\r\n");
    let mut lines: Vec<Cow<'_, str>> = markdown.split('\n').map(Cow::Borrowed).collect();
    let mut shift: isize = 0;

    for patch in ordered {
        let start = shifted(patch.range.start, shift);
        let end = shifted(patch.range.end.max(patch.range.start), shift);

        let first = (start - 1).min(lines.len());
        let last = end.clamp(first, lines.len());
        // The final replaced line keeps whatever terminator it had.
        let keeps_cr = last > first && lines[last - 1].ends_with('\r');
        let replacement = replacement_lines(&patch.text, crlf, keeps_cr);

        shift += replacement.len() as isize - (last - first) as isize;
        lines.splice(first..last, replacement);
    }

    lines.join("\n")
}

fn replacement_lines<'a>(text: &str, crlf: bool, keeps_cr: bool) -> Vec<Cow<'a, str>> {
    let plain: Vec<&str> = text
        .split('\n')
        .map(|line| line.strip_suffix('\r').unwrap_or(line))
        .collect();
    let count = plain.len();
    plain
        .into_iter()
        .enumerate()
        .map(|(i, line)| {
            let cr = if i + 1 < count { crlf } else { keeps_cr };
            if cr {
                Cow::Owned(format!("{line}\r"))
            } else {
                Cow::Owned(line.to_string())
            }
        })
        .collect()
}

fn shifted(line: usize, shift: isize) -> usize {
    (line as isize + shift).max(1) as usize
}
