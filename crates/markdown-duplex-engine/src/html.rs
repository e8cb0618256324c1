//! Conversion between markdown and HTML for the `set_html`/`get_html` entry points.
//!
//! Markdown → HTML goes through pulldown-cmark's HTML writer. HTML → markdown
//! understands the block elements a rich editor produces (headings,
//! paragraphs, code blocks, quotes, lists, rules) and the common inline tags;
//! anything else is reduced to its text.

use std::sync::OnceLock;

use pulldown_cmark::Parser;
use regex::Regex;

use crate::parsing::markdown_options;

/// Render markdown as HTML.
pub fn markdown_to_html(markdown: &str) -> String {
    let mut out = String::new();
    pulldown_cmark::html::push_html(&mut out, Parser::new_ext(markdown, markdown_options()));
    out
}

/// Convert HTML to markdown with blocks separated by blank lines and a single
/// trailing newline. Returns an empty string when no text survives.
pub fn html_to_markdown(html: &str) -> String {
    let blocks = convert_blocks(html);
    if blocks.is_empty() {
        return String::new();
    }
    let mut out = blocks.join("\n\n");
    out.push('\n');
    out
}

/// First `max` characters of `text`, with "..." appended when truncated.
pub fn preview(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((cut, _)) => format!("{}...", &text[..cut]),
        None => text.to_string(),
    }
}

fn cached(cell: &'static OnceLock<Regex>, pattern: &str) -> &'static Regex {
    cell.get_or_init(|| Regex::new(pattern).expect("Invalid HTML conversion regex"))
}

fn block_tag() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    cached(&RE, r"(?i)<(/?)(h[1-6]|p|pre|blockquote|ul|ol|li|hr)\b[^>]*>")
}

fn convert_blocks(html: &str) -> Vec<String> {
    let mut blocks = Vec::new();
    let mut rest = html;

    loop {
        let Some(caps) = block_tag().captures(rest) else {
            push_loose_text(&mut blocks, rest);
            break;
        };
        let Some(open) = caps.get(0) else { break };
        let closing = !caps[1].is_empty();
        let name = caps[2].to_ascii_lowercase();

        push_loose_text(&mut blocks, &rest[..open.start()]);
        let after_open = &rest[open.end()..];

        if closing {
            rest = after_open;
            continue;
        }
        if name == "hr" {
            blocks.push("---".to_string());
            rest = after_open;
            continue;
        }

        match find_close(after_open, &name) {
            Some((inner_end, close_end)) => {
                blocks.extend(convert_block(&name, &after_open[..inner_end]));
                rest = &after_open[close_end..];
            }
            None => {
                blocks.extend(convert_block(&name, after_open));
                break;
            }
        }
    }

    blocks
}

/// Locate the tag closing an element named `name` whose content starts at
/// the beginning of `html`. Returns (content end, offset after the close tag).
fn find_close(html: &str, name: &str) -> Option<(usize, usize)> {
    let mut depth = 1usize;
    for caps in block_tag().captures_iter(html) {
        if !caps[2].eq_ignore_ascii_case(name) {
            continue;
        }
        let tag = caps.get(0)?;
        if caps[1].is_empty() {
            depth += 1;
        } else {
            depth -= 1;
            if depth == 0 {
                return Some((tag.start(), tag.end()));
            }
        }
    }
    None
}

/// Contents of each outermost `name` element in `html`.
fn elements<'a>(html: &'a str, name: &str) -> Vec<&'a str> {
    let mut found = Vec::new();
    let mut depth = 0usize;
    let mut start = 0usize;

    for caps in block_tag().captures_iter(html) {
        if !caps[2].eq_ignore_ascii_case(name) {
            continue;
        }
        let Some(tag) = caps.get(0) else { continue };
        if caps[1].is_empty() {
            if depth == 0 {
                start = tag.end();
            }
            depth += 1;
        } else if depth > 0 {
            depth -= 1;
            if depth == 0 {
                found.push(&html[start..tag.start()]);
            }
        }
    }
    found
}

fn convert_block(name: &str, inner: &str) -> Option<String> {
    let block = match name {
        "p" => inline(inner),
        "pre" => code_block(inner),
        "blockquote" => quote(inner),
        "ul" => list(inner, false),
        "ol" => list(inner, true),
        "li" => prefix_lines(&item_body(inner), "- "),
        heading => {
            let level = heading[1..].parse::<usize>().unwrap_or(1);
            format!("{} {}", "#".repeat(level), inline(inner))
        }
    };
    (!block.trim().is_empty()).then_some(block)
}

fn push_loose_text(blocks: &mut Vec<String>, fragment: &str) {
    let text = inline(fragment);
    if !text.is_empty() {
        blocks.push(text);
    }
}

fn code_block(inner: &str) -> String {
    static LANG: OnceLock<Regex> = OnceLock::new();
    static TAGS: OnceLock<Regex> = OnceLock::new();

    let language = cached(&LANG, r#"(?i)<code\b[^>]*class\s*=\s*"[^"]*language-([\w+#-]+)"#)
        .captures(inner)
        .map(|caps| caps[1].to_string())
        .unwrap_or_default();
    let stripped = cached(&TAGS, r"<[^>]*>").replace_all(inner, "");
    let code = html_escape::decode_html_entities(&stripped);
    let code = code.trim_end_matches('\n');

    format!("```{language}\n{code}\n```")
}

fn quote(inner: &str) -> String {
    let body = convert_blocks(inner).join("\n\n");
    body.lines()
        .map(|line| {
            if line.is_empty() {
                ">".to_string()
            } else {
                format!("> {line}")
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn list(inner: &str, ordered: bool) -> String {
    elements(inner, "li")
        .into_iter()
        .enumerate()
        .map(|(i, item)| {
            let marker = if ordered {
                format!("{}. ", i + 1)
            } else {
                "- ".to_string()
            };
            prefix_lines(&item_body(item), &marker)
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn item_body(item: &str) -> String {
    if block_tag().is_match(item) {
        convert_blocks(item).join("\n")
    } else {
        inline(item)
    }
}

/// Prefix the first line with `marker` and indent the rest to match it.
fn prefix_lines(body: &str, marker: &str) -> String {
    let indent = " ".repeat(marker.len());
    body.lines()
        .enumerate()
        .map(|(i, line)| match (i, line.is_empty()) {
            (0, _) => format!("{marker}{line}"),
            (_, true) => String::new(),
            _ => format!("{indent}{line}"),
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn inline(fragment: &str) -> String {
    static WHITESPACE: OnceLock<Regex> = OnceLock::new();
    static BREAK: OnceLock<Regex> = OnceLock::new();
    static STRONG: OnceLock<Regex> = OnceLock::new();
    static EMPHASIS: OnceLock<Regex> = OnceLock::new();
    static STRIKE: OnceLock<Regex> = OnceLock::new();
    static CODE: OnceLock<Regex> = OnceLock::new();
    static LINK: OnceLock<Regex> = OnceLock::new();
    static IMAGE: OnceLock<Regex> = OnceLock::new();
    static TAGS: OnceLock<Regex> = OnceLock::new();

    let text = cached(&WHITESPACE, r"[ \t\r\n]+").replace_all(fragment, " ");
    let text = cached(&BREAK, r"(?i)\s*<br\s*/?>\s*").replace_all(&text, "\n");
    let text = cached(&STRONG, r"(?is)<(?:strong|b)\b[^>]*>(.*?)</(?:strong|b)\s*>")
        .replace_all(&text, "**${1}**");
    let text = cached(&EMPHASIS, r"(?is)<(?:em|i)\b[^>]*>(.*?)</(?:em|i)\s*>")
        .replace_all(&text, "*${1}*");
    let text = cached(&STRIKE, r"(?is)<(?:del|s)\b[^>]*>(.*?)</(?:del|s)\s*>")
        .replace_all(&text, "~~${1}~~");
    let text =
        cached(&CODE, r"(?is)<code\b[^>]*>(.*?)</code\s*>").replace_all(&text, "`${1}`");
    let text = cached(&LINK, r#"(?is)<a\b[^>]*?\bhref\s*=\s*"([^"]*)"[^>]*>(.*?)</a\s*>"#)
        .replace_all(&text, "[${2}](${1})");
    let text = cached(&IMAGE, r#"(?is)<img\b[^>]*?\bsrc\s*=\s*"([^"]*)"[^>]*>"#)
        .replace_all(&text, "![](${1})");
    let text = cached(&TAGS, r"<[^>]*>").replace_all(&text, "");

    html_escape::decode_html_entities(&text).trim().to_string()
}
