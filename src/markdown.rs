//! Markdown headings via tree-sitter, GitHub-style anchor slugs, and the
//! line-level heading and fence scanning used for text surgery.

use std::path::Path;

use tree_sitter::{Node, Parser, Tree};

use crate::error::Error;

/// An ATX heading found in a document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Heading {
    /// ATX level, 1 through 6.
    pub level: usize,
    /// Zero-based line of the heading.
    pub row: usize,
    /// Heading text without markers.
    pub text: String,
}

/// Collect every ATX heading in document order. Lines inside fenced code
/// blocks are never headings.
///
/// # Errors
///
/// Returns `Error::ParseFailed` if tree-sitter cannot parse the source.
pub fn atx_headings(file_path: &Path, source: &str) -> Result<Vec<Heading>, Error> {
    let tree = parse_markdown(file_path, source)?;
    let mut headings = Vec::new();
    collect_atx_headings(tree.root_node(), source, &mut headings);
    return Ok(headings);
}

/// Parse one line as an ATX heading: up to three leading spaces, one to six
/// `#`, then whitespace or end of line. Closing `#`s are dropped.
pub fn atx_heading_line(line: &str) -> Option<(usize, &str)> {
    let rest = line.trim_start_matches(' ');
    if line.len().saturating_sub(rest.len()) > 3 {
        return None;
    }
    let after = rest.trim_start_matches('#');
    let level = rest.len().saturating_sub(after.len());
    if !(1..=6).contains(&level) {
        return None;
    }
    if !after.is_empty() && !after.starts_with([' ', '\t']) {
        return None;
    }
    let text = after.trim();
    let text = text.trim_end_matches('#');
    // `## Title #` keeps only the title; `## C#` keeps its hash.
    let text = if text.len() == after.trim().len() || text.ends_with([' ', '\t']) || text.is_empty() {
        text.trim()
    } else {
        after.trim()
    };
    return Some((level, text));
}

/// For each line, whether it belongs to a fenced code block (fence lines
/// included). An unclosed fence runs to the end of the document.
pub fn fenced_lines(lines: &[&str]) -> Vec<bool> {
    let mut inside = Vec::with_capacity(lines.len());
    let mut open: Option<(char, usize)> = None;
    for line in lines {
        let fenced = match (open, fence_marker(line)) {
            (None, Some(marker)) => {
                open = Some(marker);
                true
            },
            (Some((ch, len)), Some((found_ch, found_len))) if found_ch == ch && found_len >= len => {
                open = None;
                true
            },
            (Some(_), _) => true,
            (None, None) => false,
        };
        inside.push(fenced);
    }
    return inside;
}

/// Fence character and run length when `line` opens or closes a fence.
fn fence_marker(line: &str) -> Option<(char, usize)> {
    let rest = line.trim_start_matches(' ');
    if line.len().saturating_sub(rest.len()) > 3 {
        return None;
    }
    let ch = rest.chars().next().filter(|c| return *c == '`' || *c == '~')?;
    let len = rest.len().saturating_sub(rest.trim_start_matches(ch).len());
    if len < 3 {
        return None;
    }
    return Some((ch, len));
}

/// Normalize heading text or an anchor into a GitHub-style slug.
///
/// Lowercase; drop everything but word characters, whitespace, and hyphens;
/// turn whitespace runs into single hyphens; collapse repeated hyphens;
/// trim hyphens at both ends. Idempotent.
pub fn slugify(text: &str) -> String {
    let lowered = text.to_lowercase();
    let mut result = String::with_capacity(lowered.len());
    let mut prev_hyphen = true; // Start true to trim leading hyphens.

    for c in lowered.chars() {
        if c.is_alphanumeric() || c == '_' {
            result.push(c);
            prev_hyphen = false;
            continue;
        }
        if !(c.is_whitespace() || c == '-') || prev_hyphen {
            continue;
        }
        result.push('-');
        prev_hyphen = true;
    }

    if result.ends_with('-') {
        result.pop();
    }
    return result;
}

/// Recursively walk the tree collecting `atx_heading` nodes.
fn collect_atx_headings(node: Node<'_>, source: &str, headings: &mut Vec<Heading>) {
    if node.kind() == "atx_heading" {
        if let Some(heading) = heading_from_node(node, source) {
            headings.push(heading);
        }
        return;
    }

    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        collect_atx_headings(child, source, headings);
    }
}

/// Build a `Heading` from an `atx_heading` node.
fn heading_from_node(node: Node<'_>, source: &str) -> Option<Heading> {
    let level = heading_level(node)?;
    let text = extract_heading_inline_text(node, source)?;
    return Some(Heading {
        level,
        row: node.start_position().row,
        text,
    });
}

/// Read the level from the `atx_hN_marker` child.
fn heading_level(heading: Node<'_>) -> Option<usize> {
    let mut cursor = heading.walk();
    for child in heading.children(&mut cursor) {
        let level = match child.kind() {
            "atx_h1_marker" => 1,
            "atx_h2_marker" => 2,
            "atx_h3_marker" => 3,
            "atx_h4_marker" => 4,
            "atx_h5_marker" => 5,
            "atx_h6_marker" => 6,
            _ => continue,
        };
        return Some(level);
    }
    return None;
}

/// Extract raw heading text by reading everything after the heading marker.
fn extract_heading_inline_text(heading: Node<'_>, source: &str) -> Option<String> {
    let mut cursor = heading.walk();
    for child in heading.children(&mut cursor) {
        if child.kind() == "heading_content" || child.kind() == "inline" {
            return child
                .utf8_text(source.as_bytes())
                .ok()
                .map(|t| return t.trim().trim_end_matches('#').trim().to_string());
        }
    }
    // Fallback: take the full heading text and strip the leading #s.
    let text = heading.utf8_text(source.as_bytes()).ok()?;
    let stripped = text.trim().trim_start_matches('#').trim_end_matches('#').trim();
    return Some(stripped.to_string());
}

/// Parse markdown into a tree-sitter tree.
///
/// # Errors
///
/// Returns `Error::ParseFailed` if the language cannot be set or parsing fails.
fn parse_markdown(file_path: &Path, source: &str) -> Result<Tree, Error> {
    let mut parser = Parser::new();
    let language: tree_sitter::Language = tree_sitter_md::LANGUAGE.into();
    parser.set_language(&language).map_err(|e| {
        return Error::ParseFailed {
            file: file_path.to_path_buf(),
            reason: e.to_string(),
        };
    })?;

    return parser.parse(source, None).ok_or_else(|| {
        return Error::ParseFailed {
            file: file_path.to_path_buf(),
            reason: "tree-sitter returned None".to_string(),
        };
    });
}
