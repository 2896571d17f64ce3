//! Section decomposition at ATX headings, and the merge used to fold a
//! regenerated document into one that may carry manual additions.

use std::collections::HashSet;

use crate::markdown;
use crate::types::ContentSection;

/// A document split into its heading sections.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Sections {
    /// Lines before the first heading, joined with `\n`. `None` when the
    /// document starts with a heading.
    pub preamble: Option<String>,
    /// One entry per heading outside fenced code, in document order.
    pub sections: Vec<ContentSection>,
}

/// Split `content` at ATX heading boundaries. Each heading owns every line
/// up to the next heading of any level. Lines are one-based; headings
/// inside fenced code blocks are ignored.
pub fn parse_sections(content: &str) -> Sections {
    let lines: Vec<&str> = content.split('\n').collect();
    let fenced = markdown::fenced_lines(&lines);

    let starts: Vec<(usize, usize, &str)> = lines
        .iter()
        .enumerate()
        .filter(|(idx, _)| return !fenced.get(*idx).copied().unwrap_or(false))
        .filter_map(|(idx, line)| {
            return markdown::atx_heading_line(line).map(|(level, text)| return (idx, level, text));
        })
        .collect();

    let first = starts.first().map_or(lines.len(), |(idx, _, _)| return *idx);
    let preamble = (first > 0 || starts.is_empty()).then(|| return lines.get(..first).unwrap_or_default().join("\n"));

    let sections = starts
        .iter()
        .enumerate()
        .map(|(n, &(idx, level, heading))| {
            let end = starts.get(n.saturating_add(1)).map_or(lines.len(), |(next, _, _)| return *next);
            return ContentSection {
                content: lines.get(idx.saturating_add(1)..end).unwrap_or_default().join("\n"),
                end_line: end,
                heading: heading.to_string(),
                level,
                start_line: idx.saturating_add(1),
            };
        })
        .collect();

    return Sections { preamble, sections };
}

/// Render sections back into text. Headings are rebuilt as `#… text`, so
/// closing `#`s and extra spacing are normalized; every other line is kept
/// verbatim.
pub fn render_sections(doc: &Sections) -> String {
    let mut parts: Vec<String> = Vec::with_capacity(doc.sections.len().saturating_add(1));
    if let Some(preamble) = &doc.preamble {
        parts.push(preamble.clone());
    }
    for section in &doc.sections {
        let mut block = format!("{} {}", "#".repeat(section.level), section.heading);
        if section.end_line > section.start_line {
            block.push('\n');
            block.push_str(&section.content);
        }
        parts.push(block);
    }
    return parts.join("\n");
}

/// Merge a regenerated document into an existing one.
///
/// The new document wins for every heading it contains. Sections found only
/// in the old document are appended after it, unchanged. Headings compare
/// case-insensitively, and each heading is emitted at most once, so merging
/// the result again is stable.
pub fn merge_sections(old: &str, new: &str) -> String {
    let old_doc = parse_sections(old);
    let mut merged = parse_sections(new);

    let mut seen: HashSet<String> = HashSet::new();
    merged.sections.retain(|s| return seen.insert(heading_key(&s.heading)));

    let carried: Vec<ContentSection> = old_doc
        .sections
        .into_iter()
        .filter(|s| return seen.insert(heading_key(&s.heading)))
        .collect();

    let mut text = render_sections(&merged);
    let trailing_newline = new.ends_with('\n');
    if text.ends_with('\n') {
        text.pop();
    }
    for section in carried {
        let single = Sections { preamble: None, sections: vec![section] };
        let block = render_sections(&single);
        if !text.is_empty() {
            text.push_str(if text.ends_with('\n') { "\n" } else { "\n\n" });
        }
        text.push_str(block.trim_end_matches('\n'));
    }
    if trailing_newline {
        text.push('\n');
    }
    return text;
}

/// Case-insensitive, whitespace-trimmed heading identity.
fn heading_key(heading: &str) -> String {
    return heading.trim().to_lowercase();
}

#[cfg(test)]
mod tests {
    use super::*;

    const DOC: &str = "intro line\n\n# Title\n\n## Overview\nSome text\n\n```md\n# not a heading\n```\n## Contents\n### Files\n- `a.ts` - A\n";

    #[test]
    fn one_section_per_heading_without_gaps() {
        let doc = parse_sections(DOC);
        let headings: Vec<&str> = doc.sections.iter().map(|s| s.heading.as_str()).collect();
        assert_eq!(headings, vec!["Title", "Overview", "Contents", "Files"]);
        assert_eq!(doc.preamble.as_deref(), Some("intro line\n"));

        let total = DOC.split('\n').count();
        let mut expected_start = 3;
        for section in &doc.sections {
            assert_eq!(section.start_line, expected_start);
            assert!(section.end_line >= section.start_line);
            expected_start = section.end_line + 1;
        }
        assert_eq!(doc.sections.last().unwrap().end_line, total);
    }

    #[test]
    fn section_owns_lines_until_next_heading() {
        let doc = parse_sections(DOC);
        assert_eq!(doc.sections[1].content, "Some text\n\n```md\n# not a heading\n```");
        assert_eq!(doc.sections[1].level, 2);
        assert_eq!(doc.sections[3].content, "- `a.ts` - A\n");
    }

    #[test]
    fn render_round_trips() {
        for text in [DOC, "", "# Only", "\n# Blank first", "no headings\nat all\n", "# A\n# B\n"] {
            assert_eq!(render_sections(&parse_sections(text)), text);
        }
    }

    #[test]
    fn render_normalizes_heading_decoration() {
        let text = "##   Overview ##\nbody\n";
        assert_eq!(render_sections(&parse_sections(text)), "## Overview\nbody\n");
    }

    #[test]
    fn merge_prefers_new_and_keeps_old_only_sections() {
        let old = "# Dir\n\n## Overview\nold overview\n\n## Team Notes\nkeep me\n";
        let new = "# Dir\n\n## Overview\nnew overview\n\n## Purpose\nwhy\n";
        let merged = merge_sections(old, new);
        assert!(merged.contains("new overview"));
        assert!(!merged.contains("old overview"));
        assert!(merged.contains("## Team Notes\nkeep me"));
        assert!(merged.find("## Purpose").unwrap() < merged.find("## Team Notes").unwrap());
        assert!(merged.ends_with('\n'));
    }

    #[test]
    fn merge_is_stable_when_repeated() {
        let old = "# Dir\n\n## notes\nmanual\n";
        let new = "# Dir\n\n## Overview\ngenerated\n";
        let once = merge_sections(old, new);
        let twice = merge_sections(&once, new);
        assert_eq!(once, twice);
        assert_eq!(twice.matches("## notes").count(), 1);
    }

    #[test]
    fn merge_dedupes_headings_case_insensitively() {
        let old = "## Notes\nold\n";
        let new = "## NOTES\nnew\n## notes\ndup\n";
        let merged = merge_sections(old, new);
        assert_eq!(merged, "## NOTES\nnew\n");
    }
}
