//! Line diff for previewing document edits.
//!
//! A plain dynamic-programming LCS over `\n`-separated lines. Documents in
//! scope are short, so the quadratic table is fine.

use std::fmt::Write as _;

use serde::Serialize;

/// How a diff line relates old text to new text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DiffKind {
    /// Present only in the new text.
    Add,
    /// Present in both.
    Context,
    /// Present only in the old text.
    Remove,
}

/// One aligned line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DiffLine {
    /// The line without its newline.
    pub content: String,
    /// Relation between the two texts.
    pub kind: DiffKind,
    /// One-based line number: in the old text for removals, otherwise in the new text.
    pub line_number: Option<usize>,
}

/// An ordered alignment of two texts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LineDiff {
    /// Every line of both texts, in display order.
    pub lines: Vec<DiffLine>,
}

impl LineDiff {
    /// Align `old` and `new`.
    pub fn compute(old: &str, new: &str) -> Self {
        let old_lines: Vec<&str> = old.split('\n').collect();
        let new_lines: Vec<&str> = new.split('\n').collect();
        let table = lcs_table(&old_lines, &new_lines);

        let mut lines = Vec::with_capacity(old_lines.len().max(new_lines.len()));
        let (mut i, mut j) = (0_usize, 0_usize);
        loop {
            match (old_lines.get(i), new_lines.get(j)) {
                (None, None) => break,
                (Some(old_line), Some(new_line)) if old_line == new_line => {
                    lines.push(line(DiffKind::Context, new_line, j));
                    i = i.saturating_add(1);
                    j = j.saturating_add(1);
                },
                (Some(old_line), None) => {
                    lines.push(line(DiffKind::Remove, old_line, i));
                    i = i.saturating_add(1);
                },
                (Some(old_line), Some(_))
                    if cell(&table, i.saturating_add(1), j) >= cell(&table, i, j.saturating_add(1)) =>
                {
                    lines.push(line(DiffKind::Remove, old_line, i));
                    i = i.saturating_add(1);
                },
                (_, Some(new_line)) => {
                    lines.push(line(DiffKind::Add, new_line, j));
                    j = j.saturating_add(1);
                },
            }
        }
        return Self { lines };
    }

    /// Count of added lines.
    pub fn added(&self) -> usize {
        return self.lines.iter().filter(|l| return l.kind == DiffKind::Add).count();
    }

    /// Rebuild the new text by replaying the diff over `old`. `None` when
    /// `old` is not the text the diff was computed from.
    pub fn apply(&self, old: &str) -> Option<String> {
        let mut source = old.split('\n');
        let mut out: Vec<&str> = Vec::with_capacity(self.lines.len());
        for diff_line in &self.lines {
            match diff_line.kind {
                DiffKind::Add => out.push(&diff_line.content),
                DiffKind::Context => {
                    let original = source.next()?;
                    if original != diff_line.content {
                        return None;
                    }
                    out.push(original);
                },
                DiffKind::Remove => {
                    if source.next()? != diff_line.content {
                        return None;
                    }
                },
            }
        }
        if source.next().is_some() {
            return None;
        }
        return Some(out.join("\n"));
    }

    /// Whether any line was added or removed.
    pub fn has_changes(&self) -> bool {
        return self.lines.iter().any(|l| return l.kind != DiffKind::Context);
    }

    /// Count of removed lines.
    pub fn removed(&self) -> usize {
        return self.lines.iter().filter(|l| return l.kind == DiffKind::Remove).count();
    }

    /// Render changes with up to `context` unchanged lines around each group.
    /// Skipped unchanged runs collapse to a single `...` line.
    pub fn render(&self, context: usize) -> String {
        let keep = visible_lines(&self.lines, context);
        let mut out = String::new();
        let mut skipping = false;
        for (diff_line, visible) in self.lines.iter().zip(keep) {
            if !visible {
                if !skipping {
                    out.push_str("...\n");
                    skipping = true;
                }
                continue;
            }
            skipping = false;
            let marker = match diff_line.kind {
                DiffKind::Add => '+',
                DiffKind::Context => ' ',
                DiffKind::Remove => '-',
            };
            let _ = writeln!(out, "{marker} {}", diff_line.content);
        }
        return out;
    }
}

/// Build a diff line with a one-based number from a zero-based index.
fn line(kind: DiffKind, content: &str, index: usize) -> DiffLine {
    return DiffLine {
        content: content.to_string(),
        kind,
        line_number: Some(index.saturating_add(1)),
    };
}

/// `table[i][j]` is the LCS length of `old[i..]` and `new[j..]`.
fn lcs_table(old: &[&str], new: &[&str]) -> Vec<Vec<usize>> {
    let mut table = vec![vec![0_usize; new.len().saturating_add(1)]; old.len().saturating_add(1)];
    for (i, old_line) in old.iter().enumerate().rev() {
        for (j, new_line) in new.iter().enumerate().rev() {
            let value = if old_line == new_line {
                cell(&table, i.saturating_add(1), j.saturating_add(1)).saturating_add(1)
            } else {
                cell(&table, i.saturating_add(1), j).max(cell(&table, i, j.saturating_add(1)))
            };
            if let Some(slot) = table.get_mut(i).and_then(|row| return row.get_mut(j)) {
                *slot = value;
            }
        }
    }
    return table;
}

/// Table lookup; out of range reads as zero.
fn cell(table: &[Vec<usize>], i: usize, j: usize) -> usize {
    return table.get(i).and_then(|row| return row.get(j)).copied().unwrap_or(0);
}

/// Mark lines within `context` of any change as visible.
fn visible_lines(lines: &[DiffLine], context: usize) -> Vec<bool> {
    let mut visible = vec![false; lines.len()];
    for (idx, diff_line) in lines.iter().enumerate() {
        if diff_line.kind == DiffKind::Context {
            continue;
        }
        let start = idx.saturating_sub(context);
        let end = idx.saturating_add(context).saturating_add(1).min(lines.len());
        for slot in visible.iter_mut().take(end).skip(start) {
            *slot = true;
        }
    }
    return visible;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identical_texts_have_no_changes() {
        for text in ["", "one", "a\nb\nc\n"] {
            let diff = LineDiff::compute(text, text);
            assert!(!diff.has_changes());
            assert_eq!(diff.apply(text).as_deref(), Some(text));
        }
    }

    #[test]
    fn trailing_newline_is_a_change() {
        let diff = LineDiff::compute("a\nb", "a\nb\n");
        assert!(diff.has_changes());
        assert_eq!(diff.added(), 1);
        assert_eq!(diff.removed(), 0);
    }

    #[test]
    fn apply_reconstructs_new_text() {
        let cases = [
            ("a\nb\nc", "a\nc"),
            ("a\nc", "a\nb\nc"),
            ("x\ny\nz", "p\nq"),
            ("", "new\nlines\n"),
            ("# T\n\n- `a.ts` - old\n- `c.ts` - c\n", "# T\n\n- `a.ts` - new\n- `b.ts` - b\n- `c.ts` - c\n"),
        ];
        for (old, new) in cases {
            let diff = LineDiff::compute(old, new);
            assert_eq!(diff.has_changes(), old != new);
            assert_eq!(diff.apply(old).as_deref(), Some(new), "{old:?} -> {new:?}");
        }
    }

    #[test]
    fn apply_rejects_other_base_text() {
        let diff = LineDiff::compute("a\nb", "a\nc");
        assert_eq!(diff.apply("z\nb"), None);
        assert_eq!(diff.apply("a\nb\nextra"), None);
    }

    #[test]
    fn keeps_order_and_line_numbers() {
        let diff = LineDiff::compute("a\nb\nc", "a\nB\nc");
        let kinds: Vec<DiffKind> = diff.lines.iter().map(|l| l.kind).collect();
        assert_eq!(kinds, vec![DiffKind::Context, DiffKind::Remove, DiffKind::Add, DiffKind::Context]);
        assert_eq!(diff.lines[1].line_number, Some(2));
        assert_eq!(diff.lines[2].line_number, Some(2));
    }

    #[test]
    fn render_truncates_long_context() {
        let old: Vec<String> = (1..=20).map(|n| format!("line {n}")).collect();
        let mut new = old.clone();
        new[9] = "changed".to_string();
        let diff = LineDiff::compute(&old.join("\n"), &new.join("\n"));
        let rendered = diff.render(2);
        let expected = "...\n  line 8\n  line 9\n- line 10\n+ changed\n  line 11\n  line 12\n...\n";
        assert_eq!(rendered, expected);
    }
}
