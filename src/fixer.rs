//! Fix engine: turns issues into small, local edits of the markdown source.
//!
//! Transforms anchor on structural keys (headings, file names, placeholder
//! text) and are recomputed against the current in-memory text before every
//! edit, so earlier fixes never invalidate later ones.

use std::path::Path;

use chrono::NaiveDate;
use tracing::{error, info, warn};

use crate::analyzer::{PLACEHOLDER_MARKER, last_updated_pattern};
use crate::diff::LineDiff;
use crate::knowledge::mentions_file;
use crate::markdown::{atx_heading_line, fenced_lines};
use crate::types::{
    DocumentationAnalysis, DocumentationIssue, FixAction, FixResult, FixSummary, Severity, SuggestedFix,
};

/// Section order used to place synthesized sections.
pub const CANONICAL_SECTIONS: &[&str] = &["Overview", "Contents", "Purpose", "Key Components", "Dependencies", "Notes"];

/// Reason recorded when a transform leaves the text unchanged.
pub const NO_CHANGES: &str = "no changes would be made";

/// How a fix run behaves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixOptions {
    /// Apply without asking.
    pub auto_approve: bool,
    /// Compute everything, write nothing.
    pub dry_run: bool,
    /// Issues below this severity are skipped.
    pub severity_threshold: Severity,
    /// Date written into the `*Last updated*` marker.
    pub today: NaiveDate,
}

/// Result of fixing one document.
#[derive(Debug, Clone)]
pub struct FixReport {
    /// Whole-document diff of what changed (or would change), if anything.
    pub diff: Option<LineDiff>,
    /// Per-issue outcomes.
    pub summary: FixSummary,
}

/// Apply the analysis' fixes to its document.
///
/// `approve` is asked before each edit unless `auto_approve` or `dry_run`
/// is set. Read and write failures are logged and reported as zero fixes
/// applied; they never abort a batch.
pub fn apply_fixes(
    analysis: &DocumentationAnalysis,
    options: &FixOptions,
    approve: &mut dyn FnMut(&DocumentationIssue, &LineDiff) -> bool,
) -> FixReport {
    let path = &analysis.file_path;
    let total_issues = analysis.issues.len();

    let mut eligible: Vec<&DocumentationIssue> =
        analysis.issues.iter().filter(|i| return i.severity >= options.severity_threshold).collect();
    eligible.sort_by(|a, b| return b.severity.cmp(&a.severity));

    let original = match std::fs::read_to_string(path) {
        Ok(text) => text,
        Err(e) => {
            warn!(file = %path.display(), error = %e, "cannot read document for fixing");
            let reason = format!("cannot read document: {e}");
            let results = eligible.iter().map(|i| return not_applied(i, &reason)).collect();
            return FixReport { diff: None, summary: summary(path, total_issues, results) };
        },
    };

    let mut text = original.clone();
    let mut results = Vec::with_capacity(eligible.len());
    for issue in eligible {
        let Some(fix) = &issue.suggested_fix else {
            results.push(not_applied(issue, "no automatic fix available"));
            continue;
        };
        let updated = match transform(&text, fix) {
            Err(reason) => {
                results.push(not_applied(issue, &reason));
                continue;
            },
            Ok(updated) => updated,
        };
        if updated == text {
            results.push(not_applied(issue, NO_CHANGES));
            continue;
        }
        if !options.auto_approve && !options.dry_run && !approve(issue, &LineDiff::compute(&text, &updated)) {
            results.push(not_applied(issue, "declined"));
            continue;
        }
        text = updated;
        results.push(FixResult {
            applied: true,
            description: issue.description.clone(),
            issue_type: issue.issue_type,
            reason: None,
            severity: issue.severity,
        });
    }

    let applied = results.iter().filter(|r| return r.applied).count();
    if applied > 0 && !options.dry_run {
        text = refresh_last_updated(&text, options.today);
        if let Err(e) = std::fs::write(path, &text) {
            error!(file = %path.display(), error = %e, "failed to write fixes");
            let reason = format!("write failed: {e}");
            for result in &mut results {
                if result.applied {
                    result.applied = false;
                    result.reason = Some(reason.clone());
                }
            }
            return FixReport { diff: None, summary: summary(path, total_issues, results) };
        }
        info!(file = %path.display(), applied, "fixes written");
    }

    let diff = LineDiff::compute(&original, &text);
    let diff = diff.has_changes().then_some(diff);
    return FixReport { diff, summary: summary(path, total_issues, results) };
}

/// Compute the text after one fix. `Err` carries the reason it cannot apply.
///
/// # Errors
///
/// Returns a human-readable reason when the fix lacks a target or content,
/// or when its anchor cannot be found.
pub fn transform(text: &str, fix: &SuggestedFix) -> Result<String, String> {
    let target = fix.target.as_deref().ok_or_else(|| return "fix has no target".to_string())?;
    return match fix.action {
        FixAction::AddFiles => {
            let bullet = fix.content.clone().unwrap_or_else(|| return format!("- `{target}`"));
            Ok(add_file_bullet(text, target, &bullet))
        },
        FixAction::AddSection => Ok(add_section(text, target, fix.content.as_deref().unwrap_or(PLACEHOLDER_MARKER))),
        FixAction::RemovePlaceholder => Ok(remove_placeholder(text, target)),
        FixAction::UpdateContent => {
            let description = fix.content.as_deref().ok_or_else(|| return "fix has no content".to_string())?;
            update_description(text, target, description)
        },
    };
}

// ── add_files ─────────────────────────────────────────────────────────

/// Insert `bullet` under `### Files`, alphabetically when the list allows.
/// Without `### Files`, the sub-heading is synthesized under `## Contents`;
/// without either, a `## Contents` section is added at its canonical place.
pub fn add_file_bullet(text: &str, file_name: &str, bullet: &str) -> String {
    let mut lines: Vec<String> = text.split('\n').map(String::from).collect();
    let fenced = fence_mask(&lines);
    let quoted = format!("`{file_name}`");

    if let Some(files_idx) = find_heading(&lines, &fenced, 3, "Files") {
        let end = section_end(&lines, &fenced, files_idx);
        let bullets: Vec<usize> = (files_idx.saturating_add(1)..end)
            .filter(|idx| return lines.get(*idx).is_some_and(|l| return is_bullet(l)))
            .collect();
        if bullets.iter().any(|idx| return lines.get(*idx).is_some_and(|l| return l.contains(&quoted))) {
            return text.to_string();
        }
        let key = file_name.to_lowercase();
        let position = match bullets.iter().find(|idx| return lines.get(**idx).is_some_and(|l| return bullet_key(l) > key)) {
            Some(idx) => *idx,
            None => match bullets.last() {
                Some(last) => last.saturating_add(1),
                None => {
                    let at = files_idx.saturating_add(1);
                    if lines.get(at).is_some_and(|l| return l.trim().is_empty()) {
                        at.saturating_add(1)
                    } else {
                        lines.insert(at, String::new());
                        at.saturating_add(1)
                    }
                },
            },
        };
        if bullets.is_empty() && lines.get(position).is_some_and(|l| return !l.trim().is_empty()) {
            lines.insert(position, String::new());
        }
        lines.insert(position, bullet.to_string());
        return lines.join("\n");
    }

    if let Some(contents_idx) = find_heading(&lines, &fenced, 2, "Contents") {
        let block = ["", "### Files", "", bullet].map(String::from);
        let at = contents_idx.saturating_add(1);
        lines.splice(at..at, block);
        return lines.join("\n");
    }

    return add_section(text, "Contents", &format!("### Files\n\n{bullet}"));
}

/// Sort key of a bullet: the backticked name if any, else the bullet text.
fn bullet_key(line: &str) -> String {
    let body = line.trim_start().trim_start_matches(['-', '*', '+']).trim_start();
    let key = body
        .strip_prefix('`')
        .and_then(|rest| return rest.split_once('`'))
        .map_or(body, |(name, _)| return name);
    return key.to_lowercase();
}

/// Markdown list item.
fn is_bullet(line: &str) -> bool {
    let trimmed = line.trim_start();
    return trimmed.starts_with("- ") || trimmed.starts_with("* ") || trimmed.starts_with("+ ");
}

// ── add_section ───────────────────────────────────────────────────────

/// Insert `## heading` with `body` before the first later canonical section,
/// else before the `---` footer, else at the end. Unchanged if present.
pub fn add_section(text: &str, heading: &str, body: &str) -> String {
    let mut lines: Vec<String> = text.split('\n').map(String::from).collect();
    let fenced = fence_mask(&lines);
    if find_heading(&lines, &fenced, 2, heading).is_some() {
        return text.to_string();
    }

    let later: &[&str] = CANONICAL_SECTIONS
        .iter()
        .position(|s| return s.eq_ignore_ascii_case(heading))
        .and_then(|pos| return CANONICAL_SECTIONS.get(pos.saturating_add(1)..))
        .unwrap_or(&[]);

    let before_later = lines.iter().enumerate().find_map(|(idx, line)| {
        if is_fenced(&fenced, idx) {
            return None;
        }
        let (level, title) = atx_heading_line(line)?;
        let is_later = level == 2 && later.iter().any(|s| return s.eq_ignore_ascii_case(title.trim()));
        return is_later.then_some(idx);
    });
    let footer = || {
        return lines
            .iter()
            .enumerate()
            .rev()
            .find(|(idx, line)| return !is_fenced(&fenced, *idx) && line.trim() == "---")
            .map(|(idx, _)| return idx);
    };
    let end = || {
        if lines.last().is_some_and(String::is_empty) {
            return lines.len().saturating_sub(1);
        }
        return lines.len();
    };
    let at = before_later.or_else(footer).unwrap_or_else(end);

    let mut block: Vec<String> = Vec::new();
    if at > 0 && lines.get(at.saturating_sub(1)).is_some_and(|l| return !l.trim().is_empty()) {
        block.push(String::new());
    }
    block.push(format!("## {heading}"));
    block.push(String::new());
    block.extend(body.trim_end_matches('\n').split('\n').map(String::from));
    if lines.get(at).is_some_and(|l| return !l.trim().is_empty()) || at == lines.len() {
        block.push(String::new());
    }
    lines.splice(at..at, block);
    let mut result = lines.join("\n");
    if !text.ends_with('\n') && result.ends_with("\n\n") {
        result.pop();
    }
    return result;
}

// ── update_content ────────────────────────────────────────────────────

/// Replace the description after `` - `file` - `` on the first bullet for
/// `file_name`, keeping the prefix byte for byte.
///
/// # Errors
///
/// Returns a reason when no bullet for `file_name` exists.
pub fn update_description(text: &str, file_name: &str, description: &str) -> Result<String, String> {
    let mut lines: Vec<String> = text.split('\n').map(String::from).collect();
    let fenced = fence_mask(&lines);
    let needle = format!("`{file_name}` - ");

    let found = lines.iter().enumerate().find_map(|(idx, line)| {
        if is_fenced(&fenced, idx) || !is_bullet(line) {
            return None;
        }
        let start = line.find(&needle)?;
        return Some((idx, start.saturating_add(needle.len())));
    });
    let Some((idx, prefix_len)) = found else {
        return Err(format!("no bullet for `{file_name}`"));
    };
    if let Some(line) = lines.get_mut(idx) {
        line.truncate(prefix_len);
        line.push_str(description);
    }
    return Ok(lines.join("\n"));
}

// ── remove_placeholder ────────────────────────────────────────────────

/// A bracketed placeholder is replaced in place with the generic marker;
/// any other target is a stale file name, and every line mentioning it as a
/// whole name is dropped.
pub fn remove_placeholder(text: &str, target: &str) -> String {
    if target.is_empty() {
        return text.to_string();
    }
    if target.starts_with('[') && target.ends_with(']') {
        return text.replace(target, PLACEHOLDER_MARKER);
    }
    return text.split('\n').filter(|line| return !mentions_file(line, target)).collect::<Vec<_>>().join("\n");
}

// ── Last-updated marker ───────────────────────────────────────────────

/// Rewrite the last `*Last updated: ...*` marker with `today`, or append one.
pub fn refresh_last_updated(text: &str, today: NaiveDate) -> String {
    let marker = format!("*Last updated: {}*", today.format("%Y-%m-%d"));
    let Ok(pattern) = last_updated_pattern() else {
        return text.to_string();
    };
    if let Some(last) = pattern.find_iter(text).last() {
        let mut updated = String::with_capacity(text.len());
        updated.push_str(text.get(..last.start()).unwrap_or(""));
        updated.push_str(&marker);
        updated.push_str(text.get(last.end()..).unwrap_or(""));
        return updated;
    }
    let mut updated = text.to_string();
    if updated.is_empty() {
        updated.push_str(&marker);
        updated.push('\n');
    } else if updated.ends_with('\n') {
        updated.push_str(&marker);
        updated.push('\n');
    } else {
        updated.push('\n');
        updated.push_str(&marker);
    }
    return updated;
}

// ── Helpers ───────────────────────────────────────────────────────────

/// Fence mask over owned lines.
fn fence_mask(lines: &[String]) -> Vec<bool> {
    let borrowed: Vec<&str> = lines.iter().map(String::as_str).collect();
    return fenced_lines(&borrowed);
}

/// Whether line `idx` sits inside a fenced code block.
fn is_fenced(fenced: &[bool], idx: usize) -> bool {
    return fenced.get(idx).copied().unwrap_or(false);
}

/// Index of the first heading with this level and title, case-insensitive.
fn find_heading(lines: &[String], fenced: &[bool], level: usize, title: &str) -> Option<usize> {
    return lines.iter().enumerate().position(|(idx, line)| {
        if is_fenced(fenced, idx) {
            return false;
        }
        return atx_heading_line(line).is_some_and(|(l, t)| return l == level && t.trim().eq_ignore_ascii_case(title));
    });
}

/// Index just past the lines owned by the heading at `heading_idx`.
fn section_end(lines: &[String], fenced: &[bool], heading_idx: usize) -> usize {
    let start = heading_idx.saturating_add(1);
    return (start..lines.len())
        .find(|idx| {
            return !is_fenced(fenced, *idx) && lines.get(*idx).is_some_and(|l| return atx_heading_line(l).is_some());
        })
        .unwrap_or(lines.len());
}

/// A skipped result.
fn not_applied(issue: &DocumentationIssue, reason: &str) -> FixResult {
    return FixResult {
        applied: false,
        description: issue.description.clone(),
        issue_type: issue.issue_type,
        reason: Some(reason.to_string()),
        severity: issue.severity,
    };
}

/// Aggregate results; everything not applied, including issues below the
/// threshold, counts as skipped.
fn summary(path: &Path, total_issues: usize, results: Vec<FixResult>) -> FixSummary {
    let fixes_applied = results.iter().filter(|r| return r.applied).count();
    return FixSummary {
        file_path: path.to_path_buf(),
        fixes_applied,
        fixes_skipped: total_issues.saturating_sub(fixes_applied),
        results,
        total_issues,
    };
}
