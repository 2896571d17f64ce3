//! Batch reports: one summary per run, rendered as markdown or JSON.
//!
//! Reports go to stdout. They aggregate per-document results that the
//! analyzer, fix engine and validator already produced; nothing here
//! touches the filesystem.

use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::error::Error;
use crate::types::{DocumentationAnalysis, FixSummary, Health, Severity, ValidationSeverity};
use crate::validate::DocumentValidation;

/// Exit code when nothing needs attention.
pub const EXIT_CLEAN: u8 = 0;

/// Exit code when issues or warnings were found.
pub const EXIT_ISSUES: u8 = 1;

/// Exit code for poor health or error-level findings.
pub const EXIT_SEVERE: u8 = 2;

// ── Analysis and fix runs ─────────────────────────────────────────────

/// Issue counts per severity.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SeverityCounts {
    /// High-severity issues.
    pub high: usize,
    /// Low-severity issues.
    pub low: usize,
    /// Medium-severity issues.
    pub medium: usize,
}

impl SeverityCounts {
    /// Count one issue.
    fn add(&mut self, severity: Severity) {
        let slot = match severity {
            Severity::High => &mut self.high,
            Severity::Low => &mut self.low,
            Severity::Medium => &mut self.medium,
        };
        *slot = slot.saturating_add(1);
    }

    /// Sum over all severities.
    pub const fn total(&self) -> usize {
        return self.high.saturating_add(self.medium).saturating_add(self.low);
    }
}

/// One row of the per-file breakdown.
#[derive(Debug, Clone, Serialize)]
pub struct FileEntry {
    /// Path relative to the project root.
    pub file_path: PathBuf,
    /// Fixes applied to this file, when a fix run happened.
    pub fixes_applied: Option<usize>,
    /// Fixes skipped for this file, when a fix run happened.
    pub fixes_skipped: Option<usize>,
    /// Health at analysis time.
    pub health: Health,
    /// Issue counts per severity.
    pub issues: SeverityCounts,
}

/// Aggregate of an `analyze` or `fix` run.
#[derive(Debug, Clone, Serialize)]
pub struct BatchReport {
    /// Per-file breakdown, in discovery order.
    pub files: Vec<FileEntry>,
    /// Knowledge files analyzed.
    pub files_analyzed: usize,
    /// Whether this report covers a fix run.
    pub fix_run: bool,
    /// Fixes applied across all files.
    pub fixes_applied: usize,
    /// Fixes skipped across all files.
    pub fixes_skipped: usize,
    /// Issue counts across all files.
    pub issues: SeverityCounts,
}

impl BatchReport {
    /// Aggregate analyses, optionally paired with the fix summaries from the
    /// same run. Summaries are matched to analyses by file path.
    pub fn new(root: &Path, analyses: &[DocumentationAnalysis], fixes: Option<&[FixSummary]>) -> Self {
        let mut report = Self {
            files: Vec::with_capacity(analyses.len()),
            files_analyzed: analyses.len(),
            fix_run: fixes.is_some(),
            fixes_applied: 0,
            fixes_skipped: 0,
            issues: SeverityCounts::default(),
        };

        for analysis in analyses {
            let mut counts = SeverityCounts::default();
            for issue in &analysis.issues {
                counts.add(issue.severity);
                report.issues.add(issue.severity);
            }

            let summary = fixes.and_then(|all| return all.iter().find(|s| return s.file_path == analysis.file_path));
            if let Some(summary) = summary {
                report.fixes_applied = report.fixes_applied.saturating_add(summary.fixes_applied);
                report.fixes_skipped = report.fixes_skipped.saturating_add(summary.fixes_skipped);
            }

            report.files.push(FileEntry {
                file_path: relative_to(root, &analysis.file_path),
                fixes_applied: summary.map(|s| return s.fixes_applied),
                fixes_skipped: summary.map(|s| return s.fixes_skipped),
                health: analysis.overall_health,
                issues: counts,
            });
        }
        return report;
    }

    /// 0 when every file is healthy, 2 if any is poor, 1 otherwise.
    pub fn exit_code(&self) -> u8 {
        if self.files.iter().any(|f| return f.health == Health::Poor) {
            return EXIT_SEVERE;
        }
        if self.issues.total() > 0 {
            return EXIT_ISSUES;
        }
        return EXIT_CLEAN;
    }

    /// Serialize as pretty JSON.
    ///
    /// # Errors
    ///
    /// Returns `Error::Json` if serialization fails.
    pub fn to_json(&self) -> Result<String, Error> {
        return Ok(serde_json::to_string_pretty(self)?);
    }

    /// Render as a markdown summary with a per-file table.
    pub fn to_markdown(&self) -> String {
        let mut out = String::from("# Knowledge File Report\n\n");
        let _ = writeln!(out, "- Files analyzed: {}", self.files_analyzed);
        let _ = writeln!(
            out,
            "- Issues: {} ({} high, {} medium, {} low)",
            self.issues.total(),
            self.issues.high,
            self.issues.medium,
            self.issues.low
        );
        if self.fix_run {
            let _ = writeln!(out, "- Fixes applied: {}", self.fixes_applied);
            let _ = writeln!(out, "- Fixes skipped: {}", self.fixes_skipped);
        }

        if self.files.is_empty() {
            out.push_str("\nNo knowledge files found.\n");
            return out;
        }

        out.push_str("\n| File | Health | High | Medium | Low |");
        if self.fix_run {
            out.push_str(" Applied | Skipped |");
        }
        out.push_str("\n|------|--------|------|--------|-----|");
        if self.fix_run {
            out.push_str("---------|---------|");
        }
        out.push('\n');

        for file in &self.files {
            let _ = write!(
                out,
                "| {} | {} | {} | {} | {} |",
                file.file_path.display(),
                file.health.as_str(),
                file.issues.high,
                file.issues.medium,
                file.issues.low
            );
            if self.fix_run {
                let _ = write!(
                    out,
                    " {} | {} |",
                    file.fixes_applied.unwrap_or(0),
                    file.fixes_skipped.unwrap_or(0)
                );
            }
            out.push('\n');
        }
        return out;
    }
}

/// Issue-by-issue listing for one analysis, used by `analyze` in text mode.
pub fn analysis_details(root: &Path, analysis: &DocumentationAnalysis) -> String {
    let mut out = format!(
        "## {} ({})\n",
        relative_to(root, &analysis.file_path).display(),
        analysis.overall_health.as_str()
    );
    if analysis.issues.is_empty() {
        out.push_str("\nNo issues.\n");
        return out;
    }
    out.push('\n');
    for issue in &analysis.issues {
        let _ = write!(out, "- [{}] {}: {}", issue.severity.as_str(), issue.issue_type.as_str(), issue.description);
        if let Some(location) = &issue.location {
            let _ = write!(out, " ({location})");
        }
        out.push('\n');
    }
    return out;
}

// ── Validation runs ───────────────────────────────────────────────────

/// Aggregate of a `validate` run.
#[derive(Debug, Clone, Serialize)]
pub struct ValidationReport {
    /// Documents checked.
    pub documents: usize,
    /// Error-level findings.
    pub errors: usize,
    /// Per-document results, in discovery order.
    pub files: Vec<DocumentValidation>,
    /// References checked across all documents.
    pub references_checked: usize,
    /// Warning-level findings.
    pub warnings: usize,
}

impl ValidationReport {
    /// Aggregate per-document results. Paths are made relative to `root`.
    pub fn new(root: &Path, results: Vec<DocumentValidation>) -> Self {
        let files: Vec<DocumentValidation> = results
            .into_iter()
            .map(|mut r| {
                r.file_path = relative_to(root, &r.file_path);
                return r;
            })
            .collect();
        let sum = |severity: ValidationSeverity| -> usize {
            return files.iter().map(|f| return f.count(severity)).sum();
        };
        return Self {
            documents: files.len(),
            errors: sum(ValidationSeverity::Error),
            references_checked: files.iter().map(|f| return f.references_checked).sum(),
            warnings: sum(ValidationSeverity::Warning),
            files,
        };
    }

    /// 2 for any error, 1 for any warning, else 0.
    pub const fn exit_code(&self) -> u8 {
        if self.errors > 0 {
            return EXIT_SEVERE;
        }
        if self.warnings > 0 {
            return EXIT_ISSUES;
        }
        return EXIT_CLEAN;
    }

    /// Serialize as pretty JSON.
    ///
    /// # Errors
    ///
    /// Returns `Error::Json` if serialization fails.
    pub fn to_json(&self) -> Result<String, Error> {
        return Ok(serde_json::to_string_pretty(self)?);
    }

    /// Render findings grouped by document, then totals.
    pub fn to_markdown(&self) -> String {
        let mut out = String::from("# Reference Validation\n");
        for file in self.files.iter().filter(|f| return !f.issues.is_empty()) {
            let _ = write!(out, "\n## {}\n\n", file.file_path.display());
            for issue in &file.issues {
                let line = issue.line.map(|l| return format!(":{l}")).unwrap_or_default();
                let _ = writeln!(
                    out,
                    "- {}{line} [{}] {}: {}",
                    file.file_path.display(),
                    issue.severity.as_str(),
                    issue.kind.as_str(),
                    issue.message
                );
                if let Some(suggestion) = &issue.suggestion {
                    let _ = writeln!(out, "  {suggestion}");
                }
            }
        }
        let _ = write!(
            out,
            "\n{} documents, {} references: {} errors, {} warnings\n",
            self.documents, self.references_checked, self.errors, self.warnings
        );
        return out;
    }
}

/// `path` relative to `root`, or unchanged if it lies outside.
fn relative_to(root: &Path, path: &Path) -> PathBuf {
    return path.strip_prefix(root).map_or_else(|_| return path.to_path_buf(), Path::to_path_buf);
}
