//! Issue analyzer: compares one knowledge file with its directory and the
//! project's change history, and classifies every discrepancy.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local, NaiveDate, TimeDelta};
use regex::Regex;
use tracing::{debug, warn};

use crate::changes::ChangeSource;
use crate::describe::DescriptionGenerator;
use crate::error::Error;
use crate::knowledge::{is_documentable, mentions_file};
use crate::sections::parse_sections;
use crate::types::{
    DirectoryChanges, DocumentationAnalysis, DocumentationIssue, FixAction, Health, IssueType, Severity,
    SuggestedFix,
};

/// Bracketed instructions left behind by the knowledge-file template.
pub const PLACEHOLDERS: [&str; 7] = [
    "[brief description of the directory's purpose]",
    "[List files and their purposes]",
    "[List subdirectories and their purposes]",
    "[Explain the role of this directory in the project]",
    "[Describe key components, classes, or functions]",
    "[List dependencies and relationships]",
    "[Additional notes, conventions, or warnings]",
];

/// Descriptions that say nothing about the file they describe.
pub const GENERIC_PHRASES: [&str; 3] = ["Description to be added", "Purpose unknown", "Content to be documented"];

/// Level-2 sections every knowledge file must have.
pub const REQUIRED_SECTIONS: [&str; 3] = ["Overview", "Contents", "Purpose"];

/// Text the fix engine substitutes for a removed placeholder.
pub const PLACEHOLDER_MARKER: &str = "Content to be documented";

/// Days assumed since the last update when the document carries no date.
const DEFAULT_LOOKBACK_DAYS: i64 = 30;

/// Analyzes knowledge files under one project root.
pub struct Analyzer {
    /// Backtick-quoted token on a line.
    backtick: Regex,
    /// Where "what changed since" comes from.
    changes: Box<dyn ChangeSource>,
    /// Where replacement descriptions come from.
    describer: Box<dyn DescriptionGenerator>,
    /// `*Last updated: YYYY-MM-DD*`.
    last_updated: Regex,
    /// Root every relative path is measured from.
    project_root: PathBuf,
    /// "Now", fixed at construction so a run is consistent.
    today: NaiveDate,
}

impl Analyzer {
    /// Build an analyzer for `project_root`.
    ///
    /// # Errors
    ///
    /// Returns `Error::Regex` if a built-in pattern fails to compile.
    pub fn new(
        changes: Box<dyn ChangeSource>,
        describer: Box<dyn DescriptionGenerator>,
        project_root: &Path,
    ) -> Result<Self, Error> {
        return Ok(Self {
            backtick: Regex::new(r"`([^`\s]+)`")?,
            changes,
            describer,
            last_updated: last_updated_pattern()?,
            project_root: project_root.to_path_buf(),
            today: Local::now().date_naive(),
        });
    }

    /// Pin "today", for deterministic runs.
    #[must_use]
    pub fn with_today(mut self, today: NaiveDate) -> Self {
        self.today = today;
        return self;
    }

    /// Analyze one knowledge file. Never fails: an unreadable document is
    /// itself reported as a high-severity issue.
    pub fn analyze(&self, knowledge_file: &Path) -> DocumentationAnalysis {
        let content = match std::fs::read_to_string(knowledge_file) {
            Ok(content) => content,
            Err(e) => {
                warn!(file = %knowledge_file.display(), error = %e, "knowledge file unreadable");
                return self.unreadable(knowledge_file, &e);
            },
        };

        let last_updated = self.last_updated(knowledge_file, &content);
        let dir = knowledge_file.parent().unwrap_or(self.project_root.as_path());
        let dir_relative = dir.strip_prefix(&self.project_root).unwrap_or(dir);
        let changes = match self.changes.changes_since(&self.project_root, last_updated) {
            Ok(all) => all.within(dir_relative),
            Err(e) => {
                warn!(file = %knowledge_file.display(), error = %e, "no change history, assuming none");
                DirectoryChanges::default()
            },
        };

        let files = documentable_files(dir, knowledge_file);
        let mut issues = Vec::new();
        issues.extend(placeholder_issues(&content));
        issues.extend(self.missing_file_issues(&content, &files, &changes, dir_relative));
        issues.extend(self.outdated_description_issues(&content, dir));
        issues.extend(missing_section_issues(&content));
        issues.extend(section_order_issues(&content));
        issues.extend(deleted_reference_issues(&content, &changes));

        let overall_health = classify_health(&issues);
        debug!(
            file = %knowledge_file.display(),
            issues = issues.len(),
            health = overall_health.as_str(),
            "analyzed"
        );
        return DocumentationAnalysis {
            directory_changes: changes,
            file_path: knowledge_file.to_path_buf(),
            files_analyzed: files.len(),
            issues,
            last_updated,
            overall_health,
        };
    }

    /// Marker date, else file modification date, else a fixed lookback.
    fn last_updated(&self, knowledge_file: &Path, content: &str) -> NaiveDate {
        if let Some(date) = parse_last_updated(&self.last_updated, content) {
            return date;
        }
        if let Ok(modified) = std::fs::metadata(knowledge_file).and_then(|m| return m.modified()) {
            return DateTime::<Local>::from(modified).date_naive();
        }
        return self.default_since();
    }

    /// Significant files the document never mentions.
    fn missing_file_issues(
        &self,
        content: &str,
        files: &[PathBuf],
        changes: &DirectoryChanges,
        dir_relative: &Path,
    ) -> Vec<DocumentationIssue> {
        let new_files: HashSet<&PathBuf> = changes.new_files.iter().collect();
        let mut issues = Vec::new();
        for path in files {
            let Some(name) = path.file_name().and_then(|n| return n.to_str()) else { continue };
            if mentions_file(content, name) {
                continue;
            }
            let is_new = new_files.contains(&dir_relative.join(name));
            let source = std::fs::read_to_string(path).unwrap_or_default();
            let description = self.describer.describe(path, &source);
            issues.push(DocumentationIssue {
                description: format!("File `{name}` is not documented"),
                issue_type: IssueType::MissingFiles,
                location: None,
                severity: if is_new { Severity::Medium } else { Severity::Low },
                suggested_fix: Some(SuggestedFix {
                    action: FixAction::AddFiles,
                    content: Some(format!("- `{name}` - {description}")),
                    target: Some(name.to_string()),
                }),
            });
        }
        return issues;
    }

    /// Generic descriptions next to a backtick-quoted file name. Lines with
    /// a generic phrase but no file name are left alone.
    fn outdated_description_issues(&self, content: &str, dir: &Path) -> Vec<DocumentationIssue> {
        let mut issues = Vec::new();
        for (idx, line) in content.lines().enumerate() {
            let Some(phrase) = GENERIC_PHRASES.iter().find(|p| return line.contains(**p)) else {
                continue;
            };
            let Some(file_name) = self
                .backtick
                .captures_iter(line)
                .filter_map(|c| return c.get(1))
                .map(|m| return m.as_str())
                .find(|token| return token.contains('.'))
            else {
                continue;
            };
            let path = dir.join(file_name);
            let source = std::fs::read_to_string(&path).unwrap_or_default();
            let description = self.describer.describe(&path, &source);
            issues.push(DocumentationIssue {
                description: format!("Description of `{file_name}` is generic (\"{phrase}\")"),
                issue_type: IssueType::OutdatedDescriptions,
                location: Some(format!("line {}", idx.saturating_add(1))),
                severity: Severity::Low,
                suggested_fix: Some(SuggestedFix {
                    action: FixAction::UpdateContent,
                    content: Some(description),
                    target: Some(file_name.to_string()),
                }),
            });
        }
        return issues;
    }

    /// Start of the change window when nothing better is known.
    fn default_since(&self) -> NaiveDate {
        return self
            .today
            .checked_sub_signed(TimeDelta::days(DEFAULT_LOOKBACK_DAYS))
            .unwrap_or(self.today);
    }

    /// Analysis for a document that could not be read.
    fn unreadable(&self, knowledge_file: &Path, error: &std::io::Error) -> DocumentationAnalysis {
        let issues = vec![DocumentationIssue {
            description: format!("Cannot read knowledge file: {error}"),
            issue_type: IssueType::InvalidPath,
            location: Some(knowledge_file.display().to_string()),
            severity: Severity::High,
            suggested_fix: None,
        }];
        return DocumentationAnalysis {
            directory_changes: DirectoryChanges::default(),
            file_path: knowledge_file.to_path_buf(),
            files_analyzed: 0,
            overall_health: classify_health(&issues),
            issues,
            last_updated: self.default_since(),
        };
    }
}

/// Derive health from issue severities: any high or more than three medium
/// is poor; any medium or more than two issues needs attention.
pub fn classify_health(issues: &[DocumentationIssue]) -> Health {
    let high = issues.iter().filter(|i| return i.severity == Severity::High).count();
    let medium = issues.iter().filter(|i| return i.severity == Severity::Medium).count();
    if high > 0 || medium > 3 {
        return Health::Poor;
    }
    if medium > 0 || issues.len() > 2 {
        return Health::NeedsAttention;
    }
    return Health::Good;
}

/// The trailing timestamp marker pattern.
///
/// # Errors
///
/// Returns `Error::Regex` if the pattern fails to compile.
pub fn last_updated_pattern() -> Result<Regex, Error> {
    return Ok(Regex::new(r"\*Last updated: (\d{4}-\d{2}-\d{2})\*")?);
}

/// Date from the last `*Last updated: YYYY-MM-DD*` marker, if valid.
pub fn parse_last_updated(pattern: &Regex, content: &str) -> Option<NaiveDate> {
    let captures = pattern.captures_iter(content).last()?;
    let date = captures.get(1)?.as_str();
    return NaiveDate::parse_from_str(date, "%Y-%m-%d").ok();
}

/// One issue per distinct template placeholder still present.
fn placeholder_issues(content: &str) -> Vec<DocumentationIssue> {
    return PLACEHOLDERS
        .iter()
        .filter_map(|placeholder| {
            let byte = content.find(placeholder)?;
            let line = content.get(..byte)?.matches('\n').count().saturating_add(1);
            return Some(DocumentationIssue {
                description: format!("Template placeholder still present: {placeholder}"),
                issue_type: IssueType::PlaceholderContent,
                location: Some(format!("line {line}")),
                severity: Severity::Medium,
                suggested_fix: Some(SuggestedFix {
                    action: FixAction::RemovePlaceholder,
                    content: Some(PLACEHOLDER_MARKER.to_string()),
                    target: Some((*placeholder).to_string()),
                }),
            });
        })
        .collect();
}

/// Required level-2 sections that are absent.
fn missing_section_issues(content: &str) -> Vec<DocumentationIssue> {
    let present: HashSet<String> = parse_sections(content)
        .sections
        .iter()
        .filter(|s| return s.level == 2)
        .map(|s| return s.heading.trim().to_lowercase())
        .collect();

    return REQUIRED_SECTIONS
        .iter()
        .filter(|name| return !present.contains(&name.to_lowercase()))
        .map(|name| {
            return DocumentationIssue {
                description: format!("Missing required section `## {name}`"),
                issue_type: IssueType::MissingSections,
                location: None,
                severity: Severity::Medium,
                suggested_fix: Some(SuggestedFix {
                    action: FixAction::AddSection,
                    content: Some(section_body(name).to_string()),
                    target: Some((*name).to_string()),
                }),
            };
        })
        .collect();
}

/// Required sections that appear, but not in Overview, Contents, Purpose
/// order. One low issue at the first heading out of place; there is no
/// automatic fix.
fn section_order_issues(content: &str) -> Vec<DocumentationIssue> {
    let mut expected = REQUIRED_SECTIONS.iter().map(|name| return name.to_lowercase()).peekable();
    let mut present: Vec<(String, usize)> = parse_sections(content)
        .sections
        .iter()
        .filter(|s| return s.level == 2)
        .map(|s| return (s.heading.trim().to_lowercase(), s.start_line))
        .filter(|(key, _)| return REQUIRED_SECTIONS.iter().any(|name| return name.eq_ignore_ascii_case(key)))
        .collect();
    let mut seen: HashSet<String> = HashSet::new();
    present.retain(|(key, _)| return seen.insert(key.clone()));

    for (key, line) in present {
        while expected.peek().is_some_and(|name| return *name != key) {
            expected.next();
        }
        if expected.next().is_none() {
            return vec![DocumentationIssue {
                description: format!("Section `## {key}` is out of order (expected Overview, Contents, Purpose)"),
                issue_type: IssueType::InconsistentStructure,
                location: Some(format!("line {line}")),
                severity: Severity::Low,
                suggested_fix: None,
            }];
        }
    }
    return Vec::new();
}

/// Starter body for a synthesized section.
fn section_body(name: &str) -> &'static str {
    return match name {
        "Contents" => "### Files\n\n### Subdirectories\n",
        _ => PLACEHOLDER_MARKER,
    };
}

/// Files deleted since the last update whose names the document still uses
/// as whole tokens.
fn deleted_reference_issues(content: &str, changes: &DirectoryChanges) -> Vec<DocumentationIssue> {
    let mut seen: HashSet<&str> = HashSet::new();
    let mut issues = Vec::new();
    for deleted in &changes.deleted_files {
        let Some(name) = deleted.file_name().and_then(|n| return n.to_str()) else { continue };
        if !mentions_file(content, name) || !seen.insert(name) {
            continue;
        }
        issues.push(DocumentationIssue {
            description: format!("Document still references deleted file `{name}`"),
            issue_type: IssueType::MissingFiles,
            location: None,
            severity: Severity::Medium,
            suggested_fix: Some(SuggestedFix {
                action: FixAction::RemovePlaceholder,
                content: None,
                target: Some(name.to_string()),
            }),
        });
    }
    return issues;
}

/// Files directly in `dir` that belong in its knowledge file, sorted.
fn documentable_files(dir: &Path, knowledge_file: &Path) -> Vec<PathBuf> {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return Vec::new();
    };
    let mut files: Vec<PathBuf> = entries
        .filter_map(Result::ok)
        .filter(|e| return e.file_type().is_ok_and(|t| return t.is_file()))
        .map(|e| return e.path())
        .filter(|p| return is_documentable(p, knowledge_file))
        .collect();
    files.sort();
    return files;
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Returns the same changes for every query.
    struct StaticChanges(DirectoryChanges);

    impl ChangeSource for StaticChanges {
        fn changes_since(&self, _root: &Path, _since: NaiveDate) -> Result<DirectoryChanges, Error> {
            Ok(self.0.clone())
        }
    }

    struct NoHistory;

    impl ChangeSource for NoHistory {
        fn changes_since(&self, _root: &Path, _since: NaiveDate) -> Result<DirectoryChanges, Error> {
            Err(Error::GitUnavailable { reason: "test".to_string() })
        }
    }

    struct FixedDescriber;

    impl DescriptionGenerator for FixedDescriber {
        fn describe(&self, path: &Path, _content: &str) -> String {
            format!("About {}", path.file_name().unwrap().to_string_lossy())
        }
    }

    const COMPLETE: &str = "# Src\n\n## Overview\nThe code.\n\n## Contents\n### Files\n- `app.ts` - App entry\n\n## Purpose\nRuns things.\n\n---\n*Last updated: 2026-09-01*\n";

    fn analyzer(root: &Path, changes: DirectoryChanges) -> Analyzer {
        Analyzer::new(Box::new(StaticChanges(changes)), Box::new(FixedDescriber), root)
            .unwrap()
            .with_today(NaiveDate::from_ymd_opt(2026, 10, 1).unwrap())
    }

    fn issue(severity: Severity) -> DocumentationIssue {
        DocumentationIssue {
            description: String::new(),
            issue_type: IssueType::MissingFiles,
            location: None,
            severity,
            suggested_fix: None,
        }
    }

    #[test]
    fn health_classification() {
        assert_eq!(classify_health(&[]), Health::Good);
        assert_eq!(classify_health(&[issue(Severity::High)]), Health::Poor);
        assert_eq!(classify_health(&vec![issue(Severity::Medium); 4]), Health::Poor);
        assert_eq!(classify_health(&vec![issue(Severity::Medium); 3]), Health::NeedsAttention);
        assert_eq!(classify_health(&[issue(Severity::Medium)]), Health::NeedsAttention);
        assert_eq!(classify_health(&vec![issue(Severity::Low); 2]), Health::Good);
        assert_eq!(classify_health(&vec![issue(Severity::Low); 3]), Health::NeedsAttention);
    }

    #[test]
    fn complete_document_is_good() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("app.ts"), "export {}").unwrap();
        std::fs::write(dir.path().join("README.md"), COMPLETE).unwrap();
        let analysis = analyzer(dir.path(), DirectoryChanges::default()).analyze(&dir.path().join("README.md"));
        assert!(analysis.issues.is_empty(), "{:?}", analysis.issues);
        assert_eq!(analysis.overall_health, Health::Good);
        assert_eq!(analysis.files_analyzed, 1);
        assert_eq!(analysis.last_updated, NaiveDate::from_ymd_opt(2026, 9, 1).unwrap());
    }

    #[test]
    fn placeholder_triggers_one_medium_issue() {
        let dir = tempfile::tempdir().unwrap();
        let doc = COMPLETE.replace("The code.", "[brief description of the directory's purpose]\n\n[brief description of the directory's purpose]");
        std::fs::write(dir.path().join("app.ts"), "").unwrap();
        std::fs::write(dir.path().join("README.md"), doc).unwrap();
        let analysis = analyzer(dir.path(), DirectoryChanges::default()).analyze(&dir.path().join("README.md"));
        let placeholders: Vec<&DocumentationIssue> =
            analysis.issues.iter().filter(|i| i.issue_type == IssueType::PlaceholderContent).collect();
        assert_eq!(placeholders.len(), 1);
        assert_eq!(placeholders[0].severity, Severity::Medium);
        assert_eq!(placeholders[0].location.as_deref(), Some("line 4"));
    }

    #[test]
    fn missing_files_severity_follows_git_newness() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("src")).unwrap();
        for name in ["app.ts", "fresh.ts", "old.js", "logo.png", ".eslintrc.json", "package-lock.json"] {
            std::fs::write(dir.path().join("src").join(name), "").unwrap();
        }
        let doc = dir.path().join("src/README.md");
        std::fs::write(&doc, COMPLETE).unwrap();
        let changes = DirectoryChanges { new_files: vec![PathBuf::from("src/fresh.ts")], ..DirectoryChanges::default() };
        let analysis = analyzer(dir.path(), changes).analyze(&doc);

        let missing: Vec<(String, Severity)> = analysis
            .issues
            .iter()
            .filter(|i| i.issue_type == IssueType::MissingFiles)
            .map(|i| (i.suggested_fix.as_ref().unwrap().target.clone().unwrap(), i.severity))
            .collect();
        assert_eq!(missing, vec![("fresh.ts".to_string(), Severity::Medium), ("old.js".to_string(), Severity::Low)]);
        let fix = analysis.issues[0].suggested_fix.as_ref().unwrap();
        assert_eq!(fix.action, FixAction::AddFiles);
        assert_eq!(fix.content.as_deref(), Some("- `fresh.ts` - About fresh.ts"));
        assert_eq!(analysis.files_analyzed, 3);
    }

    #[test]
    fn generic_descriptions_are_outdated() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("app.ts"), "").unwrap();
        let doc = COMPLETE.replace("App entry", "Purpose unknown") + "\nPurpose unknown without a file\n";
        std::fs::write(dir.path().join("README.md"), doc).unwrap();
        let analysis = analyzer(dir.path(), DirectoryChanges::default()).analyze(&dir.path().join("README.md"));
        let outdated: Vec<&DocumentationIssue> =
            analysis.issues.iter().filter(|i| i.issue_type == IssueType::OutdatedDescriptions).collect();
        assert_eq!(outdated.len(), 1);
        assert_eq!(outdated[0].severity, Severity::Low);
        let fix = outdated[0].suggested_fix.as_ref().unwrap();
        assert_eq!(fix.target.as_deref(), Some("app.ts"));
        assert_eq!(fix.content.as_deref(), Some("About app.ts"));
    }

    #[test]
    fn missing_sections_match_level_and_title() {
        let dir = tempfile::tempdir().unwrap();
        let doc = "# Src\n\n## overview\ntext\n\n### Purpose\nnot level two\n\n```\n## Contents\n```\n";
        std::fs::write(dir.path().join("README.md"), doc).unwrap();
        let analysis = analyzer(dir.path(), DirectoryChanges::default()).analyze(&dir.path().join("README.md"));
        let targets: Vec<String> = analysis
            .issues
            .iter()
            .filter(|i| i.issue_type == IssueType::MissingSections)
            .map(|i| i.suggested_fix.as_ref().unwrap().target.clone().unwrap())
            .collect();
        assert_eq!(targets, vec!["Contents".to_string(), "Purpose".to_string()]);
    }

    #[test]
    fn out_of_order_sections_are_inconsistent() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("app.ts"), "").unwrap();
        let doc = "# Src\n\n## Purpose\nWhy.\n\n## Overview\nThe code.\n\n## Contents\n- `app.ts` - App\n";
        std::fs::write(dir.path().join("README.md"), doc).unwrap();
        let analysis = analyzer(dir.path(), DirectoryChanges::default()).analyze(&dir.path().join("README.md"));
        assert_eq!(analysis.issues.len(), 1, "{:?}", analysis.issues);
        assert_eq!(analysis.issues[0].issue_type, IssueType::InconsistentStructure);
        assert_eq!(analysis.issues[0].severity, Severity::Low);
        assert_eq!(analysis.issues[0].location.as_deref(), Some("line 6"));
        assert!(analysis.issues[0].suggested_fix.is_none());
    }

    #[test]
    fn deleted_files_still_referenced() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("app.ts"), "").unwrap();
        let doc = COMPLETE.replace("- `app.ts` - App entry", "- `app.ts` - App entry\n- `legacy.ts` - Old code");
        std::fs::write(dir.path().join("README.md"), doc).unwrap();
        let changes = DirectoryChanges {
            deleted_files: vec![PathBuf::from("legacy.ts"), PathBuf::from("other/legacy.ts"), PathBuf::from("gone.ts")],
            ..DirectoryChanges::default()
        };
        let analysis = analyzer(dir.path(), changes).analyze(&dir.path().join("README.md"));
        assert_eq!(analysis.issues.len(), 1);
        assert_eq!(analysis.issues[0].severity, Severity::Medium);
        assert_eq!(analysis.issues[0].suggested_fix.as_ref().unwrap().action, FixAction::RemovePlaceholder);
        assert_eq!(analysis.directory_changes.deleted_files, vec![PathBuf::from("legacy.ts"), PathBuf::from("gone.ts")]);
    }

    #[test]
    fn deleted_name_inside_longer_name_is_not_referenced() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("app.ts"), "").unwrap();
        std::fs::write(dir.path().join("data.ts"), "").unwrap();
        let doc = COMPLETE.replace("- `app.ts` - App entry", "- `app.ts` - App entry\n- `data.ts` - Data");
        std::fs::write(dir.path().join("README.md"), doc).unwrap();
        let changes = DirectoryChanges { deleted_files: vec![PathBuf::from("a.ts")], ..DirectoryChanges::default() };
        let analysis = analyzer(dir.path(), changes).analyze(&dir.path().join("README.md"));
        assert!(analysis.issues.is_empty(), "{:?}", analysis.issues);
    }

    #[test]
    fn longer_name_does_not_document_a_file() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("app.ts"), "").unwrap();
        std::fs::write(dir.path().join("p.ts"), "").unwrap();
        std::fs::write(dir.path().join("README.md"), COMPLETE).unwrap();
        let analysis = analyzer(dir.path(), DirectoryChanges::default()).analyze(&dir.path().join("README.md"));
        let targets: Vec<String> =
            analysis.issues.iter().filter_map(|i| i.suggested_fix.as_ref()?.target.clone()).collect();
        assert_eq!(targets, vec!["p.ts".to_string()]);
    }

    #[test]
    fn unreadable_document_is_one_high_issue() {
        let dir = tempfile::tempdir().unwrap();
        let analysis = analyzer(dir.path(), DirectoryChanges::default()).analyze(&dir.path().join("README.md"));
        assert_eq!(analysis.issues.len(), 1);
        assert_eq!(analysis.issues[0].issue_type, IssueType::InvalidPath);
        assert_eq!(analysis.issues[0].severity, Severity::High);
        assert!(analysis.issues[0].suggested_fix.is_none());
        assert_eq!(analysis.overall_health, Health::Poor);
        assert_eq!(analysis.last_updated, NaiveDate::from_ymd_opt(2026, 9, 1).unwrap());
    }

    #[test]
    fn missing_history_is_not_fatal() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("app.ts"), "").unwrap();
        std::fs::write(dir.path().join("README.md"), COMPLETE).unwrap();
        let analyzer = Analyzer::new(Box::new(NoHistory), Box::new(FixedDescriber), dir.path()).unwrap();
        let analysis = analyzer.analyze(&dir.path().join("README.md"));
        assert_eq!(analysis.overall_health, Health::Good);
    }

    #[test]
    fn last_updated_takes_last_valid_marker() {
        let pattern = last_updated_pattern().unwrap();
        let text = "*Last updated: 2025-01-02*\nbody\n*Last updated: 2026-03-04*\n";
        assert_eq!(parse_last_updated(&pattern, text), NaiveDate::from_ymd_opt(2026, 3, 4));
        assert_eq!(parse_last_updated(&pattern, "*Last updated: 2026-13-40*"), None);
        assert_eq!(parse_last_updated(&pattern, "no marker"), None);
    }
}
