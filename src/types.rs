/// Core domain types for knowdoc references, issues, and fixes.
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use serde::Serialize;

// ── References ────────────────────────────────────────────────────────

/// What a reference claims to point at, classified at extraction time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReferenceKind {
    /// `target#fragment` or `#fragment`.
    Anchor,
    /// A path written with a trailing slash or without an extension.
    Directory,
    /// A path with an extension.
    File,
    /// `ftp://` URL.
    Ftp,
    /// `http://` URL.
    Http,
    /// `https://` URL.
    Https,
    /// Relative markdown link target without a fragment.
    Internal,
    /// `mailto:` address.
    Mailto,
    /// Anything the extractor could not classify.
    Unknown,
}

impl ReferenceKind {
    /// Stable lowercase label used in reports.
    pub const fn as_str(self) -> &'static str {
        return match self {
            Self::Anchor => "anchor",
            Self::Directory => "directory",
            Self::File => "file",
            Self::Ftp => "ftp",
            Self::Http => "http",
            Self::Https => "https",
            Self::Internal => "internal",
            Self::Mailto => "mailto",
            Self::Unknown => "unknown",
        };
    }
}

/// Where a reference was found. Always points into the original source
/// text, never into a copy that fixes have already mutated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Origin {
    /// One-based character column of the reference, when known.
    pub column: Option<usize>,
    /// Markdown file containing the reference.
    pub file: PathBuf,
    /// One-based line number in the markdown file.
    pub line: usize,
    /// The trimmed source line, for diagnostics.
    pub surrounding_text: String,
}

/// Result slot filled in by an oracle. Starts empty on extraction.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Resolution {
    /// Failure detail (network error, missing heading, ...).
    pub error_message: Option<String>,
    /// Whether the target was found.
    pub exists: bool,
    /// Absolute path the reference resolved to, for filesystem targets.
    pub resolved_path: Option<PathBuf>,
    /// HTTP status code, for web targets.
    pub status_code: Option<u16>,
}

/// A file or directory path mentioned in prose or inline code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileReference {
    /// `File` or `Directory`.
    pub kind: ReferenceKind,
    /// Where the path was written.
    pub origin: Origin,
    /// The path exactly as written.
    pub path: String,
    /// Filled in by the filesystem oracle.
    pub resolution: Option<Resolution>,
}

/// A markdown link, autolink, or bare URL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LinkReference {
    /// Scheme-based classification.
    pub kind: ReferenceKind,
    /// Where the link was written.
    pub origin: Origin,
    /// Filled in by the link oracle.
    pub resolution: Option<Resolution>,
    /// The link target exactly as written (title stripped).
    pub url: String,
}

impl LinkReference {
    /// Split the target into `(file_part, anchor_part)`.
    /// An empty file part means a same-document anchor.
    pub fn split_anchor(&self) -> Option<(&str, &str)> {
        return self.url.split_once('#');
    }
}

/// Anything the extractor pulled out of a markdown document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Reference {
    /// A filesystem path claim.
    File(FileReference),
    /// A link claim.
    Link(LinkReference),
}

impl Reference {
    /// The reference's classification.
    pub const fn kind(&self) -> ReferenceKind {
        return match self {
            Self::File(f) => f.kind,
            Self::Link(l) => l.kind,
        };
    }

    /// Where the reference was written.
    pub const fn origin(&self) -> &Origin {
        return match self {
            Self::File(f) => &f.origin,
            Self::Link(l) => &l.origin,
        };
    }

    /// The path or URL as written.
    pub fn target(&self) -> &str {
        return match self {
            Self::File(f) => &f.path,
            Self::Link(l) => &l.url,
        };
    }
}

/// The ASCII/box-drawing tree found in a fenced block, with the directory
/// it is believed to describe. Consumed once by structure validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectoryStructureClaim {
    /// Directory containing the document that holds the claim.
    pub document_dir: PathBuf,
    /// Every line between the fences, verbatim.
    pub lines: Vec<String>,
    /// Where the opening fence was written.
    pub origin: Origin,
    /// Inferred directory the tree is rooted at.
    pub root: PathBuf,
}

// ── Reference validation ──────────────────────────────────────────────

/// How bad a reference-validation finding is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ValidationSeverity {
    /// Permanent breakage: missing file, 4xx link, missing anchor.
    Error,
    /// Possibly transient or cosmetic.
    Warning,
}

impl ValidationSeverity {
    /// Stable lowercase label used in reports.
    pub const fn as_str(self) -> &'static str {
        return match self {
            Self::Error => "error",
            Self::Warning => "warning",
        };
    }
}

/// What went wrong with one reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ValidationKind {
    /// Web link returned a non-success status or could not be reached.
    BrokenLink,
    /// `mailto:` target is not address-shaped.
    InvalidEmail,
    /// The reference or document could not be read at all.
    InvalidPath,
    /// The anchor does not match any heading in the target document.
    MissingAnchor,
    /// Referenced path does not exist.
    MissingFile,
    /// A file was claimed but a directory exists, or vice versa.
    TypeMismatch,
}

impl ValidationKind {
    /// Stable snake_case label used in reports.
    pub const fn as_str(self) -> &'static str {
        return match self {
            Self::BrokenLink => "broken_link",
            Self::InvalidEmail => "invalid_email",
            Self::InvalidPath => "invalid_path",
            Self::MissingAnchor => "missing_anchor",
            Self::MissingFile => "missing_file",
            Self::TypeMismatch => "type_mismatch",
        };
    }
}

/// A single reference-validation finding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationIssue {
    /// Finding category.
    pub kind: ValidationKind,
    /// One-based line in the document, when the finding has one.
    pub line: Option<usize>,
    /// Human-readable explanation.
    pub message: String,
    /// Severity of the finding.
    pub severity: ValidationSeverity,
    /// A concrete alternative, when one was found.
    pub suggestion: Option<String>,
    /// The path or URL that failed.
    pub target: String,
}

// ── Documentation issues ──────────────────────────────────────────────

/// Category of a knowledge-file discrepancy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueType {
    /// Directory tree claim disagrees with the filesystem.
    InconsistentStructure,
    /// The knowledge file itself could not be read.
    InvalidPath,
    /// A file is undocumented, or a deleted file is still documented.
    MissingFiles,
    /// A mandated section heading is absent.
    MissingSections,
    /// A file description is a known generic phrase.
    OutdatedDescriptions,
    /// Template placeholder text was never filled in.
    PlaceholderContent,
}

impl IssueType {
    /// Stable snake_case label used in reports.
    pub const fn as_str(self) -> &'static str {
        return match self {
            Self::InconsistentStructure => "inconsistent_structure",
            Self::InvalidPath => "invalid_path",
            Self::MissingFiles => "missing_files",
            Self::MissingSections => "missing_sections",
            Self::OutdatedDescriptions => "outdated_descriptions",
            Self::PlaceholderContent => "placeholder_content",
        };
    }
}

/// Issue severity. Ordering is `Low < Medium < High`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, serde::Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    /// Cosmetic.
    Low,
    /// Should be fixed.
    Medium,
    /// Document is unusable or unreadable.
    High,
}

impl Severity {
    /// Stable lowercase label used in reports.
    pub const fn as_str(self) -> &'static str {
        return match self {
            Self::High => "high",
            Self::Low => "low",
            Self::Medium => "medium",
        };
    }
}

/// The kind of textual transform the fix engine should perform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FixAction {
    /// Insert a file bullet under `### Files`.
    AddFiles,
    /// Insert a synthesized section at its canonical position.
    AddSection,
    /// Replace a bracketed placeholder, or drop lines naming a stale file.
    RemovePlaceholder,
    /// Rewrite the description part of a file bullet.
    UpdateContent,
}

/// A proposed remedy attached to an issue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SuggestedFix {
    /// Transform to apply.
    pub action: FixAction,
    /// Text to insert or substitute.
    pub content: Option<String>,
    /// Structural key the transform anchors on (file name, heading, placeholder).
    pub target: Option<String>,
}

/// One discrepancy between a knowledge file and reality.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DocumentationIssue {
    /// Human-readable explanation.
    pub description: String,
    /// Category of the discrepancy.
    pub issue_type: IssueType,
    /// Where in the document, when meaningful.
    pub location: Option<String>,
    /// Severity of the discrepancy.
    pub severity: Severity,
    /// Remedy, absent only for issues no text edit can fix.
    pub suggested_fix: Option<SuggestedFix>,
}

/// Coarse health of a knowledge file, derived from its issues.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Health {
    /// No medium or high issues, at most two issues.
    Good,
    /// Some medium issues, or several low ones.
    NeedsAttention,
    /// Any high issue, or more than three medium ones.
    Poor,
}

impl Health {
    /// Stable snake_case label used in reports.
    pub const fn as_str(self) -> &'static str {
        return match self {
            Self::Good => "good",
            Self::NeedsAttention => "needs_attention",
            Self::Poor => "poor",
        };
    }
}

/// Files that changed since a given date, relative to the project root.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DirectoryChanges {
    /// Files removed in the window.
    pub deleted_files: Vec<PathBuf>,
    /// Date of the most recent commit in the window, if git was consulted.
    pub last_commit_date: Option<NaiveDate>,
    /// Files edited in the window.
    pub modified_files: Vec<PathBuf>,
    /// Files created in the window.
    pub new_files: Vec<PathBuf>,
}

impl DirectoryChanges {
    /// Keep only changes whose parent directory is exactly `dir`.
    pub fn within(&self, dir: &Path) -> Self {
        let keep = |paths: &[PathBuf]| -> Vec<PathBuf> {
            return paths
                .iter()
                .filter(|p| return p.parent().unwrap_or_else(|| return Path::new("")) == dir)
                .cloned()
                .collect();
        };
        return Self {
            deleted_files: keep(&self.deleted_files),
            last_commit_date: self.last_commit_date,
            modified_files: keep(&self.modified_files),
            new_files: keep(&self.new_files),
        };
    }
}

/// Everything the analyzer concluded about one knowledge file.
/// Never mutated after creation; a new run supersedes it.
#[derive(Debug, Clone, Serialize)]
pub struct DocumentationAnalysis {
    /// Changes in the document's own directory since `last_updated`.
    pub directory_changes: DirectoryChanges,
    /// The knowledge file analyzed.
    pub file_path: PathBuf,
    /// Number of significant files in the directory.
    pub files_analyzed: usize,
    /// Issues in discovery order.
    pub issues: Vec<DocumentationIssue>,
    /// Date the document was last known to be updated.
    pub last_updated: NaiveDate,
    /// Health derived from `issues`.
    pub overall_health: Health,
}

// ── Sections ──────────────────────────────────────────────────────────

/// A heading and the lines it owns, up to the next heading of any level.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ContentSection {
    /// Body lines after the heading, joined with `\n`.
    pub content: String,
    /// One-based last line owned by this section.
    pub end_line: usize,
    /// Heading text without the `#` markers.
    pub heading: String,
    /// ATX level, 1 through 6.
    pub level: usize,
    /// One-based line of the heading itself.
    pub start_line: usize,
}

// ── Fixes ─────────────────────────────────────────────────────────────

/// Outcome of attempting one fix.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FixResult {
    /// Whether the document text changed.
    pub applied: bool,
    /// The issue's description.
    pub description: String,
    /// The issue's category.
    pub issue_type: IssueType,
    /// Why the fix was not applied.
    pub reason: Option<String>,
    /// The issue's severity.
    pub severity: Severity,
}

/// Per-file aggregate of one fix run, used for reporting only.
#[derive(Debug, Clone, Serialize)]
pub struct FixSummary {
    /// The knowledge file.
    pub file_path: PathBuf,
    /// Fixes that changed the text (or would have, in a dry run).
    pub fixes_applied: usize,
    /// Issues not fixed, including those below the severity threshold.
    pub fixes_skipped: usize,
    /// One entry per attempted fix, in application order.
    pub results: Vec<FixResult>,
    /// Every issue in the analysis.
    pub total_issues: usize,
}
