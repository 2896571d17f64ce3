//! Filesystem oracle: resolves file references and directory-tree claims
//! against the real project tree.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::knowledge::normalize_path;
use crate::types::{
    DirectoryStructureClaim, FileReference, ReferenceKind, Resolution, ValidationIssue, ValidationKind,
    ValidationSeverity,
};

/// Maximum number of similar names offered for a missing path.
const MAX_SUGGESTIONS: usize = 3;

/// Box-drawing glyphs; never part of an entry name.
const BOX_DRAWING: [char; 5] = ['│', '├', '└', '─', '┬'];

/// ASCII connectors (`|--`, `` `-- ``, `+--`). They only draw when a whole
/// whitespace-separated run is made of them, so `+page.svelte` keeps its `+`.
const ASCII_DRAWING: [char; 4] = ['|', '`', '+', '-'];

/// What the filesystem says about one claimed path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileCheck {
    /// Whether anything exists at the resolved path.
    pub exists: bool,
    /// Whether the thing that exists has the claimed kind.
    pub kind_matches: bool,
    /// Absolute or root-relative path the claim resolved to.
    pub resolved_path: PathBuf,
    /// Up to three similarly named siblings, for missing paths.
    pub suggestions: Vec<String>,
}

/// Resolve a written path relative to the directory containing `document`.
/// A leading `/` means the project root.
pub fn resolve_path(written: &str, document: &Path, project_root: &Path) -> PathBuf {
    if let Some(rooted) = written.strip_prefix('/') {
        return normalize_path(&project_root.join(rooted));
    }
    let document_dir = document.parent().unwrap_or(project_root);
    return normalize_path(&document_dir.join(written));
}

/// Check one written path against the filesystem.
pub fn check_path(written: &str, claimed: ReferenceKind, document: &Path, project_root: &Path) -> FileCheck {
    let resolved_path = resolve_path(written, document, project_root);
    let Ok(metadata) = std::fs::metadata(&resolved_path) else {
        return FileCheck {
            exists: false,
            kind_matches: false,
            suggestions: similar_siblings(&resolved_path),
            resolved_path,
        };
    };

    let kind_matches = match claimed {
        ReferenceKind::Directory => metadata.is_dir(),
        ReferenceKind::File => metadata.is_file(),
        _ => true,
    };
    return FileCheck {
        exists: true,
        kind_matches,
        resolved_path,
        suggestions: Vec::new(),
    };
}

/// Resolve a file reference, fill its resolution slot, and report the
/// discrepancy if there is one. Missing paths are errors; kind mismatches
/// are a distinct warning.
pub fn validate_reference(
    reference: &mut FileReference,
    document: &Path,
    project_root: &Path,
) -> Option<ValidationIssue> {
    let check = check_path(&reference.path, reference.kind, document, project_root);
    reference.resolution = Some(Resolution {
        error_message: None,
        exists: check.exists,
        resolved_path: Some(check.resolved_path.clone()),
        status_code: None,
    });

    if !check.exists {
        let noun = if reference.kind == ReferenceKind::Directory { "Directory" } else { "File" };
        return Some(ValidationIssue {
            kind: ValidationKind::MissingFile,
            line: Some(reference.origin.line),
            message: format!("{noun} `{}` does not exist", reference.path),
            severity: ValidationSeverity::Error,
            suggestion: suggestion_text(&check.suggestions),
            target: reference.path.clone(),
        });
    }

    if !check.kind_matches {
        let (claimed, found) = if reference.kind == ReferenceKind::Directory {
            ("directory", "file")
        } else {
            ("file", "directory")
        };
        return Some(ValidationIssue {
            kind: ValidationKind::TypeMismatch,
            line: Some(reference.origin.line),
            message: format!("`{}` is described as a {claimed} but is a {found}", reference.path),
            severity: ValidationSeverity::Warning,
            suggestion: None,
            target: reference.path.clone(),
        });
    }

    return None;
}

/// Render suggestions as a "did you mean" hint.
pub fn suggestion_text(suggestions: &[String]) -> Option<String> {
    if suggestions.is_empty() {
        return None;
    }
    return Some(format!("Did you mean: {}?", suggestions.join(", ")));
}

/// List the sibling directory and return up to three names containing the
/// missing path's base name (extension ignored), case-insensitively.
pub fn similar_siblings(missing: &Path) -> Vec<String> {
    let Some(stem) = missing.file_stem().and_then(|s| return s.to_str()) else {
        return Vec::new();
    };
    let stem = stem.to_lowercase();
    if stem.is_empty() {
        return Vec::new();
    }
    let Some(parent) = missing.parent() else {
        return Vec::new();
    };
    let Ok(entries) = std::fs::read_dir(parent) else {
        return Vec::new();
    };

    let mut names: Vec<String> = entries
        .filter_map(Result::ok)
        .filter_map(|e| return e.file_name().to_str().map(String::from))
        .filter(|name| return name.to_lowercase().contains(&stem))
        .collect();
    names.sort();
    names.truncate(MAX_SUGGESTIONS);
    return names;
}

// ── Directory-tree claims ─────────────────────────────────────────────

/// Compare a drawn directory tree against the real directory. Every claimed
/// file that does not exist is a `missing_file` warning. Real files the tree
/// leaves out are never reported: documentation need not be exhaustive.
pub fn validate_structure(claim: &DirectoryStructureClaim) -> Vec<ValidationIssue> {
    let root = if claim.root.is_dir() { claim.root.as_path() } else { claim.document_dir.as_path() };
    let actual = list_relative_files(root);
    let basenames: HashSet<&str> = actual
        .iter()
        .filter_map(|p| return p.rsplit('/').next())
        .collect();

    let mut issues = Vec::new();
    for (offset, claimed) in claimed_files(&claim.lines) {
        let name = claimed.rsplit('/').next().unwrap_or(&claimed);
        if actual.contains(&claimed) || basenames.contains(name) {
            continue;
        }
        issues.push(ValidationIssue {
            kind: ValidationKind::MissingFile,
            line: Some(claim.origin.line.saturating_add(offset).saturating_add(1)),
            message: format!("Directory tree lists `{claimed}` but it does not exist"),
            severity: ValidationSeverity::Warning,
            suggestion: None,
            target: claimed,
        });
    }
    return issues;
}

/// Reconstruct claimed file paths from tree lines, paired with the line's
/// offset inside the block. Malformed lines are skipped.
pub fn claimed_files(lines: &[String]) -> Vec<(usize, String)> {
    let mut ancestors: Vec<(usize, String)> = Vec::new();
    let mut files = Vec::new();
    let mut seen_entry = false;

    for (offset, line) in lines.iter().enumerate() {
        let Some((depth, token)) = parse_tree_line(line) else {
            continue;
        };
        let is_root_label = !seen_entry && depth == 0 && (token == "." || token.ends_with('/'));
        seen_entry = true;
        if is_root_label {
            continue;
        }

        while ancestors.last().is_some_and(|(d, _)| return *d >= depth) {
            ancestors.pop();
        }

        let name = token.trim_end_matches('/');
        if is_file_like(&token) {
            let mut path: Vec<&str> = ancestors.iter().map(|(_, n)| return n.as_str()).collect();
            path.push(name);
            files.push((offset, path.join("/")));
        } else if !name.is_empty() {
            ancestors.push((depth, name.to_string()));
        }
    }
    return files;
}

/// Whether a tree token names a file: has a dot, no `#`, not a directory,
/// not an ellipsis.
fn is_file_like(token: &str) -> bool {
    return token.contains('.')
        && !token.contains('#')
        && !token.ends_with('/')
        && !token.chars().all(|c| return c == '.');
}

/// Walk `root` (skipping dot-directories) into a set of `/`-separated
/// relative file paths.
fn list_relative_files(root: &Path) -> HashSet<String> {
    return WalkDir::new(root)
        .into_iter()
        .filter_entry(|e| {
            let hidden_dir = e.depth() > 0
                && e.file_type().is_dir()
                && e.file_name().to_str().is_some_and(|n| return n.starts_with('.'));
            return !hidden_dir;
        })
        .filter_map(Result::ok)
        .filter(|e| return e.file_type().is_file())
        .filter_map(|e| {
            let relative = e.path().strip_prefix(root).ok()?;
            let parts: Vec<String> = relative
                .components()
                .map(|c| return c.as_os_str().to_string_lossy().to_string())
                .collect();
            return Some(parts.join("/"));
        })
        .collect();
}

/// Split a tree line into `(depth, first token)`. Trailing comments
/// (`# ...`, `// ...`) are dropped. Returns `None` for blank lines.
fn parse_tree_line(line: &str) -> Option<(usize, String)> {
    let has_glyph = line.chars().any(|c| return matches!(c, '│' | '├' | '└' | '|')) || is_ascii_connector(line);
    let mut prefix = 0_usize;
    let mut rest = line;
    loop {
        let trimmed = rest.trim_start();
        let stripped = if has_glyph { trimmed.trim_start_matches(BOX_DRAWING) } else { trimmed };
        let connector = stripped.split_whitespace().next().unwrap_or("");
        let next = if has_glyph
            && !connector.is_empty()
            && connector.len() < stripped.len()
            && connector.chars().all(|c| return ASCII_DRAWING.contains(&c))
        {
            stripped.get(connector.len()..).unwrap_or("")
        } else {
            stripped
        };
        prefix = prefix.saturating_add(rest.chars().count().saturating_sub(next.chars().count()));
        if next.len() == rest.len() {
            break;
        }
        rest = next;
    }

    let token = rest.split_whitespace().next()?;
    if token.starts_with('#') || token.starts_with("//") {
        return None;
    }

    let depth = if has_glyph { prefix.saturating_add(3) / 4 } else { prefix / 2 };
    return Some((depth, token.to_string()));
}

/// Whether a line opens with an ASCII connector such as `` `-- `` or `+--`.
fn is_ascii_connector(line: &str) -> bool {
    let trimmed = line.trim_start();
    let Some(first) = trimmed.split_whitespace().next() else {
        return false;
    };
    return first.len() >= 2
        && first.len() < trimmed.len()
        && first.contains('-')
        && first.chars().all(|c| return ASCII_DRAWING.contains(&c));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Origin;

    fn project() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("src")).unwrap();
        std::fs::write(dir.path().join("src/index.ts"), "export {}").unwrap();
        std::fs::write(dir.path().join("config.yaml"), "a: 1").unwrap();
        dir
    }

    fn file_ref(path: &str, kind: ReferenceKind, doc: &Path) -> FileReference {
        FileReference {
            kind,
            origin: Origin { column: Some(1), file: doc.to_path_buf(), line: 3, surrounding_text: String::new() },
            path: path.to_string(),
            resolution: None,
        }
    }

    fn claim(root: &Path, lines: &[&str]) -> DirectoryStructureClaim {
        DirectoryStructureClaim {
            document_dir: root.to_path_buf(),
            lines: lines.iter().map(|l| l.to_string()).collect(),
            origin: Origin { column: None, file: root.join("KNOWLEDGE.md"), line: 10, surrounding_text: String::new() },
            root: root.to_path_buf(),
        }
    }

    #[test]
    fn missing_file_suggests_same_stem_sibling() {
        let dir = project();
        let doc = dir.path().join("KNOWLEDGE.md");
        let mut reference = file_ref("config.json", ReferenceKind::File, &doc);
        let issue = validate_reference(&mut reference, &doc, dir.path()).unwrap();
        assert_eq!(issue.kind, ValidationKind::MissingFile);
        assert_eq!(issue.severity, ValidationSeverity::Error);
        assert!(issue.suggestion.unwrap().contains("config.yaml"));
        assert!(!reference.resolution.unwrap().exists);
    }

    #[test]
    fn existing_file_has_no_issue() {
        let dir = project();
        let doc = dir.path().join("KNOWLEDGE.md");
        let mut reference = file_ref("src/index.ts", ReferenceKind::File, &doc);
        assert!(validate_reference(&mut reference, &doc, dir.path()).is_none());
        assert!(reference.resolution.unwrap().exists);
    }

    #[test]
    fn kind_mismatch_is_distinct_from_missing() {
        let dir = project();
        let doc = dir.path().join("KNOWLEDGE.md");
        let mut reference = file_ref("src", ReferenceKind::File, &doc);
        let issue = validate_reference(&mut reference, &doc, dir.path()).unwrap();
        assert_eq!(issue.kind, ValidationKind::TypeMismatch);
        assert_eq!(issue.severity, ValidationSeverity::Warning);
    }

    #[test]
    fn resolves_relative_to_document_not_cwd() {
        let dir = project();
        let doc = dir.path().join("src/KNOWLEDGE.md");
        let check = check_path("index.ts", ReferenceKind::File, &doc, dir.path());
        assert!(check.exists);
        let rooted = check_path("/config.yaml", ReferenceKind::File, &doc, dir.path());
        assert!(rooted.exists);
    }

    #[test]
    fn suggestions_are_capped_at_three() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["util.ts", "util.js", "Utils.md", "util-old.ts", "other.ts"] {
            std::fs::write(dir.path().join(name), "").unwrap();
        }
        let found = similar_siblings(&dir.path().join("util.json"));
        assert_eq!(found, vec!["Utils.md", "util-old.ts", "util.js"]);
    }

    #[test]
    fn tree_claim_reports_only_missing_files() {
        let dir = project();
        let tree = claim(dir.path(), &["project/", "├── src/", "│   ├── index.ts", "│   └── missing.ts", "└── config.yaml"]);
        let issues = validate_structure(&tree);
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].target, "src/missing.ts");
        assert_eq!(issues[0].severity, ValidationSeverity::Warning);
        assert_eq!(issues[0].line, Some(14));
    }

    #[test]
    fn tree_claim_rooted_at_subdirectory() {
        let dir = project();
        let mut tree = claim(dir.path(), &["src/", "├── index.ts", "└── missing.ts"]);
        tree.root = dir.path().join("src");
        let issues = validate_structure(&tree);
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].target, "missing.ts");
    }

    #[test]
    fn malformed_tree_yields_nothing() {
        let dir = project();
        assert!(validate_structure(&claim(dir.path(), &[])).is_empty());
        assert!(validate_structure(&claim(dir.path(), &["   ", "│", "├── ..."])).is_empty());
    }

    #[test]
    fn claimed_files_drop_comments_and_directories() {
        let lines: Vec<String> = ["├── lib/", "│   └── a.ts   # entry", "├── # heading", "└── b.md"]
            .iter()
            .map(|l| l.to_string())
            .collect();
        let files: Vec<String> = claimed_files(&lines).into_iter().map(|(_, p)| p).collect();
        assert_eq!(files, vec!["lib/a.ts", "b.md"]);
    }

    #[test]
    fn ascii_connectors_strip_but_leading_plus_stays() {
        let lines: Vec<String> = ["|-- routes/", "|   |-- +page.svelte", "`-- +layout.ts", "+-- app.html"]
            .iter()
            .map(|l| l.to_string())
            .collect();
        let files: Vec<String> = claimed_files(&lines).into_iter().map(|(_, p)| p).collect();
        assert_eq!(files, vec!["routes/+page.svelte", "+layout.ts", "app.html"]);
    }
}
