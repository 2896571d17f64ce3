//! "What changed since date X": git history when available, file
//! modification times otherwise.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use chrono::{DateTime, Local, NaiveDate};
use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::error::Error;
use crate::knowledge::{has_significant_extension, is_excluded_dir_name, is_excluded_entry, is_test_file};
use crate::types::DirectoryChanges;

/// Prefix marking a commit header line in the `git log` output we request.
const COMMIT_MARKER: &str = "@@";

/// Source of change history for a project tree. Paths in the result are
/// relative to `root`; only significant, non-test files are reported.
pub trait ChangeSource {
    /// Files added, modified and deleted on or after `since`.
    ///
    /// # Errors
    ///
    /// Implementations return an error when their backing history is
    /// unavailable, so a fallback can take over.
    fn changes_since(&self, root: &Path, since: NaiveDate) -> Result<DirectoryChanges, Error>;
}

/// Net effect of every commit in the window on one path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum NetChange {
    /// Created inside the window.
    Added,
    /// Gone at the end of the window.
    Deleted,
    /// Existed before and changed.
    Modified,
}

/// Reads `git log --name-status`. Renames are reported as a delete plus an add.
#[derive(Debug, Clone, Copy, Default)]
pub struct GitChangeSource;

impl ChangeSource for GitChangeSource {
    fn changes_since(&self, root: &Path, since: NaiveDate) -> Result<DirectoryChanges, Error> {
        let since_arg = format!("--since={}T00:00:00", since.format("%Y-%m-%d"));
        let output = Command::new("git")
            .current_dir(root)
            .args(["log", "--reverse", "--relative", "--no-renames", "--name-status"])
            .arg(format!("--format={COMMIT_MARKER}%cs"))
            .arg(since_arg)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .map_err(|e| {
                return Error::GitUnavailable {
                    reason: format!("failed to start `git log`: {e}"),
                };
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(Error::GitUnavailable {
                reason: format!("`git log` exited with {}: {}", output.status, stderr.trim()),
            });
        }

        let changes = parse_name_status(&String::from_utf8_lossy(&output.stdout));
        debug!(
            root = %root.display(),
            new = changes.new_files.len(),
            modified = changes.modified_files.len(),
            deleted = changes.deleted_files.len(),
            "git change history read"
        );
        return Ok(changes);
    }
}

/// Walks the tree and reports files whose modification time falls inside the
/// window. Deletions are invisible to this source. Files whose creation time
/// is also inside the window count as new.
#[derive(Debug, Clone, Copy, Default)]
pub struct MtimeChangeSource;

impl ChangeSource for MtimeChangeSource {
    fn changes_since(&self, root: &Path, since: NaiveDate) -> Result<DirectoryChanges, Error> {
        if !root.is_dir() {
            return Err(Error::RootUnreadable { path: root.to_path_buf() });
        }
        let mut changes = DirectoryChanges::default();
        let walker = WalkDir::new(root).into_iter().filter_entry(|e| return !is_excluded_entry(e));
        for entry in walker.filter_map(Result::ok) {
            let relative = entry.path().strip_prefix(root).unwrap_or(entry.path()).to_path_buf();
            if !entry.file_type().is_file() || !is_tracked(&relative) {
                continue;
            }
            let Ok(metadata) = entry.metadata() else { continue };
            let Ok(modified) = metadata.modified() else { continue };
            if local_date(modified) < since {
                continue;
            }
            let created_in_window = metadata.created().is_ok_and(|c| return local_date(c) >= since);
            if created_in_window {
                changes.new_files.push(relative);
            } else {
                changes.modified_files.push(relative);
            }
        }
        changes.new_files.sort();
        changes.modified_files.sort();
        return Ok(changes);
    }
}

/// Tries each source in order and returns the first success.
pub struct FallbackChangeSource {
    /// Sources in priority order.
    sources: Vec<Box<dyn ChangeSource>>,
}

impl FallbackChangeSource {
    /// Chain `sources`; the first one that succeeds wins.
    pub fn new(sources: Vec<Box<dyn ChangeSource>>) -> Self {
        return Self { sources };
    }
}

impl Default for FallbackChangeSource {
    /// Git first, modification times second.
    fn default() -> Self {
        return Self::new(vec![Box::new(GitChangeSource), Box::new(MtimeChangeSource)]);
    }
}

impl ChangeSource for FallbackChangeSource {
    fn changes_since(&self, root: &Path, since: NaiveDate) -> Result<DirectoryChanges, Error> {
        let mut last_error = None;
        for source in &self.sources {
            match source.changes_since(root, since) {
                Ok(changes) => return Ok(changes),
                Err(e) => {
                    warn!(error = %e, "change source failed, trying next");
                    last_error = Some(e);
                },
            }
        }
        return match last_error {
            Some(e) => Err(e),
            None => Ok(DirectoryChanges::default()),
        };
    }
}

/// Fold `git log --reverse --name-status` output (oldest commit first) into
/// net changes. A path added then deleted inside the window disappears; a
/// path deleted then re-added counts as modified.
pub fn parse_name_status(output: &str) -> DirectoryChanges {
    let mut net: BTreeMap<PathBuf, NetChange> = BTreeMap::new();
    let mut last_commit_date: Option<NaiveDate> = None;

    for line in output.lines() {
        if let Some(date) = line.strip_prefix(COMMIT_MARKER) {
            if let Ok(parsed) = NaiveDate::parse_from_str(date.trim(), "%Y-%m-%d") {
                last_commit_date = last_commit_date.max(Some(parsed));
            }
            continue;
        }
        let Some((status, path)) = line.split_once('\t') else { continue };
        let path = PathBuf::from(path.trim());
        if !is_tracked(&path) {
            continue;
        }
        let previous = net.get(&path).copied();
        let next = match (status.chars().next(), previous) {
            (Some('A'), Some(NetChange::Deleted)) => Some(NetChange::Modified),
            (Some('A'), _) => Some(NetChange::Added),
            (Some('D'), Some(NetChange::Added)) => None,
            (Some('D'), _) => Some(NetChange::Deleted),
            (Some('M' | 'T'), Some(NetChange::Added)) => Some(NetChange::Added),
            (Some('M' | 'T'), _) => Some(NetChange::Modified),
            _ => previous,
        };
        match next {
            Some(change) => {
                net.insert(path, change);
            },
            None => {
                net.remove(&path);
            },
        }
    }

    let mut changes = DirectoryChanges { last_commit_date, ..DirectoryChanges::default() };
    for (path, change) in net {
        match change {
            NetChange::Added => changes.new_files.push(path),
            NetChange::Deleted => changes.deleted_files.push(path),
            NetChange::Modified => changes.modified_files.push(path),
        }
    }
    return changes;
}

/// Significant extension, not a test file, not under an excluded directory.
/// `path` must be relative to the project root.
fn is_tracked(path: &Path) -> bool {
    let name = path.file_name().and_then(|n| return n.to_str()).unwrap_or("");
    if !has_significant_extension(path) || is_test_file(name) {
        return false;
    }
    let parent = path.parent().unwrap_or_else(|| return Path::new(""));
    return !parent
        .components()
        .any(|c| return c.as_os_str().to_str().is_some_and(is_excluded_dir_name));
}

/// Calendar date of a timestamp in local time.
fn local_date(time: std::time::SystemTime) -> NaiveDate {
    return DateTime::<Local>::from(time).date_naive();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn name_status_folds_commits_oldest_first() {
        let log = "\
@@2026-09-01

A\tsrc/new.ts
M\tsrc/edited.ts
A\tsrc/temp.ts
D\tsrc/old.ts
@@2026-09-03

D\tsrc/temp.ts
M\tsrc/new.ts
A\tsrc/old.ts
A\tsrc/widget.test.ts
A\tnode_modules/pkg/index.js
A\tassets/logo.png
";
        let changes = parse_name_status(log);
        assert_eq!(changes.new_files, vec![PathBuf::from("src/new.ts")]);
        assert_eq!(changes.modified_files, vec![PathBuf::from("src/edited.ts"), PathBuf::from("src/old.ts")]);
        assert!(changes.deleted_files.is_empty());
        assert_eq!(changes.last_commit_date, NaiveDate::from_ymd_opt(2026, 9, 3));
    }

    #[test]
    fn rename_without_detection_is_delete_plus_add() {
        let log = "@@2026-09-01\n\nD\tlib/a.ts\nA\tlib/b.ts\n";
        let changes = parse_name_status(log);
        assert_eq!(changes.deleted_files, vec![PathBuf::from("lib/a.ts")]);
        assert_eq!(changes.new_files, vec![PathBuf::from("lib/b.ts")]);
    }

    #[test]
    fn mtime_source_reports_recent_significant_files() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("src")).unwrap();
        std::fs::create_dir_all(dir.path().join("dist")).unwrap();
        std::fs::write(dir.path().join("src/app.ts"), "x").unwrap();
        std::fs::write(dir.path().join("src/app.test.ts"), "x").unwrap();
        std::fs::write(dir.path().join("src/image.png"), "x").unwrap();
        std::fs::write(dir.path().join("dist/bundle.js"), "x").unwrap();

        let yesterday = Local::now().date_naive().pred_opt().unwrap();
        let changes = MtimeChangeSource.changes_since(dir.path(), yesterday).unwrap();
        let mut reported: Vec<PathBuf> = changes.new_files.iter().chain(&changes.modified_files).cloned().collect();
        reported.sort();
        assert_eq!(reported, vec![PathBuf::from("src/app.ts")]);

        let tomorrow = Local::now().date_naive().succ_opt().unwrap();
        let later = MtimeChangeSource.changes_since(dir.path(), tomorrow).unwrap();
        assert!(later.new_files.is_empty() && later.modified_files.is_empty());
    }

    #[test]
    fn mtime_source_ignores_excluded_ancestors_of_root() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join(".local/build/proj");
        std::fs::create_dir_all(root.join("lib")).unwrap();
        std::fs::write(root.join("lib/api.ts"), "x").unwrap();

        let yesterday = Local::now().date_naive().pred_opt().unwrap();
        let changes = MtimeChangeSource.changes_since(&root, yesterday).unwrap();
        let reported: Vec<PathBuf> = changes.new_files.iter().chain(&changes.modified_files).cloned().collect();
        assert_eq!(reported, vec![PathBuf::from("lib/api.ts")]);
    }

    struct Failing;

    impl ChangeSource for Failing {
        fn changes_since(&self, _root: &Path, _since: NaiveDate) -> Result<DirectoryChanges, Error> {
            Err(Error::GitUnavailable { reason: "not a repository".to_string() })
        }
    }

    struct Fixed;

    impl ChangeSource for Fixed {
        fn changes_since(&self, _root: &Path, _since: NaiveDate) -> Result<DirectoryChanges, Error> {
            Ok(DirectoryChanges { new_files: vec![PathBuf::from("a.ts")], ..DirectoryChanges::default() })
        }
    }

    #[test]
    fn fallback_uses_first_success() {
        let chain = FallbackChangeSource::new(vec![Box::new(Failing), Box::new(Fixed)]);
        let since = NaiveDate::from_ymd_opt(2026, 1, 1).unwrap();
        let changes = chain.changes_since(Path::new("."), since).unwrap();
        assert_eq!(changes.new_files, vec![PathBuf::from("a.ts")]);

        let only_failing = FallbackChangeSource::new(vec![Box::new(Failing)]);
        assert!(matches!(only_failing.changes_since(Path::new("."), since), Err(Error::GitUnavailable { .. })));
    }
}
