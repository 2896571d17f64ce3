//! Knowledge-file conventions and project tree discovery.

use std::path::{Path, PathBuf};

use walkdir::{DirEntry, WalkDir};

use crate::config::Config;
use crate::error::Error;

/// Candidate knowledge-file names, in order of precedence.
pub const KNOWLEDGE_FILE_NAMES: [&str; 3] = ["KNOWLEDGE.md", "knowledge.md", "README.md"];

/// Directories never descended into, on top of every dot-directory.
pub const EXCLUDED_DIRS: [&str; 15] = [
    ".git",
    "node_modules",
    ".vscode",
    ".idea",
    "dist",
    "build",
    "coverage",
    ".nyc_output",
    ".next",
    ".nuxt",
    "out",
    "temp",
    "tmp",
    ".cache",
    ".parcel-cache",
];

/// Extensions worth documenting and tracking for changes.
pub const SIGNIFICANT_EXTENSIONS: [&str; 8] = ["ts", "js", "tsx", "jsx", "md", "json", "yaml", "yml"];

/// Lockfiles are generated and never need a description.
const LOCKFILE_NAMES: [&str; 4] = ["package-lock.json", "yarn.lock", "pnpm-lock.yaml", "npm-shrinkwrap.json"];

/// Whether a directory name is pruned from every tree walk.
pub fn is_excluded_dir_name(name: &str) -> bool {
    return name.starts_with('.') || EXCLUDED_DIRS.contains(&name);
}

/// Whether a walk entry is a directory that should be pruned.
/// The walk root itself is never pruned.
pub fn is_excluded_entry(entry: &DirEntry) -> bool {
    if entry.depth() == 0 || !entry.file_type().is_dir() {
        return false;
    }
    return entry.file_name().to_str().is_some_and(is_excluded_dir_name);
}

/// Whether a file has one of the significant extensions.
pub fn has_significant_extension(path: &Path) -> bool {
    return path
        .extension()
        .and_then(|e| return e.to_str())
        .is_some_and(|ext| return SIGNIFICANT_EXTENSIONS.contains(&ext));
}

/// Whether a file name follows the `.test.` / `.spec.` convention.
pub fn is_test_file(name: &str) -> bool {
    return name.contains(".test.") || name.contains(".spec.");
}

/// Whether a file in a documented directory should appear in its knowledge file.
/// Dotfiles, lockfiles, non-significant extensions and the knowledge file
/// itself are left out.
pub fn is_documentable(path: &Path, knowledge_file: &Path) -> bool {
    let Some(name) = path.file_name().and_then(|n| return n.to_str()) else {
        return false;
    };
    if name.starts_with('.') || LOCKFILE_NAMES.contains(&name) {
        return false;
    }
    if knowledge_file.file_name().is_some_and(|k| return k == name) {
        return false;
    }
    return has_significant_extension(path);
}

/// Whether `text` mentions `name` as a whole file name, not as part of a
/// longer one. `data.ts` does not mention `a.ts`; `src/a.ts` and `` `a.ts` `` do.
pub fn mentions_file(text: &str, name: &str) -> bool {
    if name.is_empty() {
        return false;
    }
    return text.match_indices(name).any(|(start, _)| {
        let before = text.get(..start).and_then(|t| return t.chars().next_back());
        let mut after = text.get(start.saturating_add(name.len())..).unwrap_or("").chars();
        let ends_cleanly = match after.next() {
            None => true,
            Some('.') => !after.next().is_some_and(is_file_name_char),
            Some(c) => !is_file_name_char(c),
        };
        return !before.is_some_and(is_file_name_char) && ends_cleanly;
    });
}

/// Characters that extend a file name token.
fn is_file_name_char(c: char) -> bool {
    return c.is_alphanumeric() || matches!(c, '_' | '-' | '.');
}

/// Pick the knowledge file for one directory by name precedence.
pub fn knowledge_file_in(dir: &Path) -> Option<PathBuf> {
    return KNOWLEDGE_FILE_NAMES
        .iter()
        .map(|name| return dir.join(name))
        .find(|candidate| return candidate.is_file());
}

/// Find every knowledge file under `root`, one per directory at most,
/// sorted by path. Config include/exclude prefixes are applied to the
/// path relative to `root`.
///
/// # Errors
///
/// Returns `Error::RootUnreadable` if `root` is not a readable directory.
pub fn discover(root: &Path, config: &Config) -> Result<Vec<PathBuf>, Error> {
    if std::fs::read_dir(root).is_err() {
        return Err(Error::RootUnreadable { path: root.to_path_buf() });
    }

    let mut found = Vec::new();
    for entry in WalkDir::new(root)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| return !is_excluded_entry(e))
        .filter_map(Result::ok)
        .filter(|e| return e.file_type().is_dir())
    {
        let Some(knowledge) = knowledge_file_in(entry.path()) else {
            continue;
        };
        let relative = knowledge.strip_prefix(root).unwrap_or(&knowledge);
        if !config.should_scan(&relative.to_string_lossy()) {
            continue;
        }
        found.push(knowledge);
    }

    found.sort();
    return Ok(found);
}

/// Collapse `.` and `..` components in a path without touching the filesystem.
/// Preserves leading `..` when there is nothing left to pop.
pub fn normalize_path(path: &Path) -> PathBuf {
    let mut components: Vec<std::path::Component<'_>> = Vec::new();
    for component in path.components() {
        match component {
            std::path::Component::CurDir => {},
            std::path::Component::ParentDir => {
                let can_pop = matches!(
                    components.last(),
                    Some(c) if !matches!(c, std::path::Component::ParentDir | std::path::Component::RootDir)
                );
                if can_pop {
                    components.pop();
                } else {
                    components.push(component);
                }
            },
            other => components.push(other),
        }
    }
    return components.iter().collect();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn precedence_prefers_uppercase_knowledge() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("README.md"), "# r").unwrap();
        std::fs::write(dir.path().join("KNOWLEDGE.md"), "# k").unwrap();
        let picked = knowledge_file_in(dir.path()).unwrap();
        assert_eq!(picked.file_name().unwrap(), "KNOWLEDGE.md");
    }

    #[test]
    fn discover_skips_excluded_and_dot_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        for sub in ["src", "node_modules/pkg", ".hidden", "dist"] {
            std::fs::create_dir_all(root.join(sub)).unwrap();
            std::fs::write(root.join(sub).join("README.md"), "# x").unwrap();
        }
        std::fs::write(root.join("KNOWLEDGE.md"), "# root").unwrap();

        let found = discover(root, &Config::default()).unwrap();
        let relative: Vec<PathBuf> = found
            .iter()
            .map(|p| p.strip_prefix(root).unwrap().to_path_buf())
            .collect();
        assert_eq!(relative, vec![PathBuf::from("KNOWLEDGE.md"), PathBuf::from("src/README.md")]);
    }

    #[test]
    fn discover_rejects_missing_root() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope");
        assert!(matches!(
            discover(&missing, &Config::default()),
            Err(Error::RootUnreadable { .. })
        ));
    }

    #[test]
    fn documentable_filters_noise() {
        let knowledge = Path::new("src/KNOWLEDGE.md");
        assert!(is_documentable(Path::new("src/index.ts"), knowledge));
        assert!(!is_documentable(Path::new("src/KNOWLEDGE.md"), knowledge));
        assert!(!is_documentable(Path::new("src/.eslintrc.json"), knowledge));
        assert!(!is_documentable(Path::new("src/package-lock.json"), knowledge));
        assert!(!is_documentable(Path::new("src/main.rs"), knowledge));
    }

    #[test]
    fn file_mentions_respect_name_boundaries() {
        assert!(mentions_file("- `a.ts` - A", "a.ts"));
        assert!(mentions_file("see src/a.ts.", "a.ts"));
        assert!(mentions_file("a.ts", "a.ts"));
        assert!(!mentions_file("- `data.ts` - Data", "a.ts"));
        assert!(!mentions_file("a.tsx and a.ts.bak", "a.ts"));
        assert!(!mentions_file("anything", ""));
    }

    #[test]
    fn normalize_collapses_parent_components() {
        assert_eq!(normalize_path(Path::new("docs/../src/./lib.ts")), PathBuf::from("src/lib.ts"));
        assert_eq!(normalize_path(Path::new("../x")), PathBuf::from("../x"));
    }
}
