use crate::error::Error;

const BOLD: &str = "\x1b[1m";
const RESET: &str = "\x1b[0m";

/// Render an error as valid markdown with bold headings and print to stderr.
pub fn print_error(e: &Error) {
    let md = render_error(e);
    for line in md.lines() {
        if line.starts_with('#') {
            eprintln!("{BOLD}{line}{RESET}");
        } else {
            eprintln!("{line}");
        }
    }
}

/// Render an error as a structured markdown diagnostic.
///
/// Each variant produces a block with what happened and, where the user can
/// do something about it, how to fix it.
pub fn render_error(e: &Error) -> String {
    match e {
        Error::FileNotFound { path } => render_file_not_found(&path.display().to_string()),
        Error::GitUnavailable { reason } => render_git_unavailable(reason),
        Error::RootUnreadable { path } => render_root_unreadable(&path.display().to_string()),
        Error::TomlDe(inner) => render_invalid_config(&inner.to_string()),
        Error::UnsupportedLanguage { ext } => render_unsupported_language(ext),
        _ => render_generic(e),
    }
}

fn render_generic(e: &Error) -> String {
    match e {
        Error::Http(inner) => format!("\
# Error: HTTP Client

{inner}

## Fix

Skip web links:

    knowdoc validate --offline
"),

        Error::Io(inner) => format!("\
# Error: I/O

{inner}
"),

        Error::Json(inner) => format!("\
# Error: JSON Report

{inner}
"),

        Error::ParseFailed { file, reason } => format!("\
# Error: Parse Failed

Could not parse `{}`: {reason}
", file.display()),

        Error::Prompt(inner) => format!("\
# Error: Prompt Failed

{inner}

## Fix

Run non-interactively:

    knowdoc fix --yes
"),

        Error::Regex(inner) => format!("\
# Error: Built-in Pattern

{inner}
"),

        // Handled in render_error, but the match must be exhaustive.
        _ => format!("\
# Error

{e}
"),
    }
}

fn render_file_not_found(path: &str) -> String {
    format!("\
# Error: File Not Found

`{path}` does not exist.
")
}

fn render_git_unavailable(reason: &str) -> String {
    format!("\
# Error: Git Unavailable

{reason}

Change detection falls back to file modification times, which cannot see
deleted files.
")
}

fn render_invalid_config(reason: &str) -> String {
    format!("\
# Error: Invalid Config

`.knowdoc.toml` could not be parsed:

{reason}

## Fix

Correct the file, or delete it to use the defaults.
")
}

fn render_root_unreadable(path: &str) -> String {
    format!("\
# Error: Project Root Unreadable

`{path}` is not a readable directory.

## Fix

Pass the project directory explicitly:

    knowdoc analyze path/to/project
")
}

fn render_unsupported_language(ext: &str) -> String {
    format!(
        "\
# Error: Unsupported Language

No tree-sitter grammar for `.{ext}` files.

## Supported extensions

- `.go` Go
- `.js`, `.jsx`, `.ts`, `.tsx` JavaScript and TypeScript
- `.py` Python
- `.rs` Rust
"
    )
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::*;

    #[test]
    fn every_render_starts_with_an_error_heading() {
        let errors = vec![
            Error::FileNotFound { path: PathBuf::from("docs/KNOWLEDGE.md") },
            Error::GitUnavailable { reason: "not a git repository".to_string() },
            Error::RootUnreadable { path: PathBuf::from("/nope") },
            Error::UnsupportedLanguage { ext: "zig".to_string() },
            Error::ParseFailed { file: PathBuf::from("a.ts"), reason: "bad".to_string() },
            Error::Io(std::io::Error::other("disk full")),
        ];
        for e in &errors {
            assert!(render_error(e).starts_with("# Error"), "{e}");
        }
    }

    #[test]
    fn config_errors_name_the_file() {
        let toml_err = toml::from_str::<toml::Value>("a = [").unwrap_err();
        let md = render_error(&Error::TomlDe(toml_err));
        assert!(md.contains("# Error: Invalid Config"));
        assert!(md.contains(".knowdoc.toml"));
    }

    #[test]
    fn missing_file_shows_path() {
        let md = render_error(&Error::FileNotFound { path: PathBuf::from("docs/KNOWLEDGE.md") });
        assert!(md.contains("`docs/KNOWLEDGE.md` does not exist."));
    }
}
