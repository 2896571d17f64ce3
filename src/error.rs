/// Crate-level error types for knowdoc diagnostics.
use std::path::PathBuf;

/// All errors in knowdoc carry enough context to produce a useful diagnostic
/// without a debugger. Each variant names the file or reason for failure.
///
/// Per-document problems (missing references, broken links, unreadable
/// knowledge files) are *not* errors: they are reported as issues. Only
/// conditions that stop a whole run end up here.
#[allow(clippy::error_impl_error, reason = "crate-internal error type in binary")]
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A file named on the command line does not exist.
    #[error("file not found: {}", path.display())]
    FileNotFound {
        /// Path to the missing file.
        path: PathBuf,
    },

    /// Git could not produce change history for the project.
    #[error("git unavailable: {reason}")]
    GitUnavailable {
        /// Why the git invocation failed.
        reason: String,
    },

    /// The HTTP client could not be constructed.
    #[error("http client: {0}")]
    Http(
        /// The wrapped reqwest error.
        #[from]
        reqwest::Error,
    ),

    /// Underlying I/O error from the filesystem.
    #[error("io: {0}")]
    Io(
        /// The wrapped I/O error.
        #[from]
        std::io::Error,
    ),

    /// JSON serialization of a report failed.
    #[error("json: {0}")]
    Json(
        /// The wrapped serde_json error.
        #[from]
        serde_json::Error,
    ),

    /// Tree-sitter failed to parse a source file.
    #[error("parse failed: {}: {reason}", file.display())]
    ParseFailed {
        /// File that failed to parse.
        file: PathBuf,
        /// Description of the parse failure.
        reason: String,
    },

    /// Interactive confirmation could not read from the terminal.
    #[error("prompt: {0}")]
    Prompt(
        /// The wrapped dialoguer error.
        #[from]
        dialoguer::Error,
    ),

    /// A built-in pattern failed to compile.
    #[error("regex: {0}")]
    Regex(
        /// The wrapped regex error.
        #[from]
        regex::Error,
    ),

    /// The project root cannot be listed, so there is nothing to analyze.
    #[error("project root unreadable: {}", path.display())]
    RootUnreadable {
        /// The root directory that was requested.
        path: PathBuf,
    },

    /// TOML deserialization failed.
    #[error("toml deserialize: {0}")]
    TomlDe(
        /// The wrapped TOML deserialization error.
        #[from]
        toml::de::Error,
    ),

    /// No tree-sitter grammar registered for this file extension.
    #[error("no grammar for extension: .{ext}")]
    UnsupportedLanguage {
        /// File extension without the leading dot.
        ext: String,
    },
}
