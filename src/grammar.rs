/// Tree-sitter grammar lookup for the source files knowledge files describe.
use std::path::Path;

use tree_sitter::Language;

use crate::error::Error;

/// Map a source file's extension to its tree-sitter language. JavaScript is
/// parsed with the TypeScript grammars, which accept plain JS.
///
/// # Errors
///
/// Returns `Error::UnsupportedLanguage` for extensions without a code grammar.
pub fn language_for_path(path: &Path) -> Result<Language, Error> {
    let ext = path.extension().and_then(|e| return e.to_str()).unwrap_or("");

    return match ext {
        "go" => Ok(tree_sitter_go::LANGUAGE.into()),
        "js" | "ts" => Ok(tree_sitter_typescript::LANGUAGE_TYPESCRIPT.into()),
        "jsx" | "tsx" => Ok(tree_sitter_typescript::LANGUAGE_TSX.into()),
        "py" => Ok(tree_sitter_python::LANGUAGE.into()),
        "rs" => Ok(tree_sitter_rust::LANGUAGE.into()),
        _ => Err(Error::UnsupportedLanguage {
            ext: ext.to_string(),
        }),
    };
}
