//! One-sentence file descriptions for knowledge-file bullets.
//!
//! The heuristic generator counts declarations in the tree-sitter CST. It is
//! pattern matching over syntax, not semantic analysis.

use std::path::Path;

use regex::Regex;
use tree_sitter::{Node, Parser};

use crate::error::Error;
use crate::grammar;
use crate::knowledge::is_test_file;

/// Names listed before "and N more".
const MAX_LISTED_NAMES: usize = 3;

/// Produces a short description of a file from its path and content.
/// Output is an opaque sentence; callers never parse it.
pub trait DescriptionGenerator {
    /// Describe one file.
    fn describe(&self, path: &Path, content: &str) -> String;
}

/// Declaration counts found in one file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CodeShape {
    /// Class-like type names (classes, structs, enums).
    pub classes: Vec<String>,
    /// Exported or public names.
    pub exports: Vec<String>,
    /// Function-like declarations, methods and arrow functions included.
    pub functions: usize,
    /// Interface-like type names (interfaces, traits).
    pub interfaces: Vec<String>,
}

/// Node kinds that count toward each category, per grammar.
struct NodeKinds {
    /// Class-like declarations.
    classes: &'static [&'static str],
    /// Function and method declarations.
    functions: &'static [&'static str],
    /// Interface and trait declarations.
    interfaces: &'static [&'static str],
}

/// TypeScript and JavaScript.
const TYPESCRIPT_KINDS: NodeKinds = NodeKinds {
    classes: &["class_declaration", "abstract_class_declaration"],
    functions: &[
        "arrow_function",
        "function_declaration",
        "function_expression",
        "generator_function_declaration",
        "method_definition",
    ],
    interfaces: &["interface_declaration"],
};

/// Rust.
const RUST_KINDS: NodeKinds = NodeKinds {
    classes: &["enum_item", "struct_item"],
    functions: &["function_item"],
    interfaces: &["trait_item"],
};

/// Python.
const PYTHON_KINDS: NodeKinds = NodeKinds {
    classes: &["class_definition"],
    functions: &["function_definition"],
    interfaces: &[],
};

/// Go; structs and interfaces come from `type_spec`.
const GO_KINDS: NodeKinds = NodeKinds {
    classes: &[],
    functions: &["function_declaration", "method_declaration"],
    interfaces: &[],
};

/// Tree-sitter backed generator with test-file detection.
pub struct HeuristicDescriber {
    /// Test-case markers across the supported languages.
    test_case: Regex,
}

impl HeuristicDescriber {
    /// Compile the test-case pattern.
    ///
    /// # Errors
    ///
    /// Returns `Error::Regex` if the built-in pattern fails to compile.
    pub fn new() -> Result<Self, Error> {
        return Ok(Self {
            test_case: Regex::new(
                r"(?m)\b(?:it|test)(?:\.(?:only|skip|todo))?\s*\(|#\[(?:tokio::)?test\]|^\s*def test_|^func Test",
            )?,
        });
    }

    /// Count test-case markers in `content`.
    pub fn count_test_cases(&self, content: &str) -> usize {
        return self.test_case.find_iter(content).count();
    }
}

impl DescriptionGenerator for HeuristicDescriber {
    fn describe(&self, path: &Path, content: &str) -> String {
        let name = path.file_name().and_then(|n| return n.to_str()).unwrap_or("");
        if is_test_file(name) {
            let count = self.count_test_cases(content);
            return format!("Test suite with {count} test {}", plural(count, "case", "cases"));
        }

        let shape = code_shape(path, content).unwrap_or_default();

        if let Some(first) = shape.classes.first() {
            return match shape.classes.len() {
                1 => format!("Defines the `{first}` class"),
                n => format!("Defines {n} classes: {}", name_list(&shape.classes)),
            };
        }
        if let Some(first) = shape.interfaces.first() {
            return match shape.interfaces.len() {
                1 => format!("Type definitions for the `{first}` interface"),
                n => format!("Type definitions: {n} interfaces ({})", name_list(&shape.interfaces)),
            };
        }
        if shape.functions > 0 {
            let count = shape.functions;
            return format!("Provides {count} {}", plural(count, "function", "functions"));
        }
        if !shape.exports.is_empty() {
            return format!("Exports {}", name_list(&shape.exports));
        }
        return fallback_sentence(path);
    }
}

/// Parse `content` with the grammar for `path` and count declarations.
///
/// # Errors
///
/// Returns `Error::UnsupportedLanguage` for extensions without a code
/// grammar, or `Error::ParseFailed` if tree-sitter cannot parse the source.
pub fn code_shape(path: &Path, content: &str) -> Result<CodeShape, Error> {
    let ext = path.extension().and_then(|e| return e.to_str()).unwrap_or("");
    let kinds = match ext {
        "go" => &GO_KINDS,
        "js" | "jsx" | "ts" | "tsx" => &TYPESCRIPT_KINDS,
        "py" => &PYTHON_KINDS,
        "rs" => &RUST_KINDS,
        _ => return Err(Error::UnsupportedLanguage { ext: ext.to_string() }),
    };
    let language = grammar::language_for_path(path)?;

    let mut parser = Parser::new();
    parser.set_language(&language).map_err(|e| {
        return Error::ParseFailed { file: path.to_path_buf(), reason: e.to_string() };
    })?;
    let tree = parser.parse(content, None).ok_or_else(|| {
        return Error::ParseFailed { file: path.to_path_buf(), reason: "tree-sitter returned None".to_string() };
    })?;

    let mut shape = CodeShape::default();
    collect_shape(tree.root_node(), content, ext, kinds, &mut shape);
    return Ok(shape);
}

/// Walk the tree, tallying every node whose kind is in `kinds`.
fn collect_shape(node: Node<'_>, source: &str, ext: &str, kinds: &NodeKinds, shape: &mut CodeShape) {
    let kind = node.kind();
    if kinds.classes.contains(&kind) {
        shape.classes.extend(field_text(node, "name", source));
    } else if kinds.interfaces.contains(&kind) {
        shape.interfaces.extend(field_text(node, "name", source));
    } else if kinds.functions.contains(&kind) {
        shape.functions = shape.functions.saturating_add(1);
    }

    match (ext, kind) {
        ("go", "type_spec") => collect_go_type(node, source, shape),
        ("js" | "jsx" | "ts" | "tsx", "export_statement") => collect_ts_exports(node, source, shape),
        ("rs", _) if is_public_rust_item(node) => shape.exports.extend(field_text(node, "name", source)),
        _ => {},
    }

    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        collect_shape(child, source, ext, kinds, shape);
    }
}

/// Go declares structs and interfaces through `type_spec`.
fn collect_go_type(node: Node<'_>, source: &str, shape: &mut CodeShape) {
    let Some(name) = field_text(node, "name", source) else { return };
    let exported = name.chars().next().is_some_and(char::is_uppercase);
    match node.child_by_field_name("type").map(|t| return t.kind()) {
        Some("struct_type") => shape.classes.push(name.clone()),
        Some("interface_type") => shape.interfaces.push(name.clone()),
        _ => {},
    }
    if exported {
        shape.exports.push(name);
    }
}

/// Named exports: `export function f`, `export const a = ...`, `export { a, b }`.
fn collect_ts_exports(node: Node<'_>, source: &str, shape: &mut CodeShape) {
    if let Some(declaration) = node.child_by_field_name("declaration") {
        if let Some(name) = field_text(declaration, "name", source) {
            shape.exports.push(name);
            return;
        }
        let mut cursor = declaration.walk();
        for child in declaration.named_children(&mut cursor) {
            if child.kind() == "variable_declarator" {
                shape.exports.extend(field_text(child, "name", source));
            }
        }
        return;
    }

    let mut cursor = node.walk();
    for child in node.named_children(&mut cursor) {
        if child.kind() != "export_clause" {
            continue;
        }
        let mut inner = child.walk();
        for specifier in child.named_children(&mut inner) {
            let name = field_text(specifier, "alias", source).or_else(|| return field_text(specifier, "name", source));
            shape.exports.extend(name);
        }
    }
}

/// Rust items carrying a `pub` visibility modifier.
fn is_public_rust_item(node: Node<'_>) -> bool {
    if !node.kind().ends_with("_item") {
        return false;
    }
    let mut cursor = node.walk();
    return node.children(&mut cursor).any(|c| return c.kind() == "visibility_modifier");
}

/// Text of a named field, if present.
fn field_text(node: Node<'_>, field: &str, source: &str) -> Option<String> {
    return node
        .child_by_field_name(field)
        .and_then(|n| return n.utf8_text(source.as_bytes()).ok())
        .map(str::to_string);
}

/// Generic sentence keyed by extension.
fn fallback_sentence(path: &Path) -> String {
    let ext = path.extension().and_then(|e| return e.to_str()).unwrap_or("");
    let sentence = match ext {
        "go" => "Go source file",
        "js" | "jsx" => "JavaScript module",
        "json" => "JSON configuration or data file",
        "md" => "Markdown documentation",
        "py" => "Python module",
        "rs" => "Rust source file",
        "ts" | "tsx" => "TypeScript module",
        "yaml" | "yml" => "YAML configuration file",
        _ => "Project file",
    };
    return sentence.to_string();
}

/// "`a`, `b`, `c` and 2 more".
fn name_list(names: &[String]) -> String {
    let listed = names
        .iter()
        .take(MAX_LISTED_NAMES)
        .map(|n| return format!("`{n}`"))
        .collect::<Vec<_>>()
        .join(", ");
    let rest = names.len().saturating_sub(MAX_LISTED_NAMES);
    if rest == 0 {
        return listed;
    }
    return format!("{listed} and {rest} more");
}

/// Pick the singular or plural noun.
const fn plural<'a>(count: usize, one: &'a str, many: &'a str) -> &'a str {
    if count == 1 {
        return one;
    }
    return many;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn describe(name: &str, content: &str) -> String {
        HeuristicDescriber::new().unwrap().describe(Path::new(name), content)
    }

    #[test]
    fn test_files_count_cases_first() {
        let src = "describe('x', () => {\n  it('a', () => {});\n  it('b', () => {});\n  test.skip('c', () => {});\n});\nclass Helper {}\n";
        assert_eq!(describe("widget.test.ts", src), "Test suite with 3 test cases");
        assert_eq!(describe("one.spec.js", "it('only', () => {})"), "Test suite with 1 test case");
    }

    #[test]
    fn classes_win_over_functions() {
        let src = "export class UserService {\n  find() {}\n}\nexport function helper() {}\n";
        assert_eq!(describe("user.ts", src), "Defines the `UserService` class");
        let two = "class A {}\nclass B {}\n";
        assert_eq!(describe("ab.ts", two), "Defines 2 classes: `A`, `B`");
    }

    #[test]
    fn interfaces_then_functions_then_exports() {
        assert_eq!(
            describe("types.ts", "export interface Options { a: string }\n"),
            "Type definitions for the `Options` interface"
        );
        assert_eq!(describe("util.ts", "function a() {}\nconst b = () => 1;\n"), "Provides 2 functions");
        assert_eq!(describe("consts.ts", "export const A = 1;\nexport const B = 2;\n"), "Exports `A`, `B`");
    }

    #[test]
    fn rust_and_python_shapes() {
        assert_eq!(describe("lib.rs", "pub trait Store {}\n"), "Type definitions for the `Store` interface");
        assert_eq!(describe("cfg.rs", "pub struct Config;\n"), "Defines the `Config` class");
        assert_eq!(describe("app.py", "def main():\n    pass\n"), "Provides 1 function");
    }

    #[test]
    fn fallback_by_extension() {
        assert_eq!(describe("package.json", "{}"), "JSON configuration or data file");
        assert_eq!(describe("empty.ts", ""), "TypeScript module");
        assert_eq!(describe("ci.yml", "on: push"), "YAML configuration file");
    }

    #[test]
    fn export_names_are_listed_with_overflow() {
        let names: Vec<String> = ["a", "b", "c", "d", "e"].iter().map(|s| s.to_string()).collect();
        assert_eq!(name_list(&names), "`a`, `b`, `c` and 2 more");
    }
}
