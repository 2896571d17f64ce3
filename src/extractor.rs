//! Reference extraction: markdown text in, typed references and directory
//! tree claims out. Pure, no I/O; malformed markdown yields fewer references.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use regex::Regex;

use crate::error::Error;
use crate::types::{
    DirectoryStructureClaim, FileReference, LinkReference, Origin, Reference, ReferenceKind,
};

/// Bare filenames recognized in prose without code-span or link syntax.
pub const WELL_KNOWN_FILES: [&str; 10] = [
    "package.json",
    ".env",
    ".gitignore",
    "Dockerfile",
    "Makefile",
    "README.md",
    "LICENSE",
    "tsconfig.json",
    ".npmrc",
    ".editorconfig",
];

/// Glyphs that mark a fenced block as a drawn directory tree.
const TREE_GLYPHS: [&str; 3] = ["├──", "└──", "│"];

/// How many leading block lines are inspected when classifying a fence.
const TREE_SNIFF_LINES: usize = 5;

/// A fenced code block, classified by content sniffing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CodeBlock {
    /// Drawn directory tree; becomes a `DirectoryStructureClaim`.
    DirectoryTree,
    /// Any other code.
    Generic,
}

/// Everything extracted from one document.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Extraction {
    /// Tree claims, one per tree-looking fenced block.
    pub claims: Vec<DirectoryStructureClaim>,
    /// References in source order: top-to-bottom, left-to-right.
    pub references: Vec<Reference>,
}

/// Compiled extraction patterns. Build once, extract many documents.
pub struct Extractor {
    /// `<https://...>` autolinks.
    autolink: Regex,
    /// `word/word/` directory mentions in prose.
    bare_dir: Regex,
    /// Naked `http(s)://` tokens.
    bare_url: Regex,
    /// `` `...` `` inline code spans.
    code_span: Regex,
    /// Opening or closing code fence.
    fence: Regex,
    /// `[text](target)` links and images.
    inline_link: Regex,
    /// Allow-listed bare filenames.
    well_known: Regex,
}

/// A reference found on one line, before ordering and deduplication.
struct Hit {
    /// One-based character column.
    column: usize,
    /// Normalized target used as the deduplication key.
    key: String,
    /// The reference itself.
    reference: Reference,
}

/// State of the fence scanner while walking lines.
struct OpenFence {
    /// Body lines collected so far.
    body: Vec<String>,
    /// Info string after the opening fence.
    info: String,
    /// One-based line of the opening fence.
    line: usize,
    /// The fence marker (```` ``` ```` or `~~~`) that must close the block.
    marker: String,
}

impl Extractor {
    /// Compile the extraction patterns.
    ///
    /// # Errors
    ///
    /// Returns `Error::Regex` if a built-in pattern fails to compile.
    pub fn new() -> Result<Self, Error> {
        let well_known_alternatives = WELL_KNOWN_FILES
            .iter()
            .map(|name| return regex::escape(name))
            .collect::<Vec<_>>()
            .join("|");

        return Ok(Self {
            autolink: Regex::new(r"<((?:https?|ftp)://[^>\s]+)>")?,
            bare_dir: Regex::new(r"(?:^|[\s(])((?:[A-Za-z0-9_][A-Za-z0-9_\-]*/)+)")?,
            bare_url: Regex::new(r#"https?://[^\s<>()\[\]`"'\x00]+"#)?,
            code_span: Regex::new(r"`([^`]+)`")?,
            fence: Regex::new(r"^\s{0,3}(`{3,}|~{3,})\s*(.*)$")?,
            inline_link: Regex::new(r"!?\[([^\]]*)\]\(([^)]*)\)")?,
            well_known: Regex::new(&format!(r"(?:^|[^A-Za-z0-9_./\-])({well_known_alternatives})"))?,
        });
    }

    /// Extract references and tree claims from a markdown document.
    /// Deterministic: identical input always yields identical output.
    pub fn extract(&self, content: &str, source: &Path) -> Extraction {
        let document_dir = source.parent().unwrap_or_else(|| return Path::new("")).to_path_buf();
        let mut extraction = Extraction::default();
        let mut fence: Option<OpenFence> = None;

        for (index, line) in content.lines().enumerate() {
            let line_no = index.saturating_add(1);

            if let Some(open) = fence.as_mut() {
                if is_closing_fence(line, &open.marker) {
                    if let Some(done) = fence.take()
                        && let Some(claim) = claim_from_fence(done, source, &document_dir)
                    {
                        extraction.claims.push(claim);
                    }
                } else {
                    open.body.push(line.to_string());
                }
                continue;
            }

            if let Some(cap) = self.fence.captures(line) {
                let marker = cap.get(1).map_or("", |m| return m.as_str()).to_string();
                let info = cap.get(2).map_or("", |m| return m.as_str()).trim().to_string();
                fence = Some(OpenFence { body: Vec::new(), info, line: line_no, marker });
                continue;
            }

            self.extract_line(line, line_no, source, &mut extraction.references);
        }

        // An unclosed fence is malformed; it yields no claim.
        return extraction;
    }

    /// Extract, order, and deduplicate references from one prose line.
    fn extract_line(&self, line: &str, line_no: usize, source: &Path, out: &mut Vec<Reference>) {
        let mut hits: Vec<Hit> = Vec::new();
        let mut masked = line.to_string();
        let origin = |byte: usize| -> Origin {
            return Origin {
                column: Some(char_column(line, byte)),
                file: source.to_path_buf(),
                line: line_no,
                surrounding_text: line.trim().to_string(),
            };
        };

        for cap in self.inline_link.captures_iter(line) {
            let (Some(whole), Some(target)) = (cap.get(0), cap.get(2)) else { continue };
            mask(&mut masked, whole.range());
            let url = strip_link_title(target.as_str());
            if url.is_empty() {
                continue;
            }
            hits.push(link_hit(url, origin(target.start())));
        }

        for cap in self.autolink.captures_iter(line) {
            let (Some(whole), Some(url)) = (cap.get(0), cap.get(1)) else { continue };
            if is_masked(&masked, whole.start()) {
                continue;
            }
            mask(&mut masked, whole.range());
            hits.push(link_hit(url.as_str(), origin(url.start())));
        }

        let after_links = masked.clone();
        for cap in self.code_span.captures_iter(&after_links) {
            let (Some(whole), Some(token)) = (cap.get(0), cap.get(1)) else { continue };
            mask(&mut masked, whole.range());
            let token = token.as_str().trim();
            if !looks_like_path(token) {
                continue;
            }
            hits.push(file_hit(token, classify_path(token), origin(whole.start().saturating_add(1))));
        }

        let after_code = masked.clone();
        for found in self.bare_url.find_iter(&after_code) {
            let url = found.as_str().trim_end_matches(['.', ',', ';', ':', '!', '?']);
            mask(&mut masked, found.range());
            hits.push(link_hit(url, origin(found.start())));
        }

        for cap in self.well_known.captures_iter(&masked) {
            let Some(name) = cap.get(1) else { continue };
            if !ends_token(&masked, name.end()) {
                continue;
            }
            hits.push(file_hit(name.as_str(), ReferenceKind::File, origin(name.start())));
        }

        for cap in self.bare_dir.captures_iter(&masked) {
            let Some(dir) = cap.get(1) else { continue };
            if dir.as_str().len() <= 2 || !ends_token(&masked, dir.end()) {
                continue;
            }
            hits.push(file_hit(dir.as_str(), ReferenceKind::Directory, origin(dir.start())));
        }

        hits.sort_by_key(|h| return h.column);
        let mut seen: HashSet<String> = HashSet::new();
        for hit in hits {
            if seen.insert(hit.key) {
                out.push(hit.reference);
            }
        }
    }
}

/// Classify a fenced block by its info string and first few lines.
pub fn classify_code_block(info: &str, body: &[String]) -> CodeBlock {
    let mentions_tree = |text: &str| -> bool {
        return text
            .split(|c: char| return !c.is_alphanumeric())
            .any(|word| return word.eq_ignore_ascii_case("tree"));
    };

    if mentions_tree(info) {
        return CodeBlock::DirectoryTree;
    }
    let sniffed = body.iter().take(TREE_SNIFF_LINES).any(|line| {
        return TREE_GLYPHS.iter().any(|g| return line.contains(g)) || mentions_tree(line);
    });
    if sniffed {
        return CodeBlock::DirectoryTree;
    }
    return CodeBlock::Generic;
}

/// Classify a link target by scheme.
pub fn classify_link(target: &str) -> ReferenceKind {
    let lower = target.to_ascii_lowercase();
    if lower.starts_with("http://") {
        return ReferenceKind::Http;
    }
    if lower.starts_with("https://") {
        return ReferenceKind::Https;
    }
    if lower.starts_with("ftp://") {
        return ReferenceKind::Ftp;
    }
    if lower.starts_with("mailto:") {
        return ReferenceKind::Mailto;
    }
    if target.contains('#') {
        return ReferenceKind::Anchor;
    }
    if lower.contains("://") {
        return ReferenceKind::Unknown;
    }
    return ReferenceKind::Internal;
}

/// Classify a path token as file or directory.
/// Trailing slash ⇒ directory; an extension or well-known name ⇒ file;
/// a slash without any dot ⇒ directory.
pub fn classify_path(token: &str) -> ReferenceKind {
    if token.ends_with('/') {
        return ReferenceKind::Directory;
    }
    let name = token.rsplit('/').next().unwrap_or(token);
    if WELL_KNOWN_FILES.contains(&name) || name.contains('.') {
        return ReferenceKind::File;
    }
    if token.contains('/') {
        return ReferenceKind::Directory;
    }
    return ReferenceKind::File;
}

/// Whether an inline-code token plausibly names a path.
pub fn looks_like_path(token: &str) -> bool {
    if WELL_KNOWN_FILES.contains(&token) {
        return true;
    }
    if token.is_empty() || token.contains("://") || !(token.contains('/') || token.contains('.')) {
        return false;
    }
    let path_charset = |c: char| return c.is_alphanumeric() || matches!(c, '.' | '_' | '-' | '/');
    if !token.chars().all(path_charset) {
        return false;
    }
    // Version numbers and ellipses.
    if token.chars().all(|c| return c.is_ascii_digit() || c == '.') || token.ends_with('.') {
        return false;
    }
    // A bare extension such as `.ts`.
    if let Some(rest) = token.strip_prefix('.')
        && !rest.contains(['.', '/'])
    {
        return false;
    }
    return true;
}

/// Build a claim from a closed fence, if the block looks like a tree.
fn claim_from_fence(fence: OpenFence, source: &Path, document_dir: &Path) -> Option<DirectoryStructureClaim> {
    if classify_code_block(&fence.info, &fence.body) != CodeBlock::DirectoryTree {
        return None;
    }
    let root = infer_claim_root(&fence.body, document_dir);
    let surrounding_text = fence.body.first().map(|l| return l.trim().to_string()).unwrap_or_default();
    return Some(DirectoryStructureClaim {
        document_dir: document_dir.to_path_buf(),
        lines: fence.body,
        origin: Origin {
            column: None,
            file: source.to_path_buf(),
            line: fence.line,
            surrounding_text,
        },
        root,
    });
}

/// Guess which directory a tree is drawn from. A glyph-free first line such
/// as `src/` or `$ tree src` names the root; otherwise the document's own
/// directory is assumed.
fn infer_claim_root(body: &[String], document_dir: &Path) -> PathBuf {
    let Some(first) = body.iter().map(|l| return l.trim()).find(|l| return !l.is_empty()) else {
        return document_dir.to_path_buf();
    };
    if TREE_GLYPHS.iter().any(|g| return first.contains(g)) {
        return document_dir.to_path_buf();
    }

    let command_arg = first.trim_start_matches('$').trim().strip_prefix("tree");
    let label = match command_arg {
        Some(rest) => rest.split_whitespace().rfind(|w| return !w.starts_with('-')).unwrap_or("."),
        None => first.split_whitespace().next().unwrap_or("."),
    };
    let label = label.trim_end_matches('/');

    let is_self = label.is_empty()
        || label == "."
        || document_dir.file_name().is_some_and(|n| return n == label);
    if is_self || label.contains(['.', '#']) {
        return document_dir.to_path_buf();
    }
    return document_dir.join(label);
}

/// Convert a byte offset into a one-based character column.
fn char_column(line: &str, byte: usize) -> usize {
    let prefix = line.get(..byte).unwrap_or(line);
    return prefix.chars().count().saturating_add(1);
}

/// Whether the match ending at `end` is followed by a token boundary.
fn ends_token(text: &str, end: usize) -> bool {
    let mut rest = text.get(end..).unwrap_or("").chars();
    return match rest.next() {
        None => true,
        Some('.') => rest.next().is_none_or(char::is_whitespace),
        Some(c) => !(c.is_alphanumeric() || matches!(c, '_' | '-' | '/')),
    };
}

/// Build a file-reference hit.
fn file_hit(path: &str, kind: ReferenceKind, origin: Origin) -> Hit {
    return Hit {
        column: origin.column.unwrap_or(0),
        key: path.trim_end_matches('/').to_string(),
        reference: Reference::File(FileReference {
            kind,
            origin,
            path: path.to_string(),
            resolution: None,
        }),
    };
}

/// Whether a closing fence line matches the open marker.
fn is_closing_fence(line: &str, marker: &str) -> bool {
    let trimmed = line.trim();
    let Some(first) = marker.chars().next() else {
        return false;
    };
    return trimmed.len() >= marker.len() && trimmed.chars().all(|c| return c == first);
}

/// Whether the byte at `at` has already been consumed by an earlier pattern.
fn is_masked(masked: &str, at: usize) -> bool {
    return masked.as_bytes().get(at).is_some_and(|b| return *b == 0);
}

/// Build a link-reference hit.
fn link_hit(url: &str, origin: Origin) -> Hit {
    return Hit {
        column: origin.column.unwrap_or(0),
        key: url.to_string(),
        reference: Reference::Link(LinkReference {
            kind: classify_link(url),
            origin,
            resolution: None,
            url: url.to_string(),
        }),
    };
}

/// Blank out a byte range so later patterns skip it. Byte offsets are
/// preserved so columns still point into the original line.
fn mask(text: &mut String, range: std::ops::Range<usize>) {
    let Some(span) = text.get(range.clone()) else {
        return;
    };
    let blank = "\0".repeat(span.len());
    text.replace_range(range, &blank);
}

/// Strip an optional `"title"` and angle brackets from a link target.
fn strip_link_title(raw: &str) -> &str {
    let trimmed = raw.trim();
    let target = match trimmed.find(char::is_whitespace) {
        Some(at) => trimmed.get(..at).unwrap_or(trimmed),
        None => trimmed,
    };
    return target.trim_start_matches('<').trim_end_matches('>');
}

#[cfg(test)]
mod tests {
    use super::*;

    fn extract(content: &str) -> Extraction {
        Extractor::new().unwrap().extract(content, Path::new("docs/KNOWLEDGE.md"))
    }

    fn targets(extraction: &Extraction) -> Vec<(String, ReferenceKind)> {
        extraction
            .references
            .iter()
            .map(|r| (r.target().to_string(), r.kind()))
            .collect()
    }

    #[test]
    fn classifies_inline_links_by_scheme() {
        let found = extract(
            "[a](https://x.dev) [b](http://x.dev) [c](ftp://x.dev) [d](mailto:me@x.dev) \
             [e](guide.md#setup) [f](guide.md \"Guide\")",
        );
        assert_eq!(
            targets(&found),
            vec![
                ("https://x.dev".to_string(), ReferenceKind::Https),
                ("http://x.dev".to_string(), ReferenceKind::Http),
                ("ftp://x.dev".to_string(), ReferenceKind::Ftp),
                ("mailto:me@x.dev".to_string(), ReferenceKind::Mailto),
                ("guide.md#setup".to_string(), ReferenceKind::Anchor),
                ("guide.md".to_string(), ReferenceKind::Internal),
            ]
        );
    }

    #[test]
    fn code_spans_become_file_or_directory() {
        let found = extract("See `config.json`, `src/utils`, `lib/` and `npm install` or `.ts`.");
        assert_eq!(
            targets(&found),
            vec![
                ("config.json".to_string(), ReferenceKind::File),
                ("src/utils".to_string(), ReferenceKind::Directory),
                ("lib/".to_string(), ReferenceKind::Directory),
            ]
        );
    }

    #[test]
    fn prose_directories_and_well_known_files() {
        let found = extract("Put assets in public/images/ and edit package.json before release.");
        assert_eq!(
            targets(&found),
            vec![
                ("public/images/".to_string(), ReferenceKind::Directory),
                ("package.json".to_string(), ReferenceKind::File),
            ]
        );
    }

    #[test]
    fn autolinks_and_bare_urls() {
        let found = extract("Docs at <https://a.dev/x> and https://b.dev/y.");
        assert_eq!(
            targets(&found),
            vec![
                ("https://a.dev/x".to_string(), ReferenceKind::Https),
                ("https://b.dev/y".to_string(), ReferenceKind::Https),
            ]
        );
    }

    #[test]
    fn link_url_is_not_double_counted_as_bare_url() {
        let found = extract("[site](https://a.dev)");
        assert_eq!(found.references.len(), 1);
    }

    #[test]
    fn repeated_mentions_on_one_line_collapse() {
        let found = extract("`a.ts` then `a.ts` again\n`a.ts`");
        assert_eq!(found.references.len(), 2);
        assert_eq!(found.references[0].origin().line, 1);
        assert_eq!(found.references[1].origin().line, 2);
    }

    #[test]
    fn origin_records_column() {
        let found = extract("xx `a.ts`");
        assert_eq!(found.references[0].origin().column, Some(5));
        assert_eq!(found.references[0].origin().surrounding_text, "xx `a.ts`");
    }

    #[test]
    fn tree_block_becomes_claim_and_is_not_scanned_inline() {
        let doc = "# T\n\n```\nsrc/\n├── index.ts\n└── missing.ts\n```\n\n```js\nconst a = `x.ts`;\n```\n";
        let found = extract(doc);
        assert!(found.references.is_empty());
        assert_eq!(found.claims.len(), 1);
        let claim = &found.claims[0];
        assert_eq!(claim.origin.line, 3);
        assert_eq!(claim.lines.len(), 3);
        assert_eq!(claim.root, PathBuf::from("docs/src"));
    }

    #[test]
    fn unclosed_fence_yields_nothing() {
        let found = extract("```\n├── a.ts\n");
        assert!(found.claims.is_empty());
    }

    #[test]
    fn code_block_classification() {
        let glyphs = vec!["├── a".to_string()];
        assert_eq!(classify_code_block("", &glyphs), CodeBlock::DirectoryTree);
        assert_eq!(classify_code_block("tree", &[]), CodeBlock::DirectoryTree);
        assert_eq!(classify_code_block("rust", &["fn main() {}".to_string()]), CodeBlock::Generic);
        assert_eq!(classify_code_block("", &["street".to_string()]), CodeBlock::Generic);
    }

    #[test]
    fn extraction_is_deterministic() {
        let doc = "[x](a.md) `b/c.ts` d/e/ https://f.dev README.md\n```\n└── g.ts\n```\n";
        assert_eq!(extract(doc), extract(doc));
    }

    #[test]
    fn anchor_split() {
        let found = extract("[x](#local) [y](other.md#part)");
        let Reference::Link(local) = &found.references[0] else { panic!("expected link") };
        assert_eq!(local.split_anchor(), Some(("", "local")));
        let Reference::Link(other) = &found.references[1] else { panic!("expected link") };
        assert_eq!(other.split_anchor(), Some(("other.md", "part")));
    }
}
