//! Reference validation for one document: extract, then resolve every
//! reference against the filesystem or the network, then check tree claims.

use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{debug, trace};

use crate::extractor::Extractor;
use crate::fs_oracle;
use crate::link_oracle::LinkOracle;
use crate::types::{LinkReference, Reference, ValidationIssue, ValidationKind, ValidationSeverity};

/// Findings for one document.
#[derive(Debug, Clone, Serialize)]
pub struct DocumentValidation {
    /// Directory-tree claims checked.
    pub claims_checked: usize,
    /// The document.
    pub file_path: PathBuf,
    /// Findings, top to bottom in source order.
    pub issues: Vec<ValidationIssue>,
    /// References checked.
    pub references_checked: usize,
}

impl DocumentValidation {
    /// Number of issues at `severity`.
    pub fn count(&self, severity: ValidationSeverity) -> usize {
        return self.issues.iter().filter(|i| return i.severity == severity).count();
    }
}

/// Validates documents inside one project.
pub struct Validator {
    /// Reference extraction patterns.
    extractor: Extractor,
    /// Network, mailto and anchor checks.
    links: LinkOracle,
    /// Root for `/`-prefixed paths.
    project_root: PathBuf,
}

impl Validator {
    /// Combine an extractor and a link oracle for `project_root`.
    pub fn new(extractor: Extractor, links: LinkOracle, project_root: &Path) -> Self {
        return Self { extractor, links, project_root: project_root.to_path_buf() };
    }

    /// Validate every reference and tree claim in `document`. Never fails:
    /// an unreadable document becomes a single error-level issue.
    pub async fn validate(&self, document: &Path) -> DocumentValidation {
        let content = match std::fs::read_to_string(document) {
            Ok(content) => content,
            Err(e) => {
                let issue = ValidationIssue {
                    kind: ValidationKind::InvalidPath,
                    line: None,
                    message: format!("Cannot read document: {e}"),
                    severity: ValidationSeverity::Error,
                    suggestion: None,
                    target: document.display().to_string(),
                };
                return DocumentValidation {
                    claims_checked: 0,
                    file_path: document.to_path_buf(),
                    issues: vec![issue],
                    references_checked: 0,
                };
            },
        };

        let extraction = self.extractor.extract(&content, document);
        let references_checked = extraction.references.len();

        let mut links: Vec<LinkReference> = extraction
            .references
            .iter()
            .filter_map(|r| {
                return match r {
                    Reference::Link(link) => Some(link.clone()),
                    Reference::File(_) => None,
                };
            })
            .collect();
        let mut verdicts = self.links.validate_all(&mut links, document, &content).await.into_iter();

        let mut issues = Vec::new();
        for reference in extraction.references {
            trace!(
                reference = reference.target(),
                kind = reference.kind().as_str(),
                line = reference.origin().line,
                "checking reference"
            );
            match reference {
                Reference::File(mut file) => {
                    issues.extend(fs_oracle::validate_reference(&mut file, document, &self.project_root));
                },
                Reference::Link(_) => {
                    if let Some(verdict) = verdicts.next() {
                        issues.extend(verdict.issues);
                    }
                },
            }
        }

        let claims_checked = extraction.claims.len();
        for claim in &extraction.claims {
            issues.extend(fs_oracle::validate_structure(claim));
        }
        // Claims sit inside fences, references outside; a stable sort by line
        // interleaves them while keeping left-to-right order within a line.
        issues.sort_by_key(|i| return i.line.unwrap_or(0));

        debug!(
            file = %document.display(),
            references = references_checked,
            claims = claims_checked,
            issues = issues.len(),
            "validated"
        );
        return DocumentValidation {
            claims_checked,
            file_path: document.to_path_buf(),
            issues,
            references_checked,
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LinkConfig;
    use crate::link_oracle::{HttpProbe, ProbeOutcome};

    struct AlwaysOk;

    #[async_trait::async_trait]
    impl HttpProbe for AlwaysOk {
        async fn head(&self, _url: &str) -> ProbeOutcome {
            ProbeOutcome::Status(200)
        }
    }

    fn validator(root: &Path) -> Validator {
        let links = LinkOracle::new(Box::new(AlwaysOk), &LinkConfig::default(), root).unwrap();
        Validator::new(Extractor::new().unwrap(), links, root)
    }

    #[tokio::test]
    async fn mixed_document_reports_in_source_order() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        std::fs::create_dir_all(root.join("src")).unwrap();
        std::fs::write(root.join("src/index.ts"), "").unwrap();
        std::fs::write(root.join("config.yaml"), "").unwrap();
        std::fs::write(root.join("guide.md"), "# Guide\n\n## Usage\n").unwrap();
        let doc = [
            "# Project",
            "",
            "Edit `config.json` before running.",
            "See [setup](guide.md#setup) and [home](https://example.com).",
            "",
            "```",
            ".",
            "└── src/",
            "    ├── index.ts",
            "    └── missing.ts",
            "```",
            "Mail [us](mailto:broken).",
            "",
        ]
        .join("\n");
        std::fs::write(root.join("README.md"), doc).unwrap();

        let result = validator(root).validate(&root.join("README.md")).await;
        let kinds: Vec<(ValidationKind, Option<usize>)> = result.issues.iter().map(|i| (i.kind, i.line)).collect();
        assert_eq!(
            kinds,
            vec![
                (ValidationKind::MissingFile, Some(3)),
                (ValidationKind::MissingAnchor, Some(4)),
                (ValidationKind::MissingFile, Some(10)),
                (ValidationKind::InvalidEmail, Some(12)),
            ]
        );
        assert!(result.issues[0].suggestion.as_deref().unwrap().contains("config.yaml"));
        assert_eq!(result.issues[2].severity, ValidationSeverity::Warning);
        assert_eq!(result.claims_checked, 1);
        assert_eq!(result.count(ValidationSeverity::Error), 3);
    }

    #[tokio::test]
    async fn unreadable_document_is_one_error() {
        let dir = tempfile::tempdir().unwrap();
        let result = validator(dir.path()).validate(&dir.path().join("nope.md")).await;
        assert_eq!(result.issues.len(), 1);
        assert_eq!(result.issues[0].kind, ValidationKind::InvalidPath);
    }
}
