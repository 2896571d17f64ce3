//! Link oracle: resolves web, mailto, internal and anchor links.
//!
//! Web links are probed with a single HEAD request each: 2xx is valid, 4xx is
//! a permanent error, anything else (other statuses, timeouts, network
//! failures) is a warning because it may be transient. No retries happen
//! here; callers that want retries compose them on top.

use std::path::{Path, PathBuf};
use std::time::Duration;

use futures::StreamExt as _;
use regex::Regex;
use tracing::{debug, warn};

use crate::config::LinkConfig;
use crate::error::Error;
use crate::fs_oracle;
use crate::markdown;
use crate::types::{LinkReference, ReferenceKind, Resolution, ValidationIssue, ValidationKind, ValidationSeverity};

/// What a single HEAD probe observed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProbeOutcome {
    /// The request never produced a status (DNS, TLS, connection, ...).
    Failed(String),
    /// The server answered with this status code.
    Status(u16),
}

/// Anything that can answer "what does a HEAD request to this URL return".
#[async_trait::async_trait]
pub trait HttpProbe: Send + Sync {
    /// Issue one HEAD request.
    async fn head(&self, url: &str) -> ProbeOutcome;
}

/// `reqwest`-backed probe with a fixed User-Agent and timeout.
pub struct ReqwestProbe {
    /// Shared connection pool.
    client: reqwest::Client,
}

impl ReqwestProbe {
    /// Build a client from link settings.
    ///
    /// # Errors
    ///
    /// Returns `Error::Http` if the TLS backend cannot be initialized.
    pub fn new(config: &LinkConfig) -> Result<Self, Error> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .user_agent(config.user_agent.clone())
            .build()?;
        return Ok(Self { client });
    }
}

#[async_trait::async_trait]
impl HttpProbe for ReqwestProbe {
    async fn head(&self, url: &str) -> ProbeOutcome {
        return match self.client.head(url).send().await {
            Err(e) => ProbeOutcome::Failed(e.to_string()),
            Ok(response) => ProbeOutcome::Status(response.status().as_u16()),
        };
    }
}

/// Verdict for one link.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkValidation {
    /// Findings, empty when the link is valid.
    pub issues: Vec<ValidationIssue>,
    /// Whether the link resolved.
    pub valid: bool,
}

impl LinkValidation {
    /// A link with nothing to report.
    const fn ok() -> Self {
        return Self { issues: Vec::new(), valid: true };
    }

    /// A link with one finding.
    fn failed(issue: ValidationIssue) -> Self {
        return Self { issues: vec![issue], valid: false };
    }
}

/// Validates links found in one project.
pub struct LinkOracle {
    /// Whether http/https links are probed at all.
    check_external: bool,
    /// Minimal `local@domain.tld` shape.
    email: Regex,
    /// Upper bound on in-flight probes.
    max_concurrency: usize,
    /// Network access.
    probe: Box<dyn HttpProbe>,
    /// Root for `/`-prefixed paths.
    project_root: PathBuf,
    /// Per-request deadline.
    timeout: Duration,
}

impl LinkOracle {
    /// Build an oracle around a probe.
    ///
    /// # Errors
    ///
    /// Returns `Error::Regex` if the email pattern fails to compile.
    pub fn new(probe: Box<dyn HttpProbe>, config: &LinkConfig, project_root: &Path) -> Result<Self, Error> {
        return Ok(Self {
            check_external: config.check_external,
            email: Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s.]+$")?,
            max_concurrency: config.max_concurrency.max(1),
            probe,
            project_root: project_root.to_path_buf(),
            timeout: Duration::from_millis(config.timeout_ms),
        });
    }

    /// Validate a link found in `document`, whose full text is
    /// `document_text`. Fills the link's resolution slot.
    pub async fn validate(&self, link: &mut LinkReference, document: &Path, document_text: &str) -> LinkValidation {
        let (verdict, resolution) = match link.kind {
            ReferenceKind::Http | ReferenceKind::Https => self.validate_web(link).await,
            ReferenceKind::Anchor => self.validate_anchor(link, document, document_text),
            ReferenceKind::Internal => self.validate_internal(link, document),
            ReferenceKind::Mailto => self.validate_mailto(link),
            // Reported valid without probing: FTP depth is not implemented.
            ReferenceKind::Directory | ReferenceKind::File | ReferenceKind::Ftp | ReferenceKind::Unknown => {
                (LinkValidation::ok(), Resolution { exists: true, ..Resolution::default() })
            },
        };
        debug!(url = %link.url, valid = verdict.valid, "link checked");
        link.resolution = Some(resolution);
        return verdict;
    }

    /// Validate every link in order, with at most `max_concurrency` in
    /// flight. Results line up with `links`.
    pub async fn validate_all(
        &self,
        links: &mut [LinkReference],
        document: &Path,
        document_text: &str,
    ) -> Vec<LinkValidation> {
        return futures::stream::iter(links.iter_mut())
            .map(|link| return self.validate(link, document, document_text))
            .buffered(self.max_concurrency)
            .collect()
            .await;
    }

    /// Anchor link: resolve the target document (self when the file part is
    /// empty) and look for a heading whose slug matches.
    fn validate_anchor(&self, link: &LinkReference, document: &Path, document_text: &str) -> (LinkValidation, Resolution) {
        let (file_part, anchor) = link.split_anchor().unwrap_or((link.url.as_str(), ""));
        let file_part = strip_query(file_part);

        let (target_path, target_text) = if file_part.is_empty() {
            (document.to_path_buf(), document_text.to_string())
        } else {
            let check = fs_oracle::check_path(file_part, ReferenceKind::Unknown, document, &self.project_root);
            if !check.exists {
                let issue = missing_target_issue(link, file_part, &check.suggestions);
                return (LinkValidation::failed(issue), not_found(check.resolved_path));
            }
            if !is_markdown(&check.resolved_path) || check.resolved_path.is_dir() {
                // Line anchors into code and similar fragments are not checked.
                return (LinkValidation::ok(), found(check.resolved_path));
            }
            let Ok(text) = std::fs::read_to_string(&check.resolved_path) else {
                let issue = ValidationIssue {
                    kind: ValidationKind::InvalidPath,
                    line: Some(link.origin.line),
                    message: format!("Cannot read `{file_part}` to check anchor `#{anchor}`"),
                    severity: ValidationSeverity::Warning,
                    suggestion: None,
                    target: link.url.clone(),
                };
                return (LinkValidation::failed(issue), found(check.resolved_path));
            };
            (check.resolved_path, text)
        };

        let headings = match markdown::atx_headings(&target_path, &target_text) {
            Ok(h) => h,
            Err(e) => {
                warn!(file = %target_path.display(), error = %e, "heading extraction failed");
                Vec::new()
            },
        };
        let wanted = markdown::slugify(anchor);
        if headings.iter().any(|h| return markdown::slugify(&h.text) == wanted) {
            return (LinkValidation::ok(), found(target_path));
        }

        let needle = anchor.replace('-', " ").to_lowercase();
        let similar: Vec<String> = headings
            .iter()
            .filter(|h| {
                let lower = h.text.to_lowercase();
                return lower.contains(&needle) || markdown::slugify(&h.text).contains(&wanted);
            })
            .map(|h| return format!("#{} ({})", markdown::slugify(&h.text), h.text))
            .collect();
        let shown = if file_part.is_empty() { "this document" } else { file_part };
        let suggestion = if similar.is_empty() {
            format!("Check the headings available in {shown}")
        } else {
            format!("Did you mean: {}?", similar.join(", "))
        };

        let issue = ValidationIssue {
            kind: ValidationKind::MissingAnchor,
            line: Some(link.origin.line),
            message: format!("No heading in {shown} matches anchor `#{anchor}`"),
            severity: ValidationSeverity::Error,
            suggestion: Some(suggestion),
            target: link.url.clone(),
        };
        let mut resolution = found(target_path);
        resolution.error_message = Some(issue.message.clone());
        return (LinkValidation::failed(issue), resolution);
    }

    /// Same-repo link without a fragment: the target path must exist.
    fn validate_internal(&self, link: &LinkReference, document: &Path) -> (LinkValidation, Resolution) {
        let path = strip_query(link.url.split('#').next().unwrap_or(&link.url));
        let check = fs_oracle::check_path(path, ReferenceKind::Unknown, document, &self.project_root);
        if check.exists {
            return (LinkValidation::ok(), found(check.resolved_path));
        }
        let issue = missing_target_issue(link, path, &check.suggestions);
        return (LinkValidation::failed(issue), not_found(check.resolved_path));
    }

    /// Shape check only; deliverability is never tested.
    fn validate_mailto(&self, link: &LinkReference) -> (LinkValidation, Resolution) {
        let address = link.url.get("mailto:".len()..).unwrap_or("");
        let address = address.split('?').next().unwrap_or(address);
        if self.email.is_match(address) {
            return (LinkValidation::ok(), Resolution { exists: true, ..Resolution::default() });
        }
        let issue = ValidationIssue {
            kind: ValidationKind::InvalidEmail,
            line: Some(link.origin.line),
            message: format!("`{address}` is not a valid email address"),
            severity: ValidationSeverity::Error,
            suggestion: None,
            target: link.url.clone(),
        };
        let resolution = Resolution {
            error_message: Some(issue.message.clone()),
            ..Resolution::default()
        };
        return (LinkValidation::failed(issue), resolution);
    }

    /// One HEAD request, bounded by the configured timeout.
    async fn validate_web(&self, link: &LinkReference) -> (LinkValidation, Resolution) {
        if !self.check_external {
            let resolution = Resolution {
                error_message: Some("external links not checked".to_string()),
                exists: true,
                ..Resolution::default()
            };
            return (LinkValidation::ok(), resolution);
        }

        let outcome = match tokio::time::timeout(self.timeout, self.probe.head(&link.url)).await {
            Err(_elapsed) => ProbeOutcome::Failed(format!("timed out after {}ms", self.timeout.as_millis())),
            Ok(outcome) => outcome,
        };

        let (severity, message, status_code) = match outcome {
            ProbeOutcome::Status(code) if (200..300).contains(&code) => {
                let resolution = Resolution { exists: true, status_code: Some(code), ..Resolution::default() };
                return (LinkValidation::ok(), resolution);
            },
            ProbeOutcome::Status(code) if (400..500).contains(&code) => {
                (ValidationSeverity::Error, format!("HTTP {code}"), Some(code))
            },
            ProbeOutcome::Status(code) => (ValidationSeverity::Warning, format!("HTTP {code}"), Some(code)),
            ProbeOutcome::Failed(reason) => {
                warn!(url = %link.url, %reason, "link probe failed");
                (ValidationSeverity::Warning, reason, None)
            },
        };

        let issue = ValidationIssue {
            kind: ValidationKind::BrokenLink,
            line: Some(link.origin.line),
            message: format!("Link `{}` failed: {message}", link.url),
            severity,
            suggestion: None,
            target: link.url.clone(),
        };
        let resolution = Resolution {
            error_message: Some(message),
            exists: false,
            resolved_path: None,
            status_code,
        };
        return (LinkValidation::failed(issue), resolution);
    }
}

/// Resolution for an existing local target.
fn found(path: PathBuf) -> Resolution {
    return Resolution {
        error_message: None,
        exists: true,
        resolved_path: Some(path),
        status_code: None,
    };
}

/// Whether a path names a markdown document.
fn is_markdown(path: &Path) -> bool {
    return path
        .extension()
        .and_then(|e| return e.to_str())
        .is_some_and(|e| return e.eq_ignore_ascii_case("md") || e.eq_ignore_ascii_case("markdown"));
}

/// Missing local link target, with sibling suggestions when available.
fn missing_target_issue(link: &LinkReference, path: &str, suggestions: &[String]) -> ValidationIssue {
    return ValidationIssue {
        kind: ValidationKind::MissingFile,
        line: Some(link.origin.line),
        message: format!("Link target `{path}` does not exist"),
        severity: ValidationSeverity::Error,
        suggestion: fs_oracle::suggestion_text(suggestions),
        target: link.url.clone(),
    };
}

/// Resolution for a missing local target.
fn not_found(path: PathBuf) -> Resolution {
    return Resolution {
        error_message: Some("target not found".to_string()),
        exists: false,
        resolved_path: Some(path),
        status_code: None,
    };
}

/// Drop a `?query` suffix from a local path.
fn strip_query(path: &str) -> &str {
    return path.split('?').next().unwrap_or(path);
}
