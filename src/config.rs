use std::path::Path;

use crate::error::Error;
use crate::types::Severity;

/// Default per-request timeout for web links.
const DEFAULT_TIMEOUT_MS: u64 = 5000;

/// Default number of in-flight link checks.
const DEFAULT_MAX_CONCURRENCY: usize = 8;

/// Project configuration loaded from `.knowdoc.toml`.
/// Include/exclude patterns are path prefixes applied to knowledge files.
#[derive(Debug, Clone)]
pub struct Config {
    /// Knowledge files under these prefixes are skipped.
    exclude: Vec<String>,
    /// When non-empty, only knowledge files under these prefixes are analyzed.
    include: Vec<String>,
    /// Link checking settings.
    pub links: LinkConfig,
    /// Minimum severity the fix engine acts on.
    pub severity_threshold: Severity,
}

/// Settings for the link oracle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkConfig {
    /// Whether http/https links are probed at all.
    pub check_external: bool,
    /// Upper bound on concurrent HEAD requests.
    pub max_concurrency: usize,
    /// Per-request timeout in milliseconds.
    pub timeout_ms: u64,
    /// User-Agent header sent with every probe.
    pub user_agent: String,
}

impl Default for LinkConfig {
    fn default() -> Self {
        return Self {
            check_external: true,
            max_concurrency: DEFAULT_MAX_CONCURRENCY,
            timeout_ms: DEFAULT_TIMEOUT_MS,
            user_agent: default_user_agent(),
        };
    }
}

/// Raw TOML structure for `.knowdoc.toml`.
#[derive(serde::Deserialize)]
struct KnowdocTomlConfig {
    /// Path prefixes to skip.
    #[serde(default)]
    exclude: Vec<String>,
    /// Path prefixes to scan; empty scans everything.
    #[serde(default)]
    include: Vec<String>,
    /// `[links]` table.
    #[serde(default)]
    links: RawLinkConfig,
    /// Minimum severity `fix` acts on.
    #[serde(default)]
    severity_threshold: Option<Severity>,
}

/// Raw `[links]` table. Every key is optional.
#[derive(Default, serde::Deserialize)]
struct RawLinkConfig {
    /// Probe http and https links.
    check_external: Option<bool>,
    /// Requests in flight at once.
    max_concurrency: Option<usize>,
    /// Per-request timeout.
    timeout_ms: Option<u64>,
    /// `User-Agent` header sent with probes.
    user_agent: Option<String>,
}

impl Config {
    /// Load config from `.knowdoc.toml` in the given root directory.
    /// Returns defaults if the file doesn't exist.
    /// Returns an error if the file exists but is malformed. It never silently
    /// falls back to defaults when the user wrote a config file.
    ///
    /// # Errors
    ///
    /// Returns `Error::Io` if reading fails (other than not-found),
    /// or `Error::TomlDe` if the TOML is malformed.
    pub fn load(root: &Path) -> Result<Self, Error> {
        let path = root.join(".knowdoc.toml");
        let content = match std::fs::read_to_string(&path) {
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(e) => return Err(Error::Io(e)),
            Ok(c) => c,
        };

        return Self::parse(&content);
    }

    /// Parse config from TOML text.
    ///
    /// # Errors
    ///
    /// Returns `Error::TomlDe` if the TOML is malformed.
    pub fn parse(content: &str) -> Result<Self, Error> {
        let raw: KnowdocTomlConfig = toml::from_str(content)?;
        let defaults = LinkConfig::default();
        return Ok(Self {
            exclude: raw.exclude,
            include: raw.include,
            links: LinkConfig {
                check_external: raw.links.check_external.unwrap_or(defaults.check_external),
                max_concurrency: raw
                    .links
                    .max_concurrency
                    .filter(|n| return *n > 0)
                    .unwrap_or(defaults.max_concurrency),
                timeout_ms: raw.links.timeout_ms.unwrap_or(defaults.timeout_ms),
                user_agent: raw.links.user_agent.unwrap_or(defaults.user_agent),
            },
            severity_threshold: raw.severity_threshold.unwrap_or(Severity::Low),
        });
    }

    /// Check whether a knowledge file path should be analyzed.
    ///
    /// A path is included if no include patterns are set (scan everything),
    /// or if the path starts with at least one include pattern.
    /// An included path is then excluded if it starts with any exclude pattern.
    pub fn should_scan(&self, relative_path: &str) -> bool {
        let included = self.include.is_empty()
            || self.include.iter().any(|p| return relative_path.starts_with(p.as_str()));

        if !included {
            return false;
        }

        return !self.exclude.iter().any(|p| return relative_path.starts_with(p.as_str()));
    }
}

impl Default for Config {
    /// Scan everything, check every link, fix every severity.
    fn default() -> Self {
        return Self {
            exclude: Vec::new(),
            include: Vec::new(),
            links: LinkConfig::default(),
            severity_threshold: Severity::Low,
        };
    }
}

/// `knowdoc-link-checker/<crate version>`.
fn default_user_agent() -> String {
    return format!("knowdoc-link-checker/{}", env!("CARGO_PKG_VERSION"));
}
