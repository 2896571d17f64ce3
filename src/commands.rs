//! CLI commands for knowdoc: analyze, validate, fix, merge.
//!
//! Each command loads config, discovers knowledge files, hands every file to
//! the engine modules and prints one report on stdout. Per-file failures are
//! already folded into issues by the engines; only root- or config-level
//! failures come back as `Err`.

use std::path::Path;
use std::process::ExitCode;

use chrono::Local;
use dialoguer::Confirm;
use tracing::{debug, info, warn};

use crate::analyzer::Analyzer;
use crate::changes::FallbackChangeSource;
use crate::config::Config;
use crate::describe::HeuristicDescriber;
use crate::diff::LineDiff;
use crate::error::Error;
use crate::extractor::Extractor;
use crate::fixer::{self, FixOptions};
use crate::knowledge;
use crate::link_oracle::{LinkOracle, ReqwestProbe};
use crate::report::{self, BatchReport, ValidationReport};
use crate::sections::merge_sections;
use crate::types::{DocumentationIssue, Severity};
use crate::validate::Validator;

/// Unchanged lines shown around each change in printed diffs.
const DIFF_CONTEXT: usize = 3;

/// Analyze every knowledge file under `root` and print the batch report.
///
/// # Errors
///
/// Returns `Error::RootUnreadable` if `root` cannot be listed, or a config
/// error if `.knowdoc.toml` is malformed.
pub fn analyze(root: &Path, json: bool) -> Result<ExitCode, Error> {
    let config = Config::load(root)?;
    let files = knowledge::discover(root, &config)?;
    info!(root = %root.display(), files = files.len(), "analyzing knowledge files");

    let analyzer = build_analyzer(root)?;
    let analyses: Vec<_> = files.iter().map(|file| return analyzer.analyze(file)).collect();
    let report = BatchReport::new(root, &analyses, None);

    if json {
        println!("{}", report.to_json()?);
    } else {
        for analysis in &analyses {
            println!("{}", report::analysis_details(root, analysis));
        }
        print!("{}", report.to_markdown());
    }
    return Ok(ExitCode::from(report.exit_code()));
}

/// Validate every reference in every knowledge file under `root`.
///
/// `offline` skips web links; `timeout_ms` overrides the configured
/// per-request timeout.
///
/// # Errors
///
/// Returns `Error::RootUnreadable`, a config error, `Error::Io` if the async
/// runtime cannot start, or `Error::Http` if the HTTP client cannot be built.
pub fn validate(root: &Path, offline: bool, timeout_ms: Option<u64>, json: bool) -> Result<ExitCode, Error> {
    let config = Config::load(root)?;
    let files = knowledge::discover(root, &config)?;

    let mut links = config.links;
    if offline {
        links.check_external = false;
    }
    if let Some(ms) = timeout_ms {
        links.timeout_ms = ms;
    }
    info!(
        root = %root.display(),
        files = files.len(),
        check_external = links.check_external,
        "validating references"
    );

    let probe = ReqwestProbe::new(&links)?;
    let oracle = LinkOracle::new(Box::new(probe), &links, root)?;
    let validator = Validator::new(Extractor::new()?, oracle, root);

    let runtime = tokio::runtime::Builder::new_current_thread().enable_all().build()?;
    let results = runtime.block_on(async {
        let mut results = Vec::with_capacity(files.len());
        for file in &files {
            results.push(validator.validate(file).await);
        }
        return results;
    });

    let report = ValidationReport::new(root, results);
    if json {
        println!("{}", report.to_json()?);
    } else {
        print!("{}", report.to_markdown());
    }
    return Ok(ExitCode::from(report.exit_code()));
}

/// Analyze, then apply fixes at or above the severity threshold.
///
/// Without `yes`, each edit is shown and confirmed on the terminal. With
/// `dry_run`, the diff of what would change is printed and nothing is
/// written.
///
/// # Errors
///
/// Returns `Error::RootUnreadable` if `root` cannot be listed, or a config
/// error if `.knowdoc.toml` is malformed.
pub fn fix(root: &Path, dry_run: bool, severity: Option<Severity>, yes: bool) -> Result<ExitCode, Error> {
    let config = Config::load(root)?;
    let files = knowledge::discover(root, &config)?;
    let options = FixOptions {
        auto_approve: yes,
        dry_run,
        severity_threshold: severity.unwrap_or(config.severity_threshold),
        today: Local::now().date_naive(),
    };
    info!(
        root = %root.display(),
        files = files.len(),
        threshold = options.severity_threshold.as_str(),
        dry_run,
        "fixing knowledge files"
    );

    let analyzer = build_analyzer(root)?.with_today(options.today);
    let mut analyses = Vec::with_capacity(files.len());
    let mut summaries = Vec::with_capacity(files.len());
    for file in &files {
        let analysis = analyzer.analyze(file);
        let outcome = fixer::apply_fixes(&analysis, &options, &mut confirm_fix);
        if let Some(diff) = &outcome.diff {
            let shown = file.strip_prefix(root).unwrap_or(file);
            println!("--- {}", shown.display());
            print!("{}", diff.render(DIFF_CONTEXT));
            println!();
        }
        summaries.push(outcome.summary);
        analyses.push(analysis);
    }

    let report = BatchReport::new(root, &analyses, Some(&summaries));
    print!("{}", report.to_markdown());
    if dry_run {
        println!("\nDry run: no files were written.");
    }

    let code = if report.fixes_skipped > 0 { report::EXIT_ISSUES } else { report::EXIT_CLEAN };
    return Ok(ExitCode::from(code));
}

/// Merge a generated document into an existing knowledge file.
///
/// Prints the diff; writes `existing` unless `dry_run` is set.
///
/// # Errors
///
/// Returns `Error::FileNotFound` if either file is missing, or `Error::Io`
/// if reading or writing fails.
pub fn merge(existing: &Path, generated: &Path, dry_run: bool) -> Result<ExitCode, Error> {
    let old = read_required(existing)?;
    let new = read_required(generated)?;

    let merged = merge_sections(&old, &new);
    let diff = LineDiff::compute(&old, &merged);
    if !diff.has_changes() {
        println!("{} is already up to date", existing.display());
        return Ok(ExitCode::SUCCESS);
    }

    print!("{}", diff.render(DIFF_CONTEXT));
    println!("\n{} added, {} removed", diff.added(), diff.removed());
    if dry_run {
        println!("Dry run: {} not written.", existing.display());
        return Ok(ExitCode::SUCCESS);
    }

    // Write exactly what the printed diff shows.
    std::fs::write(existing, diff.apply(&old).unwrap_or(merged))?;
    info!(file = %existing.display(), "merged");
    return Ok(ExitCode::SUCCESS);
}

// ── Helpers ───────────────────────────────────────────────────────────

/// Analyzer backed by git history (mtime fallback) and heuristic descriptions.
///
/// # Errors
///
/// Returns `Error::Regex` if a built-in pattern fails to compile.
fn build_analyzer(root: &Path) -> Result<Analyzer, Error> {
    return Analyzer::new(
        Box::new(FallbackChangeSource::default()),
        Box::new(HeuristicDescriber::new()?),
        root,
    );
}

/// Show one pending edit on stderr and ask whether to apply it. A prompt
/// that cannot be shown counts as "no".
fn confirm_fix(issue: &DocumentationIssue, diff: &LineDiff) -> bool {
    eprintln!("\n[{}] {}", issue.severity.as_str(), issue.description);
    eprint!("{}", diff.render(1));
    let answer = Confirm::new().with_prompt("Apply this fix?").default(false).interact();
    return match answer {
        Ok(approved) => {
            debug!(approved, issue = %issue.description, "fix prompt answered");
            approved
        },
        Err(e) => {
            warn!(error = %Error::from(e), "cannot prompt, skipping fix");
            false
        },
    };
}

/// Read a file named on the command line.
///
/// # Errors
///
/// Returns `Error::FileNotFound` if the file does not exist, or `Error::Io`
/// for any other read failure.
fn read_required(path: &Path) -> Result<String, Error> {
    return match std::fs::read_to_string(path) {
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(Error::FileNotFound { path: path.to_path_buf() }),
        Err(e) => Err(Error::Io(e)),
        Ok(content) => Ok(content),
    };
}
