mod analyzer;
mod changes;
mod commands;
mod config;
mod describe;
mod diagnostics;
mod diff;
mod error;
mod extractor;
mod fixer;
mod fs_oracle;
mod grammar;
mod knowledge;
mod link_oracle;
mod markdown;
mod report;
mod sections;
mod types;
mod validate;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use crate::types::Severity;

/// Exit code for a run that could not complete.
const EXIT_RUNTIME_ERROR: u8 = 3;

#[derive(Parser)]
#[command(name = "knowdoc", version, about = "Validate and repair per-directory knowledge files")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
    /// Log debug output to stderr (`RUST_LOG` takes precedence)
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Report documentation issues in every knowledge file
    Analyze {
        /// Project root
        #[arg(default_value = ".")]
        root: PathBuf,
        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },
    /// Apply fixes for documentation issues
    Fix {
        /// Print what would change without writing
        #[arg(long)]
        dry_run: bool,
        /// Project root
        #[arg(default_value = ".")]
        root: PathBuf,
        /// Only fix issues at or above this severity
        #[arg(long, value_enum)]
        severity: Option<Severity>,
        /// Apply every fix without asking
        #[arg(short, long)]
        yes: bool,
    },
    /// Merge a generated knowledge file into an existing one
    Merge {
        /// Print the diff without writing
        #[arg(long)]
        dry_run: bool,
        /// Knowledge file to update
        existing: PathBuf,
        /// Freshly generated document
        generated: PathBuf,
    },
    /// Check every file path, link, anchor and directory tree
    Validate {
        /// Print the report as JSON
        #[arg(long)]
        json: bool,
        /// Skip http and https links
        #[arg(long)]
        offline: bool,
        /// Project root
        #[arg(default_value = ".")]
        root: PathBuf,
        /// Per-request timeout for web links, in milliseconds
        #[arg(long)]
        timeout_ms: Option<u64>,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let result = match cli.command {
        Commands::Analyze { json, root } => commands::analyze(&root, json),
        Commands::Fix { dry_run, root, severity, yes } => commands::fix(&root, dry_run, severity, yes),
        Commands::Merge { dry_run, existing, generated } => commands::merge(&existing, &generated, dry_run),
        Commands::Validate { json, offline, root, timeout_ms } => {
            commands::validate(&root, offline, timeout_ms, json)
        },
    };

    return match result {
        Ok(code) => code,
        Err(e) => {
            diagnostics::print_error(&e);
            ExitCode::from(EXIT_RUNTIME_ERROR)
        },
    };
}

/// Send `tracing` output to stderr. `RUST_LOG` wins; otherwise `-v` selects
/// debug and the default is warn.
fn init_logging(verbose: bool) {
    let fallback = if verbose { "knowdoc=debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| return EnvFilter::new(fallback));
    tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr).with_target(false).init();
}
