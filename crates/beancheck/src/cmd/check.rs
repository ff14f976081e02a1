//! The `beancheck` command.

use crate::ledger;
use crate::output;
use crate::realize::render_balances;
use crate::summary::{summarize, SummaryOptions};
use anyhow::{Context, Result};
use clap::Parser;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Summarize a beancount ledger as four lines of JSON.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// The beancount file to summarize
    #[arg(value_name = "FILE")]
    pub file: PathBuf,

    /// Also collect payees and narrations
    #[arg(long = "payeeNarration")]
    pub payee_narration: bool,

    /// Log pipeline progress to stderr
    #[arg(short, long)]
    pub verbose: bool,
}

/// Load the ledger at `path` and render its report.
///
/// # Errors
///
/// Fails when the ledger cannot be read at all. Problems inside the ledger
/// are part of the report instead.
pub fn report_lines(path: &Path, options: &SummaryOptions) -> Result<[String; 4]> {
    let ledger = ledger::load(path)
        .with_context(|| format!("failed to load {}", path.display()))?;

    let mut summary = summarize(&ledger.entries, options);
    let report = render_balances(&ledger.entries, &ledger.display_context());
    let patched = summary.apply_balance_report(&report);
    info!(
        accounts = summary.accounts.len(),
        balances = patched,
        "balances reconciled"
    );

    output::render(&ledger.errors, &summary).context("failed to serialize report")
}

fn run(args: &Args) -> Result<ExitCode> {
    let options = SummaryOptions {
        payee_narration: args.payee_narration,
    };
    let lines = report_lines(&args.file, &options)?;

    let mut stdout = io::stdout().lock();
    for line in lines {
        writeln!(stdout, "{line}")?;
    }
    stdout.flush()?;
    Ok(ExitCode::SUCCESS)
}

/// Main entry point for the summary command.
pub fn main() -> ExitCode {
    let args = Args::parse();

    // stdout carries the report, so logs go to stderr
    let default_level = if args.verbose { "debug" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();

    match run(&args) {
        Ok(exit_code) => exit_code,
        Err(e) => {
            eprintln!("error: {e:#}");
            ExitCode::from(2)
        }
    }
}
