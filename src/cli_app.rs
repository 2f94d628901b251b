//! Top-level CLI definition and dispatch.

use std::io::{self, IsTerminal, Write};
use std::path::PathBuf;
use std::time::Instant;

use clap::Parser;
use colored::control;
use serde_json::Value;
use thiserror::Error;

use worldfile_check::core::config::Config;
use worldfile_check::core::errors::WfcError;
use worldfile_check::logger::jsonl::{EventType, JsonlWriter, LogEntry, Severity};
use worldfile_check::runner::batch::{BatchRunner, BatchSummary, FileOutcome};
use worldfile_check::runner::orchestrator::TestOrchestrator;
use worldfile_check::runner::report::{
    format_outcome_human, format_summary_human, outcome_json, summary_json,
};

/// Differential test harness: runs a worldfile parser against worldfiles
/// and compares its dumps with the expectations embedded in each file.
#[derive(Debug, Parser)]
#[command(
    name = "wfcheck",
    author,
    version,
    about = "Worldfile differential test harness",
    long_about = None,
    arg_required_else_help = true
)]
pub struct Cli {
    /// Worldfiles to check.
    #[arg(required = true, value_name = "FILE")]
    files: Vec<PathBuf>,
    /// Program under test (overrides `program.path`).
    #[arg(long, value_name = "PATH")]
    program: Option<PathBuf>,
    /// Extra argument passed before the worldfile path (repeatable).
    #[arg(long = "arg", value_name = "ARG", allow_hyphen_values = true)]
    args: Vec<String>,
    /// Per-file timeout in seconds; 0 disables it.
    #[arg(long, value_name = "SECS")]
    timeout: Option<u64>,
    /// Accepted program exit code (repeatable; default 0).
    #[arg(long = "allow-exit", value_name = "CODE", allow_negative_numbers = true)]
    allow_exit: Vec<i32>,
    /// Number of files checked concurrently.
    #[arg(long, value_name = "N")]
    jobs: Option<usize>,
    /// Skip sections and items once the errors check fails.
    #[arg(long)]
    fail_fast: bool,
    /// Append JSONL activity events to this file.
    #[arg(long = "log", value_name = "PATH")]
    log: Option<PathBuf>,
    /// Override config file path.
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,
    /// Force JSON output mode.
    #[arg(long)]
    json: bool,
    /// Disable colored output.
    #[arg(long)]
    no_color: bool,
    /// Increase verbosity.
    #[arg(short, long, conflicts_with = "quiet")]
    verbose: bool,
    /// Quiet mode (failures only).
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum OutputMode {
    Human,
    Json,
}

/// CLI error type with explicit exit-code mapping.
///
/// Exit code 1 is reserved for regressions, which are not errors.
#[derive(Debug, Error)]
pub enum CliError {
    /// Invalid user input or configuration.
    #[error("{0}")]
    User(String),
    /// Environment/runtime failure.
    #[error("{0}")]
    Runtime(String),
    /// Internal bug or invariant violation.
    #[error("{0}")]
    Internal(String),
    /// JSON serialization failed.
    #[error("failed to serialize output: {0}")]
    Json(#[from] serde_json::Error),
    /// Output write failed.
    #[error("failed to write output: {0}")]
    Io(#[from] io::Error),
}

impl CliError {
    /// Process exit code contract for the CLI.
    pub const fn exit_code(&self) -> i32 {
        match self {
            Self::User(_) | Self::Runtime(_) | Self::Io(_) => 2,
            Self::Internal(_) | Self::Json(_) => 3,
        }
    }
}

impl From<WfcError> for CliError {
    fn from(err: WfcError) -> Self {
        match err {
            WfcError::InvalidConfig { .. }
            | WfcError::MissingConfig { .. }
            | WfcError::ConfigParse { .. } => Self::User(err.to_string()),
            WfcError::Serialization { .. } | WfcError::Runtime { .. } => {
                Self::Internal(err.to_string())
            }
            _ => Self::Runtime(err.to_string()),
        }
    }
}

/// Check every file and return the process exit code.
pub fn run(cli: &Cli) -> Result<i32, CliError> {
    if cli.no_color {
        control::set_override(false);
    }
    let mode = output_mode(cli);
    let color = mode == OutputMode::Human && !cli.no_color && io::stdout().is_terminal();

    let mut config = Config::load(cli.config.as_deref())?;
    apply_overrides(cli, &mut config);
    config.validate()?;

    let started = Instant::now();
    let orchestrator = TestOrchestrator::from_config(&config);
    let mut log = config.paths.jsonl_log.as_ref().map(JsonlWriter::open);

    if let Some(log) = log.as_mut() {
        let mut entry = LogEntry::new(EventType::RunStart, Severity::Info);
        entry.details = Some(format!(
            "program={} files={} jobs={} config_hash={}",
            orchestrator.runner().program().display(),
            cli.files.len(),
            config.run.jobs,
            config.stable_hash().unwrap_or_default(),
        ));
        log.write_entry(&entry);
    }
    if cli.verbose {
        let timeout = orchestrator
            .runner()
            .timeout()
            .map_or_else(|| "none".to_string(), |t| format!("{}s", t.as_secs()));
        eprintln!(
            "[wfcheck] checking {} file(s) with {} (jobs={}, timeout={timeout}, config={})",
            cli.files.len(),
            orchestrator.runner().program().display(),
            config.run.jobs,
            config.paths.config_file.display(),
        );
    }

    let mut emit_error: Option<CliError> = None;
    let outcomes = BatchRunner::new(&orchestrator, config.run.jobs).run(&cli.files, |outcome| {
        if let Some(log) = log.as_mut() {
            log.write_entry(&LogEntry::for_outcome(outcome));
        }
        if cli.verbose {
            emit_verbose(outcome);
        }
        if emit_error.is_none()
            && let Err(e) = emit_outcome(mode, outcome, color, cli.quiet)
        {
            emit_error = Some(e);
        }
    });
    if let Some(e) = emit_error {
        return Err(e);
    }

    let summary = BatchSummary::from_outcomes(&outcomes);
    let elapsed_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
    if let Some(log) = log.as_mut() {
        log.write_entry(&LogEntry::for_summary(&summary, elapsed_ms));
        log.flush();
    }

    match mode {
        OutputMode::Human => {
            if let Some(text) = human_summary_text(&summary, color, cli.quiet) {
                write_stdout(&text)?;
            }
        }
        OutputMode::Json => write_json_line(&summary_json(&summary))?,
    }
    Ok(summary.exit_code())
}

/// Flags win over the config file and environment.
fn apply_overrides(cli: &Cli, config: &mut Config) {
    if let Some(program) = &cli.program {
        config.program.path.clone_from(program);
    }
    if !cli.args.is_empty() {
        config.program.args.clone_from(&cli.args);
    }
    if let Some(timeout) = cli.timeout {
        config.program.timeout_secs = timeout;
    }
    if !cli.allow_exit.is_empty() {
        config.program.expected_exit_codes.clone_from(&cli.allow_exit);
    }
    if let Some(jobs) = cli.jobs {
        config.run.jobs = jobs;
    }
    if cli.fail_fast {
        config.run.fail_fast = true;
    }
    if let Some(log) = &cli.log {
        config.paths.jsonl_log = Some(log.clone());
    }
}

fn emit_outcome(
    mode: OutputMode,
    outcome: &FileOutcome,
    color: bool,
    quiet: bool,
) -> Result<(), CliError> {
    match mode {
        OutputMode::Human => match human_outcome_text(outcome, color, quiet) {
            Some(text) => write_stdout(&text),
            None => Ok(()),
        },
        OutputMode::Json => write_json_line(&outcome_json(outcome)),
    }
}

/// Human rendering of one outcome; quiet mode drops files that passed.
fn human_outcome_text(outcome: &FileOutcome, color: bool, quiet: bool) -> Option<String> {
    (!quiet || !outcome.passed()).then(|| format_outcome_human(outcome, color))
}

/// Closing summary line; quiet mode only prints it when something failed.
fn human_summary_text(summary: &BatchSummary, color: bool, quiet: bool) -> Option<String> {
    (!quiet || !summary.all_passed()).then(|| format_summary_human(summary, color))
}

fn emit_verbose(outcome: &FileOutcome) {
    match outcome {
        FileOutcome::Completed(report) => {
            let exit = report
                .exit_code
                .map_or_else(|| "signal".to_string(), |c| c.to_string());
            eprintln!(
                "[wfcheck] {}: program exited {exit} after {}ms",
                report.path.display(),
                report.elapsed_ms
            );
        }
        FileOutcome::Infrastructure { path, code, .. } => {
            eprintln!("[wfcheck] {}: not checked ({code})", path.display());
        }
    }
}

fn write_stdout(text: &str) -> Result<(), CliError> {
    let mut stdout = io::stdout().lock();
    stdout.write_all(text.as_bytes())?;
    stdout.flush()?;
    Ok(())
}

fn write_json_line(payload: &Value) -> Result<(), CliError> {
    let mut stdout = io::stdout().lock();
    serde_json::to_writer(&mut stdout, payload)?;
    writeln!(stdout)?;
    Ok(())
}

fn output_mode(cli: &Cli) -> OutputMode {
    let env_mode = std::env::var("WFC_OUTPUT_FORMAT").ok();
    resolve_output_mode(cli.json, env_mode.as_deref(), io::stdout().is_terminal())
}

fn resolve_output_mode(json_flag: bool, env_mode: Option<&str>, stdout_is_tty: bool) -> OutputMode {
    if json_flag {
        return OutputMode::Json;
    }

    let fallback = if stdout_is_tty {
        OutputMode::Human
    } else {
        OutputMode::Json
    };

    match env_mode
        .map(str::trim)
        .map(str::to_ascii_lowercase)
        .as_deref()
    {
        Some("json") => OutputMode::Json,
        Some("human") => OutputMode::Human,
        Some(_) | None => fallback,
    }
}
