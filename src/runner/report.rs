//! Human and JSON renderings of per-file outcomes.

#![allow(missing_docs)]

use std::fmt::Write as _;

use colored::Colorize;
use serde_json::{Value, json};

use crate::compare::render::render_rows;
use crate::runner::batch::{BatchSummary, FileOutcome};
use crate::runner::orchestrator::{CategoryStatus, FileReport};

/// Width the category column is padded to, so verdicts line up.
const CATEGORY_WIDTH: usize = 8;

/// One `path : category : verdict` line per category, with the diff printed
/// beneath each failure.
#[must_use]
pub fn format_report_human(report: &FileReport, color: bool) -> String {
    let path = report.path.display();
    let mut out = String::new();
    for entry in &report.categories {
        let label = entry.category.label();
        let verdict = match &entry.status {
            CategoryStatus::Pass => paint("pass", color, |s| s.green().to_string()),
            CategoryStatus::Fail { .. } => paint("fail", color, |s| s.white().on_red().to_string()),
            CategoryStatus::Skipped => paint("skipped", color, |s| s.yellow().to_string()),
        };
        let _ = writeln!(out, "{path} : {label:<CATEGORY_WIDTH$} : {verdict}");
        if let CategoryStatus::Fail { diff } = &entry.status {
            out.push_str(&render_rows(diff, color));
        }
    }
    out
}

/// Render any outcome for humans. Files that could not be checked at all get
/// a single `error` line; the message already carries the failure code.
#[must_use]
pub fn format_outcome_human(outcome: &FileOutcome, color: bool) -> String {
    match outcome {
        FileOutcome::Completed(report) => format_report_human(report, color),
        FileOutcome::Infrastructure { path, message, .. } => {
            let tag = paint(&format!("{:<CATEGORY_WIDTH$}", "error"), color, |s| {
                s.red().bold().to_string()
            });
            format!("{} : {tag} : {message}\n", path.display())
        }
    }
}

/// Closing line of a human run.
#[must_use]
pub fn format_summary_human(summary: &BatchSummary, color: bool) -> String {
    let verdict = if summary.all_passed() {
        paint("PASS", color, |s| s.green().bold().to_string())
    } else {
        paint("FAIL", color, |s| s.red().bold().to_string())
    };
    format!(
        "{verdict}: {} file(s), {} passed, {} failed, {} error(s)\n",
        summary.total, summary.passed, summary.failed, summary.infrastructure
    )
}

/// JSON record for one file.
#[must_use]
pub fn outcome_json(outcome: &FileOutcome) -> Value {
    match outcome {
        FileOutcome::Completed(report) => json!({
            "path": report.path.display().to_string(),
            "result": if report.passed() { "pass" } else { "fail" },
            "exit_code": report.exit_code,
            "elapsed_ms": report.elapsed_ms,
            "categories": report.categories,
        }),
        FileOutcome::Infrastructure { path, code, message } => json!({
            "path": path.display().to_string(),
            "result": "error",
            "error": { "code": code, "message": message },
        }),
    }
}

#[must_use]
pub fn summary_json(summary: &BatchSummary) -> Value {
    json!({
        "summary": {
            "files": summary.total,
            "passed": summary.passed,
            "failed": summary.failed,
            "errors": summary.infrastructure,
            "ok": summary.all_passed(),
        }
    })
}

fn paint(text: &str, color: bool, style: impl Fn(&str) -> String) -> String {
    if color { style(text) } else { text.to_string() }
}
