//! Per-file test orchestration: expected from the worldfile itself, actual
//! from the program's stdout, three independent list checks.

#![allow(missing_docs)]

use std::path::{Path, PathBuf};
use std::time::Instant;

use serde::Serialize;

use crate::compare::lists::{ComparisonOutcome, compare};
use crate::compare::render::{DiffRow, diff_rows};
use crate::core::config::Config;
use crate::core::errors::{Result, WfcError};
use crate::extract::stream::{Category, ExtractionResult, extract_file, extract_reader};
use crate::runner::invoke::ProgramRunner;

/// Result of one category check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum CategoryStatus {
    Pass,
    Fail { diff: Vec<DiffRow> },
    /// Not evaluated because an earlier check failed in fail-fast mode.
    Skipped,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CategoryReport {
    pub category: Category,
    #[serde(flatten)]
    pub status: CategoryStatus,
}

impl CategoryReport {
    #[must_use]
    pub const fn passed(&self) -> bool {
        matches!(self.status, CategoryStatus::Pass)
    }

    #[must_use]
    pub const fn failed(&self) -> bool {
        matches!(self.status, CategoryStatus::Fail { .. })
    }
}

/// Everything learned about one worldfile.
#[derive(Debug, Clone, Serialize)]
pub struct FileReport {
    pub path: PathBuf,
    pub categories: Vec<CategoryReport>,
    pub exit_code: Option<i32>,
    pub elapsed_ms: u64,
}

impl FileReport {
    /// True when no category failed. Skipped categories only occur after a
    /// failure, so they never make a report pass.
    #[must_use]
    pub fn passed(&self) -> bool {
        self.categories.iter().all(CategoryReport::passed)
    }

    #[must_use]
    pub fn failed_categories(&self) -> Vec<Category> {
        self.categories
            .iter()
            .filter(|c| c.failed())
            .map(|c| c.category)
            .collect()
    }

    #[must_use]
    pub fn category(&self, category: Category) -> Option<&CategoryReport> {
        self.categories.iter().find(|c| c.category == category)
    }
}

/// Compare expected against actual in the order errors, sections, items.
///
/// All three are evaluated unless `fail_fast` is set, in which case an errors
/// mismatch marks the remaining categories as skipped.
#[must_use]
pub fn check_categories(
    expected: &ExtractionResult,
    actual: &ExtractionResult,
    fail_fast: bool,
) -> Vec<CategoryReport> {
    let mut reports = Vec::with_capacity(Category::ALL.len());
    let mut halted = false;
    for category in Category::ALL {
        let status = if halted {
            CategoryStatus::Skipped
        } else {
            match compare(expected.list(category), actual.list(category)) {
                ComparisonOutcome::Equal => CategoryStatus::Pass,
                ComparisonOutcome::NotEqual { expected, actual } => CategoryStatus::Fail {
                    diff: diff_rows(expected, actual),
                },
            }
        };
        let failed = matches!(status, CategoryStatus::Fail { .. });
        if fail_fast && failed && category == Category::Errors {
            halted = true;
        }
        reports.push(CategoryReport { category, status });
    }
    reports
}

/// Drives one worldfile through extraction, invocation, and comparison.
#[derive(Debug, Clone)]
pub struct TestOrchestrator {
    runner: ProgramRunner,
    fail_fast: bool,
}

impl TestOrchestrator {
    pub fn new(runner: ProgramRunner) -> Self {
        Self {
            runner,
            fail_fast: false,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(ProgramRunner::from_config(&config.program)).with_fail_fast(config.run.fail_fast)
    }

    #[must_use]
    pub fn with_fail_fast(mut self, fail_fast: bool) -> Self {
        self.fail_fast = fail_fast;
        self
    }

    pub fn runner(&self) -> &ProgramRunner {
        &self.runner
    }

    /// Run the full check for one file.
    ///
    /// File access and program invocation failures come back as `Err`; a
    /// regression is an `Ok` report with failing categories.
    pub fn run_file(&self, path: &Path) -> Result<FileReport> {
        let started = Instant::now();
        let expected = extract_file(path)?;
        let run = self.runner.run(path)?;
        let actual = extract_reader(run.stdout.as_slice()).map_err(|e| {
            WfcError::ProgramOutput {
                program: self.runner.program().to_path_buf(),
                details: e.to_string(),
            }
        })?;

        Ok(FileReport {
            path: path.to_path_buf(),
            categories: check_categories(&expected, &actual, self.fail_fast),
            exit_code: run.exit_code,
            elapsed_ms: u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX),
        })
    }
}
