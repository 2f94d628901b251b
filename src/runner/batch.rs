//! Batch execution over many worldfiles.
//!
//! Files are independent, so with `jobs > 1` they are spread over a small
//! worker pool fed by a bounded channel. Outcomes flow back over a second
//! channel and are handed to the caller's callback on the calling thread
//! only, one complete file at a time, so console output never interleaves.

#![allow(missing_docs)]

use std::path::{Path, PathBuf};
use std::thread;

use crossbeam_channel as channel;

use crate::core::errors::{Result, WfcError};
use crate::runner::orchestrator::{FileReport, TestOrchestrator};

/// What happened to one file.
#[derive(Debug, Clone)]
pub enum FileOutcome {
    /// The program ran; the report says whether each category matched.
    Completed(FileReport),
    /// The file could not be checked (unreadable input, program failure).
    Infrastructure {
        path: PathBuf,
        code: String,
        message: String,
    },
}

impl FileOutcome {
    pub fn from_result(path: &Path, result: Result<FileReport>) -> Self {
        match result {
            Ok(report) => Self::Completed(report),
            Err(err) => Self::from_error(path, &err),
        }
    }

    pub fn from_error(path: &Path, err: &WfcError) -> Self {
        Self::Infrastructure {
            path: path.to_path_buf(),
            code: err.code().to_string(),
            message: err.to_string(),
        }
    }

    pub fn path(&self) -> &Path {
        match self {
            Self::Completed(report) => &report.path,
            Self::Infrastructure { path, .. } => path,
        }
    }

    #[must_use]
    pub fn passed(&self) -> bool {
        matches!(self, Self::Completed(report) if report.passed())
    }
}

/// Aggregate counts over a batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BatchSummary {
    pub total: usize,
    pub passed: usize,
    /// Files with at least one mismatching category.
    pub failed: usize,
    /// Files that could not be checked.
    pub infrastructure: usize,
}

impl BatchSummary {
    pub fn from_outcomes<'a, I>(outcomes: I) -> Self
    where
        I: IntoIterator<Item = &'a FileOutcome>,
    {
        let mut summary = Self::default();
        for outcome in outcomes {
            summary.total += 1;
            match outcome {
                FileOutcome::Completed(report) if report.passed() => summary.passed += 1,
                FileOutcome::Completed(_) => summary.failed += 1,
                FileOutcome::Infrastructure { .. } => summary.infrastructure += 1,
            }
        }
        summary
    }

    #[must_use]
    pub const fn all_passed(&self) -> bool {
        self.failed == 0 && self.infrastructure == 0
    }

    /// 0 = all passed, 1 = regressions only, 2 = at least one file could not
    /// be checked.
    #[must_use]
    pub const fn exit_code(&self) -> i32 {
        if self.infrastructure > 0 {
            2
        } else if self.failed > 0 {
            1
        } else {
            0
        }
    }
}

/// Runs an orchestrator over a list of files.
#[derive(Debug)]
pub struct BatchRunner<'a> {
    orchestrator: &'a TestOrchestrator,
    jobs: usize,
}

impl<'a> BatchRunner<'a> {
    pub fn new(orchestrator: &'a TestOrchestrator, jobs: usize) -> Self {
        Self {
            orchestrator,
            jobs: jobs.max(1),
        }
    }

    /// Check every file, calling `on_outcome` as each one finishes.
    ///
    /// The returned outcomes are in input order regardless of completion
    /// order.
    pub fn run<F>(&self, files: &[PathBuf], mut on_outcome: F) -> Vec<FileOutcome>
    where
        F: FnMut(&FileOutcome),
    {
        let workers = self.jobs.min(files.len());
        if workers <= 1 {
            return files
                .iter()
                .map(|path| {
                    let outcome = self.check(path);
                    on_outcome(&outcome);
                    outcome
                })
                .collect();
        }

        let (work_tx, work_rx) = channel::bounded::<(usize, &Path)>(files.len());
        let (result_tx, result_rx) = channel::unbounded::<(usize, FileOutcome)>();
        for (index, path) in files.iter().enumerate() {
            let _ = work_tx.send((index, path.as_path()));
        }
        drop(work_tx);

        let mut slots: Vec<Option<FileOutcome>> = vec![None; files.len()];
        thread::scope(|scope| {
            for _ in 0..workers {
                let work_rx = work_rx.clone();
                let result_tx = result_tx.clone();
                scope.spawn(move || {
                    for (index, path) in &work_rx {
                        if result_tx.send((index, self.check(path))).is_err() {
                            break;
                        }
                    }
                });
            }
            drop(result_tx);

            for (index, outcome) in &result_rx {
                on_outcome(&outcome);
                slots[index] = Some(outcome);
            }
        });

        slots.into_iter().flatten().collect()
    }

    fn check(&self, path: &Path) -> FileOutcome {
        FileOutcome::from_result(path, self.orchestrator.run_file(path))
    }
}
