//! Convenience re-exports for library consumers.
//!
//! ```rust,no_run
//! use worldfile_check::prelude::*;
//! ```

// Core
pub use crate::core::config::Config;
pub use crate::core::errors::{Result, WfcError};

// Extraction
pub use crate::extract::classify::{ClassifiedLine, ListKind, classify_line};
pub use crate::extract::stream::{
    ActiveList, Category, ExtractionResult, Extractor, extract_file, extract_lines,
    extract_reader,
};

// Comparison
pub use crate::compare::lists::{ComparisonOutcome, compare, lists_equal};
pub use crate::compare::render::{DiffRow, diff_rows, render_diff};

// Runner
pub use crate::runner::batch::{BatchRunner, BatchSummary, FileOutcome};
pub use crate::runner::invoke::{CapturedRun, ProgramRunner};
pub use crate::runner::orchestrator::{CategoryStatus, FileReport, TestOrchestrator};
pub use crate::runner::report::{format_outcome_human, format_report_human};

// Logger
pub use crate::logger::jsonl::{JsonlWriter, LogEntry};
