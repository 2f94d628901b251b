#![forbid(unsafe_code)]

//! worldfile_check (wfcheck): differential test harness for a worldfile
//! parser.
//!
//! Each worldfile carries its own expected output as `##` dump lines and
//! `stage error` lines. The harness runs the program under test against the
//! file, extracts the same three lists from its stdout, and compares:
//! 1. **errors**: `stage error` diagnostics
//! 2. **sections**: lines inside a `## begin sections` block
//! 3. **items**: lines inside a `## begin items` block
//!
//! # Library usage
//!
//! ```rust,no_run
//! use worldfile_check::prelude::*;
//!
//! let orchestrator = TestOrchestrator::new(ProgramRunner::new("stage"));
//! let report = orchestrator.run_file(std::path::Path::new("simple.world"))?;
//! println!("{}", format_report_human(&report, false));
//! # Ok::<(), WfcError>(())
//! ```

pub mod prelude;

pub mod compare;
pub mod core;
pub mod extract;
pub mod logger;
pub mod runner;
