//! Test execution: program invocation, per-file orchestration, batching, and
//! report formatting.

pub mod batch;
pub mod invoke;
pub mod orchestrator;
pub mod report;
