//! WFC-prefixed error types with structured error codes.

#![allow(missing_docs)]

use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use thiserror::Error;

/// Shared `Result` alias for the project.
pub type Result<T> = std::result::Result<T, WfcError>;

/// Top-level error type for the worldfile regression harness.
///
/// A regression is a report outcome, not an error, so it has no variant here.
#[derive(Debug, Error)]
pub enum WfcError {
    #[error("[WFC-1001] invalid configuration: {details}")]
    InvalidConfig { details: String },

    #[error("[WFC-1002] missing configuration file: {path}")]
    MissingConfig { path: PathBuf },

    #[error("[WFC-1003] configuration parse failure in {context}: {details}")]
    ConfigParse {
        context: &'static str,
        details: String,
    },

    #[error("[WFC-2001] cannot read input file {path}: {source}")]
    FileAccess {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("[WFC-2101] serialization failure in {context}: {details}")]
    Serialization {
        context: &'static str,
        details: String,
    },

    #[error("[WFC-3001] program invocation failed: cannot launch {program}: {source}")]
    ProgramLaunch {
        program: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("[WFC-3002] program invocation failed: {program} exited with {status}{}", stderr_suffix(.stderr_tail))]
    ProgramStatus {
        program: PathBuf,
        status: String,
        stderr_tail: String,
    },

    #[error("[WFC-3003] program timed out: {program} still running after {}s", .timeout.as_secs())]
    ProgramTimeout { program: PathBuf, timeout: Duration },

    #[error("[WFC-3004] program invocation failed: output of {program} unavailable: {details}")]
    ProgramOutput { program: PathBuf, details: String },

    #[error("[WFC-3101] IO failure at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("[WFC-3900] runtime failure: {details}")]
    Runtime { details: String },
}

/// Broad failure class used by reports and exit-code mapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// Input file missing or unreadable.
    FileAccess,
    /// The external program could not be run to completion.
    ProgramInvocation,
    /// Configuration problems.
    Config,
    /// Anything else.
    Internal,
}

impl WfcError {
    /// Stable machine-parseable error code.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::InvalidConfig { .. } => "WFC-1001",
            Self::MissingConfig { .. } => "WFC-1002",
            Self::ConfigParse { .. } => "WFC-1003",
            Self::FileAccess { .. } => "WFC-2001",
            Self::Serialization { .. } => "WFC-2101",
            Self::ProgramLaunch { .. } => "WFC-3001",
            Self::ProgramStatus { .. } => "WFC-3002",
            Self::ProgramTimeout { .. } => "WFC-3003",
            Self::ProgramOutput { .. } => "WFC-3004",
            Self::Io { .. } => "WFC-3101",
            Self::Runtime { .. } => "WFC-3900",
        }
    }

    #[must_use]
    pub const fn kind(&self) -> FailureKind {
        match self {
            Self::FileAccess { .. } => FailureKind::FileAccess,
            Self::ProgramLaunch { .. }
            | Self::ProgramStatus { .. }
            | Self::ProgramTimeout { .. }
            | Self::ProgramOutput { .. } => FailureKind::ProgramInvocation,
            Self::InvalidConfig { .. } | Self::MissingConfig { .. } | Self::ConfigParse { .. } => {
                FailureKind::Config
            }
            Self::Serialization { .. } | Self::Io { .. } | Self::Runtime { .. } => {
                FailureKind::Internal
            }
        }
    }

    /// Whether this failure belongs to the test infrastructure rather than to
    /// the program under test.
    #[must_use]
    pub const fn is_infrastructure(&self) -> bool {
        matches!(
            self.kind(),
            FailureKind::FileAccess | FailureKind::ProgramInvocation
        )
    }

    /// Underlying IO error kind for file access failures.
    #[must_use]
    pub fn io_kind(&self) -> Option<io::ErrorKind> {
        match self {
            Self::FileAccess { source, .. }
            | Self::ProgramLaunch { source, .. }
            | Self::Io { source, .. } => Some(source.kind()),
            _ => None,
        }
    }

    /// Convenience constructor for IO errors with a known path.
    #[must_use]
    pub fn io(path: impl AsRef<Path>, source: io::Error) -> Self {
        Self::Io {
            path: path.as_ref().to_path_buf(),
            source,
        }
    }

    /// Convenience constructor for input-file access errors.
    #[must_use]
    pub fn file_access(path: impl AsRef<Path>, source: io::Error) -> Self {
        Self::FileAccess {
            path: path.as_ref().to_path_buf(),
            source,
        }
    }
}

fn stderr_suffix(tail: &str) -> String {
    if tail.is_empty() {
        String::new()
    } else {
        format!(": {tail}")
    }
}

impl From<serde_json::Error> for WfcError {
    fn from(value: serde_json::Error) -> Self {
        Self::Serialization {
            context: "serde_json",
            details: value.to_string(),
        }
    }
}

impl From<toml::de::Error> for WfcError {
    fn from(value: toml::de::Error) -> Self {
        Self::ConfigParse {
            context: "toml",
            details: value.to_string(),
        }
    }
}
