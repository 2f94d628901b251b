//! Configuration system: TOML file + env var overrides + defaults.

#![allow(missing_docs)]

use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::core::errors::{Result, WfcError};

/// File name looked up in the working directory when no `--config` is given.
pub const DEFAULT_CONFIG_FILE: &str = "wfcheck.toml";

/// Full harness configuration model.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(default)]
pub struct Config {
    pub program: ProgramConfig,
    pub run: RunConfig,
    pub paths: PathsConfig,
}

/// How the program under test is invoked.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ProgramConfig {
    /// Executable to run; resolved through `PATH` when not absolute.
    pub path: PathBuf,
    /// Extra arguments placed before the input file path.
    pub args: Vec<String>,
    /// Wall-clock limit per invocation. 0 disables the timeout.
    pub timeout_secs: u64,
    /// Exit codes treated as a normal termination.
    pub expected_exit_codes: Vec<i32>,
}

/// Batch execution knobs.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct RunConfig {
    /// Number of files processed concurrently.
    pub jobs: usize,
    /// Skip the sections/items checks of a file once its errors check fails.
    pub fail_fast: bool,
}

/// Filesystem paths used by the harness.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct PathsConfig {
    pub config_file: PathBuf,
    /// JSONL activity log; disabled when unset.
    pub jsonl_log: Option<PathBuf>,
}

impl Default for ProgramConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("stage"),
            args: Vec::new(),
            timeout_secs: 60,
            expected_exit_codes: vec![0],
        }
    }
}

impl ProgramConfig {
    /// Effective timeout, `None` when disabled.
    #[must_use]
    pub fn timeout(&self) -> Option<Duration> {
        (self.timeout_secs > 0).then(|| Duration::from_secs(self.timeout_secs))
    }
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            jobs: 1,
            fail_fast: false,
        }
    }
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            config_file: PathBuf::from(DEFAULT_CONFIG_FILE),
            jsonl_log: None,
        }
    }
}

impl Config {
    /// Default configuration path.
    #[must_use]
    pub fn default_path() -> PathBuf {
        PathsConfig::default().config_file
    }

    /// Load config from default or explicit path, then apply env overrides.
    ///
    /// Missing config file is not an error when loading from default path; defaults are used.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path_buf = path.map_or_else(Self::default_path, Path::to_path_buf);
        let is_explicit_path = path.is_some();

        let mut cfg = if path_buf.exists() {
            let raw = fs::read_to_string(&path_buf).map_err(|source| WfcError::Io {
                path: path_buf.clone(),
                source,
            })?;
            let parsed: Self = toml::from_str(&raw)?;
            parsed
        } else if is_explicit_path {
            return Err(WfcError::MissingConfig { path: path_buf });
        } else {
            Self::default()
        };

        cfg.paths.config_file = path_buf;
        cfg.apply_env_overrides_from(env_var)?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Deterministic hash of the effective config for the activity log.
    ///
    /// FNV-1a over the canonical JSON form, stable across processes.
    pub fn stable_hash(&self) -> Result<String> {
        let canonical = serde_json::to_string(self)?;
        let mut hash: u64 = 0xcbf2_9ce4_8422_2325;
        for byte in canonical.as_bytes() {
            hash ^= u64::from(*byte);
            hash = hash.wrapping_mul(0x0100_0000_01b3);
        }
        Ok(format!("{hash:016x}"))
    }

    fn apply_env_overrides_from<F>(&mut self, mut lookup: F) -> Result<()>
    where
        F: FnMut(&str) -> Option<String>,
    {
        if let Some(raw) = lookup("WFC_PROGRAM") {
            self.program.path = PathBuf::from(raw);
        }
        if let Some(raw) = lookup("WFC_PROGRAM_TIMEOUT_SECS") {
            self.program.timeout_secs = parse_env("WFC_PROGRAM_TIMEOUT_SECS", &raw)?;
        }
        if let Some(raw) = lookup("WFC_RUN_JOBS") {
            self.run.jobs = parse_env("WFC_RUN_JOBS", &raw)?;
        }
        if let Some(raw) = lookup("WFC_RUN_FAIL_FAST") {
            self.run.fail_fast = parse_env("WFC_RUN_FAIL_FAST", &raw)?;
        }
        if let Some(raw) = lookup("WFC_JSONL_LOG") {
            self.paths.jsonl_log = Some(PathBuf::from(raw));
        }
        Ok(())
    }

    /// Check cross-field constraints. Called by [`Config::load`] and again by
    /// the CLI after flag overrides.
    pub fn validate(&self) -> Result<()> {
        if self.program.path.as_os_str().is_empty() {
            return Err(WfcError::InvalidConfig {
                details: "program.path must not be empty".to_string(),
            });
        }
        if self.program.expected_exit_codes.is_empty() {
            return Err(WfcError::InvalidConfig {
                details: "program.expected_exit_codes must list at least one code".to_string(),
            });
        }
        if self.run.jobs == 0 {
            return Err(WfcError::InvalidConfig {
                details: "run.jobs must be >= 1".to_string(),
            });
        }
        if let Some(log) = &self.paths.jsonl_log
            && log.as_os_str().is_empty()
        {
            return Err(WfcError::InvalidConfig {
                details: "paths.jsonl_log must not be an empty path".to_string(),
            });
        }
        Ok(())
    }
}

fn env_var(name: &str) -> Option<String> {
    env::var(name).ok().filter(|raw| !raw.trim().is_empty())
}

fn parse_env<T>(name: &str, raw: &str) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    raw.trim().parse::<T>().map_err(|error| WfcError::ConfigParse {
        context: "env",
        details: format!("{name}={raw:?}: {error}"),
    })
}
