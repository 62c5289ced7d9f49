//! Run options shared by the CLI and embedders.
//!
//! Defaults come from [`RunConfig::default`], environment variables are
//! layered on with [`RunConfig::apply_env`], and the CLI overrides both.

use crate::{CoreError, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

pub const ENV_PROGRAM: &str = "SYNACOR_PROGRAM";
pub const ENV_MAX_STEPS: &str = "SYNACOR_MAX_STEPS";
pub const ENV_TRACE: &str = "SYNACOR_TRACE";

pub const DEFAULT_PROGRAM: &str = "challenge.bin";

/// How the console feeds `in`.
#[cfg_attr(feature = "cli", derive(clap::ValueEnum))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InputMode {
    /// Wait for each character; `in` only skips once stdin is closed.
    #[default]
    Blocking,
    /// Take only characters that have already arrived; otherwise skip.
    Poll,
}

impl FromStr for InputMode {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "blocking" => Ok(InputMode::Blocking),
            "poll" => Ok(InputMode::Poll),
            other => Err(CoreError::Config(format!("unknown input mode '{other}'"))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    pub program: PathBuf,
    /// `None` runs until halt or fault.
    pub max_steps: Option<u64>,
    pub trace_file: Option<PathBuf>,
    pub load_snapshot: Option<PathBuf>,
    pub save_snapshot: Option<PathBuf>,
    /// Include the memory image in saved snapshots.
    pub snapshot_memory: bool,
    /// Characters replayed to `in` before the console takes over.
    pub script: Option<PathBuf>,
    pub input_mode: InputMode,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            program: PathBuf::from(DEFAULT_PROGRAM),
            max_steps: None,
            trace_file: None,
            load_snapshot: None,
            save_snapshot: None,
            snapshot_memory: false,
            script: None,
            input_mode: InputMode::Blocking,
        }
    }
}

impl RunConfig {
    /// Read a JSON config file; missing fields keep their defaults.
    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&text)?)
    }

    /// Overlay `SYNACOR_PROGRAM`, `SYNACOR_MAX_STEPS` and `SYNACOR_TRACE`.
    pub fn apply_env(&mut self) -> Result<()> {
        self.apply_vars(|name| env::var(name).ok())
    }

    /// Same as [`RunConfig::apply_env`] with a caller-supplied lookup.
    pub fn apply_vars(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<()> {
        if let Some(program) = lookup(ENV_PROGRAM).filter(|v| !v.is_empty()) {
            self.program = PathBuf::from(program);
        }
        if let Some(steps) = lookup(ENV_MAX_STEPS).filter(|v| !v.is_empty()) {
            let parsed = steps.trim().parse::<u64>().map_err(|e| {
                CoreError::Config(format!("{ENV_MAX_STEPS}='{steps}' is not a step count: {e}"))
            })?;
            self.max_steps = Some(parsed);
        }
        if let Some(trace) = lookup(ENV_TRACE).filter(|v| !v.is_empty()) {
            self.trace_file = Some(PathBuf::from(trace));
        }
        Ok(())
    }
}
