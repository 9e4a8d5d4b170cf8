//! Run options for the batch orchestrator.

use serde::{Deserialize, Serialize};
use std::fmt;

/// What a run does, derived from [`RunOptions`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunMode {
    /// Sweep, audit, acquire every target, sweep again.
    Full,
    /// Sweep and audit only.
    CheckOnly,
    /// Sweep only.
    CleanOnly,
}

impl fmt::Display for RunMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Full => "full",
            Self::CheckOnly => "check_only",
            Self::CleanOnly => "clean_only",
        })
    }
}

/// Options threaded through one orchestrator run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunOptions {
    /// Always request the best available quality, ignoring catalog preferences.
    #[serde(default)]
    pub force_best_quality: bool,

    /// Only sweep disallowed files.
    #[serde(default)]
    pub clean_only: bool,

    /// Only sweep and audit; no fetching.
    #[serde(default)]
    pub check_only: bool,
}

impl RunOptions {
    /// Effective mode. `clean_only` wins over `check_only`.
    pub fn mode(&self) -> RunMode {
        if self.clean_only {
            RunMode::CleanOnly
        } else if self.check_only {
            RunMode::CheckOnly
        } else {
            RunMode::Full
        }
    }
}
