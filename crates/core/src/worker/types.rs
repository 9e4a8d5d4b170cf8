//! Worker states and outcomes.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

use crate::quality::QualityLabel;

// ============================================================================
// State Machine
// ============================================================================

/// Stage of one target inside the worker.
///
/// `Pending → Probing → Negotiating → Fetching → Verifying → Committed`, with
/// `Failed` reachable from every non-terminal state. A retry re-enters
/// `Probing`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkerState {
    Pending,
    Probing,
    Negotiating,
    Fetching,
    Verifying,
    Committed,
    Failed,
}

impl WorkerState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Committed | Self::Failed)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Probing => "probing",
            Self::Negotiating => "negotiating",
            Self::Fetching => "fetching",
            Self::Verifying => "verifying",
            Self::Committed => "committed",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for WorkerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Failures
// ============================================================================

/// Category of a per-target failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// Probe failed: network error, unavailable, age or region restricted.
    ProbeError,
    /// Transfer failed.
    FetchError,
    /// Artifact missing or undersized after a reported success.
    VerifyError,
    /// The probe reported no variant that can be rendered.
    NoRenderableQuality,
    /// The ledger could not be updated after a verified fetch.
    LedgerError,
    /// The category directory could not be prepared.
    SetupError,
    /// Shutdown was requested while waiting to retry.
    Cancelled,
}

impl FailureKind {
    /// Whether another attempt may change the result. Verification failures
    /// count against the same attempt budget as fetch failures.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::ProbeError | Self::FetchError | Self::VerifyError)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ProbeError => "probe_error",
            Self::FetchError => "fetch_error",
            Self::VerifyError => "verify_error",
            Self::NoRenderableQuality => "no_renderable_quality",
            Self::LedgerError => "ledger_error",
            Self::SetupError => "setup_error",
            Self::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why a target failed, with the underlying message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailureReason {
    pub kind: FailureKind,
    pub message: String,
}

impl FailureReason {
    pub fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)
    }
}

// ============================================================================
// Outcomes
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    AlreadyInLedger,
}

/// Terminal result of one worker run for one target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum AcquisitionOutcome {
    /// Artifact verified and url recorded.
    Completed {
        quality: QualityLabel,
        attempts: u32,
        path: PathBuf,
    },
    /// Nothing to do.
    Skipped { reason: SkipReason },
    /// Gave up on this target.
    Failed { reason: FailureReason, attempts: u32 },
}

impl AcquisitionOutcome {
    pub fn is_completed(&self) -> bool {
        matches!(self, Self::Completed { .. })
    }

    pub fn is_skipped(&self) -> bool {
        matches!(self, Self::Skipped { .. })
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Failed { .. })
    }

    /// Failure kind, if the target failed.
    pub fn failure_kind(&self) -> Option<FailureKind> {
        match self {
            Self::Failed { reason, .. } => Some(reason.kind),
            _ => None,
        }
    }

    pub(crate) fn metric_label(&self) -> &'static str {
        match self {
            Self::Completed { .. } => "completed",
            Self::Skipped { .. } => "skipped",
            Self::Failed { .. } => "failed",
        }
    }
}
