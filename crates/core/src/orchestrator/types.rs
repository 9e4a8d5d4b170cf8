//! Types for the batch orchestrator.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::path::PathBuf;
use thiserror::Error;
use uuid::Uuid;

use super::config::RunMode;
use crate::catalog::Target;
use crate::integrity::IntegrityError;
use crate::worker::{AcquisitionOutcome, FailureReason};

/// Errors that abort a run.
///
/// Per-target failures are not errors; they are counted in [`RunStatistics`].
#[derive(Debug, Error)]
pub enum OrchestratorError {
    /// Sweep or audit could not complete.
    #[error("integrity pass failed: {0}")]
    Integrity(#[from] IntegrityError),

    /// A category output directory could not be created.
    #[error("cannot prepare output directory {path}: {source}")]
    OutputDirectory {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// A target that ended in failure, for the run summary.
#[derive(Debug, Clone, Serialize)]
pub struct TargetFailure {
    pub url: String,
    pub title: String,
    pub category: String,
    pub reason: FailureReason,
    pub attempts: u32,
}

/// Aggregated result of one run.
#[derive(Debug, Clone, Serialize)]
pub struct RunStatistics {
    pub run_id: Uuid,
    pub mode: RunMode,
    pub started_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<DateTime<Utc>>,

    /// Targets in the catalog (full runs only).
    pub total: usize,
    pub completed: usize,
    pub failed: usize,
    pub skipped: usize,

    /// Files removed by the directory sweeps.
    pub swept_files: usize,
    /// Ledger entries reset because their artifact was missing or truncated.
    pub repaired: usize,
    /// Every url the audit removed from the ledger.
    pub evicted_urls: Vec<String>,
    pub failures: Vec<TargetFailure>,

    /// Set when a shutdown stopped the run before every target was visited.
    pub interrupted: bool,
}

impl RunStatistics {
    pub fn start(mode: RunMode) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            mode,
            started_at: Utc::now(),
            finished_at: None,
            total: 0,
            completed: 0,
            failed: 0,
            skipped: 0,
            swept_files: 0,
            repaired: 0,
            evicted_urls: Vec::new(),
            failures: Vec::new(),
            interrupted: false,
        }
    }

    /// Fold one outcome into the counters.
    pub fn record(&mut self, target: &Target, outcome: &AcquisitionOutcome) {
        match outcome {
            AcquisitionOutcome::Completed { .. } => self.completed += 1,
            AcquisitionOutcome::Skipped { .. } => self.skipped += 1,
            AcquisitionOutcome::Failed { reason, attempts } => {
                self.failed += 1;
                self.failures.push(TargetFailure {
                    url: target.url.clone(),
                    title: target.title.clone(),
                    category: target.category.clone(),
                    reason: reason.clone(),
                    attempts: *attempts,
                });
            }
        }
    }

    /// Targets that were never visited because the run was interrupted.
    pub fn not_attempted(&self) -> usize {
        self.total
            .saturating_sub(self.completed + self.failed + self.skipped)
    }

    pub fn finish(mut self) -> Self {
        self.finished_at = Some(Utc::now());
        self
    }

    /// Wall-clock duration, once finished.
    pub fn duration(&self) -> Option<chrono::Duration> {
        self.finished_at.map(|end| end - self.started_at)
    }
}
