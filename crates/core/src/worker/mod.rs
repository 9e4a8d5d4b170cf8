//! Acquisition worker - one target from probe to ledger commit.
//!
//! Per-target failures never escape this module as errors: they are folded
//! into an [`AcquisitionOutcome`] that the orchestrator aggregates.

mod runner;
mod types;

pub use runner::AcquisitionWorker;
pub use types::{
    AcquisitionOutcome, FailureKind, FailureReason, SkipReason, WorkerState,
};
