//! Batch orchestrator - runs a whole catalog through the acquisition worker.
//!
//! A run is strictly sequential:
//! - **Sweep**: remove disallowed files from the output tree
//! - **Audit**: reconcile the ledger with on-disk artifacts
//! - **Acquire**: each category in catalog order, each target in order, with
//!   pacing between jobs that actually fetch
//! - **Sweep** again
//!
//! `clean_only` stops after the first sweep, `check_only` after the audit.

mod config;
mod runner;
mod shutdown;
mod types;

pub use config::{RunMode, RunOptions};
pub use runner::BatchOrchestrator;
pub use shutdown::ShutdownHandle;
pub use types::{OrchestratorError, RunStatistics, TargetFailure};
