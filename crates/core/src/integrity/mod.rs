//! Integrity module - self-healing of the output tree and the ledger.
//!
//! Two independent passes live here:
//! - [`sweep_directory`] deletes every file whose extension is not allowed,
//!   regardless of ledger state.
//! - [`IntegrityAuditor`] reconciles ledger entries with the artifacts they
//!   promise and evicts the ones that no longer hold.
//!
//! Debris recognition is an explicit list ([`KNOWN_DEBRIS`]) rather than ad
//! hoc globbing, so what counts as a partial download can be reviewed and
//! tested on its own.

mod artifact;
mod auditor;
mod debris;
mod sweep;

pub use artifact::{inspect_artifact, ArtifactStatus};
pub use auditor::{AuditReport, EvictionReason, Eviction, IntegrityAuditor};
pub use debris::{find_debris, remove_debris, DebrisPattern, KNOWN_DEBRIS};
pub use sweep::{sweep_directory, SweepReport};

use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::ledger::LedgerError;

/// Errors for integrity passes.
#[derive(Debug, Error)]
pub enum IntegrityError {
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Ledger(#[from] LedgerError),
}

impl IntegrityError {
    pub(crate) fn io(path: &Path, source: std::io::Error) -> Self {
        Self::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}
