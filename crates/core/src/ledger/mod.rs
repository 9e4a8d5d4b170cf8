//! Ledger of fully acquired urls - the dedup authority.
//!
//! Presence of a url means "already satisfied"; absence means "eligible for
//! acquisition". A url is recorded only after its artifact was verified on
//! disk. Later decay of the artifact is reconciled by the integrity auditor.

mod json_store;

pub use json_store::JsonLedger;

use std::collections::HashSet;
use std::path::PathBuf;
use thiserror::Error;

/// Errors for ledger operations.
#[derive(Debug, Error)]
pub enum LedgerError {
    /// The durable copy exists but cannot be parsed.
    #[error("ledger corrupt at {path}: {reason}")]
    Corrupt { path: PathBuf, reason: String },

    /// Reading or replacing the durable copy failed.
    #[error("ledger I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Durable set of acquired urls.
///
/// Implementations serialise mutations; reads are served from a consistent
/// in-memory mirror.
pub trait Ledger: Send + Sync {
    /// Whether `url` is recorded.
    fn contains(&self, url: &str) -> bool;

    /// Record `url`. Returns `false` if it was already present.
    fn record(&self, url: &str) -> Result<bool, LedgerError>;

    /// Remove every url in `urls` in one durable write. Returns how many were present.
    fn forget(&self, urls: &HashSet<String>) -> Result<usize, LedgerError>;

    /// All recorded urls, in insertion order.
    fn snapshot(&self) -> Vec<String>;

    /// Number of recorded urls.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
