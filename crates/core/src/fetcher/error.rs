//! Error types for the fetcher module.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while probing or fetching a resource.
#[derive(Debug, Error)]
pub enum FetchError {
    /// The fetcher executable could not be started.
    #[error("fetcher binary not found: {path}")]
    BinaryNotFound { path: PathBuf },

    /// The probe ran but failed.
    #[error("probe failed for {url}: {reason}")]
    ProbeFailed { url: String, reason: String },

    /// The resource cannot be served (removed, private, age or region restricted).
    #[error("resource unavailable {url}: {reason}")]
    Unavailable { url: String, reason: String },

    /// Probe output could not be understood.
    #[error("invalid probe output: {0}")]
    InvalidProbeOutput(String),

    /// The transfer ran but failed.
    #[error("fetch failed for {url}: {reason}")]
    FetchFailed { url: String, reason: String },

    /// The operation exceeded its time budget.
    #[error("operation timed out after {secs}s")]
    Timeout { secs: u64 },

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
