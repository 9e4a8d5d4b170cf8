//! JSON file backed ledger.

use std::collections::HashSet;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{PoisonError, RwLock};

use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;
use tracing::{debug, info};

use super::{Ledger, LedgerError};
use crate::metrics;

/// On-disk shape of the ledger file.
#[derive(Debug, Default, Serialize, Deserialize)]
struct LedgerDocument {
    #[serde(default)]
    downloaded_urls: Vec<String>,
}

/// In-memory mirror of the durable ledger.
#[derive(Debug, Default)]
struct LedgerState {
    /// Urls in insertion order, as persisted.
    urls: Vec<String>,
    index: HashSet<String>,
}

impl LedgerState {
    fn from_urls(urls: Vec<String>) -> Self {
        let mut state = Self::default();
        for url in urls {
            if state.index.insert(url.clone()) {
                state.urls.push(url);
            }
        }
        state
    }
}

/// Ledger persisted as `{ "downloaded_urls": [...] }`.
///
/// The whole file is rewritten on every mutation through a temp file in the
/// same directory followed by an atomic rename, so a crash leaves either the
/// previous or the new contents. The write lock is held across the disk
/// write, which serialises mutations; the mirror is only updated after the
/// rename succeeded.
pub struct JsonLedger {
    path: PathBuf,
    state: RwLock<LedgerState>,
}

impl JsonLedger {
    /// Open the ledger at `path`, reading it in full.
    ///
    /// A missing file is an empty ledger. A file that exists but cannot be
    /// parsed is reported as corrupt rather than guessed at.
    pub fn open(path: &Path) -> Result<Self, LedgerError> {
        let urls = match std::fs::read_to_string(path) {
            Ok(content) if content.trim().is_empty() => Vec::new(),
            Ok(content) => {
                let document: LedgerDocument =
                    serde_json::from_str(&content).map_err(|e| LedgerError::Corrupt {
                        path: path.to_path_buf(),
                        reason: e.to_string(),
                    })?;
                document.downloaded_urls
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "No ledger file yet, starting empty");
                Vec::new()
            }
            Err(e) => {
                return Err(LedgerError::Io {
                    path: path.to_path_buf(),
                    source: e,
                })
            }
        };

        let state = LedgerState::from_urls(urls);
        info!(path = %path.display(), entries = state.urls.len(), "Ledger opened");

        Ok(Self {
            path: path.to_path_buf(),
            state: RwLock::new(state),
        })
    }

    /// Location of the durable copy.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Replace the durable copy with `urls`.
    fn persist(&self, urls: &[String]) -> Result<(), LedgerError> {
        let io_err = |source: std::io::Error| LedgerError::Io {
            path: self.path.clone(),
            source,
        };

        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        std::fs::create_dir_all(&dir).map_err(io_err)?;

        let document = LedgerDocument {
            downloaded_urls: urls.to_vec(),
        };
        let body = serde_json::to_vec_pretty(&document).map_err(|e| LedgerError::Io {
            path: self.path.clone(),
            source: std::io::Error::other(e),
        })?;

        let mut tmp = NamedTempFile::new_in(&dir).map_err(io_err)?;
        tmp.write_all(&body).map_err(io_err)?;
        tmp.as_file().sync_all().map_err(io_err)?;
        tmp.persist(&self.path).map_err(|e| io_err(e.error))?;

        metrics::LEDGER_WRITES.inc();
        Ok(())
    }
}

impl Ledger for JsonLedger {
    fn contains(&self, url: &str) -> bool {
        self.state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .index
            .contains(url)
    }

    fn record(&self, url: &str) -> Result<bool, LedgerError> {
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        if state.index.contains(url) {
            return Ok(false);
        }

        let mut urls = state.urls.clone();
        urls.push(url.to_string());
        self.persist(&urls)?;

        state.index.insert(url.to_string());
        state.urls = urls;
        debug!(url, "Recorded in ledger");
        Ok(true)
    }

    fn forget(&self, urls: &HashSet<String>) -> Result<usize, LedgerError> {
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        let remaining: Vec<String> = state
            .urls
            .iter()
            .filter(|u| !urls.contains(*u))
            .cloned()
            .collect();
        let removed = state.urls.len() - remaining.len();
        if removed == 0 {
            return Ok(0);
        }

        self.persist(&remaining)?;

        *state = LedgerState::from_urls(remaining);
        debug!(removed, "Removed entries from ledger");
        Ok(removed)
    }

    fn snapshot(&self) -> Vec<String> {
        self.state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .urls
            .clone()
    }

    fn len(&self) -> usize {
        self.state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .urls
            .len()
    }
}
