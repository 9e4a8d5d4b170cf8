//! Extension allow-list sweep of the output tree.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{debug, info, warn};

use super::IntegrityError;
use crate::metrics;

/// Result of a directory sweep.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SweepReport {
    /// Files deleted because their extension is not allowed.
    pub removed: Vec<PathBuf>,
    /// Files that should have been deleted but could not be.
    pub failed: usize,
}

impl SweepReport {
    pub fn removed_count(&self) -> usize {
        self.removed.len()
    }
}

/// Remove every file under `root` whose extension is not in `allowed_extensions`.
///
/// Matching is case-insensitive; files without an extension are removed. A
/// missing root is an empty sweep. Individual deletion failures are logged
/// and counted, not fatal.
pub async fn sweep_directory(
    root: &Path,
    allowed_extensions: &[String],
) -> Result<SweepReport, IntegrityError> {
    let allowed: HashSet<String> = allowed_extensions
        .iter()
        .map(|e| e.trim_start_matches('.').to_ascii_lowercase())
        .collect();

    let mut report = SweepReport::default();
    let mut pending = vec![root.to_path_buf()];

    while let Some(dir) = pending.pop() {
        let mut entries = match tokio::fs::read_dir(&dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => continue,
            Err(e) => return Err(IntegrityError::io(&dir, e)),
        };

        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| IntegrityError::io(&dir, e))?
        {
            let path = entry.path();
            let file_type = entry
                .file_type()
                .await
                .map_err(|e| IntegrityError::io(&path, e))?;

            if file_type.is_dir() {
                pending.push(path);
                continue;
            }
            if !file_type.is_file() {
                continue;
            }

            let keep = path
                .extension()
                .and_then(|e| e.to_str())
                .is_some_and(|e| allowed.contains(&e.to_ascii_lowercase()));
            if keep {
                continue;
            }

            match tokio::fs::remove_file(&path).await {
                Ok(()) => {
                    debug!(path = %path.display(), "Swept disallowed file");
                    report.removed.push(path);
                }
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "Failed to sweep file");
                    report.failed += 1;
                }
            }
        }
    }

    metrics::SWEPT_FILES.inc_by(report.removed.len() as u64);
    info!(
        root = %root.display(),
        removed = report.removed.len(),
        failed = report.failed,
        "Directory sweep finished"
    );
    Ok(report)
}
