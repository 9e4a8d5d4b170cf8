//! Ledger reconciliation against on-disk artifacts.

use std::collections::HashSet;

use serde::Serialize;
use tracing::{info, warn};

use super::artifact::{inspect_artifact, ArtifactStatus};
use super::debris::remove_debris;
use super::IntegrityError;
use crate::catalog::CatalogStore;
use crate::layout::OutputLayout;
use crate::ledger::Ledger;
use crate::metrics;

/// Why a ledger entry was evicted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum EvictionReason {
    /// The url is no longer in the catalog.
    UnknownTarget,
    /// The expected artifact does not exist.
    Missing,
    /// The expected artifact is below the size threshold.
    Truncated { size: u64 },
}

impl EvictionReason {
    fn metric_label(&self) -> &'static str {
        match self {
            Self::UnknownTarget => "unknown_target",
            Self::Missing => "missing",
            Self::Truncated { .. } => "truncated",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Eviction {
    pub url: String,
    #[serde(flatten)]
    pub reason: EvictionReason,
}

/// Result of one audit pass.
#[derive(Debug, Clone, Default, Serialize)]
pub struct AuditReport {
    /// Entries whose artifact was missing or truncated and got reset.
    pub repaired_count: usize,
    /// Every url removed from the ledger, in ledger order.
    pub removed_urls: Vec<String>,
    pub evictions: Vec<Eviction>,
    /// Debris files deleted during the pass.
    pub debris_removed: usize,
}

/// Checks every ledger entry against the artifact it promises.
pub struct IntegrityAuditor {
    layout: OutputLayout,
    min_artifact_bytes: u64,
}

impl IntegrityAuditor {
    pub fn new(layout: OutputLayout, min_artifact_bytes: u64) -> Self {
        Self {
            layout,
            min_artifact_bytes,
        }
    }

    /// Evict ledger entries whose artifact is unknown, missing or truncated.
    ///
    /// Debris for the evicted artifact is deleted together with the undersized
    /// artifact itself, so the next fetch starts from scratch. Debris next to a
    /// complete artifact is deleted without touching its ledger entry. The
    /// artifact of any catalog target is never treated as debris. All
    /// evictions are applied in a single `forget`. Must not run while a fetch
    /// for an audited target is in flight.
    pub async fn audit(
        &self,
        ledger: &dyn Ledger,
        catalog: &CatalogStore,
    ) -> Result<AuditReport, IntegrityError> {
        let mut report = AuditReport::default();
        let keep = self.layout.artifact_paths(catalog);

        for url in ledger.snapshot() {
            let Some(target) = catalog.find(&url) else {
                warn!(url = %url, "Ledger entry has no catalog target, evicting");
                report.evictions.push(Eviction {
                    url,
                    reason: EvictionReason::UnknownTarget,
                });
                continue;
            };

            let path = self.layout.artifact_path(target);
            let dir = self.layout.category_dir(&target.category);
            let status = inspect_artifact(&path, self.min_artifact_bytes)
                .await
                .map_err(|e| IntegrityError::io(&path, e))?;

            let reason = match status {
                ArtifactStatus::Complete { .. } => {
                    report.debris_removed += remove_debris(&dir, &target.safe_title, &keep)
                        .await
                        .map_err(|e| IntegrityError::io(&dir, e))?;
                    continue;
                }
                ArtifactStatus::Missing => EvictionReason::Missing,
                ArtifactStatus::Truncated { size } => {
                    if let Err(e) = tokio::fs::remove_file(&path).await {
                        if e.kind() != std::io::ErrorKind::NotFound {
                            return Err(IntegrityError::io(&path, e));
                        }
                    }
                    EvictionReason::Truncated { size }
                }
            };

            warn!(
                url = %url,
                title = %target.title,
                path = %path.display(),
                reason = ?reason,
                "Artifact incomplete, resetting ledger entry"
            );
            report.debris_removed += remove_debris(&dir, &target.safe_title, &keep)
                .await
                .map_err(|e| IntegrityError::io(&dir, e))?;
            report.repaired_count += 1;
            report.evictions.push(Eviction { url, reason });
        }

        if !report.evictions.is_empty() {
            let urls: HashSet<String> = report.evictions.iter().map(|e| e.url.clone()).collect();
            ledger.forget(&urls)?;
            for eviction in &report.evictions {
                metrics::AUDIT_EVICTIONS
                    .with_label_values(&[eviction.reason.metric_label()])
                    .inc();
            }
        }
        report.removed_urls = report.evictions.iter().map(|e| e.url.clone()).collect();

        info!(
            repaired = report.repaired_count,
            removed = report.removed_urls.len(),
            debris = report.debris_removed,
            "Integrity audit finished"
        );
        Ok(report)
    }
}
