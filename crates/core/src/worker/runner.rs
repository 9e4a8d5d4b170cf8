//! Acquisition worker implementation.
//!
//! Drives one target through probe, negotiation, fetch, verification and
//! ledger commit. Transient failures are retried with jittered backoff from
//! the pacing strategy; every failure ends as an outcome, never an error.
//! A failed transfer or verification clears the target's partial downloads
//! before the next attempt, so nothing half-written outlives the target.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, info, warn};

use crate::catalog::Target;
use crate::fetcher::{FetchRequest, FormatSelector, MediaFetcher};
use crate::integrity::{inspect_artifact, remove_debris, ArtifactStatus};
use crate::layout::OutputLayout;
use crate::ledger::Ledger;
use crate::metrics;
use crate::orchestrator::ShutdownHandle;
use crate::pacing::PacingStrategy;
use crate::quality::{available_labels, negotiate, QualityLabel};

use super::types::{AcquisitionOutcome, FailureKind, FailureReason, SkipReason, WorkerState};

/// Runs acquisitions one target at a time.
pub struct AcquisitionWorker {
    fetcher: Arc<dyn MediaFetcher>,
    ledger: Arc<dyn Ledger>,
    pacing: Arc<dyn PacingStrategy>,
    layout: OutputLayout,
    max_attempts: u32,
    min_artifact_bytes: u64,
    shutdown: ShutdownHandle,
}

impl AcquisitionWorker {
    pub fn new(
        fetcher: Arc<dyn MediaFetcher>,
        ledger: Arc<dyn Ledger>,
        pacing: Arc<dyn PacingStrategy>,
        layout: OutputLayout,
        max_attempts: u32,
        min_artifact_bytes: u64,
    ) -> Self {
        Self {
            fetcher,
            ledger,
            pacing,
            layout,
            max_attempts: max_attempts.max(1),
            min_artifact_bytes,
            shutdown: ShutdownHandle::new(),
        }
    }

    /// Observe `shutdown` during retry backoff.
    pub fn with_shutdown(mut self, shutdown: ShutdownHandle) -> Self {
        self.shutdown = shutdown;
        self
    }

    pub fn layout(&self) -> &OutputLayout {
        &self.layout
    }

    /// Acquire `target`, retrying transient failures up to the attempt bound.
    ///
    /// `keep` holds artifact paths of other targets; they are never removed
    /// while clearing this target's partial downloads.
    pub async fn acquire(
        &self,
        target: &Target,
        keep: &HashSet<PathBuf>,
        force_best_quality: bool,
    ) -> AcquisitionOutcome {
        let outcome = self.run(target, keep, force_best_quality).await;
        metrics::ACQUISITIONS
            .with_label_values(&[outcome.metric_label()])
            .inc();

        match &outcome {
            AcquisitionOutcome::Completed {
                quality, attempts, ..
            } => info!(
                url = %target.url,
                title = %target.title,
                quality = %quality,
                attempts,
                "Acquisition completed"
            ),
            AcquisitionOutcome::Skipped { .. } => {
                debug!(url = %target.url, "Already in ledger, skipping")
            }
            AcquisitionOutcome::Failed { reason, attempts } => warn!(
                url = %target.url,
                title = %target.title,
                reason = %reason,
                attempts,
                "Acquisition failed"
            ),
        }
        outcome
    }

    async fn run(
        &self,
        target: &Target,
        keep: &HashSet<PathBuf>,
        force_best_quality: bool,
    ) -> AcquisitionOutcome {
        self.transition(target, WorkerState::Pending);
        if self.ledger.contains(&target.url) {
            return AcquisitionOutcome::Skipped {
                reason: SkipReason::AlreadyInLedger,
            };
        }

        if let Err(e) = self.layout.ensure_category_dir(&target.category).await {
            return AcquisitionOutcome::Failed {
                reason: FailureReason::new(
                    FailureKind::SetupError,
                    format!("cannot create category directory: {e}"),
                ),
                attempts: 0,
            };
        }

        let mut attempt = 0;
        loop {
            attempt += 1;

            let reason = match self.attempt(target, keep, force_best_quality, attempt).await {
                Ok((quality, path)) => return self.commit(target, quality, path, attempt),
                Err(reason) => reason,
            };
            self.transition(target, WorkerState::Failed);

            if !reason.kind.is_retryable() || attempt >= self.max_attempts {
                return AcquisitionOutcome::Failed {
                    reason,
                    attempts: attempt,
                };
            }

            let delay = self.pacing.retry_delay(attempt - 1);
            metrics::RETRIES
                .with_label_values(&[reason.kind.as_str()])
                .inc();
            warn!(
                url = %target.url,
                attempt,
                max_attempts = self.max_attempts,
                reason = %reason,
                delay_ms = delay.as_millis() as u64,
                "Attempt failed, retrying"
            );

            if !self.shutdown.pause(delay).await {
                return AcquisitionOutcome::Failed {
                    reason: FailureReason::new(
                        FailureKind::Cancelled,
                        format!("shutdown requested after: {reason}"),
                    ),
                    attempts: attempt,
                };
            }
        }
    }

    /// One pass from probing to a verified artifact.
    async fn attempt(
        &self,
        target: &Target,
        keep: &HashSet<PathBuf>,
        force_best_quality: bool,
        attempt: u32,
    ) -> Result<(QualityLabel, PathBuf), FailureReason> {
        let user_agent = self.pacing.user_agent();

        self.transition(target, WorkerState::Probing);
        let probe = self
            .fetcher
            .probe(&target.url, user_agent.as_deref())
            .await
            .map_err(|e| {
                record_stage("probe", false);
                FailureReason::new(FailureKind::ProbeError, e.to_string())
            })?;
        record_stage("probe", true);

        self.transition(target, WorkerState::Negotiating);
        let available = available_labels(&probe.options);
        let quality = negotiate(target.preferred_quality, &available, force_best_quality)
            .map_err(|e| FailureReason::new(FailureKind::NoRenderableQuality, e.to_string()))?;
        debug!(
            url = %target.url,
            attempt,
            preferred = ?target.preferred_quality.map(|q| q.to_string()),
            quality = %quality,
            available = available.len(),
            "Quality negotiated"
        );

        self.transition(target, WorkerState::Fetching);
        let expected_path = self.layout.artifact_path(target);
        let request = FetchRequest {
            url: target.url.clone(),
            format: FormatSelector::exact(quality),
            output_template: self.layout.output_template(target),
            expected_path: expected_path.clone(),
            user_agent,
        };
        let started = Instant::now();
        let fetched = self.fetcher.fetch(request).await;
        let elapsed = started.elapsed().as_secs_f64();
        match fetched {
            Ok(_) => {
                record_stage("fetch", true);
                metrics::FETCH_DURATION
                    .with_label_values(&["ok"])
                    .observe(elapsed);
            }
            Err(e) => {
                record_stage("fetch", false);
                metrics::FETCH_DURATION
                    .with_label_values(&["error"])
                    .observe(elapsed);
                self.clear_debris(target, keep).await;
                return Err(FailureReason::new(FailureKind::FetchError, e.to_string()));
            }
        }

        self.transition(target, WorkerState::Verifying);
        self.verify(target, &expected_path, keep).await?;
        record_stage("verify", true);

        Ok((quality, expected_path))
    }

    /// Confirm the artifact is complete; otherwise clear it out for the next attempt.
    async fn verify(
        &self,
        target: &Target,
        path: &Path,
        keep: &HashSet<PathBuf>,
    ) -> Result<(), FailureReason> {
        let status = inspect_artifact(path, self.min_artifact_bytes)
            .await
            .map_err(|e| FailureReason::new(FailureKind::VerifyError, e.to_string()))?;

        let message = match status {
            ArtifactStatus::Complete { .. } => return Ok(()),
            ArtifactStatus::Missing => format!("artifact missing at {}", path.display()),
            ArtifactStatus::Truncated { size } => format!(
                "artifact at {} is {size} bytes, below {} bytes",
                path.display(),
                self.min_artifact_bytes
            ),
        };
        record_stage("verify", false);

        if let Err(e) = tokio::fs::remove_file(path).await {
            if e.kind() != std::io::ErrorKind::NotFound {
                warn!(path = %path.display(), error = %e, "Failed to remove undersized artifact");
            }
        }
        self.clear_debris(target, keep).await;

        Err(FailureReason::new(FailureKind::VerifyError, message))
    }

    async fn clear_debris(&self, target: &Target, keep: &HashSet<PathBuf>) {
        let dir = self.layout.category_dir(&target.category);
        if let Err(e) = remove_debris(&dir, &target.safe_title, keep).await {
            warn!(dir = %dir.display(), error = %e, "Failed to clear partial downloads");
        }
    }

    fn commit(
        &self,
        target: &Target,
        quality: QualityLabel,
        path: PathBuf,
        attempts: u32,
    ) -> AcquisitionOutcome {
        match self.ledger.record(&target.url) {
            Ok(_) => {
                self.transition(target, WorkerState::Committed);
                AcquisitionOutcome::Completed {
                    quality,
                    attempts,
                    path,
                }
            }
            Err(e) => {
                self.transition(target, WorkerState::Failed);
                AcquisitionOutcome::Failed {
                    reason: FailureReason::new(FailureKind::LedgerError, e.to_string()),
                    attempts,
                }
            }
        }
    }

    fn transition(&self, target: &Target, state: WorkerState) {
        debug!(url = %target.url, state = %state, "Worker state");
    }
}

fn record_stage(stage: &str, ok: bool) {
    metrics::STAGE_ATTEMPTS
        .with_label_values(&[stage, if ok { "ok" } else { "error" }])
        .inc();
}
