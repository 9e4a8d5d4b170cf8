//! Batch orchestrator implementation.
//!
//! One run is: sweep → audit → every category in catalog order → every
//! target in category order → sweep. Targets run strictly one at a time so
//! pacing between jobs holds; a stop request is honoured between targets.

use std::sync::Arc;

use tracing::{info, warn};

use crate::catalog::CatalogStore;
use crate::config::Config;
use crate::fetcher::MediaFetcher;
use crate::integrity::{sweep_directory, IntegrityAuditor};
use crate::layout::OutputLayout;
use crate::ledger::Ledger;
use crate::pacing::PacingStrategy;
use crate::worker::AcquisitionWorker;

use super::config::{RunMode, RunOptions};
use super::shutdown::ShutdownHandle;
use super::types::{OrchestratorError, RunStatistics};

/// Drives a whole catalog through the acquisition worker.
pub struct BatchOrchestrator {
    layout: OutputLayout,
    ledger: Arc<dyn Ledger>,
    pacing: Arc<dyn PacingStrategy>,
    worker: AcquisitionWorker,
    auditor: IntegrityAuditor,
    allowed_extensions: Vec<String>,
    shutdown: ShutdownHandle,
}

impl BatchOrchestrator {
    /// Create an orchestrator for the output tree and thresholds in `config`.
    pub fn new(
        config: &Config,
        fetcher: Arc<dyn MediaFetcher>,
        ledger: Arc<dyn Ledger>,
        pacing: Arc<dyn PacingStrategy>,
    ) -> Self {
        let layout = OutputLayout::new(
            config.paths.download_dir.clone(),
            config.integrity.artifact_extension.clone(),
        );
        let worker = AcquisitionWorker::new(
            fetcher,
            ledger.clone(),
            pacing.clone(),
            layout.clone(),
            config.retry.max_attempts,
            config.integrity.min_artifact_bytes,
        );
        let auditor = IntegrityAuditor::new(layout.clone(), config.integrity.min_artifact_bytes);

        Self {
            layout,
            ledger,
            pacing,
            worker,
            auditor,
            allowed_extensions: config.integrity.allowed_extensions.clone(),
            shutdown: ShutdownHandle::new(),
        }
    }

    /// Use `shutdown` to stop the run between targets.
    pub fn with_shutdown(mut self, shutdown: ShutdownHandle) -> Self {
        self.worker = self.worker.with_shutdown(shutdown.clone());
        self.shutdown = shutdown;
        self
    }

    /// Handle that stops this orchestrator.
    pub fn shutdown_handle(&self) -> ShutdownHandle {
        self.shutdown.clone()
    }

    /// Run one batch.
    ///
    /// Only sweep, audit and output-directory failures abort; per-target
    /// failures are counted in the returned statistics.
    pub async fn run(
        &self,
        catalog: &CatalogStore,
        options: &RunOptions,
    ) -> Result<RunStatistics, OrchestratorError> {
        let mode = options.mode();
        let mut stats = RunStatistics::start(mode);
        info!(
            run_id = %stats.run_id,
            mode = %mode,
            categories = catalog.categories().len(),
            targets = catalog.target_count(),
            ledger_entries = self.ledger.len(),
            force_best_quality = options.force_best_quality,
            "Starting batch run"
        );

        let sweep = sweep_directory(self.layout.root(), &self.allowed_extensions).await?;
        stats.swept_files += sweep.removed_count();
        if mode == RunMode::CleanOnly {
            return Ok(stats.finish());
        }

        let audit = self.auditor.audit(self.ledger.as_ref(), catalog).await?;
        stats.repaired = audit.repaired_count;
        stats.evicted_urls = audit.removed_urls;
        if mode == RunMode::CheckOnly {
            return Ok(stats.finish());
        }

        stats.total = catalog.target_count();
        self.acquire_all(catalog, options, &mut stats).await?;

        let sweep = sweep_directory(self.layout.root(), &self.allowed_extensions).await?;
        stats.swept_files += sweep.removed_count();

        let stats = stats.finish();
        info!(
            run_id = %stats.run_id,
            total = stats.total,
            completed = stats.completed,
            failed = stats.failed,
            skipped = stats.skipped,
            interrupted = stats.interrupted,
            "Batch run finished"
        );
        Ok(stats)
    }

    async fn acquire_all(
        &self,
        catalog: &CatalogStore,
        options: &RunOptions,
        stats: &mut RunStatistics,
    ) -> Result<(), OrchestratorError> {
        let keep = self.layout.artifact_paths(catalog);
        for category in catalog.categories() {
            if self.stop_requested(stats) {
                return Ok(());
            }

            let dir = self
                .layout
                .ensure_category_dir(&category.name)
                .await
                .map_err(|source| OrchestratorError::OutputDirectory {
                    path: self.layout.category_dir(&category.name),
                    source,
                })?;
            info!(
                category = %category.name,
                targets = category.targets.len(),
                dir = %dir.display(),
                "Processing category"
            );

            // pacing applies only between jobs that actually hit the network
            let mut fetched_in_category = false;
            for target in &category.targets {
                if self.stop_requested(stats) {
                    return Ok(());
                }

                let will_fetch = !self.ledger.contains(&target.url);
                if will_fetch && fetched_in_category {
                    let delay = self.pacing.inter_job_delay();
                    info!(
                        delay_ms = delay.as_millis() as u64,
                        "Waiting before next target"
                    );
                    if !self.shutdown.pause(delay).await {
                        self.stop_requested(stats);
                        return Ok(());
                    }
                }

                let outcome = self
                    .worker
                    .acquire(target, &keep, options.force_best_quality)
                    .await;
                if !outcome.is_skipped() {
                    fetched_in_category = true;
                }
                stats.record(target, &outcome);
            }
        }
        Ok(())
    }

    fn stop_requested(&self, stats: &mut RunStatistics) -> bool {
        if !self.shutdown.is_shutdown_requested() {
            return false;
        }
        if !stats.interrupted {
            warn!(
                remaining = stats.not_attempted(),
                "Shutdown requested, stopping before next target"
            );
            stats.interrupted = true;
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::JsonLedger;
    use crate::pacing::FixedPacing;
    use crate::testing::{fixtures, MockFetcher};
    use std::path::Path;
    use tempfile::TempDir;

    fn config(root: &Path) -> Config {
        let mut config = Config::default();
        config.paths.download_dir = root.join("out");
        config.integrity.min_artifact_bytes = 1024;
        config
    }

    fn catalog() -> CatalogStore {
        CatalogStore::from_json(
            &fixtures::CatalogBuilder::new()
                .category("A")
                .video("https://v/1", "One", Some("720p"))
                .video("https://v/2", "Two", None)
                .category("B")
                .video("https://v/3", "Three", None)
                .to_json(),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_full_run_acquires_everything_in_order() {
        let temp = TempDir::new().unwrap();
        let fetcher = Arc::new(MockFetcher::new());
        let ledger = Arc::new(JsonLedger::open(&temp.path().join("ledger.json")).unwrap());
        let orchestrator = BatchOrchestrator::new(
            &config(temp.path()),
            fetcher.clone(),
            ledger.clone(),
            Arc::new(FixedPacing::immediate()),
        );

        let stats = orchestrator
            .run(&catalog(), &RunOptions::default())
            .await
            .unwrap();

        assert_eq!(stats.total, 3);
        assert_eq!(stats.completed, 3);
        assert!(!stats.interrupted);
        assert_eq!(
            ledger.snapshot(),
            vec!["https://v/1", "https://v/2", "https://v/3"]
        );

        let urls: Vec<String> = fetcher
            .recorded_fetches()
            .await
            .into_iter()
            .map(|r| r.url)
            .collect();
        assert_eq!(urls, vec!["https://v/1", "https://v/2", "https://v/3"]);
        assert!(temp.path().join("out/B/Three.mp4").exists());
    }

    #[tokio::test]
    async fn test_check_only_never_fetches() {
        let temp = TempDir::new().unwrap();
        let fetcher = Arc::new(MockFetcher::new());
        let ledger = Arc::new(JsonLedger::open(&temp.path().join("ledger.json")).unwrap());
        ledger.record("https://v/1").unwrap();
        let orchestrator = BatchOrchestrator::new(
            &config(temp.path()),
            fetcher.clone(),
            ledger.clone(),
            Arc::new(FixedPacing::immediate()),
        );

        let options = RunOptions {
            check_only: true,
            ..Default::default()
        };
        let stats = orchestrator.run(&catalog(), &options).await.unwrap();

        assert_eq!(stats.mode, RunMode::CheckOnly);
        assert_eq!(stats.total, 0);
        assert_eq!(stats.evicted_urls, vec!["https://v/1".to_string()]);
        assert_eq!(fetcher.probe_count().await, 0);
        assert!(ledger.is_empty());
    }

    #[tokio::test]
    async fn test_shutdown_before_run_visits_nothing() {
        let temp = TempDir::new().unwrap();
        let fetcher = Arc::new(MockFetcher::new());
        let ledger = Arc::new(JsonLedger::open(&temp.path().join("ledger.json")).unwrap());
        let shutdown = ShutdownHandle::new();
        let orchestrator = BatchOrchestrator::new(
            &config(temp.path()),
            fetcher.clone(),
            ledger,
            Arc::new(FixedPacing::immediate()),
        )
        .with_shutdown(shutdown.clone());

        shutdown.request_shutdown();
        let stats = orchestrator
            .run(&catalog(), &RunOptions::default())
            .await
            .unwrap();

        assert!(stats.interrupted);
        assert_eq!(stats.not_attempted(), 3);
        assert_eq!(fetcher.probe_count().await, 0);
    }

    #[tokio::test]
    async fn test_shutdown_during_pacing_stops_between_targets() {
        let temp = TempDir::new().unwrap();
        let fetcher = Arc::new(MockFetcher::new());
        let ledger = Arc::new(JsonLedger::open(&temp.path().join("ledger.json")).unwrap());
        let pacing = Arc::new(FixedPacing {
            inter_job: std::time::Duration::from_secs(60),
            ..FixedPacing::immediate()
        });
        let orchestrator = BatchOrchestrator::new(
            &config(temp.path()),
            fetcher.clone(),
            ledger.clone(),
            pacing,
        );
        let shutdown = orchestrator.shutdown_handle();
        tokio::spawn(async move {
            tokio::time::sleep(std::time::Duration::from_millis(50)).await;
            shutdown.request_shutdown();
        });

        let stats = orchestrator
            .run(&catalog(), &RunOptions::default())
            .await
            .unwrap();

        assert!(stats.interrupted);
        assert_eq!(stats.completed, 1);
        assert_eq!(ledger.snapshot(), vec!["https://v/1"]);
        assert_eq!(fetcher.fetch_count().await, 1);
    }

    fn slow_pacing() -> Arc<FixedPacing> {
        Arc::new(FixedPacing {
            inter_job: std::time::Duration::from_secs(3600),
            ..FixedPacing::immediate()
        })
    }

    #[tokio::test(start_paused = true)]
    async fn test_skipped_targets_neither_wait_nor_trigger_a_wait() {
        let temp = TempDir::new().unwrap();
        let fetcher = Arc::new(MockFetcher::new());
        let ledger = Arc::new(JsonLedger::open(&temp.path().join("ledger.json")).unwrap());
        ledger.record("https://v/1").unwrap();
        ledger.record("https://v/3").unwrap();
        ledger.record("https://v/4").unwrap();
        let catalog = CatalogStore::from_json(
            &fixtures::CatalogBuilder::new()
                .category("A")
                .video("https://v/1", "One", None)
                .video("https://v/2", "Two", None)
                .video("https://v/3", "Three", None)
                .category("B")
                .video("https://v/4", "Four", None)
                .video("https://v/5", "Five", None)
                .to_json(),
        )
        .unwrap();
        let root = temp.path().join("out");
        for path in ["A/One.mp4", "A/Three.mp4", "B/Four.mp4"] {
            fixtures::write_file(&root.join(path), 1024);
        }
        let orchestrator = BatchOrchestrator::new(
            &config(temp.path()),
            fetcher.clone(),
            ledger,
            slow_pacing(),
        );

        let started = tokio::time::Instant::now();
        let stats = orchestrator
            .run(&catalog, &RunOptions::default())
            .await
            .unwrap();

        assert_eq!(stats.completed, 2);
        assert_eq!(stats.skipped, 3);
        assert_eq!(fetcher.fetch_count().await, 2);
        assert!(started.elapsed() < std::time::Duration::from_secs(3600));
    }

    #[tokio::test(start_paused = true)]
    async fn test_consecutive_fetches_in_a_category_wait() {
        let temp = TempDir::new().unwrap();
        let fetcher = Arc::new(MockFetcher::new());
        let ledger = Arc::new(JsonLedger::open(&temp.path().join("ledger.json")).unwrap());
        let orchestrator = BatchOrchestrator::new(
            &config(temp.path()),
            fetcher.clone(),
            ledger,
            slow_pacing(),
        );

        let started = tokio::time::Instant::now();
        let stats = orchestrator
            .run(&catalog(), &RunOptions::default())
            .await
            .unwrap();

        assert_eq!(stats.completed, 3);
        // one wait between v/1 and v/2; category B starts fresh
        let elapsed = started.elapsed();
        assert!(elapsed >= std::time::Duration::from_secs(3600));
        assert!(elapsed < std::time::Duration::from_secs(7200));
    }
}
