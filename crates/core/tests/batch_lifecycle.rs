//! End-to-end batch runs against a temporary output tree.
//!
//! Every test wires the real ledger, catalog, auditor and orchestrator to a
//! `MockFetcher` that writes artifacts into a `TempDir`.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use reelkeep_core::orchestrator::{BatchOrchestrator, RunOptions};
use reelkeep_core::pacing::FixedPacing;
use reelkeep_core::testing::{fixtures, MockFetcher};
use reelkeep_core::worker::FailureKind;
use reelkeep_core::{CatalogStore, Config, JsonLedger, Ledger};
use tempfile::TempDir;

const MIN_BYTES: u64 = 1024 * 1024;

struct TestEnv {
    _temp: TempDir,
    config: Config,
    fetcher: Arc<MockFetcher>,
}

impl TestEnv {
    fn new() -> Self {
        let temp = TempDir::new().unwrap();
        let mut config = Config::default();
        config.paths.download_dir = temp.path().join("downloads");
        config.paths.ledger = temp.path().join("downloaded.json");
        config.paths.catalog = temp.path().join("youtube_links.json");
        config.retry.max_attempts = 3;
        config.integrity.min_artifact_bytes = MIN_BYTES;

        Self {
            _temp: temp,
            config,
            fetcher: Arc::new(MockFetcher::new()),
        }
    }

    fn root(&self) -> &Path {
        &self.config.paths.download_dir
    }

    fn artifact(&self, category: &str, title: &str) -> PathBuf {
        self.root().join(category).join(format!("{title}.mp4"))
    }

    /// Open the ledger from disk, as a fresh process would.
    fn open_ledger(&self) -> Arc<JsonLedger> {
        Arc::new(JsonLedger::open(&self.config.paths.ledger).unwrap())
    }

    fn orchestrator(&self, ledger: Arc<JsonLedger>) -> BatchOrchestrator {
        BatchOrchestrator::new(
            &self.config,
            self.fetcher.clone(),
            ledger,
            Arc::new(FixedPacing::immediate()),
        )
    }

    fn write_catalog(&self, builder: &fixtures::CatalogBuilder) -> CatalogStore {
        builder.write_to(&self.config.paths.catalog);
        CatalogStore::load(&self.config.paths.catalog).unwrap()
    }
}

fn two_target_catalog() -> fixtures::CatalogBuilder {
    fixtures::CatalogBuilder::new()
        .category("A")
        .video("https://v/old", "Old Clip", None)
        .video("https://v/new", "New Clip", Some("720p"))
}

#[tokio::test]
async fn test_end_to_end_one_new_one_known() {
    let env = TestEnv::new();
    let catalog = env.write_catalog(&two_target_catalog());

    let ledger = env.open_ledger();
    ledger.record("https://v/old").unwrap();
    fixtures::write_file(&env.artifact("A", "Old Clip"), MIN_BYTES as usize);
    env.fetcher.set_qualities("https://v/new", &[480, 720]).await;

    let stats = env
        .orchestrator(ledger.clone())
        .run(&catalog, &RunOptions::default())
        .await
        .unwrap();

    assert_eq!(stats.total, 2);
    assert_eq!(stats.completed, 1);
    assert_eq!(stats.skipped, 1);
    assert_eq!(stats.failed, 0);
    assert!(ledger.contains("https://v/old"));
    assert!(ledger.contains("https://v/new"));

    let fetches = env.fetcher.recorded_fetches().await;
    assert_eq!(fetches.len(), 1);
    assert!(fetches[0].format.as_str().contains("height=720"));
    assert_eq!(fetches[0].expected_path, env.artifact("A", "New Clip"));
}

#[tokio::test]
async fn test_second_run_is_idempotent() {
    let env = TestEnv::new();
    let catalog = env.write_catalog(&two_target_catalog());

    let first = env
        .orchestrator(env.open_ledger())
        .run(&catalog, &RunOptions::default())
        .await
        .unwrap();
    assert_eq!(first.completed, 2);

    env.fetcher.clear_recorded().await;
    let second = env
        .orchestrator(env.open_ledger())
        .run(&catalog, &RunOptions::default())
        .await
        .unwrap();

    assert_eq!(second.skipped, 2);
    assert_eq!(second.completed, 0);
    assert!(second.evicted_urls.is_empty());
    assert_eq!(env.fetcher.probe_count().await, 0);
    assert_eq!(env.fetcher.fetch_count().await, 0);
}

#[tokio::test]
async fn test_retry_exhaustion_is_isolated() {
    let env = TestEnv::new();
    let catalog = env.write_catalog(&two_target_catalog());
    env.fetcher.always_fail_probe("https://v/old").await;

    let ledger = env.open_ledger();
    let stats = env
        .orchestrator(ledger.clone())
        .run(&catalog, &RunOptions::default())
        .await
        .unwrap();

    assert_eq!(stats.failed, 1);
    assert_eq!(stats.completed, 1);
    assert_eq!(stats.failures[0].url, "https://v/old");
    assert_eq!(stats.failures[0].reason.kind, FailureKind::ProbeError);
    assert_eq!(stats.failures[0].attempts, 3);
    assert!(!ledger.contains("https://v/old"));
    assert!(ledger.contains("https://v/new"));

    let old_probes = env
        .fetcher
        .recorded_probes()
        .await
        .into_iter()
        .filter(|p| p.url == "https://v/old")
        .count();
    assert_eq!(old_probes, 3);
}

#[tokio::test]
async fn test_audit_heals_missing_artifact() {
    let env = TestEnv::new();
    let catalog = env.write_catalog(&two_target_catalog());

    env.orchestrator(env.open_ledger())
        .run(&catalog, &RunOptions::default())
        .await
        .unwrap();

    // the artifact disappears between runs
    std::fs::remove_file(env.artifact("A", "New Clip")).unwrap();
    env.fetcher.clear_recorded().await;

    let ledger = env.open_ledger();
    let check = RunOptions {
        check_only: true,
        ..Default::default()
    };
    let stats = env
        .orchestrator(ledger.clone())
        .run(&catalog, &check)
        .await
        .unwrap();

    assert_eq!(stats.evicted_urls, vec!["https://v/new".to_string()]);
    assert_eq!(stats.repaired, 1);
    assert!(ledger.contains("https://v/old"));
    assert!(!ledger.contains("https://v/new"));
    assert_eq!(env.fetcher.fetch_count().await, 0);

    // a full run re-acquires only the healed target
    let stats = env
        .orchestrator(env.open_ledger())
        .run(&catalog, &RunOptions::default())
        .await
        .unwrap();
    assert_eq!(stats.completed, 1);
    assert_eq!(stats.skipped, 1);
    assert!(env.artifact("A", "New Clip").exists());
}

#[tokio::test]
async fn test_audit_removes_fragments_of_truncated_artifact() {
    let env = TestEnv::new();
    let catalog = env.write_catalog(&two_target_catalog());
    let ledger = env.open_ledger();
    ledger.record("https://v/new").unwrap();

    let dir = env.root().join("A");
    fixtures::write_file(&dir.join("New Clip.mp4"), 512);
    fixtures::write_file(&dir.join("New Clip.f137.mp4"), 512);
    fixtures::write_file(&dir.join("New Clip.f140.m4a"), 512);
    fixtures::write_file(&dir.join("New Clip.mp4.part"), 512);
    fixtures::write_file(&dir.join("New Clip.webp"), 512);
    fixtures::write_file(&dir.join("Old Clip.mp4"), MIN_BYTES as usize);

    let check = RunOptions {
        check_only: true,
        ..Default::default()
    };
    env.orchestrator(ledger.clone())
        .run(&catalog, &check)
        .await
        .unwrap();

    let mut left: Vec<String> = std::fs::read_dir(&dir)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    left.sort();
    assert_eq!(left, vec!["Old Clip.mp4".to_string()]);
    assert!(!ledger.contains("https://v/new"));
}

#[tokio::test]
async fn test_clean_only_sweeps_disallowed_files() {
    let env = TestEnv::new();
    let catalog = env.write_catalog(&two_target_catalog());
    let ledger = env.open_ledger();
    ledger.record("https://v/old").unwrap();

    for name in ["A/keep.mp4", "A/notes.txt", "A/meta.json"] {
        fixtures::write_file(&env.root().join(name), 8);
    }
    for name in ["A/x.part", "A/x.webp", "A/x.m4a", "A/nested/y.ytdl", "stray"] {
        fixtures::write_file(&env.root().join(name), 8);
    }

    let clean = RunOptions {
        clean_only: true,
        check_only: true,
        ..Default::default()
    };
    let stats = env
        .orchestrator(ledger.clone())
        .run(&catalog, &clean)
        .await
        .unwrap();

    assert_eq!(stats.swept_files, 5);
    assert!(env.root().join("A/keep.mp4").exists());
    assert!(env.root().join("A/notes.txt").exists());
    assert!(env.root().join("A/meta.json").exists());
    assert!(!env.root().join("A/x.part").exists());
    assert!(!env.root().join("A/nested/y.ytdl").exists());
    assert!(!env.root().join("stray").exists());
    // clean-only never audits, so the ledger is untouched
    assert!(ledger.contains("https://v/old"));
    assert_eq!(env.fetcher.probe_count().await, 0);
}

#[tokio::test]
async fn test_ledger_survives_restart() {
    let env = TestEnv::new();
    {
        let ledger = env.open_ledger();
        assert!(ledger.record("https://v/1").unwrap());
    }

    let reopened = env.open_ledger();
    assert!(reopened.contains("https://v/1"));
    assert_eq!(reopened.len(), 1);

    let raw: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&env.config.paths.ledger).unwrap())
            .unwrap();
    assert_eq!(raw["downloaded_urls"][0], "https://v/1");
}

#[tokio::test]
async fn test_failed_fetch_leaves_no_partial_download() {
    let env = TestEnv::new();
    let catalog = env.write_catalog(&two_target_catalog());
    env.fetcher.always_fail_fetch("https://v/new").await;
    env.fetcher.set_leave_partial_on_failure(true).await;

    let stats = env
        .orchestrator(env.open_ledger())
        .run(&catalog, &RunOptions::default())
        .await
        .unwrap();

    assert_eq!(stats.failed, 1);
    assert_eq!(stats.failures[0].reason.kind, FailureKind::FetchError);
    // the worker clears it before the sweep gets there
    assert_eq!(stats.swept_files, 0);
    assert!(!env.root().join("A/New Clip.mp4.part").exists());
    assert!(env.artifact("A", "Old Clip").exists());
}

#[tokio::test]
async fn test_force_best_quality_requests_maximum() {
    let env = TestEnv::new();
    let catalog = env.write_catalog(
        &fixtures::CatalogBuilder::new()
            .category("A")
            .video("https://v/1", "Clip", Some("480p")),
    );
    env.fetcher.set_qualities("https://v/1", &[360, 480, 1080]).await;

    let options = RunOptions {
        force_best_quality: true,
        ..Default::default()
    };
    env.orchestrator(env.open_ledger())
        .run(&catalog, &options)
        .await
        .unwrap();

    let fetches = env.fetcher.recorded_fetches().await;
    assert!(fetches[0].format.as_str().contains("height=1080"));
}

#[tokio::test]
async fn test_audit_keeps_sibling_artifact_named_like_debris() {
    let env = TestEnv::new();
    let catalog = env.write_catalog(
        &fixtures::CatalogBuilder::new()
            .category("A")
            .video("https://v/1", "Lecture", None)
            .video("https://v/2", "Lecture.temp", None),
    );
    let ledger = env.open_ledger();
    ledger.record("https://v/1").unwrap();
    ledger.record("https://v/2").unwrap();
    fixtures::write_file(&env.artifact("A", "Lecture.temp"), MIN_BYTES as usize);

    let check = RunOptions {
        check_only: true,
        ..Default::default()
    };
    let stats = env
        .orchestrator(ledger.clone())
        .run(&catalog, &check)
        .await
        .unwrap();

    assert_eq!(stats.evicted_urls, vec!["https://v/1".to_string()]);
    assert!(env.artifact("A", "Lecture.temp").exists());
    assert!(ledger.contains("https://v/2"));
}

#[tokio::test]
async fn test_fragments_of_exhausted_target_are_cleared() {
    let mut env = TestEnv::new();
    env.config.retry.max_attempts = 1;
    let catalog = env.write_catalog(
        &fixtures::CatalogBuilder::new()
            .category("A")
            .video("https://v/1", "Clip", None),
    );
    env.fetcher.always_fail_fetch("https://v/1").await;
    // same extension as the artifact, so the sweep alone would keep them
    fixtures::write_file(&env.root().join("A/Clip.f137.mp4"), 512);
    fixtures::write_file(&env.root().join("A/Clip.temp.mp4"), 512);

    let stats = env
        .orchestrator(env.open_ledger())
        .run(&catalog, &RunOptions::default())
        .await
        .unwrap();

    assert_eq!(stats.failed, 1);
    assert_eq!(stats.failures[0].reason.kind, FailureKind::FetchError);
    assert!(!env.root().join("A/Clip.f137.mp4").exists());
    assert!(!env.root().join("A/Clip.temp.mp4").exists());
}
