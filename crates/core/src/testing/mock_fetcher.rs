//! Mock media fetcher for testing.

use async_trait::async_trait;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::RwLock;

use crate::fetcher::{FetchError, FetchReport, FetchRequest, MediaFetcher, ProbeResult};
use crate::quality::{QualityLabel, QualityOption};

/// A recorded probe for test assertions.
#[derive(Debug, Clone)]
pub struct RecordedProbe {
    pub url: String,
    pub user_agent: Option<String>,
    pub timestamp: Instant,
}

/// Scripted failure budget for a url.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Failures {
    Remaining(u32),
    Always,
}

impl Failures {
    /// Consume one failure. Returns whether this call should fail.
    fn take(&mut self) -> bool {
        match self {
            Self::Always => true,
            Self::Remaining(0) => false,
            Self::Remaining(n) => {
                *n -= 1;
                true
            }
        }
    }
}

/// Mock implementation of the MediaFetcher trait.
///
/// Provides controllable behavior for testing:
/// - Per-url available qualities (defaults to 480p/720p/1080p)
/// - Scripted probe and fetch failures, a fixed number of times or forever
/// - Writes an artifact of configurable size on a successful fetch
/// - Records every probe and fetch for assertions
///
/// # Example
///
/// ```rust,ignore
/// use reelkeep_core::testing::MockFetcher;
///
/// let fetcher = MockFetcher::new();
/// fetcher.set_qualities("https://v/1", &[480, 720]).await;
/// fetcher.fail_probe("https://v/2", 2).await;
///
/// // run the worker...
///
/// assert_eq!(fetcher.fetch_count().await, 1);
/// ```
#[derive(Debug)]
pub struct MockFetcher {
    /// Available qualities per url.
    qualities: Arc<RwLock<HashMap<String, Vec<QualityLabel>>>>,
    /// Qualities for urls without an explicit entry.
    default_qualities: Arc<RwLock<Vec<QualityLabel>>>,
    probe_failures: Arc<RwLock<HashMap<String, Failures>>>,
    fetch_failures: Arc<RwLock<HashMap<String, Failures>>>,
    /// Bytes written for a fetched artifact.
    artifact_size: Arc<RwLock<usize>>,
    /// Per-url artifact size overrides.
    artifact_sizes: Arc<RwLock<HashMap<String, usize>>>,
    /// Whether a failed fetch leaves a `.part` file behind.
    leave_partial_on_failure: Arc<RwLock<bool>>,
    probes: Arc<RwLock<Vec<RecordedProbe>>>,
    fetches: Arc<RwLock<Vec<FetchRequest>>>,
}

impl Default for MockFetcher {
    fn default() -> Self {
        Self::new()
    }
}

impl MockFetcher {
    /// Default artifact size: comfortably above the default 1 MiB threshold.
    pub const DEFAULT_ARTIFACT_SIZE: usize = 2 * 1024 * 1024;

    /// Create a mock fetcher where every url offers 480p, 720p and 1080p.
    pub fn new() -> Self {
        Self {
            qualities: Arc::new(RwLock::new(HashMap::new())),
            default_qualities: Arc::new(RwLock::new(labels(&[480, 720, 1080]))),
            probe_failures: Arc::new(RwLock::new(HashMap::new())),
            fetch_failures: Arc::new(RwLock::new(HashMap::new())),
            artifact_size: Arc::new(RwLock::new(Self::DEFAULT_ARTIFACT_SIZE)),
            artifact_sizes: Arc::new(RwLock::new(HashMap::new())),
            leave_partial_on_failure: Arc::new(RwLock::new(false)),
            probes: Arc::new(RwLock::new(Vec::new())),
            fetches: Arc::new(RwLock::new(Vec::new())),
        }
    }

    /// Set the qualities a probe reports for `url`. An empty list yields no renderable option.
    pub async fn set_qualities(&self, url: &str, heights: &[u32]) {
        self.qualities
            .write()
            .await
            .insert(url.to_string(), labels(heights));
    }

    /// Set the qualities reported for urls without an explicit entry.
    pub async fn set_default_qualities(&self, heights: &[u32]) {
        *self.default_qualities.write().await = labels(heights);
    }

    /// Fail the next `times` probes of `url`.
    pub async fn fail_probe(&self, url: &str, times: u32) {
        self.probe_failures
            .write()
            .await
            .insert(url.to_string(), Failures::Remaining(times));
    }

    /// Fail every probe of `url`.
    pub async fn always_fail_probe(&self, url: &str) {
        self.probe_failures
            .write()
            .await
            .insert(url.to_string(), Failures::Always);
    }

    /// Fail the next `times` fetches of `url`.
    pub async fn fail_fetch(&self, url: &str, times: u32) {
        self.fetch_failures
            .write()
            .await
            .insert(url.to_string(), Failures::Remaining(times));
    }

    /// Fail every fetch of `url`.
    pub async fn always_fail_fetch(&self, url: &str) {
        self.fetch_failures
            .write()
            .await
            .insert(url.to_string(), Failures::Always);
    }

    /// Set the size of every written artifact.
    pub async fn set_artifact_size(&self, bytes: usize) {
        *self.artifact_size.write().await = bytes;
    }

    /// Set the size of the artifact written for `url`.
    pub async fn set_artifact_size_for(&self, url: &str, bytes: usize) {
        self.artifact_sizes
            .write()
            .await
            .insert(url.to_string(), bytes);
    }

    /// Leave `<artifact>.part` behind when a fetch fails.
    pub async fn set_leave_partial_on_failure(&self, leave: bool) {
        *self.leave_partial_on_failure.write().await = leave;
    }

    /// Get recorded probes.
    pub async fn recorded_probes(&self) -> Vec<RecordedProbe> {
        self.probes.read().await.clone()
    }

    /// Get recorded fetch requests.
    pub async fn recorded_fetches(&self) -> Vec<FetchRequest> {
        self.fetches.read().await.clone()
    }

    pub async fn probe_count(&self) -> usize {
        self.probes.read().await.len()
    }

    pub async fn fetch_count(&self) -> usize {
        self.fetches.read().await.len()
    }

    /// Clear recorded probes and fetches.
    pub async fn clear_recorded(&self) {
        self.probes.write().await.clear();
        self.fetches.write().await.clear();
    }

    async fn should_fail(failures: &RwLock<HashMap<String, Failures>>, url: &str) -> bool {
        failures
            .write()
            .await
            .get_mut(url)
            .is_some_and(Failures::take)
    }
}

#[async_trait]
impl MediaFetcher for MockFetcher {
    fn name(&self) -> &str {
        "mock"
    }

    async fn validate(&self) -> Result<(), FetchError> {
        Ok(())
    }

    async fn probe(&self, url: &str, user_agent: Option<&str>) -> Result<ProbeResult, FetchError> {
        self.probes.write().await.push(RecordedProbe {
            url: url.to_string(),
            user_agent: user_agent.map(str::to_string),
            timestamp: Instant::now(),
        });

        if Self::should_fail(&self.probe_failures, url).await {
            return Err(FetchError::ProbeFailed {
                url: url.to_string(),
                reason: "mock probe failure".to_string(),
            });
        }

        let labels = match self.qualities.read().await.get(url) {
            Some(labels) => labels.clone(),
            None => self.default_qualities.read().await.clone(),
        };
        let options = labels
            .into_iter()
            .map(|label| QualityOption {
                label,
                format_id: format!("mock-{}", label.height()),
                ext: Some("mp4".to_string()),
                video_codec: Some("avc1".to_string()),
            })
            .collect();

        Ok(ProbeResult {
            title: None,
            options,
        })
    }

    async fn fetch(&self, request: FetchRequest) -> Result<FetchReport, FetchError> {
        self.fetches.write().await.push(request.clone());

        if let Some(parent) = request.expected_path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        if Self::should_fail(&self.fetch_failures, &request.url).await {
            if *self.leave_partial_on_failure.read().await {
                let mut partial = request.expected_path.clone().into_os_string();
                partial.push(".part");
                tokio::fs::write(PathBuf::from(partial), b"partial").await?;
            }
            return Err(FetchError::FetchFailed {
                url: request.url,
                reason: "mock fetch failure".to_string(),
            });
        }

        let size = match self.artifact_sizes.read().await.get(&request.url) {
            Some(size) => *size,
            None => *self.artifact_size.read().await,
        };
        tokio::fs::write(&request.expected_path, vec![0u8; size]).await?;

        Ok(FetchReport { duration_ms: 0 })
    }
}

fn labels(heights: &[u32]) -> Vec<QualityLabel> {
    heights
        .iter()
        .filter_map(|h| QualityLabel::from_height(*h))
        .collect()
}
