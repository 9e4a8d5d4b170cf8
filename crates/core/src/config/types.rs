use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Root configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub paths: PathsConfig,
    #[serde(default)]
    pub fetcher: FetcherConfig,
    #[serde(default)]
    pub retry: RetryConfig,
    #[serde(default)]
    pub pacing: PacingConfig,
    #[serde(default)]
    pub integrity: IntegrityConfig,
}

/// File locations used by a run
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PathsConfig {
    /// Root of the output tree; one sub-directory per category.
    #[serde(default = "default_download_dir")]
    pub download_dir: PathBuf,
    /// Catalog document produced by the link extractor.
    #[serde(default = "default_catalog_path")]
    pub catalog: PathBuf,
    /// Ledger of fully acquired urls.
    #[serde(default = "default_ledger_path")]
    pub ledger: PathBuf,
    /// Plain-text log file mirrored from the console output.
    #[serde(default = "default_log_file")]
    pub log_file: Option<PathBuf>,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            download_dir: default_download_dir(),
            catalog: default_catalog_path(),
            ledger: default_ledger_path(),
            log_file: default_log_file(),
        }
    }
}

fn default_download_dir() -> PathBuf {
    PathBuf::from("downloads")
}

fn default_catalog_path() -> PathBuf {
    PathBuf::from("youtube_links.json")
}

fn default_ledger_path() -> PathBuf {
    PathBuf::from("downloaded.json")
}

fn default_log_file() -> Option<PathBuf> {
    Some(PathBuf::from("download_log.txt"))
}

/// External media fetcher (yt-dlp) configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct FetcherConfig {
    /// Path or name of the yt-dlp executable.
    #[serde(default = "default_binary")]
    pub binary: PathBuf,
    /// Netscape cookie file, passed only when it exists on disk.
    #[serde(default = "default_cookie_file")]
    pub cookie_file: Option<PathBuf>,
    #[serde(default = "default_retries")]
    pub retries: u32,
    #[serde(default = "default_retries")]
    pub fragment_retries: u32,
    #[serde(default = "default_secondary_retries")]
    pub file_access_retries: u32,
    #[serde(default = "default_secondary_retries")]
    pub extractor_retries: u32,
    /// Lower bound of yt-dlp's own sleep between requests (seconds).
    #[serde(default = "default_sleep_min")]
    pub sleep_interval_min_secs: u32,
    /// Upper bound of yt-dlp's own sleep between requests (seconds).
    #[serde(default = "default_sleep_max")]
    pub sleep_interval_max_secs: u32,
    #[serde(default = "default_max_sleep")]
    pub max_sleep_interval_secs: u32,
    #[serde(default = "default_geo_country")]
    pub geo_bypass_country: Option<String>,
    #[serde(default = "default_merge_format")]
    pub merge_output_format: String,
    #[serde(default = "default_probe_timeout")]
    pub probe_timeout_secs: u64,
    #[serde(default = "default_fetch_timeout")]
    pub fetch_timeout_secs: u64,
    /// User agents rotated between requests.
    #[serde(default = "default_user_agents")]
    pub user_agents: Vec<String>,
}

impl Default for FetcherConfig {
    fn default() -> Self {
        Self {
            binary: default_binary(),
            cookie_file: default_cookie_file(),
            retries: default_retries(),
            fragment_retries: default_retries(),
            file_access_retries: default_secondary_retries(),
            extractor_retries: default_secondary_retries(),
            sleep_interval_min_secs: default_sleep_min(),
            sleep_interval_max_secs: default_sleep_max(),
            max_sleep_interval_secs: default_max_sleep(),
            geo_bypass_country: default_geo_country(),
            merge_output_format: default_merge_format(),
            probe_timeout_secs: default_probe_timeout(),
            fetch_timeout_secs: default_fetch_timeout(),
            user_agents: default_user_agents(),
        }
    }
}

fn default_binary() -> PathBuf {
    PathBuf::from("yt-dlp")
}

fn default_cookie_file() -> Option<PathBuf> {
    Some(PathBuf::from("cookies.txt"))
}

fn default_retries() -> u32 {
    10
}

fn default_secondary_retries() -> u32 {
    5
}

fn default_sleep_min() -> u32 {
    1
}

fn default_sleep_max() -> u32 {
    3
}

fn default_max_sleep() -> u32 {
    5
}

fn default_geo_country() -> Option<String> {
    Some("TW".to_string())
}

fn default_merge_format() -> String {
    "mp4".to_string()
}

fn default_probe_timeout() -> u64 {
    120
}

fn default_fetch_timeout() -> u64 {
    7200 // 2 hours
}

fn default_user_agents() -> Vec<String> {
    [
        "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/122.0.0.0 Safari/537.36",
        "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/122.0.0.0 Safari/537.36",
        "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.0 Safari/605.1.15",
        "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:124.0) Gecko/20100101 Firefox/124.0",
    ]
    .iter()
    .map(|ua| ua.to_string())
    .collect()
}

/// Per-target retry schedule
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RetryConfig {
    /// Total attempts per target, including the first one.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    #[serde(default = "default_base_delay")]
    pub base_delay_ms: u64,
    #[serde(default = "default_max_delay")]
    pub max_delay_ms: u64,
    #[serde(default = "default_true")]
    pub jitter: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            base_delay_ms: default_base_delay(),
            max_delay_ms: default_max_delay(),
            jitter: true,
        }
    }
}

fn default_max_attempts() -> u32 {
    3
}

fn default_base_delay() -> u64 {
    2000
}

fn default_max_delay() -> u64 {
    30_000
}

fn default_true() -> bool {
    true
}

/// Inter-job pacing range
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PacingConfig {
    #[serde(default = "default_pacing_min")]
    pub min_delay_ms: u64,
    #[serde(default = "default_pacing_max")]
    pub max_delay_ms: u64,
}

impl Default for PacingConfig {
    fn default() -> Self {
        Self {
            min_delay_ms: default_pacing_min(),
            max_delay_ms: default_pacing_max(),
        }
    }
}

fn default_pacing_min() -> u64 {
    5000
}

fn default_pacing_max() -> u64 {
    15_000
}

/// Artifact verification and sweep rules
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct IntegrityConfig {
    /// Artifacts below this size are treated as incomplete.
    #[serde(default = "default_min_artifact_bytes")]
    pub min_artifact_bytes: u64,
    /// Extension of the final artifact, without the dot.
    #[serde(default = "default_artifact_extension")]
    pub artifact_extension: String,
    /// Extensions the directory sweep keeps; everything else is removed.
    #[serde(default = "default_allowed_extensions")]
    pub allowed_extensions: Vec<String>,
}

impl Default for IntegrityConfig {
    fn default() -> Self {
        Self {
            min_artifact_bytes: default_min_artifact_bytes(),
            artifact_extension: default_artifact_extension(),
            allowed_extensions: default_allowed_extensions(),
        }
    }
}

fn default_min_artifact_bytes() -> u64 {
    1024 * 1024
}

fn default_artifact_extension() -> String {
    "mp4".to_string()
}

fn default_allowed_extensions() -> Vec<String> {
    vec!["mp4".to_string(), "json".to_string(), "txt".to_string()]
}
