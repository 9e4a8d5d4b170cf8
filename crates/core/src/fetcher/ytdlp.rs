//! yt-dlp based fetcher implementation.

use async_trait::async_trait;
use serde::Deserialize;
use std::process::Stdio;
use std::time::Instant;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;
use tokio::time::{timeout, Duration};
use tracing::debug;

use super::error::FetchError;
use super::traits::MediaFetcher;
use super::types::{FetchReport, FetchRequest, ProbeResult};
use crate::config::FetcherConfig;
use crate::quality::{QualityLabel, QualityOption};

/// stderr fragments that mark the resource itself as unavailable rather than
/// the request failing. Reported as `FetchError::Unavailable`; the worker still
/// retries them like any other probe failure.
const UNAVAILABLE_MARKERS: &[&str] = &[
    "Video unavailable",
    "Private video",
    "This video has been removed",
    "Sign in to confirm your age",
    "not available in your country",
    "blocked it in your country",
    "members-only content",
];

/// Fetcher driving the external `yt-dlp` executable.
pub struct YtDlpFetcher {
    config: FetcherConfig,
}

impl YtDlpFetcher {
    /// Creates a new yt-dlp fetcher with the given configuration.
    pub fn new(config: FetcherConfig) -> Self {
        Self { config }
    }

    /// Creates a fetcher with default configuration.
    pub fn with_defaults() -> Self {
        Self::new(FetcherConfig::default())
    }

    /// Command for the yt-dlp binary.
    ///
    /// The child gets its own process group so a terminal interrupt reaches only
    /// this process; stopping is decided between targets, never mid-transfer.
    fn command(&self) -> Command {
        let mut cmd = Command::new(&self.config.binary);
        cmd.stdin(Stdio::null()).kill_on_drop(true);
        #[cfg(unix)]
        cmd.process_group(0);
        cmd
    }

    /// Arguments shared by probe and fetch: identity, cookies, geo bypass.
    fn common_args(&self, user_agent: Option<&str>) -> Vec<String> {
        let mut args = vec!["--no-playlist".to_string()];

        if let Some(ua) = user_agent {
            args.extend(["--user-agent".to_string(), ua.to_string()]);
        }

        // Only pass the cookie file when it is actually there
        if let Some(ref cookies) = self.config.cookie_file {
            if cookies.exists() {
                args.extend([
                    "--cookies".to_string(),
                    cookies.to_string_lossy().to_string(),
                ]);
            }
        }

        if let Some(ref country) = self.config.geo_bypass_country {
            args.extend(["--geo-bypass-country".to_string(), country.clone()]);
        }

        args
    }

    /// Builds yt-dlp arguments for a metadata-only probe.
    fn build_probe_args(&self, url: &str, user_agent: Option<&str>) -> Vec<String> {
        let mut args = vec![
            "-J".to_string(),
            "--skip-download".to_string(),
            "--no-warnings".to_string(),
            "--extractor-retries".to_string(),
            self.config.extractor_retries.to_string(),
        ];
        args.extend(self.common_args(user_agent));
        args.push(url.to_string());
        args
    }

    /// Builds yt-dlp arguments for a transfer.
    fn build_fetch_args(&self, request: &FetchRequest) -> Vec<String> {
        let merge = self.config.merge_output_format.clone();
        let mut args = vec![
            "-f".to_string(),
            request.format.as_str().to_string(),
            "-o".to_string(),
            request.output_template.to_string_lossy().to_string(),
            "--merge-output-format".to_string(),
            merge.clone(),
            "--recode-video".to_string(),
            merge,
            "--no-write-thumbnail".to_string(),
            "--newline".to_string(),
            // Retry budgets of the transfer itself
            "--retries".to_string(),
            self.config.retries.to_string(),
            "--fragment-retries".to_string(),
            self.config.fragment_retries.to_string(),
            "--file-access-retries".to_string(),
            self.config.file_access_retries.to_string(),
            "--extractor-retries".to_string(),
            self.config.extractor_retries.to_string(),
            // Request pacing inside the transfer
            "--sleep-interval".to_string(),
            self.config.sleep_interval_min_secs.to_string(),
            "--max-sleep-interval".to_string(),
            self.config
                .max_sleep_interval_secs
                .max(self.config.sleep_interval_max_secs)
                .to_string(),
        ];
        args.extend(self.common_args(request.user_agent.as_deref()));
        args.push(request.url.clone());
        args
    }

    /// Parses `yt-dlp -J` output into a ProbeResult.
    fn parse_probe_output(output: &str) -> Result<ProbeResult, FetchError> {
        #[derive(Deserialize)]
        struct ProbeOutput {
            title: Option<String>,
            #[serde(default)]
            formats: Vec<ProbeFormat>,
        }

        #[derive(Deserialize)]
        struct ProbeFormat {
            format_id: Option<String>,
            height: Option<u32>,
            ext: Option<String>,
            vcodec: Option<String>,
        }

        let probe: ProbeOutput = serde_json::from_str(output)
            .map_err(|e| FetchError::InvalidProbeOutput(e.to_string()))?;

        let options = probe
            .formats
            .into_iter()
            .filter(|f| f.vcodec.as_deref() != Some("none"))
            .filter_map(|f| {
                let label = f.height.and_then(QualityLabel::from_height)?;
                Some(QualityOption {
                    label,
                    format_id: f.format_id.unwrap_or_default(),
                    ext: f.ext,
                    video_codec: f.vcodec,
                })
            })
            .collect();

        Ok(ProbeResult {
            title: probe.title,
            options,
        })
    }

    /// Maps a failed probe's stderr onto the error taxonomy.
    fn classify_probe_failure(url: &str, stderr: &str) -> FetchError {
        let reason = last_error_line(stderr);
        if UNAVAILABLE_MARKERS.iter().any(|m| stderr.contains(m)) {
            FetchError::Unavailable {
                url: url.to_string(),
                reason,
            }
        } else {
            FetchError::ProbeFailed {
                url: url.to_string(),
                reason,
            }
        }
    }

    fn spawn_error(&self, e: std::io::Error) -> FetchError {
        if e.kind() == std::io::ErrorKind::NotFound {
            FetchError::BinaryNotFound {
                path: self.config.binary.clone(),
            }
        } else {
            FetchError::Io(e)
        }
    }
}

/// The most informative line of yt-dlp's stderr.
fn last_error_line(stderr: &str) -> String {
    let lines: Vec<&str> = stderr.lines().map(str::trim).filter(|l| !l.is_empty()).collect();
    lines
        .iter()
        .rev()
        .find(|l| l.starts_with("ERROR"))
        .or_else(|| lines.last())
        .map(|l| l.to_string())
        .unwrap_or_else(|| "no error output".to_string())
}

#[async_trait]
impl MediaFetcher for YtDlpFetcher {
    fn name(&self) -> &str {
        "yt-dlp"
    }

    async fn validate(&self) -> Result<(), FetchError> {
        let output = self
            .command()
            .arg("--version")
            .output()
            .await
            .map_err(|e| self.spawn_error(e))?;

        if !output.status.success() {
            return Err(FetchError::BinaryNotFound {
                path: self.config.binary.clone(),
            });
        }

        debug!(
            version = %String::from_utf8_lossy(&output.stdout).trim(),
            "yt-dlp available"
        );
        Ok(())
    }

    async fn probe(&self, url: &str, user_agent: Option<&str>) -> Result<ProbeResult, FetchError> {
        let args = self.build_probe_args(url, user_agent);
        let mut cmd = self.command();
        cmd.args(&args);
        let run = cmd.output();

        let output = timeout(Duration::from_secs(self.config.probe_timeout_secs), run)
            .await
            .map_err(|_| FetchError::Timeout {
                secs: self.config.probe_timeout_secs,
            })?
            .map_err(|e| self.spawn_error(e))?;

        if !output.status.success() {
            return Err(Self::classify_probe_failure(
                url,
                &String::from_utf8_lossy(&output.stderr),
            ));
        }

        Self::parse_probe_output(&String::from_utf8_lossy(&output.stdout))
    }

    async fn fetch(&self, request: FetchRequest) -> Result<FetchReport, FetchError> {
        let start = Instant::now();
        let args = self.build_fetch_args(&request);

        let mut child = self
            .command()
            .args(&args)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| self.spawn_error(e))?;

        let stdout = child.stdout.take().ok_or_else(|| {
            FetchError::Io(std::io::Error::other("yt-dlp stdout not captured"))
        })?;
        let stderr = child.stderr.take().ok_or_else(|| {
            FetchError::Io(std::io::Error::other("yt-dlp stderr not captured"))
        })?;

        // Progress goes to stdout; forward it to the log
        let url_for_log = request.url.clone();
        let stdout_task = tokio::spawn(async move {
            let mut lines = BufReader::new(stdout).lines();
            while let Ok(Some(line)) = lines.next_line().await {
                debug!(url = %url_for_log, "{}", line);
            }
        });

        let timeout_duration = Duration::from_secs(self.config.fetch_timeout_secs);
        let result = timeout(timeout_duration, async {
            let mut error_output = String::new();
            let mut lines = BufReader::new(stderr).lines();
            while let Ok(Some(line)) = lines.next_line().await {
                debug!(url = %request.url, stderr = true, "{}", line);
                error_output.push_str(&line);
                error_output.push('\n');
            }

            let status = child.wait().await?;
            Ok::<(std::process::ExitStatus, String), std::io::Error>((status, error_output))
        })
        .await;

        let outcome = match result {
            Ok(Ok((status, error_output))) => {
                if status.success() {
                    Ok(FetchReport {
                        duration_ms: start.elapsed().as_millis() as u64,
                    })
                } else {
                    Err(FetchError::FetchFailed {
                        url: request.url.clone(),
                        reason: format!(
                            "yt-dlp exited with code {:?}: {}",
                            status.code(),
                            last_error_line(&error_output)
                        ),
                    })
                }
            }
            Ok(Err(e)) => Err(FetchError::Io(e)),
            Err(_) => {
                // Kill the process on timeout
                let _ = child.kill().await;
                Err(FetchError::Timeout {
                    secs: self.config.fetch_timeout_secs,
                })
            }
        };

        let _ = stdout_task.await;
        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetcher::FormatSelector;
    use std::path::PathBuf;

    fn fetcher() -> YtDlpFetcher {
        YtDlpFetcher::new(FetcherConfig {
            cookie_file: None,
            ..FetcherConfig::default()
        })
    }

    #[test]
    fn test_parse_probe_output() {
        let json = r#"{
            "title": "Sample",
            "formats": [
                {"format_id": "140", "ext": "m4a", "vcodec": "none", "height": null},
                {"format_id": "18", "ext": "mp4", "vcodec": "avc1", "height": 360},
                {"format_id": "22", "ext": "mp4", "vcodec": "avc1", "height": 720},
                {"format_id": "sb0", "ext": "mhtml", "vcodec": "none", "height": 90},
                {"format_id": "137", "ext": "mp4", "vcodec": "avc1", "height": 1080}
            ]
        }"#;

        let result = YtDlpFetcher::parse_probe_output(json).unwrap();
        assert_eq!(result.title.as_deref(), Some("Sample"));
        let heights: Vec<u32> = result.options.iter().map(|o| o.label.height()).collect();
        assert_eq!(heights, vec![360, 720, 1080]);
        assert_eq!(result.options[1].format_id, "22");
    }

    #[test]
    fn test_parse_probe_output_without_formats() {
        let result = YtDlpFetcher::parse_probe_output(r#"{"title": "x"}"#).unwrap();
        assert!(result.options.is_empty());
    }

    #[test]
    fn test_parse_probe_output_invalid() {
        assert!(matches!(
            YtDlpFetcher::parse_probe_output("WARNING: nope"),
            Err(FetchError::InvalidProbeOutput(_))
        ));
    }

    #[test]
    fn test_classify_probe_failure() {
        let unavailable = YtDlpFetcher::classify_probe_failure(
            "u",
            "WARNING: something\nERROR: [youtube] abc: Sign in to confirm your age\n",
        );
        assert!(matches!(unavailable, FetchError::Unavailable { .. }));

        let transient = YtDlpFetcher::classify_probe_failure(
            "u",
            "ERROR: Unable to download webpage: HTTP Error 503\n",
        );
        match transient {
            FetchError::ProbeFailed { reason, .. } => assert!(reason.contains("503")),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_last_error_line() {
        assert_eq!(
            last_error_line("ERROR: first\nsome trailing noise\n"),
            "ERROR: first"
        );
        assert_eq!(last_error_line("only line"), "only line");
        assert_eq!(last_error_line(""), "no error output");
    }

    #[test]
    fn test_build_probe_args() {
        let args = fetcher().build_probe_args("https://youtu.be/x", Some("agent"));
        assert_eq!(args.first().map(String::as_str), Some("-J"));
        assert!(args.contains(&"--skip-download".to_string()));
        assert!(args.windows(2).any(|w| w[0] == "--user-agent" && w[1] == "agent"));
        assert!(args
            .windows(2)
            .any(|w| w[0] == "--geo-bypass-country" && w[1] == "TW"));
        assert!(!args.contains(&"--cookies".to_string()));
        assert_eq!(args.last().map(String::as_str), Some("https://youtu.be/x"));
    }

    #[test]
    fn test_build_fetch_args() {
        let label: QualityLabel = "720p".parse().unwrap();
        let request = FetchRequest {
            url: "https://youtu.be/x".to_string(),
            format: FormatSelector::exact(label),
            output_template: PathBuf::from("/out/Cat/Clip.%(ext)s"),
            expected_path: PathBuf::from("/out/Cat/Clip.mp4"),
            user_agent: None,
        };

        let args = fetcher().build_fetch_args(&request);
        assert!(args
            .windows(2)
            .any(|w| w[0] == "-f" && w[1].contains("height=720")));
        assert!(args
            .windows(2)
            .any(|w| w[0] == "-o" && w[1] == "/out/Cat/Clip.%(ext)s"));
        assert!(args
            .windows(2)
            .any(|w| w[0] == "--merge-output-format" && w[1] == "mp4"));
        assert!(args.windows(2).any(|w| w[0] == "--retries" && w[1] == "10"));
        assert!(!args.contains(&"--user-agent".to_string()));
        assert_eq!(args.last().map(String::as_str), Some("https://youtu.be/x"));
    }

    #[test]
    fn test_cookie_file_passed_only_when_present() {
        let dir = tempfile::TempDir::new().unwrap();
        let cookie_path = dir.path().join("cookies.txt");

        let f = YtDlpFetcher::new(FetcherConfig {
            cookie_file: Some(cookie_path.clone()),
            ..FetcherConfig::default()
        });
        assert!(!f.common_args(None).contains(&"--cookies".to_string()));

        std::fs::write(&cookie_path, "# Netscape HTTP Cookie File\n").unwrap();
        assert!(f.common_args(None).contains(&"--cookies".to_string()));
    }

    #[tokio::test]
    async fn test_validate_missing_binary() {
        let f = YtDlpFetcher::new(FetcherConfig {
            binary: PathBuf::from("/nonexistent/yt-dlp-binary"),
            ..FetcherConfig::default()
        });
        assert!(matches!(
            f.validate().await,
            Err(FetchError::BinaryNotFound { .. })
        ));
    }

    #[cfg(target_os = "linux")]
    #[tokio::test]
    async fn test_child_runs_in_its_own_process_group() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::TempDir::new().unwrap();
        let report = dir.path().join("pgid.txt");
        let script = dir.path().join("fake-ytdlp");
        std::fs::write(
            &script,
            format!(
                "#!/bin/sh\nread -r _ _ _ _ pgid _ < /proc/$$/stat\necho \"$$ $pgid\" > '{}'\necho '{{\"title\": \"t\", \"formats\": []}}'\n",
                report.display()
            ),
        )
        .unwrap();
        std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755)).unwrap();

        let f = YtDlpFetcher::new(FetcherConfig {
            binary: script,
            cookie_file: None,
            ..FetcherConfig::default()
        });
        let result = f.probe("https://youtu.be/x", None).await.unwrap();
        assert!(result.options.is_empty());

        let ids = std::fs::read_to_string(&report).unwrap();
        let ids: Vec<&str> = ids.split_whitespace().collect();
        assert_eq!(ids.len(), 2);
        assert_eq!(ids[0], ids[1], "child should lead its own process group");
    }
}
