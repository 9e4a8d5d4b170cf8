//! Request and result types for the fetcher module.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

use crate::quality::{QualityLabel, QualityOption};

/// Format selection expression handed to the fetcher.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormatSelector(String);

impl FormatSelector {
    /// Exact height match, with a bounded fallback to the best single file.
    pub fn exact(label: QualityLabel) -> Self {
        let h = label.height();
        Self(format!(
            "bestvideo[height={h}][ext=mp4]+bestaudio[ext=m4a]/best[height={h}][ext=mp4]/best"
        ))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for FormatSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// What a probe reported about a resource.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProbeResult {
    /// Title reported by the source, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// Renderable variants.
    pub options: Vec<QualityOption>,
}

/// A request to transfer one resource to disk.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchRequest {
    pub url: String,
    /// Format selection derived from the negotiated quality.
    pub format: FormatSelector,
    /// Output template; the fetcher substitutes the final extension.
    pub output_template: PathBuf,
    /// Where the final artifact is expected once the fetch succeeds.
    pub expected_path: PathBuf,
    /// User agent to present, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_agent: Option<String>,
}

/// Result of a successful transfer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchReport {
    /// Wall-clock duration of the transfer.
    pub duration_ms: u64,
}
