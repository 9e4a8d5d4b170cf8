//! Quality labels and probed variants.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// A nominal quality class, keyed by vertical resolution in pixels (e.g. `720p`).
///
/// Ordering follows the pixel height, so the maximum of a set is the best variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct QualityLabel {
    height: u32,
}

impl QualityLabel {
    /// Create a label from a pixel height. Zero is not a renderable height.
    pub fn from_height(height: u32) -> Option<Self> {
        (height > 0).then_some(Self { height })
    }

    /// Vertical resolution in pixels.
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Parse a catalog value, treating `unknown`, empty and malformed values as absent.
    pub fn parse_optional(raw: &str) -> Option<Self> {
        raw.parse().ok()
    }
}

impl fmt::Display for QualityLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}p", self.height)
    }
}

/// Error parsing a quality label.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid quality label: '{0}'")]
pub struct ParseQualityError(pub String);

impl FromStr for QualityLabel {
    type Err = ParseQualityError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let digits = trimmed
            .strip_suffix('p')
            .or_else(|| trimmed.strip_suffix('P'))
            .unwrap_or(trimmed);

        digits
            .parse::<u32>()
            .ok()
            .and_then(Self::from_height)
            .ok_or_else(|| ParseQualityError(s.to_string()))
    }
}

impl TryFrom<String> for QualityLabel {
    type Error = ParseQualityError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<QualityLabel> for String {
    fn from(label: QualityLabel) -> Self {
        label.to_string()
    }
}

/// One variant of a target reported by a probe.
///
/// Transient: produced per worker attempt and never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QualityOption {
    /// Quality class of this variant.
    pub label: QualityLabel,
    /// Fetcher-specific identifier of the variant.
    pub format_id: String,
    /// Container extension reported by the fetcher.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ext: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub video_codec: Option<String>,
}

/// Collapse probed variants into the set of distinct labels.
pub fn available_labels(options: &[QualityOption]) -> BTreeSet<QualityLabel> {
    options.iter().map(|o| o.label).collect()
}
