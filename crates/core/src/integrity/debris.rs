//! Known partial-download debris left next to an artifact.
//!
//! Every pattern is matched against the part of a file name that follows
//! `<base>.`, where `<base>` is the target's safe title. The final artifact
//! (`<base>.mp4`) never matches. A sibling target whose safe title starts with
//! `<base>.` can have an artifact that looks like debris (`Lecture.temp.mp4`
//! for `Lecture`), so callers pass the artifact paths that must be kept.

use once_cell::sync::Lazy;
use regex_lite::Regex;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::metrics;

/// `f137.mp4`, `f251.webm`, `f140-1.m4a`
static FORMAT_SEGMENT: Lazy<Option<Regex>> =
    Lazy::new(|| Regex::new(r"^f\d+(-\d+)?\.[A-Za-z0-9]+$").ok());

/// Kinds of debris the fetcher may leave behind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DebrisPattern {
    /// In-progress transfer: `<base>.part`, `<base>.mp4.part`, `<base>.f137.mp4.part`.
    PartialDownload,
    /// Resume state: `<base>.mp4.ytdl`.
    ResumeState,
    /// Intermediate container written while merging or recoding: `<base>.temp.mp4`.
    TempContainer,
    /// Per-format stream before merge: `<base>.f137.mp4`.
    FormatSegment,
    /// Audio-only stream before merge: `<base>.f140.m4a`.
    AudioFragment,
    /// Thumbnail sidecar: `<base>.webp`, `<base>.jpg`.
    Thumbnail,
}

/// Every recognised debris kind.
pub const KNOWN_DEBRIS: &[DebrisPattern] = &[
    DebrisPattern::PartialDownload,
    DebrisPattern::ResumeState,
    DebrisPattern::TempContainer,
    DebrisPattern::FormatSegment,
    DebrisPattern::AudioFragment,
    DebrisPattern::Thumbnail,
];

const THUMBNAIL_EXTENSIONS: &[&str] = &["webp", "jpg", "jpeg", "png"];

impl DebrisPattern {
    /// Whether `file_name` is debris of this kind for the artifact base name `base`.
    pub fn matches(&self, base: &str, file_name: &str) -> bool {
        let Some(suffix) = file_name
            .strip_prefix(base)
            .and_then(|rest| rest.strip_prefix('.'))
        else {
            return false;
        };
        if suffix.is_empty() {
            return false;
        }

        match self {
            Self::PartialDownload => suffix.ends_with("part"),
            Self::ResumeState => suffix == "ytdl" || suffix.ends_with(".ytdl"),
            Self::TempContainer => suffix.starts_with("temp."),
            Self::FormatSegment => FORMAT_SEGMENT
                .as_ref()
                .is_some_and(|re| re.is_match(suffix)),
            Self::AudioFragment => suffix.len() > ".m4a".len() && suffix.ends_with(".m4a"),
            Self::Thumbnail => THUMBNAIL_EXTENSIONS
                .iter()
                .any(|ext| suffix.eq_ignore_ascii_case(ext)),
        }
    }

    /// The first known pattern matching `file_name`, if any.
    pub fn classify(base: &str, file_name: &str) -> Option<Self> {
        KNOWN_DEBRIS
            .iter()
            .copied()
            .find(|p| p.matches(base, file_name))
    }
}

/// List debris files for `base` directly inside `dir`, skipping any path in `keep`.
pub async fn find_debris(
    dir: &Path,
    base: &str,
    keep: &HashSet<PathBuf>,
) -> std::io::Result<Vec<PathBuf>> {
    let mut entries = match tokio::fs::read_dir(dir).await {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(e),
    };

    let mut found = Vec::new();
    while let Some(entry) = entries.next_entry().await? {
        if !entry.file_type().await?.is_file() {
            continue;
        }
        let name = entry.file_name();
        let Some(name) = name.to_str() else {
            continue;
        };
        if DebrisPattern::classify(base, name).is_none() {
            continue;
        }
        let path = entry.path();
        if keep.contains(&path) {
            debug!(path = %path.display(), "Name matches debris but is a known artifact, keeping");
            continue;
        }
        found.push(path);
    }
    found.sort();
    Ok(found)
}

/// Delete debris files for `base` inside `dir`, never touching a path in
/// `keep`. Returns how many were removed.
pub async fn remove_debris(
    dir: &Path,
    base: &str,
    keep: &HashSet<PathBuf>,
) -> std::io::Result<usize> {
    let mut removed = 0;
    for path in find_debris(dir, base, keep).await? {
        match tokio::fs::remove_file(&path).await {
            Ok(()) => {
                debug!(path = %path.display(), "Removed partial download");
                removed += 1;
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => warn!(path = %path.display(), error = %e, "Failed to remove partial download"),
        }
    }
    metrics::DEBRIS_REMOVED.inc_by(removed as u64);
    Ok(removed)
}
