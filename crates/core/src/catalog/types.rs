//! Types for the acquisition catalog.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

use crate::quality::QualityLabel;

/// One catalogued video awaiting acquisition.
///
/// Immutable once loaded; `url` is the unique key across the whole catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Target {
    /// Source url, the identity used by the ledger.
    pub url: String,
    /// Human readable title.
    pub title: String,
    /// File-system safe base name of the artifact (no extension).
    pub safe_title: String,
    /// Quality declared by the catalog, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub preferred_quality: Option<QualityLabel>,
    /// Name of the category this target belongs to.
    pub category: String,
    /// File name suggested by the extractor; informational only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,
}

/// A named, ordered group of targets sharing one output directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub name: String,
    pub targets: Vec<Target>,
}

/// Raw catalog document as written by the link extractor.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CatalogDocument {
    /// Category name -> category body, in document order.
    #[serde(default)]
    pub categories: serde_json::Map<String, serde_json::Value>,
}

/// Raw category body.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawCategory {
    #[serde(default)]
    pub videos: Vec<serde_json::Value>,
}

/// Raw video entry. Every field is optional so one bad entry cannot fail the document.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawTarget {
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub safe_title: Option<String>,
    #[serde(default)]
    pub resolution: Option<String>,
    #[serde(default)]
    pub filename: Option<String>,
}

/// Errors for catalog operations.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// The catalog file could not be read.
    #[error("catalog unreadable at {path}: {source}")]
    Unreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The document is not a valid catalog.
    #[error("catalog malformed: {0}")]
    Malformed(String),
}
