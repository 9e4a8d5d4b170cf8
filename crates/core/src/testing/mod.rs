//! Testing utilities and mock implementations.
//!
//! This module provides a scriptable [`MockFetcher`] standing in for the
//! external media fetcher, plus fixtures for catalogs and on-disk files, so
//! the worker and orchestrator can be exercised end to end in a temp dir.
//!
//! # Example
//!
//! ```rust,ignore
//! use reelkeep_core::testing::{fixtures, MockFetcher};
//!
//! let json = fixtures::CatalogBuilder::new()
//!     .category("A")
//!     .video("https://v/1", "One", Some("720p"))
//!     .to_json();
//! let fetcher = MockFetcher::new();
//! fetcher.set_qualities("https://v/1", &[480, 720]).await;
//! ```

mod mock_fetcher;

pub use mock_fetcher::{MockFetcher, RecordedProbe};

/// Test fixtures and helper functions.
pub mod fixtures {
    use serde_json::{json, Map, Value};
    use std::path::Path;

    use crate::catalog::{sanitize_file_name, Target};
    use crate::quality::QualityLabel;

    /// Builds catalog documents in the on-disk JSON shape.
    #[derive(Debug, Default)]
    pub struct CatalogBuilder {
        categories: Vec<(String, Vec<Value>)>,
    }

    impl CatalogBuilder {
        pub fn new() -> Self {
            Self::default()
        }

        /// Start a new category; following videos go into it.
        pub fn category(mut self, name: &str) -> Self {
            self.categories.push((name.to_string(), Vec::new()));
            self
        }

        /// Add a video to the current category.
        pub fn video(self, url: &str, title: &str, resolution: Option<&str>) -> Self {
            let mut entry = json!({ "url": url, "title": title });
            if let Some(resolution) = resolution {
                entry["resolution"] = Value::String(resolution.to_string());
            }
            self.raw_video(entry)
        }

        /// Add an arbitrary JSON entry to the current category.
        pub fn raw_video(mut self, entry: Value) -> Self {
            if self.categories.is_empty() {
                self.categories.push(("default".to_string(), Vec::new()));
            }
            if let Some((_, videos)) = self.categories.last_mut() {
                videos.push(entry);
            }
            self
        }

        pub fn to_value(&self) -> Value {
            let mut categories = Map::new();
            for (name, videos) in &self.categories {
                categories.insert(name.clone(), json!({ "videos": videos }));
            }
            json!({ "categories": categories })
        }

        pub fn to_json(&self) -> String {
            self.to_value().to_string()
        }

        /// Write the catalog to `path`.
        pub fn write_to(&self, path: &Path) {
            write_bytes(path, self.to_json().as_bytes());
        }
    }

    /// Create a target with a sanitised title and no preferred quality.
    pub fn target(url: &str, title: &str, category: &str) -> Target {
        Target {
            url: url.to_string(),
            title: title.to_string(),
            safe_title: sanitize_file_name(title),
            preferred_quality: None,
            category: category.to_string(),
            filename: None,
        }
    }

    /// Create a target preferring `quality` (e.g. `"720p"`).
    pub fn target_with_quality(url: &str, title: &str, category: &str, quality: &str) -> Target {
        let mut target = target(url, title, category);
        target.preferred_quality = QualityLabel::parse_optional(quality);
        target
    }

    /// Write a file of `size` zero bytes, creating parent directories.
    pub fn write_file(path: &Path, size: usize) {
        write_bytes(path, &vec![0u8; size]);
    }

    fn write_bytes(path: &Path, bytes: &[u8]) {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).unwrap();
        }
        std::fs::write(path, bytes).unwrap();
    }
}
