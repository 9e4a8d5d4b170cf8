//! Deterministic output paths for categories and artifacts.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use crate::catalog::{CatalogStore, Target};

/// Maps catalog entries onto the output tree: `<root>/<category>/<safe_title>.<ext>`.
#[derive(Debug, Clone)]
pub struct OutputLayout {
    root: PathBuf,
    artifact_extension: String,
}

impl OutputLayout {
    pub fn new(root: impl Into<PathBuf>, artifact_extension: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            artifact_extension: artifact_extension.into().trim_start_matches('.').to_string(),
        }
    }

    /// Root of the output tree.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Extension of final artifacts, without the leading dot.
    pub fn artifact_extension(&self) -> &str {
        &self.artifact_extension
    }

    /// Output directory for a category.
    pub fn category_dir(&self, category: &str) -> PathBuf {
        self.root.join(category)
    }

    /// Final artifact path for a target.
    pub fn artifact_path(&self, target: &Target) -> PathBuf {
        self.category_dir(&target.category)
            .join(format!("{}.{}", target.safe_title, self.artifact_extension))
    }

    /// Output template handed to the fetcher; `%(ext)s` is filled in by it.
    pub fn output_template(&self, target: &Target) -> PathBuf {
        self.category_dir(&target.category)
            .join(format!("{}.%(ext)s", target.safe_title))
    }

    /// Final artifact paths of every catalog target.
    pub fn artifact_paths(&self, catalog: &CatalogStore) -> HashSet<PathBuf> {
        catalog
            .categories()
            .iter()
            .flat_map(|category| category.targets.iter())
            .map(|target| self.artifact_path(target))
            .collect()
    }

    /// Create the category directory if it does not exist yet.
    pub async fn ensure_category_dir(&self, category: &str) -> std::io::Result<PathBuf> {
        let dir = self.category_dir(category);
        tokio::fs::create_dir_all(&dir).await?;
        Ok(dir)
    }
}
