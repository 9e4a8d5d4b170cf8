//! In-memory catalog store loaded from the catalog document.

use std::collections::HashMap;
use std::path::Path;

use tracing::{debug, info, warn};

use super::types::{CatalogDocument, CatalogError, Category, RawCategory, RawTarget, Target};
use crate::quality::QualityLabel;

/// Characters that cannot appear in a file name on common file systems.
const FORBIDDEN_CHARS: &[char] = &['\\', '/', '*', '?', ':', '"', '<', '>', '|'];

/// Fallback base name for targets whose title sanitises to nothing.
const UNNAMED_TARGET: &str = "unnamed_video";

/// Fallback directory name for categories whose name sanitises to nothing.
const UNNAMED_CATEGORY: &str = "unnamed_category";

/// Strip forbidden characters and surrounding whitespace from a path component.
///
/// Returns `unnamed_video` when nothing usable remains.
pub fn sanitize_file_name(raw: &str) -> String {
    sanitize_component(raw).unwrap_or_else(|| UNNAMED_TARGET.to_string())
}

fn sanitize_component(raw: &str) -> Option<String> {
    let cleaned: String = raw
        .chars()
        .filter(|c| !FORBIDDEN_CHARS.contains(c) && !c.is_control())
        .collect();
    let cleaned = cleaned.trim();

    match cleaned {
        "" | "." | ".." => None,
        other => Some(other.to_string()),
    }
}

/// Immutable, ordered view of the categorised acquisition targets.
#[derive(Debug, Clone, Default)]
pub struct CatalogStore {
    categories: Vec<Category>,
    /// url -> (category index, target index)
    by_url: HashMap<String, (usize, usize)>,
}

impl CatalogStore {
    /// An empty catalog, for runs that never look at targets.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Load the catalog document from disk.
    pub fn load(path: &Path) -> Result<Self, CatalogError> {
        let content = std::fs::read_to_string(path).map_err(|e| CatalogError::Unreadable {
            path: path.to_path_buf(),
            source: e,
        })?;
        let store = Self::from_json(&content)?;
        info!(
            path = %path.display(),
            categories = store.categories.len(),
            targets = store.target_count(),
            "Catalog loaded"
        );
        Ok(store)
    }

    /// Parse a catalog document from a JSON string.
    pub fn from_json(json: &str) -> Result<Self, CatalogError> {
        let document: CatalogDocument =
            serde_json::from_str(json).map_err(|e| CatalogError::Malformed(e.to_string()))?;
        Self::from_document(document)
    }

    /// Build the store from a parsed document.
    ///
    /// Entries without a url or without any title are skipped with a warning,
    /// as are repeated urls after their first occurrence.
    pub fn from_document(document: CatalogDocument) -> Result<Self, CatalogError> {
        let mut store = Self::default();

        for (raw_name, body) in document.categories {
            let raw_category: RawCategory = serde_json::from_value(body).map_err(|e| {
                CatalogError::Malformed(format!("category '{}': {}", raw_name, e))
            })?;

            let name = sanitize_component(&raw_name).unwrap_or_else(|| {
                warn!(category = %raw_name, "Category name is not a usable directory name");
                UNNAMED_CATEGORY.to_string()
            });
            let category_idx = store.categories.len();
            let mut targets = Vec::with_capacity(raw_category.videos.len());

            for (position, value) in raw_category.videos.into_iter().enumerate() {
                let Some(target) = Self::build_target(&name, position, value) else {
                    continue;
                };

                if store.by_url.contains_key(&target.url) {
                    warn!(
                        url = %target.url,
                        category = %name,
                        "Duplicate url in catalog, keeping first occurrence"
                    );
                    continue;
                }

                store
                    .by_url
                    .insert(target.url.clone(), (category_idx, targets.len()));
                targets.push(target);
            }

            debug!(category = %name, targets = targets.len(), "Category loaded");
            store.categories.push(Category { name, targets });
        }

        Ok(store)
    }

    fn build_target(category: &str, position: usize, value: serde_json::Value) -> Option<Target> {
        let raw: RawTarget = match serde_json::from_value(value) {
            Ok(raw) => raw,
            Err(e) => {
                warn!(category, position, error = %e, "Skipping malformed catalog entry");
                return None;
            }
        };

        let url = match raw.url.as_deref().map(str::trim) {
            Some(url) if !url.is_empty() => url.to_string(),
            _ => {
                warn!(category, position, "Skipping catalog entry without url");
                return None;
            }
        };

        let title = raw.title.clone().unwrap_or_default();
        let base = raw
            .safe_title
            .as_deref()
            .filter(|s| !s.trim().is_empty())
            .unwrap_or(title.as_str());
        if base.trim().is_empty() {
            warn!(category, url = %url, "Skipping catalog entry without title");
            return None;
        }

        let safe_title = sanitize_file_name(base);
        let display_title = if title.trim().is_empty() {
            base.to_string()
        } else {
            title.clone()
        };
        let preferred_quality = raw
            .resolution
            .as_deref()
            .and_then(QualityLabel::parse_optional);

        Some(Target {
            url,
            safe_title,
            title: display_title,
            preferred_quality,
            category: category.to_string(),
            filename: raw.filename,
        })
    }

    /// Categories in document order.
    pub fn categories(&self) -> &[Category] {
        &self.categories
    }

    /// Look up a target by its url.
    pub fn find(&self, url: &str) -> Option<&Target> {
        self.by_url
            .get(url)
            .and_then(|&(c, t)| self.categories.get(c)?.targets.get(t))
    }

    /// Total number of targets across all categories.
    pub fn target_count(&self) -> usize {
        self.by_url.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_url.is_empty()
    }
}
