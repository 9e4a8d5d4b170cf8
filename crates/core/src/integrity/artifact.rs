//! Artifact completeness checks.

use std::path::Path;

/// State of an expected artifact on disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtifactStatus {
    /// Present and at least the minimum size.
    Complete { size: u64 },
    /// Present but below the minimum size.
    Truncated { size: u64 },
    /// Absent, or not a regular file.
    Missing,
}

impl ArtifactStatus {
    pub fn is_complete(&self) -> bool {
        matches!(self, Self::Complete { .. })
    }
}

/// Inspect the artifact at `path` against the `min_bytes` threshold.
pub async fn inspect_artifact(path: &Path, min_bytes: u64) -> std::io::Result<ArtifactStatus> {
    match tokio::fs::metadata(path).await {
        Ok(meta) if !meta.is_file() => Ok(ArtifactStatus::Missing),
        Ok(meta) if meta.len() < min_bytes => Ok(ArtifactStatus::Truncated { size: meta.len() }),
        Ok(meta) => Ok(ArtifactStatus::Complete { size: meta.len() }),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(ArtifactStatus::Missing),
        Err(e) => Err(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_inspect_artifact_states() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("Clip.mp4");

        assert_eq!(
            inspect_artifact(&path, 1024).await.unwrap(),
            ArtifactStatus::Missing
        );

        std::fs::write(&path, vec![0u8; 100]).unwrap();
        assert_eq!(
            inspect_artifact(&path, 1024).await.unwrap(),
            ArtifactStatus::Truncated { size: 100 }
        );

        std::fs::write(&path, vec![0u8; 1024]).unwrap();
        let status = inspect_artifact(&path, 1024).await.unwrap();
        assert!(status.is_complete());
    }

    #[tokio::test]
    async fn test_directory_is_not_an_artifact() {
        let temp = TempDir::new().unwrap();
        assert_eq!(
            inspect_artifact(temp.path(), 1).await.unwrap(),
            ArtifactStatus::Missing
        );
    }
}
