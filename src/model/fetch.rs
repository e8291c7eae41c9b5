//! Model artifact acquisition: local path override or hub fetch-and-cache.
//!
//! The hub client keeps a local cache, so repeat runs resolve the artifact
//! without touching the network. Callers only ever see a ready path.

use std::path::PathBuf;

use anyhow::{ensure, Context, Result};
use hf_hub::api::sync::ApiBuilder;
use tracing::info;

pub const DEFAULT_REPO: &str = "adarshsolanki/mandarin-tone-classifier";
pub const DEFAULT_FILENAME: &str = "model.onnx";

/// Where the classifier artifact comes from.
#[derive(Debug, Clone)]
pub struct ModelSource {
    /// Explicit local file; skips the hub entirely when set.
    pub path: Option<PathBuf>,
    /// Hub repository holding the artifact.
    pub repo: String,
    /// Artifact filename inside the repository.
    pub filename: String,
}

impl Default for ModelSource {
    fn default() -> Self {
        Self {
            path: None,
            repo: DEFAULT_REPO.to_string(),
            filename: DEFAULT_FILENAME.to_string(),
        }
    }
}

impl ModelSource {
    /// Resolve to a local file, downloading into the cache on first use.
    pub fn resolve(&self) -> Result<PathBuf> {
        if let Some(path) = &self.path {
            ensure!(
                path.is_file(),
                "model artifact {} does not exist",
                path.display()
            );
            return Ok(path.clone());
        }
        info!(repo = %self.repo, file = %self.filename, "resolving model artifact via hub cache");
        let api = ApiBuilder::new()
            .with_progress(true)
            .build()
            .context("failed to construct hub client")?;
        let path = api
            .model(self.repo.clone())
            .get(&self.filename)
            .with_context(|| {
                format!(
                    "failed to fetch '{}' from '{}'; pass --model-path to use a local copy",
                    self.filename, self.repo
                )
            })?;
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::ModelSource;
    use std::path::PathBuf;

    #[test]
    fn missing_local_override_is_an_error() {
        let source = ModelSource {
            path: Some(PathBuf::from("/nonexistent/model.onnx")),
            ..ModelSource::default()
        };
        assert!(source.resolve().is_err());
    }

    #[test]
    fn local_override_passes_through() {
        let file = tempfile::NamedTempFile::new().unwrap();
        let source = ModelSource {
            path: Some(file.path().to_path_buf()),
            ..ModelSource::default()
        };
        let resolved = source.resolve().unwrap();
        assert_eq!(resolved, file.path());
    }
}
