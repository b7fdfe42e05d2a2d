//! Prompt Store — reads named prompt templates from a single base directory.
//!
//! Every name is resolved (symlinks and `..` included) before anything is read, and
//! the result must stay strictly inside the base directory. Files are re-read on every
//! call so template edits take effect immediately.

use std::path::{Path, PathBuf};

use path_absolutize::Absolutize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PromptError {
    #[error("Prompt name must not be empty.")]
    EmptyName,

    #[error("Prompt path '{0}' is outside the prompt directory.")]
    OutOfBounds(String),

    #[error("Prompt '{0}' not found.")]
    NotFound(String),

    #[error("Failed to read prompt '{name}': {source}")]
    Io {
        name: String,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Debug, Clone)]
pub struct PromptStore {
    base_dir: PathBuf,
}

impl PromptStore {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
        }
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    /// Loads the template called `name` and returns its trimmed text.
    pub async fn load(&self, name: &str) -> Result<String, PromptError> {
        if name.is_empty() {
            return Err(PromptError::EmptyName);
        }

        let path = self.resolve(name).await?;

        let is_file = tokio::fs::metadata(&path)
            .await
            .map(|m| m.is_file())
            .unwrap_or(false);
        if !is_file {
            return Err(PromptError::NotFound(name.to_string()));
        }

        let text = tokio::fs::read_to_string(&path)
            .await
            .map_err(|source| PromptError::Io {
                name: name.to_string(),
                source,
            })?;

        Ok(text.trim().to_string())
    }

    /// Resolves `name` against the base directory and enforces containment.
    ///
    /// Only canonical paths are returned, so nothing outside the base is ever read. When
    /// the path cannot be canonicalized it does not exist: a lexical `../` escape is still
    /// reported as out of bounds, anything else as not found.
    async fn resolve(&self, name: &str) -> Result<PathBuf, PromptError> {
        let base = absolute(&self.base_dir, name).await?;
        let joined = base.join(name);

        let resolved = match tokio::fs::canonicalize(&joined).await {
            Ok(path) => path,
            Err(_) => {
                let lexical = joined.absolutize().map_err(|source| PromptError::Io {
                    name: name.to_string(),
                    source,
                })?;
                if !is_inside(&lexical, &base) {
                    return Err(PromptError::OutOfBounds(name.to_string()));
                }
                return Err(PromptError::NotFound(name.to_string()));
            }
        };

        if !is_inside(&resolved, &base) {
            return Err(PromptError::OutOfBounds(name.to_string()));
        }

        Ok(resolved)
    }
}

/// Strict descendant check; the base directory itself does not count.
fn is_inside(path: &Path, base: &Path) -> bool {
    path != base && path.starts_with(base)
}

async fn absolute(dir: &Path, name: &str) -> Result<PathBuf, PromptError> {
    if let Ok(path) = tokio::fs::canonicalize(dir).await {
        return Ok(path);
    }
    dir.absolutize()
        .map(|p| p.into_owned())
        .map_err(|source| PromptError::Io {
            name: name.to_string(),
            source,
        })
}
