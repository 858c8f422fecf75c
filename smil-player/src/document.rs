//! Document providers
//!
//! Fetching and parsing the source markup is outside the scheduler. A
//! [`DocumentProvider`] hands over an already-built [`Document`] and answers
//! whether a newer one is available.

use anyhow::Context;
use async_trait::async_trait;
use smil_common::Document;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::SystemTime;
use tracing::{debug, info};

#[async_trait]
pub trait DocumentProvider: Send + Sync {
    /// Load the current document
    async fn load(&self) -> anyhow::Result<Document>;

    /// True when the document changed since the last `load`
    async fn has_changed(&self) -> anyhow::Result<bool>;
}

/// JSON document on the local filesystem, stale when its modification time changes
pub struct FileDocumentProvider {
    path: PathBuf,
    loaded_modified: Mutex<Option<SystemTime>>,
}

impl FileDocumentProvider {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            loaded_modified: Mutex::new(None),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn modified(&self) -> anyhow::Result<SystemTime> {
        let metadata = tokio::fs::metadata(&self.path)
            .await
            .with_context(|| format!("Failed to stat {}", self.path.display()))?;
        Ok(metadata.modified()?)
    }
}

#[async_trait]
impl DocumentProvider for FileDocumentProvider {
    async fn load(&self) -> anyhow::Result<Document> {
        let modified = self.modified().await?;
        let text = tokio::fs::read_to_string(&self.path)
            .await
            .with_context(|| format!("Failed to read {}", self.path.display()))?;
        let document = Document::from_json(&text)
            .with_context(|| format!("Failed to decode {}", self.path.display()))?;

        *self
            .loaded_modified
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = Some(modified);
        info!("Loaded document {}", self.path.display());
        Ok(document)
    }

    async fn has_changed(&self) -> anyhow::Result<bool> {
        let modified = self.modified().await?;
        let loaded = *self
            .loaded_modified
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let changed = loaded != Some(modified);
        debug!("Staleness check for {}: changed={}", self.path.display(), changed);
        Ok(changed)
    }
}
