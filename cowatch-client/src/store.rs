//! Offline session store
//!
//! Keeps the last emitted snapshot on the client, stamped with the client's
//! own wall clock, so a viewer can resume without a hub round trip. For live
//! sources the saved stamp is what the resume position is extrapolated from.

use async_trait::async_trait;
use cowatch_common::PlaybackSnapshot;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::error::Result;

/// File name under the data folder
pub const SESSION_FILE: &str = "client_session.json";

#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn save(&self, snapshot: &PlaybackSnapshot) -> Result<()>;
    async fn load(&self) -> Result<Option<PlaybackSnapshot>>;
}

/// JSON file holding one snapshot
#[derive(Debug, Clone)]
pub struct FileSessionStore {
    path: PathBuf,
}

impl FileSessionStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// `<data folder>/client_session.json`
    pub fn in_data_folder(data_folder: &Path) -> Self {
        Self::new(data_folder.join(SESSION_FILE))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl SessionStore for FileSessionStore {
    async fn save(&self, snapshot: &PlaybackSnapshot) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let json = serde_json::to_vec(snapshot)?;
        tokio::fs::write(&self.path, json).await?;
        debug!("Saved session to {}", self.path.display());
        Ok(())
    }

    async fn load(&self) -> Result<Option<PlaybackSnapshot>> {
        let bytes = match tokio::fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        match serde_json::from_slice(&bytes) {
            Ok(snapshot) => Ok(Some(snapshot)),
            Err(e) => {
                warn!("Discarding corrupt session file {}: {}", self.path.display(), e);
                if let Err(e) = tokio::fs::remove_file(&self.path).await {
                    debug!("Could not remove {}: {}", self.path.display(), e);
                }
                Ok(None)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cowatch_common::{PlayMode, SourceDescriptor, SourceKind};

    #[tokio::test]
    async fn test_missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileSessionStore::in_data_folder(dir.path());
        assert!(store.load().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileSessionStore::new(dir.path().join("nested").join("s.json"));

        let mut snapshot = PlaybackSnapshot::new(
            SourceDescriptor::new(SourceKind::Single, "abc").with_mode(PlayMode::Live),
        )
        .stamped(cowatch_common::time::now());
        snapshot.position_seconds = 77.0;
        store.save(&snapshot).await.unwrap();

        assert_eq!(store.load().await.unwrap(), Some(snapshot));
    }

    #[tokio::test]
    async fn test_corrupt_file_is_discarded() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileSessionStore::in_data_folder(dir.path());
        std::fs::write(store.path(), b"{ not json").unwrap();

        assert!(store.load().await.unwrap().is_none());
        assert!(!store.path().exists());
    }
}
