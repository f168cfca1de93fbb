//! Local filesystem storage implementation.
//!
//! ## Storage Layout
//!
//! ```text
//! {root}/
//! ├── config.toml    # Crawler configuration
//! └── library.json   # Snapshot library
//! ```

use std::path::PathBuf;

use async_trait::async_trait;
use serde::{Serialize, de::DeserializeOwned};
use tokio::io::AsyncWriteExt;

use crate::error::{AppError, Result};
use crate::models::Library;
use crate::storage::SnapshotStore;

const LIBRARY_KEY: &str = "library.json";

/// Local filesystem storage backend.
#[derive(Debug, Clone)]
pub struct LocalStorage {
    root_dir: PathBuf,
}

impl LocalStorage {
    /// Create a new LocalStorage rooted at the given directory.
    pub fn new(root_dir: impl Into<PathBuf>) -> Self {
        Self {
            root_dir: root_dir.into(),
        }
    }

    /// Path of the configuration file inside the storage directory.
    pub fn config_path(&self) -> PathBuf {
        self.path("config.toml")
    }

    /// Get the full path for a relative key.
    fn path(&self, key: &str) -> PathBuf {
        self.root_dir.join(key)
    }

    /// Ensure parent directory exists.
    async fn ensure_dir(&self, path: &PathBuf) -> Result<()> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        Ok(())
    }

    /// Write bytes atomically (write to temp, then rename).
    async fn write_bytes(&self, key: &str, bytes: &[u8]) -> Result<()> {
        let path = self.path(key);
        self.ensure_dir(&path).await?;

        let tmp = path.with_extension("tmp");
        let mut file = tokio::fs::File::create(&tmp).await?;
        file.write_all(bytes).await?;
        file.flush().await?;
        drop(file);

        tokio::fs::rename(&tmp, &path).await?;
        Ok(())
    }

    /// Write JSON data.
    async fn write_json<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> Result<()> {
        let bytes = serde_json::to_vec_pretty(value)?;
        self.write_bytes(key, &bytes).await
    }

    /// Read bytes, returning None if file doesn't exist.
    async fn read_bytes(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let path = self.path(key);
        match tokio::fs::read(&path).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(AppError::Io(e)),
        }
    }

    /// Read JSON data.
    async fn read_json<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        match self.read_bytes(key).await? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }
}

#[async_trait]
impl SnapshotStore for LocalStorage {
    async fn load(&self) -> Result<Library> {
        match self.read_json::<Library>(LIBRARY_KEY).await? {
            Some(library) => Ok(library),
            None => {
                log::warn!("No {} found, starting with an empty library", LIBRARY_KEY);
                Ok(Library::default())
            }
        }
    }

    async fn save(&self, library: &Library) -> Result<()> {
        self.write_json(LIBRARY_KEY, library).await?;
        log::debug!(
            "Saved {} collections to {}",
            library.collections.len(),
            LIBRARY_KEY
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ChannelMeta, ChannelSnapshot, ContentItem, ContentKind};
    use chrono::Utc;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_write_and_read() {
        let tmp = TempDir::new().unwrap();
        let storage = LocalStorage::new(tmp.path());

        storage.write_bytes("test.txt", b"hello").await.unwrap();
        let data = storage.read_bytes("test.txt").await.unwrap();
        assert_eq!(data, Some(b"hello".to_vec()));
        assert!(!tmp.path().join("test.tmp").exists());
    }

    #[tokio::test]
    async fn test_missing_library_loads_empty() {
        let tmp = TempDir::new().unwrap();
        let storage = LocalStorage::new(tmp.path().join("nested"));

        let library = storage.load().await.unwrap();
        assert!(library.collections.is_empty());
    }

    #[tokio::test]
    async fn test_library_save_load() {
        let tmp = TempDir::new().unwrap();
        let storage = LocalStorage::new(tmp.path());

        let mut item = ContentItem::new("abc", "Title", ContentKind::Video);
        item.enrichment.publish_date = Some("2024-01-01".into());
        let mut library = Library::default();
        library.upsert_snapshot(
            "music",
            ChannelSnapshot {
                channel: ChannelMeta {
                    id: "UC123".into(),
                    title: "Creator".into(),
                    ..ChannelMeta::default()
                },
                fetched_at: Utc::now(),
                sources: Vec::new(),
                videos: vec![item],
            },
        );

        storage.save(&library).await.unwrap();
        let loaded = storage.load().await.unwrap();
        assert_eq!(loaded, library);
    }

    #[tokio::test]
    async fn test_corrupt_library_is_error() {
        let tmp = TempDir::new().unwrap();
        let storage = LocalStorage::new(tmp.path());
        storage.write_bytes(LIBRARY_KEY, b"{not json").await.unwrap();

        assert!(matches!(storage.load().await, Err(AppError::Json(_))));
    }
}
