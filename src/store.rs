//! Durable keyed string storage backing keys and accounts.

use crate::error::{Result, SignError};
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tokio::sync::RwLock;
use tracing::debug;

/// A keyed store of strings with last-write-wins semantics.
///
/// There is no transaction spanning a `get` followed by a `set`.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Read the value under `key`, if any.
    async fn get(&self, key: &str) -> Result<Option<String>>;

    /// Write `value` under `key`, replacing any previous value.
    async fn set(&self, key: &str, value: String) -> Result<()>;
}

/// An in-process store. Contents are lost when it is dropped.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: RwLock<BTreeMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored entries.
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

#[async_trait]
impl KeyValueStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.entries.read().await.get(key).cloned())
    }

    async fn set(&self, key: &str, value: String) -> Result<()> {
        self.entries.write().await.insert(key.to_string(), value);
        Ok(())
    }
}

/// A store persisted as one JSON object file.
///
/// The file is read on every access and replaced in full on every write:
/// the new contents go to a sibling `.tmp` file that is then renamed over
/// the store, so readers and crashes never observe a partial file.
/// A missing file reads as empty and is created by the first write.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    lock: RwLock<()>,
}

impl FileStore {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            lock: RwLock::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self.path.file_name().unwrap_or_default().to_os_string();
        name.push(".tmp");
        self.path.with_file_name(name)
    }

    async fn load(&self) -> Result<BTreeMap<String, String>> {
        match tokio::fs::read_to_string(&self.path).await {
            Ok(content) if content.trim().is_empty() => Ok(BTreeMap::new()),
            Ok(content) => serde_json::from_str(&content).map_err(|e| {
                SignError::Storage(format!("corrupt store {}: {}", self.path.display(), e))
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(BTreeMap::new()),
            Err(e) => Err(e.into()),
        }
    }
}

#[async_trait]
impl KeyValueStore for FileStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        let _guard = self.lock.read().await;
        let mut entries = self.load().await?;
        Ok(entries.remove(key))
    }

    async fn set(&self, key: &str, value: String) -> Result<()> {
        // Excludes readers and writers within this process only.
        let _guard = self.lock.write().await;
        let mut entries = self.load().await?;
        entries.insert(key.to_string(), value);

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }
        let json = serde_json::to_string_pretty(&entries)?;
        let temp = self.temp_path();
        tokio::fs::write(&temp, json).await?;
        tokio::fs::rename(&temp, &self.path).await?;
        debug!(path = %self.path.display(), key, "store entry written");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_memory_store() {
        let store = MemoryStore::new();
        assert!(store.is_empty().await);
        assert_eq!(store.get("a").await.unwrap(), None);

        store.set("a", "1".to_string()).await.unwrap();
        store.set("a", "2".to_string()).await.unwrap();

        assert_eq!(store.get("a").await.unwrap(), Some("2".to_string()));
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn test_file_store_persists() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("store.json");

        let store = FileStore::new(&path);
        assert_eq!(store.get("keys:a").await.unwrap(), None);
        store.set("keys:a", "alpha".to_string()).await.unwrap();
        store.set("keys:b", "beta".to_string()).await.unwrap();

        let reopened = FileStore::new(&path);
        assert_eq!(reopened.get("keys:a").await.unwrap(), Some("alpha".to_string()));
        assert_eq!(reopened.get("keys:b").await.unwrap(), Some("beta".to_string()));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_file_store_reads_during_writes() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(FileStore::new(dir.path().join("store.json")));
        store.set("keys:a", "alpha".to_string()).await.unwrap();

        let writer = {
            let store = Arc::clone(&store);
            tokio::spawn(async move {
                for i in 0..200 {
                    store.set(&format!("keys:w{}", i), "x".repeat(512)).await.unwrap();
                }
            })
        };

        loop {
            assert_eq!(store.get("keys:a").await.unwrap(), Some("alpha".to_string()));
            if writer.is_finished() {
                break;
            }
        }
        writer.await.unwrap();

        assert!(!store.temp_path().exists());
        assert_eq!(store.get("keys:w199").await.unwrap().map(|v| v.len()), Some(512));
    }

    #[tokio::test]
    async fn test_file_store_corrupt_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store.json");
        std::fs::write(&path, "not json").unwrap();

        let store = FileStore::new(&path);
        assert!(matches!(store.get("x").await, Err(SignError::Storage(_))));
    }
}
