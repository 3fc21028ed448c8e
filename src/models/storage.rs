use std::collections::BTreeMap;
use std::env;
use std::io::ErrorKind;
use std::path::PathBuf;

use async_trait::async_trait;
use tokio::fs;
use tokio::sync::RwLock;

use crate::error::CasefeedError;

/// String-keyed, string-valued persistent storage.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Get a value, `Ok(None)` if the key was never written.
    async fn get(&self, key: &str) -> Result<Option<String>, CasefeedError>;

    /// Overwrite the value under `key`.
    async fn set(&self, key: &str, value: &str) -> Result<(), CasefeedError>;

    /// Remove a key. Removing a missing key is not an error.
    async fn remove(&self, key: &str) -> Result<(), CasefeedError>;
}

/// Directory holding the storage file and the log, `$XDG_CACHE_HOME/casefeed`
/// or `~/.cache/casefeed`.
pub fn get_cache_dir() -> Result<PathBuf, CasefeedError> {
    let base_cache_dir = match env::var_os("XDG_CACHE_HOME") {
        Some(dir) => PathBuf::from(dir),
        None => dirs::home_dir()
            .ok_or_else(|| CasefeedError::Config("Could not find home directory".to_string()))?
            .join(".cache"),
    };
    Ok(base_cache_dir.join("casefeed"))
}

pub fn default_storage_file() -> Result<PathBuf, CasefeedError> {
    Ok(get_cache_dir()?.join("storage.json"))
}

/// All keys live in one JSON object on disk. Every write rewrites the file
/// through a temporary sibling and a rename.
pub struct FileStore {
    path: PathBuf,
    entries: RwLock<BTreeMap<String, String>>,
}

impl FileStore {
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self, CasefeedError> {
        let path = path.into();
        let entries = match fs::read_to_string(&path).await {
            Ok(data) if data.trim().is_empty() => BTreeMap::new(),
            Ok(data) => serde_json::from_str(&data).map_err(|e| {
                CasefeedError::Storage(format!("Failed to parse storage file {:?}: {}", path, e))
            })?,
            Err(e) if e.kind() == ErrorKind::NotFound => BTreeMap::new(),
            Err(e) => {
                return Err(CasefeedError::Storage(format!(
                    "Failed to read storage file {:?}: {}",
                    path, e
                )))
            }
        };
        log::debug!("Opened storage {:?} with {} keys", path, entries.len());

        Ok(Self {
            path,
            entries: RwLock::new(entries),
        })
    }

    /// A store with no entries that will overwrite whatever is at `path` on first write.
    pub fn empty(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            entries: RwLock::new(BTreeMap::new()),
        }
    }

    async fn flush(&self, entries: &BTreeMap<String, String>) -> Result<(), CasefeedError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).await.map_err(|e| {
                CasefeedError::Storage(format!("Failed to create storage directory: {}", e))
            })?;
        }

        let json = serde_json::to_string(entries)
            .map_err(|e| CasefeedError::Storage(format!("Failed to serialize storage: {}", e)))?;

        let tmp_path = self.path.with_extension("json.tmp");
        fs::write(&tmp_path, json)
            .await
            .map_err(|e| CasefeedError::Storage(format!("Failed to write storage file: {}", e)))?;
        fs::rename(&tmp_path, &self.path)
            .await
            .map_err(|e| CasefeedError::Storage(format!("Failed to replace storage file: {}", e)))?;
        Ok(())
    }
}

#[async_trait]
impl KeyValueStore for FileStore {
    async fn get(&self, key: &str) -> Result<Option<String>, CasefeedError> {
        let entries = self.entries.read().await;
        Ok(entries.get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), CasefeedError> {
        // Hold the write lock across the flush so writes reach disk in order.
        let mut entries = self.entries.write().await;
        let previous = entries.insert(key.to_string(), value.to_string());
        if let Err(e) = self.flush(&entries).await {
            match previous {
                Some(old) => entries.insert(key.to_string(), old),
                None => entries.remove(key),
            };
            return Err(e);
        }
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), CasefeedError> {
        let mut entries = self.entries.write().await;
        if entries.remove(key).is_some() {
            self.flush(&entries).await?;
        }
        Ok(())
    }
}

/// Non-persistent store for tests and `--ephemeral` runs.
#[derive(Default)]
pub struct MemoryStore {
    entries: RwLock<BTreeMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl KeyValueStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<String>, CasefeedError> {
        Ok(self.entries.read().await.get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), CasefeedError> {
        self.entries
            .write()
            .await
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), CasefeedError> {
        self.entries.write().await.remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_memory_set_and_get() {
        let store = MemoryStore::new();
        store.set("key1", "value1").await.unwrap();
        assert_eq!(store.get("key1").await.unwrap(), Some("value1".to_string()));
        store.remove("key1").await.unwrap();
        assert_eq!(store.get("key1").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_file_store_survives_reopen() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("storage.json");

        let store = FileStore::open(&path).await.unwrap();
        store.set("hugged_p1", "true").await.unwrap();
        store.set("postsData", "[]").await.unwrap();
        drop(store);

        let reopened = FileStore::open(&path).await.unwrap();
        assert_eq!(reopened.get("hugged_p1").await.unwrap(), Some("true".to_string()));
        assert_eq!(reopened.get("postsData").await.unwrap(), Some("[]".to_string()));
        assert_eq!(reopened.get("missing").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_file_store_missing_file_is_empty() {
        let dir = TempDir::new().unwrap();
        let store = FileStore::open(dir.path().join("none.json")).await.unwrap();
        assert_eq!(store.get("anything").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_file_store_rejects_corrupt_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("storage.json");
        std::fs::write(&path, "{not json").unwrap();
        assert!(matches!(
            FileStore::open(&path).await,
            Err(CasefeedError::Storage(_))
        ));
    }

    #[tokio::test]
    async fn test_file_store_remove_persists() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("storage.json");
        let store = FileStore::open(&path).await.unwrap();
        store.set("a", "1").await.unwrap();
        store.remove("a").await.unwrap();

        let reopened = FileStore::open(&path).await.unwrap();
        assert_eq!(reopened.get("a").await.unwrap(), None);
    }
}
