//! Opaque key-value persistence.
//!
//! The pipeline never manages storage itself; callers hand it a [`KvStore`]
//! and state is read and written as JSON strings under fixed keys.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use anyhow::{bail, Context};
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::{AiqError, Result};

/// String-keyed blob store.
pub trait KvStore: Send + Sync {
    fn get(&self, key: &str) -> anyhow::Result<Option<String>>;

    fn set(&self, key: &str, value: &str) -> anyhow::Result<()>;

    /// Removing a missing key is not an error.
    fn remove(&self, key: &str) -> anyhow::Result<()>;

    /// Remove every key, returning how many were removed.
    fn clear(&self) -> anyhow::Result<usize>;
}

/// Read and deserialize a JSON value. A missing key yields `None`.
pub fn read_json<T: DeserializeOwned>(store: &dyn KvStore, key: &str) -> Result<Option<T>> {
    let Some(raw) = store.get(key).map_err(AiqError::Storage)? else {
        return Ok(None);
    };
    let value = serde_json::from_str(&raw)
        .with_context(|| format!("corrupt value under key `{key}`"))
        .map_err(AiqError::Storage)?;
    Ok(Some(value))
}

pub fn write_json<T: Serialize + ?Sized>(store: &dyn KvStore, key: &str, value: &T) -> Result<()> {
    let raw = serde_json::to_string(value)
        .with_context(|| format!("failed to serialize value for key `{key}`"))
        .map_err(AiqError::Storage)?;
    store.set(key, &raw).map_err(AiqError::Storage)
}

/// In-process store, used by tests and one-shot pipelines.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> anyhow::Result<std::sync::MutexGuard<'_, HashMap<String, String>>> {
        self.entries
            .lock()
            .map_err(|_| anyhow::anyhow!("memory store lock poisoned"))
    }
}

impl KvStore for MemoryStore {
    fn get(&self, key: &str) -> anyhow::Result<Option<String>> {
        Ok(self.lock()?.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> anyhow::Result<()> {
        self.lock()?.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> anyhow::Result<()> {
        self.lock()?.remove(key);
        Ok(())
    }

    fn clear(&self) -> anyhow::Result<usize> {
        let mut entries = self.lock()?;
        let removed = entries.len();
        entries.clear();
        Ok(removed)
    }
}

/// One `<key>.json` file per key inside a directory.
///
/// The directory is created on the first write.
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> anyhow::Result<PathBuf> {
        if !is_valid_key(key) {
            bail!("invalid store key: {key:?}");
        }
        Ok(self.dir.join(format!("{key}.json")))
    }
}

fn is_valid_key(key: &str) -> bool {
    !key.is_empty()
        && key
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}

/// The key stored at `path`, if the file is one this store could have written.
fn key_of(path: &Path) -> Option<&str> {
    if path.extension()? != "json" {
        return None;
    }
    path.file_stem()?.to_str().filter(|key| is_valid_key(key))
}

impl KvStore for FileStore {
    fn get(&self, key: &str) -> anyhow::Result<Option<String>> {
        let path = self.path_for(key)?;
        match std::fs::read_to_string(&path) {
            Ok(content) => Ok(Some(content)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e).with_context(|| format!("failed to read {}", path.display())),
        }
    }

    fn set(&self, key: &str, value: &str) -> anyhow::Result<()> {
        let path = self.path_for(key)?;
        std::fs::create_dir_all(&self.dir)
            .with_context(|| format!("failed to create data directory {}", self.dir.display()))?;
        std::fs::write(&path, value).with_context(|| format!("failed to write {}", path.display()))
    }

    fn remove(&self, key: &str) -> anyhow::Result<()> {
        let path = self.path_for(key)?;
        match std::fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e).with_context(|| format!("failed to remove {}", path.display())),
        }
    }

    /// Only `<key>.json` files are removed; anything else in the directory
    /// is left alone.
    fn clear(&self) -> anyhow::Result<usize> {
        let entries = match std::fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(0),
            Err(e) => {
                return Err(e)
                    .with_context(|| format!("failed to list {}", self.dir.display()))
            }
        };

        let mut removed = 0;
        for entry in entries {
            let path = entry
                .with_context(|| format!("failed to list {}", self.dir.display()))?
                .path();
            if !path.is_file() || key_of(&path).is_none() {
                continue;
            }
            std::fs::remove_file(&path)
                .with_context(|| format!("failed to remove {}", path.display()))?;
            removed += 1;
        }
        tracing::debug!(dir = %self.dir.display(), removed, "cleared file store");
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn exercise(store: &dyn KvStore) {
        assert_eq!(store.get("k").unwrap(), None);
        store.set("k", "v1").unwrap();
        store.set("k", "v2").unwrap();
        assert_eq!(store.get("k").unwrap().as_deref(), Some("v2"));
        store.remove("k").unwrap();
        store.remove("k").unwrap();
        assert_eq!(store.get("k").unwrap(), None);

        store.set("a", "1").unwrap();
        store.set("b", "2").unwrap();
        assert_eq!(store.clear().unwrap(), 2);
        assert_eq!(store.get("a").unwrap(), None);
        assert_eq!(store.get("b").unwrap(), None);
        assert_eq!(store.clear().unwrap(), 0);
    }

    #[test]
    fn memory_store() {
        exercise(&MemoryStore::new());
    }

    #[test]
    fn file_store_creates_directory_lazily() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path().join("nested").join("data");
        let store = FileStore::new(&dir);
        assert_eq!(store.get("aiqx_models_v4").unwrap(), None);
        assert!(!dir.exists());
        exercise(&store);
        assert!(dir.exists());
    }

    #[test]
    fn file_store_clear_keeps_foreign_files() {
        let tmp = tempfile::tempdir().unwrap();
        let store = FileStore::new(tmp.path());
        store.set("aiqx_models_v4", "[]").unwrap();
        store.set("aiqx_current_tier", "\"basic\"").unwrap();
        std::fs::write(tmp.path().join("notes.txt"), "keep").unwrap();
        std::fs::write(tmp.path().join("bad key.json"), "keep").unwrap();
        std::fs::create_dir(tmp.path().join("sub.json")).unwrap();

        assert_eq!(store.clear().unwrap(), 2);
        assert_eq!(store.get("aiqx_models_v4").unwrap(), None);
        assert!(tmp.path().join("notes.txt").exists());
        assert!(tmp.path().join("bad key.json").exists());
        assert!(tmp.path().join("sub.json").is_dir());
    }

    #[test]
    fn file_store_clear_without_directory() {
        let tmp = tempfile::tempdir().unwrap();
        let store = FileStore::new(tmp.path().join("never-written"));
        assert_eq!(store.clear().unwrap(), 0);
    }

    #[test]
    fn file_store_rejects_path_like_keys() {
        let tmp = tempfile::tempdir().unwrap();
        let store = FileStore::new(tmp.path());
        assert!(store.set("../escape", "x").is_err());
        assert!(store.get("").is_err());
    }

    #[test]
    fn json_helpers() {
        let store = MemoryStore::new();
        assert_eq!(read_json::<Vec<u32>>(&store, "nums").unwrap(), None);
        write_json(&store, "nums", &vec![1u32, 2, 3]).unwrap();
        assert_eq!(read_json::<Vec<u32>>(&store, "nums").unwrap(), Some(vec![1, 2, 3]));

        store.set("nums", "not json").unwrap();
        assert!(matches!(read_json::<Vec<u32>>(&store, "nums"), Err(AiqError::Storage(_))));
    }
}
