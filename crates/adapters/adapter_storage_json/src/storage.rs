//! One storage, one JSON file.

use std::collections::BTreeMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::{PoisonError, RwLock};

use serde::Serialize;
use serde::de::DeserializeOwned;

use homereg_app::ports::Storage;
use homereg_domain::error::RegistryError;

use crate::error::JsonStorageError;

/// A [`Storage`] kept in memory and mirrored to a JSON object on disk.
///
/// Every write rewrites the whole file through a temporary sibling and a
/// rename. A failed write leaves both the file and the in-memory view
/// unchanged.
pub struct JsonStorage<T> {
    path: PathBuf,
    entries: RwLock<BTreeMap<String, T>>,
}

impl<T> JsonStorage<T>
where
    T: Serialize + DeserializeOwned + Clone + Send + Sync,
{
    /// Load the storage at `path`, starting empty if the file is missing.
    ///
    /// # Errors
    ///
    /// Returns [`JsonStorageError`] if the file cannot be read or does not
    /// hold a JSON object of `T` values.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, JsonStorageError> {
        let path = path.into();
        let entries = match fs::read(&path) {
            Ok(bytes) => serde_json::from_slice(&bytes)
                .map_err(|err| JsonStorageError::json(&path, err))?,
            Err(err) if err.kind() == ErrorKind::NotFound => BTreeMap::new(),
            Err(err) => return Err(JsonStorageError::io(&path, err)),
        };
        tracing::debug!(path = %path.display(), count = entries.len(), "opened json storage");
        Ok(Self {
            path,
            entries: RwLock::new(entries),
        })
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn persist(&self, entries: &BTreeMap<String, T>) -> Result<(), JsonStorageError> {
        let bytes = serde_json::to_vec_pretty(entries)
            .map_err(|err| JsonStorageError::json(&self.path, err))?;
        let mut temp = self.path.clone().into_os_string();
        temp.push(".tmp");
        let temp = PathBuf::from(temp);
        fs::write(&temp, bytes).map_err(|err| JsonStorageError::io(&temp, err))?;
        fs::rename(&temp, &self.path).map_err(|err| JsonStorageError::io(&self.path, err))
    }
}

impl<T> Storage<T> for JsonStorage<T>
where
    T: Serialize + DeserializeOwned + Clone + Send + Sync,
{
    fn get(&self, key: &str) -> Result<Option<T>, RegistryError> {
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        Ok(entries.get(key).cloned())
    }

    fn put(&self, key: &str, value: T) -> Result<Option<T>, RegistryError> {
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        let previous = entries.insert(key.to_string(), value);
        if let Err(err) = self.persist(&entries) {
            match previous {
                Some(previous) => entries.insert(key.to_string(), previous),
                None => entries.remove(key),
            };
            return Err(err.into());
        }
        Ok(previous)
    }

    fn remove(&self, key: &str) -> Result<Option<T>, RegistryError> {
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        let Some(removed) = entries.remove(key) else {
            return Ok(None);
        };
        if let Err(err) = self.persist(&entries) {
            entries.insert(key.to_string(), removed);
            return Err(err.into());
        }
        Ok(Some(removed))
    }

    fn contains_key(&self, key: &str) -> Result<bool, RegistryError> {
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        Ok(entries.contains_key(key))
    }

    fn keys(&self) -> Result<Vec<String>, RegistryError> {
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        Ok(entries.keys().cloned().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn should_start_empty_when_file_is_missing() {
        let dir = TempDir::new().unwrap();
        let storage = JsonStorage::<u32>::open(dir.path().join("numbers.json")).unwrap();
        assert!(storage.keys().unwrap().is_empty());
        assert!(!storage.path().exists());
    }

    #[test]
    fn should_survive_reopening() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("numbers.json");
        {
            let storage = JsonStorage::<u32>::open(&path).unwrap();
            storage.put("a", 1).unwrap();
            storage.put("b", 2).unwrap();
            storage.remove("a").unwrap();
        }

        let storage = JsonStorage::<u32>::open(&path).unwrap();
        assert_eq!(storage.keys().unwrap(), vec!["b"]);
        assert_eq!(storage.get("b").unwrap(), Some(2));
    }

    #[test]
    fn should_write_a_json_object() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("labels.json");
        let storage = JsonStorage::<String>::open(&path).unwrap();
        storage.put("lamp", "Desk lamp".to_string()).unwrap();

        let raw: serde_json::Value = serde_json::from_slice(&fs::read(&path).unwrap()).unwrap();
        assert_eq!(raw, serde_json::json!({ "lamp": "Desk lamp" }));
    }

    #[test]
    fn should_reject_corrupted_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("broken.json");
        fs::write(&path, b"{ not json").unwrap();

        let result = JsonStorage::<u32>::open(&path);
        assert!(matches!(result, Err(JsonStorageError::Json { .. })));
    }

    #[test]
    fn should_keep_memory_unchanged_when_write_fails() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("gone").join("numbers.json");
        let storage = JsonStorage::<u32>::open(&path).unwrap();

        let result = storage.put("a", 1);

        assert!(matches!(result, Err(RegistryError::Storage(_))));
        assert_eq!(storage.get("a").unwrap(), None);
    }
}
