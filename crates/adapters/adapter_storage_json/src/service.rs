//! JSON storage service setup.

use std::any::Any;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use serde::Serialize;
use serde::de::DeserializeOwned;

use homereg_app::ports::{Storage, StorageService};
use homereg_domain::error::{IllegalStateError, RegistryError};

use crate::error::JsonStorageError;
use crate::storage::JsonStorage;

/// Configuration for the JSON storage adapter.
pub struct Config {
    /// Directory holding one `<name>.json` file per storage.
    pub dir: PathBuf,
}

impl Config {
    /// Read configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if `HOMEREG_STORAGE_DIR` is not set.
    pub fn from_env() -> Result<Self, std::env::VarError> {
        Ok(Self {
            dir: std::env::var("HOMEREG_STORAGE_DIR")?.into(),
        })
    }

    /// Build a [`JsonStorageService`] from this configuration, creating the
    /// directory if missing.
    ///
    /// # Errors
    ///
    /// Returns [`JsonStorageError`] if the directory cannot be created.
    pub fn build(self) -> Result<JsonStorageService, JsonStorageError> {
        std::fs::create_dir_all(&self.dir).map_err(|err| JsonStorageError::io(&self.dir, err))?;
        Ok(JsonStorageService {
            dir: self.dir,
            storages: Mutex::new(HashMap::new()),
        })
    }
}

/// Hands out [`JsonStorage`] instances, one file per name.
///
/// A name is opened once; later calls share the same instance.
pub struct JsonStorageService {
    dir: PathBuf,
    storages: Mutex<HashMap<String, Arc<dyn Any + Send + Sync>>>,
}

impl JsonStorageService {
    /// Borrow the directory holding the storage files.
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn file_of(&self, name: &str) -> PathBuf {
        self.dir.join(format!("{name}.json"))
    }
}

impl StorageService for JsonStorageService {
    fn get_storage<T>(&self, name: &str) -> Result<Arc<dyn Storage<T>>, RegistryError>
    where
        T: Serialize + DeserializeOwned + Clone + Send + Sync + 'static,
    {
        let mut storages = self.storages.lock().unwrap_or_else(PoisonError::into_inner);
        let opened = match storages.get(name) {
            Some(opened) => Arc::clone(opened),
            None => {
                let storage: Arc<dyn Any + Send + Sync> =
                    Arc::new(JsonStorage::<T>::open(self.file_of(name))?);
                storages.insert(name.to_string(), Arc::clone(&storage));
                storage
            }
        };
        let storage = opened
            .downcast::<JsonStorage<T>>()
            .map_err(|_| IllegalStateError::StorageTypeMismatch {
                name: name.to_string(),
            })?;
        Ok(storage)
    }
}
