//! In-memory [`StorageService`] for tests and setups without persistence.

use std::any::Any;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError, RwLock};

use serde::Serialize;
use serde::de::DeserializeOwned;

use homereg_domain::error::{IllegalStateError, RegistryError};

use crate::ports::{Storage, StorageService};

/// A [`Storage`] that lives only as long as the process.
pub struct VolatileStorage<T> {
    entries: RwLock<HashMap<String, T>>,
}

impl<T> Default for VolatileStorage<T> {
    fn default() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
        }
    }
}

impl<T: Clone + Send + Sync> Storage<T> for VolatileStorage<T> {
    fn get(&self, key: &str) -> Result<Option<T>, RegistryError> {
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        Ok(entries.get(key).cloned())
    }

    fn put(&self, key: &str, value: T) -> Result<Option<T>, RegistryError> {
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        Ok(entries.insert(key.to_string(), value))
    }

    fn remove(&self, key: &str) -> Result<Option<T>, RegistryError> {
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        Ok(entries.remove(key))
    }

    fn keys(&self) -> Result<Vec<String>, RegistryError> {
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        Ok(entries.keys().cloned().collect())
    }
}

/// Hands out [`VolatileStorage`] instances, one per name.
#[derive(Default)]
pub struct VolatileStorageService {
    storages: Mutex<HashMap<String, Arc<dyn Any + Send + Sync>>>,
}

impl VolatileStorageService {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl StorageService for VolatileStorageService {
    fn get_storage<T>(&self, name: &str) -> Result<Arc<dyn Storage<T>>, RegistryError>
    where
        T: Serialize + DeserializeOwned + Clone + Send + Sync + 'static,
    {
        let mut storages = self.storages.lock().unwrap_or_else(PoisonError::into_inner);
        let opened = Arc::clone(
            storages
                .entry(name.to_string())
                .or_insert_with(|| {
                    Arc::new(VolatileStorage::<T>::default()) as Arc<dyn Any + Send + Sync>
                }),
        );
        let storage = opened
            .downcast::<VolatileStorage<T>>()
            .map_err(|_| IllegalStateError::StorageTypeMismatch {
                name: name.to_string(),
            })?;
        Ok(storage)
    }
}
