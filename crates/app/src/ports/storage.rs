//! Storage port: namespaced key-value stores for managed providers.
//!
//! The core only assumes read-after-write consistency; durability and the
//! on-disk format are the adapter's business.

use std::sync::Arc;

use serde::Serialize;
use serde::de::DeserializeOwned;

use homereg_domain::error::RegistryError;

/// A key-value store holding values of type `T` under string keys.
pub trait Storage<T>: Send + Sync {
    /// # Errors
    ///
    /// Returns [`RegistryError::Storage`] if the store cannot be read.
    fn get(&self, key: &str) -> Result<Option<T>, RegistryError>;

    /// Store `value`, returning the previous value under `key`.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::Storage`] if the store cannot be written.
    fn put(&self, key: &str, value: T) -> Result<Option<T>, RegistryError>;

    /// Remove `key`, returning the removed value.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::Storage`] if the store cannot be written.
    fn remove(&self, key: &str) -> Result<Option<T>, RegistryError>;

    /// # Errors
    ///
    /// Returns [`RegistryError::Storage`] if the store cannot be read.
    fn contains_key(&self, key: &str) -> Result<bool, RegistryError> {
        Ok(self.get(key)?.is_some())
    }

    /// Every key currently stored.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::Storage`] if the store cannot be read.
    fn keys(&self) -> Result<Vec<String>, RegistryError>;
}

/// Hands out one [`Storage`] per logical name.
///
/// Asking twice for the same name returns the same store.
pub trait StorageService: Send + Sync {
    /// Open (or create) the store called `name`.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::IllegalState`] if `name` is already open
    /// with another value type, or a storage error if it cannot be loaded.
    fn get_storage<T>(&self, name: &str) -> Result<Arc<dyn Storage<T>>, RegistryError>
    where
        T: Serialize + DeserializeOwned + Clone + Send + Sync + 'static;
}
