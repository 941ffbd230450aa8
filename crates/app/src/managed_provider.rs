//! Storage-backed [`ManagedProvider`].
//!
//! Elements are written to a [`Storage`] under the string form of their key.
//! A [`PersistenceMapper`] projects elements to the shape that is actually
//! stored and back, so elements with runtime-only parts can still be
//! persisted.

use std::marker::PhantomData;
use std::sync::{Arc, Mutex, PoisonError};

use serde::Serialize;
use serde::de::DeserializeOwned;

use homereg_domain::error::{IllegalArgumentError, RegistryError};
use homereg_domain::identifiable::Identifiable;

use crate::listeners::ProviderListeners;
use crate::ports::{ManagedProvider, Provider, ProviderChangeListener, Storage, StorageService};

/// Conversion between an element and its stored representation.
pub trait PersistenceMapper<E: Identifiable>: Send + Sync {
    type Persisted: Serialize + DeserializeOwned + Clone + Send + Sync + 'static;

    /// Name of the store holding the elements.
    fn storage_name(&self) -> &str;

    /// String form of a key, used as the storage key.
    fn key_to_string(&self, key: &E::Key) -> String {
        key.to_string()
    }

    /// Rebuild an element from its storage key and stored value.
    ///
    /// # Errors
    ///
    /// Returns an error when the stored value cannot be turned back into an
    /// element; such entries are skipped by [`Provider::get_all`], and
    /// `remove` and `update` fail on them without touching the storage.
    fn to_element(&self, key: &str, persisted: Self::Persisted) -> Result<E, RegistryError>;

    fn to_persistable(&self, element: &E) -> Self::Persisted;
}

/// Stores elements as they are.
pub struct IdentityMapper<E> {
    storage_name: String,
    _element: PhantomData<fn() -> E>,
}

impl<E> IdentityMapper<E> {
    #[must_use]
    pub fn new(storage_name: impl Into<String>) -> Self {
        Self {
            storage_name: storage_name.into(),
            _element: PhantomData,
        }
    }
}

impl<E> PersistenceMapper<E> for IdentityMapper<E>
where
    E: Identifiable + Serialize + DeserializeOwned + Clone + Send + Sync + 'static,
{
    type Persisted = E;

    fn storage_name(&self) -> &str {
        &self.storage_name
    }

    fn to_element(&self, _key: &str, persisted: E) -> Result<E, RegistryError> {
        Ok(persisted)
    }

    fn to_persistable(&self, element: &E) -> E {
        element.clone()
    }
}

/// A [`ManagedProvider`] persisting its elements through a [`Storage`].
pub struct StorageManagedProvider<E, M>
where
    E: Identifiable,
    M: PersistenceMapper<E>,
{
    storage: Arc<dyn Storage<M::Persisted>>,
    mapper: M,
    listeners: ProviderListeners<E>,
    writes: Mutex<()>,
}

impl<E, M> StorageManagedProvider<E, M>
where
    E: Identifiable + Send + Sync,
    M: PersistenceMapper<E>,
{
    /// Open the store named by `mapper` from `storage_service`.
    ///
    /// # Errors
    ///
    /// Returns the error of [`StorageService::get_storage`].
    pub fn new(storage_service: &impl StorageService, mapper: M) -> Result<Self, RegistryError> {
        let storage = storage_service.get_storage::<M::Persisted>(mapper.storage_name())?;
        Ok(Self::with_storage(storage, mapper))
    }

    /// Use an already opened store.
    pub fn with_storage(storage: Arc<dyn Storage<M::Persisted>>, mapper: M) -> Self {
        Self {
            storage,
            mapper,
            listeners: ProviderListeners::default(),
            writes: Mutex::new(()),
        }
    }

    #[must_use]
    pub fn storage_name(&self) -> &str {
        self.mapper.storage_name()
    }

    fn storage_key(&self, key: &E::Key) -> Result<String, RegistryError> {
        let key = self.mapper.key_to_string(key);
        if key.is_empty() {
            return Err(IllegalArgumentError::EmptyKey.into());
        }
        Ok(key)
    }

    fn load(&self, key: &str) -> Option<E> {
        match self.storage.get(key) {
            Ok(Some(persisted)) => match self.mapper.to_element(key, persisted) {
                Ok(element) => Some(element),
                Err(err) => {
                    tracing::debug!(
                        %err,
                        key,
                        storage = self.storage_name(),
                        "skipping unconvertible entry"
                    );
                    None
                }
            },
            Ok(None) => None,
            Err(err) => {
                tracing::warn!(%err, key, storage = self.storage_name(), "failed to read entry");
                None
            }
        }
    }
}

impl<E, M> Provider<E> for StorageManagedProvider<E, M>
where
    E: Identifiable + Send + Sync,
    M: PersistenceMapper<E>,
{
    fn get_all(&self) -> Vec<E> {
        let keys = match self.storage.keys() {
            Ok(keys) => keys,
            Err(err) => {
                tracing::warn!(%err, storage = self.storage_name(), "failed to list stored keys");
                return Vec::new();
            }
        };
        keys.iter().filter_map(|key| self.load(key)).collect()
    }

    fn add_provider_change_listener(&self, listener: Arc<dyn ProviderChangeListener<E>>) {
        self.listeners.add(listener);
    }

    fn remove_provider_change_listener(&self, listener: &Arc<dyn ProviderChangeListener<E>>) {
        self.listeners.remove(listener);
    }
}

impl<E, M> ManagedProvider<E> for StorageManagedProvider<E, M>
where
    E: Identifiable + Send + Sync,
    M: PersistenceMapper<E>,
{
    #[tracing::instrument(skip(self, element), fields(key = %element.uid()))]
    fn add(&self, element: E) -> Result<(), RegistryError> {
        let key = self.storage_key(&element.uid())?;
        {
            let _writes = self.writes.lock().unwrap_or_else(PoisonError::into_inner);
            if self.storage.contains_key(&key)? {
                return Err(IllegalArgumentError::DuplicateKey { key }.into());
            }
            self.storage
                .put(&key, self.mapper.to_persistable(&element))?;
        }
        self.listeners.notify_added(self, &element);
        Ok(())
    }

    fn get(&self, key: &E::Key) -> Result<Option<E>, RegistryError> {
        let key = self.storage_key(key)?;
        self.storage
            .get(&key)?
            .map(|persisted| self.mapper.to_element(&key, persisted))
            .transpose()
    }

    #[tracing::instrument(skip(self))]
    fn remove(&self, key: &E::Key) -> Result<Option<E>, RegistryError> {
        let key = self.storage_key(key)?;
        let removed = {
            let _writes = self.writes.lock().unwrap_or_else(PoisonError::into_inner);
            let Some(persisted) = self.storage.get(&key)? else {
                return Ok(None);
            };
            let element = self.mapper.to_element(&key, persisted)?;
            self.storage.remove(&key)?;
            element
        };
        self.listeners.notify_removed(self, &removed);
        Ok(Some(removed))
    }

    #[tracing::instrument(skip(self, element), fields(key = %element.uid()))]
    fn update(&self, element: E) -> Result<Option<E>, RegistryError> {
        let key = self.storage_key(&element.uid())?;
        let old_element = {
            let _writes = self.writes.lock().unwrap_or_else(PoisonError::into_inner);
            let Some(previous) = self.storage.get(&key)? else {
                tracing::debug!(storage = self.storage_name(), "cannot update missing element");
                return Ok(None);
            };
            let old_element = self.mapper.to_element(&key, previous)?;
            self.storage
                .put(&key, self.mapper.to_persistable(&element))?;
            old_element
        };
        self.listeners
            .notify_updated(self, &old_element, &element);
        Ok(Some(old_element))
    }
}
