//! Provider port: sources of registry elements.
//!
//! A provider owns a set of elements and tells its listeners whenever that
//! set changes. Registries subscribe to every provider they track and fold
//! the events into their aggregated view.

use std::sync::Arc;

use homereg_domain::error::RegistryError;
use homereg_domain::identifiable::Identifiable;

/// A source of elements of type `E`.
///
/// Implementations must notify every registered listener exactly once per
/// logical change, after the change is visible through [`get_all`](Self::get_all).
/// Listeners are identified by pointer, registering the same `Arc` twice
/// has no further effect.
pub trait Provider<E>: Send + Sync {
    /// Snapshot of every element currently supplied.
    fn get_all(&self) -> Vec<E>;

    fn add_provider_change_listener(&self, listener: Arc<dyn ProviderChangeListener<E>>);

    fn remove_provider_change_listener(&self, listener: &Arc<dyn ProviderChangeListener<E>>);
}

/// Callbacks invoked by a [`Provider`] when its elements change.
///
/// `provider` is the source of the change; registries use its address to
/// attribute the element.
pub trait ProviderChangeListener<E>: Send + Sync {
    fn added(&self, provider: &dyn Provider<E>, element: &E);

    fn removed(&self, provider: &dyn Provider<E>, element: &E);

    fn updated(&self, provider: &dyn Provider<E>, old_element: &E, element: &E);
}

/// A [`Provider`] that also accepts runtime CRUD, usually backed by storage.
///
/// Every successful write is followed by the matching provider event, so a
/// registry tracking this provider sees the change through the same path
/// as changes from any other provider.
pub trait ManagedProvider<E: Identifiable>: Provider<E> {
    /// Store a new element.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::IllegalArgument`] if the key is empty or
    /// already stored, or a storage error.
    fn add(&self, element: E) -> Result<(), RegistryError>;

    /// Look up a stored element.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::IllegalArgument`] on an empty key, or a
    /// storage error.
    fn get(&self, key: &E::Key) -> Result<Option<E>, RegistryError>;

    /// Remove a stored element, returning it if it existed.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::IllegalArgument`] on an empty key, or a
    /// storage error.
    fn remove(&self, key: &E::Key) -> Result<Option<E>, RegistryError>;

    /// Replace a stored element, returning the previous one.
    ///
    /// Updating a key that is not stored is a no-op returning `None`.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::IllegalArgument`] on an empty key, or a
    /// storage error.
    fn update(&self, element: E) -> Result<Option<E>, RegistryError>;
}

/// Identity of a provider object.
///
/// Derived from the address of the provider value, so an `Arc<P>` and the
/// `&dyn Provider<E>` handed to listener callbacks map to the same id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ProviderId(usize);

impl ProviderId {
    #[must_use]
    pub fn of<E>(provider: &dyn Provider<E>) -> Self {
        Self(std::ptr::from_ref(provider).cast::<()>().addr())
    }
}
