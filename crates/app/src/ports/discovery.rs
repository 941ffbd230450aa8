//! Discovery port: dynamic appearance and disappearance of providers.
//!
//! A registry does not know where its providers come from. Whatever wires
//! the application together (a plugin host, a DI container, plain manual
//! wiring) implements [`ProviderDiscovery`] and drives the registry through
//! the [`ProviderTracker`] callbacks.

use std::sync::Arc;

use super::provider::Provider;

/// Receives providers as they come and go.
pub trait ProviderTracker<E>: Send + Sync {
    fn adding_provider(&self, provider: Arc<dyn Provider<E>>);

    fn removed_provider(&self, provider: &Arc<dyn Provider<E>>);
}

/// A source of provider lifecycle callbacks.
pub trait ProviderDiscovery<E>: Send + Sync {
    /// Start reporting to `tracker`: every provider known now, then every
    /// later registration and unregistration.
    fn open(&self, tracker: Arc<dyn ProviderTracker<E>>);

    /// Stop reporting to `tracker`. Providers already reported are not
    /// retracted.
    fn close(&self, tracker: &Arc<dyn ProviderTracker<E>>);
}
