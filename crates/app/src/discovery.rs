//! In-process [`ProviderDiscovery`]: a directory providers register into.

use std::sync::{Arc, Mutex, PoisonError};

use crate::ports::{Provider, ProviderDiscovery, ProviderTracker};

/// A directory of providers of one element type.
///
/// Modules register their providers whenever they become available; every
/// open tracker (usually a registry) is told about them. Opening a tracker
/// replays the providers registered so far.
pub struct ProviderDirectory<E> {
    state: Mutex<DirectoryState<E>>,
}

struct DirectoryState<E> {
    providers: Vec<Arc<dyn Provider<E>>>,
    trackers: Vec<Arc<dyn ProviderTracker<E>>>,
}

impl<E> Default for ProviderDirectory<E> {
    fn default() -> Self {
        Self {
            state: Mutex::new(DirectoryState {
                providers: Vec::new(),
                trackers: Vec::new(),
            }),
        }
    }
}

impl<E> ProviderDirectory<E> {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Make `provider` available. Registering the same provider twice has
    /// no further effect.
    pub fn register(&self, provider: Arc<dyn Provider<E>>) {
        let trackers = {
            let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
            if state.providers.iter().any(|known| Arc::ptr_eq(known, &provider)) {
                return;
            }
            state.providers.push(Arc::clone(&provider));
            state.trackers.clone()
        };
        for tracker in trackers {
            tracker.adding_provider(Arc::clone(&provider));
        }
    }

    /// Withdraw `provider`. Unknown providers are ignored.
    pub fn unregister(&self, provider: &Arc<dyn Provider<E>>) {
        let trackers = {
            let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
            let before = state.providers.len();
            state.providers.retain(|known| !Arc::ptr_eq(known, provider));
            if state.providers.len() == before {
                return;
            }
            state.trackers.clone()
        };
        for tracker in trackers {
            tracker.removed_provider(provider);
        }
    }

    /// Number of registered providers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .providers
            .len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<E> ProviderDiscovery<E> for ProviderDirectory<E> {
    fn open(&self, tracker: Arc<dyn ProviderTracker<E>>) {
        let providers = {
            let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
            if state.trackers.iter().any(|known| Arc::ptr_eq(known, &tracker)) {
                return;
            }
            state.trackers.push(Arc::clone(&tracker));
            state.providers.clone()
        };
        for provider in providers {
            tracker.adding_provider(provider);
        }
    }

    fn close(&self, tracker: &Arc<dyn ProviderTracker<E>>) {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        state.trackers.retain(|known| !Arc::ptr_eq(known, tracker));
    }
}
