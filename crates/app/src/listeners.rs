//! Listener sets with per-listener failure isolation.
//!
//! Both registries and providers fan events out to a set of listeners. A
//! listener that panics is logged and skipped; the remaining listeners still
//! receive the event and no lock is held while any of them runs.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, PoisonError, RwLock};

use crate::ports::provider::{Provider, ProviderChangeListener};

/// A set of listeners identified by pointer.
///
/// Notification iterates a snapshot, so listeners may be added or removed
/// concurrently (including from inside a callback).
pub struct ListenerSet<L: ?Sized> {
    listeners: RwLock<Vec<Arc<L>>>,
}

impl<L: ?Sized> Default for ListenerSet<L> {
    fn default() -> Self {
        Self {
            listeners: RwLock::new(Vec::new()),
        }
    }
}

impl<L: ?Sized> ListenerSet<L> {
    /// Add a listener. Returns `false` if it was already registered.
    pub fn insert(&self, listener: Arc<L>) -> bool {
        let mut listeners = self
            .listeners
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        if listeners.iter().any(|known| Arc::ptr_eq(known, &listener)) {
            return false;
        }
        listeners.push(listener);
        true
    }

    /// Remove a listener. Returns `false` if it was not registered.
    pub fn remove(&self, listener: &Arc<L>) -> bool {
        let mut listeners = self
            .listeners
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        let before = listeners.len();
        listeners.retain(|known| !Arc::ptr_eq(known, listener));
        listeners.len() != before
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.listeners
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Clone the current listeners out of the lock.
    #[must_use]
    pub fn snapshot(&self) -> Vec<Arc<L>> {
        self.listeners
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Call `notify` once per listener, isolating panics.
    pub fn notify(&self, event: &str, mut notify: impl FnMut(&L)) {
        for listener in self.snapshot() {
            let outcome = panic::catch_unwind(AssertUnwindSafe(|| notify(listener.as_ref())));
            if let Err(payload) = outcome {
                tracing::error!(
                    listener = ?Arc::as_ptr(&listener).cast::<()>(),
                    event,
                    reason = panic_reason(payload.as_ref()),
                    "listener failed, continuing with the remaining listeners"
                );
            }
        }
    }
}

pub(crate) fn panic_reason(payload: &(dyn Any + Send)) -> &str {
    if let Some(reason) = payload.downcast_ref::<&'static str>() {
        reason
    } else if let Some(reason) = payload.downcast_ref::<String>() {
        reason.as_str()
    } else {
        "unknown panic"
    }
}

/// Listener bookkeeping shared by provider implementations.
///
/// Embed it in a provider, forward the listener registration methods of
/// [`Provider`] to it and call the `notify_*` methods after each change.
pub struct ProviderListeners<E> {
    listeners: ListenerSet<dyn ProviderChangeListener<E>>,
}

impl<E> Default for ProviderListeners<E> {
    fn default() -> Self {
        Self {
            listeners: ListenerSet::default(),
        }
    }
}

impl<E> ProviderListeners<E> {
    pub fn add(&self, listener: Arc<dyn ProviderChangeListener<E>>) {
        self.listeners.insert(listener);
    }

    pub fn remove(&self, listener: &Arc<dyn ProviderChangeListener<E>>) {
        self.listeners.remove(listener);
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.listeners.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.listeners.is_empty()
    }

    pub fn notify_added(&self, provider: &dyn Provider<E>, element: &E) {
        self.listeners
            .notify("added", |listener| listener.added(provider, element));
    }

    pub fn notify_removed(&self, provider: &dyn Provider<E>, element: &E) {
        self.listeners
            .notify("removed", |listener| listener.removed(provider, element));
    }

    pub fn notify_updated(&self, provider: &dyn Provider<E>, old_element: &E, element: &E) {
        self.listeners.notify("updated", |listener| {
            listener.updated(provider, old_element, element);
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    trait Counter: Send + Sync {
        fn hit(&self, value: u32);
    }

    #[derive(Default)]
    struct Recording(Mutex<Vec<u32>>);

    impl Counter for Recording {
        fn hit(&self, value: u32) {
            self.0.lock().unwrap().push(value);
        }
    }

    struct Exploding;

    impl Counter for Exploding {
        fn hit(&self, _value: u32) {
            panic!("listener exploded");
        }
    }

    #[test]
    fn should_ignore_duplicate_registration() {
        let set: ListenerSet<dyn Counter> = ListenerSet::default();
        let listener: Arc<dyn Counter> = Arc::new(Recording::default());

        assert!(set.insert(Arc::clone(&listener)));
        assert!(!set.insert(Arc::clone(&listener)));
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn should_remove_registered_listener() {
        let set: ListenerSet<dyn Counter> = ListenerSet::default();
        let listener: Arc<dyn Counter> = Arc::new(Recording::default());
        set.insert(Arc::clone(&listener));

        assert!(set.remove(&listener));
        assert!(!set.remove(&listener));
        assert!(set.is_empty());
    }

    #[test]
    fn should_deliver_to_all_listeners_when_one_panics() {
        let set: ListenerSet<dyn Counter> = ListenerSet::default();
        let first = Arc::new(Recording::default());
        let third = Arc::new(Recording::default());
        set.insert(first.clone());
        set.insert(Arc::new(Exploding));
        set.insert(third.clone());

        set.notify("hit", |listener| listener.hit(7));
        set.notify("hit", |listener| listener.hit(8));

        assert_eq!(*first.0.lock().unwrap(), vec![7, 8]);
        assert_eq!(*third.0.lock().unwrap(), vec![7, 8]);
    }

    #[test]
    fn should_extract_panic_reason() {
        let payload = panic::catch_unwind(|| panic!("boom")).unwrap_err();
        assert_eq!(panic_reason(payload.as_ref()), "boom");

        let payload = panic::catch_unwind(|| panic!("{}", String::from("formatted"))).unwrap_err();
        assert_eq!(panic_reason(payload.as_ref()), "formatted");
    }
}
