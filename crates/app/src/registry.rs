//! Registry: one consistent, observable view over many providers.
//!
//! [`ProviderRegistry`] tracks any number of [`Provider`]s, merges their
//! elements, forwards their add/remove/update events to registry listeners
//! and routes writes to a single [`ManagedProvider`]. A write never touches
//! the aggregated view directly: the managed provider persists it and emits
//! a provider event, which flows back through the same path as events from
//! every other provider.
//!
//! Failures are contained per element and per listener. A rejected element
//! is logged and skipped, and so is one whose hook panics. A panicking
//! listener is logged and the remaining listeners still run. Only misuse
//! (a write without a managed provider, illegal arguments) reaches the
//! caller.

use std::collections::HashSet;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock, Weak};

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use serde::Deserialize;

use homereg_domain::error::{IllegalStateError, RegistryError, ValidationError};
use homereg_domain::event::Event;
use homereg_domain::identifiable::Identifiable;

use crate::listeners::{ListenerSet, panic_reason};
use crate::ports::{
    EventPublisher, ManagedProvider, Provider, ProviderChangeListener, ProviderDiscovery,
    ProviderId, ProviderTracker,
};

/// Observer of the aggregated view of a registry.
pub trait RegistryChangeListener<E>: Send + Sync {
    fn added(&self, element: &E);

    fn removed(&self, element: &E);

    fn updated(&self, old_element: &E, element: &E);
}

/// Public contract of a registry, for consumers that only need the view.
pub trait Registry<E: Identifiable>: Send + Sync {
    fn get_all(&self) -> Vec<E>;

    fn get(&self, key: &E::Key) -> Option<E>;

    /// # Errors
    ///
    /// Returns [`RegistryError::IllegalState`] without a managed provider,
    /// or the managed provider's error.
    fn add(&self, element: E) -> Result<E, RegistryError>;

    /// # Errors
    ///
    /// Returns [`RegistryError::IllegalState`] without a managed provider,
    /// or the managed provider's error.
    fn update(&self, element: E) -> Result<Option<E>, RegistryError>;

    /// # Errors
    ///
    /// Returns [`RegistryError::IllegalState`] without a managed provider,
    /// or the managed provider's error.
    fn remove(&self, key: &E::Key) -> Result<Option<E>, RegistryError>;

    fn add_registry_change_listener(&self, listener: Arc<dyn RegistryChangeListener<E>>);

    fn remove_registry_change_listener(&self, listener: &Arc<dyn RegistryChangeListener<E>>);
}

/// Extension points of a concrete registry.
///
/// The `on_*` hooks run before an element enters, leaves or replaces one in
/// the view; an error or a panic aborts that single element. The `*_event` hooks build
/// the event published after the change, if any.
pub trait RegistryHooks<E>: Send + Sync {
    /// # Errors
    ///
    /// Any error rejects the element.
    fn on_add_element(&self, _element: &E) -> Result<(), RegistryError> {
        Ok(())
    }

    /// # Errors
    ///
    /// Any error suppresses the removal notification of the element.
    fn on_remove_element(&self, _element: &E) -> Result<(), RegistryError> {
        Ok(())
    }

    /// # Errors
    ///
    /// Any error rejects the update; the old element stays in place.
    fn on_update_element(&self, _old_element: &E, _element: &E) -> Result<(), RegistryError> {
        Ok(())
    }

    fn added_event(&self, _element: &E) -> Option<Event> {
        None
    }

    fn removed_event(&self, _element: &E) -> Option<Event> {
        None
    }

    fn updated_event(&self, _old_element: &E, _element: &E) -> Option<Event> {
        None
    }
}

/// Hooks that accept everything and publish nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoHooks;

impl<E> RegistryHooks<E> for NoHooks {}

/// What to do when two providers supply elements with the same key.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DuplicateKeyPolicy {
    /// Keep both; [`ProviderRegistry::get`] returns whichever is found first.
    #[default]
    Allow,
    /// Reject the later element as if its `on_add_element` hook had failed.
    Reject,
}

/// Tunables of a [`ProviderRegistry`].
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RegistryConfig {
    pub duplicate_keys: DuplicateKeyPolicy,
}

struct TrackedProvider<E: Identifiable> {
    provider: Arc<dyn Provider<E>>,
    elements: DashMap<E::Key, E>,
    retiring: AtomicBool,
    discovered: AtomicBool,
}

struct Inner<E: Identifiable, H> {
    kind: &'static str,
    hooks: H,
    config: RegistryConfig,
    element_map: DashMap<ProviderId, Arc<TrackedProvider<E>>>,
    listeners: ListenerSet<dyn RegistryChangeListener<E>>,
    managed_provider: RwLock<Option<Arc<dyn ManagedProvider<E>>>>,
    event_publisher: RwLock<Option<Arc<dyn EventPublisher>>>,
    discovery: RwLock<Option<Arc<dyn ProviderDiscovery<E>>>>,
    active: AtomicBool,
    /// Providers reported by discovery while `activate` replays it.
    replayed: Mutex<Option<HashSet<ProviderId>>>,
    as_listener: Arc<dyn ProviderChangeListener<E>>,
    as_tracker: Arc<dyn ProviderTracker<E>>,
}

/// Handle providers hold on to. Weak, so a provider outliving the registry
/// does not keep it alive.
struct Subscription<E: Identifiable, H> {
    inner: Weak<Inner<E, H>>,
}

impl<E, H> Subscription<E, H>
where
    E: Identifiable + Clone + Send + Sync + 'static,
    H: RegistryHooks<E> + 'static,
{
    fn registry(&self) -> Option<ProviderRegistry<E, H>> {
        self.inner.upgrade().map(|inner| ProviderRegistry { inner })
    }
}

impl<E, H> ProviderChangeListener<E> for Subscription<E, H>
where
    E: Identifiable + Clone + Send + Sync + 'static,
    H: RegistryHooks<E> + 'static,
{
    fn added(&self, provider: &dyn Provider<E>, element: &E) {
        if let Some(registry) = self.registry() {
            registry.added(provider, element);
        }
    }

    fn removed(&self, provider: &dyn Provider<E>, element: &E) {
        if let Some(registry) = self.registry() {
            registry.removed(provider, element);
        }
    }

    fn updated(&self, provider: &dyn Provider<E>, old_element: &E, element: &E) {
        if let Some(registry) = self.registry() {
            registry.updated(provider, old_element, element);
        }
    }
}

impl<E, H> ProviderTracker<E> for Subscription<E, H>
where
    E: Identifiable + Clone + Send + Sync + 'static,
    H: RegistryHooks<E> + 'static,
{
    fn adding_provider(&self, provider: Arc<dyn Provider<E>>) {
        if let Some(registry) = self.registry() {
            registry.adding_provider(provider);
        }
    }

    fn removed_provider(&self, provider: &Arc<dyn Provider<E>>) {
        if let Some(registry) = self.registry() {
            registry.removed_provider(provider);
        }
    }
}

/// The aggregation engine behind every concrete registry.
///
/// Cloning is cheap and yields a handle to the same registry.
pub struct ProviderRegistry<E: Identifiable, H = NoHooks> {
    inner: Arc<Inner<E, H>>,
}

impl<E: Identifiable, H> Clone for ProviderRegistry<E, H> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<E, H> ProviderRegistry<E, H>
where
    E: Identifiable + Clone + Send + Sync + 'static,
    H: RegistryHooks<E> + 'static,
{
    /// Create an inactive, empty registry. `kind` names the element type in
    /// log lines and errors.
    pub fn new(kind: &'static str, hooks: H) -> Self {
        Self::with_config(kind, hooks, RegistryConfig::default())
    }

    pub fn with_config(kind: &'static str, hooks: H, config: RegistryConfig) -> Self {
        let inner = Arc::new_cyclic(|weak: &Weak<Inner<E, H>>| {
            let subscription = Arc::new(Subscription {
                inner: Weak::clone(weak),
            });
            Inner {
                kind,
                hooks,
                config,
                element_map: DashMap::new(),
                listeners: ListenerSet::default(),
                managed_provider: RwLock::new(None),
                event_publisher: RwLock::new(None),
                discovery: RwLock::new(None),
                active: AtomicBool::new(false),
                replayed: Mutex::new(None),
                as_listener: Arc::clone(&subscription) as Arc<dyn ProviderChangeListener<E>>,
                as_tracker: subscription,
            }
        });
        Self { inner }
    }

    #[must_use]
    pub fn kind(&self) -> &'static str {
        self.inner.kind
    }

    #[must_use]
    pub fn hooks(&self) -> &H {
        &self.inner.hooks
    }

    // --- lifecycle -------------------------------------------------------

    /// Use `discovery` to find providers once the registry is active.
    pub fn set_discovery(&self, discovery: Arc<dyn ProviderDiscovery<E>>) {
        *self
            .inner
            .discovery
            .write()
            .unwrap_or_else(PoisonError::into_inner) = Some(discovery);
    }

    /// Start tracking providers reported by the discovery, if one is set.
    ///
    /// Discovered providers the discovery no longer reports, because they
    /// went away while the registry was inactive, are untracked.
    pub fn activate(&self) {
        if self.inner.active.swap(true, Ordering::SeqCst) {
            return;
        }
        tracing::debug!(registry = self.inner.kind, "activating registry");
        let Some(discovery) = self.discovery() else {
            return;
        };

        let previously_discovered: Vec<Arc<TrackedProvider<E>>> = self
            .snapshot()
            .into_iter()
            .filter(|tracked| tracked.discovered.load(Ordering::Acquire))
            .collect();
        *self.replayed() = Some(HashSet::new());
        discovery.open(Arc::clone(&self.inner.as_tracker));
        let replayed = self.replayed().take().unwrap_or_default();

        for tracked in previously_discovered {
            if !replayed.contains(&ProviderId::of(tracked.provider.as_ref())) {
                tracing::debug!(registry = self.inner.kind, "dropping vanished provider");
                self.remove_provider(tracked.provider.as_ref());
            }
        }
    }

    fn replayed(&self) -> MutexGuard<'_, Option<HashSet<ProviderId>>> {
        self.inner
            .replayed
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Stop discovery. Providers tracked so far stay tracked until the next
    /// activation.
    pub fn deactivate(&self) {
        if !self.inner.active.swap(false, Ordering::SeqCst) {
            return;
        }
        tracing::debug!(registry = self.inner.kind, "deactivating registry");
        if let Some(discovery) = self.discovery() {
            discovery.close(&self.inner.as_tracker);
        }
    }

    #[must_use]
    pub fn is_active(&self) -> bool {
        self.inner.active.load(Ordering::SeqCst)
    }

    fn discovery(&self) -> Option<Arc<dyn ProviderDiscovery<E>>> {
        self.inner
            .discovery
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Discovery callback; ignored while inactive.
    pub fn adding_provider(&self, provider: Arc<dyn Provider<E>>) {
        if !self.is_active() {
            tracing::debug!(registry = self.inner.kind, "ignoring provider while inactive");
            return;
        }
        let id = ProviderId::of(provider.as_ref());
        self.add_provider(provider);
        if let Some(tracked) = self.tracked(id) {
            tracked.discovered.store(true, Ordering::Release);
        }
        if let Some(replayed) = self.replayed().as_mut() {
            replayed.insert(id);
        }
    }

    /// Discovery callback; ignored while inactive.
    pub fn removed_provider(&self, provider: &Arc<dyn Provider<E>>) {
        if !self.is_active() {
            tracing::debug!(registry = self.inner.kind, "ignoring provider removal while inactive");
            return;
        }
        self.remove_provider(provider.as_ref());
    }

    // --- provider tracking -----------------------------------------------

    /// Track `provider` and admit its current elements.
    ///
    /// Tracking an already tracked provider does nothing.
    pub fn add_provider(&self, provider: Arc<dyn Provider<E>>) {
        let id = ProviderId::of(provider.as_ref());
        let tracked = match self.inner.element_map.entry(id) {
            Entry::Occupied(_) => {
                tracing::debug!(registry = self.inner.kind, "provider is already tracked");
                return;
            }
            Entry::Vacant(vacant) => {
                let tracked = Arc::new(TrackedProvider {
                    provider: Arc::clone(&provider),
                    elements: DashMap::new(),
                    retiring: AtomicBool::new(false),
                    discovered: AtomicBool::new(false),
                });
                vacant.insert(Arc::clone(&tracked));
                tracked
            }
        };

        provider.add_provider_change_listener(Arc::clone(&self.inner.as_listener));

        let elements = provider.get_all();
        tracing::debug!(
            registry = self.inner.kind,
            count = elements.len(),
            "tracking provider"
        );
        for element in elements {
            self.admit(id, &tracked, element);
        }
    }

    /// Stop tracking `provider` and drop every element attributed to it.
    ///
    /// Untracked providers are ignored.
    pub fn remove_provider(&self, provider: &dyn Provider<E>) {
        let id = ProviderId::of(provider);
        let Some(tracked) = self.tracked(id) else {
            tracing::debug!(registry = self.inner.kind, "provider is not tracked");
            return;
        };
        if tracked.retiring.swap(true, Ordering::AcqRel) {
            return;
        }

        let elements: Vec<E> = tracked
            .elements
            .iter()
            .map(|entry| entry.value().clone())
            .collect();
        tracing::debug!(
            registry = self.inner.kind,
            count = elements.len(),
            "untracking provider"
        );
        for element in elements {
            if self.run_hook("on_remove_element", &element.uid(), |hooks| {
                hooks.on_remove_element(&element)
            }) {
                self.notify_added_removed(&element, false);
            }
        }

        self.inner
            .element_map
            .remove_if(&id, |_, current| Arc::ptr_eq(current, &tracked));
        tracked
            .provider
            .remove_provider_change_listener(&self.inner.as_listener);
    }

    fn tracked(&self, id: ProviderId) -> Option<Arc<TrackedProvider<E>>> {
        self.inner
            .element_map
            .get(&id)
            .map(|entry| Arc::clone(entry.value()))
            .filter(|tracked| !tracked.retiring.load(Ordering::Acquire))
    }

    fn snapshot(&self) -> Vec<Arc<TrackedProvider<E>>> {
        self.inner
            .element_map
            .iter()
            .map(|entry| Arc::clone(entry.value()))
            .collect()
    }

    /// Run the add hook and insert `element` for the provider `id`.
    fn admit(&self, id: ProviderId, tracked: &TrackedProvider<E>, element: E) {
        let key = element.uid();
        if tracked.elements.contains_key(&key) {
            tracing::debug!(registry = self.inner.kind, %key, "element is already tracked");
            return;
        }
        if let Err(err) = self.check_key_collision(id, &key) {
            tracing::warn!(%err, registry = self.inner.kind, %key, "rejected element");
            return;
        }
        if !self.run_hook("on_add_element", &key, |hooks| hooks.on_add_element(&element)) {
            return;
        }
        match tracked.elements.entry(key) {
            Entry::Occupied(_) => return,
            Entry::Vacant(vacant) => {
                vacant.insert(element.clone());
            }
        }
        self.notify_added_removed(&element, true);
    }

    /// Run one `on_*` hook. Errors and panics both reject the element.
    fn run_hook(
        &self,
        hook: &'static str,
        key: &E::Key,
        call: impl FnOnce(&H) -> Result<(), RegistryError>,
    ) -> bool {
        match panic::catch_unwind(AssertUnwindSafe(|| call(&self.inner.hooks))) {
            Ok(Ok(())) => true,
            Ok(Err(err)) => {
                tracing::warn!(%err, registry = self.inner.kind, %key, hook, "rejected by hook");
                false
            }
            Err(payload) => {
                tracing::error!(
                    registry = self.inner.kind,
                    %key,
                    hook,
                    reason = panic_reason(payload.as_ref()),
                    "hook failed"
                );
                false
            }
        }
    }

    fn check_key_collision(&self, id: ProviderId, key: &E::Key) -> Result<(), RegistryError> {
        if self.inner.config.duplicate_keys == DuplicateKeyPolicy::Allow {
            return Ok(());
        }
        let taken = self
            .inner
            .element_map
            .iter()
            .any(|entry| *entry.key() != id && entry.value().elements.contains_key(key));
        if taken {
            return Err(ValidationError::KeyCollision {
                key: key.to_string(),
            }
            .into());
        }
        Ok(())
    }

    // --- provider events ---------------------------------------------------

    /// A tracked provider added `element`.
    pub fn added(&self, provider: &dyn Provider<E>, element: &E) {
        let id = ProviderId::of(provider);
        let Some(tracked) = self.tracked(id) else {
            tracing::debug!(
                registry = self.inner.kind,
                key = %element.uid(),
                "ignoring addition from untracked provider"
            );
            return;
        };
        self.admit(id, &tracked, element.clone());
    }

    /// A tracked provider removed `element`.
    pub fn removed(&self, provider: &dyn Provider<E>, element: &E) {
        let key = element.uid();
        let Some(tracked) = self.tracked(ProviderId::of(provider)) else {
            tracing::debug!(
                registry = self.inner.kind,
                %key,
                "ignoring removal from untracked provider"
            );
            return;
        };
        let Some(current) = tracked.elements.get(&key).map(|entry| entry.value().clone()) else {
            tracing::debug!(
                registry = self.inner.kind,
                %key,
                "ignoring removal of unknown element"
            );
            return;
        };
        if !self.run_hook("on_remove_element", &key, |hooks| {
            hooks.on_remove_element(&current)
        }) {
            return;
        }
        if let Some((_, removed)) = tracked.elements.remove(&key) {
            self.notify_added_removed(&removed, false);
        }
    }

    /// A tracked provider replaced `old_element` with `element`.
    pub fn updated(&self, provider: &dyn Provider<E>, old_element: &E, element: &E) {
        let id = ProviderId::of(provider);
        let old_key = old_element.uid();
        let key = element.uid();
        let Some(tracked) = self.tracked(id) else {
            tracing::debug!(
                registry = self.inner.kind,
                %key,
                "ignoring update from untracked provider"
            );
            return;
        };
        let Some(current) = tracked
            .elements
            .get(&old_key)
            .map(|entry| entry.value().clone())
        else {
            tracing::debug!(
                registry = self.inner.kind,
                key = %old_key,
                "ignoring update of unknown element"
            );
            return;
        };
        let rekeyed = key != old_key;
        if rekeyed && let Err(err) = self.check_key_collision(id, &key) {
            tracing::warn!(%err, registry = self.inner.kind, %key, "rejected update");
            return;
        }
        if !self.run_hook("on_update_element", &key, |hooks| {
            hooks.on_update_element(&current, element)
        }) {
            return;
        }
        if rekeyed {
            tracked.elements.remove(&old_key);
        }
        tracked.elements.insert(key, element.clone());
        self.notify_updated(&current, element);
    }

    // --- view ----------------------------------------------------------

    /// Snapshot of the elements of every tracked provider, in no
    /// particular order.
    #[must_use]
    pub fn get_all(&self) -> Vec<E> {
        let mut all = Vec::new();
        for tracked in self.snapshot() {
            all.extend(tracked.elements.iter().map(|entry| entry.value().clone()));
        }
        all
    }

    #[must_use]
    pub fn get(&self, key: &E::Key) -> Option<E> {
        self.snapshot()
            .into_iter()
            .find_map(|tracked| tracked.elements.get(key).map(|entry| entry.value().clone()))
    }

    #[must_use]
    pub fn contains_key(&self, key: &E::Key) -> bool {
        self.snapshot()
            .iter()
            .any(|tracked| tracked.elements.contains_key(key))
    }

    /// The provider currently supplying `key`.
    #[must_use]
    pub fn get_provider(&self, key: &E::Key) -> Option<Arc<dyn Provider<E>>> {
        self.snapshot()
            .into_iter()
            .find(|tracked| tracked.elements.contains_key(key))
            .map(|tracked| Arc::clone(&tracked.provider))
    }

    /// Number of elements in the view.
    #[must_use]
    pub fn len(&self) -> usize {
        self.snapshot()
            .iter()
            .map(|tracked| tracked.elements.len())
            .sum()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    // --- writes --------------------------------------------------------

    #[must_use]
    pub fn managed_provider(&self) -> Option<Arc<dyn ManagedProvider<E>>> {
        self.inner
            .managed_provider
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Route writes to `managed` and track it, replacing the previous one.
    pub fn set_managed_provider(&self, managed: Arc<dyn ManagedProvider<E>>) {
        let previous = self
            .inner
            .managed_provider
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .replace(Arc::clone(&managed));
        if let Some(previous) = previous {
            if Arc::ptr_eq(&previous, &managed) {
                return;
            }
            self.remove_provider(previous.as_ref());
        }
        self.add_provider(managed);
    }

    /// Unset `managed` if it is the current managed provider and untrack it.
    pub fn remove_managed_provider(&self, managed: &Arc<dyn ManagedProvider<E>>) {
        let removed = {
            let mut slot = self
                .inner
                .managed_provider
                .write()
                .unwrap_or_else(PoisonError::into_inner);
            match slot.as_ref() {
                Some(current) if Arc::ptr_eq(current, managed) => slot.take(),
                _ => None,
            }
        };
        if let Some(removed) = removed {
            self.remove_provider(removed.as_ref());
        }
    }

    fn require_managed_provider(&self) -> Result<Arc<dyn ManagedProvider<E>>, RegistryError> {
        self.managed_provider().ok_or_else(|| {
            IllegalStateError::NoManagedProvider {
                registry: self.inner.kind,
            }
            .into()
        })
    }

    /// Persist a new element through the managed provider.
    ///
    /// The element shows up in the view through the managed provider's
    /// `added` event. If `on_add_element` then rejects it, the call still
    /// succeeds: the element stays persisted but is not part of the view.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::IllegalState`] without a managed provider,
    /// or the managed provider's error.
    #[tracing::instrument(
        skip(self, element),
        fields(registry = self.inner.kind, key = %element.uid())
    )]
    pub fn add(&self, element: E) -> Result<E, RegistryError> {
        self.require_managed_provider()?.add(element.clone())?;
        Ok(element)
    }

    /// Replace an element through the managed provider, returning the
    /// previous one (`None` if it was not managed).
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::IllegalState`] without a managed provider,
    /// or the managed provider's error.
    #[tracing::instrument(
        skip(self, element),
        fields(registry = self.inner.kind, key = %element.uid())
    )]
    pub fn update(&self, element: E) -> Result<Option<E>, RegistryError> {
        self.require_managed_provider()?.update(element)
    }

    /// Remove an element through the managed provider.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::IllegalState`] without a managed provider,
    /// or the managed provider's error.
    #[tracing::instrument(skip(self), fields(registry = self.inner.kind))]
    pub fn remove(&self, key: &E::Key) -> Result<Option<E>, RegistryError> {
        self.require_managed_provider()?.remove(key)
    }

    // --- listeners and events --------------------------------------------

    pub fn add_registry_change_listener(&self, listener: Arc<dyn RegistryChangeListener<E>>) {
        self.inner.listeners.insert(listener);
    }

    pub fn remove_registry_change_listener(&self, listener: &Arc<dyn RegistryChangeListener<E>>) {
        self.inner.listeners.remove(listener);
    }

    pub fn set_event_publisher(&self, publisher: Arc<dyn EventPublisher>) {
        *self
            .inner
            .event_publisher
            .write()
            .unwrap_or_else(PoisonError::into_inner) = Some(publisher);
    }

    pub fn unset_event_publisher(&self) {
        self.inner
            .event_publisher
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
    }

    fn notify_added_removed(&self, element: &E, added: bool) {
        if added {
            self.inner
                .listeners
                .notify("added", |listener| listener.added(element));
            self.post_event(|hooks| hooks.added_event(element));
        } else {
            self.inner
                .listeners
                .notify("removed", |listener| listener.removed(element));
            self.post_event(|hooks| hooks.removed_event(element));
        }
    }

    fn notify_updated(&self, old_element: &E, element: &E) {
        self.inner
            .listeners
            .notify("updated", |listener| listener.updated(old_element, element));
        self.post_event(|hooks| hooks.updated_event(old_element, element));
    }

    fn post_event(&self, build: impl FnOnce(&H) -> Option<Event>) {
        let publisher = self
            .inner
            .event_publisher
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        let Some(publisher) = publisher else {
            return;
        };
        let event = match panic::catch_unwind(AssertUnwindSafe(|| build(&self.inner.hooks))) {
            Ok(Some(event)) => event,
            Ok(None) => return,
            Err(payload) => {
                tracing::error!(
                    registry = self.inner.kind,
                    reason = panic_reason(payload.as_ref()),
                    "failed to build event"
                );
                return;
            }
        };
        let topic = event.topic.clone();
        if let Err(err) = publisher.publish(event) {
            tracing::warn!(%err, registry = self.inner.kind, %topic, "failed to publish event");
        }
    }
}

impl<E, H> ProviderChangeListener<E> for ProviderRegistry<E, H>
where
    E: Identifiable + Clone + Send + Sync + 'static,
    H: RegistryHooks<E> + 'static,
{
    fn added(&self, provider: &dyn Provider<E>, element: &E) {
        ProviderRegistry::added(self, provider, element);
    }

    fn removed(&self, provider: &dyn Provider<E>, element: &E) {
        ProviderRegistry::removed(self, provider, element);
    }

    fn updated(&self, provider: &dyn Provider<E>, old_element: &E, element: &E) {
        ProviderRegistry::updated(self, provider, old_element, element);
    }
}

impl<E, H> Registry<E> for ProviderRegistry<E, H>
where
    E: Identifiable + Clone + Send + Sync + 'static,
    H: RegistryHooks<E> + 'static,
{
    fn get_all(&self) -> Vec<E> {
        ProviderRegistry::get_all(self)
    }

    fn get(&self, key: &E::Key) -> Option<E> {
        ProviderRegistry::get(self, key)
    }

    fn add(&self, element: E) -> Result<E, RegistryError> {
        ProviderRegistry::add(self, element)
    }

    fn update(&self, element: E) -> Result<Option<E>, RegistryError> {
        ProviderRegistry::update(self, element)
    }

    fn remove(&self, key: &E::Key) -> Result<Option<E>, RegistryError> {
        ProviderRegistry::remove(self, key)
    }

    fn add_registry_change_listener(&self, listener: Arc<dyn RegistryChangeListener<E>>) {
        ProviderRegistry::add_registry_change_listener(self, listener);
    }

    fn remove_registry_change_listener(&self, listener: &Arc<dyn RegistryChangeListener<E>>) {
        ProviderRegistry::remove_registry_change_listener(self, listener);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    use serde::Serialize;

    use crate::discovery::ProviderDirectory;
    use crate::listeners::ProviderListeners;
    use crate::managed_provider::{IdentityMapper, StorageManagedProvider};
    use crate::storage::VolatileStorageService;

    #[derive(Debug, Clone, PartialEq, Serialize, serde::Deserialize)]
    struct Thing {
        uid: String,
        value: u32,
    }

    impl Identifiable for Thing {
        type Key = String;

        fn uid(&self) -> String {
            self.uid.clone()
        }
    }

    fn thing(uid: &str, value: u32) -> Thing {
        Thing {
            uid: uid.to_string(),
            value,
        }
    }

    #[derive(Default)]
    struct TestProvider {
        elements: Mutex<Vec<Thing>>,
        listeners: ProviderListeners<Thing>,
    }

    impl TestProvider {
        fn with(things: &[Thing]) -> Arc<Self> {
            let provider = Self::default();
            provider.elements.lock().unwrap().extend_from_slice(things);
            Arc::new(provider)
        }

        fn push(&self, thing: Thing) {
            self.elements.lock().unwrap().push(thing.clone());
            self.listeners.notify_added(self, &thing);
        }

        fn take(&self, uid: &str) {
            let removed = {
                let mut elements = self.elements.lock().unwrap();
                let index = elements.iter().position(|t| t.uid == uid).unwrap();
                elements.remove(index)
            };
            self.listeners.notify_removed(self, &removed);
        }

        fn replace(&self, thing: Thing) {
            let old = {
                let mut elements = self.elements.lock().unwrap();
                let slot = elements.iter_mut().find(|t| t.uid == thing.uid).unwrap();
                std::mem::replace(slot, thing.clone())
            };
            self.listeners.notify_updated(self, &old, &thing);
        }
    }

    impl Provider<Thing> for TestProvider {
        fn get_all(&self) -> Vec<Thing> {
            self.elements.lock().unwrap().clone()
        }

        fn add_provider_change_listener(&self, listener: Arc<dyn ProviderChangeListener<Thing>>) {
            self.listeners.add(listener);
        }

        fn remove_provider_change_listener(
            &self,
            listener: &Arc<dyn ProviderChangeListener<Thing>>,
        ) {
            self.listeners.remove(listener);
        }
    }

    #[derive(Default)]
    struct Recorder {
        events: Mutex<Vec<String>>,
    }

    impl Recorder {
        fn events(&self) -> Vec<String> {
            self.events.lock().unwrap().clone()
        }
    }

    impl RegistryChangeListener<Thing> for Recorder {
        fn added(&self, element: &Thing) {
            self.events.lock().unwrap().push(format!("added {}", element.uid));
        }

        fn removed(&self, element: &Thing) {
            self.events.lock().unwrap().push(format!("removed {}", element.uid));
        }

        fn updated(&self, old_element: &Thing, element: &Thing) {
            self.events.lock().unwrap().push(format!(
                "updated {} {}->{}",
                element.uid, old_element.value, element.value
            ));
        }
    }

    struct Panicking;

    impl RegistryChangeListener<Thing> for Panicking {
        fn added(&self, _element: &Thing) {
            panic!("listener bug");
        }

        fn removed(&self, _element: &Thing) {
            panic!("listener bug");
        }

        fn updated(&self, _old_element: &Thing, _element: &Thing) {
            panic!("listener bug");
        }
    }

    /// Rejects zero values and publishes every change.
    struct RejectZero;

    impl RegistryHooks<Thing> for RejectZero {
        fn on_add_element(&self, element: &Thing) -> Result<(), RegistryError> {
            if element.value == 0 {
                return Err(ValidationError::EmptyName.into());
            }
            Ok(())
        }

        fn on_update_element(&self, _old: &Thing, element: &Thing) -> Result<(), RegistryError> {
            self.on_add_element(element)
        }

        fn added_event(&self, element: &Thing) -> Option<Event> {
            Some(Event::element_added(
                "things",
                &element.uid,
                serde_json::json!(element.value),
            ))
        }

        fn removed_event(&self, element: &Thing) -> Option<Event> {
            Some(Event::element_removed(
                "things",
                &element.uid,
                serde_json::json!(element.value),
            ))
        }
    }

    #[derive(Default)]
    struct CollectingPublisher {
        topics: Mutex<Vec<String>>,
    }

    impl EventPublisher for CollectingPublisher {
        fn publish(&self, event: Event) -> Result<(), RegistryError> {
            self.topics.lock().unwrap().push(event.topic);
            Ok(())
        }
    }

    struct BrokenPublisher;

    impl EventPublisher for BrokenPublisher {
        fn publish(&self, _event: Event) -> Result<(), RegistryError> {
            Err(RegistryError::Storage(Box::new(std::io::Error::other(
                "bus down",
            ))))
        }
    }

    fn values(registry: &ProviderRegistry<Thing, impl RegistryHooks<Thing> + 'static>) -> Vec<u32> {
        let mut values: Vec<u32> = registry.get_all().iter().map(|t| t.value).collect();
        values.sort_unstable();
        values
    }

    fn recorded(
        registry: &ProviderRegistry<Thing, impl RegistryHooks<Thing> + 'static>,
    ) -> Arc<Recorder> {
        let recorder = Arc::new(Recorder::default());
        registry.add_registry_change_listener(recorder.clone());
        recorder
    }

    fn managed(service: &VolatileStorageService) -> Arc<dyn ManagedProvider<Thing>> {
        let mapper = IdentityMapper::<Thing>::new("things");
        Arc::new(StorageManagedProvider::new(service, mapper).unwrap())
    }

    #[test]
    fn should_start_empty() {
        let registry = ProviderRegistry::<Thing>::new("thing", NoHooks);
        assert!(registry.get_all().is_empty());
        assert!(registry.is_empty());
    }

    #[test]
    fn should_expose_elements_of_added_provider() {
        let registry = ProviderRegistry::<Thing, _>::new("thing", NoHooks);
        let recorder = recorded(&registry);

        registry.add_provider(TestProvider::with(&[thing("x", 1), thing("y", 2)]));

        assert_eq!(values(&registry), vec![1, 2]);
        assert_eq!(registry.get(&"x".to_string()), Some(thing("x", 1)));
        let mut events = recorder.events();
        events.sort();
        assert_eq!(events, vec!["added x", "added y"]);
    }

    #[test]
    fn should_ignore_provider_added_twice() {
        let registry = ProviderRegistry::<Thing, _>::new("thing", NoHooks);
        let recorder = recorded(&registry);
        let provider = TestProvider::with(&[thing("x", 1)]);

        registry.add_provider(provider.clone());
        registry.add_provider(provider.clone());

        assert_eq!(values(&registry), vec![1]);
        assert_eq!(recorder.events(), vec!["added x"]);
        assert_eq!(provider.listeners.len(), 1);
    }

    #[test]
    fn should_skip_rejected_elements_and_admit_the_rest() {
        let registry = ProviderRegistry::<Thing, _>::new("thing", RejectZero);
        let recorder = recorded(&registry);

        registry.add_provider(TestProvider::with(&[
            thing("a", 1),
            thing("bad", 0),
            thing("c", 3),
        ]));

        assert_eq!(values(&registry), vec![1, 3]);
        assert!(!registry.contains_key(&"bad".to_string()));
        assert!(!recorder.events().contains(&"added bad".to_string()));
    }

    #[test]
    fn should_remove_only_elements_of_removed_provider() {
        let registry = ProviderRegistry::<Thing, _>::new("thing", NoHooks);
        let p = TestProvider::with(&[thing("shared", 1), thing("p_only", 2)]);
        let q = TestProvider::with(&[thing("shared", 10)]);
        registry.add_provider(p.clone());
        registry.add_provider(q.clone());
        assert_eq!(values(&registry), vec![1, 2, 10]);

        let recorder = recorded(&registry);
        registry.remove_provider(p.as_ref());

        assert_eq!(registry.get_all(), vec![thing("shared", 10)]);
        assert!(p.listeners.is_empty());
        let mut events = recorder.events();
        events.sort();
        assert_eq!(events, vec!["removed p_only", "removed shared"]);
    }

    #[test]
    fn should_ignore_removal_of_untracked_provider() {
        let registry = ProviderRegistry::<Thing, _>::new("thing", NoHooks);
        let recorder = recorded(&registry);
        let provider = TestProvider::with(&[thing("x", 1)]);

        registry.remove_provider(provider.as_ref());

        assert!(recorder.events().is_empty());
    }

    #[test]
    fn should_reject_colliding_key_when_policy_rejects() {
        let registry = ProviderRegistry::<Thing, _>::with_config(
            "thing",
            NoHooks,
            RegistryConfig {
                duplicate_keys: DuplicateKeyPolicy::Reject,
            },
        );
        let p = TestProvider::with(&[thing("shared", 1)]);
        let q = TestProvider::with(&[thing("shared", 10), thing("q_only", 11)]);

        registry.add_provider(p.clone());
        registry.add_provider(q);
        assert_eq!(values(&registry), vec![1, 11]);

        registry.remove_provider(p.as_ref());
        assert_eq!(values(&registry), vec![11]);
    }

    #[test]
    fn should_follow_provider_events() {
        let registry = ProviderRegistry::<Thing, _>::new("thing", NoHooks);
        let provider = TestProvider::with(&[thing("x", 1)]);
        registry.add_provider(provider.clone());
        let recorder = recorded(&registry);

        provider.push(thing("y", 2));
        provider.replace(thing("x", 5));
        provider.take("y");

        assert_eq!(registry.get_all(), vec![thing("x", 5)]);
        assert_eq!(
            recorder.events(),
            vec!["added y", "updated x 1->5", "removed y"]
        );
    }

    #[test]
    fn should_keep_old_element_when_update_is_rejected() {
        let registry = ProviderRegistry::<Thing, _>::new("thing", RejectZero);
        let provider = TestProvider::with(&[thing("x", 1)]);
        registry.add_provider(provider.clone());
        let recorder = recorded(&registry);

        provider.replace(thing("x", 0));

        assert_eq!(registry.get(&"x".to_string()), Some(thing("x", 1)));
        assert!(recorder.events().is_empty());
    }

    #[test]
    fn should_ignore_events_from_untracked_provider() {
        let registry = ProviderRegistry::<Thing, _>::new("thing", NoHooks);
        let stray = TestProvider::with(&[]);
        let recorder = recorded(&registry);

        registry.added(stray.as_ref(), &thing("x", 1));
        registry.updated(stray.as_ref(), &thing("x", 1), &thing("x", 2));
        registry.removed(stray.as_ref(), &thing("x", 1));

        assert!(registry.get_all().is_empty());
        assert!(recorder.events().is_empty());
    }

    #[test]
    fn should_stop_following_provider_after_removal() {
        let registry = ProviderRegistry::<Thing, _>::new("thing", NoHooks);
        let provider = TestProvider::with(&[]);
        registry.add_provider(provider.clone());
        registry.remove_provider(provider.as_ref());

        provider.push(thing("late", 1));

        assert!(registry.get_all().is_empty());
    }

    #[test]
    fn should_fail_writes_without_managed_provider() {
        let registry = ProviderRegistry::<Thing, _>::new("thing", NoHooks);

        assert!(matches!(
            registry.add(thing("z", 1)),
            Err(RegistryError::IllegalState(
                IllegalStateError::NoManagedProvider { registry: "thing" }
            ))
        ));
        assert!(matches!(
            registry.update(thing("z", 1)),
            Err(RegistryError::IllegalState(_))
        ));
        assert!(matches!(
            registry.remove(&"z".to_string()),
            Err(RegistryError::IllegalState(_))
        ));
    }

    #[test]
    fn should_route_writes_through_managed_provider() {
        let service = VolatileStorageService::new();
        let registry = ProviderRegistry::<Thing, _>::new("thing", NoHooks);
        let provider_a = TestProvider::with(&[thing("x", 1), thing("y", 2)]);
        registry.add_provider(provider_a.clone());
        assert_eq!(values(&registry), vec![1, 2]);

        let managed = managed(&service);
        registry.set_managed_provider(Arc::clone(&managed));
        registry.add(thing("z", 26)).unwrap();

        assert_eq!(values(&registry), vec![1, 2, 26]);
        assert_eq!(managed.get(&"z".to_string()).unwrap(), Some(thing("z", 26)));

        registry.remove_provider(provider_a.as_ref());
        assert_eq!(registry.get_all(), vec![thing("z", 26)]);

        registry.remove(&"z".to_string()).unwrap();
        assert!(registry.get_all().is_empty());
    }

    #[test]
    fn should_update_through_managed_provider() {
        let service = VolatileStorageService::new();
        let registry = ProviderRegistry::<Thing, _>::new("thing", NoHooks);
        registry.set_managed_provider(managed(&service));
        let recorder = recorded(&registry);

        assert_eq!(registry.update(thing("z", 1)).unwrap(), None);
        assert!(registry.get_all().is_empty());

        registry.add(thing("z", 1)).unwrap();
        assert_eq!(registry.update(thing("z", 2)).unwrap(), Some(thing("z", 1)));

        assert_eq!(registry.get_all(), vec![thing("z", 2)]);
        assert_eq!(recorder.events(), vec!["added z", "updated z 1->2"]);
    }

    #[test]
    fn should_report_nothing_when_removing_absent_key() {
        let service = VolatileStorageService::new();
        let registry = ProviderRegistry::<Thing, _>::new("thing", NoHooks);
        registry.set_managed_provider(managed(&service));
        let recorder = recorded(&registry);

        assert_eq!(registry.remove(&"ghost".to_string()).unwrap(), None);
        assert!(recorder.events().is_empty());
    }

    #[test]
    fn should_replace_previous_managed_provider() {
        let first_service = VolatileStorageService::new();
        let second_service = VolatileStorageService::new();
        let registry = ProviderRegistry::<Thing, _>::new("thing", NoHooks);

        let first = managed(&first_service);
        registry.set_managed_provider(Arc::clone(&first));
        registry.add(thing("old", 1)).unwrap();

        let second = managed(&second_service);
        registry.set_managed_provider(Arc::clone(&second));
        registry.add(thing("new", 2)).unwrap();

        assert_eq!(registry.get_all(), vec![thing("new", 2)]);
        assert_eq!(first.get(&"new".to_string()).unwrap(), None);
        assert!(Arc::ptr_eq(&registry.managed_provider().unwrap(), &second));

        registry.remove_managed_provider(&first);
        assert!(registry.managed_provider().is_some());
        registry.remove_managed_provider(&second);
        assert!(registry.managed_provider().is_none());
        assert!(registry.get_all().is_empty());
    }

    #[test]
    fn should_report_provider_of_element() {
        let service = VolatileStorageService::new();
        let registry = ProviderRegistry::<Thing, _>::new("thing", NoHooks);
        let provider = TestProvider::with(&[thing("x", 1)]);
        registry.add_provider(provider.clone());
        let managed = managed(&service);
        registry.set_managed_provider(Arc::clone(&managed));
        registry.add(thing("z", 2)).unwrap();

        let owner = registry.get_provider(&"x".to_string()).unwrap();
        let expected: Arc<dyn Provider<Thing>> = provider;
        assert!(Arc::ptr_eq(&owner, &expected));

        let owner = registry.get_provider(&"z".to_string()).unwrap();
        let expected: Arc<dyn Provider<Thing>> = managed;
        assert!(Arc::ptr_eq(&owner, &expected));

        assert!(registry.get_provider(&"nope".to_string()).is_none());
    }

    #[test]
    fn should_skip_elements_whose_hooks_panic() {
        struct Buggy;

        impl RegistryHooks<Thing> for Buggy {
            fn on_add_element(&self, element: &Thing) -> Result<(), RegistryError> {
                if element.value == 2 {
                    panic!("add hook bug");
                }
                Ok(())
            }

            fn on_remove_element(&self, element: &Thing) -> Result<(), RegistryError> {
                if element.value == 3 {
                    panic!("remove hook bug");
                }
                Ok(())
            }
        }

        let registry = ProviderRegistry::<Thing, _>::new("thing", Buggy);
        let recorder = recorded(&registry);
        let provider = TestProvider::with(&[thing("a", 1), thing("b", 2), thing("c", 3)]);

        registry.add_provider(provider.clone());
        assert_eq!(values(&registry), vec![1, 3]);

        registry.remove_provider(provider.as_ref());
        assert!(registry.is_empty());
        assert!(provider.listeners.is_empty());
        assert_eq!(
            recorder.events(),
            vec!["added a", "added c", "removed a"]
        );
    }

    #[test]
    fn should_notify_remaining_listeners_when_one_panics() {
        let registry = ProviderRegistry::<Thing, _>::new("thing", NoHooks);
        let first = Arc::new(Recorder::default());
        let third = Arc::new(Recorder::default());
        registry.add_registry_change_listener(first.clone());
        registry.add_registry_change_listener(Arc::new(Panicking));
        registry.add_registry_change_listener(third.clone());
        let provider = TestProvider::with(&[]);
        registry.add_provider(provider.clone());

        provider.push(thing("a", 1));
        provider.push(thing("b", 2));

        assert_eq!(first.events(), vec!["added a", "added b"]);
        assert_eq!(third.events(), vec!["added a", "added b"]);
        assert_eq!(values(&registry), vec![1, 2]);
    }

    #[test]
    fn should_register_listener_once() {
        let registry = ProviderRegistry::<Thing, _>::new("thing", NoHooks);
        let recorder = Arc::new(Recorder::default());
        let listener: Arc<dyn RegistryChangeListener<Thing>> = recorder.clone();
        registry.add_registry_change_listener(Arc::clone(&listener));
        registry.add_registry_change_listener(Arc::clone(&listener));

        registry.add_provider(TestProvider::with(&[thing("x", 1)]));
        assert_eq!(recorder.events(), vec!["added x"]);

        registry.remove_registry_change_listener(&listener);
        registry.add_provider(TestProvider::with(&[thing("y", 2)]));
        assert_eq!(recorder.events(), vec!["added x"]);
    }

    #[test]
    fn should_allow_listeners_to_read_the_registry() {
        struct Reentrant {
            registry: ProviderRegistry<Thing>,
            seen: Mutex<Vec<usize>>,
        }

        impl RegistryChangeListener<Thing> for Reentrant {
            fn added(&self, _element: &Thing) {
                self.seen.lock().unwrap().push(self.registry.get_all().len());
            }

            fn removed(&self, _element: &Thing) {
                self.seen.lock().unwrap().push(self.registry.get_all().len());
            }

            fn updated(&self, _old_element: &Thing, _element: &Thing) {}
        }

        let registry = ProviderRegistry::<Thing, _>::new("thing", NoHooks);
        let listener = Arc::new(Reentrant {
            registry: registry.clone(),
            seen: Mutex::new(Vec::new()),
        });
        registry.add_registry_change_listener(listener.clone());
        let provider = TestProvider::with(&[]);
        registry.add_provider(provider.clone());

        provider.push(thing("a", 1));
        provider.push(thing("b", 2));
        registry.remove_provider(provider.as_ref());

        assert_eq!(*listener.seen.lock().unwrap(), vec![1, 2, 2, 2]);
        assert!(registry.is_empty());
    }

    #[test]
    fn should_publish_events_through_hooks() {
        let registry = ProviderRegistry::<Thing, _>::new("thing", RejectZero);
        let publisher = Arc::new(CollectingPublisher::default());
        registry.set_event_publisher(publisher.clone());
        let provider = TestProvider::with(&[thing("x", 1)]);

        registry.add_provider(provider.clone());
        provider.push(thing("rejected", 0));
        provider.take("x");

        assert_eq!(
            *publisher.topics.lock().unwrap(),
            vec!["homereg/things/x/added", "homereg/things/x/removed"]
        );

        registry.unset_event_publisher();
        provider.push(thing("y", 2));
        assert_eq!(publisher.topics.lock().unwrap().len(), 2);
    }

    #[test]
    fn should_keep_changes_when_publishing_fails() {
        let registry = ProviderRegistry::<Thing, _>::new("thing", RejectZero);
        registry.set_event_publisher(Arc::new(BrokenPublisher));
        let recorder = recorded(&registry);

        registry.add_provider(TestProvider::with(&[thing("x", 1)]));

        assert_eq!(values(&registry), vec![1]);
        assert_eq!(recorder.events(), vec!["added x"]);
    }

    #[test]
    fn should_track_discovered_providers_only_while_active() {
        let directory = Arc::new(ProviderDirectory::<Thing>::new());
        let registry = ProviderRegistry::<Thing, _>::new("thing", NoHooks);
        registry.set_discovery(directory.clone());

        let early: Arc<dyn Provider<Thing>> = TestProvider::with(&[thing("early", 1)]);
        directory.register(Arc::clone(&early));
        assert!(registry.get_all().is_empty());

        registry.activate();
        assert!(registry.is_active());
        assert_eq!(values(&registry), vec![1]);

        let late: Arc<dyn Provider<Thing>> = TestProvider::with(&[thing("late", 2)]);
        directory.register(Arc::clone(&late));
        assert_eq!(values(&registry), vec![1, 2]);

        directory.unregister(&early);
        assert_eq!(values(&registry), vec![2]);

        registry.deactivate();
        directory.register(TestProvider::with(&[thing("ignored", 3)]));
        directory.unregister(&late);
        assert_eq!(values(&registry), vec![2]);
    }

    #[test]
    fn should_ignore_discovery_callbacks_when_inactive() {
        let registry = ProviderRegistry::<Thing, _>::new("thing", NoHooks);
        registry.adding_provider(TestProvider::with(&[thing("x", 1)]));
        assert!(registry.get_all().is_empty());
    }

    #[test]
    fn should_drop_providers_that_vanished_while_inactive() {
        let directory = Arc::new(ProviderDirectory::<Thing>::new());
        let registry = ProviderRegistry::<Thing, _>::new("thing", NoHooks);
        registry.set_discovery(directory.clone());
        registry.activate();

        let gone: Arc<dyn Provider<Thing>> = TestProvider::with(&[thing("gone", 1)]);
        let kept: Arc<dyn Provider<Thing>> = TestProvider::with(&[thing("kept", 2)]);
        directory.register(Arc::clone(&gone));
        directory.register(Arc::clone(&kept));
        let service = VolatileStorageService::new();
        registry.set_managed_provider(managed(&service));
        registry.add(thing("z", 3)).unwrap();

        registry.deactivate();
        directory.unregister(&gone);
        assert_eq!(values(&registry), vec![1, 2, 3]);

        let recorder = recorded(&registry);
        registry.activate();

        assert_eq!(values(&registry), vec![2, 3]);
        assert_eq!(recorder.events(), vec!["removed gone"]);
    }

    #[test]
    fn should_handle_concurrent_providers() {
        let registry = ProviderRegistry::<Thing, _>::new("thing", NoHooks);
        let handles: Vec<_> = (0..8u32)
            .map(|n| {
                let registry = registry.clone();
                std::thread::spawn(move || {
                    let provider = TestProvider::with(&[]);
                    registry.add_provider(provider.clone());
                    for i in 0..50 {
                        provider.push(thing(&format!("{n}-{i}"), n * 100 + i));
                    }
                    let _ = registry.get_all();
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(registry.len(), 400);
    }
}
