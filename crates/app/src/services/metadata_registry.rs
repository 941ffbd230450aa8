//! Metadata registry: per-item, per-namespace annotations.

use std::ops::Deref;
use std::sync::Arc;

use homereg_domain::error::RegistryError;
use homereg_domain::event::Event;
use homereg_domain::item::Item;
use homereg_domain::metadata::{INTERNAL_NAMESPACE_PREFIX, Metadata};

use crate::managed_provider::{IdentityMapper, StorageManagedProvider};
use crate::ports::{ManagedProvider, Provider, ProviderChangeListener, StorageService};
use crate::registry::{ProviderRegistry, RegistryConfig, RegistryHooks};

/// Storage name of user-managed metadata.
pub const METADATA_STORAGE_NAME: &str = "homereg.metadata";

const EVENT_KIND: &str = "metadata";

/// Validation and events for metadata.
#[derive(Debug, Clone, Copy, Default)]
pub struct MetadataHooks;

impl RegistryHooks<Metadata> for MetadataHooks {
    fn on_add_element(&self, element: &Metadata) -> Result<(), RegistryError> {
        element.validate()
    }

    fn on_update_element(
        &self,
        _old_element: &Metadata,
        element: &Metadata,
    ) -> Result<(), RegistryError> {
        element.validate()
    }

    fn added_event(&self, element: &Metadata) -> Option<Event> {
        Some(Event::element_added(
            EVENT_KIND,
            &element.uid,
            to_payload(element),
        ))
    }

    fn removed_event(&self, element: &Metadata) -> Option<Event> {
        Some(Event::element_removed(
            EVENT_KIND,
            &element.uid,
            to_payload(element),
        ))
    }

    fn updated_event(&self, old_element: &Metadata, element: &Metadata) -> Option<Event> {
        Some(Event::element_updated(
            EVENT_KIND,
            &element.uid,
            to_payload(old_element),
            to_payload(element),
        ))
    }
}

fn to_payload(metadata: &Metadata) -> serde_json::Value {
    serde_json::to_value(metadata).unwrap_or_else(|err| {
        tracing::warn!(%err, key = %metadata.uid, "failed to serialize metadata");
        serde_json::Value::Null
    })
}

/// Registry of [`Metadata`], keyed by `namespace:item`.
#[derive(Clone)]
pub struct MetadataRegistry {
    registry: ProviderRegistry<Metadata, MetadataHooks>,
}

impl Default for MetadataRegistry {
    fn default() -> Self {
        Self::new(RegistryConfig::default())
    }
}

impl Deref for MetadataRegistry {
    type Target = ProviderRegistry<Metadata, MetadataHooks>;

    fn deref(&self) -> &Self::Target {
        &self.registry
    }
}

impl MetadataRegistry {
    #[must_use]
    pub fn new(config: RegistryConfig) -> Self {
        Self {
            registry: ProviderRegistry::with_config("metadata", MetadataHooks, config),
        }
    }

    /// Whether `namespace` is reserved for internal use.
    #[must_use]
    pub fn is_internal_namespace(namespace: &str) -> bool {
        namespace.starts_with(INTERNAL_NAMESPACE_PREFIX)
    }

    /// Every metadata entry attached to `item_name`, across namespaces.
    #[must_use]
    pub fn get_for_item(&self, item_name: &str) -> Vec<Metadata> {
        self.registry
            .get_all()
            .into_iter()
            .filter(|metadata| metadata.uid.item_name == item_name)
            .collect()
    }
}

/// Storage-backed provider of user-managed metadata.
pub type ManagedMetadataProvider = StorageManagedProvider<Metadata, IdentityMapper<Metadata>>;

/// Open the managed metadata provider on `storage_service`.
///
/// # Errors
///
/// Returns the error of [`StorageService::get_storage`].
pub fn managed_metadata_provider(
    storage_service: &impl StorageService,
) -> Result<ManagedMetadataProvider, RegistryError> {
    StorageManagedProvider::new(storage_service, IdentityMapper::new(METADATA_STORAGE_NAME))
}

/// Bulk removal of the metadata of one item.
pub trait ItemMetadataRemoval {
    /// Remove every entry of `item_name` and return what was removed.
    ///
    /// # Errors
    ///
    /// Returns the first error of the underlying provider; entries removed
    /// before it stay removed.
    fn remove_item_metadata(&self, item_name: &str) -> Result<Vec<Metadata>, RegistryError>;
}

impl<P> ItemMetadataRemoval for P
where
    P: ManagedProvider<Metadata> + ?Sized,
{
    fn remove_item_metadata(&self, item_name: &str) -> Result<Vec<Metadata>, RegistryError> {
        let mut removed = Vec::new();
        for metadata in self.get_all() {
            if metadata.uid.item_name != item_name {
                continue;
            }
            if let Some(metadata) = self.remove(&metadata.uid)? {
                removed.push(metadata);
            }
        }
        tracing::debug!(item = item_name, count = removed.len(), "removed item metadata");
        Ok(removed)
    }
}

/// Drops the managed metadata of items deleted from the managed item
/// provider.
///
/// Subscribe it to that provider, not to the item registry: items that
/// leave the registry because their provider went away keep their metadata.
pub struct ItemMetadataCleanup {
    provider: Arc<dyn ManagedProvider<Metadata>>,
}

impl ItemMetadataCleanup {
    #[must_use]
    pub fn new(provider: Arc<dyn ManagedProvider<Metadata>>) -> Self {
        Self { provider }
    }
}

impl ProviderChangeListener<Item> for ItemMetadataCleanup {
    fn added(&self, _provider: &dyn Provider<Item>, _element: &Item) {}

    fn removed(&self, _provider: &dyn Provider<Item>, element: &Item) {
        if let Err(err) = self.provider.remove_item_metadata(&element.name) {
            tracing::warn!(%err, item = %element.name, "failed to remove item metadata");
        }
    }

    fn updated(&self, _provider: &dyn Provider<Item>, _old_element: &Item, _element: &Item) {}
}
