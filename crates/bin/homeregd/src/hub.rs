//! Wiring of the running hub.

use std::sync::Arc;

use homereg_adapter_storage_json::{Config as StorageConfig, JsonStorageError};
use homereg_adapter_virtual::VirtualItemProvider;
use homereg_app::discovery::ProviderDirectory;
use homereg_app::event_bus::InProcessEventBus;
use homereg_app::ports::{ManagedProvider, ProviderChangeListener};
use homereg_app::services::item_registry::{ItemRegistry, managed_item_provider};
use homereg_app::services::metadata_registry::{
    ItemMetadataCleanup, MetadataRegistry, managed_metadata_provider,
};
use homereg_domain::error::RegistryError;
use homereg_domain::item::Item;
use homereg_domain::metadata::Metadata;

use crate::config::Config;

/// Errors while assembling the hub.
#[derive(Debug, thiserror::Error)]
pub enum HubError {
    #[error("failed to open storage")]
    Storage(#[from] JsonStorageError),

    #[error("failed to set up registries")]
    Registry(#[from] RegistryError),
}

/// Registries, providers and the event bus of one running hub.
pub struct Hub {
    items: ItemRegistry,
    metadata: MetadataRegistry,
    item_providers: Arc<ProviderDirectory<Item>>,
    event_bus: Arc<InProcessEventBus>,
    virtual_provider: Option<Arc<VirtualItemProvider>>,
    managed_items: Arc<dyn ManagedProvider<Item>>,
    metadata_cleanup: Arc<dyn ProviderChangeListener<Item>>,
}

impl Hub {
    /// Open storage and assemble the registries described by `config`.
    ///
    /// # Errors
    ///
    /// Returns [`HubError`] if the storage directory or one of its files
    /// cannot be opened.
    pub fn build(config: &Config) -> Result<Self, HubError> {
        let storage = StorageConfig {
            dir: config.storage.dir.clone(),
        }
        .build()?;
        tracing::info!(dir = %storage.dir().display(), "opened storage");

        let event_bus = Arc::new(InProcessEventBus::new(config.event_bus.capacity));

        let metadata = MetadataRegistry::new(config.registry.clone());
        metadata.set_event_publisher(event_bus.clone());
        let metadata_provider: Arc<dyn ManagedProvider<Metadata>> =
            Arc::new(managed_metadata_provider(&storage)?);
        metadata.set_managed_provider(Arc::clone(&metadata_provider));

        // Only deleting a managed item drops its metadata.
        let managed_items: Arc<dyn ManagedProvider<Item>> =
            Arc::new(managed_item_provider(&storage)?);
        let metadata_cleanup: Arc<dyn ProviderChangeListener<Item>> =
            Arc::new(ItemMetadataCleanup::new(metadata_provider));
        managed_items.add_provider_change_listener(Arc::clone(&metadata_cleanup));

        let items = ItemRegistry::new(config.registry.clone());
        items.set_event_publisher(event_bus.clone());
        items.set_managed_provider(Arc::clone(&managed_items));

        let item_providers: Arc<ProviderDirectory<Item>> = Arc::new(ProviderDirectory::new());
        items.set_discovery(item_providers.clone());
        items.activate();
        metadata.activate();

        let virtual_provider = if config.integrations.virtual_enabled {
            let provider = Arc::new(VirtualItemProvider::default());
            item_providers.register(provider.clone());
            tracing::info!(integration = provider.name(), "registered provider");
            Some(provider)
        } else {
            None
        };

        tracing::info!(
            items = items.len(),
            metadata = metadata.len(),
            "registries ready"
        );

        Ok(Self {
            items,
            metadata,
            item_providers,
            event_bus,
            virtual_provider,
            managed_items,
            metadata_cleanup,
        })
    }

    #[must_use]
    pub fn items(&self) -> &ItemRegistry {
        &self.items
    }

    #[must_use]
    pub fn metadata(&self) -> &MetadataRegistry {
        &self.metadata
    }

    /// Directory item providers register into.
    #[must_use]
    pub fn item_providers(&self) -> &Arc<ProviderDirectory<Item>> {
        &self.item_providers
    }

    #[must_use]
    pub fn event_bus(&self) -> &Arc<InProcessEventBus> {
        &self.event_bus
    }

    #[must_use]
    pub fn virtual_provider(&self) -> Option<&Arc<VirtualItemProvider>> {
        self.virtual_provider.as_ref()
    }

    /// Stop discovery and event publishing.
    pub fn shutdown(&self) {
        self.items.deactivate();
        self.metadata.deactivate();
        self.managed_items
            .remove_provider_change_listener(&self.metadata_cleanup);
        self.items.unset_event_publisher();
        self.metadata.unset_event_publisher();
        tracing::info!("hub stopped");
    }
}
