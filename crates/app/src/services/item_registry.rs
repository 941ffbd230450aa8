//! Item registry: the aggregated view of every item in the system.

use std::collections::BTreeSet;
use std::ops::Deref;

use serde::{Deserialize, Serialize};

use homereg_domain::error::{NotFoundError, RegistryError};
use homereg_domain::event::Event;
use homereg_domain::item::{Item, ItemState, ItemType};

use crate::managed_provider::{PersistenceMapper, StorageManagedProvider};
use crate::ports::StorageService;
use crate::registry::{ProviderRegistry, RegistryConfig, RegistryHooks};

/// Storage name of user-managed items.
pub const ITEM_STORAGE_NAME: &str = "homereg.items";

const EVENT_KIND: &str = "items";

/// Validation and events for items.
#[derive(Debug, Clone, Copy, Default)]
pub struct ItemHooks;

impl RegistryHooks<Item> for ItemHooks {
    fn on_add_element(&self, element: &Item) -> Result<(), RegistryError> {
        element.validate()
    }

    fn on_update_element(&self, _old_element: &Item, element: &Item) -> Result<(), RegistryError> {
        element.validate()
    }

    fn added_event(&self, element: &Item) -> Option<Event> {
        Some(Event::element_added(
            EVENT_KIND,
            &element.name,
            to_payload(element),
        ))
    }

    fn removed_event(&self, element: &Item) -> Option<Event> {
        Some(Event::element_removed(
            EVENT_KIND,
            &element.name,
            to_payload(element),
        ))
    }

    fn updated_event(&self, old_element: &Item, element: &Item) -> Option<Event> {
        Some(Event::element_updated(
            EVENT_KIND,
            &element.name,
            to_payload(old_element),
            to_payload(element),
        ))
    }
}

fn to_payload(item: &Item) -> serde_json::Value {
    serde_json::to_value(item).unwrap_or_else(|err| {
        tracing::warn!(%err, item = %item.name, "failed to serialize item");
        serde_json::Value::Null
    })
}

/// Registry of [`Item`]s, keyed by item name.
///
/// Derefs to the underlying [`ProviderRegistry`] for provider tracking,
/// writes and listeners.
#[derive(Clone)]
pub struct ItemRegistry {
    registry: ProviderRegistry<Item, ItemHooks>,
}

impl Default for ItemRegistry {
    fn default() -> Self {
        Self::new(RegistryConfig::default())
    }
}

impl Deref for ItemRegistry {
    type Target = ProviderRegistry<Item, ItemHooks>;

    fn deref(&self) -> &Self::Target {
        &self.registry
    }
}

impl ItemRegistry {
    #[must_use]
    pub fn new(config: RegistryConfig) -> Self {
        Self {
            registry: ProviderRegistry::with_config("item", ItemHooks, config),
        }
    }

    /// Look up an item by name.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::NotFound`] when no provider supplies `name`.
    pub fn get_item(&self, name: &str) -> Result<Item, RegistryError> {
        self.registry.get(&name.to_string()).ok_or_else(|| {
            NotFoundError {
                entity: "Item",
                id: name.to_string(),
            }
            .into()
        })
    }

    /// Items of the given type.
    #[must_use]
    pub fn get_items_of_type(&self, item_type: ItemType) -> Vec<Item> {
        self.registry
            .get_all()
            .into_iter()
            .filter(|item| item.item_type == item_type)
            .collect()
    }

    /// Items carrying every tag in `tags`.
    #[must_use]
    pub fn get_items_by_tag(&self, tags: &[&str]) -> Vec<Item> {
        self.registry
            .get_all()
            .into_iter()
            .filter(|item| item.has_tags(tags.iter().copied()))
            .collect()
    }

    /// Items whose name matches `pattern`, where `*` matches any run of
    /// characters and `?` exactly one.
    #[must_use]
    pub fn get_items(&self, pattern: &str) -> Vec<Item> {
        self.registry
            .get_all()
            .into_iter()
            .filter(|item| matches_pattern(pattern, &item.name))
            .collect()
    }
}

fn matches_pattern(pattern: &str, name: &str) -> bool {
    let pattern: Vec<char> = pattern.chars().collect();
    let name: Vec<char> = name.chars().collect();
    let (mut p, mut n) = (0, 0);
    let mut backtrack: Option<(usize, usize)> = None;

    while n < name.len() {
        match pattern.get(p) {
            Some('*') => {
                backtrack = Some((p, n));
                p += 1;
            }
            Some(&c) if c == '?' || c == name[n] => {
                p += 1;
                n += 1;
            }
            _ => match backtrack {
                Some((star, matched)) => {
                    p = star + 1;
                    n = matched + 1;
                    backtrack = Some((star, matched + 1));
                }
                None => return false,
            },
        }
    }
    pattern[p..].iter().all(|&c| c == '*')
}

/// Stored shape of an item. The name is the storage key; the state is not
/// persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersistedItem {
    pub item_type: ItemType,
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub tags: BTreeSet<String>,
    #[serde(default)]
    pub group_names: Vec<String>,
}

/// Maps items to [`PersistedItem`]s under [`ITEM_STORAGE_NAME`].
#[derive(Debug, Clone, Copy, Default)]
pub struct ItemMapper;

impl PersistenceMapper<Item> for ItemMapper {
    type Persisted = PersistedItem;

    fn storage_name(&self) -> &str {
        ITEM_STORAGE_NAME
    }

    fn to_element(&self, key: &str, persisted: PersistedItem) -> Result<Item, RegistryError> {
        Ok(Item {
            name: key.to_string(),
            item_type: persisted.item_type,
            label: persisted.label,
            category: persisted.category,
            tags: persisted.tags,
            group_names: persisted.group_names,
            state: ItemState::Null,
        })
    }

    fn to_persistable(&self, element: &Item) -> PersistedItem {
        PersistedItem {
            item_type: element.item_type,
            label: element.label.clone(),
            category: element.category.clone(),
            tags: element.tags.clone(),
            group_names: element.group_names.clone(),
        }
    }
}

/// Storage-backed provider of user-managed items.
pub type ManagedItemProvider = StorageManagedProvider<Item, ItemMapper>;

/// Open the managed item provider on `storage_service`.
///
/// # Errors
///
/// Returns the error of [`StorageService::get_storage`].
pub fn managed_item_provider(
    storage_service: &impl StorageService,
) -> Result<ManagedItemProvider, RegistryError> {
    StorageManagedProvider::new(storage_service, ItemMapper)
}
