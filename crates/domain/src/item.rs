//! Item: a named, typed state holder.
//!
//! Items are the main element type of the hub. Bindings contribute them
//! through providers, users create them at runtime through the managed
//! provider. The name is the registry key.

mod state;

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{RegistryError, ValidationError};
use crate::identifiable::Identifiable;

pub use state::ItemState;

/// Kind of value an item accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ItemType {
    Switch,
    Dimmer,
    Number,
    String,
    Contact,
    DateTime,
    Group,
}

impl fmt::Display for ItemType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// A named, typed state holder.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    pub name: String,
    pub item_type: ItemType,
    pub label: Option<String>,
    pub category: Option<String>,
    pub tags: BTreeSet<String>,
    pub group_names: Vec<String>,
    #[serde(skip)]
    pub state: ItemState,
}

impl Identifiable for Item {
    type Key = String;

    fn uid(&self) -> String {
        self.name.clone()
    }
}

/// Whether `name` only contains ASCII letters, digits and underscores.
#[must_use]
pub fn is_valid_item_name(name: &str) -> bool {
    !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_')
}

impl Item {
    /// Create a builder for constructing an [`Item`].
    #[must_use]
    pub fn builder() -> ItemBuilder {
        ItemBuilder::default()
    }

    /// Check domain invariants.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::Validation`] when the name is empty or
    /// contains characters other than letters, digits and `_`.
    pub fn validate(&self) -> Result<(), RegistryError> {
        if self.name.is_empty() {
            return Err(ValidationError::EmptyName.into());
        }
        if !is_valid_item_name(&self.name) {
            return Err(ValidationError::InvalidItemName(self.name.clone()).into());
        }
        Ok(())
    }

    /// Whether the item carries every tag of `tags`.
    #[must_use]
    pub fn has_tags<'a>(&self, tags: impl IntoIterator<Item = &'a str>) -> bool {
        tags.into_iter().all(|tag| self.tags.contains(tag))
    }
}

/// Step-by-step builder for [`Item`].
#[derive(Debug)]
pub struct ItemBuilder {
    name: Option<String>,
    item_type: ItemType,
    label: Option<String>,
    category: Option<String>,
    tags: BTreeSet<String>,
    group_names: Vec<String>,
    state: ItemState,
}

impl Default for ItemBuilder {
    fn default() -> Self {
        Self {
            name: None,
            item_type: ItemType::String,
            label: None,
            category: None,
            tags: BTreeSet::new(),
            group_names: Vec::new(),
            state: ItemState::Null,
        }
    }
}

impl ItemBuilder {
    #[must_use]
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    #[must_use]
    pub fn item_type(mut self, item_type: ItemType) -> Self {
        self.item_type = item_type;
        self
    }

    #[must_use]
    pub fn label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    #[must_use]
    pub fn category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    #[must_use]
    pub fn tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.insert(tag.into());
        self
    }

    #[must_use]
    pub fn group(mut self, group_name: impl Into<String>) -> Self {
        self.group_names.push(group_name.into());
        self
    }

    #[must_use]
    pub fn state(mut self, state: ItemState) -> Self {
        self.state = state;
        self
    }

    /// Consume the builder, validate, and return an [`Item`].
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::Validation`] if the name is missing or invalid.
    pub fn build(self) -> Result<Item, RegistryError> {
        let item = Item {
            name: self.name.unwrap_or_default(),
            item_type: self.item_type,
            label: self.label,
            category: self.category,
            tags: self.tags,
            group_names: self.group_names,
            state: self.state,
        };
        item.validate()?;
        Ok(item)
    }
}
