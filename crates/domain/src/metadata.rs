//! Metadata: namespaced configuration attached to an item.
//!
//! One item can carry metadata in many namespaces (`homekit`, `alexa`,
//! `stateDescription`, …); the pair `(namespace, item_name)` is the key.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{RegistryError, ValidationError};
use crate::identifiable::Identifiable;

/// Namespaces starting with this prefix are reserved for the hub itself.
pub const INTERNAL_NAMESPACE_PREFIX: char = '_';

/// Composite key of a [`Metadata`] element.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct MetadataKey {
    pub namespace: String,
    pub item_name: String,
}

impl MetadataKey {
    #[must_use]
    pub fn new(namespace: impl Into<String>, item_name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            item_name: item_name.into(),
        }
    }

    /// Whether the namespace is reserved for internal use.
    #[must_use]
    pub fn is_internal(&self) -> bool {
        self.namespace.starts_with(INTERNAL_NAMESPACE_PREFIX)
    }
}

impl fmt::Display for MetadataKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.namespace, self.item_name)
    }
}

/// Failure to parse a `namespace:item` string.
#[derive(Debug, thiserror::Error)]
#[error("'{0}' is not a valid metadata key, expected 'namespace:item'")]
pub struct ParseMetadataKeyError(String);

impl FromStr for MetadataKey {
    type Err = ParseMetadataKeyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.split_once(':') {
            Some((namespace, item_name)) if !namespace.is_empty() && !item_name.is_empty() => {
                Ok(Self::new(namespace, item_name))
            }
            _ => Err(ParseMetadataKeyError(s.to_string())),
        }
    }
}

/// A value plus free-form configuration in one namespace of one item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Metadata {
    pub uid: MetadataKey,
    pub value: String,
    #[serde(default)]
    pub configuration: BTreeMap<String, serde_json::Value>,
}

impl Identifiable for Metadata {
    type Key = MetadataKey;

    fn uid(&self) -> MetadataKey {
        self.uid.clone()
    }
}

impl Metadata {
    #[must_use]
    pub fn new(uid: MetadataKey, value: impl Into<String>) -> Self {
        Self {
            uid,
            value: value.into(),
            configuration: BTreeMap::new(),
        }
    }

    /// Attach one configuration entry.
    #[must_use]
    pub fn with_config(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.configuration.insert(key.into(), value);
        self
    }

    /// Check domain invariants.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::Validation`] when the namespace or the item
    /// name is empty.
    pub fn validate(&self) -> Result<(), RegistryError> {
        if self.uid.namespace.is_empty() {
            return Err(ValidationError::EmptyNamespace.into());
        }
        if self.uid.item_name.is_empty() {
            return Err(ValidationError::EmptyName.into());
        }
        Ok(())
    }
}
