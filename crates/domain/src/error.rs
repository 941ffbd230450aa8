//! Common error types used across the workspace.
//!
//! Each failure family is its own typed error, folded into [`RegistryError`]
//! through `#[from]`. Adapters define their own errors and convert them into
//! [`RegistryError::Storage`].

/// Top-level error for registry, provider and storage operations.
#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    /// The caller passed an argument the operation cannot accept.
    #[error("illegal argument: {0}")]
    IllegalArgument(#[from] IllegalArgumentError),

    /// The operation cannot run in the current state of the registry.
    #[error("illegal state: {0}")]
    IllegalState(#[from] IllegalStateError),

    /// An element failed domain validation.
    #[error("validation error: {0}")]
    Validation(#[from] ValidationError),

    /// A looked-up element does not exist.
    #[error("{0}")]
    NotFound(#[from] NotFoundError),

    /// The backing store failed.
    #[error("storage error: {0}")]
    Storage(#[source] Box<dyn std::error::Error + Send + Sync>),
}

/// Rejected arguments of CRUD operations.
#[derive(Debug, thiserror::Error)]
pub enum IllegalArgumentError {
    /// Keys are stored by their string form, which must not be empty.
    #[error("key must not be empty")]
    EmptyKey,

    /// `add` was called for a key that is already stored.
    #[error("cannot add element, because an element with same key ({key}) already exists")]
    DuplicateKey { key: String },
}

/// Operations attempted while the registry or store is not ready for them.
#[derive(Debug, thiserror::Error)]
pub enum IllegalStateError {
    /// A write operation reached a registry without a managed provider.
    #[error("the {registry} registry has no managed provider")]
    NoManagedProvider { registry: &'static str },

    /// A storage name was opened with two different value types.
    #[error("storage '{name}' is already open with another value type")]
    StorageTypeMismatch { name: String },
}

/// Domain validation failures.
#[derive(Debug, thiserror::Error)]
pub enum ValidationError {
    #[error("name must not be empty")]
    EmptyName,

    #[error("'{0}' is not a valid item name")]
    InvalidItemName(String),

    #[error("metadata namespace must not be empty")]
    EmptyNamespace,

    /// Another provider already contributes an element with this key.
    #[error("an element with key '{key}' is already provided by another provider")]
    KeyCollision { key: String },
}

/// Lookup of an element that is not part of the registry.
#[derive(Debug, thiserror::Error)]
#[error("{entity} '{id}' not found")]
pub struct NotFoundError {
    pub entity: &'static str,
    pub id: String,
}
