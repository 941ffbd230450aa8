//! Concrete registries built on [`crate::registry::ProviderRegistry`].
//!
//! Each registry supplies its own hooks (validation, events) and domain
//! queries on top of the generic engine.

pub mod item_registry;
pub mod metadata_registry;
