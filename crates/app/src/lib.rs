//! # homereg-app
//!
//! Application layer: **port definitions** (traits) and the registry engine.
//!
//! ## Responsibilities
//! - Define the port traits providers and stores implement:
//!   - `Provider` / `ProviderChangeListener`: sources of elements and their
//!     change notifications
//!   - `ManagedProvider`: a writable provider
//!   - `Storage` / `StorageService`: named key-value stores
//!   - `EventPublisher`: sink for registry change events
//!   - `ProviderDiscovery` / `ProviderTracker`: dynamic provider arrival
//! - Provide the engine: [`registry::ProviderRegistry`] aggregates providers,
//!   [`managed_provider::StorageManagedProvider`] persists writes
//! - Provide **in-process infrastructure** that doesn't need IO (event bus,
//!   volatile storage, provider directory)
//! - Host the concrete item and metadata registries
//!
//! ## Dependency rule
//! Depends on `homereg-domain` only (plus `tokio::sync` for channels).
//! Never imports adapter crates. Adapters depend on *this* crate, not the reverse.

pub mod discovery;
pub mod event_bus;
pub mod listeners;
pub mod managed_provider;
pub mod ports;
pub mod registry;
pub mod services;
pub mod storage;
