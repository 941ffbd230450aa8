//! Port definitions: traits that adapters and element sources implement.
//!
//! Ports are the boundaries between the registry engine and the outside
//! world. They are defined here (in `app`) so that both the engine and the
//! adapters can depend on them without creating circular dependencies.

pub mod discovery;
pub mod event_bus;
pub mod provider;
pub mod storage;

pub use discovery::{ProviderDiscovery, ProviderTracker};
pub use event_bus::EventPublisher;
pub use provider::{ManagedProvider, Provider, ProviderChangeListener, ProviderId};
pub use storage::{Storage, StorageService};
