//! # homereg-adapter-storage-json
//!
//! JSON file persistence adapter.
//!
//! ## Responsibilities
//! - Implement the `Storage` and `StorageService` port traits defined in
//!   `homereg-app::ports::storage`
//! - Keep one `<name>.json` file per storage in a configured directory
//! - Replace files atomically so a crash never leaves a half-written store
//!
//! ## Dependency rule
//! Depends on `homereg-app` (for port traits) and `homereg-domain` (for errors).
//! The `app` and `domain` crates must never reference this adapter.

pub mod error;
pub mod service;
pub mod storage;

pub use error::JsonStorageError;
pub use service::{Config, JsonStorageService};
pub use storage::JsonStorage;
