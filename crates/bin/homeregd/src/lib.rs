//! # homeregd: the homereg daemon
//!
//! Composition root that wires storage, registries and providers together.
//!
//! ## Responsibilities
//! - Load configuration (config file, env vars)
//! - Open the JSON storage directory
//! - Construct the item and metadata registries with their managed providers
//! - Make discovered providers (the virtual integration) available to them
//! - Publish registry changes on the in-process event bus
//!
//! ## Dependency rule
//! This is the **only** crate that depends on all other crates.
//! It is the wiring layer; no domain logic belongs here.

pub mod config;
pub mod hub;
