//! # homereg-domain
//!
//! Pure domain model for the homereg element registries.
//!
//! ## Responsibilities
//! - Foundational types: element identity, error conventions, event ids, timestamps
//! - Define **Items** (named, typed state holders contributed by bindings or users)
//! - Define **Metadata** (namespaced configuration attached to an item)
//! - Define **Events** (records of elements being added, removed or updated)
//! - Contain all invariant enforcement for these types
//!
//! ## Dependency rule
//! This crate has **no internal dependencies**.
//! It must never import anything from `app`, adapters, or external IO crates.
//! The registry engine and its ports live in the `app` crate.

pub mod error;
pub mod id;
pub mod identifiable;
pub mod time;

pub mod event;
pub mod item;
pub mod metadata;
