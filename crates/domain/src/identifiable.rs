//! Element identity.

use std::fmt;
use std::hash::Hash;

/// An element that can be tracked by a registry.
///
/// The key must be stable for the lifetime of the element and unique within
/// the scope of one registry. Its [`Display`](fmt::Display) form is used in
/// log lines and event topics.
pub trait Identifiable {
    type Key: Clone + Eq + Hash + fmt::Display + fmt::Debug + Send + Sync + 'static;

    /// The unique key of this element.
    fn uid(&self) -> Self::Key;
}
