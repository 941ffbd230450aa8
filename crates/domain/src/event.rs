//! Event: an immutable record of a registry change.
//!
//! Registries publish one event whenever an element enters, leaves or is
//! replaced in their aggregated view. Topics follow
//! `homereg/<kind>/<key>/<added|removed|updated>`.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::id::EventId;
use crate::time::{Timestamp, now};

/// Root segment of every event topic.
pub const TOPIC_PREFIX: &str = "homereg";

/// What happened to the element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    Added,
    Removed,
    Updated,
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Added => f.write_str("added"),
            Self::Removed => f.write_str("removed"),
            Self::Updated => f.write_str("updated"),
        }
    }
}

/// A published registry change.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    pub id: EventId,
    pub event_type: EventType,
    pub topic: String,
    /// Serialized element; for updates `{"old": …, "new": …}`.
    pub payload: serde_json::Value,
    pub timestamp: Timestamp,
}

impl Event {
    /// Build an event with a fresh id and the current time.
    #[must_use]
    pub fn new(
        event_type: EventType,
        topic: impl Into<String>,
        payload: serde_json::Value,
    ) -> Self {
        Self {
            id: EventId::new(),
            event_type,
            topic: topic.into(),
            payload,
            timestamp: now(),
        }
    }

    /// An element of `kind` with `key` entered the registry.
    #[must_use]
    pub fn element_added(kind: &str, key: &impl fmt::Display, element: serde_json::Value) -> Self {
        Self::new(EventType::Added, topic(kind, key, EventType::Added), element)
    }

    /// An element of `kind` with `key` left the registry.
    #[must_use]
    pub fn element_removed(
        kind: &str,
        key: &impl fmt::Display,
        element: serde_json::Value,
    ) -> Self {
        Self::new(
            EventType::Removed,
            topic(kind, key, EventType::Removed),
            element,
        )
    }

    /// An element of `kind` with `key` was replaced.
    #[must_use]
    pub fn element_updated(
        kind: &str,
        key: &impl fmt::Display,
        old: serde_json::Value,
        new: serde_json::Value,
    ) -> Self {
        Self::new(
            EventType::Updated,
            topic(kind, key, EventType::Updated),
            serde_json::json!({ "old": old, "new": new }),
        )
    }
}

fn topic(kind: &str, key: &impl fmt::Display, event_type: EventType) -> String {
    format!("{TOPIC_PREFIX}/{kind}/{key}/{event_type}")
}
