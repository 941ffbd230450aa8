//! Timestamps carried by registry events.

use chrono::{DateTime, Utc};

/// UTC instant at which an event was created.
pub type Timestamp = DateTime<Utc>;

/// Return the current UTC time.
#[must_use]
pub fn now() -> Timestamp {
    Utc::now()
}
