//! Item state: the current runtime value held by an item.

use serde::{Deserialize, Serialize};

/// Runtime value of an item.
///
/// State is never persisted: an item restored from storage starts as
/// [`Null`](Self::Null) until a binding or user sets it.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "lowercase")]
pub enum ItemState {
    /// Not initialised yet.
    #[default]
    Null,
    /// Initialised, but the value is currently unknown.
    Undef,
    On,
    Off,
    Open,
    Closed,
    Decimal(f64),
    Text(String),
}

impl ItemState {
    /// Whether the item carries an actual value.
    #[must_use]
    pub fn is_defined(&self) -> bool {
        !matches!(self, Self::Null | Self::Undef)
    }
}

impl std::fmt::Display for ItemState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Null => f.write_str("NULL"),
            Self::Undef => f.write_str("UNDEF"),
            Self::On => f.write_str("ON"),
            Self::Off => f.write_str("OFF"),
            Self::Open => f.write_str("OPEN"),
            Self::Closed => f.write_str("CLOSED"),
            Self::Decimal(value) => write!(f, "{value}"),
            Self::Text(value) => f.write_str(value),
        }
    }
}
