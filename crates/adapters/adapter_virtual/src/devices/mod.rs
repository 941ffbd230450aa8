//! Virtual devices: light, sensor, switch.
//!
//! Each device contributes one item with a fixed name so it stays stable
//! across restarts.

mod light;
mod sensor;
mod switch;

pub use light::VirtualLight;
pub use sensor::VirtualSensor;
pub use switch::VirtualSwitch;

use std::collections::BTreeSet;
use std::sync::{Mutex, PoisonError};

use homereg_domain::item::{Item, ItemState, ItemType};

/// Wrapper enum for the concrete virtual device types.
pub enum VirtualDevice {
    Light(VirtualLight),
    Sensor(VirtualSensor),
    Switch(VirtualSwitch),
}

impl VirtualDevice {
    /// Name of the item this device contributes.
    #[must_use]
    pub fn item_name(&self) -> &'static str {
        match self {
            Self::Light(_) => light::ITEM_NAME,
            Self::Sensor(_) => sensor::ITEM_NAME,
            Self::Switch(_) => switch::ITEM_NAME,
        }
    }

    /// Snapshot of the item with the current state.
    #[must_use]
    pub fn item(&self) -> Item {
        match self {
            Self::Light(d) => d.item(),
            Self::Sensor(d) => d.item(),
            Self::Switch(d) => d.item(),
        }
    }

    /// Apply `command`, returning the state before and after.
    pub fn handle_command(&self, command: &str) -> (ItemState, ItemState) {
        match self {
            Self::Light(d) => d.handle_command(command),
            Self::Sensor(d) => d.handle_command(command),
            Self::Switch(d) => d.handle_command(command),
        }
    }

    /// Force the state, returning the previous one.
    pub fn set_state(&self, state: ItemState) -> ItemState {
        match self {
            Self::Light(d) => d.state.replace(state),
            Self::Sensor(d) => d.state.replace(state),
            Self::Switch(d) => d.state.replace(state),
        }
    }
}

/// State cell shared by the device types.
pub(crate) struct DeviceState(Mutex<ItemState>);

impl DeviceState {
    pub(crate) fn new(state: ItemState) -> Self {
        Self(Mutex::new(state))
    }

    pub(crate) fn get(&self) -> ItemState {
        self.0.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    pub(crate) fn replace(&self, state: ItemState) -> ItemState {
        let mut current = self.0.lock().unwrap_or_else(PoisonError::into_inner);
        std::mem::replace(&mut *current, state)
    }

    /// Apply an on/off command, returning the state before and after.
    pub(crate) fn switch(&self, command: &str) -> (ItemState, ItemState) {
        let mut current = self.0.lock().unwrap_or_else(PoisonError::into_inner);
        let before = current.clone();
        match command {
            "turn_on" => *current = ItemState::On,
            "turn_off" => *current = ItemState::Off,
            "toggle" => {
                *current = match *current {
                    ItemState::On => ItemState::Off,
                    _ => ItemState::On,
                };
            }
            _ => tracing::debug!(command, "ignoring unknown command"),
        }
        (before, current.clone())
    }
}

pub(crate) fn item(
    name: &str,
    item_type: ItemType,
    label: &str,
    tags: &[&str],
    state: ItemState,
) -> Item {
    Item {
        name: name.to_string(),
        item_type,
        label: Some(label.to_string()),
        category: None,
        tags: tags.iter().map(|tag| (*tag).to_string()).collect::<BTreeSet<_>>(),
        group_names: vec!["Virtual".to_string()],
        state,
    }
}
