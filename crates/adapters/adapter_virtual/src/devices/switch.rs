//! Virtual switch: responds to `turn_on`, `turn_off`, `toggle`.

use homereg_domain::item::{Item, ItemState, ItemType};

use super::DeviceState;

pub(crate) const ITEM_NAME: &str = "Virtual_Switch";

/// A simulated switch that can be turned on and off.
pub struct VirtualSwitch {
    pub(crate) state: DeviceState,
}

impl Default for VirtualSwitch {
    fn default() -> Self {
        Self {
            state: DeviceState::new(ItemState::Off),
        }
    }
}

impl VirtualSwitch {
    #[must_use]
    pub fn item(&self) -> Item {
        super::item(
            ITEM_NAME,
            ItemType::Switch,
            "Virtual Switch",
            &["Switchable"],
            self.state.get(),
        )
    }

    pub fn handle_command(&self, command: &str) -> (ItemState, ItemState) {
        self.state.switch(command)
    }
}
