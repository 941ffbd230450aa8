//! Virtual light: responds to `turn_on`, `turn_off`, `toggle`.

use homereg_domain::item::{Item, ItemState, ItemType};

use super::DeviceState;

pub(crate) const ITEM_NAME: &str = "Virtual_Light";

/// A simulated light that can be turned on and off.
pub struct VirtualLight {
    pub(crate) state: DeviceState,
}

impl Default for VirtualLight {
    fn default() -> Self {
        Self {
            state: DeviceState::new(ItemState::Off),
        }
    }
}

impl VirtualLight {
    #[must_use]
    pub fn item(&self) -> Item {
        super::item(
            ITEM_NAME,
            ItemType::Switch,
            "Virtual Light",
            &["Lighting"],
            self.state.get(),
        )
    }

    pub fn handle_command(&self, command: &str) -> (ItemState, ItemState) {
        self.state.switch(command)
    }
}
