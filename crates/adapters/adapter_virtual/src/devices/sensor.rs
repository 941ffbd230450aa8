//! Virtual temperature sensor: holds a numeric reading.

use homereg_domain::item::{Item, ItemState, ItemType};

use super::DeviceState;

pub(crate) const ITEM_NAME: &str = "Virtual_Temperature";

const INITIAL_READING: f64 = 21.5;

/// A simulated temperature sensor.
///
/// Sensors ignore commands; their reading only changes through
/// `set_state`.
pub struct VirtualSensor {
    pub(crate) state: DeviceState,
}

impl Default for VirtualSensor {
    fn default() -> Self {
        Self {
            state: DeviceState::new(ItemState::Decimal(INITIAL_READING)),
        }
    }
}

impl VirtualSensor {
    #[must_use]
    pub fn item(&self) -> Item {
        super::item(
            ITEM_NAME,
            ItemType::Number,
            "Virtual Temperature",
            &["Measurement", "Temperature"],
            self.state.get(),
        )
    }

    pub fn handle_command(&self, command: &str) -> (ItemState, ItemState) {
        tracing::debug!(command, "sensors are read-only");
        let current = self.state.get();
        (current.clone(), current)
    }
}
