//! # homereg-adapter-virtual
//!
//! Virtual/demo provider contributing simulated items for testing and
//! demonstration purposes.
//!
//! ## Provided items
//!
//! | Device | Item | Behaviour |
//! |--------|------|-----------|
//! | Virtual Light | `Virtual_Light` | Responds to `turn_on` / `turn_off` / `toggle` |
//! | Virtual Sensor | `Virtual_Temperature` | Holds a numeric temperature reading |
//! | Virtual Switch | `Virtual_Switch` | Responds to `turn_on` / `turn_off` / `toggle` |
//!
//! Devices can be detached and re-attached at runtime, which removes and
//! re-adds their item, the way real hardware comes and goes.
//!
//! ## Dependency rule
//!
//! Depends on `homereg-app` (port traits) and `homereg-domain` only.

mod devices;

use std::collections::BTreeSet;
use std::sync::{Arc, Mutex, PoisonError};

use homereg_app::listeners::ProviderListeners;
use homereg_app::ports::{Provider, ProviderChangeListener};
use homereg_domain::error::{NotFoundError, RegistryError};
use homereg_domain::item::{Item, ItemState};

use devices::{VirtualDevice, VirtualLight, VirtualSensor, VirtualSwitch};

/// Provider of the virtual items.
pub struct VirtualItemProvider {
    devices: Vec<VirtualDevice>,
    detached: Mutex<BTreeSet<&'static str>>,
    listeners: ProviderListeners<Item>,
}

impl Default for VirtualItemProvider {
    fn default() -> Self {
        Self {
            devices: vec![
                VirtualDevice::Light(VirtualLight::default()),
                VirtualDevice::Sensor(VirtualSensor::default()),
                VirtualDevice::Switch(VirtualSwitch::default()),
            ],
            detached: Mutex::new(BTreeSet::new()),
            listeners: ProviderListeners::default(),
        }
    }
}

impl VirtualItemProvider {
    /// Integration name used in logs and configuration.
    #[must_use]
    pub fn name(&self) -> &'static str {
        "virtual"
    }

    fn device(&self, item_name: &str) -> Result<&VirtualDevice, RegistryError> {
        self.devices
            .iter()
            .find(|device| device.item_name() == item_name)
            .ok_or_else(|| {
                NotFoundError {
                    entity: "Item",
                    id: item_name.to_string(),
                }
                .into()
            })
    }

    fn is_attached(&self, device: &VirtualDevice) -> bool {
        !self
            .detached
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(device.item_name())
    }

    /// Names of all items this provider can contribute.
    #[must_use]
    pub fn item_names(&self) -> Vec<&'static str> {
        self.devices.iter().map(VirtualDevice::item_name).collect()
    }

    /// Make the item of a detached device available again.
    ///
    /// Returns `false` if it was already attached.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::NotFound`] for unknown item names.
    pub fn attach(&self, item_name: &str) -> Result<bool, RegistryError> {
        let device = self.device(item_name)?;
        let attached = self
            .detached
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(device.item_name());
        if attached {
            tracing::info!(item = item_name, "attached virtual device");
            self.listeners.notify_added(self, &device.item());
        }
        Ok(attached)
    }

    /// Withdraw the item of a device, as if it was unplugged.
    ///
    /// Returns `false` if it was already detached.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::NotFound`] for unknown item names.
    pub fn detach(&self, item_name: &str) -> Result<bool, RegistryError> {
        let device = self.device(item_name)?;
        let detached = self
            .detached
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(device.item_name());
        if detached {
            tracing::info!(item = item_name, "detached virtual device");
            self.listeners.notify_removed(self, &device.item());
        }
        Ok(detached)
    }

    /// Send `command` to a device and return its item afterwards.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::NotFound`] for unknown item names.
    pub fn handle_command(&self, item_name: &str, command: &str) -> Result<Item, RegistryError> {
        let device = self.device(item_name)?;
        let (before, after) = device.handle_command(command);
        Ok(self.state_changed(device, before, after))
    }

    /// Force the state of a device and return its item afterwards.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::NotFound`] for unknown item names.
    pub fn set_state(&self, item_name: &str, state: ItemState) -> Result<Item, RegistryError> {
        let device = self.device(item_name)?;
        let before = device.set_state(state.clone());
        Ok(self.state_changed(device, before, state))
    }

    fn state_changed(&self, device: &VirtualDevice, before: ItemState, after: ItemState) -> Item {
        let item = device.item();
        if before != after && self.is_attached(device) {
            tracing::debug!(item = %item.name, %before, %after, "virtual state changed");
            let old = Item {
                state: before,
                ..item.clone()
            };
            self.listeners.notify_updated(self, &old, &item);
        }
        item
    }
}

impl Provider<Item> for VirtualItemProvider {
    fn get_all(&self) -> Vec<Item> {
        self.devices
            .iter()
            .filter(|device| self.is_attached(device))
            .map(VirtualDevice::item)
            .collect()
    }

    fn add_provider_change_listener(&self, listener: Arc<dyn ProviderChangeListener<Item>>) {
        self.listeners.add(listener);
    }

    fn remove_provider_change_listener(&self, listener: &Arc<dyn ProviderChangeListener<Item>>) {
        self.listeners.remove(listener);
    }
}
