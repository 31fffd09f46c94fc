//! Live registry of notification targets
//!
//! The registry is written by the discovery worker and read by whoever needs
//! the current set of speakers. Handles are cheap to clone and all share the
//! same underlying list.

use std::sync::Arc;

use parking_lot::RwLock;

use crate::device::{DiscoveredDevice, TargetAddress};

/// Result of applying a discovered device to the registry
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Registration {
    /// A new target was appended
    Added,
    /// The address is already registered
    AlreadyKnown,
    /// A known device moved to a new address; holds the previous one
    Moved(TargetAddress),
}

/// Thread-safe, insertion-ordered set of known speakers
///
/// Addresses are unique. Devices are also tracked by name so that a removal
/// announcement, which carries only the name, can drop the right address.
#[derive(Debug, Clone, Default)]
pub struct DeviceRegistry {
    devices: Arc<RwLock<Vec<DiscoveredDevice>>>,
}

impl DeviceRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or update a device
    ///
    /// A known name announcing a new address moves to it. Any other device
    /// still holding that address is dropped, its entry is stale.
    pub fn register(&self, device: DiscoveredDevice) -> Registration {
        let mut devices = self.devices.write();

        if let Some(index) = devices.iter().position(|d| d.name == device.name) {
            if devices[index].address == device.address {
                return Registration::AlreadyKnown;
            }
            let previous = std::mem::replace(&mut devices[index].address, device.address.clone());
            devices.retain(|d| d.name == device.name || d.address != device.address);
            return Registration::Moved(previous);
        }

        if devices.iter().any(|d| d.address == device.address) {
            return Registration::AlreadyKnown;
        }

        devices.push(device);
        Registration::Added
    }

    /// Remove a device by name, returning its address if it was registered
    pub fn remove(&self, name: &str) -> Option<TargetAddress> {
        let mut devices = self.devices.write();
        let index = devices.iter().position(|d| d.name == name)?;
        Some(devices.remove(index).address)
    }

    /// Snapshot of the current target addresses, in registration order
    pub fn current_addresses(&self) -> Vec<TargetAddress> {
        self.devices.read().iter().map(|d| d.address.clone()).collect()
    }

    /// Snapshot of the registered devices
    pub fn devices(&self) -> Vec<DiscoveredDevice> {
        self.devices.read().clone()
    }

    pub fn len(&self) -> usize {
        self.devices.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.devices.read().is_empty()
    }
}
