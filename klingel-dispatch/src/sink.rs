//! Seams between the dispatcher and the outside world.

use std::fmt;

use klingel_discovery::{DeviceRegistry, TargetAddress};
use notify_client::{NotifyClient, NotifyError};

/// Provides the set of delivery targets known right now
pub trait AddressSource {
    fn current_addresses(&self) -> Vec<TargetAddress>;
}

impl AddressSource for DeviceRegistry {
    fn current_addresses(&self) -> Vec<TargetAddress> {
        DeviceRegistry::current_addresses(self)
    }
}

impl AddressSource for Vec<TargetAddress> {
    fn current_addresses(&self) -> Vec<TargetAddress> {
        self.clone()
    }
}

impl<T: AddressSource + ?Sized> AddressSource for &T {
    fn current_addresses(&self) -> Vec<TargetAddress> {
        (**self).current_addresses()
    }
}

/// Delivers a notification to one target
pub trait DeliverySink {
    type Error: fmt::Display;

    fn notify(&self, address: &TargetAddress) -> Result<(), Self::Error>;
}

impl DeliverySink for NotifyClient {
    type Error = NotifyError;

    fn notify(&self, address: &TargetAddress) -> Result<(), NotifyError> {
        self.play_notification(address.as_str())
    }
}

impl<T: DeliverySink + ?Sized> DeliverySink for &T {
    type Error = T::Error;

    fn notify(&self, address: &TargetAddress) -> Result<(), Self::Error> {
        (**self).notify(address)
    }
}
