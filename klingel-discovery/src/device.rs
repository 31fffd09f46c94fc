//! Discovered device records and name-based filtering.
//!
//! This module turns resolved mDNS records into [`DiscoveredDevice`] values
//! and decides which of them may become notification targets.

use std::fmt;
use std::net::Ipv4Addr;

use mdns_sd::ServiceInfo;

use crate::error::{DiscoveryError, Result};

/// Network location of a notification-capable speaker, in `host:port` form.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TargetAddress(String);

impl TargetAddress {
    /// Wrap an already formatted `host:port` string
    pub fn new(address: impl Into<String>) -> Self {
        Self(address.into())
    }

    /// Build an address from an IPv4 address and a port
    pub fn from_parts(ip: Ipv4Addr, port: u16) -> Self {
        let [a, b, c, d] = ip.octets();
        Self(format!("{}.{}.{}.{}:{}", a, b, c, d, port))
    }

    /// The `host:port` string
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TargetAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TargetAddress {
    fn from(address: &str) -> Self {
        Self::new(address)
    }
}

impl From<String> for TargetAddress {
    fn from(address: String) -> Self {
        Self(address)
    }
}

/// A speaker announced on the local network.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveredDevice {
    /// Instance name of the service, e.g. "Kitchen"
    pub name: String,
    /// Address the notification endpoint listens on
    pub address: TargetAddress,
}

impl DiscoveredDevice {
    /// Create a device record from its parts
    pub fn new(name: impl Into<String>, address: TargetAddress) -> Self {
        Self {
            name: name.into(),
            address,
        }
    }

    /// Convert a resolved mDNS record into a device.
    ///
    /// The lowest IPv4 address is used so repeated announcements of a
    /// multi-homed device always map to the same target.
    ///
    /// # Errors
    ///
    /// Returns `DiscoveryError::NoIpv4Address` if the record only carries IPv6
    /// addresses.
    pub fn from_service_info(info: &ServiceInfo, service_type: &str) -> Result<Self> {
        let name = instance_name(info.get_fullname(), service_type);
        let ip = info
            .get_addresses_v4()
            .into_iter()
            .min()
            .copied()
            .ok_or_else(|| DiscoveryError::NoIpv4Address(name.clone()))?;

        Ok(Self {
            name,
            address: TargetAddress::from_parts(ip, info.get_port()),
        })
    }
}

/// Strip the service type suffix from an mDNS full name.
///
/// `"Kitchen._soundtouch._tcp.local."` becomes `"Kitchen"`. Names that do not
/// end in the service type are returned unchanged.
pub fn instance_name(fullname: &str, service_type: &str) -> String {
    fullname
        .strip_suffix(service_type)
        .map(|s| s.trim_end_matches('.'))
        .filter(|s| !s.is_empty())
        .unwrap_or(fullname)
        .to_string()
}

/// Exclusion filter applied before a device is registered.
///
/// A device whose name contains any of the configured patterns is skipped.
/// Empty patterns are ignored.
#[derive(Debug, Clone, Default)]
pub struct DeviceFilter {
    patterns: Vec<String>,
}

impl DeviceFilter {
    /// Create a filter from substring patterns
    pub fn new<I, S>(patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            patterns: patterns
                .into_iter()
                .map(Into::into)
                .filter(|p: &String| !p.is_empty())
                .collect(),
        }
    }

    /// A filter that lets every device through
    pub fn allow_all() -> Self {
        Self::default()
    }

    /// Whether the device with this name must be skipped
    pub fn excludes(&self, name: &str) -> bool {
        self.patterns.iter().any(|pattern| name.contains(pattern.as_str()))
    }

    /// Configured patterns
    pub fn patterns(&self) -> &[String] {
        &self.patterns
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    const SERVICE: &str = "_soundtouch._tcp.local.";

    #[test]
    fn test_target_address_from_parts() {
        let address = TargetAddress::from_parts(Ipv4Addr::new(10, 0, 0, 5), 8090);
        assert_eq!(address.as_str(), "10.0.0.5:8090");
        assert_eq!(address.to_string(), "10.0.0.5:8090");
    }

    #[test]
    fn test_instance_name() {
        assert_eq!(instance_name("Kitchen._soundtouch._tcp.local.", SERVICE), "Kitchen");
        assert_eq!(
            instance_name("Living Room Speaker._soundtouch._tcp.local.", SERVICE),
            "Living Room Speaker"
        );
        assert_eq!(instance_name("weird-name", SERVICE), "weird-name");
        assert_eq!(instance_name(SERVICE, SERVICE), SERVICE);
    }

    #[test]
    fn test_from_service_info() {
        let info = ServiceInfo::new(
            SERVICE,
            "Kitchen",
            "kitchen.local.",
            "192.168.1.40",
            8090,
            None::<HashMap<String, String>>,
        )
        .unwrap();

        let device = DiscoveredDevice::from_service_info(&info, SERVICE).unwrap();
        assert_eq!(device.name, "Kitchen");
        assert_eq!(device.address.as_str(), "192.168.1.40:8090");
    }

    #[test]
    fn test_from_service_info_picks_lowest_ipv4() {
        let info = ServiceInfo::new(
            SERVICE,
            "Office",
            "office.local.",
            "192.168.1.77,10.0.0.9",
            8090,
            None::<HashMap<String, String>>,
        )
        .unwrap();

        let device = DiscoveredDevice::from_service_info(&info, SERVICE).unwrap();
        assert_eq!(device.address.as_str(), "10.0.0.9:8090");
    }

    #[test]
    fn test_from_service_info_without_ipv4() {
        let info = ServiceInfo::new(
            SERVICE,
            "Attic",
            "attic.local.",
            "fe80::1",
            8090,
            None::<HashMap<String, String>>,
        )
        .unwrap();

        match DiscoveredDevice::from_service_info(&info, SERVICE) {
            Err(DiscoveryError::NoIpv4Address(name)) => assert_eq!(name, "Attic"),
            other => panic!("Expected NoIpv4Address, got {:?}", other),
        }
    }

    #[test]
    fn test_filter_excludes_on_substring() {
        let filter = DeviceFilter::new(["Bath", "Garage"]);
        assert!(filter.excludes("Bathroom"));
        assert!(filter.excludes("Upstairs Bath"));
        assert!(filter.excludes("Garage"));
        assert!(!filter.excludes("Kitchen"));
        assert!(!filter.excludes("bathroom"));
    }

    #[test]
    fn test_filter_ignores_empty_patterns() {
        let filter = DeviceFilter::new(["", "Bath"]);
        assert_eq!(filter.patterns(), &["Bath".to_string()]);
        assert!(!filter.excludes("Kitchen"));
    }

    #[test]
    fn test_allow_all() {
        let filter = DeviceFilter::allow_all();
        assert!(!filter.excludes("anything"));
        assert!(!filter.excludes(""));
    }
}
