//! Speaker discovery for klingel
//!
//! This crate keeps a live list of notification-capable speakers on the local
//! network. Speakers announce themselves over mDNS; a background
//! [`DiscoveryWorker`] applies every announcement to a shared
//! [`DeviceRegistry`], skipping devices matched by a [`DeviceFilter`].
//!
//! # Quick Start
//!
//! ```no_run
//! use klingel_discovery::{DeviceFilter, DeviceRegistry, DiscoveryListener, DiscoveryWorker};
//!
//! let registry = DeviceRegistry::new();
//! let listener = DiscoveryListener::new(registry.clone(), DeviceFilter::new(["Bathroom"]));
//! let _worker = DiscoveryWorker::spawn(klingel_discovery::DEFAULT_SERVICE_TYPE, listener)?;
//!
//! for address in registry.current_addresses() {
//!     println!("Target: {}", address);
//! }
//! # Ok::<(), klingel_discovery::DiscoveryError>(())
//! ```

mod error;
pub mod device;
mod discovery;
mod registry;

pub use device::{DeviceFilter, DiscoveredDevice, TargetAddress};
pub use discovery::{DiscoveryEvent, DiscoveryListener, DiscoveryWorker};
pub use error::{DiscoveryError, Result};
pub use registry::{DeviceRegistry, Registration};

/// Service type advertised by the supported speakers
pub const DEFAULT_SERVICE_TYPE: &str = "_soundtouch._tcp.local.";
