//! mDNS browsing and the background discovery worker.
//!
//! The worker:
//! 1. Starts an mDNS daemon and browses the speaker service type
//! 2. Translates resolved/removed records into [`DiscoveryEvent`]s
//! 3. Applies them to the [`DeviceRegistry`] through a [`DiscoveryListener`]

use std::thread::{self, JoinHandle};

use mdns_sd::{ServiceDaemon, ServiceEvent};

use crate::device::{instance_name, DeviceFilter, DiscoveredDevice};
use crate::error::{DiscoveryError, Result};
use crate::registry::{DeviceRegistry, Registration};

/// Discovery events after translation from raw mDNS records
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DiscoveryEvent {
    /// A speaker was resolved to an address
    Resolved(DiscoveredDevice),
    /// A speaker announced it is going away
    Removed { name: String },
}

/// Applies discovery events to a registry, honouring the exclusion filter
#[derive(Debug, Clone)]
pub struct DiscoveryListener {
    registry: DeviceRegistry,
    filter: DeviceFilter,
}

impl DiscoveryListener {
    pub fn new(registry: DeviceRegistry, filter: DeviceFilter) -> Self {
        Self { registry, filter }
    }

    /// Apply a single event to the registry
    pub fn handle(&self, event: DiscoveryEvent) {
        match event {
            DiscoveryEvent::Resolved(device) => {
                if self.filter.excludes(&device.name) {
                    tracing::info!("Skipping speaker {}", device.name);
                    return;
                }
                let name = device.name.clone();
                let address = device.address.clone();
                match self.registry.register(device) {
                    Registration::Added => {
                        tracing::info!("Found speaker: {} {}", name, address);
                    }
                    Registration::AlreadyKnown => {
                        tracing::debug!("Speaker {} at {} already registered", name, address);
                    }
                    Registration::Moved(previous) => {
                        tracing::info!("Speaker {} moved from {} to {}", name, previous, address);
                    }
                }
            }
            DiscoveryEvent::Removed { name } => match self.registry.remove(&name) {
                Some(address) => tracing::info!("Service {} removed ({})", name, address),
                None => tracing::debug!("Service {} removed (was not registered)", name),
            },
        }
    }

    pub fn registry(&self) -> &DeviceRegistry {
        &self.registry
    }
}

/// Translate a raw mDNS event into a discovery event.
///
/// Returns `None` for bookkeeping events and for records that cannot be used
/// as notification targets.
pub(crate) fn translate(event: ServiceEvent, service_type: &str) -> Option<DiscoveryEvent> {
    match event {
        ServiceEvent::ServiceResolved(info) => {
            match DiscoveredDevice::from_service_info(&info, service_type) {
                Ok(device) => Some(DiscoveryEvent::Resolved(device)),
                Err(e) => {
                    tracing::warn!("Ignoring announcement: {}", e);
                    None
                }
            }
        }
        ServiceEvent::ServiceRemoved(_, fullname) => Some(DiscoveryEvent::Removed {
            name: instance_name(&fullname, service_type),
        }),
        ServiceEvent::SearchStarted(_) => None,
        other => {
            tracing::trace!("Unhandled mDNS event: {:?}", other);
            None
        }
    }
}

/// Background worker that keeps a registry in sync with the network
///
/// # Examples
///
/// ```no_run
/// use klingel_discovery::{DeviceFilter, DeviceRegistry, DiscoveryListener, DiscoveryWorker};
///
/// let registry = DeviceRegistry::new();
/// let listener = DiscoveryListener::new(registry.clone(), DeviceFilter::allow_all());
/// let mut worker = DiscoveryWorker::spawn("_soundtouch._tcp.local.", listener)?;
///
/// // ... registry.current_addresses() is now populated in the background
///
/// worker.shutdown()?;
/// # Ok::<(), klingel_discovery::DiscoveryError>(())
/// ```
pub struct DiscoveryWorker {
    daemon: Option<ServiceDaemon>,
    service_type: String,
    handle: Option<JoinHandle<()>>,
}

impl DiscoveryWorker {
    /// Start browsing `service_type` and feed results to `listener`
    pub fn spawn(service_type: &str, listener: DiscoveryListener) -> Result<Self> {
        let daemon = ServiceDaemon::new()
            .map_err(|e| DiscoveryError::Daemon(format!("Failed to start mDNS daemon: {}", e)))?;
        let receiver = daemon
            .browse(service_type)
            .map_err(|e| DiscoveryError::Daemon(format!("Failed to browse {}: {}", service_type, e)))?;

        let thread_service_type = service_type.to_string();
        let handle = thread::Builder::new()
            .name("klingel-discovery".to_string())
            .spawn(move || {
                tracing::debug!("Discovery worker browsing {}", thread_service_type);
                while let Ok(event) = receiver.recv() {
                    if let Some(event) = translate(event, &thread_service_type) {
                        listener.handle(event);
                    }
                }
                tracing::debug!("Discovery worker stopped");
            })
            .map_err(|e| DiscoveryError::Worker(format!("Failed to spawn discovery thread: {}", e)))?;

        Ok(Self {
            daemon: Some(daemon),
            service_type: service_type.to_string(),
            handle: Some(handle),
        })
    }

    /// Service type being browsed
    pub fn service_type(&self) -> &str {
        &self.service_type
    }

    /// Stop browsing, shut the daemon down and wait for the worker thread
    ///
    /// Calling this more than once is a no-op.
    pub fn shutdown(&mut self) -> Result<()> {
        if let Some(daemon) = self.daemon.take() {
            if let Err(e) = daemon.stop_browse(&self.service_type) {
                tracing::debug!("stop_browse failed: {}", e);
            }
            daemon
                .shutdown()
                .map_err(|e| DiscoveryError::Daemon(format!("Failed to stop mDNS daemon: {}", e)))?;
        }

        if let Some(handle) = self.handle.take() {
            handle
                .join()
                .map_err(|_| DiscoveryError::Worker("Discovery thread panicked".to_string()))?;
        }

        Ok(())
    }
}

impl Drop for DiscoveryWorker {
    fn drop(&mut self) {
        if let Err(e) = self.shutdown() {
            tracing::warn!("Discovery worker did not shut down cleanly: {}", e);
        }
    }
}
