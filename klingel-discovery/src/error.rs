//! Error types for the discovery system.

use thiserror::Error;

/// Error type for discovery operations.
///
/// Represents the failure modes of browsing the local network for speakers
/// and turning announcements into notification targets.
#[derive(Debug, Error)]
pub enum DiscoveryError {
    /// The mDNS daemon could not be started, browsed or stopped
    #[error("mDNS daemon error: {0}")]
    Daemon(String),

    /// A resolved record carried no IPv4 address
    #[error("Device '{0}' announced no IPv4 address")]
    NoIpv4Address(String),

    /// The background worker thread could not be spawned or joined
    #[error("Discovery worker error: {0}")]
    Worker(String),
}

/// Convenience Result type alias for discovery operations.
pub type Result<T> = std::result::Result<T, DiscoveryError>;
