//! Error types for the notification client

use thiserror::Error;

/// Errors that can occur while triggering a speaker notification
#[derive(Debug, Error)]
pub enum NotifyError {
    /// Connection, DNS or timeout failure before a response arrived
    #[error("Network error while notifying {address}: {message}")]
    Network { address: String, message: String },

    /// The speaker answered with a non-success status
    #[error("Speaker {address} answered with HTTP {status}")]
    Status { address: String, status: u16 },

    /// The address could not be turned into a request URL
    #[error("Invalid speaker address: {0}")]
    InvalidAddress(String),
}

impl NotifyError {
    /// Address of the speaker the failed request targeted
    pub fn address(&self) -> &str {
        match self {
            NotifyError::Network { address, .. } => address,
            NotifyError::Status { address, .. } => address,
            NotifyError::InvalidAddress(address) => address,
        }
    }
}
