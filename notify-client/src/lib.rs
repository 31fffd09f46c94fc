//! Minimal HTTP client for speaker notifications
//!
//! Speakers discovered on the local network expose a bare
//! `GET /playNotification` endpoint which plays the built-in chime sound.
//! This crate wraps that single call with sane timeouts and typed errors.

mod error;

pub use error::NotifyError;

use std::time::Duration;

/// Path of the notification endpoint on every speaker
pub const NOTIFICATION_PATH: &str = "playNotification";

/// A minimal client for triggering speaker notifications
#[derive(Debug, Clone)]
pub struct NotifyClient {
    agent: ureq::Agent,
}

impl NotifyClient {
    /// Create a new client with default timeouts (5s connect, 10s read)
    pub fn new() -> Self {
        Self::with_timeouts(Duration::from_secs(5), Duration::from_secs(10))
    }

    /// Create a client with custom connect and read timeouts
    pub fn with_timeouts(connect: Duration, read: Duration) -> Self {
        Self {
            agent: ureq::AgentBuilder::new()
                .timeout_connect(connect)
                .timeout_read(read)
                .build(),
        }
    }

    /// Ask the speaker at `address` (`host:port`) to play its notification sound
    ///
    /// The response body is drained and discarded; only the status matters.
    pub fn play_notification(&self, address: &str) -> Result<(), NotifyError> {
        let url = notification_url(address)?;

        match self.agent.get(&url).call() {
            Ok(response) => {
                // Drain the body so the connection can go back to the pool
                let _ = response.into_string();
                Ok(())
            }
            Err(ureq::Error::Status(status, _)) => Err(NotifyError::Status {
                address: address.to_string(),
                status,
            }),
            Err(e) => Err(NotifyError::Network {
                address: address.to_string(),
                message: e.to_string(),
            }),
        }
    }
}

impl Default for NotifyClient {
    fn default() -> Self {
        Self::new()
    }
}

/// Build the notification URL for a `host:port` address
fn notification_url(address: &str) -> Result<String, NotifyError> {
    let address = address.trim();
    if address.is_empty() || address.contains('/') || address.contains(char::is_whitespace) {
        return Err(NotifyError::InvalidAddress(address.to_string()));
    }
    Ok(format!("http://{}/{}", address, NOTIFICATION_PATH))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_notification_url() {
        assert_eq!(
            notification_url("10.0.0.5:8090").unwrap(),
            "http://10.0.0.5:8090/playNotification"
        );
        assert_eq!(
            notification_url(" 192.168.1.20:8090 ").unwrap(),
            "http://192.168.1.20:8090/playNotification"
        );
    }

    #[test]
    fn test_notification_url_rejects_garbage() {
        for bad in ["", "   ", "10.0.0.5:8090/other", "10.0.0.5 :8090"] {
            match notification_url(bad) {
                Err(NotifyError::InvalidAddress(_)) => {}
                other => panic!("Expected InvalidAddress for {:?}, got {:?}", bad, other),
            }
        }
    }

    #[test]
    fn test_client_creation() {
        let _client = NotifyClient::new();
        let _default_client = NotifyClient::default();
        let _custom = NotifyClient::with_timeouts(Duration::from_millis(100), Duration::from_millis(100));
    }

    #[test]
    fn test_error_exposes_address() {
        let err = NotifyError::Status {
            address: "10.0.0.5:8090".to_string(),
            status: 500,
        };
        assert_eq!(err.address(), "10.0.0.5:8090");
        assert!(err.to_string().contains("HTTP 500"));
    }
}
