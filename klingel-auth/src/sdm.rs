//! Smart Device Management API access check.
//!
//! At startup the daemon lists the devices visible to the configured SDM
//! project. This validates the credentials end to end and shows which
//! doorbells will publish events.

use std::time::Duration;

use reqwest::StatusCode;
use serde::Deserialize;

use crate::error::{AuthError, Result};
use crate::guard::CredentialGuard;

/// Base URL of the Smart Device Management API
pub const SDM_API_URL: &str = "https://smartdevicemanagement.googleapis.com";

const DEVICE_TYPE_PREFIX: &str = "sdm.devices.types.";

/// A device visible to the SDM project
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SdmDevice {
    /// Device id without the `enterprises/<project>/devices/` prefix
    pub id: String,
    /// Device type without the `sdm.devices.types.` prefix, e.g. "DOORBELL"
    pub device_type: String,
}

#[derive(Debug, Deserialize)]
struct ListDevicesResponse {
    #[serde(default)]
    devices: Vec<RawDevice>,
}

#[derive(Debug, Deserialize)]
struct RawDevice {
    name: String,
    #[serde(rename = "type", default)]
    device_type: String,
}

/// Client for the SDM device listing endpoint
#[derive(Debug, Clone)]
pub struct SdmClient {
    http: reqwest::blocking::Client,
    base_url: String,
    project_id: String,
}

impl SdmClient {
    /// Create a client for the given SDM project (device-access client id)
    pub fn new(project_id: impl Into<String>) -> Result<Self> {
        Self::with_base_url(project_id, SDM_API_URL)
    }

    /// Create a client against a custom base URL
    pub fn with_base_url(project_id: impl Into<String>, base_url: impl Into<String>) -> Result<Self> {
        let http = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| AuthError::Network(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            http,
            base_url: base_url.into(),
            project_id: project_id.into(),
        })
    }

    /// List the project's devices using the given bearer token
    pub fn list_devices(&self, token: &str) -> Result<Vec<SdmDevice>> {
        let url = self.devices_url()?;

        let response = self
            .http
            .get(url)
            .bearer_auth(token)
            .send()
            .map_err(|e| AuthError::Network(format!("Failed to fetch devices: {}", e)))?;

        match response.status() {
            status if status.is_success() => {}
            StatusCode::UNAUTHORIZED => {
                return Err(AuthError::Unauthorized("device listing returned 401".to_string()));
            }
            status => {
                let body = response.text().unwrap_or_default();
                return Err(AuthError::InvalidResponse(format!(
                    "device listing returned HTTP {}: {}",
                    status.as_u16(),
                    body
                )));
            }
        }

        let listing: ListDevicesResponse = response
            .json()
            .map_err(|e| AuthError::InvalidResponse(format!("Invalid device listing: {}", e)))?;

        let prefix = format!("enterprises/{}/devices/", self.project_id);
        Ok(listing
            .devices
            .into_iter()
            .map(|device| SdmDevice {
                id: device
                    .name
                    .strip_prefix(&prefix)
                    .unwrap_or(&device.name)
                    .to_string(),
                device_type: device
                    .device_type
                    .strip_prefix(DEVICE_TYPE_PREFIX)
                    .unwrap_or(&device.device_type)
                    .to_string(),
            })
            .collect())
    }

    /// List devices through the guard, refreshing once on 401, and log them
    pub fn check_access(&self, guard: &CredentialGuard) -> Result<Vec<SdmDevice>> {
        let devices = guard.authorized(|token| self.list_devices(token))?;
        for device in &devices {
            tracing::info!("Found device: {} type: {}", device.id, device.device_type);
        }
        if devices.is_empty() {
            tracing::warn!("No devices visible to project {}", self.project_id);
        }
        Ok(devices)
    }

    fn devices_url(&self) -> Result<reqwest::Url> {
        let mut url = reqwest::Url::parse(&self.base_url)
            .map_err(|e| AuthError::InvalidResponse(format!("Invalid SDM base URL: {}", e)))?;
        url.path_segments_mut()
            .map_err(|_| AuthError::InvalidResponse("SDM base URL cannot have a path".to_string()))?
            .pop_if_empty()
            .extend(["v1", "enterprises", self.project_id.as_str(), "devices"]);
        Ok(url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_devices_url() {
        let client = SdmClient::new("abc-123").unwrap();
        assert_eq!(
            client.devices_url().unwrap().as_str(),
            "https://smartdevicemanagement.googleapis.com/v1/enterprises/abc-123/devices"
        );
    }

    #[test]
    fn test_devices_url_escapes_project_id() {
        let client = SdmClient::with_base_url("a/b c", "http://127.0.0.1:9999/").unwrap();
        assert_eq!(
            client.devices_url().unwrap().as_str(),
            "http://127.0.0.1:9999/v1/enterprises/a%2Fb%20c/devices"
        );
    }
}
