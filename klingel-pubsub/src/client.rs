//! Minimal REST client for a single Pub/Sub pull subscription.

use std::time::Duration;

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};

use crate::error::{PubSubError, Result};

/// Base URL of the Pub/Sub REST API
pub const PUBSUB_API_URL: &str = "https://pubsub.googleapis.com";

/// A pulled message together with the id needed to acknowledge it
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReceivedMessage {
    pub ack_id: String,
    pub message: PubsubMessage,
}

/// Message as published to the topic
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PubsubMessage {
    /// Base64 encoded payload
    #[serde(default)]
    pub data: String,
    #[serde(default)]
    pub message_id: String,
    #[serde(default)]
    pub publish_time: Option<String>,
}

impl PubsubMessage {
    /// Decoded payload bytes
    pub fn decode_data(&self) -> Result<Vec<u8>> {
        BASE64.decode(self.data.as_bytes()).map_err(|source| PubSubError::Decode {
            message_id: self.message_id.clone(),
            source,
        })
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct PullRequest {
    max_messages: u32,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PullResponse {
    #[serde(default)]
    received_messages: Vec<ReceivedMessage>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct AcknowledgeRequest<'a> {
    ack_ids: &'a [String],
}

/// Client bound to `projects/{project}/subscriptions/{subscription}`
#[derive(Debug, Clone)]
pub struct PubSubClient {
    http: reqwest::blocking::Client,
    base_url: String,
    project_id: String,
    subscription_id: String,
}

impl PubSubClient {
    pub fn new(project_id: impl Into<String>, subscription_id: impl Into<String>) -> Result<Self> {
        Self::with_base_url(project_id, subscription_id, PUBSUB_API_URL)
    }

    /// Client against a custom base URL, e.g. an emulator
    pub fn with_base_url(
        project_id: impl Into<String>,
        subscription_id: impl Into<String>,
        base_url: impl Into<String>,
    ) -> Result<Self> {
        // Pull requests are held open by the server while the subscription is idle
        let http = reqwest::blocking::Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .timeout(Duration::from_secs(90))
            .build()
            .map_err(|e| PubSubError::Network(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            http,
            base_url: base_url.into(),
            project_id: project_id.into(),
            subscription_id: subscription_id.into(),
        })
    }

    /// Full subscription path as used in logs
    pub fn subscription_path(&self) -> String {
        format!(
            "projects/{}/subscriptions/{}",
            self.project_id, self.subscription_id
        )
    }

    /// Pull up to `max_messages` messages
    pub fn pull(&self, token: &str, max_messages: u32) -> Result<Vec<ReceivedMessage>> {
        let url = self.method_url("pull")?;
        let response = self
            .http
            .post(url)
            .bearer_auth(token)
            .json(&PullRequest { max_messages })
            .send()
            .map_err(|e| PubSubError::Network(format!("Pull failed: {}", e)))?;

        let response = check_status(response, "pull")?;
        let pulled: PullResponse = response
            .json()
            .map_err(|e| PubSubError::InvalidResponse(format!("Invalid pull response: {}", e)))?;
        Ok(pulled.received_messages)
    }

    /// Acknowledge the given messages; a no-op for an empty list
    pub fn acknowledge(&self, token: &str, ack_ids: &[String]) -> Result<()> {
        if ack_ids.is_empty() {
            return Ok(());
        }

        let url = self.method_url("acknowledge")?;
        let response = self
            .http
            .post(url)
            .bearer_auth(token)
            .json(&AcknowledgeRequest { ack_ids })
            .send()
            .map_err(|e| PubSubError::Network(format!("Acknowledge failed: {}", e)))?;

        check_status(response, "acknowledge")?;
        Ok(())
    }

    fn method_url(&self, method: &str) -> Result<reqwest::Url> {
        let mut url = reqwest::Url::parse(&self.base_url)
            .map_err(|e| PubSubError::InvalidResponse(format!("Invalid Pub/Sub base URL: {}", e)))?;
        let subscription = format!("{}:{}", self.subscription_id, method);
        url.path_segments_mut()
            .map_err(|_| PubSubError::InvalidResponse("Pub/Sub base URL cannot have a path".to_string()))?
            .pop_if_empty()
            .extend([
                "v1",
                "projects",
                self.project_id.as_str(),
                "subscriptions",
                subscription.as_str(),
            ]);
        Ok(url)
    }
}

fn check_status(
    response: reqwest::blocking::Response,
    method: &str,
) -> Result<reqwest::blocking::Response> {
    match response.status() {
        status if status.is_success() => Ok(response),
        StatusCode::UNAUTHORIZED => Err(PubSubError::Unauthorized(format!("{} returned 401", method))),
        status => Err(PubSubError::Status {
            status: status.as_u16(),
            body: response.text().unwrap_or_default(),
        }),
    }
}
