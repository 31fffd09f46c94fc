//! Event envelopes as published by the Smart Device Management API.
//!
//! A Pub/Sub message carries one envelope. Resource updates list the events
//! that happened on a device keyed by event type:
//!
//! ```json
//! {
//!   "eventId": "0120ecc7-3b57-4eb4-9941-91609f189fb4",
//!   "timestamp": "2019-01-01T00:00:01Z",
//!   "resourceUpdate": {
//!     "name": "enterprises/project-id/devices/device-id",
//!     "events": {
//!       "sdm.devices.events.DoorbellChime.Chime": {
//!         "eventSessionId": "CjY5Y3VKaTZwR3o4Y19YbTVfMF...",
//!         "eventId": "n:1"
//!       }
//!     }
//!   },
//!   "userId": "AVPHwEuBfnPOnTqzVFT4IONX2Qqhu9EJ4ubO-bNnQ-yi"
//! }
//! ```

use std::collections::BTreeMap;

use serde::Deserialize;
use serde_json::Value;

use crate::error::{EnvelopeError, Result};

/// Event type emitted when a doorbell button is pressed
pub const DOORBELL_CHIME_EVENT: &str = "sdm.devices.events.DoorbellChime.Chime";

/// One inbound notification from the push feed
///
/// Only `resourceUpdate.events` and each event's `eventSessionId` are
/// interpreted. The remaining fields are raw JSON of any shape.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventEnvelope {
    #[serde(default)]
    pub event_id: Option<Value>,
    #[serde(default)]
    pub timestamp: Option<Value>,
    #[serde(default)]
    pub resource_update: Option<ResourceUpdate>,
    /// Structural change (device added to a room, ...); never carries events
    #[serde(default)]
    pub relation_update: Option<Value>,
    #[serde(default)]
    pub user_id: Option<Value>,
}

/// Events and trait changes on a single device
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ResourceUpdate {
    /// Full resource name of the device
    #[serde(default)]
    pub name: Option<Value>,
    #[serde(default)]
    pub events: Option<BTreeMap<String, EventDetail>>,
    #[serde(default)]
    pub traits: Option<Value>,
}

/// Detail object of a single event, any JSON value
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(transparent)]
pub struct EventDetail(Value);

impl EventDetail {
    /// Identifies one physical occurrence (one press of the doorbell);
    /// shared by every event belonging to it. `None` unless it is a string.
    pub fn session_id(&self) -> Option<&str> {
        self.0.get("eventSessionId")?.as_str()
    }

    /// Raw field of the detail object
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }
}

impl EventEnvelope {
    /// Parse and validate an envelope from raw message bytes
    pub fn from_slice(data: &[u8]) -> Result<Self> {
        let envelope: EventEnvelope = serde_json::from_slice(data)?;
        envelope.validate()?;
        Ok(envelope)
    }

    fn validate(&self) -> Result<()> {
        match (&self.resource_update, &self.relation_update) {
            (None, None) => Err(EnvelopeError::MissingUpdate),
            (Some(update), _) if update.events.is_none() && update.traits.is_none() => {
                Err(EnvelopeError::EmptyResourceUpdate(
                    update
                        .name
                        .as_ref()
                        .and_then(Value::as_str)
                        .unwrap_or("<unnamed>")
                        .to_string(),
                ))
            }
            _ => Ok(()),
        }
    }

    /// All events of this envelope, keyed by event type
    pub fn events(&self) -> impl Iterator<Item = (&str, &EventDetail)> {
        self.resource_update
            .iter()
            .filter_map(|update| update.events.as_ref())
            .flat_map(|events| events.iter())
            .map(|(event_type, detail)| (event_type.as_str(), detail))
    }

    /// Events whose type equals `event_type`
    pub fn events_of_type<'a>(
        &'a self,
        event_type: &'a str,
    ) -> impl Iterator<Item = &'a EventDetail> + 'a {
        self.events()
            .filter(move |(kind, _)| *kind == event_type)
            .map(|(_, detail)| detail)
    }

    /// Resource name of the device the events happened on
    pub fn device_name(&self) -> Option<&str> {
        self.resource_update.as_ref()?.name.as_ref()?.as_str()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CHIME: &str = r#"{
        "eventId": "0120ecc7-3b57-4eb4-9941-91609f189fb4",
        "timestamp": "2019-01-01T00:00:01Z",
        "resourceUpdate": {
            "name": "enterprises/project-id/devices/device-id",
            "events": {
                "sdm.devices.events.DoorbellChime.Chime": {
                    "eventSessionId": "CjY5Y3VKaTZwR3o4Y19YbTVfMF",
                    "eventId": "n:1"
                },
                "sdm.devices.events.CameraPerson.Person": {
                    "eventSessionId": "CjY5Y3VKaTZwR3o4Y19YbTVfMF",
                    "eventId": "n:2"
                }
            }
        },
        "userId": "AVPHwEuBfnPOnTqzVFT4IONX2Qqhu9EJ4ubO-bNnQ-yi"
    }"#;

    #[test]
    fn test_parse_chime_envelope() {
        let envelope = EventEnvelope::from_slice(CHIME.as_bytes()).unwrap();

        assert_eq!(envelope.events().count(), 2);
        assert_eq!(
            envelope.device_name(),
            Some("enterprises/project-id/devices/device-id")
        );

        let chimes: Vec<&EventDetail> = envelope.events_of_type(DOORBELL_CHIME_EVENT).collect();
        assert_eq!(chimes.len(), 1);
        assert_eq!(chimes[0].session_id(), Some("CjY5Y3VKaTZwR3o4Y19YbTVfMF"));
        assert_eq!(chimes[0].get("eventId"), Some(&Value::from("n:1")));
    }

    #[test]
    fn test_trait_update_has_no_events() {
        let json = r#"{
            "resourceUpdate": {
                "name": "enterprises/project-id/devices/device-id",
                "traits": {"sdm.devices.traits.Connectivity": {"status": "ONLINE"}}
            }
        }"#;

        let envelope = EventEnvelope::from_slice(json.as_bytes()).unwrap();
        assert_eq!(envelope.events().count(), 0);
    }

    #[test]
    fn test_relation_update_is_valid() {
        let json = r#"{
            "eventId": "abc",
            "relationUpdate": {
                "type": "CREATED",
                "subject": "enterprises/project-id/structures/structure-id/rooms/room-id",
                "object": "enterprises/project-id/devices/device-id"
            }
        }"#;

        let envelope = EventEnvelope::from_slice(json.as_bytes()).unwrap();
        assert!(envelope.device_name().is_none());
        assert_eq!(envelope.events_of_type(DOORBELL_CHIME_EVENT).count(), 0);
    }

    #[test]
    fn test_chime_without_session_id_still_parses() {
        let json = r#"{
            "resourceUpdate": {
                "events": {"sdm.devices.events.DoorbellChime.Chime": {"eventId": "n:1"}}
            }
        }"#;

        let envelope = EventEnvelope::from_slice(json.as_bytes()).unwrap();
        let chime = envelope.events_of_type(DOORBELL_CHIME_EVENT).next().unwrap();
        assert!(chime.session_id().is_none());
    }

    #[test]
    fn test_fields_outside_the_chime_session_are_not_validated() {
        let json = r#"{
            "eventId": 42,
            "timestamp": null,
            "userId": ["not", "a", "string"],
            "resourceUpdate": {
                "name": 7,
                "events": {
                    "sdm.devices.events.DoorbellChime.Chime": {"eventSessionId": "abc", "eventId": 1},
                    "sdm.devices.events.CameraMotion.Motion": null,
                    "sdm.devices.events.CameraPerson.Person": "odd"
                }
            }
        }"#;

        let envelope = EventEnvelope::from_slice(json.as_bytes()).unwrap();
        assert_eq!(envelope.events().count(), 3);
        assert!(envelope.device_name().is_none());
        let chime = envelope.events_of_type(DOORBELL_CHIME_EVENT).next().unwrap();
        assert_eq!(chime.session_id(), Some("abc"));
    }

    #[test]
    fn test_non_string_session_id_reads_as_missing() {
        let json = r#"{
            "resourceUpdate": {
                "events": {"sdm.devices.events.DoorbellChime.Chime": {"eventSessionId": 17}}
            }
        }"#;

        let envelope = EventEnvelope::from_slice(json.as_bytes()).unwrap();
        let chime = envelope.events_of_type(DOORBELL_CHIME_EVENT).next().unwrap();
        assert!(chime.session_id().is_none());
    }

    #[test]
    fn test_malformed_envelopes() {
        assert!(matches!(
            EventEnvelope::from_slice(b"not json"),
            Err(EnvelopeError::Json(_))
        ));
        assert!(matches!(
            EventEnvelope::from_slice(b"[1, 2, 3]"),
            Err(EnvelopeError::Json(_))
        ));
        assert!(matches!(
            EventEnvelope::from_slice(br#"{"eventId": "abc"}"#),
            Err(EnvelopeError::MissingUpdate)
        ));
        assert!(matches!(
            EventEnvelope::from_slice(br#"{"resourceUpdate": {"name": "dev"}}"#),
            Err(EnvelopeError::EmptyResourceUpdate(name)) if name == "dev"
        ));
        assert!(matches!(
            EventEnvelope::from_slice(br#"{"resourceUpdate": {"events": [1, 2]}}"#),
            Err(EnvelopeError::Json(_))
        ));
    }
}
