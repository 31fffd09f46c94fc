//! # Klingel Dispatch
//!
//! Decides what happens when an event envelope arrives from the push feed.
//!
//! ## Overview
//!
//! A [`Dispatcher`] owns three pieces of state and two collaborators:
//!
//! - a [`StartupGate`] that drops everything for a grace period after start,
//!   since a fresh subscription replays a backlog of old events
//! - a [`DedupSet`] of session ids that were already dispatched, so a
//!   redelivered press does not ring twice
//! - the chime event type it reacts to
//! - an [`AddressSource`] that yields the speakers known right now
//! - a [`DeliverySink`] that plays the notification on one speaker
//!
//! Every doorbell chime with a new session id is fanned out to all current
//! targets. A failing target is logged and does not affect the others.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use klingel_discovery::DeviceRegistry;
//! use klingel_dispatch::{DispatchConfig, Dispatcher};
//! use notify_client::NotifyClient;
//!
//! let registry = DeviceRegistry::new();
//! let mut dispatcher = Dispatcher::new(registry, NotifyClient::new(), DispatchConfig::default());
//!
//! # let payload: &[u8] = b"{}";
//! match dispatcher.on_message(payload) {
//!     Ok(report) => println!("dispatched {:?}", report.dispatched),
//!     Err(e) => eprintln!("dropping malformed envelope: {}", e),
//! }
//! ```

mod dedup;
mod dispatcher;
mod envelope;
mod error;
mod gate;
mod sink;

#[cfg(any(test, feature = "test-support"))]
pub mod testing;

pub use dedup::DedupSet;
pub use dispatcher::{
    DispatchConfig, DispatchReport, Dispatcher, DEFAULT_DEDUP_TTL, DEFAULT_GRACE_PERIOD,
};
pub use envelope::{EventDetail, EventEnvelope, ResourceUpdate, DOORBELL_CHIME_EVENT};
pub use error::{EnvelopeError, Result};
pub use gate::{Clock, GateState, MonotonicClock, StartupGate};
pub use sink::{AddressSource, DeliverySink};
