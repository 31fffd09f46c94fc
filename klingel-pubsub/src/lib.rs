//! # Klingel Pub/Sub
//!
//! Pulls doorbell event envelopes from a Pub/Sub subscription over the REST
//! API and feeds them to a [`MessageHandler`], normally a
//! [`klingel_dispatch::Dispatcher`].
//!
//! Requests are authenticated through a shared
//! [`klingel_auth::CredentialGuard`]; a 401 answer triggers one token refresh
//! and one retry.

mod client;
mod error;
mod subscription;

pub use client::{PubSubClient, PubsubMessage, ReceivedMessage, PUBSUB_API_URL};
pub use error::{PubSubError, Result};
pub use subscription::{
    MessageHandler, SubscriptionLoop, DEFAULT_ERROR_PAUSE, DEFAULT_MAX_MESSAGES,
};
