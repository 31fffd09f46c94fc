//! Pull loop feeding the dispatcher.
//!
//! The loop runs on the calling thread until the shared shutdown flag is set.
//! Every pulled message is acknowledged once it has been handed over, whether
//! or not it could be decoded or dispatched. Redeliveries of messages whose
//! acknowledgement got lost are caught by the dispatcher's dedup.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use klingel_auth::CredentialGuard;
use klingel_dispatch::{AddressSource, Clock, DeliverySink, Dispatcher};

use crate::client::{PubSubClient, ReceivedMessage};
use crate::error::Result;

/// Default number of messages requested per pull
pub const DEFAULT_MAX_MESSAGES: u32 = 10;

/// Default pause after a failed pull
pub const DEFAULT_ERROR_PAUSE: Duration = Duration::from_secs(10);

const SHUTDOWN_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Consumer of decoded message payloads
pub trait MessageHandler {
    fn handle(&mut self, data: &[u8]);
}

impl<A, S, C> MessageHandler for Dispatcher<A, S, C>
where
    A: AddressSource,
    S: DeliverySink,
    C: Clock,
{
    fn handle(&mut self, data: &[u8]) {
        match self.on_message(data) {
            Ok(report) if report.suppressed => {}
            Ok(report) => {
                if !report.dispatched.is_empty() {
                    tracing::info!(
                        "Dispatched {:?}: {}/{} notifications delivered",
                        report.dispatched,
                        report.delivered(),
                        report.attempted
                    );
                }
            }
            Err(e) => tracing::warn!("Dropping malformed envelope: {}", e),
        }
    }
}

/// Repeatedly pulls the subscription and hands payloads to `H`
pub struct SubscriptionLoop<H> {
    client: PubSubClient,
    guard: Arc<CredentialGuard>,
    handler: H,
    shutdown: Arc<AtomicBool>,
    max_messages: u32,
    error_pause: Duration,
}

impl<H: MessageHandler> SubscriptionLoop<H> {
    pub fn new(
        client: PubSubClient,
        guard: Arc<CredentialGuard>,
        handler: H,
        shutdown: Arc<AtomicBool>,
    ) -> Self {
        Self {
            client,
            guard,
            handler,
            shutdown,
            max_messages: DEFAULT_MAX_MESSAGES,
            error_pause: DEFAULT_ERROR_PAUSE,
        }
    }

    pub fn with_max_messages(mut self, max_messages: u32) -> Self {
        self.max_messages = max_messages;
        self
    }

    pub fn with_error_pause(mut self, pause: Duration) -> Self {
        self.error_pause = pause;
        self
    }

    pub fn handler(&self) -> &H {
        &self.handler
    }

    pub fn into_handler(self) -> H {
        self.handler
    }

    /// Run until the shutdown flag is set
    pub fn run(&mut self) {
        tracing::info!("Listening for messages on {}", self.client.subscription_path());

        while !self.shutdown.load(Ordering::SeqCst) {
            if let Err(e) = self.poll_once() {
                tracing::error!(
                    "Subscription pull failed: {}; retrying in {}s",
                    e,
                    self.error_pause.as_secs()
                );
                self.pause();
            }
        }

        tracing::info!("Subscription loop stopped");
    }

    /// One pull, handle and acknowledge cycle; returns the number of messages
    pub fn poll_once(&mut self) -> Result<usize> {
        let messages = self
            .guard
            .authorized(|token| self.client.pull(token, self.max_messages))?;
        if messages.is_empty() {
            return Ok(0);
        }

        tracing::debug!("Pulled {} messages", messages.len());
        let ack_ids: Vec<String> = messages
            .iter()
            .map(|received| {
                self.deliver(received);
                received.ack_id.clone()
            })
            .collect();

        self.guard
            .authorized(|token| self.client.acknowledge(token, &ack_ids))?;
        Ok(ack_ids.len())
    }

    fn deliver(&mut self, received: &ReceivedMessage) {
        match received.message.decode_data() {
            Ok(data) => {
                tracing::debug!("Received message {}", received.message.message_id);
                self.handler.handle(&data);
            }
            Err(e) => tracing::warn!("{}", e),
        }
    }

    fn pause(&self) {
        let until = Instant::now() + self.error_pause;
        while !self.shutdown.load(Ordering::SeqCst) {
            let left = until.saturating_duration_since(Instant::now());
            if left.is_zero() {
                break;
            }
            thread::sleep(left.min(SHUTDOWN_POLL_INTERVAL));
        }
    }
}
