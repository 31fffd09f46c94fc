//! Turns inbound envelopes into notification deliveries.

use std::time::Duration;

use klingel_discovery::TargetAddress;

use crate::dedup::DedupSet;
use crate::envelope::{EventEnvelope, DOORBELL_CHIME_EVENT};
use crate::error::Result;
use crate::gate::{Clock, MonotonicClock, StartupGate};
use crate::sink::{AddressSource, DeliverySink};

/// Default length of the startup grace window
pub const DEFAULT_GRACE_PERIOD: Duration = Duration::from_secs(120);

/// Default retention of dispatched session ids
pub const DEFAULT_DEDUP_TTL: Duration = Duration::from_secs(24 * 60 * 60);

/// Tunables of a [`Dispatcher`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchConfig {
    /// Events arriving this soon after start are dropped
    pub grace_period: Duration,
    /// How long a dispatched session id suppresses repeats
    pub dedup_ttl: Duration,
    /// Event type that triggers a notification
    pub event_type: String,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            grace_period: DEFAULT_GRACE_PERIOD,
            dedup_ttl: DEFAULT_DEDUP_TTL,
            event_type: DOORBELL_CHIME_EVENT.to_string(),
        }
    }
}

/// What a single envelope caused
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DispatchReport {
    /// Dropped as a whole because the startup gate was still closed
    pub suppressed: bool,
    /// Session ids that got a dispatch pass
    pub dispatched: Vec<String>,
    /// Session ids skipped because they were already dispatched
    pub duplicates: Vec<String>,
    /// Delivery calls made
    pub attempted: usize,
    /// Delivery calls that failed
    pub failed: usize,
}

impl DispatchReport {
    fn suppressed() -> Self {
        Self {
            suppressed: true,
            ..Default::default()
        }
    }

    /// Delivery calls that succeeded
    pub fn delivered(&self) -> usize {
        self.attempted - self.failed
    }
}

/// Grace window, dedup and fan-out for doorbell events
///
/// Owned by a single consumer. Delivery failures are logged and counted but
/// never returned; the only error surfaced is an envelope that cannot be
/// parsed.
pub struct Dispatcher<A, S, C = MonotonicClock> {
    addresses: A,
    sink: S,
    clock: C,
    gate: StartupGate,
    seen: DedupSet,
    event_type: String,
}

impl<A, S> Dispatcher<A, S, MonotonicClock>
where
    A: AddressSource,
    S: DeliverySink,
{
    /// Dispatcher on the process clock; the grace window starts now
    pub fn new(addresses: A, sink: S, config: DispatchConfig) -> Self {
        Self::with_clock(addresses, sink, MonotonicClock, config)
    }
}

impl<A, S, C> Dispatcher<A, S, C>
where
    A: AddressSource,
    S: DeliverySink,
    C: Clock,
{
    /// Dispatcher on `clock`; the grace window starts at its current time
    pub fn with_clock(addresses: A, sink: S, clock: C, config: DispatchConfig) -> Self {
        let gate = StartupGate::new(clock.now(), config.grace_period);
        Self {
            addresses,
            sink,
            clock,
            gate,
            seen: DedupSet::new(config.dedup_ttl),
            event_type: config.event_type,
        }
    }

    /// Handle the raw payload of one pushed message
    ///
    /// The grace window is checked before parsing, so a backlog delivered
    /// right after start is dropped without being looked at.
    pub fn on_message(&mut self, data: &[u8]) -> Result<DispatchReport> {
        if !self.gate.check(self.clock.now()) {
            tracing::debug!("Startup grace window active, dropping message");
            return Ok(DispatchReport::suppressed());
        }

        let envelope = EventEnvelope::from_slice(data)?;
        Ok(self.dispatch(&envelope))
    }

    /// Handle one parsed envelope
    pub fn on_event(&mut self, envelope: &EventEnvelope) -> DispatchReport {
        if !self.gate.check(self.clock.now()) {
            tracing::debug!("Startup grace window active, dropping event");
            return DispatchReport::suppressed();
        }

        self.dispatch(envelope)
    }

    fn dispatch(&mut self, envelope: &EventEnvelope) -> DispatchReport {
        let mut report = DispatchReport::default();

        for detail in envelope.events_of_type(&self.event_type) {
            let Some(session_id) = detail.session_id() else {
                tracing::warn!(
                    device = envelope.device_name().unwrap_or("<unknown>"),
                    "Chime event without a string eventSessionId, skipping"
                );
                continue;
            };

            let now = self.clock.now();
            if self.seen.contains(session_id, now) {
                tracing::info!(session_id, "Session already dispatched, skipping duplicate");
                report.duplicates.push(session_id.to_string());
                continue;
            }

            let targets = self.addresses.current_addresses();
            if targets.is_empty() {
                tracing::info!(session_id, "No speakers known, nothing to notify");
            }
            for address in &targets {
                report.attempted += 1;
                if !self.deliver(address) {
                    report.failed += 1;
                }
            }

            self.seen.insert(session_id, self.clock.now());
            report.dispatched.push(session_id.to_string());
        }

        report
    }

    fn deliver(&self, address: &TargetAddress) -> bool {
        tracing::info!("Sending notification to {}", address);
        match self.sink.notify(address) {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!("Notification to {} failed: {}", address, e);
                false
            }
        }
    }

    /// Whether `session_id` currently suppresses a repeat
    pub fn has_seen(&self, session_id: &str) -> bool {
        self.seen.contains(session_id, self.clock.now())
    }

    /// Number of session ids retained for dedup
    pub fn seen_sessions(&self) -> usize {
        self.seen.len()
    }

    pub fn gate(&self) -> &StartupGate {
        &self.gate
    }

    pub fn address_source(&self) -> &A {
        &self.addresses
    }
}
