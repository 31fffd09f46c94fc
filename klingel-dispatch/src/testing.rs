//! Test doubles for the dispatcher seams

use std::collections::HashSet;
use std::sync::Arc;
use std::time::{Duration, Instant};

use klingel_discovery::TargetAddress;
use parking_lot::Mutex;

use crate::gate::Clock;
use crate::sink::DeliverySink;

/// Clock that only moves when told to
///
/// Clones share the same offset, so a test can keep one handle and hand the
/// other to the dispatcher.
#[derive(Debug, Clone)]
pub struct ManualClock {
    base: Instant,
    offset: Arc<Mutex<Duration>>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self {
            base: Instant::now(),
            offset: Arc::new(Mutex::new(Duration::ZERO)),
        }
    }

    /// The instant the clock started at
    pub fn start(&self) -> Instant {
        self.base
    }

    pub fn advance(&self, by: Duration) {
        *self.offset.lock() += by;
    }

    /// Move to `offset` after start; never moves backwards
    pub fn set_elapsed(&self, offset: Duration) {
        let mut current = self.offset.lock();
        if offset > *current {
            *current = offset;
        }
    }

    pub fn elapsed(&self) -> Duration {
        *self.offset.lock()
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        self.base + *self.offset.lock()
    }
}

/// Sink that records every delivery attempt
#[derive(Debug, Clone, Default)]
pub struct RecordingSink {
    calls: Arc<Mutex<Vec<TargetAddress>>>,
    failing: Arc<Mutex<HashSet<TargetAddress>>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every delivery to `address` fail
    pub fn fail_for(&self, address: impl Into<TargetAddress>) {
        self.failing.lock().insert(address.into());
    }

    /// Every attempted delivery in call order, failed ones included
    pub fn calls(&self) -> Vec<TargetAddress> {
        self.calls.lock().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().len()
    }

    pub fn clear(&self) {
        self.calls.lock().clear();
    }
}

impl DeliverySink for RecordingSink {
    type Error = String;

    fn notify(&self, address: &TargetAddress) -> Result<(), String> {
        self.calls.lock().push(address.clone());
        if self.failing.lock().contains(address) {
            return Err(format!("{} is unreachable", address));
        }
        Ok(())
    }
}
