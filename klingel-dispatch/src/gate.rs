//! Startup grace window and the clock it is measured with.
//!
//! Right after (re)subscribing, the push feed tends to redeliver a backlog of
//! old events. Everything arriving inside the grace window is dropped.

use std::time::{Duration, Instant};

/// Monotonic time source
pub trait Clock {
    fn now(&self) -> Instant;
}

/// The process monotonic clock
#[derive(Debug, Clone, Copy, Default)]
pub struct MonotonicClock;

impl Clock for MonotonicClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// State of the startup gate
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateState {
    /// Events are suppressed until `opens_at`
    Closed { opens_at: Instant },
    /// Events are processed
    Open,
}

/// One-way `Closed -> Open` gate driven by a monotonic clock
#[derive(Debug, Clone)]
pub struct StartupGate {
    state: GateState,
}

impl StartupGate {
    /// Gate that opens `grace_period` after `started_at`
    pub fn new(started_at: Instant, grace_period: Duration) -> Self {
        let state = if grace_period.is_zero() {
            GateState::Open
        } else {
            GateState::Closed {
                opens_at: started_at + grace_period,
            }
        };
        Self { state }
    }

    /// Whether events may pass at `now`, opening the gate once the window is over
    pub fn check(&mut self, now: Instant) -> bool {
        match self.state {
            GateState::Open => true,
            GateState::Closed { opens_at } if now >= opens_at => {
                self.state = GateState::Open;
                tracing::info!("Startup grace window elapsed, dispatching events");
                true
            }
            GateState::Closed { .. } => false,
        }
    }

    pub fn state(&self) -> GateState {
        self.state
    }

    pub fn is_open(&self) -> bool {
        self.state == GateState::Open
    }

    /// Time left in the grace window at `now`
    pub fn remaining(&self, now: Instant) -> Duration {
        match self.state {
            GateState::Open => Duration::ZERO,
            GateState::Closed { opens_at } => opens_at.saturating_duration_since(now),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const GRACE: Duration = Duration::from_secs(120);

    #[test]
    fn test_closed_for_whole_window() {
        let start = Instant::now();
        let mut gate = StartupGate::new(start, GRACE);

        for secs in [0, 1, 10, 60, 119] {
            assert!(!gate.check(start + Duration::from_secs(secs)), "open at {}s", secs);
        }
        assert_eq!(gate.remaining(start + Duration::from_secs(100)), Duration::from_secs(20));
    }

    #[test]
    fn test_opens_at_end_of_window_and_stays_open() {
        let start = Instant::now();
        let mut gate = StartupGate::new(start, GRACE);

        assert!(gate.check(start + GRACE));
        assert!(gate.is_open());
        assert_eq!(gate.state(), GateState::Open);
        assert_eq!(gate.remaining(start), Duration::ZERO);
        // Once open the gate does not consult the clock again
        assert!(gate.check(start));
    }

    #[test]
    fn test_zero_grace_starts_open() {
        let start = Instant::now();
        let mut gate = StartupGate::new(start, Duration::ZERO);
        assert!(gate.is_open());
        assert!(gate.check(start));
    }
}
