//! Time source and the trailing-edge debouncer used to batch structured edits.
//!
//! The debouncer owns no thread. The host polls it (through
//! [`Coordinator::tick`](crate::Coordinator::tick)) and the pending flush runs
//! once the quiet period has elapsed.

use std::cell::Cell;
use std::fmt;
use std::rc::Rc;
use std::time::{Duration, Instant};

/// Source of the current time.
pub trait Clock: fmt::Debug {
    fn now(&self) -> Instant;
}

/// Wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// Clock that only moves when told to. Clones share the same time.
#[derive(Debug, Clone)]
pub struct ManualClock {
    now: Rc<Cell<Instant>>,
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl ManualClock {
    pub fn new() -> Self {
        Self {
            now: Rc::new(Cell::new(Instant::now())),
        }
    }

    pub fn advance(&self, by: Duration) {
        self.now.set(self.now.get() + by);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        self.now.get()
    }
}

/// Trailing-edge debouncer: every [`schedule`](Self::schedule) pushes the
/// deadline back by the full delay.
#[derive(Debug, Clone)]
pub struct Debouncer {
    delay: Duration,
    deadline: Option<Instant>,
}

impl Debouncer {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            deadline: None,
        }
    }

    /// (Re)arm the timer relative to `now`.
    pub fn schedule(&mut self, now: Instant) {
        self.deadline = Some(now + self.delay);
    }

    pub fn cancel(&mut self) {
        self.deadline = None;
    }

    pub fn is_due(&self, now: Instant) -> bool {
        self.deadline.is_some_and(|deadline| now >= deadline)
    }

    /// Disarm and return true if the deadline has passed.
    pub fn take_due(&mut self, now: Instant) -> bool {
        if self.is_due(now) {
            self.deadline = None;
            true
        } else {
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DELAY: Duration = Duration::from_millis(300);

    #[test]
    fn test_fires_after_quiet_period() {
        let clock = ManualClock::new();
        let mut debouncer = Debouncer::new(DELAY);
        debouncer.schedule(clock.now());

        clock.advance(Duration::from_millis(299));
        assert!(!debouncer.take_due(clock.now()));

        clock.advance(Duration::from_millis(1));
        assert!(debouncer.take_due(clock.now()));
        clock.advance(DELAY);
        assert!(!debouncer.is_due(clock.now()));
    }

    #[test]
    fn test_reschedule_pushes_deadline_back() {
        let clock = ManualClock::new();
        let mut debouncer = Debouncer::new(DELAY);
        debouncer.schedule(clock.now());
        clock.advance(Duration::from_millis(200));
        debouncer.schedule(clock.now());
        clock.advance(Duration::from_millis(200));

        assert!(!debouncer.is_due(clock.now()));
        clock.advance(Duration::from_millis(100));
        assert!(debouncer.is_due(clock.now()));
    }

    #[test]
    fn test_cancel_disarms() {
        let clock = ManualClock::new();
        let mut debouncer = Debouncer::new(DELAY);
        debouncer.schedule(clock.now());
        debouncer.cancel();
        clock.advance(DELAY * 2);
        assert!(!debouncer.take_due(clock.now()));
    }

    #[test]
    fn test_manual_clock_clones_share_time() {
        let clock = ManualClock::new();
        let other = clock.clone();
        clock.advance(Duration::from_secs(1));
        assert_eq!(clock.now(), other.now());
    }
}
