//! Injectable clock and keyed debounce scheduler.
//!
//! Nothing here spawns timers. Hosts call [`crate::Engine::tick`] periodically
//! and the scheduler reports which keys have been quiet long enough.

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};

/// Monotonic time source.
pub trait Clock: Send + Sync + std::fmt::Debug {
    /// Current instant.
    fn now(&self) -> Instant;
}

/// Shared clock handle.
pub type SharedClock = Arc<dyn Clock>;

/// Wall clock backed by [`Instant::now`].
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// Default clock handle.
#[must_use]
pub fn system_clock() -> SharedClock {
    Arc::new(SystemClock)
}

/// Manually advanced clock for tests.
#[derive(Debug)]
pub struct ManualClock {
    origin: Instant,
    offset: Mutex<Duration>,
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl ManualClock {
    /// Clock frozen at construction time.
    #[must_use]
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
            offset: Mutex::new(Duration::ZERO),
        }
    }

    /// Move time forward.
    pub fn advance(&self, by: Duration) {
        let mut offset = self.offset.lock().unwrap_or_else(PoisonError::into_inner);
        *offset += by;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        let offset = *self.offset.lock().unwrap_or_else(PoisonError::into_inner);
        self.origin + offset
    }
}

/// Per-key debounce: scheduling a key again pushes its deadline out.
#[derive(Debug)]
pub struct DebounceScheduler<K> {
    delay: Duration,
    deadlines: HashMap<K, Instant>,
    clock: SharedClock,
}

impl<K: Eq + Hash + Clone> DebounceScheduler<K> {
    /// Create a scheduler with a fixed quiet period.
    #[must_use]
    pub fn new(delay: Duration, clock: SharedClock) -> Self {
        Self {
            delay,
            deadlines: HashMap::new(),
            clock,
        }
    }

    /// Quiet period.
    #[must_use]
    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Arm or re-arm `key`. Returns true when an earlier timer was replaced.
    pub fn schedule(&mut self, key: K) -> bool {
        let deadline = self.clock.now() + self.delay;
        self.deadlines.insert(key, deadline).is_some()
    }

    /// Drop a pending timer.
    pub fn cancel(&mut self, key: &K) -> bool {
        self.deadlines.remove(key).is_some()
    }

    /// Whether `key` has a pending timer.
    #[must_use]
    pub fn is_pending(&self, key: &K) -> bool {
        self.deadlines.contains_key(key)
    }

    /// Number of pending timers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.deadlines.len()
    }

    /// True when nothing is pending.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.deadlines.is_empty()
    }

    /// Earliest pending deadline.
    #[must_use]
    pub fn next_deadline(&self) -> Option<Instant> {
        self.deadlines.values().min().copied()
    }

    /// Remove and return keys whose deadline has passed, earliest first.
    pub fn take_due(&mut self) -> Vec<K> {
        let now = self.clock.now();
        let mut due: Vec<(Instant, K)> = self
            .deadlines
            .iter()
            .filter(|(_, deadline)| **deadline <= now)
            .map(|(key, deadline)| (*deadline, key.clone()))
            .collect();
        due.sort_by_key(|(deadline, _)| *deadline);
        for (_, key) in &due {
            self.deadlines.remove(key);
        }
        due.into_iter().map(|(_, key)| key).collect()
    }

    /// Remove and return every pending key regardless of deadline.
    pub fn flush(&mut self) -> Vec<K> {
        let mut all: Vec<(Instant, K)> = self
            .deadlines
            .drain()
            .map(|(key, deadline)| (deadline, key))
            .collect();
        all.sort_by_key(|(deadline, _)| *deadline);
        all.into_iter().map(|(_, key)| key).collect()
    }
}
