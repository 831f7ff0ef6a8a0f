//! TTL cache with an injectable clock
//!
//! Holds one computed value (for example a monitoring summary) until it is
//! older than the configured TTL or explicitly invalidated. A value computed
//! across an invalidation is returned to its caller but never stored.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, RwLock};
use std::time::{Duration, Instant};

/// Source of the current instant
pub trait Clock: Send + Sync {
    fn now(&self) -> Instant;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// Manually advanced clock for tests
#[derive(Debug, Clone)]
pub struct ManualClock {
    now: Arc<Mutex<Instant>>,
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl ManualClock {
    pub fn new() -> Self {
        Self {
            now: Arc::new(Mutex::new(Instant::now())),
        }
    }

    pub fn advance(&self, by: Duration) {
        let mut now = self.now.lock().unwrap_or_else(|e| e.into_inner());
        *now += by;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        *self.now.lock().unwrap_or_else(|e| e.into_inner())
    }
}

struct Entry<T> {
    value: T,
    stored_at: Instant,
}

pub struct TtlCache<T, C: Clock = SystemClock> {
    ttl: Duration,
    clock: C,
    entry: RwLock<Option<Entry<T>>>,
    /// Bumped by every `invalidate`, under the entry write lock
    generation: AtomicU64,
}

impl<T: Clone> TtlCache<T, SystemClock> {
    pub fn new(ttl: Duration) -> Self {
        Self::with_clock(ttl, SystemClock)
    }
}

impl<T: Clone, C: Clock> TtlCache<T, C> {
    pub fn with_clock(ttl: Duration, clock: C) -> Self {
        Self {
            ttl,
            clock,
            entry: RwLock::new(None),
            generation: AtomicU64::new(0),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Cached value if present and fresh
    pub fn get(&self) -> Option<T> {
        let entry = self.entry.read().unwrap_or_else(|e| e.into_inner());
        entry
            .as_ref()
            .filter(|e| self.clock.now().duration_since(e.stored_at) < self.ttl)
            .map(|e| e.value.clone())
    }

    pub fn insert(&self, value: T) {
        let mut entry = self.entry.write().unwrap_or_else(|e| e.into_inner());
        *entry = Some(Entry {
            value,
            stored_at: self.clock.now(),
        });
    }

    pub fn invalidate(&self) {
        let mut entry = self.entry.write().unwrap_or_else(|e| e.into_inner());
        self.generation.fetch_add(1, Ordering::SeqCst);
        *entry = None;
    }

    /// Return the fresh cached value, or compute, store and return a new one.
    ///
    /// If the cache is invalidated while `compute` runs, the computed value is
    /// returned but not stored.
    pub fn get_or_insert_with(&self, compute: impl FnOnce() -> T) -> T {
        if let Some(value) = self.get() {
            return value;
        }

        let started_at = self.generation.load(Ordering::SeqCst);
        let value = compute();

        let mut entry = self.entry.write().unwrap_or_else(|e| e.into_inner());
        if self.generation.load(Ordering::SeqCst) == started_at {
            *entry = Some(Entry {
                value: value.clone(),
                stored_at: self.clock.now(),
            });
        }
        value
    }
}
