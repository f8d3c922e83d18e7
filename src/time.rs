//! Time sources
//!
//! Time-based instructions never read the wall clock. They take a
//! [`TimeSource`] explicitly, or fall back to the process-wide default.

use crate::error::RuntimeError;
use parking_lot::RwLock;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

/// Monotonic seconds
pub trait TimeSource: Send + Sync {
    fn current_time(&self) -> f64;
}

pub type Clock = Arc<dyn TimeSource>;

/// Seconds elapsed since the clock was created
#[derive(Debug, Clone, Copy)]
pub struct MonotonicClock {
    origin: Instant,
}

impl MonotonicClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl TimeSource for MonotonicClock {
    fn current_time(&self) -> f64 {
        self.origin.elapsed().as_secs_f64()
    }
}

/// A clock that only moves when told to
#[derive(Debug, Default)]
pub struct ManualClock {
    bits: AtomicU64,
}

impl ManualClock {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn set(&self, seconds: f64) {
        self.bits.store(seconds.to_bits(), Ordering::SeqCst);
    }

    pub fn advance(&self, seconds: f64) {
        self.set(self.current_time() + seconds);
    }
}

impl TimeSource for ManualClock {
    fn current_time(&self) -> f64 {
        f64::from_bits(self.bits.load(Ordering::SeqCst))
    }
}

/* ===================== Default Source ===================== */

static DEFAULT_SOURCE: RwLock<Option<Clock>> = parking_lot::const_rwlock(None);

pub fn set_default_time_source(source: Clock) {
    *DEFAULT_SOURCE.write() = Some(source);
}

pub fn clear_default_time_source() {
    *DEFAULT_SOURCE.write() = None;
}

pub fn default_time_source() -> Result<Clock, RuntimeError> {
    DEFAULT_SOURCE
        .read()
        .clone()
        .ok_or(RuntimeError::TimeSourceNotConfigured)
}
