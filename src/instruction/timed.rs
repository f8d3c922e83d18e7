//! Time-based instructions
//!
//! Both read a [`TimeSource`](crate::time::TimeSource); neither touches the wall clock.

use super::{Instruction, Step};
use crate::error::{Fault, RuntimeError};
use crate::time::{default_time_source, Clock};

/// Finishes once `seconds` have passed since its first step
pub struct WaitForSeconds {
    seconds: f64,
    clock: Clock,
    started_at: Option<f64>,
}

impl WaitForSeconds {
    pub fn new(seconds: f64, clock: Clock) -> Self {
        Self {
            seconds,
            clock,
            started_at: None,
        }
    }

    /// Use the process-wide default time source
    pub fn with_default_clock(seconds: f64) -> Result<Self, RuntimeError> {
        Ok(Self::new(seconds, default_time_source()?))
    }

    /// Seconds left, or `None` before the first step
    pub fn remaining(&self) -> Option<f64> {
        self.started_at
            .map(|start| (self.seconds - (self.clock.current_time() - start)).max(0.0))
    }
}

impl Instruction for WaitForSeconds {
    fn step(&mut self) -> Result<Step, Fault> {
        let now = self.clock.current_time();
        let start = *self.started_at.get_or_insert(now);
        Ok(Step::done_if(now - start >= self.seconds))
    }

    fn is_resettable(&self) -> bool {
        true
    }

    fn reset(&mut self) -> Result<(), RuntimeError> {
        self.started_at = None;
        Ok(())
    }
}

/// Runs an action every `interval` seconds, starting on the first step
///
/// Never finishes on its own; combine with a guard to stop it.
pub struct Periodic<F> {
    action: F,
    interval: f64,
    clock: Clock,
    next_due: Option<f64>,
}

impl<F: FnMut() + Send> Periodic<F> {
    pub fn new(interval: f64, clock: Clock, action: F) -> Self {
        Self {
            action,
            interval,
            clock,
            next_due: None,
        }
    }
}

impl<F: FnMut() + Send> Instruction for Periodic<F> {
    fn step(&mut self) -> Result<Step, Fault> {
        let now = self.clock.current_time();
        let due = *self.next_due.get_or_insert(now);
        if now >= due {
            (self.action)();
            self.next_due = Some(due + self.interval.max(0.0));
        }
        Ok(Step::Continue)
    }

    fn is_resettable(&self) -> bool {
        true
    }

    fn reset(&mut self) -> Result<(), RuntimeError> {
        self.next_due = None;
        Ok(())
    }
}
