//! Guards
//!
//! A guard is sampled every tick alongside the guarded instruction and can end
//! it early. The guarded instruction is stepped first, so finishing in the
//! same tick the guard fires counts as a normal completion.

use super::race::{Or, Winner};
use crate::error::{Fault, RuntimeError};
use crate::instruction::{Completion, Instruction, Operation, Step, WaitForSeconds, WaitUntil};
use crate::time::Clock;
use serde::{Deserialize, Serialize};

/// How a guarded instruction ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Guarded {
    Completed,
    Stopped,
}

/// Steps `inner` until it finishes or `guard` does
pub struct StopWhen<A, G> {
    inner: A,
    guard: G,
    completion: Completion<Guarded>,
}

impl<A: Instruction, G: Instruction> StopWhen<A, G> {
    pub fn new(inner: A, guard: G) -> Self {
        Self {
            inner,
            guard,
            completion: Completion::new(),
        }
    }
}

impl<A, P> StopWhen<A, WaitUntil<P>>
where
    A: Instruction,
    P: FnMut() -> bool + Send,
{
    /// Stop as soon as `predicate` holds
    pub fn predicate(inner: A, predicate: P) -> Self {
        Self::new(inner, WaitUntil::new(predicate))
    }
}

impl<A: Instruction, G: Instruction> Instruction for StopWhen<A, G> {
    fn step(&mut self) -> Result<Step, Fault> {
        self.completion.ensure_running(self.name())?;
        if self.inner.step()?.is_done() {
            return Ok(self.completion.complete(Guarded::Completed));
        }
        if self.guard.step()?.is_done() {
            return Ok(self.completion.complete(Guarded::Stopped));
        }
        Ok(Step::Continue)
    }

    fn is_resettable(&self) -> bool {
        self.inner.is_resettable() && self.guard.is_resettable()
    }

    fn reset(&mut self) -> Result<(), RuntimeError> {
        self.inner.reset()?;
        self.guard.reset()?;
        self.completion.clear();
        Ok(())
    }
}

impl<A: Instruction, G: Instruction> Operation for StopWhen<A, G> {
    type Output = Guarded;

    fn is_done(&self) -> bool {
        self.completion.is_done()
    }

    fn value(&self) -> Result<Guarded, RuntimeError> {
        self.completion.value()
    }
}

/// Gives `inner` a time budget; produces `true` when it finished in time
pub struct TimeLimit<I> {
    race: Or<I, WaitForSeconds>,
}

impl<I: Instruction> TimeLimit<I> {
    pub fn new(inner: I, seconds: f64, clock: Clock) -> Self {
        Self {
            race: Or::new(inner, WaitForSeconds::new(seconds, clock)),
        }
    }
}

impl<I: Instruction> Instruction for TimeLimit<I> {
    fn step(&mut self) -> Result<Step, Fault> {
        self.race.step()
    }

    fn is_resettable(&self) -> bool {
        self.race.is_resettable()
    }

    fn reset(&mut self) -> Result<(), RuntimeError> {
        self.race.reset()
    }
}

impl<I: Instruction> Operation for TimeLimit<I> {
    type Output = bool;

    fn is_done(&self) -> bool {
        self.race.is_done()
    }

    fn value(&self) -> Result<bool, RuntimeError> {
        Ok(self.race.value()? == Winner::First)
    }
}
