//! Test helpers for combinator tests
//!
//! Deterministic instructions whose step and reset counts can be inspected
//! after they were moved into a combinator.

use crate::error::{Fault, RuntimeError};
use crate::instruction::{Completion, Instruction, Operation, Step};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

/// Shared counters observed from outside a combinator tree
#[derive(Debug, Clone, Default)]
pub struct Tally {
    steps: Arc<AtomicU32>,
    resets: Arc<AtomicU32>,
}

impl Tally {
    pub fn steps(&self) -> u32 {
        self.steps.load(Ordering::SeqCst)
    }

    pub fn resets(&self) -> u32 {
        self.resets.load(Ordering::SeqCst)
    }
}

/// Finishes on its `length`th step
pub struct Countdown {
    length: u32,
    taken: u32,
    tally: Tally,
}

impl Countdown {
    pub fn new(length: u32) -> Self {
        Self::tallied(length).0
    }

    pub fn tallied(length: u32) -> (Self, Tally) {
        let tally = Tally::default();
        (
            Self {
                length,
                taken: 0,
                tally: tally.clone(),
            },
            tally,
        )
    }
}

impl Instruction for Countdown {
    fn step(&mut self) -> Result<Step, Fault> {
        self.taken += 1;
        self.tally.steps.fetch_add(1, Ordering::SeqCst);
        Ok(Step::done_if(self.taken >= self.length))
    }

    fn is_resettable(&self) -> bool {
        true
    }

    fn reset(&mut self) -> Result<(), RuntimeError> {
        self.taken = 0;
        self.tally.resets.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Like [`Countdown`] but cannot be reset
pub struct OneShot(pub Countdown);

impl Instruction for OneShot {
    fn step(&mut self) -> Result<Step, Fault> {
        self.0.step()
    }
}

/// Produces `value` on its `length`th step
pub struct Delayed<T> {
    countdown: Countdown,
    value: T,
    completion: Completion<T>,
}

impl<T: Clone + Send> Delayed<T> {
    pub fn new(length: u32, value: T) -> Self {
        Self {
            countdown: Countdown::new(length),
            value,
            completion: Completion::new(),
        }
    }
}

impl<T: Clone + Send> Instruction for Delayed<T> {
    fn step(&mut self) -> Result<Step, Fault> {
        self.completion.ensure_running(self.name())?;
        match self.countdown.step()? {
            Step::Continue => Ok(Step::Continue),
            Step::Done => Ok(self.completion.complete(self.value.clone())),
        }
    }

    fn is_resettable(&self) -> bool {
        true
    }

    fn reset(&mut self) -> Result<(), RuntimeError> {
        self.countdown.reset()?;
        self.completion.clear();
        Ok(())
    }
}

impl<T: Clone + Send> Operation for Delayed<T> {
    type Output = T;

    fn is_done(&self) -> bool {
        self.completion.is_done()
    }

    fn value(&self) -> Result<T, RuntimeError> {
        self.completion.value()
    }
}

/// Raises `fault` on its `at`th step
pub struct Failing {
    at: u32,
    taken: u32,
    fault: Fault,
}

impl Failing {
    pub fn new(at: u32, fault: Fault) -> Self {
        Self { at, taken: 0, fault }
    }
}

impl Instruction for Failing {
    fn step(&mut self) -> Result<Step, Fault> {
        self.taken += 1;
        if self.taken >= self.at {
            return Err(self.fault.clone());
        }
        Ok(Step::Continue)
    }
}

/// Step until done (or `limit` steps), recording every result
pub fn trace<I: Instruction + ?Sized>(instruction: &mut I, limit: usize) -> Vec<Step> {
    let mut steps = Vec::new();
    for _ in 0..limit {
        let step = instruction.step().expect("instruction faulted");
        steps.push(step);
        if step.is_done() {
            break;
        }
    }
    steps
}

/// Number of steps until the instruction first reports done
pub fn steps_to_finish<I: Instruction + ?Sized>(instruction: &mut I) -> usize {
    let steps = trace(instruction, 1_000);
    assert_eq!(steps.last(), Some(&Step::Done), "instruction did not finish");
    steps.len()
}
