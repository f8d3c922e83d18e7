//! Looping combinators
//!
//! Both reset their child whenever it finishes. Wrapping a child that cannot be
//! reset is refused when the combinator is built, not on the first replay.

use crate::error::{Fault, RuntimeError};
use crate::instruction::{Instruction, Step};

/// Runs `inner` to completion `cycles` times
///
/// Zero cycles finishes on the first step without touching `inner`; one cycle
/// does not need `inner` to be resettable.
pub struct Repeat<I> {
    inner: I,
    cycles: u32,
    completed: u32,
}

impl<I: Instruction> Repeat<I> {
    pub fn new(inner: I, cycles: u32) -> Result<Self, RuntimeError> {
        if cycles > 1 && !inner.is_resettable() {
            return Err(RuntimeError::reset_not_supported(inner.name()));
        }
        Ok(Self {
            inner,
            cycles,
            completed: 0,
        })
    }

    pub fn completed_cycles(&self) -> u32 {
        self.completed
    }
}

impl<I: Instruction> Instruction for Repeat<I> {
    fn step(&mut self) -> Result<Step, Fault> {
        if self.completed >= self.cycles {
            return Ok(Step::Done);
        }
        if self.inner.step()? == Step::Continue {
            return Ok(Step::Continue);
        }

        self.completed += 1;
        if self.completed >= self.cycles {
            return Ok(Step::Done);
        }
        self.inner.reset()?;
        Ok(Step::Continue)
    }

    fn is_resettable(&self) -> bool {
        self.inner.is_resettable()
    }

    fn reset(&mut self) -> Result<(), RuntimeError> {
        self.inner.reset()?;
        self.completed = 0;
        Ok(())
    }
}

/// Runs `inner` again every time it finishes; never finishes itself
pub struct LoopForever<I> {
    inner: I,
    completed: u64,
}

impl<I: Instruction> LoopForever<I> {
    pub fn new(inner: I) -> Result<Self, RuntimeError> {
        if !inner.is_resettable() {
            return Err(RuntimeError::reset_not_supported(inner.name()));
        }
        Ok(Self {
            inner,
            completed: 0,
        })
    }

    pub fn completed_cycles(&self) -> u64 {
        self.completed
    }
}

impl<I: Instruction> Instruction for LoopForever<I> {
    fn step(&mut self) -> Result<Step, Fault> {
        if self.inner.step()?.is_done() {
            self.completed += 1;
            self.inner.reset()?;
        }
        Ok(Step::Continue)
    }

    fn is_resettable(&self) -> bool {
        true
    }

    fn reset(&mut self) -> Result<(), RuntimeError> {
        self.inner.reset()?;
        self.completed = 0;
        Ok(())
    }
}
