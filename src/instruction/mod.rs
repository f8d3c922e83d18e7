//! Instructions
//!
//! An [`Instruction`] is the atomic unit of suspending work: something that can
//! be stepped once per tick until it reports [`Step::Done`]. An [`Operation`]
//! additionally produces a value once it has finished.
//!
//! ## Contract
//! - `step()` returning `Continue` may be called again on the next tick
//! - after `Done`, an operation must be `reset()` before it is stepped again;
//!   stepping it anyway fails with `OperationAlreadyFinished`
//! - `reset()` restores the pre-first-step state, or fails with
//!   `ResetNotSupported` for instructions that cannot be replayed
//! - `value()` fails with `OperationNotReady` until the operation is done
//!
//! Instructions never block; long work goes through the task bridge's offload.

mod basic;
mod event;
mod manual;
mod timed;

pub use basic::{Compute, ExecuteOnce, Forever, NextTick, Ready, Repeatedly, WaitForValue, WaitUntil, WaitWhile};
pub use event::{Event, Subscription, WaitForEvent, WaitForEvents};
pub use manual::{ManualInstruction, ManualOperation};
pub use timed::{Periodic, WaitForSeconds};

use crate::error::{Fault, RuntimeError};

/* ===================== Step Result ===================== */

/// Result of executing one step
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// Still running, step again next tick
    Continue,
    /// Finished
    Done,
}

impl Step {
    pub fn is_done(self) -> bool {
        self == Step::Done
    }

    /// `Done` when the condition holds
    pub fn done_if(finished: bool) -> Self {
        if finished {
            Step::Done
        } else {
            Step::Continue
        }
    }
}

/* ===================== Traits ===================== */

pub trait Instruction: Send {
    /// Advance by one tick
    fn step(&mut self) -> Result<Step, Fault>;

    fn is_resettable(&self) -> bool {
        false
    }

    fn reset(&mut self) -> Result<(), RuntimeError> {
        Err(RuntimeError::reset_not_supported(self.name()))
    }

    /// Name used in diagnostics
    fn name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }
}

/// An instruction that produces a value when it finishes
pub trait Operation: Instruction {
    type Output;

    fn is_done(&self) -> bool;

    fn value(&self) -> Result<Self::Output, RuntimeError>;
}

pub type BoxInstruction = Box<dyn Instruction>;
pub type BoxOperation<T> = Box<dyn Operation<Output = T>>;

impl<I: Instruction + ?Sized> Instruction for Box<I> {
    fn step(&mut self) -> Result<Step, Fault> {
        (**self).step()
    }

    fn is_resettable(&self) -> bool {
        (**self).is_resettable()
    }

    fn reset(&mut self) -> Result<(), RuntimeError> {
        (**self).reset()
    }

    fn name(&self) -> &'static str {
        (**self).name()
    }
}

impl<O: Operation + ?Sized> Operation for Box<O> {
    type Output = O::Output;

    fn is_done(&self) -> bool {
        (**self).is_done()
    }

    fn value(&self) -> Result<Self::Output, RuntimeError> {
        (**self).value()
    }
}

/* ===================== Completion ===================== */

/// Finished-value cell shared by operations
///
/// Guards against stepping after completion and against reading a value early.
#[derive(Debug, Clone)]
pub struct Completion<T> {
    value: Option<T>,
}

impl<T> Default for Completion<T> {
    fn default() -> Self {
        Self { value: None }
    }
}

impl<T: Clone> Completion<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail when the owning operation already finished
    pub fn ensure_running(&self, operation: &str) -> Result<(), RuntimeError> {
        if self.value.is_some() {
            return Err(RuntimeError::already_finished(operation));
        }
        Ok(())
    }

    pub fn complete(&mut self, value: T) -> Step {
        self.value = Some(value);
        Step::Done
    }

    pub fn is_done(&self) -> bool {
        self.value.is_some()
    }

    pub fn value(&self) -> Result<T, RuntimeError> {
        self.value.clone().ok_or(RuntimeError::OperationNotReady)
    }

    pub fn clear(&mut self) {
        self.value = None;
    }
}

/* ===================== Blocking Drivers ===================== */

/// Step an instruction until it finishes, returning how many steps it took
///
/// Only for instructions that finish on their own (no external tick needed).
pub fn block_on_instruction<I: Instruction + ?Sized>(instruction: &mut I) -> Result<usize, Fault> {
    let mut steps = 0;
    loop {
        steps += 1;
        if instruction.step()?.is_done() {
            return Ok(steps);
        }
    }
}

/// Step an operation until it finishes and return its value
pub fn block_on_operation<O: Operation + ?Sized>(operation: &mut O) -> Result<O::Output, Fault> {
    block_on_instruction(operation)?;
    Ok(operation.value()?)
}

#[cfg(test)]
mod tests;
