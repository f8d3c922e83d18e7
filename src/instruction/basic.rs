//! Primitive instructions
//!
//! Small building blocks that the combinators and executors are made of.

use super::{Completion, Instruction, Operation, Step};
use crate::error::{Fault, RuntimeError};

/* ===================== Waiting ===================== */

/// Finishes on its first step, so yielding it waits exactly one tick
#[derive(Debug, Clone, Copy, Default)]
pub struct NextTick;

impl Instruction for NextTick {
    fn step(&mut self) -> Result<Step, Fault> {
        Ok(Step::Done)
    }

    fn is_resettable(&self) -> bool {
        true
    }

    fn reset(&mut self) -> Result<(), RuntimeError> {
        Ok(())
    }
}

/// Never finishes
#[derive(Debug, Clone, Copy, Default)]
pub struct Forever;

impl Instruction for Forever {
    fn step(&mut self) -> Result<Step, Fault> {
        Ok(Step::Continue)
    }

    fn is_resettable(&self) -> bool {
        true
    }

    fn reset(&mut self) -> Result<(), RuntimeError> {
        Ok(())
    }
}

/// An operation that has already finished with `value`
#[derive(Debug, Clone)]
pub struct Ready<T> {
    value: T,
}

impl<T> Ready<T> {
    pub fn new(value: T) -> Self {
        Self { value }
    }
}

impl<T: Clone + Send> Instruction for Ready<T> {
    fn step(&mut self) -> Result<Step, Fault> {
        Ok(Step::Done)
    }

    fn is_resettable(&self) -> bool {
        true
    }

    fn reset(&mut self) -> Result<(), RuntimeError> {
        Ok(())
    }
}

impl<T: Clone + Send> Operation for Ready<T> {
    type Output = T;

    fn is_done(&self) -> bool {
        true
    }

    fn value(&self) -> Result<T, RuntimeError> {
        Ok(self.value.clone())
    }
}

/* ===================== Predicates ===================== */

/// Finishes on the first step where the predicate holds
pub struct WaitUntil<F> {
    predicate: F,
}

impl<F: FnMut() -> bool + Send> WaitUntil<F> {
    pub fn new(predicate: F) -> Self {
        Self { predicate }
    }
}

impl<F: FnMut() -> bool + Send> Instruction for WaitUntil<F> {
    fn step(&mut self) -> Result<Step, Fault> {
        Ok(Step::done_if((self.predicate)()))
    }

    fn is_resettable(&self) -> bool {
        true
    }

    fn reset(&mut self) -> Result<(), RuntimeError> {
        Ok(())
    }
}

/// Finishes on the first step where the predicate no longer holds
pub struct WaitWhile<F> {
    predicate: F,
}

impl<F: FnMut() -> bool + Send> WaitWhile<F> {
    pub fn new(predicate: F) -> Self {
        Self { predicate }
    }
}

impl<F: FnMut() -> bool + Send> Instruction for WaitWhile<F> {
    fn step(&mut self) -> Result<Step, Fault> {
        Ok(Step::done_if(!(self.predicate)()))
    }

    fn is_resettable(&self) -> bool {
        true
    }

    fn reset(&mut self) -> Result<(), RuntimeError> {
        Ok(())
    }
}

/// Finishes once `getter` returns `expected`
pub struct WaitForValue<F, T> {
    getter: F,
    expected: T,
}

impl<F, T> WaitForValue<F, T>
where
    F: FnMut() -> T + Send,
    T: PartialEq + Send,
{
    pub fn new(getter: F, expected: T) -> Self {
        Self { getter, expected }
    }
}

impl<F, T> Instruction for WaitForValue<F, T>
where
    F: FnMut() -> T + Send,
    T: PartialEq + Send,
{
    fn step(&mut self) -> Result<Step, Fault> {
        Ok(Step::done_if((self.getter)() == self.expected))
    }

    fn is_resettable(&self) -> bool {
        true
    }

    fn reset(&mut self) -> Result<(), RuntimeError> {
        Ok(())
    }
}

/* ===================== Actions ===================== */

/// Runs an action once, finishing on the same step
pub struct ExecuteOnce<F> {
    action: F,
}

impl<F: FnMut() + Send> ExecuteOnce<F> {
    pub fn new(action: F) -> Self {
        Self { action }
    }
}

impl<F: FnMut() + Send> Instruction for ExecuteOnce<F> {
    fn step(&mut self) -> Result<Step, Fault> {
        (self.action)();
        Ok(Step::Done)
    }

    fn is_resettable(&self) -> bool {
        true
    }

    fn reset(&mut self) -> Result<(), RuntimeError> {
        Ok(())
    }
}

/// Computes a value on its first step
pub struct Compute<F, T> {
    compute: F,
    completion: Completion<T>,
}

impl<F, T> Compute<F, T>
where
    F: FnMut() -> Result<T, Fault> + Send,
    T: Clone + Send,
{
    pub fn new(compute: F) -> Self {
        Self {
            compute,
            completion: Completion::new(),
        }
    }
}

impl<F, T> Instruction for Compute<F, T>
where
    F: FnMut() -> Result<T, Fault> + Send,
    T: Clone + Send,
{
    fn step(&mut self) -> Result<Step, Fault> {
        self.completion.ensure_running(self.name())?;
        let value = (self.compute)()?;
        Ok(self.completion.complete(value))
    }

    fn is_resettable(&self) -> bool {
        true
    }

    fn reset(&mut self) -> Result<(), RuntimeError> {
        self.completion.clear();
        Ok(())
    }
}

impl<F, T> Operation for Compute<F, T>
where
    F: FnMut() -> Result<T, Fault> + Send,
    T: Clone + Send,
{
    type Output = T;

    fn is_done(&self) -> bool {
        self.completion.is_done()
    }

    fn value(&self) -> Result<T, RuntimeError> {
        self.completion.value()
    }
}

type StopCondition = Box<dyn FnMut() -> bool + Send>;

/// Runs an action on every step, forever or until a condition holds
///
/// The action receives how many times it ran before.
pub struct Repeatedly<F> {
    action: F,
    until: Option<StopCondition>,
    runs: u64,
}

impl<F: FnMut(u64) + Send> Repeatedly<F> {
    pub fn new(action: F) -> Self {
        Self {
            action,
            until: None,
            runs: 0,
        }
    }

    /// Stop (without running the action) on the first step where `condition` holds
    pub fn until(mut self, condition: impl FnMut() -> bool + Send + 'static) -> Self {
        self.until = Some(Box::new(condition));
        self
    }

    pub fn runs(&self) -> u64 {
        self.runs
    }
}

impl<F: FnMut(u64) + Send> Instruction for Repeatedly<F> {
    fn step(&mut self) -> Result<Step, Fault> {
        if let Some(until) = self.until.as_mut() {
            if until() {
                return Ok(Step::Done);
            }
        }
        (self.action)(self.runs);
        self.runs += 1;
        Ok(Step::Continue)
    }

    fn is_resettable(&self) -> bool {
        true
    }

    fn reset(&mut self) -> Result<(), RuntimeError> {
        self.runs = 0;
        Ok(())
    }
}
