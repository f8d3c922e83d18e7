//! Sequencing combinators
//!
//! The second instruction is stepped in the same tick the first one finishes.

use crate::error::{Fault, RuntimeError};
use crate::instruction::{Completion, Instruction, Operation, Step};

/* ===================== Then ===================== */

/// Steps `first` to completion, then `second`
///
/// Resettable iff both children are. When `second` is an operation, so is this.
pub struct Then<A, B> {
    first: A,
    second: B,
    first_done: bool,
}

impl<A: Instruction, B: Instruction> Then<A, B> {
    pub fn new(first: A, second: B) -> Self {
        Self {
            first,
            second,
            first_done: false,
        }
    }
}

impl<A: Instruction, B: Instruction> Instruction for Then<A, B> {
    fn step(&mut self) -> Result<Step, Fault> {
        if !self.first_done {
            if self.first.step()? == Step::Continue {
                return Ok(Step::Continue);
            }
            self.first_done = true;
        }
        self.second.step()
    }

    fn is_resettable(&self) -> bool {
        self.first.is_resettable() && self.second.is_resettable()
    }

    fn reset(&mut self) -> Result<(), RuntimeError> {
        self.first.reset()?;
        self.second.reset()?;
        self.first_done = false;
        Ok(())
    }
}

impl<A: Instruction, B: Operation> Operation for Then<A, B> {
    type Output = B::Output;

    fn is_done(&self) -> bool {
        self.first_done && self.second.is_done()
    }

    fn value(&self) -> Result<B::Output, RuntimeError> {
        if !self.first_done {
            return Err(RuntimeError::OperationNotReady);
        }
        self.second.value()
    }
}

/* ===================== Lazily Built Second Step ===================== */

/// Steps `first`, then builds the second instruction with `make` and steps it
///
/// The second instruction is rebuilt after every reset, so only `first` has to
/// be resettable.
pub struct ThenWith<A, F, B> {
    first: A,
    make: F,
    second: Option<B>,
}

impl<A, F, B> ThenWith<A, F, B>
where
    A: Instruction,
    F: FnMut() -> B + Send,
    B: Instruction,
{
    pub fn new(first: A, make: F) -> Self {
        Self {
            first,
            make,
            second: None,
        }
    }
}

impl<A, F, B> Instruction for ThenWith<A, F, B>
where
    A: Instruction,
    F: FnMut() -> B + Send,
    B: Instruction,
{
    fn step(&mut self) -> Result<Step, Fault> {
        if self.second.is_none() {
            if self.first.step()? == Step::Continue {
                return Ok(Step::Continue);
            }
            self.second = Some((self.make)());
        }
        match self.second.as_mut() {
            Some(second) => second.step(),
            None => Ok(Step::Continue),
        }
    }

    fn is_resettable(&self) -> bool {
        self.first.is_resettable()
    }

    fn reset(&mut self) -> Result<(), RuntimeError> {
        self.first.reset()?;
        self.second = None;
        Ok(())
    }
}

impl<A, F, B> Operation for ThenWith<A, F, B>
where
    A: Instruction,
    F: FnMut() -> B + Send,
    B: Operation,
{
    type Output = B::Output;

    fn is_done(&self) -> bool {
        self.second.as_ref().is_some_and(|s| s.is_done())
    }

    fn value(&self) -> Result<B::Output, RuntimeError> {
        match &self.second {
            Some(second) => second.value(),
            None => Err(RuntimeError::OperationNotReady),
        }
    }
}

/// Steps `first`, then builds the second instruction from its value
pub struct AndThen<A, F, B> {
    first: A,
    make: F,
    second: Option<B>,
}

impl<A, F, B> AndThen<A, F, B>
where
    A: Operation,
    F: FnMut(A::Output) -> B + Send,
    B: Instruction,
{
    pub fn new(first: A, make: F) -> Self {
        Self {
            first,
            make,
            second: None,
        }
    }
}

impl<A, F, B> Instruction for AndThen<A, F, B>
where
    A: Operation,
    F: FnMut(A::Output) -> B + Send,
    B: Instruction,
{
    fn step(&mut self) -> Result<Step, Fault> {
        if self.second.is_none() {
            if self.first.step()? == Step::Continue {
                return Ok(Step::Continue);
            }
            let value = self.first.value()?;
            self.second = Some((self.make)(value));
        }
        match self.second.as_mut() {
            Some(second) => second.step(),
            None => Ok(Step::Continue),
        }
    }

    fn is_resettable(&self) -> bool {
        self.first.is_resettable()
    }

    fn reset(&mut self) -> Result<(), RuntimeError> {
        self.first.reset()?;
        self.second = None;
        Ok(())
    }
}

impl<A, F, B> Operation for AndThen<A, F, B>
where
    A: Operation,
    F: FnMut(A::Output) -> B + Send,
    B: Operation,
{
    type Output = B::Output;

    fn is_done(&self) -> bool {
        self.second.as_ref().is_some_and(|s| s.is_done())
    }

    fn value(&self) -> Result<B::Output, RuntimeError> {
        match &self.second {
            Some(second) => second.value(),
            None => Err(RuntimeError::OperationNotReady),
        }
    }
}

/* ===================== Side Effects ===================== */

/// Runs `action` in the tick `inner` finishes
pub struct ThenDo<A, F> {
    inner: A,
    action: F,
}

impl<A: Instruction, F: FnMut() + Send> ThenDo<A, F> {
    pub fn new(inner: A, action: F) -> Self {
        Self { inner, action }
    }
}

impl<A: Instruction, F: FnMut() + Send> Instruction for ThenDo<A, F> {
    fn step(&mut self) -> Result<Step, Fault> {
        let step = self.inner.step()?;
        if step.is_done() {
            (self.action)();
        }
        Ok(step)
    }

    fn is_resettable(&self) -> bool {
        self.inner.is_resettable()
    }

    fn reset(&mut self) -> Result<(), RuntimeError> {
        self.inner.reset()
    }
}

impl<A: Operation, F: FnMut() + Send> Operation for ThenDo<A, F> {
    type Output = A::Output;

    fn is_done(&self) -> bool {
        self.inner.is_done()
    }

    fn value(&self) -> Result<A::Output, RuntimeError> {
        self.inner.value()
    }
}

/// Hands the finished value of `inner` to `observer`, passing it through unchanged
pub struct Inspect<A, F> {
    inner: A,
    observer: F,
}

impl<A, F> Inspect<A, F>
where
    A: Operation,
    F: FnMut(&A::Output) + Send,
{
    pub fn new(inner: A, observer: F) -> Self {
        Self { inner, observer }
    }
}

impl<A, F> Instruction for Inspect<A, F>
where
    A: Operation,
    F: FnMut(&A::Output) + Send,
{
    fn step(&mut self) -> Result<Step, Fault> {
        let step = self.inner.step()?;
        if step.is_done() {
            let value = self.inner.value()?;
            (self.observer)(&value);
        }
        Ok(step)
    }

    fn is_resettable(&self) -> bool {
        self.inner.is_resettable()
    }

    fn reset(&mut self) -> Result<(), RuntimeError> {
        self.inner.reset()
    }
}

impl<A, F> Operation for Inspect<A, F>
where
    A: Operation,
    F: FnMut(&A::Output) + Send,
{
    type Output = A::Output;

    fn is_done(&self) -> bool {
        self.inner.is_done()
    }

    fn value(&self) -> Result<A::Output, RuntimeError> {
        self.inner.value()
    }
}

/* ===================== Returns ===================== */

/// Turns an instruction into an operation producing a fixed value
pub struct Returns<A, T> {
    inner: A,
    value: T,
    completion: Completion<T>,
}

impl<A: Instruction, T: Clone + Send> Returns<A, T> {
    pub fn new(inner: A, value: T) -> Self {
        Self {
            inner,
            value,
            completion: Completion::new(),
        }
    }
}

impl<A: Instruction, T: Clone + Send> Instruction for Returns<A, T> {
    fn step(&mut self) -> Result<Step, Fault> {
        self.completion.ensure_running(self.name())?;
        match self.inner.step()? {
            Step::Continue => Ok(Step::Continue),
            Step::Done => Ok(self.completion.complete(self.value.clone())),
        }
    }

    fn is_resettable(&self) -> bool {
        self.inner.is_resettable()
    }

    fn reset(&mut self) -> Result<(), RuntimeError> {
        self.inner.reset()?;
        self.completion.clear();
        Ok(())
    }
}

impl<A: Instruction, T: Clone + Send> Operation for Returns<A, T> {
    type Output = T;

    fn is_done(&self) -> bool {
        self.completion.is_done()
    }

    fn value(&self) -> Result<T, RuntimeError> {
        self.completion.value()
    }
}

/// Turns an instruction into an operation whose value is computed when it finishes
pub struct ReturnsWith<A, F, T> {
    inner: A,
    produce: F,
    completion: Completion<T>,
}

impl<A, F, T> ReturnsWith<A, F, T>
where
    A: Instruction,
    F: FnMut() -> T + Send,
    T: Clone + Send,
{
    pub fn new(inner: A, produce: F) -> Self {
        Self {
            inner,
            produce,
            completion: Completion::new(),
        }
    }
}

impl<A, F, T> Instruction for ReturnsWith<A, F, T>
where
    A: Instruction,
    F: FnMut() -> T + Send,
    T: Clone + Send,
{
    fn step(&mut self) -> Result<Step, Fault> {
        self.completion.ensure_running(self.name())?;
        match self.inner.step()? {
            Step::Continue => Ok(Step::Continue),
            Step::Done => {
                let value = (self.produce)();
                Ok(self.completion.complete(value))
            }
        }
    }

    fn is_resettable(&self) -> bool {
        self.inner.is_resettable()
    }

    fn reset(&mut self) -> Result<(), RuntimeError> {
        self.inner.reset()?;
        self.completion.clear();
        Ok(())
    }
}

impl<A, F, T> Operation for ReturnsWith<A, F, T>
where
    A: Instruction,
    F: FnMut() -> T + Send,
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
