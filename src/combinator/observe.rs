//! Observing generators
//!
//! A [`Generator`] is an instruction with a current value. [`ForEach`] hands
//! that value to a callback on every step; [`OnChange`] only when it differs
//! from the value seen on the previous step.

use crate::error::{Fault, RuntimeError};
use crate::instruction::{Instruction, Step};

pub trait Generator: Instruction {
    type Item;

    /// Value after the most recent step
    fn current(&mut self) -> Self::Item;
}

/// Samples a function on every step and never finishes
pub struct Sample<F> {
    sample: F,
}

impl<F, T> Sample<F>
where
    F: FnMut() -> T + Send,
{
    pub fn new(sample: F) -> Self {
        Self { sample }
    }
}

impl<F, T> Instruction for Sample<F>
where
    F: FnMut() -> T + Send,
{
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

impl<F, T> Generator for Sample<F>
where
    F: FnMut() -> T + Send,
{
    type Item = T;

    fn current(&mut self) -> T {
        (self.sample)()
    }
}

/// A generator that finishes on its first step, its value computed on demand
pub struct FromFn<F> {
    produce: F,
}

impl<F, T> FromFn<F>
where
    F: FnMut() -> T + Send,
{
    pub fn new(produce: F) -> Self {
        Self { produce }
    }
}

impl<F, T> Instruction for FromFn<F>
where
    F: FnMut() -> T + Send,
{
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

impl<F, T> Generator for FromFn<F>
where
    F: FnMut() -> T + Send,
{
    type Item = T;

    fn current(&mut self) -> T {
        (self.produce)()
    }
}

/* ===================== Callbacks ===================== */

pub struct ForEach<G, F> {
    generator: G,
    callback: F,
}

impl<G, F> ForEach<G, F>
where
    G: Generator,
    F: FnMut(G::Item) + Send,
{
    pub fn new(generator: G, callback: F) -> Self {
        Self {
            generator,
            callback,
        }
    }
}

impl<G, F> Instruction for ForEach<G, F>
where
    G: Generator,
    F: FnMut(G::Item) + Send,
{
    fn step(&mut self) -> Result<Step, Fault> {
        let step = self.generator.step()?;
        (self.callback)(self.generator.current());
        Ok(step)
    }

    fn is_resettable(&self) -> bool {
        self.generator.is_resettable()
    }

    fn reset(&mut self) -> Result<(), RuntimeError> {
        self.generator.reset()
    }
}

pub struct OnChange<G: Generator, F> {
    generator: G,
    callback: F,
    last: Option<G::Item>,
}

impl<G, F> OnChange<G, F>
where
    G: Generator,
    G::Item: PartialEq + Clone + Send,
    F: FnMut(G::Item) + Send,
{
    pub fn new(generator: G, callback: F) -> Self {
        Self {
            generator,
            callback,
            last: None,
        }
    }
}

impl<G, F> Instruction for OnChange<G, F>
where
    G: Generator,
    G::Item: PartialEq + Clone + Send,
    F: FnMut(G::Item) + Send,
{
    fn step(&mut self) -> Result<Step, Fault> {
        let step = self.generator.step()?;
        let value = self.generator.current();
        if self.last.as_ref() != Some(&value) {
            self.last = Some(value.clone());
            (self.callback)(value);
        }
        Ok(step)
    }

    fn is_resettable(&self) -> bool {
        self.generator.is_resettable()
    }

    fn reset(&mut self) -> Result<(), RuntimeError> {
        self.generator.reset()?;
        self.last = None;
        Ok(())
    }
}
