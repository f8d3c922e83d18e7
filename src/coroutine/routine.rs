//! Routine authoring surface

use super::interrupt::InterruptHandler;
use crate::error::Fault;
use crate::instruction::{BoxInstruction, Instruction};
use std::fmt;

/// One item produced by a routine
pub enum Yielded {
    /// Suspend for exactly one tick
    NextTick,
    /// Suspend until the instruction finishes
    Instruction(BoxInstruction),
    /// Register the interrupt handler; only honoured as the very first item
    Interrupt(InterruptHandler),
}

impl Yielded {
    pub fn wait<I: Instruction + 'static>(instruction: I) -> Self {
        Yielded::Instruction(Box::new(instruction))
    }
}

impl fmt::Debug for Yielded {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Yielded::NextTick => write!(f, "NextTick"),
            Yielded::Instruction(instruction) => write!(f, "Instruction({})", instruction.name()),
            Yielded::Interrupt(handler) => write!(f, "Interrupt({:?})", handler),
        }
    }
}

/// A lazy, possibly infinite sequence of suspension points
///
/// `resume` returns `Ok(None)` once the routine is exhausted; an `Err` faults
/// the coroutine running it.
pub trait Routine: Send {
    fn resume(&mut self) -> Result<Option<Yielded>, Fault>;
}

pub type BoxRoutine = Box<dyn Routine>;

impl<R: Routine + ?Sized> Routine for Box<R> {
    fn resume(&mut self) -> Result<Option<Yielded>, Fault> {
        (**self).resume()
    }
}

/* ===================== Adapters ===================== */

/// Routine backed by a closure holding its own state
pub struct FnRoutine<F> {
    next: F,
}

impl<F> Routine for FnRoutine<F>
where
    F: FnMut() -> Result<Option<Yielded>, Fault> + Send,
{
    fn resume(&mut self) -> Result<Option<Yielded>, Fault> {
        (self.next)()
    }
}

/// Build a routine from a "next item" closure
pub fn routine_fn<F>(next: F) -> FnRoutine<F>
where
    F: FnMut() -> Result<Option<Yielded>, Fault> + Send,
{
    FnRoutine { next }
}

/// Routine that yields the items of an iterator
pub struct IterRoutine<I> {
    items: I,
}

impl<I> Routine for IterRoutine<I>
where
    I: Iterator<Item = Yielded> + Send,
{
    fn resume(&mut self) -> Result<Option<Yielded>, Fault> {
        Ok(self.items.next())
    }
}

pub fn from_iter<T>(items: T) -> IterRoutine<T::IntoIter>
where
    T: IntoIterator<Item = Yielded>,
    T::IntoIter: Send,
{
    IterRoutine {
        items: items.into_iter(),
    }
}

/// Routine that waits for one instruction and then ends
pub fn single<I: Instruction + 'static>(instruction: I) -> IterRoutine<std::iter::Once<Yielded>> {
    IterRoutine {
        items: std::iter::once(Yielded::wait(instruction)),
    }
}
