//! Race combinators
//!
//! Children are stepped in order each tick and the first one to finish wins.
//! The first operand is checked first, so it wins ties; once it finishes the
//! later operands are not stepped in that tick.

use crate::error::{Fault, RuntimeError};
use crate::instruction::{BoxInstruction, BoxOperation, Completion, Instruction, Operation, Step};
use serde::{Deserialize, Serialize};

/// Which operand of a binary race finished first
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Winner {
    First,
    Second,
}

/* ===================== Or ===================== */

pub struct Or<A, B> {
    first: A,
    second: B,
    completion: Completion<Winner>,
}

impl<A: Instruction, B: Instruction> Or<A, B> {
    pub fn new(first: A, second: B) -> Self {
        Self {
            first,
            second,
            completion: Completion::new(),
        }
    }

    pub(crate) fn first(&self) -> &A {
        &self.first
    }

    pub(crate) fn second(&self) -> &B {
        &self.second
    }
}

impl<A: Instruction, B: Instruction> Instruction for Or<A, B> {
    fn step(&mut self) -> Result<Step, Fault> {
        self.completion.ensure_running(self.name())?;
        if self.first.step()?.is_done() {
            return Ok(self.completion.complete(Winner::First));
        }
        if self.second.step()?.is_done() {
            return Ok(self.completion.complete(Winner::Second));
        }
        Ok(Step::Continue)
    }

    fn is_resettable(&self) -> bool {
        self.first.is_resettable() && self.second.is_resettable()
    }

    fn reset(&mut self) -> Result<(), RuntimeError> {
        self.first.reset()?;
        self.second.reset()?;
        self.completion.clear();
        Ok(())
    }
}

impl<A: Instruction, B: Instruction> Operation for Or<A, B> {
    type Output = Winner;

    fn is_done(&self) -> bool {
        self.completion.is_done()
    }

    fn value(&self) -> Result<Winner, RuntimeError> {
        self.completion.value()
    }
}

/* ===================== Value Race ===================== */

/// Race of two operations producing the winner's value
pub struct RaceValue<A, B> {
    race: Or<A, B>,
}

impl<A, B, T> RaceValue<A, B>
where
    A: Operation<Output = T>,
    B: Operation<Output = T>,
{
    pub fn new(first: A, second: B) -> Self {
        Self {
            race: Or::new(first, second),
        }
    }

    pub fn winner(&self) -> Result<Winner, RuntimeError> {
        self.race.value()
    }
}

impl<A, B, T> Instruction for RaceValue<A, B>
where
    A: Operation<Output = T>,
    B: Operation<Output = T>,
{
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

impl<A, B, T> Operation for RaceValue<A, B>
where
    A: Operation<Output = T>,
    B: Operation<Output = T>,
{
    type Output = T;

    fn is_done(&self) -> bool {
        self.race.is_done()
    }

    fn value(&self) -> Result<T, RuntimeError> {
        match self.race.value()? {
            Winner::First => self.race.first().value(),
            Winner::Second => self.race.second().value(),
        }
    }
}

/* ===================== First ===================== */

/// A single contender reporting its fixed index
struct Indexed {
    inner: BoxInstruction,
    index: usize,
    completion: Completion<usize>,
}

impl Instruction for Indexed {
    fn step(&mut self) -> Result<Step, Fault> {
        self.completion.ensure_running(self.name())?;
        match self.inner.step()? {
            Step::Continue => Ok(Step::Continue),
            Step::Done => Ok(self.completion.complete(self.index)),
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

impl Operation for Indexed {
    type Output = usize;

    fn is_done(&self) -> bool {
        self.completion.is_done()
    }

    fn value(&self) -> Result<usize, RuntimeError> {
        self.completion.value()
    }
}

/// One fold step: the earlier contenders' race against the next one
struct RaceIndex {
    earlier: BoxOperation<usize>,
    later: BoxInstruction,
    later_index: usize,
    completion: Completion<usize>,
}

impl Instruction for RaceIndex {
    fn step(&mut self) -> Result<Step, Fault> {
        self.completion.ensure_running(self.name())?;
        if self.earlier.step()?.is_done() {
            let index = self.earlier.value()?;
            return Ok(self.completion.complete(index));
        }
        if self.later.step()?.is_done() {
            return Ok(self.completion.complete(self.later_index));
        }
        Ok(Step::Continue)
    }

    fn is_resettable(&self) -> bool {
        self.earlier.is_resettable() && self.later.is_resettable()
    }

    fn reset(&mut self) -> Result<(), RuntimeError> {
        self.earlier.reset()?;
        self.later.reset()?;
        self.completion.clear();
        Ok(())
    }
}

impl Operation for RaceIndex {
    type Output = usize;

    fn is_done(&self) -> bool {
        self.completion.is_done()
    }

    fn value(&self) -> Result<usize, RuntimeError> {
        self.completion.value()
    }
}

/// N-ary race producing the index of the first instruction to finish
///
/// Built as a left fold of binary races, so ties favour the lowest index.
pub struct First {
    race: BoxOperation<usize>,
    contenders: usize,
}

impl First {
    pub fn new(instructions: Vec<BoxInstruction>) -> Result<Self, RuntimeError> {
        let contenders = instructions.len();
        let mut iter = instructions.into_iter();
        let head = iter.next().ok_or(RuntimeError::EmptyCombinator)?;

        let mut race: BoxOperation<usize> = Box::new(Indexed {
            inner: head,
            index: 0,
            completion: Completion::new(),
        });
        for (offset, later) in iter.enumerate() {
            race = Box::new(RaceIndex {
                earlier: race,
                later,
                later_index: offset + 1,
                completion: Completion::new(),
            });
        }

        Ok(Self { race, contenders })
    }

    pub fn contenders(&self) -> usize {
        self.contenders
    }
}

impl Instruction for First {
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

impl Operation for First {
    type Output = usize;

    fn is_done(&self) -> bool {
        self.race.is_done()
    }

    fn value(&self) -> Result<usize, RuntimeError> {
        self.race.value()
    }
}
