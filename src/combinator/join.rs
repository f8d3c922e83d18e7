//! Join combinators
//!
//! - [`And`]: each child finishes on its own; done once all are done
//! - [`With`]: both children stepped every tick; done only in a tick where
//!   both report done together
//! - [`join_all`]: n-ary `And`, first fault propagates immediately
//! - [`AllSettled`]: n-ary fail-soft join that aggregates faults

use crate::error::{AggregateFault, Fault, RuntimeError};
use crate::instruction::{BoxInstruction, Instruction, Step};

/* ===================== And ===================== */

pub struct And<A, B> {
    first: A,
    second: B,
    first_done: bool,
    second_done: bool,
}

impl<A: Instruction, B: Instruction> And<A, B> {
    pub fn new(first: A, second: B) -> Self {
        Self {
            first,
            second,
            first_done: false,
            second_done: false,
        }
    }
}

impl<A: Instruction, B: Instruction> Instruction for And<A, B> {
    fn step(&mut self) -> Result<Step, Fault> {
        if !self.first_done {
            self.first_done = self.first.step()?.is_done();
        }
        if !self.second_done {
            self.second_done = self.second.step()?.is_done();
        }
        Ok(Step::done_if(self.first_done && self.second_done))
    }

    fn is_resettable(&self) -> bool {
        self.first.is_resettable() && self.second.is_resettable()
    }

    fn reset(&mut self) -> Result<(), RuntimeError> {
        self.first.reset()?;
        self.second.reset()?;
        self.first_done = false;
        self.second_done = false;
        Ok(())
    }
}

/* ===================== With ===================== */

/// Steps both children every tick, even after one of them reported done
///
/// Children must tolerate being stepped after finishing (predicates, clocks,
/// manual triggers); operations guarded by `Completion` do not.
pub struct With<A, B> {
    first: A,
    second: B,
}

impl<A: Instruction, B: Instruction> With<A, B> {
    pub fn new(first: A, second: B) -> Self {
        Self { first, second }
    }
}

impl<A: Instruction, B: Instruction> Instruction for With<A, B> {
    fn step(&mut self) -> Result<Step, Fault> {
        let first = self.first.step()?;
        let second = self.second.step()?;
        Ok(Step::done_if(first.is_done() && second.is_done()))
    }

    fn is_resettable(&self) -> bool {
        self.first.is_resettable() && self.second.is_resettable()
    }

    fn reset(&mut self) -> Result<(), RuntimeError> {
        self.first.reset()?;
        self.second.reset()
    }
}

/* ===================== N-ary ===================== */

/// Fold `instructions` into nested [`And`]s
pub fn join_all(instructions: Vec<BoxInstruction>) -> Result<BoxInstruction, RuntimeError> {
    let mut iter = instructions.into_iter();
    let mut joined = iter.next().ok_or(RuntimeError::EmptyCombinator)?;
    for next in iter {
        joined = Box::new(And::new(joined, next));
    }
    Ok(joined)
}

/// Runs every child to completion even when some of them fault
///
/// Faults are collected in the order observed and raised together as one
/// `Aggregate` once every child has stopped. Cancellation and stop signals
/// are not aggregated: they propagate as soon as they are seen.
pub struct AllSettled {
    children: Vec<Settling>,
    faults: Vec<Fault>,
}

struct Settling {
    instruction: BoxInstruction,
    settled: bool,
}

impl AllSettled {
    pub fn new(instructions: Vec<BoxInstruction>) -> Self {
        Self {
            children: instructions
                .into_iter()
                .map(|instruction| Settling {
                    instruction,
                    settled: false,
                })
                .collect(),
            faults: Vec::new(),
        }
    }

    /// Faults collected so far
    pub fn faults(&self) -> &[Fault] {
        &self.faults
    }
}

impl Instruction for AllSettled {
    fn step(&mut self) -> Result<Step, Fault> {
        for child in self.children.iter_mut().filter(|c| !c.settled) {
            match child.instruction.step() {
                Ok(Step::Continue) => {}
                Ok(Step::Done) => child.settled = true,
                Err(fault) if fault.is_cancelled() || fault.is_stop_signal() => {
                    child.settled = true;
                    return Err(fault);
                }
                Err(fault) => {
                    child.settled = true;
                    self.faults.push(fault);
                }
            }
        }

        if self.children.iter().any(|c| !c.settled) {
            return Ok(Step::Continue);
        }
        if self.faults.is_empty() {
            return Ok(Step::Done);
        }
        Err(RuntimeError::Aggregate(AggregateFault {
            faults: self.faults.clone(),
        })
        .into())
    }

    fn is_resettable(&self) -> bool {
        self.children.iter().all(|c| c.instruction.is_resettable())
    }

    fn reset(&mut self) -> Result<(), RuntimeError> {
        for child in &mut self.children {
            child.instruction.reset()?;
            child.settled = false;
        }
        self.faults.clear();
        Ok(())
    }
}
