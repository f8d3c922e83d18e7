//! Running a routine inside another coroutine

use super::interrupt::InterruptHandler;
use super::machine::CoroutineMachine;
use super::routine::Routine;
use crate::error::Fault;
use crate::instruction::{Instruction, Step};
use crate::logging::{default_logger, Logger};

/// A routine stepped as an instruction by whichever coroutine yields it
///
/// Faults the nested routine does not handle itself surface from `step`.
/// Dropping the instruction before the routine ended disposes it, so its
/// interrupt handler still runs. Not resettable.
pub struct RoutineInstruction {
    machine: CoroutineMachine,
}

impl RoutineInstruction {
    pub fn new<R: Routine + 'static>(routine: R, interrupt: Option<InterruptHandler>, sink: Logger) -> Self {
        Self {
            machine: CoroutineMachine::new(Box::new(routine), interrupt, sink),
        }
    }
}

pub fn into_instruction<R: Routine + 'static>(routine: R) -> RoutineInstruction {
    RoutineInstruction::new(routine, None, default_logger())
}

impl Instruction for RoutineInstruction {
    fn step(&mut self) -> Result<Step, Fault> {
        let running = self.machine.step().map_err(|fault| {
            self.machine.dispose_from_fault(fault.clone());
            fault
        })?;
        Ok(Step::done_if(!running))
    }
}

impl Drop for RoutineInstruction {
    fn drop(&mut self) {
        self.machine.dispose();
    }
}
