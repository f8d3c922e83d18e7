use super::interrupt::InterruptHandler;
use super::machine::CoroutineMachine;
use super::routine::BoxRoutine;
use crate::error::{Fault, RuntimeError};
use crate::instruction::{Instruction, Step};
use crate::logging::Logger;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CoroutineState {
    Running,
    Paused,
    Finished,
    /// Finished because of a fault
    Faulted,
}

/// Caller-side view of a coroutine
///
/// Clones share the same coroutine. A handle can query state, pause, or
/// dispose, but stepping belongs to the executor the coroutine runs on.
///
/// A handle is also an [`Instruction`] that finishes when the coroutine does,
/// so one coroutine can wait for another. Waiting on a coroutine that faulted
/// raises [`RuntimeError::CoroutineFaulted`].
#[derive(Clone)]
pub struct CoroutineHandle {
    machine: Arc<CoroutineMachine>,
}

impl CoroutineHandle {
    /// Wrap a routine; it does not run until submitted to an executor
    pub fn new(routine: BoxRoutine, interrupt: Option<InterruptHandler>, sink: Logger) -> Self {
        Self {
            machine: Arc::new(CoroutineMachine::new(routine, interrupt, sink)),
        }
    }

    pub fn id(&self) -> Uuid {
        self.machine.id()
    }

    pub fn state(&self) -> CoroutineState {
        if self.machine.is_finished() {
            if self.machine.fault().is_some() {
                CoroutineState::Faulted
            } else {
                CoroutineState::Finished
            }
        } else if self.machine.is_paused() {
            CoroutineState::Paused
        } else {
            CoroutineState::Running
        }
    }

    pub fn is_finished(&self) -> bool {
        self.machine.is_finished()
    }

    pub fn has_fault(&self) -> bool {
        self.machine.fault().is_some()
    }

    /// The most recent fault the coroutine captured
    pub fn fault(&self) -> Option<Fault> {
        self.machine.fault()
    }

    /// Stop advancing until [`resume`](Self::resume); the executor keeps it registered
    pub fn pause(&self) {
        self.machine.set_paused(true);
    }

    pub fn resume(&self) {
        self.machine.set_paused(false);
    }

    pub fn is_paused(&self) -> bool {
        self.machine.is_paused()
    }

    /// Finish now and fire the interrupt handler with `Disposed`
    ///
    /// Idempotent. The executor drops the coroutine at the end of its next tick.
    pub fn dispose(&self) {
        self.machine.dispose();
    }

    pub fn ptr_eq(&self, other: &CoroutineHandle) -> bool {
        Arc::ptr_eq(&self.machine, &other.machine)
    }

    pub(crate) fn machine(&self) -> &CoroutineMachine {
        &self.machine
    }
}

impl Instruction for CoroutineHandle {
    fn step(&mut self) -> Result<Step, Fault> {
        match self.state() {
            CoroutineState::Faulted => match self.machine.fault() {
                Some(fault) => Err(RuntimeError::CoroutineFaulted(fault).into()),
                None => Ok(Step::Done),
            },
            CoroutineState::Finished => Ok(Step::Done),
            CoroutineState::Running | CoroutineState::Paused => Ok(Step::Continue),
        }
    }
}

impl fmt::Debug for CoroutineHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CoroutineHandle")
            .field("id", &self.id())
            .field("state", &self.state())
            .finish()
    }
}
