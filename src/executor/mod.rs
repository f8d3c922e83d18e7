//! Executors
//!
//! An executor owns the scheduling lifecycle of the coroutines submitted to it
//! and steps each of them once per tick, in submission order.
//!
//! ## Flavours
//! - [`RegistryExecutor`]: ticked by the caller; reports the first fault that
//!   escaped a coroutine as a [`TickError`] after finishing the tick
//! - [`SafeExecutor`]: ticked by the caller; logs escaped faults and never fails
//! - [`ThreadExecutor`]: ticks itself on a dedicated thread
//! - [`SingleExecutor`]: holds at most one coroutine
//!
//! Submission is thread-safe everywhere. A coroutine submitted during a tick is
//! first stepped on the next one; a finished coroutine is dropped at the end of
//! the tick that noticed.

mod ext;
mod registry;
mod safe;
mod single;
mod thread;

pub use ext::ExecutorExt;
pub use registry::{RegistryExecutor, RegistryExecutorBuilder};
pub use safe::SafeExecutor;
pub use single::{SingleExecutor, SingleExecutorBuilder};
pub use thread::ThreadExecutor;

use crate::coroutine::{BoxRoutine, CoroutineHandle, InterruptHandler};
use crate::error::Fault;
use crate::logging::Logger;
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use thiserror::Error;
use uuid::Uuid;

/// A fault that escaped a coroutine during a tick
#[derive(Debug, Error)]
pub enum TickError {
    #[error("coroutine {id} (position {index}) faulted: {fault}")]
    Faulted { id: Uuid, index: usize, fault: Fault },
}

impl TickError {
    pub fn fault(&self) -> &Fault {
        match self {
            TickError::Faulted { fault, .. } => fault,
        }
    }
}

pub trait Executor: Send + Sync {
    /// Register a coroutine; a coroutine can only be submitted once
    fn submit(&self, coroutine: CoroutineHandle);

    /// Dispose every coroutine, pending ones included
    fn stop_all(&self);

    /// Coroutines submitted and not yet dropped
    fn count(&self) -> usize;

    /// Coroutines dropped after finishing, for any reason
    fn finished_count(&self) -> u64;

    /// Sink handed to the coroutines this executor creates
    fn logger(&self) -> Logger;

    fn start_boxed(&self, routine: BoxRoutine, interrupt: Option<InterruptHandler>) -> CoroutineHandle {
        let coroutine = CoroutineHandle::new(routine, interrupt, self.logger());
        self.submit(coroutine.clone());
        coroutine
    }
}

/// An executor the caller drives by calling [`tick`](ManualExecutor::tick)
pub trait ManualExecutor: Executor {
    fn tick(&self) -> Result<(), TickError>;
}

/* ===================== Stepping ===================== */

/// Step one coroutine, turning a panic into a fault when asked to
pub(crate) fn step_guarded(coroutine: &CoroutineHandle, catch_panics: bool) -> Result<bool, Fault> {
    if !catch_panics {
        return coroutine.machine().step();
    }
    match panic::catch_unwind(AssertUnwindSafe(|| coroutine.machine().step())) {
        Ok(result) => result,
        Err(payload) => Err(Fault::msg(format!(
            "coroutine panicked: {}",
            panic_message(payload.as_ref())
        ))),
    }
}

pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

#[cfg(test)]
mod tests;
