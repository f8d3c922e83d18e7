//! Convenience helpers over any [`Executor`]

use super::Executor;
use crate::combinator::InstructionExt;
use crate::coroutine::{single, CoroutineHandle, InterruptHandler, Routine};
use crate::instruction::{ExecuteOnce, Instruction, ManualOperation, Repeatedly, WaitUntil};
use crate::time::Clock;

pub trait ExecutorExt: Executor {
    fn start<R: Routine + 'static>(&self, routine: R) -> CoroutineHandle {
        self.start_boxed(Box::new(routine), None)
    }

    /// Start with an interrupt handler registered up front
    fn start_with<R: Routine + 'static>(&self, routine: R, interrupt: InterruptHandler) -> CoroutineHandle {
        self.start_boxed(Box::new(routine), Some(interrupt))
    }

    /// Run a single instruction as its own coroutine
    fn run<I: Instruction + 'static>(&self, instruction: I) -> CoroutineHandle {
        self.start(single(instruction))
    }

    /// Run `action` once `instruction` finished
    fn wait_and_do<I, F>(&self, instruction: I, action: F) -> CoroutineHandle
    where
        I: Instruction + 'static,
        F: FnOnce() + Send + 'static,
    {
        let mut action = Some(action);
        self.run(instruction.then_do(move || {
            if let Some(action) = action.take() {
                action();
            }
        }))
    }

    fn wait_until<P, F>(&self, predicate: P, action: F) -> CoroutineHandle
    where
        P: FnMut() -> bool + Send + 'static,
        F: FnOnce() + Send + 'static,
    {
        self.wait_and_do(WaitUntil::new(predicate), action)
    }

    /// Run `action` on every tick until the coroutine is disposed
    fn execute_continuously<F>(&self, mut action: F) -> CoroutineHandle
    where
        F: FnMut() + Send + 'static,
    {
        self.run(Repeatedly::new(move |_| action()))
    }

    /// Run `work` inside a coroutine; the result arrives through the operation
    fn enqueue<T, F>(&self, work: F) -> ManualOperation<T>
    where
        T: Clone + Send + 'static,
        F: FnOnce() -> T + Send + 'static,
    {
        let result = ManualOperation::new();
        let slot = result.clone();
        let mut work = Some(work);
        self.run(ExecuteOnce::new(move || {
            if let Some(work) = work.take() {
                slot.set_value(work());
            }
        }));
        result
    }

    /// Run `instruction` for at most `seconds` of `clock`
    fn start_with_time_limit<I: Instruction + 'static>(&self, instruction: I, seconds: f64, clock: Clock) -> CoroutineHandle {
        self.run(instruction.with_time_limit(seconds, clock))
    }
}

impl<E: Executor + ?Sized> ExecutorExt for E {}
