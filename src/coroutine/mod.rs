//! Coroutines
//!
//! A [`Routine`] is a lazy sequence of [`Yielded`] items. A coroutine drives one
//! routine a single suspension point per executor tick:
//!
//! ```text
//!   tick ──► step current instruction ──► Continue ──► stay suspended
//!                      │
//!                      └─► Done ──► resume routine ──► next item
//! ```
//!
//! The first item a routine yields may be an [`InterruptHandler`], called once
//! when the coroutine is disposed, faults, or (opt-in) ends normally.
//!
//! Callers only ever hold a [`CoroutineHandle`]; the executor the coroutine was
//! submitted to is the only thing that steps it.

mod handle;
mod interrupt;
mod machine;
mod nested;
mod routine;

pub use handle::{CoroutineHandle, CoroutineState};
pub use interrupt::{InterruptHandler, InterruptReason, InvokeOption};
pub use nested::{into_instruction, RoutineInstruction};
pub use routine::{from_iter, routine_fn, single, BoxRoutine, FnRoutine, IterRoutine, Routine, Yielded};

pub(crate) use machine::CoroutineMachine;

#[cfg(test)]
mod tests;
