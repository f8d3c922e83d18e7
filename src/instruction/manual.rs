//! Instructions completed from the outside
//!
//! Both types are cheap handles: clone one, yield a copy, and finish it from
//! any thread through the copy you kept.

use super::{Instruction, Operation, Step};
use crate::error::{Fault, RuntimeError};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Finishes once [`ManualInstruction::set_done`] was called
#[derive(Debug, Clone, Default)]
pub struct ManualInstruction {
    done: Arc<AtomicBool>,
}

impl ManualInstruction {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_done(&self) {
        self.done.store(true, Ordering::SeqCst);
    }

    pub fn is_set(&self) -> bool {
        self.done.load(Ordering::SeqCst)
    }
}

impl Instruction for ManualInstruction {
    fn step(&mut self) -> Result<Step, Fault> {
        Ok(Step::done_if(self.is_set()))
    }
}

/// Finishes with the value passed to [`ManualOperation::set_value`]
#[derive(Debug)]
pub struct ManualOperation<T> {
    slot: Arc<Mutex<Option<T>>>,
}

impl<T> Clone for ManualOperation<T> {
    fn clone(&self) -> Self {
        Self {
            slot: self.slot.clone(),
        }
    }
}

impl<T> Default for ManualOperation<T> {
    fn default() -> Self {
        Self {
            slot: Arc::new(Mutex::new(None)),
        }
    }
}

impl<T: Clone + Send> ManualOperation<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Finish the operation; a later call replaces the value
    pub fn set_value(&self, value: T) {
        *self.slot.lock() = Some(value);
    }
}

impl<T: Clone + Send> Instruction for ManualOperation<T> {
    fn step(&mut self) -> Result<Step, Fault> {
        Ok(Step::done_if(self.slot.lock().is_some()))
    }
}

impl<T: Clone + Send> Operation for ManualOperation<T> {
    type Output = T;

    fn is_done(&self) -> bool {
        self.slot.lock().is_some()
    }

    fn value(&self) -> Result<T, RuntimeError> {
        self.slot.lock().clone().ok_or(RuntimeError::OperationNotReady)
    }
}
