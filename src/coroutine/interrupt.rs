use crate::error::Fault;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Why an interrupt handler is being called
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum InterruptReason {
    Disposed,
    /// The routine ran out of items; only reported with [`InvokeOption::InterruptAndEnd`]
    Completed,
    Faulted,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum InvokeOption {
    /// Called on disposal and on faults
    Interrupt,
    /// Additionally called when the routine ends normally
    InterruptAndEnd,
}

type Callback = Arc<dyn Fn(InterruptReason, Option<&Fault>) + Send + Sync>;

/// Per-coroutine callback fired at most once when the coroutine stops
///
/// By default a fault disposes the coroutine and the handler sees
/// [`InterruptReason::Faulted`]. With [`keep_running_on_fault`] the handler is
/// still called for every fault, but the routine carries on with its next item.
///
/// [`keep_running_on_fault`]: InterruptHandler::keep_running_on_fault
#[derive(Clone)]
pub struct InterruptHandler {
    callback: Callback,
    option: InvokeOption,
    dispose_on_fault: bool,
}

impl InterruptHandler {
    pub fn new<F>(callback: F) -> Self
    where
        F: Fn(InterruptReason, Option<&Fault>) + Send + Sync + 'static,
    {
        Self {
            callback: Arc::new(callback),
            option: InvokeOption::Interrupt,
            dispose_on_fault: true,
        }
    }

    /// Also call the handler with `Completed` when the routine ends
    pub fn on_end(mut self) -> Self {
        self.option = InvokeOption::InterruptAndEnd;
        self
    }

    pub fn keep_running_on_fault(mut self) -> Self {
        self.dispose_on_fault = false;
        self
    }

    pub fn option(&self) -> InvokeOption {
        self.option
    }

    pub fn disposes_on_fault(&self) -> bool {
        self.dispose_on_fault
    }

    pub(crate) fn invoke(&self, reason: InterruptReason, fault: Option<&Fault>) {
        (self.callback)(reason, fault)
    }
}

impl fmt::Debug for InterruptHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InterruptHandler")
            .field("option", &self.option)
            .field("dispose_on_fault", &self.dispose_on_fault)
            .finish()
    }
}
