use crate::coroutine::{routine_fn, InterruptHandler, InterruptReason, Routine, Yielded};
use crate::error::Fault;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

/// Records every interrupt handler call
#[derive(Clone, Default)]
pub struct Recorder {
    calls: Arc<Mutex<Vec<(InterruptReason, Option<Fault>)>>>,
}

impl Recorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn handler(&self) -> InterruptHandler {
        let calls = self.calls.clone();
        InterruptHandler::new(move |reason, fault| calls.lock().push((reason, fault.cloned())))
    }

    pub fn reasons(&self) -> Vec<InterruptReason> {
        self.calls.lock().iter().map(|(reason, _)| *reason).collect()
    }

    pub fn faults(&self) -> Vec<Option<Fault>> {
        self.calls.lock().iter().map(|(_, fault)| fault.clone()).collect()
    }
}

/// Increments `counter` once per resume, forever
pub fn counter(counter: Arc<AtomicU32>) -> impl Routine {
    routine_fn(move || {
        counter.fetch_add(1, Ordering::SeqCst);
        Ok(Some(Yielded::NextTick))
    })
}

/// Yields `handler` first, then counts resumes; the `fail_at`th count faults
pub fn failing_after(handler: Option<InterruptHandler>, fail_at: u32, fault: Fault, count: Arc<AtomicU32>) -> impl Routine {
    let mut handler = handler;
    routine_fn(move || {
        if let Some(h) = handler.take() {
            return Ok(Some(Yielded::Interrupt(h)));
        }
        let n = count.fetch_add(1, Ordering::SeqCst) + 1;
        if n == fail_at {
            return Err(fault.clone());
        }
        Ok(Some(Yielded::NextTick))
    })
}
