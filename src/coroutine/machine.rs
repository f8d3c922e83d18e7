//! Coroutine state machine
//!
//! Only the executor steps a machine. Everything a caller can do from another
//! thread (dispose, pause, read the fault) touches atomics or the small
//! `fault`/`interrupt` locks, never the body lock held while stepping. That
//! keeps disposal safe from inside the routine's own instructions.

use super::interrupt::{InterruptHandler, InterruptReason, InvokeOption};
use super::routine::{BoxRoutine, Yielded};
use crate::error::Fault;
use crate::instruction::{BoxInstruction, Step};
use crate::logging::{Logger, Severity};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use uuid::Uuid;

const CONTEXT: &str = "coroutine";

struct Body {
    routine: Option<BoxRoutine>,
    current: Option<BoxInstruction>,
    started: bool,
}

enum Advance {
    Suspended,
    Ended,
}

pub(crate) struct CoroutineMachine {
    id: Uuid,
    finished: AtomicBool,
    paused: AtomicBool,
    submitted: AtomicBool,
    fault: Mutex<Option<Fault>>,
    interrupt: Mutex<Option<InterruptHandler>>,
    body: Mutex<Body>,
    sink: Logger,
}

impl CoroutineMachine {
    pub(crate) fn new(routine: BoxRoutine, interrupt: Option<InterruptHandler>, sink: Logger) -> Self {
        Self {
            id: Uuid::new_v4(),
            finished: AtomicBool::new(false),
            paused: AtomicBool::new(false),
            submitted: AtomicBool::new(false),
            fault: Mutex::new(None),
            interrupt: Mutex::new(interrupt),
            body: Mutex::new(Body {
                routine: Some(routine),
                current: None,
                started: false,
            }),
            sink,
        }
    }

    pub(crate) fn id(&self) -> Uuid {
        self.id
    }

    pub(crate) fn is_finished(&self) -> bool {
        self.finished.load(Ordering::Acquire)
    }

    pub(crate) fn is_paused(&self) -> bool {
        self.paused.load(Ordering::Acquire)
    }

    pub(crate) fn set_paused(&self, paused: bool) {
        self.paused.store(paused, Ordering::Release);
    }

    pub(crate) fn fault(&self) -> Option<Fault> {
        self.fault.lock().clone()
    }

    /// First call returns true; every later call false
    pub(crate) fn mark_submitted(&self) -> bool {
        !self.submitted.swap(true, Ordering::AcqRel)
    }

    /* ===================== Stepping ===================== */

    /// Advance by one tick
    ///
    /// `Ok(true)` while the coroutine is still running, `Ok(false)` once it is
    /// finished. A fault nobody handles is returned for the executor to deal with.
    pub(crate) fn step(&self) -> Result<bool, Fault> {
        if self.is_finished() {
            return Ok(false);
        }
        if self.is_paused() {
            return Ok(true);
        }

        let outcome = {
            let mut body = self.body.lock();
            self.advance(&mut body)
        };

        match outcome {
            Ok(Advance::Suspended) => Ok(!self.is_finished()),
            Ok(Advance::Ended) => {
                self.finish_with(InterruptReason::Completed, None);
                Ok(false)
            }
            Err(fault) => self.handle_fault(fault),
        }
    }

    fn advance(&self, body: &mut Body) -> Result<Advance, Fault> {
        if let Some(current) = body.current.as_mut() {
            if current.step()? == Step::Continue {
                return Ok(Advance::Suspended);
            }
            body.current = None;
        }
        self.move_next(body)
    }

    fn move_next(&self, body: &mut Body) -> Result<Advance, Fault> {
        loop {
            let Some(routine) = body.routine.as_mut() else {
                return Ok(Advance::Ended);
            };
            let first = !body.started;
            body.started = true;

            match routine.resume()? {
                None => {
                    body.routine = None;
                    return Ok(Advance::Ended);
                }
                Some(Yielded::NextTick) => return Ok(Advance::Suspended),
                Some(Yielded::Instruction(instruction)) => {
                    body.current = Some(instruction);
                    return Ok(Advance::Suspended);
                }
                Some(Yielded::Interrupt(handler)) => {
                    if first && self.register(handler) {
                        continue;
                    }
                    self.sink.log(
                        &format!(
                            "coroutine {}: interrupt handler ignored; it must be the first item and registered once",
                            self.id
                        ),
                        Severity::Warning,
                        Some(CONTEXT),
                    );
                    return Ok(Advance::Suspended);
                }
            }
        }
    }

    fn register(&self, handler: InterruptHandler) -> bool {
        let mut slot = self.interrupt.lock();
        if slot.is_some() {
            return false;
        }
        *slot = Some(handler);
        true
    }

    fn handle_fault(&self, fault: Fault) -> Result<bool, Fault> {
        if self.is_finished() {
            // Disposed while the faulting step ran
            return Ok(false);
        }

        let handler = self.interrupt.lock().clone();
        let Some(handler) = handler else {
            return Err(fault);
        };

        *self.fault.lock() = Some(fault.clone());
        if handler.disposes_on_fault() {
            self.finish_with(InterruptReason::Faulted, Some(&fault));
            return Ok(false);
        }

        handler.invoke(InterruptReason::Faulted, Some(&fault));
        self.body.lock().current = None;
        Ok(true)
    }

    /* ===================== Finishing ===================== */

    /// Finish immediately; idempotent, never re-enters the routine body
    pub(crate) fn dispose(&self) {
        self.finish_with(InterruptReason::Disposed, None);
    }

    /// Finish because of a fault that escaped to the executor
    pub(crate) fn dispose_from_fault(&self, fault: Fault) {
        if self.is_finished() {
            return;
        }
        *self.fault.lock() = Some(fault.clone());
        self.finish_with(InterruptReason::Faulted, Some(&fault));
    }

    fn finish_with(&self, reason: InterruptReason, fault: Option<&Fault>) -> bool {
        if self.finished.swap(true, Ordering::AcqRel) {
            return false;
        }

        let handler = self.interrupt.lock().take();
        if let Some(handler) = handler {
            let wants_end = handler.option() == InvokeOption::InterruptAndEnd;
            if reason != InterruptReason::Completed || wants_end {
                handler.invoke(reason, fault);
            }
        }
        true
    }

    /// Drop the routine and its current instruction if nobody is stepping them
    pub(crate) fn try_release(&self) {
        if let Some(mut body) = self.body.try_lock() {
            body.current = None;
            body.routine = None;
        }
    }
}
