//! Tasks: async bodies driven as coroutines

use super::offload::Offloader;
use super::suspender::Suspender;
use crate::coroutine::{CoroutineHandle, InterruptHandler, InterruptReason, Routine, Yielded};
use crate::error::{CancelReason, Fault, RuntimeError};
use crate::executor::Executor;
use crate::instruction::{BoxInstruction, Instruction, ManualOperation, Operation, Step};
use crate::logging::{Logger, Severity};
use parking_lot::Mutex;
use std::collections::HashSet;
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock, Weak};
use std::task::{Context, Poll, Wake, Waker};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

const CONTEXT: &str = "task";

type TaskFuture<T> = Pin<Box<dyn Future<Output = Result<T, Fault>> + Send>>;

/* ===================== Shared State ===================== */

#[derive(Default)]
struct TaskState {
    /// Instruction registered by the outstanding suspension, not yet yielded
    next: Option<BoxInstruction>,
    outstanding: bool,
    /// A child's fault waiting to surface at the body's next await
    pending_fault: Option<Fault>,
    children: Vec<CoroutineHandle>,
    /// Children whose faults a running join reports itself
    observed: HashSet<Uuid>,
    closed: bool,
}

/// State shared by a task's routine, its suspender and its children
pub(crate) struct TaskShared {
    state: Mutex<TaskState>,
    token: CancellationToken,
    executor: Arc<dyn Executor>,
    sink: Logger,
    offloader: Mutex<Option<Offloader>>,
    parent: Option<Weak<TaskShared>>,
    fault_reported: AtomicBool,
    id: OnceLock<Uuid>,
}

impl TaskShared {
    pub(crate) fn token(&self) -> &CancellationToken {
        &self.token
    }

    pub(crate) fn executor(&self) -> &Arc<dyn Executor> {
        &self.executor
    }

    pub(crate) fn sink(&self) -> &Logger {
        &self.sink
    }

    pub(crate) fn id(&self) -> Option<Uuid> {
        self.id.get().copied()
    }

    pub(crate) fn offloader(&self) -> Result<Offloader, RuntimeError> {
        let mut slot = self.offloader.lock();
        if let Some(offloader) = slot.as_ref() {
            return Ok(offloader.clone());
        }
        let offloader = Offloader::from_current()?;
        *slot = Some(offloader.clone());
        Ok(offloader)
    }

    pub(crate) fn preset_offloader(&self) -> Option<Offloader> {
        self.offloader.lock().clone()
    }

    /* ----- suspension ----- */

    /// Claim the single suspension slot and park `instruction` for the routine
    pub(crate) fn register(&self, instruction: BoxInstruction) -> Result<(), RuntimeError> {
        let mut state = self.state.lock();
        if state.outstanding {
            drop(state);
            self.sink.log(
                &format!(
                    "task {}: suspension requested while another one is still outstanding; ignored",
                    self.describe()
                ),
                Severity::Warning,
                Some(CONTEXT),
            );
            return Err(RuntimeError::SuspensionInProgress);
        }
        if state.closed {
            return Err(RuntimeError::Cancelled(CancelReason::OwnerDisposed));
        }
        state.outstanding = true;
        state.next = Some(instruction);
        Ok(())
    }

    pub(crate) fn release(&self) {
        let mut state = self.state.lock();
        state.outstanding = false;
        state.next = None;
    }

    fn take_next(&self) -> Option<BoxInstruction> {
        self.state.lock().next.take()
    }

    pub(crate) fn has_pending_fault(&self) -> bool {
        self.state.lock().pending_fault.is_some()
    }

    pub(crate) fn take_pending_fault(&self) -> Option<Fault> {
        self.state.lock().pending_fault.take()
    }

    /// Forget a delivered fault if the pending one is the same failure
    pub(crate) fn discard_pending_fault(&self, delivered: &Fault) {
        let mut state = self.state.lock();
        if state
            .pending_fault
            .as_ref()
            .map_or(false, |pending| same_failure(delivered, pending))
        {
            state.pending_fault = None;
        }
    }

    /* ----- children ----- */

    pub(crate) fn adopt(&self, child: CoroutineHandle) -> bool {
        let mut state = self.state.lock();
        if state.closed {
            return false;
        }
        state.children.retain(|c| !c.is_finished());
        state.children.push(child);
        true
    }

    pub(crate) fn observe(&self, ids: &[Uuid]) {
        self.state.lock().observed.extend(ids.iter().copied());
    }

    pub(crate) fn unobserve(&self, ids: &[Uuid]) {
        let mut state = self.state.lock();
        for id in ids {
            state.observed.remove(id);
        }
    }

    /// Deliver a child's fault; false when nobody is left to receive it
    fn child_faulted(&self, child: Option<Uuid>, fault: &Fault) -> Delivery {
        let mut state = self.state.lock();
        if child.map_or(false, |id| state.observed.contains(&id)) {
            return Delivery::Observed;
        }
        if state.closed {
            return Delivery::Undeliverable;
        }
        if state.pending_fault.is_none() {
            state.pending_fault = Some(fault.clone());
        }
        Delivery::Delivered
    }

    /* ----- lifecycle ----- */

    fn on_interrupt(&self, reason: InterruptReason, fault: Option<&Fault>) {
        match reason {
            InterruptReason::Faulted => {
                if let Some(fault) = fault {
                    self.report_fault(fault);
                }
                self.dispose();
            }
            InterruptReason::Disposed => self.dispose(),
            InterruptReason::Completed => {
                let mut state = self.state.lock();
                state.closed = true;
                state.children.retain(|c| !c.is_finished());
            }
        }
    }

    /// Report a fault exactly once: to the parent, or to the log
    fn report_fault(&self, fault: &Fault) {
        if self.fault_reported.swap(true, Ordering::AcqRel) {
            return;
        }
        if let Some(parent) = self.parent.as_ref().and_then(Weak::upgrade) {
            match parent.child_faulted(self.id(), fault) {
                Delivery::Delivered | Delivery::Observed => return,
                Delivery::Undeliverable => {}
            }
        }
        if fault.is_cancelled() || fault.is_stop_signal() {
            return;
        }
        self.sink.log(
            &format!("task {} faulted: {}", self.describe(), fault),
            Severity::Error,
            Some(CONTEXT),
        );
    }

    /// Cancel offloaded work and dispose children, depth first
    pub(crate) fn dispose(&self) {
        let children = {
            let mut state = self.state.lock();
            state.closed = true;
            state.next = None;
            std::mem::take(&mut state.children)
        };
        self.token.cancel();
        for child in children {
            child.dispose();
        }
    }

    fn describe(&self) -> String {
        self.id().map_or_else(|| "<starting>".to_string(), |id| id.to_string())
    }
}

enum Delivery {
    Delivered,
    Observed,
    Undeliverable,
}

/// True when `delivered` is `pending` or a coroutine fault wrapping it
fn same_failure(delivered: &Fault, pending: &Fault) -> bool {
    if delivered.ptr_eq(pending) {
        return true;
    }
    matches!(
        delivered.runtime_error(),
        Some(RuntimeError::CoroutineFaulted(inner)) if inner.ptr_eq(pending)
    )
}

/* ===================== Routine ===================== */

struct NoopWake;

impl Wake for NoopWake {
    fn wake(self: Arc<Self>) {}
}

/// Polls the body once per resume
///
/// The body is re-polled whenever the instruction it registered finishes, or
/// on the next tick when it is pending on something else.
struct TaskRoutine<T> {
    future: Option<TaskFuture<T>>,
    shared: Arc<TaskShared>,
    result: ManualOperation<T>,
    waker: Waker,
}

impl<T: Clone + Send + 'static> Routine for TaskRoutine<T> {
    fn resume(&mut self) -> Result<Option<Yielded>, Fault> {
        let Some(future) = self.future.as_mut() else {
            return Ok(None);
        };

        let mut cx = Context::from_waker(&self.waker);
        match future.as_mut().poll(&mut cx) {
            Poll::Ready(outcome) => {
                self.future = None;
                self.shared.release();
                match (outcome, self.shared.take_pending_fault()) {
                    (Ok(value), None) => {
                        self.result.set_value(value);
                        Ok(None)
                    }
                    // A child fault nobody awaited still fails the task
                    (Ok(_), Some(pending)) => Err(pending),
                    (Err(fault), Some(pending)) if !same_failure(&fault, &pending) => {
                        self.shared.sink.log(
                            &format!("task {}: child fault superseded: {}", self.shared.describe(), pending),
                            Severity::Warning,
                            Some(CONTEXT),
                        );
                        Err(fault)
                    }
                    (Err(fault), _) => Err(fault),
                }
            }
            Poll::Pending => Ok(Some(match self.shared.take_next() {
                Some(instruction) => Yielded::Instruction(instruction),
                None => Yielded::NextTick,
            })),
        }
    }
}

/* ===================== Handle ===================== */

/// Handle to a running task and its eventual value
///
/// As an [`Operation`] it finishes with the body's value. Waiting on a task
/// whose body failed raises [`RuntimeError::CoroutineFaulted`]; waiting on a
/// task disposed before finishing raises `Cancelled`.
pub struct TaskHandle<T> {
    coroutine: CoroutineHandle,
    result: ManualOperation<T>,
}

impl<T> Clone for TaskHandle<T> {
    fn clone(&self) -> Self {
        Self {
            coroutine: self.coroutine.clone(),
            result: self.result.clone(),
        }
    }
}

impl<T: Clone + Send> TaskHandle<T> {
    pub fn coroutine(&self) -> &CoroutineHandle {
        &self.coroutine
    }

    pub fn id(&self) -> Uuid {
        self.coroutine.id()
    }

    pub fn is_finished(&self) -> bool {
        self.coroutine.is_finished()
    }

    pub fn fault(&self) -> Option<Fault> {
        self.coroutine.fault()
    }

    pub fn dispose(&self) {
        self.coroutine.dispose();
    }

    /// The body's value, once it finished successfully
    pub fn result(&self) -> Result<T, RuntimeError> {
        self.result.value()
    }
}

impl<T: Clone + Send> Instruction for TaskHandle<T> {
    fn step(&mut self) -> Result<Step, Fault> {
        if self.result.is_done() {
            return Ok(Step::Done);
        }
        match self.coroutine.step()? {
            Step::Continue => Ok(Step::Continue),
            Step::Done if self.result.is_done() => Ok(Step::Done),
            Step::Done => Err(RuntimeError::Cancelled(CancelReason::Interrupted).into()),
        }
    }
}

impl<T: Clone + Send> Operation for TaskHandle<T> {
    type Output = T;

    fn is_done(&self) -> bool {
        self.result.is_done()
    }

    fn value(&self) -> Result<T, RuntimeError> {
        self.result.value()
    }
}

/* ===================== Builder ===================== */

/// Configures and starts a task
pub struct TaskBuilder {
    executor: Arc<dyn Executor>,
    sink: Option<Logger>,
    offloader: Option<Offloader>,
    parent: Option<Weak<TaskShared>>,
}

impl TaskBuilder {
    pub fn new(executor: Arc<dyn Executor>) -> Self {
        Self {
            executor,
            sink: None,
            offloader: None,
            parent: None,
        }
    }

    /// Sink for bridge diagnostics; defaults to the executor's
    pub fn sink(mut self, sink: Logger) -> Self {
        self.sink = Some(sink);
        self
    }

    /// Where offloaded work runs; defaults to the ambient tokio runtime
    pub fn offloader(mut self, offloader: Offloader) -> Self {
        self.offloader = Some(offloader);
        self
    }

    pub(crate) fn parent(mut self, parent: &Arc<TaskShared>) -> Self {
        self.parent = Some(Arc::downgrade(parent));
        self
    }

    pub fn start<F, Fut, T>(self, body: F) -> TaskHandle<T>
    where
        F: FnOnce(Suspender) -> Fut,
        Fut: Future<Output = Result<T, Fault>> + Send + 'static,
        T: Clone + Send + 'static,
    {
        let token = match self.parent.as_ref().and_then(Weak::upgrade) {
            Some(parent) => parent.token.child_token(),
            None => CancellationToken::new(),
        };
        let shared = Arc::new(TaskShared {
            state: Mutex::new(TaskState::default()),
            token,
            sink: self.sink.unwrap_or_else(|| self.executor.logger()),
            executor: self.executor,
            offloader: Mutex::new(self.offloader),
            parent: self.parent,
            fault_reported: AtomicBool::new(false),
            id: OnceLock::new(),
        });

        let result = ManualOperation::new();
        let routine = TaskRoutine {
            future: Some(Box::pin(body(Suspender::new(shared.clone())))),
            shared: shared.clone(),
            result: result.clone(),
            waker: Waker::from(Arc::new(NoopWake)),
        };

        let weak = Arc::downgrade(&shared);
        let handler = InterruptHandler::new(move |reason, fault| {
            if let Some(shared) = weak.upgrade() {
                shared.on_interrupt(reason, fault);
            }
        })
        .on_end();

        let coroutine = CoroutineHandle::new(Box::new(routine), Some(handler), shared.sink.clone());
        let _ = shared.id.set(coroutine.id());
        shared.executor.submit(coroutine.clone());

        TaskHandle { coroutine, result }
    }
}
