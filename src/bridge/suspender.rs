//! Suspension points
//!
//! Every await on a [`Suspender`] method registers one instruction. The task's
//! routine yields it to the coroutine; when it finishes, its outcome lands in
//! a slot and the body is polled again:
//!
//! ```text
//!   body: s.value(op).await
//!     │ first poll ──► register Capture(op) ──► Pending
//!     ▼
//!   routine yields Capture ──► executor steps it every tick
//!     │ op done / op faulted / child fault pending
//!     ▼
//!   body polled again ──► slot ──► Ready(Ok(value) | Err(fault))
//! ```
//!
//! Only one suspension may be outstanding per task. A second one is logged and
//! resolves immediately to `SuspensionInProgress`.

use super::offload::Offload;
use super::task::{TaskBuilder, TaskHandle, TaskShared};
use crate::error::{Fault, RuntimeError};
use crate::instruction::{Instruction, NextTick, Operation, Step, WaitForSeconds};
use crate::time::Clock;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::task::{Context, Poll};
use tokio_util::sync::CancellationToken;

/// How a spawned task relates to the task that spawned it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChildPolicy {
    /// Faults surface in the parent and the child dies with the parent
    AsChild,
    /// Independent of the parent
    Detached,
}

/* ===================== Slot ===================== */

struct Slot<T> {
    outcome: Mutex<Option<Result<T, Fault>>>,
    abandoned: AtomicBool,
}

impl<T> Slot<T> {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            outcome: Mutex::new(None),
            abandoned: AtomicBool::new(false),
        })
    }

    fn fill(&self, outcome: Result<T, Fault>) {
        *self.outcome.lock() = Some(outcome);
    }

    fn take(&self) -> Option<Result<T, Fault>> {
        self.outcome.lock().take()
    }

    fn abandon(&self) {
        self.abandoned.store(true, Ordering::Release);
    }

    fn is_abandoned(&self) -> bool {
        self.abandoned.load(Ordering::Acquire)
    }
}

/* ===================== Capture ===================== */

/// Steps the awaited instruction and records how it ended
struct Capture<I, T, X> {
    inner: I,
    extract: X,
    slot: Arc<Slot<T>>,
    shared: Arc<TaskShared>,
}

impl<I, T, X> Instruction for Capture<I, T, X>
where
    I: Instruction,
    T: Send,
    X: Fn(&I) -> Result<T, RuntimeError> + Send,
{
    fn step(&mut self) -> Result<Step, Fault> {
        // Hand control back to the body: nobody waits, or a child fault must surface
        if self.slot.is_abandoned() || self.shared.has_pending_fault() {
            return Ok(Step::Done);
        }
        match self.inner.step() {
            Ok(Step::Continue) => Ok(Step::Continue),
            Ok(Step::Done) => {
                self.slot.fill((self.extract)(&self.inner).map_err(Fault::from));
                Ok(Step::Done)
            }
            Err(fault) => {
                self.slot.fill(Err(fault));
                Ok(Step::Done)
            }
        }
    }

    fn name(&self) -> &'static str {
        self.inner.name()
    }
}

/* ===================== Suspend ===================== */

/// Future returned by the suspending [`Suspender`] methods
#[must_use = "suspensions do nothing unless awaited"]
pub struct Suspend<T> {
    shared: Arc<TaskShared>,
    slot: Arc<Slot<T>>,
    capture: Option<Box<dyn Instruction>>,
    registered: bool,
    finished: bool,
}

impl<T: Send + 'static> Suspend<T> {
    fn new<I, X>(shared: Arc<TaskShared>, inner: I, extract: X) -> Self
    where
        I: Instruction + 'static,
        X: Fn(&I) -> Result<T, RuntimeError> + Send + 'static,
    {
        let slot = Slot::new();
        let capture = Capture {
            inner,
            extract,
            slot: slot.clone(),
            shared: shared.clone(),
        };
        Self {
            shared,
            slot,
            capture: Some(Box::new(capture)),
            registered: false,
            finished: false,
        }
    }

    fn finish(&mut self, outcome: Result<T, Fault>) -> Poll<Result<T, Fault>> {
        if self.registered {
            self.slot.abandon();
            self.shared.release();
        }
        self.finished = true;
        Poll::Ready(outcome)
    }
}

impl<T: Send + 'static> Future for Suspend<T> {
    type Output = Result<T, Fault>;

    fn poll(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.get_mut();
        if this.finished {
            return Poll::Ready(Err(RuntimeError::already_finished("Suspend").into()));
        }

        if this.registered {
            if let Some(outcome) = this.slot.take() {
                if let Err(fault) = &outcome {
                    this.shared.discard_pending_fault(fault);
                }
                return this.finish(outcome);
            }
            if let Some(fault) = this.shared.take_pending_fault() {
                return this.finish(Err(fault));
            }
            return Poll::Pending;
        }

        if let Some(fault) = this.shared.take_pending_fault() {
            return this.finish(Err(fault));
        }
        let Some(capture) = this.capture.take() else {
            return this.finish(Err(RuntimeError::OperationNotReady.into()));
        };
        match this.shared.register(capture) {
            Ok(()) => {
                this.registered = true;
                Poll::Pending
            }
            Err(error) => this.finish(Err(error.into())),
        }
    }
}

impl<T> Drop for Suspend<T> {
    fn drop(&mut self) {
        if self.registered && !self.finished {
            self.slot.abandon();
            self.shared.release();
        }
    }
}

/* ===================== Suspender ===================== */

/// The async body's connection to its coroutine
///
/// Cloning is cheap; all clones suspend the same task.
#[derive(Clone)]
pub struct Suspender {
    shared: Arc<TaskShared>,
}

impl Suspender {
    pub(crate) fn new(shared: Arc<TaskShared>) -> Self {
        Self { shared }
    }

    pub(crate) fn shared(&self) -> &Arc<TaskShared> {
        &self.shared
    }

    /// Suspend until `instruction` finishes
    pub fn wait<I: Instruction + 'static>(&self, instruction: I) -> Suspend<()> {
        Suspend::new(self.shared.clone(), instruction, |_: &I| Ok(()))
    }

    /// Suspend until `operation` finishes and resume with its value
    pub fn value<O>(&self, operation: O) -> Suspend<O::Output>
    where
        O: Operation + 'static,
        O::Output: Send + 'static,
    {
        Suspend::new(self.shared.clone(), operation, |op: &O| op.value())
    }

    pub fn next_tick(&self) -> Suspend<()> {
        self.wait(NextTick)
    }

    pub fn wait_seconds(&self, seconds: f64, clock: Clock) -> Suspend<()> {
        self.wait(WaitForSeconds::new(seconds, clock))
    }

    /// Start another task on the same executor
    pub fn spawn_child<F, Fut, T>(&self, body: F, policy: ChildPolicy) -> TaskHandle<T>
    where
        F: FnOnce(Suspender) -> Fut,
        Fut: Future<Output = Result<T, Fault>> + Send + 'static,
        T: Clone + Send + 'static,
    {
        let mut builder = TaskBuilder::new(self.shared.executor().clone()).sink(self.shared.sink().clone());
        if let Some(offloader) = self.shared.preset_offloader() {
            builder = builder.offloader(offloader);
        }
        if policy == ChildPolicy::AsChild {
            builder = builder.parent(&self.shared);
        }

        let child = builder.start(body);
        if policy == ChildPolicy::AsChild && !self.shared.adopt(child.coroutine().clone()) {
            // Parent already gone
            child.dispose();
        }
        child
    }

    /// Run `work` on the blocking pool; the token fires when this task is disposed
    pub fn offload<T, F>(&self, work: F) -> Result<Offload<T>, RuntimeError>
    where
        T: Clone + Send + 'static,
        F: FnOnce(&CancellationToken) -> Result<T, Fault> + Send + 'static,
    {
        let offloader = self.shared.offloader()?;
        Ok(offloader.run(self.shared.token(), work))
    }

    /// Offload `work` and suspend until it returns
    pub async fn run_offloaded<T, F>(&self, work: F) -> Result<T, Fault>
    where
        T: Clone + Send + 'static,
        F: FnOnce(&CancellationToken) -> Result<T, Fault> + Send + 'static,
    {
        let offload = self.offload(work)?;
        self.value(offload).await
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        self.shared.token().clone()
    }

    pub fn is_disposed(&self) -> bool {
        self.shared.token().is_cancelled()
    }
}
