//! Offloading blocking work
//!
//! Work runs on a tokio blocking pool. The coroutine side polls a oneshot
//! channel once per tick through [`Offload`], so no executor thread ever blocks.
//! Cancellation is cooperative: the work receives a token and is expected to
//! check it.

use crate::config::OffloadConfig;
use crate::error::{CancelReason, Fault, RuntimeError};
use crate::executor::panic_message;
use crate::instruction::{Completion, Instruction, Operation, Step};
use std::panic::{self, AssertUnwindSafe};
use std::sync::OnceLock;
use tokio::runtime::{Builder, Handle, Runtime};
use tokio::sync::oneshot::{self, error::TryRecvError};
use tokio_util::sync::CancellationToken;

/// Runtime used when offloading outside of any tokio context
static FALLBACK_RUNTIME: OnceLock<Runtime> = OnceLock::new();

/// Where offloaded work runs
#[derive(Debug, Clone)]
pub struct Offloader {
    handle: Handle,
}

impl Offloader {
    pub fn new(handle: Handle) -> Self {
        Self { handle }
    }

    /// The ambient tokio runtime, or a shared fallback runtime built with defaults
    pub fn from_current() -> Result<Self, RuntimeError> {
        Self::from_config(&OffloadConfig::default())
    }

    /// The ambient tokio runtime, or a shared fallback runtime built from `config`
    ///
    /// The fallback is created once per process; later configs do not resize it.
    pub fn from_config(config: &OffloadConfig) -> Result<Self, RuntimeError> {
        if let Ok(handle) = Handle::try_current() {
            return Ok(Self::new(handle));
        }
        if let Some(runtime) = FALLBACK_RUNTIME.get() {
            return Ok(Self::new(runtime.handle().clone()));
        }

        let runtime = Builder::new_multi_thread()
            .worker_threads(1)
            .max_blocking_threads(config.max_blocking_threads.max(1))
            .thread_name(config.thread_name.clone())
            .enable_all()
            .build()?;
        if let Err(lost) = FALLBACK_RUNTIME.set(runtime) {
            // Another thread won the race
            lost.shutdown_background();
        }
        FALLBACK_RUNTIME
            .get()
            .map(|runtime| Self::new(runtime.handle().clone()))
            .ok_or_else(|| RuntimeError::Offload("fallback runtime unavailable".to_string()))
    }

    /// Start `work` with a token derived from `owner`
    pub fn run<T, F>(&self, owner: &CancellationToken, work: F) -> Offload<T>
    where
        T: Clone + Send + 'static,
        F: FnOnce(&CancellationToken) -> Result<T, Fault> + Send + 'static,
    {
        let token = owner.child_token();
        let (sender, receiver) = oneshot::channel();

        let worker_token = token.clone();
        self.handle.spawn_blocking(move || {
            let outcome = if worker_token.is_cancelled() {
                Err(RuntimeError::Cancelled(CancelReason::Interrupted).into())
            } else {
                match panic::catch_unwind(AssertUnwindSafe(|| work(&worker_token))) {
                    Ok(outcome) => outcome,
                    Err(payload) => Err(RuntimeError::Offload(format!(
                        "offloaded work panicked: {}",
                        panic_message(payload.as_ref())
                    ))
                    .into()),
                }
            };
            // The receiving side may be gone already
            let _ = sender.send(outcome);
        });

        Offload {
            receiver,
            token,
            owner: owner.clone(),
            completion: Completion::new(),
        }
    }
}

/// Operation finishing with the result of offloaded work
///
/// Raises the work's fault, or `Cancelled` when the token fired before a
/// result arrived. Dropping it cancels the work.
pub struct Offload<T> {
    receiver: oneshot::Receiver<Result<T, Fault>>,
    token: CancellationToken,
    owner: CancellationToken,
    completion: Completion<T>,
}

impl<T> Offload<T> {
    /// Ask the work to stop
    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn token(&self) -> &CancellationToken {
        &self.token
    }

    fn cancel_reason(&self) -> CancelReason {
        if self.owner.is_cancelled() {
            CancelReason::OwnerDisposed
        } else {
            CancelReason::Interrupted
        }
    }
}

impl<T: Clone + Send> Instruction for Offload<T> {
    fn step(&mut self) -> Result<Step, Fault> {
        self.completion.ensure_running(self.name())?;
        match self.receiver.try_recv() {
            Ok(Ok(value)) => Ok(self.completion.complete(value)),
            Ok(Err(fault)) => Err(fault),
            Err(TryRecvError::Empty) if self.token.is_cancelled() => {
                Err(RuntimeError::Cancelled(self.cancel_reason()).into())
            }
            Err(TryRecvError::Empty) => Ok(Step::Continue),
            Err(TryRecvError::Closed) => Err(RuntimeError::Offload("offloaded work dropped its result".to_string()).into()),
        }
    }
}

impl<T: Clone + Send> Operation for Offload<T> {
    type Output = T;

    fn is_done(&self) -> bool {
        self.completion.is_done()
    }

    fn value(&self) -> Result<T, RuntimeError> {
        self.completion.value()
    }
}

impl<T> Drop for Offload<T> {
    fn drop(&mut self) {
        self.token.cancel();
    }
}
