//! Error types for the runtime
//!
//! Two layers of failure are distinguished:
//! - [`RuntimeError`]: fixed-shape errors for programmer mistakes (reset misuse,
//!   reading unfinished values) and for expected outcomes such as cancellation
//! - [`Fault`]: the shareable fault value that travels from a stepped instruction
//!   through the coroutine, its interrupt handler and finally the executor

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

/* ===================== Cancellation ===================== */

/// Why a cooperative cancellation happened
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CancelReason {
    /// The cancellation token fired
    Interrupted,
    /// The task that owned the work was disposed
    OwnerDisposed,
}

impl fmt::Display for CancelReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CancelReason::Interrupted => write!(f, "interrupted"),
            CancelReason::OwnerDisposed => write!(f, "owner disposed"),
        }
    }
}

/* ===================== Runtime Errors ===================== */

#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error("instruction `{instruction}` does not support reset")]
    ResetNotSupported { instruction: String },

    #[error("operation `{operation}` already finished; reset it before stepping again")]
    OperationAlreadyFinished { operation: String },

    #[error("operation value read before the operation finished")]
    OperationNotReady,

    #[error("cancelled: {0}")]
    Cancelled(CancelReason),

    #[error(transparent)]
    Aggregate(AggregateFault),

    #[error("awaited coroutine faulted: {0}")]
    CoroutineFaulted(Fault),

    #[error("stop signaled")]
    StopSignaled,

    #[error("a suspension is already outstanding for this task")]
    SuspensionInProgress,

    #[error("combinator requires at least one instruction")]
    EmptyCombinator,

    #[error("logger is not configured")]
    LoggerNotConfigured,

    #[error("time source is not configured")]
    TimeSourceNotConfigured,

    #[error("assertion failed: {0}")]
    AssertionFailed(String),

    #[error("offload failed: {0}")]
    Offload(String),

    #[error("failed to spawn executor thread: {0}")]
    Spawn(#[from] std::io::Error),

    #[error("configuration error: {0}")]
    Config(#[from] config::ConfigError),
}

impl RuntimeError {
    pub fn reset_not_supported(instruction: &str) -> Self {
        RuntimeError::ResetNotSupported {
            instruction: short_type_name(instruction).to_string(),
        }
    }

    pub fn already_finished(operation: &str) -> Self {
        RuntimeError::OperationAlreadyFinished {
            operation: short_type_name(operation).to_string(),
        }
    }
}

/// Strip module paths from a `std::any::type_name` result, keeping generics readable
pub(crate) fn short_type_name(full: &str) -> &str {
    let head = full.split('<').next().unwrap_or(full);
    match head.rfind("::") {
        Some(idx) => &full[idx + 2..],
        None => full,
    }
}

/* ===================== Aggregate ===================== */

/// Every fault collected by a fail-soft join, in the order they were observed
#[derive(Debug, Clone)]
pub struct AggregateFault {
    pub faults: Vec<Fault>,
}

impl fmt::Display for AggregateFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} fault(s) occurred", self.faults.len())?;
        for (i, fault) in self.faults.iter().enumerate() {
            write!(f, "{} {}", if i == 0 { ":" } else { ";" }, fault)?;
        }
        Ok(())
    }
}

impl std::error::Error for AggregateFault {}

/* ===================== Fault ===================== */

/// A captured fault
///
/// Cloning is cheap and keeps identity: two clones of the same fault compare
/// equal under [`Fault::ptr_eq`], which is how handlers recognise "the exact
/// fault instance" that a coroutine raised.
#[derive(Clone)]
pub struct Fault(Arc<anyhow::Error>);

impl Fault {
    pub fn new<E>(error: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Fault(Arc::new(anyhow::Error::new(error)))
    }

    /// Build a fault from a plain message
    pub fn msg<M>(message: M) -> Self
    where
        M: fmt::Display + fmt::Debug + Send + Sync + 'static,
    {
        Fault(Arc::new(anyhow::Error::msg(message)))
    }

    pub fn from_anyhow(error: anyhow::Error) -> Self {
        Fault(Arc::new(error))
    }

    /// True when both values are clones of the same captured fault
    pub fn ptr_eq(&self, other: &Fault) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }

    pub fn downcast_ref<E>(&self) -> Option<&E>
    where
        E: fmt::Display + fmt::Debug + Send + Sync + 'static,
    {
        self.0.downcast_ref::<E>()
    }

    pub fn runtime_error(&self) -> Option<&RuntimeError> {
        self.downcast_ref::<RuntimeError>()
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self.runtime_error(), Some(RuntimeError::Cancelled(_)))
    }

    pub fn is_stop_signal(&self) -> bool {
        matches!(self.runtime_error(), Some(RuntimeError::StopSignaled))
    }

    /// The faults carried by an aggregate, or `None` for a single fault
    pub fn aggregated(&self) -> Option<&[Fault]> {
        match self.runtime_error() {
            Some(RuntimeError::Aggregate(agg)) => Some(&agg.faults),
            _ => None,
        }
    }
}

impl fmt::Display for Fault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&*self.0, f)
    }
}

impl fmt::Debug for Fault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&*self.0, f)
    }
}

impl<E> From<E> for Fault
where
    E: std::error::Error + Send + Sync + 'static,
{
    fn from(error: E) -> Self {
        Fault::new(error)
    }
}
