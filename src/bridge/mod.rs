//! Async bridge
//!
//! Lets a coroutine body be written as an `async` block. The body receives a
//! [`Suspender`]; awaiting one of its methods suspends the coroutine until the
//! instruction behind it finishes. No async runtime drives the body: the
//! executor polls it whenever the coroutine resumes.
//!
//! ```ignore
//! let task = start_task(&executor, |s| async move {
//!     s.next_tick().await?;
//!     let n = s.value(Ready::new(2)).await?;
//!     let doubled = s.run_offloaded(move |_| Ok(n * 2)).await?;
//!     Ok(doubled)
//! });
//! ```
//!
//! ## Lifetimes
//! - Disposing a task cancels its token (offloaded work sees it) and disposes
//!   its `AsChild` children, depth first
//! - A child's fault surfaces in the parent at its current or next await,
//!   unless a join over that child is reporting it already
//! - A fault is reported at most once; a task that fails is dropped, never re-polled

mod group;
mod offload;
mod suspender;
mod task;

pub use group::JoinMode;
pub use offload::{Offload, Offloader};
pub use suspender::{ChildPolicy, Suspend, Suspender};
pub use task::{TaskBuilder, TaskHandle};

use crate::error::Fault;
use crate::executor::Executor;
use std::future::Future;
use std::sync::Arc;

/// Start an async body as a coroutine on `executor`
pub fn start_task<E, F, Fut, T>(executor: &E, body: F) -> TaskHandle<T>
where
    E: Executor + Clone + 'static,
    F: FnOnce(Suspender) -> Fut,
    Fut: Future<Output = Result<T, Fault>> + Send + 'static,
    T: Clone + Send + 'static,
{
    TaskBuilder::new(Arc::new(executor.clone())).start(body)
}

#[cfg(test)]
mod tests;
