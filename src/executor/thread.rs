//! Dedicated-thread executor
//!
//! A background thread runs ticks in a loop until [`ThreadExecutor::shutdown`].
//! Escaped faults and panics are logged, the offending coroutine is disposed,
//! and the tick carries on with the remaining coroutines. A panic outside any
//! coroutine step is logged and the loop restarts.

use super::registry::{FaultPolicy, Registry, RegistryExecutorBuilder};
use super::{panic_message, Executor};
use crate::config::ExecutorConfig;
use crate::coroutine::CoroutineHandle;
use crate::error::RuntimeError;
use crate::logging::{Logger, Severity};
use parking_lot::Mutex;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

const CONTEXT: &str = "thread-executor";

struct Worker {
    registry: Arc<Registry>,
    stop: Arc<AtomicBool>,
    thread: Mutex<Option<JoinHandle<()>>>,
}

impl Worker {
    fn shutdown(&self) {
        // Stop first so the loop's final pass sees the remove-all flag
        self.registry.stop_all();
        self.stop.store(true, Ordering::Release);

        let Some(thread) = self.thread.lock().take() else {
            return;
        };
        if thread.thread().id() == thread::current().id() {
            // Shut down from one of our own coroutines; the loop exits on its own
            return;
        }
        if thread.join().is_err() {
            self.registry.sink().log("executor thread panicked while stopping", Severity::Error, Some(CONTEXT));
        }
    }
}

impl Drop for Worker {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Executor that ticks itself on its own thread
///
/// Clones share the thread; it stops when [`shutdown`](Self::shutdown) is
/// called or the last clone is dropped.
#[derive(Clone)]
pub struct ThreadExecutor {
    worker: Arc<Worker>,
}

impl ThreadExecutor {
    pub fn new(config: &ExecutorConfig, sink: Logger) -> Result<Self, RuntimeError> {
        let registry = Arc::new(RegistryExecutorBuilder::default().sink(sink).config(config).build_registry());
        let stop = Arc::new(AtomicBool::new(false));

        let thread = thread::Builder::new()
            .name(config.thread_name.clone())
            .spawn({
                let registry = registry.clone();
                let stop = stop.clone();
                let interval = config.tick_interval();
                move || run_loop(&registry, &stop, interval)
            })?;

        Ok(Self {
            worker: Arc::new(Worker {
                registry,
                stop,
                thread: Mutex::new(Some(thread)),
            }),
        })
    }

    /// Stop the loop, dispose every coroutine and join the thread
    pub fn shutdown(&self) {
        self.worker.shutdown();
    }

    pub fn is_running(&self) -> bool {
        !self.worker.stop.load(Ordering::Acquire)
    }
}

fn run_loop(registry: &Registry, stop: &AtomicBool, interval: Option<Duration>) {
    while !stop.load(Ordering::Acquire) {
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| registry.pass(FaultPolicy::Log)));
        if let Err(payload) = outcome {
            registry.sink().log(
                &format!("tick panicked, restarting loop: {}", panic_message(payload.as_ref())),
                Severity::Error,
                Some(CONTEXT),
            );
        }
        match interval {
            Some(pause) => thread::sleep(pause),
            None => thread::yield_now(),
        }
    }
    let _ = panic::catch_unwind(AssertUnwindSafe(|| registry.pass(FaultPolicy::Log)));
}

impl Executor for ThreadExecutor {
    fn submit(&self, coroutine: CoroutineHandle) {
        self.worker.registry.submit(coroutine);
    }

    fn stop_all(&self) {
        self.worker.registry.stop_all();
    }

    fn count(&self) -> usize {
        self.worker.registry.live()
    }

    fn finished_count(&self) -> u64 {
        self.worker.registry.finished()
    }

    fn logger(&self) -> Logger {
        self.worker.registry.sink().clone()
    }
}
