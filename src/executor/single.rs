use super::{step_guarded, Executor, ManualExecutor, TickError};
use crate::config::ExecutorConfig;
use crate::coroutine::CoroutineHandle;
use crate::logging::{default_logger, Logger, Severity};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

const CONTEXT: &str = "single-executor";

struct Slot {
    current: Mutex<Option<CoroutineHandle>>,
    finished: AtomicU64,
    sink: Logger,
    catch_panics: bool,
}

impl Slot {
    /// Dispose and drop a coroutine that left the slot
    fn finalize(&self, coroutine: CoroutineHandle) {
        coroutine.dispose();
        coroutine.machine().try_release();
        self.finished.fetch_add(1, Ordering::AcqRel);
    }

    /// Empty the slot if it still holds `coroutine`
    fn retire(&self, coroutine: &CoroutineHandle) {
        let removed = {
            let mut current = self.current.lock();
            match current.as_ref() {
                Some(held) if held.ptr_eq(coroutine) => current.take(),
                _ => None,
            }
        };
        if let Some(coroutine) = removed {
            self.finalize(coroutine);
        }
    }
}

/// Executor holding at most one coroutine
///
/// Submitting a coroutine disposes and drops the one it replaces before the
/// new one is installed.
#[derive(Clone)]
pub struct SingleExecutor {
    slot: Arc<Slot>,
}

impl SingleExecutor {
    pub fn new() -> Self {
        Self::with_sink(default_logger())
    }

    pub fn with_sink(sink: Logger) -> Self {
        Self::builder().sink(sink).build()
    }

    pub fn builder() -> SingleExecutorBuilder {
        SingleExecutorBuilder::default()
    }

    pub fn current(&self) -> Option<CoroutineHandle> {
        self.slot.current.lock().clone()
    }
}

impl Default for SingleExecutor {
    fn default() -> Self {
        Self::new()
    }
}

impl Executor for SingleExecutor {
    fn submit(&self, coroutine: CoroutineHandle) {
        if !coroutine.machine().mark_submitted() {
            self.slot.sink.log(
                &format!("coroutine {} was already submitted; ignored", coroutine.id()),
                Severity::Warning,
                Some(CONTEXT),
            );
            return;
        }

        let previous = self.slot.current.lock().take();
        if let Some(previous) = previous {
            if !previous.is_finished() {
                self.slot.sink.log(
                    &format!("coroutine {} replaced by {}", previous.id(), coroutine.id()),
                    Severity::Warning,
                    Some(CONTEXT),
                );
            }
            self.slot.finalize(previous);
        }

        let displaced = self.slot.current.lock().replace(coroutine);
        if let Some(displaced) = displaced {
            self.slot.finalize(displaced);
        }
    }

    fn stop_all(&self) {
        let current = self.slot.current.lock().take();
        if let Some(current) = current {
            self.slot.finalize(current);
        }
    }

    fn count(&self) -> usize {
        usize::from(self.slot.current.lock().is_some())
    }

    fn finished_count(&self) -> u64 {
        self.slot.finished.load(Ordering::Acquire)
    }

    fn logger(&self) -> Logger {
        self.slot.sink.clone()
    }
}

impl ManualExecutor for SingleExecutor {
    fn tick(&self) -> Result<(), TickError> {
        let Some(coroutine) = self.current() else {
            return Ok(());
        };

        match step_guarded(&coroutine, self.slot.catch_panics) {
            Ok(true) => Ok(()),
            Ok(false) => {
                self.slot.retire(&coroutine);
                Ok(())
            }
            Err(fault) => {
                coroutine.machine().dispose_from_fault(fault.clone());
                self.slot.retire(&coroutine);
                Err(TickError::Faulted {
                    id: coroutine.id(),
                    index: 0,
                    fault,
                })
            }
        }
    }
}

pub struct SingleExecutorBuilder {
    sink: Option<Logger>,
    catch_panics: bool,
}

impl Default for SingleExecutorBuilder {
    fn default() -> Self {
        Self {
            sink: None,
            catch_panics: ExecutorConfig::default().catch_panics,
        }
    }
}

impl SingleExecutorBuilder {
    pub fn sink(mut self, sink: Logger) -> Self {
        self.sink = Some(sink);
        self
    }

    /// Take `catch_panics` from the config; the slot has no use for the rest
    pub fn config(mut self, config: &ExecutorConfig) -> Self {
        self.catch_panics = config.catch_panics;
        self
    }

    pub fn catch_panics(mut self, enabled: bool) -> Self {
        self.catch_panics = enabled;
        self
    }

    pub fn build(self) -> SingleExecutor {
        SingleExecutor {
            slot: Arc::new(Slot {
                current: Mutex::new(None),
                finished: AtomicU64::new(0),
                sink: self.sink.unwrap_or_else(default_logger),
                catch_panics: self.catch_panics,
            }),
        }
    }
}
