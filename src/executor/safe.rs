use super::registry::{FaultPolicy, RegistryExecutor, RegistryExecutorBuilder};
use super::{Executor, ManualExecutor, TickError};
use crate::coroutine::CoroutineHandle;
use crate::logging::Logger;

/// Caller-ticked executor that never fails a tick
///
/// Faults escaping a coroutine are logged (unless `log_faults` is off), the
/// coroutine is disposed with the fault, and the remaining coroutines of the
/// same tick are still stepped. With `catch_panics` off a panicking coroutine
/// is treated the same way.
#[derive(Clone, Default)]
pub struct SafeExecutor {
    inner: RegistryExecutor,
}

impl SafeExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_builder(builder: RegistryExecutorBuilder) -> Self {
        Self {
            inner: builder.build(),
        }
    }
}

impl Executor for SafeExecutor {
    fn submit(&self, coroutine: CoroutineHandle) {
        self.inner.submit(coroutine);
    }

    fn stop_all(&self) {
        self.inner.stop_all();
    }

    fn count(&self) -> usize {
        self.inner.count()
    }

    fn finished_count(&self) -> u64 {
        self.inner.finished_count()
    }

    fn logger(&self) -> Logger {
        self.inner.logger()
    }
}

impl ManualExecutor for SafeExecutor {
    fn tick(&self) -> Result<(), TickError> {
        self.inner.registry().pass(FaultPolicy::Log)
    }
}
