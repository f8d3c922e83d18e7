//! Registry executor
//!
//! Three collections back the registry:
//!
//! ```text
//!   submit() ──► pending ──(start of tick)──► active ──(end of tick)──► retired
//!                                               ▲
//!   stop_all() ── remove-all flag ──────────────┘
//! ```
//!
//! Only the ticking thread touches `active`. Other threads only take the
//! pending lock or flip atomics, so submitting or stopping from inside a
//! running coroutine is fine.

use super::{panic_message, step_guarded, Executor, ManualExecutor, TickError};
use crate::config::ExecutorConfig;
use crate::coroutine::CoroutineHandle;
use crate::error::Fault;
use crate::logging::{default_logger, Logger, Severity};
use parking_lot::Mutex;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;

const CONTEXT: &str = "executor";

/// What a tick does once a fault escaped a coroutine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum FaultPolicy {
    /// Finish the tick, then report the first fault
    Report,
    /// Log every fault and carry on, panics that escape a step included
    Log,
}

pub(crate) struct Registry {
    active: Mutex<Vec<CoroutineHandle>>,
    pending: Mutex<Vec<CoroutineHandle>>,
    has_pending: AtomicBool,
    remove_all: AtomicBool,
    live: AtomicUsize,
    finished: AtomicU64,
    sink: Logger,
    catch_panics: bool,
    log_faults: bool,
}

impl Registry {
    /// Run one tick
    pub(crate) fn pass(&self, policy: FaultPolicy) -> Result<(), TickError> {
        let mut active = self.active.lock();

        if self.remove_all.swap(false, Ordering::AcqRel) {
            let stopped = active.len();
            for coroutine in active.drain(..) {
                coroutine.dispose();
                coroutine.machine().try_release();
            }
            self.retire(stopped);
            return Ok(());
        }

        if self.has_pending.load(Ordering::Acquire) {
            let mut pending = self.pending.lock();
            self.has_pending.store(false, Ordering::Release);
            active.append(&mut pending);
        }

        let mut first_error = None;
        match policy {
            FaultPolicy::Report => {
                for (index, coroutine) in active.iter().enumerate() {
                    if let Err(fault) = step_guarded(coroutine, self.catch_panics) {
                        self.escaped(coroutine, index, fault, policy, &mut first_error);
                    }
                }
            }
            FaultPolicy::Log => self.step_resuming(&active, &mut first_error),
        }

        let before = active.len();
        active.retain(|coroutine| {
            if coroutine.is_finished() {
                coroutine.machine().try_release();
                false
            } else {
                true
            }
        });
        self.retire(before - active.len());

        match first_error {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }

    /// Step every coroutine, surviving panics that escape a step
    ///
    /// A panic disposes the coroutine that raised it and the walk resumes
    /// with the next one, so the rest of the tick still runs.
    fn step_resuming(&self, active: &[CoroutineHandle], first_error: &mut Option<TickError>) {
        let mut from = 0;
        while from < active.len() {
            let mut cursor = from;
            let walk = panic::catch_unwind(AssertUnwindSafe(|| {
                for (index, coroutine) in active.iter().enumerate().skip(from) {
                    cursor = index;
                    if let Err(fault) = step_guarded(coroutine, self.catch_panics) {
                        self.escaped(coroutine, index, fault, FaultPolicy::Log, first_error);
                    }
                }
            }));
            let Err(payload) = walk else {
                return;
            };
            let fault = Fault::msg(format!("coroutine panicked: {}", panic_message(payload.as_ref())));
            self.escaped(&active[cursor], cursor, fault, FaultPolicy::Log, first_error);
            from = cursor + 1;
        }
    }

    /// Dispose a coroutine whose fault reached the executor and record or log it
    fn escaped(
        &self,
        coroutine: &CoroutineHandle,
        index: usize,
        fault: Fault,
        policy: FaultPolicy,
        first_error: &mut Option<TickError>,
    ) {
        coroutine.machine().dispose_from_fault(fault.clone());
        let error = TickError::Faulted {
            id: coroutine.id(),
            index,
            fault,
        };

        match policy {
            FaultPolicy::Report if first_error.is_none() => *first_error = Some(error),
            FaultPolicy::Report => self.report(&error),
            FaultPolicy::Log if self.log_faults => self.report(&error),
            FaultPolicy::Log => {}
        }
    }

    fn retire(&self, n: usize) {
        if n == 0 {
            return;
        }
        self.live.fetch_sub(n, Ordering::AcqRel);
        self.finished.fetch_add(n as u64, Ordering::AcqRel);
    }

    fn report(&self, error: &TickError) {
        self.sink.log(&error.to_string(), Severity::Error, Some(CONTEXT));
    }

    pub(crate) fn sink(&self) -> &Logger {
        &self.sink
    }

    pub(crate) fn live(&self) -> usize {
        self.live.load(Ordering::Acquire)
    }

    pub(crate) fn finished(&self) -> u64 {
        self.finished.load(Ordering::Acquire)
    }

    pub(crate) fn submit(&self, coroutine: CoroutineHandle) {
        if !coroutine.machine().mark_submitted() {
            self.sink.log(
                &format!("coroutine {} was already submitted; ignored", coroutine.id()),
                Severity::Warning,
                Some(CONTEXT),
            );
            return;
        }
        self.live.fetch_add(1, Ordering::AcqRel);
        let mut pending = self.pending.lock();
        pending.push(coroutine);
        self.has_pending.store(true, Ordering::Release);
    }

    pub(crate) fn stop_all(&self) {
        self.remove_all.store(true, Ordering::Release);
        let drained = {
            let mut pending = self.pending.lock();
            self.has_pending.store(false, Ordering::Release);
            std::mem::take(&mut *pending)
        };
        let stopped = drained.len();
        for coroutine in drained {
            coroutine.dispose();
            coroutine.machine().try_release();
        }
        self.retire(stopped);
    }
}

/* ===================== Executor ===================== */

/// Caller-ticked executor
///
/// Clones share the same registry.
#[derive(Clone)]
pub struct RegistryExecutor {
    registry: Arc<Registry>,
}

impl RegistryExecutor {
    pub fn new() -> Self {
        Self::builder().build()
    }

    pub fn builder() -> RegistryExecutorBuilder {
        RegistryExecutorBuilder::default()
    }

    pub(crate) fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }
}

impl Default for RegistryExecutor {
    fn default() -> Self {
        Self::new()
    }
}

impl Executor for RegistryExecutor {
    fn submit(&self, coroutine: CoroutineHandle) {
        self.registry.submit(coroutine);
    }

    fn stop_all(&self) {
        self.registry.stop_all();
    }

    fn count(&self) -> usize {
        self.registry.live()
    }

    fn finished_count(&self) -> u64 {
        self.registry.finished()
    }

    fn logger(&self) -> Logger {
        self.registry.sink().clone()
    }
}

impl ManualExecutor for RegistryExecutor {
    /// Step every active coroutine once
    ///
    /// A fault escaping a coroutine disposes it; the rest of the tick still
    /// runs and the first such fault is returned at the end.
    fn tick(&self) -> Result<(), TickError> {
        self.registry.pass(FaultPolicy::Report)
    }
}

/* ===================== Builder ===================== */

pub struct RegistryExecutorBuilder {
    sink: Option<Logger>,
    catch_panics: bool,
    log_faults: bool,
}

impl Default for RegistryExecutorBuilder {
    fn default() -> Self {
        let defaults = ExecutorConfig::default();
        Self {
            sink: None,
            catch_panics: defaults.catch_panics,
            log_faults: defaults.log_faults,
        }
    }
}

impl RegistryExecutorBuilder {
    pub fn sink(mut self, sink: Logger) -> Self {
        self.sink = Some(sink);
        self
    }

    pub fn config(mut self, config: &ExecutorConfig) -> Self {
        self.catch_panics = config.catch_panics;
        self.log_faults = config.log_faults;
        self
    }

    pub fn catch_panics(mut self, enabled: bool) -> Self {
        self.catch_panics = enabled;
        self
    }

    pub fn log_faults(mut self, enabled: bool) -> Self {
        self.log_faults = enabled;
        self
    }

    pub(crate) fn build_registry(self) -> Registry {
        Registry {
            active: Mutex::new(Vec::new()),
            pending: Mutex::new(Vec::new()),
            has_pending: AtomicBool::new(false),
            remove_all: AtomicBool::new(false),
            live: AtomicUsize::new(0),
            finished: AtomicU64::new(0),
            sink: self.sink.unwrap_or_else(default_logger),
            catch_panics: self.catch_panics,
            log_faults: self.log_faults,
        }
    }

    pub fn build(self) -> RegistryExecutor {
        RegistryExecutor {
            registry: Arc::new(self.build_registry()),
        }
    }
}
