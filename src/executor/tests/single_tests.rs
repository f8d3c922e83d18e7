use super::helpers::{counter, faulting, panicking, recording_handler};
use crate::config::ExecutorConfig;
use crate::coroutine::{from_iter, InterruptReason, Yielded};
use crate::error::Fault;
use crate::executor::{Executor, ExecutorExt, ManualExecutor, SingleExecutor};
use crate::logging::{MemorySink, Severity};
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

#[test]
fn test_starting_second_coroutine_finalizes_first() {
    let sink = MemorySink::new();
    let executor = SingleExecutor::with_sink(sink.clone());
    let first_count = Arc::new(AtomicU32::new(0));
    let second_count = Arc::new(AtomicU32::new(0));
    let (handler, reasons) = recording_handler();

    let first = executor.start_with(counter(first_count.clone()), handler);
    executor.tick().unwrap();

    let second = executor.start(counter(second_count.clone()));
    assert!(first.is_finished());
    assert_eq!(*reasons.lock(), vec![InterruptReason::Disposed]);
    assert_eq!(sink.count(Severity::Warning), 1);
    assert_eq!(executor.count(), 1);
    assert_eq!(executor.finished_count(), 1);
    assert!(executor.current().unwrap().ptr_eq(&second));

    executor.tick().unwrap();
    assert_eq!(first_count.load(Ordering::SeqCst), 1);
    assert_eq!(second_count.load(Ordering::SeqCst), 1);
}

#[test]
fn test_finished_coroutine_leaves_slot() {
    let executor = SingleExecutor::new();
    executor.start(from_iter(vec![Yielded::NextTick]));
    executor.tick().unwrap();
    executor.tick().unwrap();
    assert_eq!(executor.count(), 0);
    assert_eq!(executor.finished_count(), 1);

    // Ticking an empty slot does nothing
    executor.tick().unwrap();
    assert_eq!(executor.finished_count(), 1);
}

#[test]
fn test_fault_empties_slot() {
    let executor = SingleExecutor::new();
    let fault = Fault::msg("single");
    let handle = executor.start(faulting(fault.clone()));

    let error = executor.tick().unwrap_err();
    assert!(error.fault().ptr_eq(&fault));
    assert!(handle.has_fault());
    assert_eq!(executor.count(), 0);
}

#[test]
fn test_stop_all_clears_slot() {
    let executor = SingleExecutor::new();
    let handle = executor.start(counter(Arc::new(AtomicU32::new(0))));
    executor.stop_all();
    assert!(handle.is_finished());
    assert_eq!(executor.count(), 0);
    assert_eq!(executor.finished_count(), 1);
}

#[test]
fn test_builder_catches_panics_by_default() {
    let sink = MemorySink::new();
    let executor = SingleExecutor::builder().sink(sink.clone()).build();
    let handle = executor.start(panicking("slot kaboom"));

    let error = executor.tick().unwrap_err();
    assert!(error.fault().to_string().contains("slot kaboom"));
    assert!(handle.has_fault());
    assert_eq!(executor.count(), 0);
}

#[test]
fn test_builder_takes_catch_panics_from_config() {
    let config = ExecutorConfig {
        catch_panics: false,
        ..ExecutorConfig::default()
    };
    let executor = SingleExecutor::builder().config(&config).build();
    executor.start(panicking("let it through"));

    let outcome = panic::catch_unwind(AssertUnwindSafe(|| executor.tick()));
    assert!(outcome.is_err());
}
