use crate::executor::{Executor, ExecutorExt, ManualExecutor, RegistryExecutor};
use crate::instruction::{ManualInstruction, Operation};
use crate::time::ManualClock;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;

#[test]
fn test_wait_and_do_runs_action_once() {
    let executor = RegistryExecutor::new();
    let gate = ManualInstruction::new();
    let fired = Arc::new(AtomicU32::new(0));
    let f = fired.clone();
    let handle = executor.wait_and_do(gate.clone(), move || {
        f.fetch_add(1, Ordering::SeqCst);
    });

    executor.tick().unwrap();
    executor.tick().unwrap();
    assert_eq!(fired.load(Ordering::SeqCst), 0);

    gate.set_done();
    executor.tick().unwrap();
    assert_eq!(fired.load(Ordering::SeqCst), 1);
    assert!(handle.is_finished());
}

#[test]
fn test_wait_until_predicate() {
    let executor = RegistryExecutor::new();
    let ready = Arc::new(AtomicBool::new(false));
    let fired = Arc::new(AtomicBool::new(false));
    let (r, f) = (ready.clone(), fired.clone());
    executor.wait_until(move || r.load(Ordering::SeqCst), move || f.store(true, Ordering::SeqCst));

    executor.tick().unwrap();
    executor.tick().unwrap();
    assert!(!fired.load(Ordering::SeqCst));
    ready.store(true, Ordering::SeqCst);
    executor.tick().unwrap();
    assert!(fired.load(Ordering::SeqCst));
}

#[test]
fn test_execute_continuously_until_disposed() {
    let executor = RegistryExecutor::new();
    let runs = Arc::new(AtomicU32::new(0));
    let r = runs.clone();
    let handle = executor.execute_continuously(move || {
        r.fetch_add(1, Ordering::SeqCst);
    });

    // First tick yields the instruction, later ticks step it
    for _ in 0..4 {
        executor.tick().unwrap();
    }
    assert_eq!(runs.load(Ordering::SeqCst), 3);

    handle.dispose();
    executor.tick().unwrap();
    assert_eq!(runs.load(Ordering::SeqCst), 3);
    assert_eq!(executor.count(), 0);
}

#[test]
fn test_enqueue_delivers_result() {
    let executor = RegistryExecutor::new();
    let result = executor.enqueue(|| 6 * 7);
    assert!(!result.is_done());

    executor.tick().unwrap();
    executor.tick().unwrap();
    assert_eq!(result.value().unwrap(), 42);
}

#[test]
fn test_start_with_time_limit() {
    let executor = RegistryExecutor::new();
    let clock = ManualClock::new();
    let handle = executor.start_with_time_limit(ManualInstruction::new(), 2.0, clock.clone());

    executor.tick().unwrap();
    executor.tick().unwrap();
    assert!(!handle.is_finished());

    clock.advance(2.0);
    executor.tick().unwrap();
    assert!(handle.is_finished());
}
