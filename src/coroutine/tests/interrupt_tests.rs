use super::helpers::{counter, failing_after, Recorder};
use crate::coroutine::{from_iter, CoroutineHandle, CoroutineState, InterruptReason, Yielded};
use crate::error::Fault;
use crate::logging::default_logger;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

#[test]
fn test_dispose_before_first_step() {
    let recorder = Recorder::new();
    let count = Arc::new(AtomicU32::new(0));
    let handle = CoroutineHandle::new(Box::new(counter(count.clone())), Some(recorder.handler()), default_logger());

    handle.dispose();
    handle.dispose();

    assert_eq!(recorder.reasons(), vec![InterruptReason::Disposed]);
    assert!(recorder.faults()[0].is_none());
    assert!(!handle.machine().step().unwrap());
    assert_eq!(count.load(Ordering::SeqCst), 0);
    assert_eq!(handle.state(), CoroutineState::Finished);
}

#[test]
fn test_plain_handler_is_silent_on_normal_end() {
    let recorder = Recorder::new();
    let handle = CoroutineHandle::new(
        Box::new(from_iter(vec![Yielded::Interrupt(recorder.handler()), Yielded::NextTick])),
        None,
        default_logger(),
    );
    assert!(handle.machine().step().unwrap());
    assert!(!handle.machine().step().unwrap());
    assert!(recorder.reasons().is_empty());
}

#[test]
fn test_on_end_handler_sees_completion() {
    let recorder = Recorder::new();
    let handle = CoroutineHandle::new(
        Box::new(from_iter(vec![Yielded::Interrupt(recorder.handler().on_end()), Yielded::NextTick])),
        None,
        default_logger(),
    );
    assert!(handle.machine().step().unwrap());
    assert!(!handle.machine().step().unwrap());
    assert_eq!(recorder.reasons(), vec![InterruptReason::Completed]);

    // Disposing after the end does not call it again
    handle.dispose();
    assert_eq!(recorder.reasons().len(), 1);
}

#[test]
fn test_keep_running_on_fault() {
    let recorder = Recorder::new();
    let fault = Fault::msg("recoverable");
    let count = Arc::new(AtomicU32::new(0));
    let handler = recorder.handler().keep_running_on_fault();
    let handle = CoroutineHandle::new(
        Box::new(failing_after(Some(handler), 2, fault.clone(), count.clone())),
        None,
        default_logger(),
    );

    assert!(handle.machine().step().unwrap());
    // Second count faults; the handler sees it and the routine carries on
    assert!(handle.machine().step().unwrap());
    assert_eq!(recorder.reasons(), vec![InterruptReason::Faulted]);
    assert!(handle.has_fault());
    assert_eq!(handle.state(), CoroutineState::Running);

    assert!(handle.machine().step().unwrap());
    assert_eq!(count.load(Ordering::SeqCst), 3);

    handle.dispose();
    assert_eq!(
        recorder.reasons(),
        vec![InterruptReason::Faulted, InterruptReason::Disposed]
    );
}
