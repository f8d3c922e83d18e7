use super::helpers::{executor_with_sink, run_to_end, tick_n};
use crate::bridge::start_task;
use crate::error::{Fault, RuntimeError};
use crate::executor::{Executor, ManualExecutor, RegistryExecutor};
use crate::instruction::{Compute, Forever, ManualOperation, Operation, Ready};
use crate::logging::Severity;
use parking_lot::Mutex;
use std::sync::Arc;
use tokio_test::{assert_err, assert_ok};
use tokio_util::sync::CancellationToken;

#[test]
fn test_three_next_ticks_finish_on_fourth_tick() {
    let executor = RegistryExecutor::new();
    let task = start_task(&executor, |s| async move {
        for _ in 0..3 {
            s.next_tick().await?;
        }
        Ok(7)
    });

    assert_eq!(run_to_end(&executor, &task, 10), 4);
    assert_eq!(assert_ok!(task.result()), 7);
    assert_eq!(executor.count(), 0);
}

#[test]
fn test_value_resumes_with_operation_result() {
    let executor = RegistryExecutor::new();
    let input = ManualOperation::new();
    let op = input.clone();
    let task = start_task(&executor, move |s| async move {
        let ready = s.value(Ready::new(2)).await?;
        let external: u32 = s.value(op).await?;
        Ok(ready + external)
    });

    tick_n(&executor, 5);
    assert!(!task.is_finished());
    assert!(!task.is_done());

    input.set_value(40);
    run_to_end(&executor, &task, 5);
    assert_eq!(task.value().unwrap(), 42);
}

#[test]
fn test_instruction_fault_returns_at_await_point() {
    let executor = RegistryExecutor::new();
    let task = start_task(&executor, |s| async move {
        let failing = Compute::new(|| -> Result<u32, Fault> { Err(Fault::msg("inner failure")) });
        match s.value(failing).await {
            Ok(_) => Ok("unexpected".to_string()),
            Err(fault) => Ok(format!("recovered from {}", fault)),
        }
    });

    run_to_end(&executor, &task, 10);
    assert_eq!(task.result().unwrap(), "recovered from inner failure");
    assert!(!task.coroutine().has_fault());
}

#[test]
fn test_body_error_faults_task_and_is_logged_once() {
    let (executor, sink) = executor_with_sink();
    let fault = Fault::msg("body failed");
    let raised = fault.clone();
    let task = start_task(&executor, move |s| async move {
        s.next_tick().await?;
        Err::<(), _>(raised)
    });

    run_to_end(&executor, &task, 10);
    assert!(task.fault().unwrap().ptr_eq(&fault));
    assert!(matches!(task.result(), Err(RuntimeError::OperationNotReady)));
    assert_eq!(sink.count(Severity::Error), 1);
    assert!(sink.contains("body failed"));

    // The faulted task is gone and never polled again
    tick_n(&executor, 3);
    assert_eq!(sink.count(Severity::Error), 1);
}

#[test]
fn test_dispose_cancels_token() {
    let executor = RegistryExecutor::new();
    let seen: Arc<Mutex<Option<CancellationToken>>> = Arc::default();
    let out = seen.clone();
    let task = start_task(&executor, move |s| async move {
        *out.lock() = Some(s.cancellation_token());
        s.wait(Forever).await?;
        Ok(())
    });

    tick_n(&executor, 2);
    let token = seen.lock().clone().expect("body ran");
    assert!(!token.is_cancelled());

    task.dispose();
    assert!(token.is_cancelled());
    executor.tick().unwrap();
    assert_eq!(executor.count(), 0);
}

#[test]
fn test_waiting_on_task_handle() {
    let executor = RegistryExecutor::new();
    let producer = start_task(&executor, |s| async move {
        s.next_tick().await?;
        s.next_tick().await?;
        Ok("payload")
    });
    let awaited = producer.clone();
    let consumer = start_task(&executor, move |s| async move {
        let value = s.value(awaited).await?;
        Ok(value.len())
    });

    run_to_end(&executor, &consumer, 10);
    assert_eq!(consumer.result().unwrap(), 7);
    assert!(producer.is_finished());
}

#[test]
fn test_waiting_on_disposed_task_is_cancelled() {
    let executor = RegistryExecutor::new();
    let victim = start_task(&executor, |s| async move {
        s.wait(Forever).await?;
        Ok(0u8)
    });
    let awaited = victim.clone();
    let waiter = start_task(&executor, move |s| async move {
        Ok(s.value(awaited).await.map_err(|fault| fault.is_cancelled()))
    });

    tick_n(&executor, 2);
    victim.dispose();
    run_to_end(&executor, &waiter, 5);
    assert_eq!(waiter.result().unwrap(), Err(true));
    assert_err!(victim.result());
}
