use super::helpers::{count_ticks, executor_with_sink, fail_after, run_to_end, tick_n};
use crate::bridge::{start_task, ChildPolicy, JoinMode, TaskHandle};
use crate::coroutine::CoroutineHandle;
use crate::error::{Fault, RuntimeError};
use crate::executor::{Executor, ManualExecutor, RegistryExecutor};
use crate::instruction::Forever;
use crate::logging::Severity;
use parking_lot::Mutex;
use std::sync::Arc;

#[test]
fn test_child_fault_surfaces_at_parent_await() {
    let (executor, sink) = executor_with_sink();
    let fault = Fault::msg("child failed");
    let raised = fault.clone();
    let parent = start_task(&executor, move |s| async move {
        s.spawn_child(move |c| fail_after(c, 2, raised), ChildPolicy::AsChild);
        match s.wait(Forever).await {
            Ok(()) => Ok(None),
            Err(seen) => Ok(Some(seen)),
        }
    });

    run_to_end(&executor, &parent, 10);
    let seen = parent.result().unwrap().expect("parent saw the fault");
    assert!(seen.ptr_eq(&fault));
    assert_eq!(sink.count(Severity::Error), 0);
}

#[test]
fn test_unhandled_child_fault_fails_parent() {
    let (executor, sink) = executor_with_sink();
    let fault = Fault::msg("child failed");
    let raised = fault.clone();
    let parent = start_task(&executor, move |s| async move {
        s.spawn_child(move |c| fail_after(c, 1, raised), ChildPolicy::AsChild);
        s.wait(Forever).await?;
        Ok(())
    });

    run_to_end(&executor, &parent, 10);
    assert!(parent.fault().unwrap().ptr_eq(&fault));
    // Reported once, by the parent
    assert_eq!(sink.count(Severity::Error), 1);
}

#[test]
fn test_dispose_cascades_to_descendants() {
    let executor = RegistryExecutor::new();
    let spawned: Arc<Mutex<Vec<CoroutineHandle>>> = Arc::default();
    let out = spawned.clone();
    let parent = start_task(&executor, move |s| async move {
        let grandchildren = out.clone();
        let child = s.spawn_child(
            move |c| async move {
                let grandchild = c.spawn_child(
                    |g| async move {
                        g.wait(Forever).await?;
                        Ok(())
                    },
                    ChildPolicy::AsChild,
                );
                grandchildren.lock().push(grandchild.coroutine().clone());
                c.wait(Forever).await?;
                Ok(())
            },
            ChildPolicy::AsChild,
        );
        out.lock().push(child.coroutine().clone());
        s.wait(Forever).await?;
        Ok(())
    });

    tick_n(&executor, 3);
    assert_eq!(spawned.lock().len(), 2);
    assert!(spawned.lock().iter().all(|c| !c.is_finished()));

    parent.dispose();
    assert!(parent.is_finished());
    assert!(spawned.lock().iter().all(CoroutineHandle::is_finished));

    executor.tick().unwrap();
    assert_eq!(executor.count(), 0);
}

#[test]
fn test_detached_child_outlives_parent() {
    let (executor, sink) = executor_with_sink();
    let slot: Arc<Mutex<Option<TaskHandle<u32>>>> = Arc::default();
    let out = slot.clone();
    let parent = start_task(&executor, move |s| async move {
        *out.lock() = Some(s.spawn_child(|c| count_ticks(c, 4), ChildPolicy::Detached));
        s.wait(Forever).await?;
        Ok(())
    });

    tick_n(&executor, 2);
    parent.dispose();
    let child = slot.lock().clone().expect("child spawned");
    assert!(!child.is_finished());

    run_to_end(&executor, &child, 10);
    assert_eq!(child.result().unwrap(), 4);
    assert_eq!(sink.count(Severity::Error), 0);
}

#[test]
fn test_detached_child_fault_is_logged() {
    let (executor, sink) = executor_with_sink();
    let slot: Arc<Mutex<Option<TaskHandle<u32>>>> = Arc::default();
    let out = slot.clone();
    let parent = start_task(&executor, move |s| async move {
        *out.lock() = Some(s.spawn_child(
            |c| fail_after(c, 1, Fault::msg("detached failure")),
            ChildPolicy::Detached,
        ));
        s.next_tick().await?;
        s.next_tick().await?;
        s.next_tick().await?;
        Ok(())
    });

    run_to_end(&executor, &parent, 10);
    let child = slot.lock().clone().expect("child spawned");
    assert!(child.fault().is_some());
    assert!(parent.fault().is_none());
    assert_eq!(sink.count(Severity::Error), 1);
    assert!(sink.contains("detached failure"));
}

#[test]
fn test_child_fault_after_parent_completed_is_logged() {
    let (executor, sink) = executor_with_sink();
    let slot: Arc<Mutex<Option<TaskHandle<u32>>>> = Arc::default();
    let out = slot.clone();
    let parent = start_task(&executor, move |s| async move {
        *out.lock() = Some(s.spawn_child(
            |c| fail_after(c, 2, Fault::msg("late failure")),
            ChildPolicy::AsChild,
        ));
        Ok(())
    });

    tick_n(&executor, 1);
    assert!(parent.result().is_ok());

    let child = slot.lock().clone().expect("child spawned");
    run_to_end(&executor, &child, 10);
    assert!(child.fault().is_some());
    assert_eq!(sink.count(Severity::Error), 1);
    assert!(sink.contains("late failure"));
}

#[test]
fn test_joined_child_fault_is_reported_once() {
    let (executor, sink) = executor_with_sink();
    let fault = Fault::msg("joined failure");
    let raised = fault.clone();
    let parent = start_task(&executor, move |s| async move {
        let child = s.spawn_child(move |c| fail_after(c, 1, raised), ChildPolicy::AsChild);
        let joined = s.join_many(vec![child.coroutine().clone()], JoinMode::FailFast).await;
        let after = s.next_tick().await;
        Ok((joined.err(), after.is_ok()))
    });

    run_to_end(&executor, &parent, 10);
    let (joined, next_ok) = parent.result().unwrap();
    let joined = joined.expect("join raised the child fault");
    assert!(matches!(
        joined.runtime_error(),
        Some(RuntimeError::CoroutineFaulted(inner)) if inner.ptr_eq(&fault)
    ));
    assert!(next_ok);
    assert_eq!(sink.count(Severity::Error), 0);
}
