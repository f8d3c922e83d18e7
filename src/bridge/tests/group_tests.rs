use super::helpers::{count_ticks, executor_with_sink, fail_after, run_to_end};
use crate::bridge::{start_task, ChildPolicy, JoinMode, TaskHandle};
use crate::error::{Fault, RuntimeError};
use crate::executor::{ManualExecutor, RegistryExecutor};
use crate::instruction::{Forever, ManualInstruction};
use crate::logging::Severity;
use parking_lot::Mutex;
use std::sync::Arc;

type Children = Arc<Mutex<Vec<TaskHandle<u32>>>>;

#[test]
fn test_race_many_picks_first_and_disposes_rest() {
    let executor = RegistryExecutor::new();
    let children: Children = Arc::default();
    let out = children.clone();
    let parent = start_task(&executor, move |s| async move {
        let spawned: Vec<TaskHandle<u32>> = [3, 1, 2]
            .into_iter()
            .map(|n| s.spawn_child(move |c| count_ticks(c, n), ChildPolicy::AsChild))
            .collect();
        *out.lock() = spawned.clone();
        s.race_many(spawned.iter().map(|t| t.coroutine().clone()).collect()).await
    });

    run_to_end(&executor, &parent, 10);
    assert_eq!(parent.result().unwrap(), 1);

    let children = children.lock();
    assert!(children.iter().all(TaskHandle::is_finished));
    assert_eq!(children[1].result().unwrap(), 1);
    assert!(children[0].result().is_err());
}

#[test]
fn test_join_many_fail_soft_aggregates() {
    let (executor, sink) = executor_with_sink();
    let parent = start_task(&executor, |s| async move {
        let a = s.spawn_child(|c| fail_after(c, 1, Fault::msg("first")), ChildPolicy::AsChild);
        let b = s.spawn_child(|c| count_ticks(c, 2), ChildPolicy::AsChild);
        let d = s.spawn_child(|c| fail_after(c, 3, Fault::msg("second")), ChildPolicy::AsChild);
        let coroutines = vec![a.coroutine().clone(), b.coroutine().clone(), d.coroutine().clone()];

        let joined = s.join_many(coroutines, JoinMode::FailSoft).await;
        Ok((
            joined.err().and_then(|fault| fault.aggregated().map(<[Fault]>::len)),
            b.result().ok(),
        ))
    });

    run_to_end(&executor, &parent, 10);
    assert_eq!(parent.result().unwrap(), (Some(2), Some(2)));
    assert_eq!(sink.count(Severity::Error), 0);
}

#[test]
fn test_join_many_fail_fast_raises_first_fault() {
    let (executor, sink) = executor_with_sink();
    let first = Fault::msg("first");
    let raised = first.clone();
    let parent = start_task(&executor, move |s| async move {
        let a = s.spawn_child(move |c| fail_after(c, 1, raised), ChildPolicy::AsChild);
        let b = s.spawn_child(|c| fail_after(c, 1, Fault::msg("second")), ChildPolicy::AsChild);
        let joined = s
            .join_many(vec![a.coroutine().clone(), b.coroutine().clone()], JoinMode::FailFast)
            .await;
        Ok(joined.err())
    });

    run_to_end(&executor, &parent, 10);
    let fault = parent.result().unwrap().expect("join failed");
    assert!(matches!(
        fault.runtime_error(),
        Some(RuntimeError::CoroutineFaulted(inner)) if inner.ptr_eq(&first)
    ));
    assert_eq!(sink.count(Severity::Error), 0);
}

#[test]
fn test_failed_join_disposes_the_rest() {
    let (executor, sink) = executor_with_sink();
    let parent = start_task(&executor, |s| async move {
        let a = s.spawn_child(|c| fail_after(c, 1, Fault::msg("early")), ChildPolicy::AsChild);
        let b = s.spawn_child(|c| fail_after(c, 4, Fault::msg("late")), ChildPolicy::AsChild);
        let joined = s
            .join_many(vec![a.coroutine().clone(), b.coroutine().clone()], JoinMode::FailFast)
            .await;
        let late_stopped = b.is_finished();

        // The late sibling must not fail an unrelated wait afterwards
        for _ in 0..8 {
            s.next_tick().await?;
        }
        Ok((joined.is_err(), late_stopped, b.result().is_err()))
    });

    run_to_end(&executor, &parent, 20);
    assert_eq!(parent.result().unwrap(), (true, true, true));
    assert_eq!(sink.count(Severity::Error), 0);
}

#[test]
fn test_failed_select_values_disposes_the_rest() {
    let executor = RegistryExecutor::new();
    let parent = start_task(&executor, |s| async move {
        let spawned = vec![
            s.spawn_child(|c| fail_after(c, 1, Fault::msg("early")), ChildPolicy::AsChild),
            s.spawn_child(|c| count_ticks(c, 6), ChildPolicy::AsChild),
        ];
        let slow = spawned[1].clone();
        let selected = s.select_values(spawned).await;
        Ok((selected.is_err(), slow.is_finished(), slow.result().is_err()))
    });

    run_to_end(&executor, &parent, 10);
    assert_eq!(parent.result().unwrap(), (true, true, true));
}

#[test]
fn test_join_many_of_nothing_resumes_at_once() {
    let executor = RegistryExecutor::new();
    let parent = start_task(&executor, |s| async move {
        s.join_many(Vec::new(), JoinMode::FailFast).await?;
        Ok(())
    });

    assert_eq!(run_to_end(&executor, &parent, 3), 1);
}

#[test]
fn test_select_values_keeps_order() {
    let executor = RegistryExecutor::new();
    let parent = start_task(&executor, |s| async move {
        let tasks = [(3u32, 10u32), (1, 20), (2, 30)]
            .into_iter()
            .map(|(ticks, value)| {
                s.spawn_child(
                    move |c| async move {
                        count_ticks(c, ticks).await?;
                        Ok(value)
                    },
                    ChildPolicy::AsChild,
                )
            })
            .collect();
        s.select_values(tasks).await
    });

    run_to_end(&executor, &parent, 10);
    assert_eq!(parent.result().unwrap(), vec![10, 20, 30]);
}

#[test]
fn test_signal_stop_on_interrupts_parent() {
    let (executor, sink) = executor_with_sink();
    let gate = ManualInstruction::new();
    let trigger = gate.clone();
    let parent = start_task(&executor, move |s| async move {
        s.signal_stop_on(trigger)?;
        let waited = s.wait(Forever).await;
        Ok(waited.err().map(|fault| fault.is_stop_signal()))
    });

    for _ in 0..3 {
        executor.tick().unwrap();
    }
    assert!(!parent.is_finished());

    gate.set_done();
    run_to_end(&executor, &parent, 5);
    assert_eq!(parent.result().unwrap(), Some(true));
    assert_eq!(sink.count(Severity::Error), 0);
}
