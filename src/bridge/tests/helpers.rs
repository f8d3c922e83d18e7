use crate::bridge::{Suspender, TaskHandle};
use crate::error::Fault;
use crate::executor::{ManualExecutor, RegistryExecutor};
use crate::logging::MemorySink;
use std::sync::Arc;
use std::time::Duration;

pub fn executor_with_sink() -> (RegistryExecutor, Arc<MemorySink>) {
    let sink = MemorySink::new();
    (RegistryExecutor::builder().sink(sink.clone()).build(), sink)
}

/// Tick until `task` finished; returns the number of ticks it took
pub fn run_to_end<T: Clone + Send>(executor: &RegistryExecutor, task: &TaskHandle<T>, max_ticks: usize) -> usize {
    for tick in 1..=max_ticks {
        executor.tick().expect("tick failed");
        if task.is_finished() {
            return tick;
        }
    }
    panic!("task did not finish within {} ticks", max_ticks);
}

/// Like [`run_to_end`] but sleeps between ticks, for work on other threads
pub fn run_to_end_slowly<T: Clone + Send>(executor: &RegistryExecutor, task: &TaskHandle<T>) {
    for _ in 0..5_000 {
        executor.tick().expect("tick failed");
        if task.is_finished() {
            return;
        }
        std::thread::sleep(Duration::from_millis(1));
    }
    panic!("task did not finish in time");
}

pub fn tick_n(executor: &RegistryExecutor, n: usize) {
    for _ in 0..n {
        executor.tick().expect("tick failed");
    }
}

/// Waits `n` ticks, then resumes with `n`
pub async fn count_ticks(s: Suspender, n: u32) -> Result<u32, Fault> {
    for _ in 0..n {
        s.next_tick().await?;
    }
    Ok(n)
}

/// Waits `after` ticks, then fails with `fault`
pub async fn fail_after(s: Suspender, after: u32, fault: Fault) -> Result<u32, Fault> {
    for _ in 0..after {
        s.next_tick().await?;
    }
    Err(fault)
}

/// Poll `condition` until it holds or the timeout passes
pub fn eventually(timeout: Duration, mut condition: impl FnMut() -> bool) -> bool {
    let deadline = std::time::Instant::now() + timeout;
    while std::time::Instant::now() < deadline {
        if condition() {
            return true;
        }
        std::thread::sleep(Duration::from_millis(1));
    }
    condition()
}
