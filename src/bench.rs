//! Tick throughput benchmark behind `proutines bench`

use anyhow::{anyhow, Context, Result};
use clap::ValueEnum;
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::bridge::start_task;
use crate::config::ExecutorConfig;
use crate::coroutine::{routine_fn, Yielded};
use crate::executor::{
    Executor, ExecutorExt, ManualExecutor, RegistryExecutor, SafeExecutor, SingleExecutor, ThreadExecutor,
};
use crate::logging::default_logger;

/// How long a self-ticking executor may take before the run is abandoned
const THREAD_TIMEOUT: Duration = Duration::from_secs(300);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ExecutorKind {
    Registry,
    Safe,
    Single,
    Thread,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Workload {
    /// Plain routines that count their resumes
    Counter,
    /// Async bodies awaiting `next_tick` in a loop
    Task,
}

pub struct BenchParams {
    pub coroutines: usize,
    pub ticks: u64,
    pub executor: ExecutorKind,
    pub workload: Workload,
    pub executor_config: ExecutorConfig,
}

#[derive(Debug, Clone, Serialize)]
pub struct BenchReport {
    pub executor: ExecutorKind,
    pub workload: Workload,
    pub coroutines: usize,
    pub ticks: u64,
    /// Resumes observed across all coroutines
    pub steps: u64,
    pub elapsed_ms: f64,
    pub ticks_per_sec: f64,
    pub steps_per_sec: f64,
    /// Coroutines the executor dropped by the end of the run
    pub finished: u64,
}

struct Measurement {
    ticks: u64,
    elapsed: Duration,
    finished: u64,
}

pub fn run_bench(params: &BenchParams) -> Result<BenchReport> {
    validate_params(params)?;

    let steps = Arc::new(AtomicU64::new(0));
    let measurement = match params.executor {
        ExecutorKind::Registry => {
            let executor = RegistryExecutor::builder().config(&params.executor_config).build();
            drive_manual(executor, params, &steps)?
        }
        ExecutorKind::Safe => {
            let builder = RegistryExecutor::builder().config(&params.executor_config);
            drive_manual(SafeExecutor::from_builder(builder), params, &steps)?
        }
        ExecutorKind::Single => {
            let executor = SingleExecutor::builder().config(&params.executor_config).build();
            drive_manual(executor, params, &steps)?
        }
        ExecutorKind::Thread => drive_thread(params, &steps)?,
    };

    let steps = steps.load(Ordering::Acquire);
    let secs = measurement.elapsed.as_secs_f64().max(f64::EPSILON);
    Ok(BenchReport {
        executor: params.executor,
        workload: params.workload,
        coroutines: params.coroutines,
        ticks: measurement.ticks,
        steps,
        elapsed_ms: secs * 1000.0,
        ticks_per_sec: measurement.ticks as f64 / secs,
        steps_per_sec: steps as f64 / secs,
        finished: measurement.finished,
    })
}

fn validate_params(params: &BenchParams) -> Result<()> {
    if params.coroutines == 0 {
        return Err(anyhow!("Must run at least 1 coroutine"));
    }
    if params.ticks == 0 {
        return Err(anyhow!("Must run at least 1 tick"));
    }
    if params.executor == ExecutorKind::Single && params.coroutines > 1 {
        return Err(anyhow!("The single executor holds one coroutine; use --coroutines 1"));
    }
    Ok(())
}

fn populate<E>(executor: &E, params: &BenchParams, steps: &Arc<AtomicU64>)
where
    E: Executor + Clone + 'static,
{
    for _ in 0..params.coroutines {
        let steps = steps.clone();
        match params.workload {
            Workload::Counter => {
                executor.start(routine_fn(move || {
                    steps.fetch_add(1, Ordering::Relaxed);
                    Ok(Some(Yielded::NextTick))
                }));
            }
            Workload::Task => {
                start_task(executor, move |s| async move {
                    while !s.is_disposed() {
                        s.next_tick().await?;
                        steps.fetch_add(1, Ordering::Relaxed);
                    }
                    Ok(())
                });
            }
        }
    }
}

fn drive_manual<E>(executor: E, params: &BenchParams, steps: &Arc<AtomicU64>) -> Result<Measurement>
where
    E: ManualExecutor + Clone + 'static,
{
    populate(&executor, params, steps);

    let start = Instant::now();
    for tick in 0..params.ticks {
        executor
            .tick()
            .with_context(|| format!("tick {} failed", tick + 1))?;
    }
    let elapsed = start.elapsed();

    executor.stop_all();
    executor.tick()?;
    Ok(Measurement {
        ticks: params.ticks,
        elapsed,
        finished: executor.finished_count(),
    })
}

fn drive_thread(params: &BenchParams, steps: &Arc<AtomicU64>) -> Result<Measurement> {
    let executor = ThreadExecutor::new(&params.executor_config, default_logger())
        .context("Failed to start executor thread")?;
    let target = params.ticks.saturating_mul(params.coroutines as u64);

    let start = Instant::now();
    populate(&executor, params, steps);
    while steps.load(Ordering::Acquire) < target {
        if start.elapsed() > THREAD_TIMEOUT {
            executor.shutdown();
            return Err(anyhow!(
                "Timed out after {}s with {} of {} steps",
                THREAD_TIMEOUT.as_secs(),
                steps.load(Ordering::Acquire),
                target
            ));
        }
        std::thread::sleep(Duration::from_millis(1));
    }
    let elapsed = start.elapsed();

    executor.shutdown();
    Ok(Measurement {
        ticks: steps.load(Ordering::Acquire) / params.coroutines as u64,
        elapsed,
        finished: executor.finished_count(),
    })
}

pub fn display_report(report: &BenchReport) {
    println!();
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    println!("📊 Benchmark Results");
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    println!();
    println!("⏱️  Duration: {:.2}ms", report.elapsed_ms);
    println!();
    println!("📋 Work:");
    println!("   Executor: {:?}", report.executor);
    println!("   Workload: {:?}", report.workload);
    println!("   Coroutines: {}", report.coroutines);
    println!("   Ticks: {}", report.ticks);
    println!("   Steps: {}", report.steps);
    println!("   Finished: {}", report.finished);
    println!();
    println!("🚀 Throughput: {:.1} ticks/sec, {:.1} steps/sec", report.ticks_per_sec, report.steps_per_sec);
    println!();
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
}
