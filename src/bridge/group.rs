//! Waiting on groups of coroutines

use super::suspender::{ChildPolicy, Suspender};
use super::task::{TaskHandle, TaskShared};
use crate::combinator::{join_all, AllSettled, First, InstructionExt};
use crate::coroutine::CoroutineHandle;
use crate::error::{CancelReason, Fault, RuntimeError};
use crate::instruction::{BoxInstruction, Instruction};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum JoinMode {
    /// The first fault ends the join
    FailFast,
    /// Wait for everyone, then raise all faults as one aggregate
    FailSoft,
}

/// While alive, faults of the listed children are reported by the join, not the parent
struct ObserveGuard {
    shared: Arc<TaskShared>,
    ids: Vec<Uuid>,
}

impl ObserveGuard {
    fn new(shared: &Arc<TaskShared>, coroutines: &[CoroutineHandle]) -> Self {
        let ids: Vec<Uuid> = coroutines.iter().map(CoroutineHandle::id).collect();
        shared.observe(&ids);
        Self {
            shared: shared.clone(),
            ids,
        }
    }
}

impl Drop for ObserveGuard {
    fn drop(&mut self) {
        self.shared.unobserve(&self.ids);
    }
}

fn boxed(coroutines: &[CoroutineHandle]) -> Vec<BoxInstruction> {
    coroutines.iter().cloned().map(InstructionExt::boxed).collect()
}

impl Suspender {
    /// Wait for the first coroutine to finish, then dispose the others
    ///
    /// Resumes with the winner's index; ties go to the lowest index.
    pub async fn race_many(&self, coroutines: Vec<CoroutineHandle>) -> Result<usize, Fault> {
        let _guard = ObserveGuard::new(self.shared(), &coroutines);
        let race = First::new(boxed(&coroutines))?;
        let outcome = self.value(race).await;

        for (index, coroutine) in coroutines.iter().enumerate() {
            if outcome.as_ref().map_or(true, |winner| *winner != index) {
                coroutine.dispose();
            }
        }
        outcome
    }

    /// Wait for every coroutine to finish
    ///
    /// On failure the coroutines still running are disposed before the
    /// fault is returned.
    pub async fn join_many(&self, coroutines: Vec<CoroutineHandle>, mode: JoinMode) -> Result<(), Fault> {
        if coroutines.is_empty() {
            return Ok(());
        }
        let _guard = ObserveGuard::new(self.shared(), &coroutines);
        let outcome = match mode {
            JoinMode::FailFast => self.wait(join_all(boxed(&coroutines))?).await,
            JoinMode::FailSoft => self.wait(AllSettled::new(boxed(&coroutines))).await,
        };

        if outcome.is_err() {
            for coroutine in coroutines.iter().filter(|coroutine| !coroutine.is_finished()) {
                coroutine.dispose();
            }
        }
        outcome
    }

    /// Wait for every task and resume with their values in order
    pub async fn select_values<T>(&self, tasks: Vec<TaskHandle<T>>) -> Result<Vec<T>, Fault>
    where
        T: Clone + Send + 'static,
    {
        let coroutines = tasks.iter().map(|task| task.coroutine().clone()).collect();
        self.join_many(coroutines, JoinMode::FailFast).await?;
        tasks
            .iter()
            .map(|task| task.result().map_err(Fault::from))
            .collect()
    }

    /// Spawn a child that raises `StopSignaled` in this task once `instruction` finishes
    pub fn signal_stop_on<I>(&self, instruction: I) -> Result<TaskHandle<()>, RuntimeError>
    where
        I: Instruction + 'static,
    {
        if self.is_disposed() {
            return Err(RuntimeError::Cancelled(CancelReason::OwnerDisposed));
        }
        Ok(self.spawn_child(
            move |s| async move {
                s.wait(instruction).await?;
                Err::<(), Fault>(RuntimeError::StopSignaled.into())
            },
            ChildPolicy::AsChild,
        ))
    }
}
