pub mod bench;
pub mod bridge;
pub mod cli;
pub mod combinator;
pub mod config;
pub mod coroutine;
pub mod error;
pub mod executor;
pub mod instruction;
pub mod logging;
pub mod time;

// Re-export the types most programs touch
pub use bridge::{start_task, ChildPolicy, JoinMode, Suspender, TaskHandle};
pub use combinator::InstructionExt;
pub use config::Config;
pub use coroutine::{CoroutineHandle, InterruptHandler, InterruptReason, Routine, Yielded};
pub use error::{CancelReason, Fault, RuntimeError};
pub use executor::{
    Executor, ExecutorExt, ManualExecutor, RegistryExecutor, SafeExecutor, SingleExecutor, ThreadExecutor,
};
pub use instruction::{Instruction, NextTick, Operation, Step};
