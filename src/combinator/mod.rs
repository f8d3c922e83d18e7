//! Combinator library
//!
//! Combinators wrap one or more instructions into a new one. Construction is
//! stateless; all state lives in the combinator's own fields, so trees of
//! combinators need no synchronization.
//!
//! ## Families
//! - Sequence: [`Then`], [`ThenWith`], [`AndThen`], [`ThenDo`], [`Inspect`], [`Returns`]
//! - Join: [`And`], [`With`], [`join_all`], [`AllSettled`]
//! - Race: [`Or`], [`RaceValue`], [`First`]
//! - Transform: [`Map`]
//! - Loop: [`Repeat`], [`LoopForever`]
//! - Guard: [`StopWhen`], [`TimeLimit`]
//! - Observe: [`ForEach`], [`OnChange`] over a [`Generator`]
//!
//! The extension traits make these read left to right:
//! `NextTick.then(wait).repeat(3)?`.

mod guard;
mod join;
mod map;
mod observe;
mod race;
mod repeat;
mod sequence;

pub use guard::{Guarded, StopWhen, TimeLimit};
pub use join::{join_all, AllSettled, And, With};
pub use map::Map;
pub use observe::{ForEach, FromFn, Generator, OnChange, Sample};
pub use race::{First, Or, RaceValue, Winner};
pub use repeat::{LoopForever, Repeat};
pub use sequence::{AndThen, Inspect, Returns, ReturnsWith, Then, ThenDo, ThenWith};

use crate::error::RuntimeError;
use crate::instruction::{BoxInstruction, Instruction, Operation, WaitUntil};
use crate::time::Clock;

/* ===================== Instruction Extensions ===================== */

pub trait InstructionExt: Instruction + Sized {
    fn then<B: Instruction>(self, next: B) -> Then<Self, B> {
        Then::new(self, next)
    }

    /// Build the next instruction only once this one finished
    fn then_with<F, B>(self, make: F) -> ThenWith<Self, F, B>
    where
        F: FnMut() -> B + Send,
        B: Instruction,
    {
        ThenWith::new(self, make)
    }

    fn then_do<F: FnMut() + Send>(self, action: F) -> ThenDo<Self, F> {
        ThenDo::new(self, action)
    }

    fn returns<T: Clone + Send>(self, value: T) -> Returns<Self, T> {
        Returns::new(self, value)
    }

    fn returns_with<F, T>(self, produce: F) -> ReturnsWith<Self, F, T>
    where
        F: FnMut() -> T + Send,
        T: Clone + Send,
    {
        ReturnsWith::new(self, produce)
    }

    fn and<B: Instruction>(self, other: B) -> And<Self, B> {
        And::new(self, other)
    }

    fn with<B: Instruction>(self, other: B) -> With<Self, B> {
        With::new(self, other)
    }

    fn or<B: Instruction>(self, other: B) -> Or<Self, B> {
        Or::new(self, other)
    }

    fn stop_when<G: Instruction>(self, guard: G) -> StopWhen<Self, G> {
        StopWhen::new(self, guard)
    }

    fn until<P: FnMut() -> bool + Send>(self, predicate: P) -> StopWhen<Self, WaitUntil<P>> {
        StopWhen::predicate(self, predicate)
    }

    fn with_time_limit(self, seconds: f64, clock: Clock) -> TimeLimit<Self> {
        TimeLimit::new(self, seconds, clock)
    }

    fn repeat(self, cycles: u32) -> Result<Repeat<Self>, RuntimeError> {
        Repeat::new(self, cycles)
    }

    fn loop_forever(self) -> Result<LoopForever<Self>, RuntimeError> {
        LoopForever::new(self)
    }

    fn boxed(self) -> BoxInstruction
    where
        Self: 'static,
    {
        Box::new(self)
    }
}

impl<I: Instruction + Sized> InstructionExt for I {}

/* ===================== Operation Extensions ===================== */

pub trait OperationExt: Operation + Sized {
    fn map<F, T>(self, transform: F) -> Map<Self, F, T>
    where
        F: FnMut(Self::Output) -> T + Send,
        T: Clone + Send,
    {
        Map::new(self, transform)
    }

    /// Chain an instruction computed from this operation's value
    fn and_then<F, B>(self, make: F) -> AndThen<Self, F, B>
    where
        F: FnMut(Self::Output) -> B + Send,
        B: Instruction,
    {
        AndThen::new(self, make)
    }

    fn inspect<F: FnMut(&Self::Output) + Send>(self, observer: F) -> Inspect<Self, F> {
        Inspect::new(self, observer)
    }

    fn or_value<B: Operation<Output = Self::Output>>(self, other: B) -> RaceValue<Self, B> {
        RaceValue::new(self, other)
    }
}

impl<O: Operation + Sized> OperationExt for O {}

/* ===================== Generator Extensions ===================== */

pub trait GeneratorExt: Generator + Sized {
    fn for_each<F: FnMut(Self::Item) + Send>(self, callback: F) -> ForEach<Self, F> {
        ForEach::new(self, callback)
    }

    fn on_change<F>(self, callback: F) -> OnChange<Self, F>
    where
        Self::Item: PartialEq + Clone + Send,
        F: FnMut(Self::Item) + Send,
    {
        OnChange::new(self, callback)
    }
}

impl<G: Generator + Sized> GeneratorExt for G {}

#[cfg(test)]
mod tests;
