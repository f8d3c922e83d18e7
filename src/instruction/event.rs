//! External events
//!
//! [`Event`] is a small multicast source. Waiting on it produces an operation
//! that subscribes when created and unsubscribes as soon as it has fired, so an
//! abandoned wait does not keep receiving values.

use super::{Completion, Instruction, Operation, Step};
use crate::error::{Fault, RuntimeError};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

type Listener<T> = Arc<dyn Fn(&T) + Send + Sync>;

struct EventInner<T> {
    listeners: Mutex<Vec<(u64, Listener<T>)>>,
    next_id: AtomicU64,
}

/// A multicast event that instructions can wait on
pub struct Event<T> {
    inner: Arc<EventInner<T>>,
}

impl<T> Clone for Event<T> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

/// Identifies a listener registered with [`Event::subscribe`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Subscription(u64);

impl<T: Clone + Send + 'static> Event<T> {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(EventInner {
                listeners: Mutex::new(Vec::new()),
                next_id: AtomicU64::new(0),
            }),
        }
    }

    /// Deliver `value` to every current listener
    pub fn emit(&self, value: T) {
        // Snapshot so listeners may unsubscribe while being called
        let listeners: Vec<Listener<T>> = self
            .inner
            .listeners
            .lock()
            .iter()
            .map(|(_, l)| l.clone())
            .collect();
        for listener in listeners {
            listener(&value);
        }
    }

    pub fn subscribe(&self, listener: impl Fn(&T) + Send + Sync + 'static) -> Subscription {
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        self.inner.listeners.lock().push((id, Arc::new(listener)));
        Subscription(id)
    }

    pub fn unsubscribe(&self, subscription: Subscription) {
        self.inner.listeners.lock().retain(|(id, _)| *id != subscription.0);
    }

    pub fn listener_count(&self) -> usize {
        self.inner.listeners.lock().len()
    }

    /// Wait for the next emission and produce its value
    pub fn wait(&self) -> WaitForEvent<T> {
        WaitForEvent::new(self.clone())
    }

    /// Wait for `count` emissions and produce all their values
    pub fn wait_times(&self, count: usize) -> WaitForEvents<T> {
        WaitForEvents::new(self.clone(), count)
    }
}

impl<T: Clone + Send + 'static> Default for Event<T> {
    fn default() -> Self {
        Self::new()
    }
}

/* ===================== Single Emission ===================== */

pub struct WaitForEvent<T: Clone + Send + 'static> {
    event: Event<T>,
    received: Arc<Mutex<Option<T>>>,
    subscription: Option<Subscription>,
    completion: Completion<T>,
}

impl<T: Clone + Send + 'static> WaitForEvent<T> {
    fn new(event: Event<T>) -> Self {
        let mut wait = Self {
            event,
            received: Arc::new(Mutex::new(None)),
            subscription: None,
            completion: Completion::new(),
        };
        wait.subscribe();
        wait
    }

    fn subscribe(&mut self) {
        let received = self.received.clone();
        self.subscription = Some(self.event.subscribe(move |value: &T| {
            *received.lock() = Some(value.clone());
        }));
    }

    fn unsubscribe(&mut self) {
        if let Some(subscription) = self.subscription.take() {
            self.event.unsubscribe(subscription);
        }
    }
}

impl<T: Clone + Send + 'static> Instruction for WaitForEvent<T> {
    fn step(&mut self) -> Result<Step, Fault> {
        self.completion.ensure_running(self.name())?;
        let received = self.received.lock().take();
        match received {
            Some(value) => {
                self.unsubscribe();
                Ok(self.completion.complete(value))
            }
            None => Ok(Step::Continue),
        }
    }

    fn is_resettable(&self) -> bool {
        true
    }

    fn reset(&mut self) -> Result<(), RuntimeError> {
        self.completion.clear();
        *self.received.lock() = None;
        if self.subscription.is_none() {
            self.subscribe();
        }
        Ok(())
    }
}

impl<T: Clone + Send + 'static> Operation for WaitForEvent<T> {
    type Output = T;

    fn is_done(&self) -> bool {
        self.completion.is_done()
    }

    fn value(&self) -> Result<T, RuntimeError> {
        self.completion.value()
    }
}

impl<T: Clone + Send + 'static> Drop for WaitForEvent<T> {
    fn drop(&mut self) {
        self.unsubscribe();
    }
}

/* ===================== Counted Emissions ===================== */

pub struct WaitForEvents<T: Clone + Send + 'static> {
    event: Event<T>,
    count: usize,
    received: Arc<Mutex<Vec<T>>>,
    subscription: Option<Subscription>,
    completion: Completion<Vec<T>>,
}

impl<T: Clone + Send + 'static> WaitForEvents<T> {
    fn new(event: Event<T>, count: usize) -> Self {
        let mut wait = Self {
            event,
            count,
            received: Arc::new(Mutex::new(Vec::new())),
            subscription: None,
            completion: Completion::new(),
        };
        wait.subscribe();
        wait
    }

    fn subscribe(&mut self) {
        let received = self.received.clone();
        self.subscription = Some(self.event.subscribe(move |value: &T| {
            received.lock().push(value.clone());
        }));
    }

    fn unsubscribe(&mut self) {
        if let Some(subscription) = self.subscription.take() {
            self.event.unsubscribe(subscription);
        }
    }
}

impl<T: Clone + Send + 'static> Instruction for WaitForEvents<T> {
    fn step(&mut self) -> Result<Step, Fault> {
        self.completion.ensure_running(self.name())?;
        let values = {
            let mut received = self.received.lock();
            if received.len() < self.count {
                return Ok(Step::Continue);
            }
            received.drain(..self.count).collect::<Vec<_>>()
        };
        self.unsubscribe();
        Ok(self.completion.complete(values))
    }

    fn is_resettable(&self) -> bool {
        true
    }

    fn reset(&mut self) -> Result<(), RuntimeError> {
        self.completion.clear();
        self.received.lock().clear();
        if self.subscription.is_none() {
            self.subscribe();
        }
        Ok(())
    }
}

impl<T: Clone + Send + 'static> Operation for WaitForEvents<T> {
    type Output = Vec<T>;

    fn is_done(&self) -> bool {
        self.completion.is_done()
    }

    fn value(&self) -> Result<Vec<T>, RuntimeError> {
        self.completion.value()
    }
}

impl<T: Clone + Send + 'static> Drop for WaitForEvents<T> {
    fn drop(&mut self) {
        self.unsubscribe();
    }
}
