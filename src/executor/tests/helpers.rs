use crate::coroutine::{routine_fn, InterruptHandler, InterruptReason, Routine, Yielded};
use crate::error::Fault;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Increments the counter on every resume, forever
pub fn counter(count: Arc<AtomicU32>) -> impl Routine {
    routine_fn(move || {
        count.fetch_add(1, Ordering::SeqCst);
        Ok(Some(Yielded::NextTick))
    })
}

/// Faults with `fault` on its first resume
pub fn faulting(fault: Fault) -> impl Routine {
    routine_fn(move || Err(fault.clone()))
}

/// Panics on its first resume
pub fn panicking(message: &'static str) -> impl Routine {
    routine_fn(move || panic!("{}", message))
}

pub fn recording_handler() -> (InterruptHandler, Arc<Mutex<Vec<InterruptReason>>>) {
    let reasons = Arc::new(Mutex::new(Vec::new()));
    let sink = reasons.clone();
    (
        InterruptHandler::new(move |reason, _| sink.lock().push(reason)),
        reasons,
    )
}

/// Poll `condition` until it holds or the timeout passes
pub fn eventually(timeout: Duration, mut condition: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        std::thread::sleep(Duration::from_millis(1));
    }
    condition()
}
