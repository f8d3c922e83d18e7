use crate::combinator::{FromFn, GeneratorExt, Sample};
use crate::instruction::{Instruction, Step};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

#[test]
fn test_for_each_fires_every_step() {
    let source = Arc::new(AtomicU32::new(0));
    let seen = Arc::new(Mutex::new(Vec::new()));

    let s = source.clone();
    let out = seen.clone();
    let mut each = Sample::new(move || s.load(Ordering::SeqCst)).for_each(move |v| out.lock().push(v));

    for v in [1, 1, 2] {
        source.store(v, Ordering::SeqCst);
        assert_eq!(each.step().unwrap(), Step::Continue);
    }
    assert_eq!(*seen.lock(), vec![1, 1, 2]);
}

#[test]
fn test_on_change_skips_repeated_values() {
    let source = Arc::new(AtomicU32::new(0));
    let seen = Arc::new(Mutex::new(Vec::new()));

    let s = source.clone();
    let out = seen.clone();
    let mut changes = Sample::new(move || s.load(Ordering::SeqCst)).on_change(move |v| out.lock().push(v));

    for v in [1, 1, 2, 2, 2, 1] {
        source.store(v, Ordering::SeqCst);
        changes.step().unwrap();
    }
    assert_eq!(*seen.lock(), vec![1, 2, 1]);

    // After a reset the first value is reported again
    changes.reset().unwrap();
    changes.step().unwrap();
    assert_eq!(*seen.lock(), vec![1, 2, 1, 1]);
}

#[test]
fn test_from_fn_generator_finishes_immediately() {
    let mut each = FromFn::new(|| "value").for_each(|v| assert_eq!(v, "value"));
    assert_eq!(each.step().unwrap(), Step::Done);
}
