//! Testing utilities for stage chains.
//!
//! - [`probe`]: wrap any stage so every signal it is driven with is
//!   recorded; protocol tests (stop-at-most-once, idempotent exhaustion)
//!   read the log afterwards.
//! - Assertions: compare collected chain output against expected results,
//!   ordered or unordered.

use crate::stage::{Signal, Stage, Step};
use std::cell::RefCell;
use std::fmt::Debug;
use std::rc::Rc;

/// Shared handle onto the signals a [`Probe`] has seen.
pub type SignalLog = Rc<RefCell<Vec<Signal>>>;

/// Wrap `stage` so every incoming signal is appended to the returned log
/// before being forwarded.
pub fn probe<S: Stage>(stage: S) -> (Probe<S>, SignalLog) {
    let log: SignalLog = Rc::new(RefCell::new(Vec::new()));
    (Probe { inner: stage, log: Rc::clone(&log) }, log)
}

pub struct Probe<S> {
    inner: S,
    log: SignalLog,
}

impl<S: Stage> Stage for Probe<S> {
    type Item = S::Item;

    fn pull(&mut self, signal: Signal) -> Step<S::Item> {
        self.log.borrow_mut().push(signal);
        self.inner.pull(signal)
    }
}

/// Count how many of the logged signals are `Stop`.
pub fn stops_in(log: &SignalLog) -> usize {
    log.borrow().iter().filter(|s| **s == Signal::Stop).count()
}

/// Assert two collections are equal in order and content.
///
/// # Panics
/// Panics with a detailed message if they differ in length or content.
pub fn assert_collections_equal<T: Debug + PartialEq>(actual: &[T], expected: &[T]) {
    assert_eq!(
        actual.len(),
        expected.len(),
        "length mismatch: expected {expected:?}, got {actual:?}"
    );
    for (i, (a, e)) in actual.iter().zip(expected.iter()).enumerate() {
        assert_eq!(a, e, "mismatch at index {i}: expected {expected:?}, got {actual:?}");
    }
}

/// Assert two collections hold the same elements, ignoring order but
/// respecting multiplicity.
///
/// # Panics
/// Panics with a detailed message if the sorted collections differ.
pub fn assert_collections_unordered_equal<T: Debug + Ord + Clone>(actual: &[T], expected: &[T]) {
    let mut a: Vec<T> = actual.to_vec();
    let mut e: Vec<T> = expected.to_vec();
    a.sort();
    e.sort();
    assert_eq!(
        a, e,
        "content mismatch ignoring order: expected {expected:?}, got {actual:?}"
    );
}
