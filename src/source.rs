//! In-memory producers: stages with no parent.
//!
//! This module provides:
//! - **Trivial sources**: [`empty`], [`repeat`] (with an error-injecting
//!   variant [`Repeat::faulty`])
//! - **Indexable sources**: [`from_index`], [`from_iter`], [`from_vec`]
//! - **Unordered drain**: [`from_unordered`] / [`from_map`], a background
//!   thread feeding a bounded channel, for structures with no stable index
//! - **Guarded source**: [`from_lock`], shared-lock iteration with the read
//!   guard tied to the stage's own stop/exhaustion path
//! - **Setup/teardown**: [`bracket`], paired hooks around any stage
//!
//! Every producer honors the same contract: `Stop` ceases production and
//! releases whatever the source owns, exhaustion is idempotent, and `Retry`
//! is indistinguishable from `Continue` (only [`decide`]-built stages give
//! `Retry` a meaning of its own).
//!
//! [`decide`]: crate::transform::decide

use crate::error::accumulate;
use crate::stage::{Produce, Signal, Stage, Step};
use anyhow::{anyhow, Error, Result};
use crossbeam::channel::{bounded, Receiver};
use std::collections::HashMap;
use std::hash::Hash;
use std::marker::PhantomData;
use std::sync::{RwLock, RwLockReadGuard};
use std::thread::JoinHandle;
use tracing::debug;

/// Hand-off depth for the unordered drain thread.
const HANDOFF_CAPACITY: usize = 16;

// ---------- empty ----------

/// An immediately exhausted source.
pub fn empty<T>() -> Empty<T> {
    Empty(PhantomData)
}

pub struct Empty<T>(PhantomData<T>);

impl<T> Stage for Empty<T> {
    type Item = T;

    fn pull(&mut self, _signal: Signal) -> Step<T> {
        Step::done()
    }
}

// ---------- repeat ----------

/// Yield `value` exactly `times` times.
pub fn repeat<T: Clone>(value: T, times: usize) -> Repeat<T> {
    Repeat { value, remaining: times, fault: None }
}

/// A constant-repeat source; see [`repeat`] and [`Repeat::faulty`].
pub struct Repeat<T, F = fn() -> Error> {
    value: T,
    remaining: usize,
    fault: Option<F>,
}

impl<T: Clone, F: FnMut() -> Error> Repeat<T, F> {
    /// Yield `value` `times` times, attaching a freshly built error to every
    /// element. The error comes from a factory because errors are not `Clone`.
    pub fn faulty(value: T, times: usize, fault: F) -> Self {
        Self { value, remaining: times, fault: Some(fault) }
    }
}

impl<T: Clone, F: FnMut() -> Error> Stage for Repeat<T, F> {
    type Item = T;

    fn pull(&mut self, signal: Signal) -> Step<T> {
        if signal == Signal::Stop || self.remaining == 0 {
            self.remaining = 0;
            return Step::done();
        }
        self.remaining -= 1;
        Step {
            value: Some(self.value.clone()),
            error: self.fault.as_mut().map(|f| f()),
        }
    }
}

// ---------- indexable ----------

/// Yield `get(0) .. get(len - 1)` in order.
pub fn from_index<T, F>(len: usize, get: F) -> FromIndex<F>
where
    F: FnMut(usize) -> T,
{
    FromIndex { len, cursor: 0, get }
}

pub struct FromIndex<F> {
    len: usize,
    cursor: usize,
    get: F,
}

impl<T, F: FnMut(usize) -> T> Stage for FromIndex<F> {
    type Item = T;

    fn pull(&mut self, signal: Signal) -> Step<T> {
        if signal == Signal::Stop || self.cursor >= self.len {
            self.cursor = self.len;
            return Step::done();
        }
        let v = (self.get)(self.cursor);
        self.cursor += 1;
        Step::item(v)
    }
}

// ---------- owned iterators ----------

/// A stage over any owned iterator.
pub fn from_iter<I: IntoIterator>(iter: I) -> IterSource<I::IntoIter> {
    IterSource { iter: Some(iter.into_iter()) }
}

pub fn from_vec<T>(data: Vec<T>) -> IterSource<std::vec::IntoIter<T>> {
    from_iter(data)
}

pub struct IterSource<I> {
    // Dropped eagerly on Stop so iterator-owned resources release early.
    iter: Option<I>,
}

impl<I: Iterator> Stage for IterSource<I> {
    type Item = I::Item;

    fn pull(&mut self, signal: Signal) -> Step<I::Item> {
        if signal == Signal::Stop {
            self.iter = None;
            return Step::done();
        }
        match self.iter.as_mut().and_then(Iterator::next) {
            Some(v) => Step::item(v),
            None => {
                self.iter = None;
                Step::done()
            }
        }
    }
}

// ---------- unordered drain ----------

/// Drain an unordered structure through a background thread and a bounded
/// hand-off channel.
///
/// The calling thread still pulls the stage synchronously; the thread exists
/// only to decouple iteration from the structure's internal ordering. On both
/// natural exhaustion and `Stop` the receiver is dropped first (a producer
/// blocked on a full channel sees the disconnect and exits) and the thread
/// is then joined, so it can never leak.
pub fn from_unordered<I>(iter: I) -> Unordered<I::Item>
where
    I: IntoIterator + Send + 'static,
    I::Item: Send + 'static,
{
    let (tx, rx) = bounded(HANDOFF_CAPACITY);
    let handle = std::thread::spawn(move || {
        for item in iter {
            if tx.send(item).is_err() {
                // Receiver gone: the stage was stopped mid-drain.
                break;
            }
        }
    });
    debug!("unordered drain thread spawned");
    Unordered { rx: Some(rx), handle: Some(handle) }
}

/// Drain an owned hash map as `(key, value)` pairs in no particular order.
pub fn from_map<K, V>(map: HashMap<K, V>) -> Unordered<(K, V)>
where
    K: Send + 'static,
    V: Send + 'static,
{
    from_unordered(map)
}

pub struct Unordered<T> {
    rx: Option<Receiver<T>>,
    handle: Option<JoinHandle<()>>,
}

impl<T> Unordered<T> {
    /// Drop the receiver, then join the drain thread.
    fn shutdown(&mut self) -> Option<Error> {
        self.rx = None;
        let handle = self.handle.take()?;
        let joined = handle.join();
        debug!("unordered drain thread joined");
        match joined {
            Ok(()) => None,
            Err(_) => Some(anyhow!("unordered drain thread panicked")),
        }
    }
}

impl<T> Stage for Unordered<T> {
    type Item = T;

    fn pull(&mut self, signal: Signal) -> Step<T> {
        if signal == Signal::Stop {
            return Step { value: None, error: self.shutdown() };
        }
        let Some(rx) = &self.rx else {
            return Step::done();
        };
        match rx.recv() {
            Ok(v) => Step::item(v),
            // Disconnected: the producer sent everything and hung up.
            Err(_) => Step { value: None, error: self.shutdown() },
        }
    }
}

impl<T> Drop for Unordered<T> {
    fn drop(&mut self) {
        // A stage dropped without its terminal Stop must still not leak the
        // drain thread.
        let _ = self.shutdown();
    }
}

// ---------- guarded ----------

/// Iterate a shared `RwLock`-protected vector under its read guard.
///
/// The guard is acquired on the first pull and released the moment the stage
/// exhausts or is stopped, so writers are blocked for exactly the span of
/// iteration and no longer. Lock poisoning surfaces as an iteration error.
pub fn from_lock<T: Clone>(lock: &RwLock<Vec<T>>) -> Guarded<'_, T> {
    Guarded { lock, guard: None, cursor: 0, done: false }
}

pub struct Guarded<'a, T> {
    lock: &'a RwLock<Vec<T>>,
    guard: Option<RwLockReadGuard<'a, Vec<T>>>,
    cursor: usize,
    done: bool,
}

impl<T: Clone> Stage for Guarded<'_, T> {
    type Item = T;

    fn pull(&mut self, signal: Signal) -> Step<T> {
        if signal == Signal::Stop || self.done {
            self.guard = None;
            self.done = true;
            return Step::done();
        }
        if self.guard.is_none() {
            match self.lock.read() {
                Ok(g) => self.guard = Some(g),
                Err(_) => {
                    self.done = true;
                    return Step::fail(anyhow!("shared lock poisoned"));
                }
            }
        }
        let guard = self.guard.as_ref().expect("guard acquired above");
        if self.cursor >= guard.len() {
            self.guard = None;
            self.done = true;
            return Step::done();
        }
        let v = guard[self.cursor].clone();
        self.cursor += 1;
        if self.cursor >= guard.len() {
            // Last element delivered; release the lock now rather than on
            // the next pull.
            self.guard = None;
            self.done = true;
        }
        Step::item(v)
    }
}

// ---------- bracket ----------

/// Run `setup` once before the first pull reaches `stage`, and `teardown`
/// once when the chain exhausts or stops, even when zero elements were
/// produced, and even when `setup` itself failed.
///
/// Setup, mid-stream, and teardown errors are combined; none masks another.
/// If the stage is stopped before anything was ever pulled, neither hook
/// runs: the pair stays a pair.
pub fn bracket<P, S, T>(stage: P, setup: S, teardown: T) -> Bracket<P, S, T>
where
    P: Stage,
    S: FnOnce() -> Result<()>,
    T: FnOnce() -> Result<()>,
{
    Bracket {
        parent: stage,
        setup: Some(setup),
        teardown: Some(teardown),
        parent_stopped: false,
        done: false,
    }
}

pub struct Bracket<P, S, T> {
    parent: P,
    setup: Option<S>,
    teardown: Option<T>,
    parent_stopped: bool,
    done: bool,
}

impl<P, S, T> Bracket<P, S, T>
where
    P: Stage,
    S: FnOnce() -> Result<()>,
    T: FnOnce() -> Result<()>,
{
    fn close(&mut self) -> Option<Error> {
        // Teardown pairs with setup: it runs once, and only after setup ran.
        if self.setup.is_some() {
            return None;
        }
        self.teardown.take().and_then(|td| td().err())
    }

    fn stop_parent(&mut self) -> Option<Error> {
        if self.parent_stopped {
            return None;
        }
        self.parent_stopped = true;
        self.parent.pull(Signal::Stop).error
    }
}

impl<P, S, T> Stage for Bracket<P, S, T>
where
    P: Stage,
    S: FnOnce() -> Result<()>,
    T: FnOnce() -> Result<()>,
{
    type Item = P::Item;

    fn pull(&mut self, signal: Signal) -> Step<P::Item> {
        if signal == Signal::Stop {
            self.done = true;
            let mut err = self.stop_parent();
            accumulate(&mut err, self.close());
            return Step { value: None, error: err };
        }
        if self.done {
            return Step::done();
        }
        if let Some(setup) = self.setup.take() {
            if let Err(e) = setup() {
                self.done = true;
                let mut err = Some(e);
                accumulate(&mut err, self.close());
                accumulate(&mut err, self.stop_parent());
                return Step { value: None, error: err };
            }
        }
        let step = self.parent.pull(signal);
        if step.is_exhausted() {
            self.done = true;
            return step.with_error(self.close());
        }
        step
    }
}

// ---------- producer seam ----------

impl<T> Produce for Vec<T> {
    type Item = T;
    type Stage = IterSource<std::vec::IntoIter<T>>;

    fn produce(self) -> Self::Stage {
        from_vec(self)
    }
}

impl<K, V> Produce for HashMap<K, V>
where
    K: Eq + Hash + Send + 'static,
    V: Send + 'static,
{
    type Item = (K, V);
    type Stage = Unordered<(K, V)>;

    fn produce(self) -> Self::Stage {
        from_map(self)
    }
}
