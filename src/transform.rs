//! The universal intermediate primitive.
//!
//! Every derived operator in this crate (map, filter, take, skip, the
//! window family) is a [`decide`] stage with a different decision function.
//! The decision function sees each fresh parent element (or the [`Done`]
//! sentinel, exactly once, when the parent ends) and renders a [`Verdict`]:
//! emit a value downstream, discard it and pull again, or terminate the
//! stage.
//!
//! [`Done`]: Upstream::Done

use crate::error::{accumulate, combine};
use crate::stage::{Signal, Stage, Step};
use anyhow::Error;

/// What the parent handed us on this drive: a fresh element, or the
/// one-time notice that the parent has ended.
#[derive(Debug)]
pub enum Upstream<T> {
    Item(T),
    Done,
}

/// A decision function's ruling on one parent element.
///
/// The signal is interpreted by the [`Decide`] stage that called it:
/// `Continue` emits the carried value, `Retry` discards it and pulls the
/// parent again, `Stop` terminates the stage (emitting the carried value
/// first, if any, with no further parent element consumed). An error rides
/// along with whatever value is attached.
pub struct Verdict<U> {
    pub signal: Signal,
    pub value: Option<U>,
    pub error: Option<Error>,
}

impl<U> Verdict<U> {
    /// Pass `value` downstream and keep going.
    #[inline]
    pub fn emit(value: U) -> Self {
        Self { signal: Signal::Continue, value: Some(value), error: None }
    }

    /// Discard the element under consideration and pull the parent again.
    #[inline]
    pub fn skip() -> Self {
        Self { signal: Signal::Retry, value: None, error: None }
    }

    /// Terminate with nothing more to emit.
    #[inline]
    pub fn halt() -> Self {
        Self { signal: Signal::Stop, value: None, error: None }
    }

    /// Emit `value` as the final element, then terminate.
    #[inline]
    pub fn last(value: U) -> Self {
        Self { signal: Signal::Stop, value: Some(value), error: None }
    }

    /// Terminate the chain with an error.
    #[inline]
    pub fn fail(error: Error) -> Self {
        Self { signal: Signal::Continue, value: None, error: Some(error) }
    }

    /// Attach an error to this verdict.
    pub fn with_error(mut self, error: Error) -> Self {
        self.error = combine(self.error, Some(error));
        self
    }
}

/// Wrap `parent` with a per-element decision function.
///
/// On each drive the stage pulls `parent` once and consults
/// `decide(index, upstream, driving_signal)`:
///
/// - `index` is the zero-based count of fresh parent elements seen so far
///   (at [`Upstream::Done`] it equals the parent's total length);
/// - `upstream` is the fresh element, or [`Upstream::Done`] exactly once
///   when the parent is exhausted or failed without a value; this is the hook that
///   lets windowing flush a trailing partial buffer;
/// - `driving_signal` is the signal this stage itself was driven with, for
///   operators that care whether a `Retry` is passing through.
///
/// A verdict carrying a value at `Done` emits that one trailing element and
/// the stage is exhausted afterwards; a `Retry` verdict at `Done` is treated
/// as termination, so a decision function cannot spin the engine against an
/// ended parent. An error without a value terminates the stage. The parent
/// is stopped exactly once, whichever path ends the stage.
pub fn decide<P, F, U>(parent: P, decide: F) -> Decide<P, F>
where
    P: Stage,
    F: FnMut(u64, Upstream<P::Item>, Signal) -> Verdict<U>,
{
    Decide { parent, decide, index: 0, finished: false, parent_stopped: false }
}

pub struct Decide<P, F> {
    parent: P,
    decide: F,
    index: u64,
    finished: bool,
    parent_stopped: bool,
}

impl<P: Stage, F> Decide<P, F> {
    /// Stop the parent (at most once) and mark this stage exhausted.
    fn finish(&mut self) -> Option<Error> {
        self.finished = true;
        if self.parent_stopped {
            return None;
        }
        self.parent_stopped = true;
        self.parent.pull(Signal::Stop).error
    }
}

impl<P, F, U> Stage for Decide<P, F>
where
    P: Stage,
    F: FnMut(u64, Upstream<P::Item>, Signal) -> Verdict<U>,
{
    type Item = U;

    fn pull(&mut self, signal: Signal) -> Step<U> {
        if signal == Signal::Stop {
            let error = self.finish();
            return Step { value: None, error };
        }
        if self.finished {
            return Step::done();
        }

        // Errors surfaced by skipped iterations accumulate here so a Retry
        // verdict cannot silently drop them.
        let mut held: Option<Error> = None;
        loop {
            let parent_step = self.parent.pull(Signal::Continue);
            accumulate(&mut held, parent_step.error);
            let at_end = parent_step.value.is_none();
            let upstream = match parent_step.value {
                Some(v) => Upstream::Item(v),
                None => Upstream::Done,
            };
            let ix = self.index;
            if !at_end {
                self.index += 1;
            }

            let verdict = (self.decide)(ix, upstream, signal);
            accumulate(&mut held, verdict.error);

            if at_end {
                // The decision function was consulted one final time; the
                // stage ends on this call no matter what it ruled. A carried
                // value becomes the one trailing element.
                accumulate(&mut held, self.finish());
                return Step { value: verdict.value, error: held };
            }

            match verdict.signal {
                Signal::Continue => match verdict.value {
                    Some(v) => return Step { value: Some(v), error: held },
                    None if held.is_some() => {
                        // Error without a value terminates the chain.
                        accumulate(&mut held, self.finish());
                        return Step { value: None, error: held };
                    }
                    // Continue with nothing to surface: treat as a skip.
                    None => {}
                },
                Signal::Retry => {}
                Signal::Stop => {
                    accumulate(&mut held, self.finish());
                    return Step { value: verdict.value, error: held };
                }
            }
        }
    }
}
