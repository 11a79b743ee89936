//! Two-source combinators: lockstep pairing and ordered merge.
//!
//! [`zip`] pulls one element from each side per drive and pairs them,
//! ending as soon as either side ends. [`join`] is a merge-sort style
//! ordered merge: it keeps one pending value per side and asks a caller
//! decision which side to emit next, degrading to a plain drain once one
//! side is exhausted. Both stop *both* sides on termination and combine
//! cleanup errors from each.

use crate::error::accumulate;
use crate::stage::{Signal, Stage, Step};
use anyhow::Error;
use serde::{Deserialize, Serialize};

/// Which side of a two-source merge an element came from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Side<L, R> {
    Left(L),
    Right(R),
}

impl<L, R> Side<L, R> {
    #[inline]
    pub fn is_left(&self) -> bool {
        matches!(self, Side::Left(_))
    }
}

impl<T> Side<T, T> {
    /// Unwrap a merge of two same-typed sources into the bare element.
    #[inline]
    pub fn into_inner(self) -> T {
        match self {
            Side::Left(v) | Side::Right(v) => v,
        }
    }
}

// ---------- zip ----------

/// Pair `left` and `right` element-for-element.
///
/// Terminates as soon as either side is exhausted (the other side's
/// unpaired element, if one was pulled, is discarded: single-pass, no
/// peeking). Errors from both sides combine.
pub fn zip<L: Stage, R: Stage>(left: L, right: R) -> Zip<L, R> {
    Zip { left, right, left_stopped: false, right_stopped: false, finished: false }
}

pub struct Zip<L, R> {
    left: L,
    right: R,
    left_stopped: bool,
    right_stopped: bool,
    finished: bool,
}

impl<L: Stage, R: Stage> Zip<L, R> {
    fn finish(&mut self) -> Option<Error> {
        self.finished = true;
        let mut err = None;
        if !self.left_stopped {
            self.left_stopped = true;
            accumulate(&mut err, self.left.pull(Signal::Stop).error);
        }
        if !self.right_stopped {
            self.right_stopped = true;
            accumulate(&mut err, self.right.pull(Signal::Stop).error);
        }
        err
    }
}

impl<L: Stage, R: Stage> Stage for Zip<L, R> {
    type Item = (L::Item, R::Item);

    fn pull(&mut self, signal: Signal) -> Step<Self::Item> {
        if signal == Signal::Stop {
            let error = self.finish();
            return Step { value: None, error };
        }
        if self.finished {
            return Step::done();
        }
        let ls = self.left.pull(Signal::Continue);
        let mut err = ls.error;
        let Some(lv) = ls.value else {
            accumulate(&mut err, self.finish());
            return Step { value: None, error: err };
        };
        let rs = self.right.pull(Signal::Continue);
        accumulate(&mut err, rs.error);
        let Some(rv) = rs.value else {
            accumulate(&mut err, self.finish());
            return Step { value: None, error: err };
        };
        Step { value: Some((lv, rv)), error: err }
    }
}

// ---------- ordered merge ----------

/// Merge two sources in caller-decided order.
///
/// Each drive refreshes whichever side's pending slot was consumed last.
/// While both slots hold a value, `prefer_left(l, r) -> true` emits the left
/// one; the other side's value stays pending for the next drive. Once one
/// side ends the merge drains the survivor unconditionally. With sorted
/// inputs and an ordering decision this is exactly a merge-sort join.
pub fn join<L, R, F>(left: L, right: R, prefer_left: F) -> Join<L, R, F>
where
    L: Stage,
    R: Stage,
    F: FnMut(&L::Item, &R::Item) -> bool,
{
    Join {
        left,
        right,
        prefer_left,
        left_pending: None,
        right_pending: None,
        left_done: false,
        right_done: false,
        left_stopped: false,
        right_stopped: false,
        finished: false,
    }
}

pub struct Join<L: Stage, R: Stage, F> {
    left: L,
    right: R,
    prefer_left: F,
    left_pending: Option<L::Item>,
    right_pending: Option<R::Item>,
    left_done: bool,
    right_done: bool,
    left_stopped: bool,
    right_stopped: bool,
    finished: bool,
}

impl<L: Stage, R: Stage, F> Join<L, R, F> {
    fn finish(&mut self) -> Option<Error> {
        self.finished = true;
        self.left_pending = None;
        self.right_pending = None;
        let mut err = None;
        if !self.left_stopped {
            self.left_stopped = true;
            accumulate(&mut err, self.left.pull(Signal::Stop).error);
        }
        if !self.right_stopped {
            self.right_stopped = true;
            accumulate(&mut err, self.right.pull(Signal::Stop).error);
        }
        err
    }
}

impl<L, R, F> Stage for Join<L, R, F>
where
    L: Stage,
    R: Stage,
    F: FnMut(&L::Item, &R::Item) -> bool,
{
    type Item = Side<L::Item, R::Item>;

    fn pull(&mut self, signal: Signal) -> Step<Self::Item> {
        if signal == Signal::Stop {
            let error = self.finish();
            return Step { value: None, error };
        }
        if self.finished {
            return Step::done();
        }
        let mut err = None;
        if self.left_pending.is_none() && !self.left_done {
            let s = self.left.pull(Signal::Continue);
            accumulate(&mut err, s.error);
            match s.value {
                Some(v) => self.left_pending = Some(v),
                None => self.left_done = true,
            }
        }
        if self.right_pending.is_none() && !self.right_done {
            let s = self.right.pull(Signal::Continue);
            accumulate(&mut err, s.error);
            match s.value {
                Some(v) => self.right_pending = Some(v),
                None => self.right_done = true,
            }
        }
        let value = match (&self.left_pending, &self.right_pending) {
            (Some(l), Some(r)) => {
                if (self.prefer_left)(l, r) {
                    self.left_pending.take().map(Side::Left)
                } else {
                    self.right_pending.take().map(Side::Right)
                }
            }
            (Some(_), None) => self.left_pending.take().map(Side::Left),
            (None, Some(_)) => self.right_pending.take().map(Side::Right),
            (None, None) => {
                accumulate(&mut err, self.finish());
                return Step { value: None, error: err };
            }
        };
        Step { value, error: err }
    }
}
