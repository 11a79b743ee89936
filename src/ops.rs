//! The fluent operator surface.
//!
//! [`StageExt`] hangs every derived operator off any [`Stage`]. All the
//! intermediate operators lower onto the one transform primitive
//! ([`decide`](crate::transform::decide)); all the terminal operators lower
//! onto the one consumer primitive ([`drive`](crate::consume::drive)). Nothing
//! here adds protocol behavior of its own.

use crate::consume;
use crate::merge::{self, Join, Side, Zip};
use crate::source::{self, Bracket};
use crate::stage::{BoxStage, Signal, Stage};
use crate::transform::{self, Decide, Upstream, Verdict};
use anyhow::{anyhow, Context, Error, Result};
use std::collections::VecDeque;
use std::fmt::Display;
use std::io::Write;

/// Tumbling-window kernel shared by `chunks` and `chunks_partial`.
fn chunked<S: Stage>(stage: S, size: usize, partial: bool) -> impl Stage<Item = Vec<S::Item>> {
    let mut buf: Vec<S::Item> = Vec::new();
    transform::decide(stage, move |_ix, up, _sig| {
        if size == 0 {
            return Verdict::fail(anyhow!("chunk size must be at least 1"));
        }
        match up {
            Upstream::Item(v) => {
                buf.push(v);
                if buf.len() == size {
                    Verdict::emit(std::mem::take(&mut buf))
                } else {
                    Verdict::skip()
                }
            }
            Upstream::Done => {
                if partial && !buf.is_empty() {
                    Verdict::last(std::mem::take(&mut buf))
                } else {
                    Verdict::halt()
                }
            }
        }
    })
}

/// Derived operators for every stage.
///
/// Consuming methods take `self`; a chain is built by calling them in
/// sequence and finished with one of the terminals, which always issue the
/// chain's single final `Stop`.
pub trait StageExt: Stage + Sized {
    /// Wrap this stage with a per-element decision function, the primitive
    /// every other intermediate operator is built from. See
    /// [`transform::decide`].
    fn decide<U, F>(self, f: F) -> Decide<Self, F>
    where
        F: FnMut(u64, Upstream<Self::Item>, Signal) -> Verdict<U>,
    {
        transform::decide(self, f)
    }

    fn map<U, F>(self, mut f: F) -> impl Stage<Item = U>
    where
        F: FnMut(Self::Item) -> U,
    {
        self.decide(move |_ix, up, _sig| match up {
            Upstream::Item(v) => Verdict::emit(f(v)),
            Upstream::Done => Verdict::halt(),
        })
    }

    fn filter<F>(self, mut pred: F) -> impl Stage<Item = Self::Item>
    where
        F: FnMut(&Self::Item) -> bool,
    {
        self.decide(move |_ix, up, _sig| match up {
            Upstream::Item(v) => {
                if pred(&v) {
                    Verdict::emit(v)
                } else {
                    Verdict::skip()
                }
            }
            Upstream::Done => Verdict::halt(),
        })
    }

    /// Yield at most `count` elements, then terminate without consuming
    /// another parent element.
    fn take(self, count: usize) -> impl Stage<Item = Self::Item> {
        let mut emitted = 0usize;
        self.decide(move |_ix, up, _sig| match up {
            Upstream::Item(v) => {
                if emitted >= count {
                    return Verdict::halt();
                }
                emitted += 1;
                if emitted == count {
                    Verdict::last(v)
                } else {
                    Verdict::emit(v)
                }
            }
            Upstream::Done => Verdict::halt(),
        })
    }

    /// Yield elements while `pred` holds, terminating on the first failure.
    fn take_while<F>(self, mut pred: F) -> impl Stage<Item = Self::Item>
    where
        F: FnMut(&Self::Item) -> bool,
    {
        self.decide(move |_ix, up, _sig| match up {
            Upstream::Item(v) => {
                if pred(&v) {
                    Verdict::emit(v)
                } else {
                    Verdict::halt()
                }
            }
            Upstream::Done => Verdict::halt(),
        })
    }

    /// Discard the first `count` elements: a filter keyed on the running
    /// element index.
    fn skip(self, count: usize) -> impl Stage<Item = Self::Item> {
        self.decide(move |ix, up, _sig| match up {
            Upstream::Item(v) => {
                if ix >= count as u64 {
                    Verdict::emit(v)
                } else {
                    Verdict::skip()
                }
            }
            Upstream::Done => Verdict::halt(),
        })
    }

    /// Group consecutive elements into non-overlapping windows of exactly
    /// `size`; a trailing partial group is discarded.
    fn chunks(self, size: usize) -> impl Stage<Item = Vec<Self::Item>> {
        chunked(self, size, false)
    }

    /// Like [`chunks`](StageExt::chunks), but a trailing partial group is
    /// emitted when the parent ends.
    fn chunks_partial(self, size: usize) -> impl Stage<Item = Vec<Self::Item>> {
        chunked(self, size, true)
    }

    /// Sliding windows of exactly `size` consecutive elements, advancing by
    /// one element per emission. Nothing is emitted for a parent shorter
    /// than `size`.
    fn windows(self, size: usize) -> impl Stage<Item = Vec<Self::Item>>
    where
        Self::Item: Clone,
    {
        let mut buf: VecDeque<Self::Item> = VecDeque::new();
        self.decide(move |_ix, up, _sig| {
            if size == 0 {
                return Verdict::fail(anyhow!("window size must be at least 1"));
            }
            match up {
                Upstream::Item(v) => {
                    buf.push_back(v);
                    if buf.len() == size {
                        let out: Vec<_> = buf.iter().cloned().collect();
                        buf.pop_front();
                        Verdict::emit(out)
                    } else {
                        Verdict::skip()
                    }
                }
                Upstream::Done => Verdict::halt(),
            }
        })
    }

    /// Pair this stage with `right`, element for element. See
    /// [`merge::zip`].
    fn zip<R: Stage>(self, right: R) -> Zip<Self, R> {
        merge::zip(self, right)
    }

    /// Ordered merge with `right`, tagging each element with its side. See
    /// [`merge::join`].
    fn join_by<R, F>(self, right: R, prefer_left: F) -> Join<Self, R, F>
    where
        R: Stage,
        F: FnMut(&Self::Item, &R::Item) -> bool,
    {
        merge::join(self, right, prefer_left)
    }

    /// Ordered merge of two same-typed stages into a flat sequence, a thin
    /// unwrap over [`join_by`](StageExt::join_by).
    fn merge_by<R, F>(self, right: R, prefer_left: F) -> impl Stage<Item = Self::Item>
    where
        R: Stage<Item = Self::Item>,
        F: FnMut(&Self::Item, &Self::Item) -> bool,
    {
        merge::join(self, right, prefer_left).map(Side::into_inner)
    }

    /// Run `setup` before the first element and `teardown` on exhaustion or
    /// stop. See [`source::bracket`].
    fn bracket<Su, Td>(self, setup: Su, teardown: Td) -> Bracket<Self, Su, Td>
    where
        Su: FnOnce() -> Result<()>,
        Td: FnOnce() -> Result<()>,
    {
        source::bracket(self, setup, teardown)
    }

    /// Erase this stage's type for dynamic chains (e.g.
    /// [`recurse`](crate::recurse::recurse)).
    fn boxed(self) -> BoxStage<Self::Item>
    where
        Self: 'static,
    {
        Box::new(self)
    }

    // ---------- terminals ----------

    /// Drive this chain to completion with a raw per-element operation,
    /// the primitive every other terminal is built from. See
    /// [`consume::drive`].
    fn drive<F>(self, op: F) -> Result<()>
    where
        F: FnMut(u64, Self::Item) -> Result<Signal>,
    {
        consume::drive(self, op)
    }

    /// Apply `f` to every element.
    fn for_each<F>(self, mut f: F) -> Result<()>
    where
        F: FnMut(Self::Item),
    {
        consume::drive(self, move |_ix, v| {
            f(v);
            Ok(Signal::Continue)
        })
    }

    fn count(self) -> Result<u64> {
        let mut n = 0u64;
        consume::drive(self, |_ix, _v| {
            n += 1;
            Ok(Signal::Continue)
        })?;
        Ok(n)
    }

    fn collect(self) -> Result<Vec<Self::Item>> {
        let mut out = Vec::new();
        consume::drive(self, |_ix, v| {
            out.push(v);
            Ok(Signal::Continue)
        })?;
        Ok(out)
    }

    /// Append the chain onto an existing vector, returning how many
    /// elements were added.
    fn collect_into(self, out: &mut Vec<Self::Item>) -> Result<usize> {
        let before = out.len();
        consume::drive(self, |_ix, v| {
            out.push(v);
            Ok(Signal::Continue)
        })?;
        Ok(out.len() - before)
    }

    /// Thread an accumulator through `f`, which may stop early or fail.
    ///
    /// Always returns the accumulator as computed before any failing
    /// element, alongside the error (if one occurred): a failure does not
    /// forfeit the partial result.
    fn try_fold<A, F>(self, init: A, mut f: F) -> (A, Option<Error>)
    where
        F: FnMut(&mut A, Self::Item) -> Result<Signal>,
    {
        let mut acc = init;
        let res = consume::drive(self, |_ix, v| f(&mut acc, v));
        (acc, res.err())
    }

    /// Reduce the chain with an infallible step function.
    fn fold<A, F>(self, init: A, mut f: F) -> Result<A>
    where
        F: FnMut(&mut A, Self::Item),
    {
        let (acc, err) = self.try_fold(init, |a, v| {
            f(a, v);
            Ok(Signal::Continue)
        });
        match err {
            None => Ok(acc),
            Some(e) => Err(e),
        }
    }

    /// True when every element matches `pred`; stops at the first failure.
    fn all<F>(self, mut pred: F) -> Result<bool>
    where
        F: FnMut(&Self::Item) -> bool,
    {
        let mut ok = true;
        consume::drive(self, |_ix, v| {
            if pred(&v) {
                Ok(Signal::Continue)
            } else {
                ok = false;
                Ok(Signal::Stop)
            }
        })?;
        Ok(ok)
    }

    /// True when any element matches `pred`; stops at the first match.
    fn any<F>(self, mut pred: F) -> Result<bool>
    where
        F: FnMut(&Self::Item) -> bool,
    {
        let mut hit = false;
        consume::drive(self, |_ix, v| {
            if pred(&v) {
                hit = true;
                Ok(Signal::Stop)
            } else {
                Ok(Signal::Continue)
            }
        })?;
        Ok(hit)
    }

    /// The first element matching `pred`, if any. Found-ness is reported in
    /// the `Option`, distinct from the error channel.
    fn find<F>(self, mut pred: F) -> Result<Option<Self::Item>>
    where
        F: FnMut(&Self::Item) -> bool,
    {
        let mut found = None;
        consume::drive(self, |_ix, v| {
            if pred(&v) {
                found = Some(v);
                Ok(Signal::Stop)
            } else {
                Ok(Signal::Continue)
            }
        })?;
        Ok(found)
    }

    /// The index of the first element matching `pred`, if any.
    fn position<F>(self, mut pred: F) -> Result<Option<u64>>
    where
        F: FnMut(&Self::Item) -> bool,
    {
        let mut at = None;
        consume::drive(self, |ix, v| {
            if pred(&v) {
                at = Some(ix);
                Ok(Signal::Stop)
            } else {
                Ok(Signal::Continue)
            }
        })?;
        Ok(at)
    }

    /// The element at index `n`, if the chain is long enough.
    fn nth(self, n: u64) -> Result<Option<Self::Item>> {
        let mut found = None;
        consume::drive(self, |ix, v| {
            if ix == n {
                found = Some(v);
                Ok(Signal::Stop)
            } else {
                Ok(Signal::Continue)
            }
        })?;
        Ok(found)
    }

    /// Send every element into a channel, returning how many were sent.
    /// Fails (and stops the chain) if the receiver disconnects.
    fn drain_to(self, tx: &crossbeam::channel::Sender<Self::Item>) -> Result<u64> {
        let mut sent = 0u64;
        consume::drive(self, |_ix, v| {
            tx.send(v).map_err(|_| anyhow!("drain receiver disconnected"))?;
            sent += 1;
            Ok(Signal::Continue)
        })?;
        Ok(sent)
    }

    /// Write every element to `w`, one line each, returning how many lines
    /// were written.
    fn write_to<W: Write>(self, mut w: W) -> Result<u64>
    where
        Self::Item: Display,
    {
        let mut written = 0u64;
        consume::drive(self, |ix, v| {
            writeln!(w, "{v}").with_context(|| format!("write element #{ix}"))?;
            written += 1;
            Ok(Signal::Continue)
        })?;
        Ok(written)
    }
}

impl<S: Stage> StageExt for S {}
