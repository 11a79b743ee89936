//! Error plumbing: opaque values, one associative combine operation.
//!
//! The engine never inspects or classifies errors. It holds them as
//! [`anyhow::Error`] and only ever merges them with [`combine`]: `None` is the
//! identity, and two present errors fold into a [`Merged`] composite that
//! records both. Iteration errors keep reporting priority simply because they
//! are combined in first; a cleanup error raised during the terminal `Stop`
//! lands behind them, never on top of them.

use anyhow::Error;
use std::fmt;

/// Associatively append two optional errors.
///
/// `combine(None, x) == x`, `combine(x, None) == x`, and combining two
/// present errors yields a [`Merged`] composite holding both. Nested
/// composites are flattened, so the operation stays associative and no cause
/// is ever discarded.
pub fn combine(a: Option<Error>, b: Option<Error>) -> Option<Error> {
    match (a, b) {
        (None, x) | (x, None) => x,
        (Some(a), Some(b)) => Some(merge(a, b)),
    }
}

/// Append `extra` onto the error accumulated in `slot`.
#[inline]
pub(crate) fn accumulate(slot: &mut Option<Error>, extra: Option<Error>) {
    if extra.is_some() {
        *slot = combine(slot.take(), extra);
    }
}

fn merge(a: Error, b: Error) -> Error {
    let mut parts = match a.downcast::<Merged>() {
        Ok(m) => m.0,
        Err(a) => vec![a],
    };
    match b.downcast::<Merged>() {
        Ok(m) => parts.extend(m.0),
        Err(b) => parts.push(b),
    }
    Error::new(Merged(parts))
}

/// Two or more errors that occurred along the same chain.
///
/// Displays every part in order; the first part is the first error that
/// occurred (typically the iteration error a later cleanup error was merged
/// behind).
#[derive(Debug)]
pub struct Merged(pub Vec<Error>);

impl Merged {
    /// The individual errors, oldest first.
    pub fn parts(&self) -> &[Error] {
        &self.0
    }
}

impl fmt::Display for Merged {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} errors: ", self.0.len())?;
        for (i, e) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, "; ")?;
            }
            write!(f, "{e}")?;
        }
        Ok(())
    }
}

impl std::error::Error for Merged {}

/// Rejected pool size for [`parallel`](crate::parallel::parallel).
///
/// Misuse of the engine surfaces as a returned error, never a panic.
#[derive(Debug, thiserror::Error)]
#[error("worker count must be at least 1, got {0}")]
pub struct InvalidWorkerCount(pub usize);
