//! The feedback protocol and the core stage contract.
//!
//! Everything in this crate is a [`Stage`]: a unit of pull-based iteration
//! driven one call at a time by whoever sits downstream. Each call carries a
//! [`Signal`] telling the stage what the caller wants, and yields a
//! [`Step`] holding at most one element and at most one error.
//!
//! A chain of stages is just a stage that owns its parent. Nothing here is
//! ever re-entered concurrently: a stage belongs to the single thread that
//! drives its terminal consumer.

use anyhow::Error;

/// The three-valued control vocabulary a caller uses to drive a stage.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Signal {
    /// Advance: produce the next element, or report exhaustion.
    Continue,
    /// Terminate: release every resource the stage owns and report
    /// exhaustion. A stopped stage must never be asked for a value again,
    /// and must forward `Stop` to its parent at most once.
    Stop,
    /// Discard the element under consideration and immediately try again
    /// without surfacing it. Only [`decide`](crate::transform::decide)-built
    /// stages interpret `Retry` specially; every producer in this crate
    /// treats it exactly like [`Continue`].
    Retry,
}

/// The result of one pull: at most one element, at most one error.
///
/// `value == None` marks permanent exhaustion: once a stage reports it under
/// [`Signal::Continue`], every later pull reports it too. An error may ride
/// along with a value (the element was produced but something went wrong) or
/// with exhaustion (the stage failed while terminating or cleaning up).
#[derive(Debug)]
pub struct Step<T> {
    pub value: Option<T>,
    pub error: Option<Error>,
}

impl<T> Step<T> {
    /// A produced element.
    #[inline]
    pub fn item(value: T) -> Self {
        Self { value: Some(value), error: None }
    }

    /// Exhaustion with nothing to report.
    #[inline]
    pub fn done() -> Self {
        Self { value: None, error: None }
    }

    /// Exhaustion caused by (or accompanied with) an error.
    #[inline]
    pub fn fail(error: Error) -> Self {
        Self { value: None, error: Some(error) }
    }

    /// Attach `error` to this step, combining with any error already held.
    pub fn with_error(mut self, error: Option<Error>) -> Self {
        self.error = crate::error::combine(self.error, error);
        self
    }

    /// True when this step reports permanent exhaustion.
    #[inline]
    pub fn is_exhausted(&self) -> bool {
        self.value.is_none()
    }
}

/// A single unit of pull-based iteration.
///
/// Implementations are ordinary structs whose cursors are ordinary fields;
/// `pull` mutates them in place. The contract, in full:
///
/// - `pull(Continue)` produces the next element, reports exhaustion, or
///   reports an error. Exhaustion is idempotent.
/// - `pull(Stop)` releases owned resources and reports exhaustion; any error
///   returned describes a cleanup failure and is combined (never dropped) by
///   the caller. Stopping an already-exhausted stage is safe.
/// - `pull(Retry)` is meaningful only to stages built from
///   [`decide`](crate::transform::decide); producers treat it as `Continue`.
pub trait Stage {
    type Item;

    fn pull(&mut self, signal: Signal) -> Step<Self::Item>;
}

/// A boxed stage, for chains whose shape is only known at runtime
/// (see [`recurse`](crate::recurse::recurse)).
pub type BoxStage<T> = Box<dyn Stage<Item = T>>;

impl<S: Stage + ?Sized> Stage for Box<S> {
    type Item = S::Item;

    #[inline]
    fn pull(&mut self, signal: Signal) -> Step<Self::Item> {
        (**self).pull(signal)
    }
}

impl<S: Stage + ?Sized> Stage for &mut S {
    type Item = S::Item;

    #[inline]
    fn pull(&mut self, signal: Signal) -> Step<Self::Item> {
        (**self).pull(signal)
    }
}

/// The producer seam: anything that can expose a stage over its elements.
///
/// Containers implement this to become sources. The engine itself provides
/// implementations for plain `Vec` and `HashMap` (see [`crate::source`]).
pub trait Produce {
    type Item;
    type Stage: Stage<Item = Self::Item>;

    fn produce(self) -> Self::Stage;
}
