//! # Sluice
//!
//! A **pull-based lazy stage engine** for Rust: composable single-pass
//! iteration with explicit flow control, deterministic resource release, and
//! one bounded parallel fan-out stage.
//!
//! ## Key Features
//!
//! - **Three-valued feedback protocol** - every stage is driven with
//!   `Continue` / `Stop` / `Retry`, so cancellation and filtering are part of
//!   the vocabulary, not bolted on
//! - **One transform primitive** - map, filter, take, skip, and windowing are
//!   all decision functions over [`decide`]
//! - **One consume primitive** - count, collect, fold, find, and the drains
//!   are all operations over [`drive`], which always issues the chain's
//!   single terminal `Stop`
//! - **Two-source combinators** - lockstep [`zip`] and merge-sort style
//!   ordered [`join`]
//! - **Heap-stack recursion** - [`recurse`] flattens self-expanding chains
//!   depth-first without touching the native call stack
//! - **Bounded fan-out** - [`parallel`] dispatches to a fixed worker pool
//!   and funnels results back to the calling thread
//! - **File sources** - plain lines, typed JSONL, and glob ingestion (all
//!   optional via feature flags)
//!
//! ## Quick Start
//!
//! ```
//! use sluice::*;
//!
//! # fn main() -> anyhow::Result<()> {
//! let evens = from_vec((1..=10).collect::<Vec<i32>>())
//!     .filter(|n| n % 2 == 0)
//!     .map(|n| n * n)
//!     .take(3)
//!     .collect()?;
//!
//! assert_eq!(evens, vec![4, 16, 36]);
//! # Ok(())
//! # }
//! ```
//!
//! ## Core Concepts
//!
//! ### Stage
//!
//! A [`Stage`] is an explicit state struct with one method:
//! `pull(Signal) -> Step<Item>`. `pull(Continue)` yields the next element or
//! reports permanent exhaustion; `pull(Stop)` releases everything the stage
//! owns. A chain is just a stage that owns its parent; building one never
//! runs anything.
//!
//! ### Deterministic cleanup
//!
//! Every terminal operator issues exactly one `Stop` to its chain no matter
//! how consumption ended (natural exhaustion, early stop, or error), and
//! `Stop` propagates to each ancestor at most once. File handles, lock
//! guards, and drain threads are released on that path, not on `Drop` luck.
//!
//! ### Errors
//!
//! Errors are opaque [`anyhow::Error`] values. The engine only ever
//! [`combine`]s them: iteration errors short-circuit consumption, and
//! cleanup errors raised during the terminal `Stop` are merged behind them,
//! never dropped. The few misuse conditions (a zero-width worker pool) fail
//! fast as typed errors, never panics.
//!
//! ## Feature Flags
//!
//! - `io-jsonl` - typed JSONL file sources via Serde
//! - `io-glob` - multi-file line sources via glob patterns
//!
//! ## Module Overview
//!
//! - [`stage`] - the feedback protocol and core trait
//! - [`source`] - in-memory producers, the unordered drain, brackets
//! - [`io`] - file-backed producers
//! - [`transform`] - the universal intermediate primitive
//! - [`ops`] - the fluent operator surface ([`StageExt`])
//! - [`consume`] - the universal terminal primitive
//! - [`merge`] - zip and ordered join
//! - [`recurse`] - depth-first flattening
//! - [`parallel`] - the bounded worker pool
//! - [`testing`] - probes and assertions for chain tests

pub mod consume;
pub mod error;
pub mod io;
pub mod merge;
pub mod ops;
pub mod parallel;
pub mod recurse;
pub mod source;
pub mod stage;
pub mod testing;
pub mod transform;

// General re-exports
pub use consume::drive;
pub use error::{combine, InvalidWorkerCount, Merged};
pub use io::lines;
pub use merge::{join, zip, Join, Side, Zip};
pub use ops::StageExt;
pub use parallel::{parallel, parallel_auto};
pub use recurse::recurse;
pub use source::{
    bracket, empty, from_index, from_iter, from_lock, from_map, from_unordered, from_vec, repeat,
    Repeat,
};
pub use stage::{BoxStage, Produce, Signal, Stage, Step};
pub use transform::{decide, Decide, Upstream, Verdict};

// Gated re-exports
#[cfg(feature = "io-jsonl")]
pub use io::json_lines;

#[cfg(feature = "io-glob")]
pub use io::glob_lines;
