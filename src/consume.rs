//! The universal terminal primitive.
//!
//! [`drive`] is the only place a chain is run to completion. Every derived
//! terminal operator (count, collect, fold, find, the drains) is a call to
//! `drive` with a different per-element operation (see
//! [`StageExt`](crate::ops::StageExt)).
//!
//! The one guarantee that makes resource cleanup deterministic across a whole
//! chain lives here: no matter how the loop exits, whether by natural
//! exhaustion, an op-requested stop, a stage error, or an op error, exactly
//! one `Stop` is issued to the stage before returning, and its cleanup error
//! is combined into the result rather than dropped.

use crate::error::accumulate;
use crate::stage::{Signal, Stage};
use anyhow::Result;

/// Drive `stage` to completion, feeding each element to `op`.
///
/// `op(index, value)` returns the signal for the loop: `Continue` keeps
/// going, `Stop` ends consumption early, and an `Err` ends it with that
/// error. (`Retry` has no meaning at a terminal and is treated as
/// `Continue`.) A stage step that carries an error ends the loop without
/// `op` seeing the element.
///
/// Iteration errors keep reporting priority; the mandatory terminal `Stop`'s
/// cleanup error, if any, is combined behind them.
pub fn drive<S, F>(mut stage: S, mut op: F) -> Result<()>
where
    S: Stage,
    F: FnMut(u64, S::Item) -> Result<Signal>,
{
    let mut held = None;
    let mut index = 0u64;
    loop {
        let step = stage.pull(Signal::Continue);
        if let Some(e) = step.error {
            accumulate(&mut held, Some(e));
            break;
        }
        let Some(value) = step.value else { break };
        match op(index, value) {
            Ok(Signal::Stop) => break,
            Ok(_) => {}
            Err(e) => {
                accumulate(&mut held, Some(e));
                break;
            }
        }
        index += 1;
    }
    accumulate(&mut held, stage.pull(Signal::Stop).error);
    match held {
        None => Ok(()),
        Some(e) => Err(e),
    }
}
