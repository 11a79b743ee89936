//! Bounded fan-out/fan-in: the one place true concurrency happens.
//!
//! [`parallel`] drives a source on the calling thread, dispatches elements
//! to a fixed pool of worker threads over a bounded job channel, and drains
//! `(element, result)` pairs back on the calling thread. The result callback
//! therefore never needs its own synchronization, and the number of jobs in
//! flight, queued or running, never exceeds the pool width, so a slow
//! drain backpressures the producer instead of buffering without bound.

use crate::error::{accumulate, InvalidWorkerCount};
use crate::stage::{Signal, Stage};
use anyhow::{anyhow, Error, Result};
use crossbeam::channel::bounded;
use std::panic::{catch_unwind, AssertUnwindSafe};
use tracing::debug;

/// Fan `stage` out to `workers` concurrent applications of `worker_op`,
/// fanning results back into `result_op` on the calling thread.
///
/// Exactly `workers` long-lived threads are spawned up front and fed through
/// a bounded channel; they exit when the source is exhausted and the channel
/// closes. `result_op(element, result)` receives every input element exactly
/// once, in no guaranteed order. Worker errors do not abort other in-flight
/// work; they are delivered to `result_op`, and aggregating them is the
/// caller's decision. The returned error reflects only source iteration and
/// dispatch/drain bookkeeping.
///
/// `workers == 0` fails fast with [`InvalidWorkerCount`]: no worker is
/// spawned and nothing is pulled, but the stage is still stopped so cleanup
/// stays deterministic.
pub fn parallel<S, W, R, U>(
    mut stage: S,
    worker_op: W,
    mut result_op: R,
    workers: usize,
) -> Result<()>
where
    S: Stage,
    S::Item: Send,
    U: Send,
    W: Fn(&S::Item) -> Result<U> + Sync,
    R: FnMut(S::Item, Result<U>),
{
    if workers == 0 {
        let mut err: Option<Error> = Some(InvalidWorkerCount(0).into());
        accumulate(&mut err, stage.pull(Signal::Stop).error);
        return Err(err.expect("range error present"));
    }

    let mut held: Option<Error> = None;
    std::thread::scope(|scope| {
        let (job_tx, job_rx) = bounded::<S::Item>(workers);
        let (result_tx, result_rx) = bounded::<(S::Item, Result<U>)>(workers);

        for _ in 0..workers {
            let jobs = job_rx.clone();
            let results = result_tx.clone();
            let op = &worker_op;
            scope.spawn(move || {
                for item in jobs.iter() {
                    let out = catch_unwind(AssertUnwindSafe(|| op(&item)))
                        .unwrap_or_else(|_| Err(anyhow!("worker panicked")));
                    if results.send((item, out)).is_err() {
                        break;
                    }
                }
            });
        }
        // Only the workers hold these ends now; dropping ours lets
        // disconnection mean what it should.
        drop(job_rx);
        drop(result_tx);
        debug!(workers, "worker pool spawned");

        let mut in_flight = 0usize;
        loop {
            let step = stage.pull(Signal::Continue);
            if let Some(e) = step.error {
                accumulate(&mut held, Some(e));
                break;
            }
            let Some(item) = step.value else { break };
            // At the cap: block for one completed result before dispatching.
            while in_flight >= workers {
                match result_rx.recv() {
                    Ok((v, r)) => {
                        result_op(v, r);
                        in_flight -= 1;
                    }
                    Err(_) => break,
                }
            }
            if job_tx.send(item).is_err() {
                accumulate(&mut held, Some(anyhow!("worker pool disconnected")));
                break;
            }
            in_flight += 1;
        }

        // Close the job channel; workers finish what is queued and exit.
        drop(job_tx);
        while in_flight > 0 {
            match result_rx.recv() {
                Ok((v, r)) => {
                    result_op(v, r);
                    in_flight -= 1;
                }
                Err(_) => {
                    accumulate(
                        &mut held,
                        Some(anyhow!("worker pool disconnected before all results arrived")),
                    );
                    break;
                }
            }
        }
        debug!("worker pool drained");
    });

    accumulate(&mut held, stage.pull(Signal::Stop).error);
    match held {
        None => Ok(()),
        Some(e) => Err(e),
    }
}

/// [`parallel`] with the pool sized to the machine.
pub fn parallel_auto<S, W, R, U>(stage: S, worker_op: W, result_op: R) -> Result<()>
where
    S: Stage,
    S::Item: Send,
    U: Send,
    W: Fn(&S::Item) -> Result<U> + Sync,
    R: FnMut(S::Item, Result<U>),
{
    parallel(stage, worker_op, result_op, num_cpus::get().max(1))
}
