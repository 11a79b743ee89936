use mark_flaky_tests::flaky;
use sluice::testing::*;
use sluice::*;
use std::sync::atomic::{AtomicUsize, Ordering};

#[test]
fn every_element_gets_exactly_one_result() -> anyhow::Result<()> {
    for workers in [1usize, 25, 50, 75, 100] {
        let mut seen: Vec<i64> = Vec::new();
        parallel(
            from_vec((0..200i64).collect()),
            |v| Ok(v * 2),
            |v, r: anyhow::Result<i64>| {
                assert_eq!(r.expect("worker result"), v * 2);
                seen.push(v);
            },
            workers,
        )?;
        assert_eq!(seen.len(), 200, "workers={workers}");
        let expected: Vec<i64> = (0..200).collect();
        assert_collections_unordered_equal(&seen, &expected);
    }
    Ok(())
}

#[test]
fn zero_workers_fail_fast_and_run_nothing() {
    let invoked = AtomicUsize::new(0);
    let mut results = 0usize;
    let err = parallel(
        from_vec(vec![1, 2, 3]),
        |_v| {
            invoked.fetch_add(1, Ordering::SeqCst);
            Ok(())
        },
        |_v, _r: anyhow::Result<()>| results += 1,
        0,
    )
    .expect_err("range violation expected");
    assert!(err.downcast_ref::<InvalidWorkerCount>().is_some(), "got: {err}");
    assert_eq!(invoked.load(Ordering::SeqCst), 0);
    assert_eq!(results, 0);
}

#[test]
fn worker_errors_reach_the_result_callback() -> anyhow::Result<()> {
    let mut oks = 0usize;
    let mut errs = 0usize;
    parallel(
        from_vec((0..100u32).collect()),
        |v| {
            if v % 2 == 0 {
                Ok(*v)
            } else {
                anyhow::bail!("odd input {v}")
            }
        },
        |_v, r: anyhow::Result<u32>| match r {
            Ok(_) => oks += 1,
            Err(_) => errs += 1,
        },
        8,
    )?;
    assert_eq!((oks, errs), (50, 50));
    Ok(())
}

#[test]
fn results_pair_with_their_own_input() -> anyhow::Result<()> {
    parallel(
        from_vec((0..500u64).collect()),
        |v| Ok(v * v),
        |v, r: anyhow::Result<u64>| assert_eq!(r.expect("worker result"), v * v),
        16,
    )?;
    Ok(())
}

#[flaky]
#[test]
fn slow_drain_backpressures_instead_of_buffering() -> anyhow::Result<()> {
    // With 4 workers, at most 4 jobs may be in flight; a result callback
    // slower than the producer must never observe more than that gap.
    let dispatched = AtomicUsize::new(0);
    let mut drained = 0usize;
    parallel(
        from_index(64, |i| {
            dispatched.fetch_add(1, Ordering::SeqCst);
            i
        }),
        |v| Ok(*v),
        |_v, _r: anyhow::Result<usize>| {
            std::thread::sleep(std::time::Duration::from_millis(1));
            drained += 1;
            let gap = dispatched.load(Ordering::SeqCst) - drained;
            assert!(gap <= 4, "unbounded buffering: gap={gap}");
        },
        4,
    )?;
    assert_eq!(drained, 64);
    Ok(())
}

#[test]
fn source_error_stops_dispatch_and_is_returned() {
    let mut results = 0usize;
    let err = parallel(
        Repeat::faulty(1u8, 10, || anyhow::anyhow!("source broke")),
        |v| Ok(*v),
        |_v, _r: anyhow::Result<u8>| results += 1,
        4,
    )
    .expect_err("source error expected");
    assert!(err.to_string().contains("source broke"), "got: {err}");
    assert_eq!(results, 0);
}

#[test]
fn auto_sizing_completes() -> anyhow::Result<()> {
    let mut seen = 0usize;
    parallel_auto(
        from_vec((0..50u32).collect()),
        |v| Ok(v + 1),
        |_v, _r: anyhow::Result<u32>| seen += 1,
    )?;
    assert_eq!(seen, 50);
    Ok(())
}
