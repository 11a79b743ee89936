use sluice::testing::*;
use sluice::*;
use std::cell::Cell;
use std::collections::HashMap;
use std::sync::RwLock;

#[test]
fn empty_yields_nothing() -> anyhow::Result<()> {
    let out: Vec<i32> = empty().collect()?;
    assert!(out.is_empty());
    Ok(())
}

#[test]
fn repeat_yields_fixed_count() -> anyhow::Result<()> {
    let out = repeat("x", 4).collect()?;
    assert_collections_equal(&out, &["x", "x", "x", "x"]);
    Ok(())
}

#[test]
fn repeat_honors_early_stop() -> anyhow::Result<()> {
    let out = repeat(7u32, 1000).take(3).collect()?;
    assert_collections_equal(&out, &[7, 7, 7]);
    Ok(())
}

#[test]
fn repeat_faulty_surfaces_the_error() {
    let src = Repeat::faulty(1i32, 5, || anyhow::anyhow!("injected"));
    let err = src.collect().expect_err("error expected");
    assert!(err.to_string().contains("injected"), "got: {err}");
}

#[test]
fn from_index_yields_in_order() -> anyhow::Result<()> {
    let out = from_index(5, |i| (i * i) as u64).collect()?;
    assert_collections_equal(&out, &[0, 1, 4, 9, 16]);
    Ok(())
}

#[test]
fn from_index_early_stop_reads_nothing_further() -> anyhow::Result<()> {
    let reads = Cell::new(0usize);
    let out = from_index(100, |i| {
        reads.set(reads.get() + 1);
        i
    })
    .take(2)
    .collect()?;
    assert_collections_equal(&out, &[0, 1]);
    assert_eq!(reads.get(), 2);
    Ok(())
}

#[test]
fn unordered_drains_every_pair() -> anyhow::Result<()> {
    let mut m = HashMap::new();
    for i in 0..100u32 {
        m.insert(i, i * 2);
    }
    let mut out = from_map(m).collect()?;
    out.sort();
    let expected: Vec<(u32, u32)> = (0..100).map(|i| (i, i * 2)).collect();
    assert_collections_equal(&out, &expected);
    Ok(())
}

#[test]
fn unordered_early_stop_shuts_the_drain_down() -> anyhow::Result<()> {
    // Far more entries than the hand-off holds; the producer thread will be
    // blocked mid-send when the stop arrives. The test passing at all means
    // the thread was released and joined.
    let mut m = HashMap::new();
    for i in 0..10_000u32 {
        m.insert(i, ());
    }
    let out = from_map(m).take(5).collect()?;
    assert_eq!(out.len(), 5);
    Ok(())
}

#[test]
fn guarded_releases_the_lock_on_exhaustion() -> anyhow::Result<()> {
    let shared = RwLock::new(vec![1, 2, 3]);
    let out = from_lock(&shared).collect()?;
    assert_collections_equal(&out, &[1, 2, 3]);
    assert!(shared.try_write().is_ok(), "read guard still held");
    Ok(())
}

#[test]
fn guarded_releases_the_lock_on_early_stop() -> anyhow::Result<()> {
    let shared = RwLock::new((0..50).collect::<Vec<i32>>());
    let out = from_lock(&shared).take(1).collect()?;
    assert_collections_equal(&out, &[0]);
    assert!(shared.try_write().is_ok(), "read guard still held");
    Ok(())
}

#[test]
fn guarded_empty_vector_still_releases() -> anyhow::Result<()> {
    let shared: RwLock<Vec<i32>> = RwLock::new(Vec::new());
    let out = from_lock(&shared).collect()?;
    assert!(out.is_empty());
    assert!(shared.try_write().is_ok());
    Ok(())
}

#[test]
fn bracket_pairs_hooks_on_a_nonempty_source() -> anyhow::Result<()> {
    let setups = Cell::new(0);
    let teardowns = Cell::new(0);
    let out = from_vec(vec![1, 2, 3])
        .bracket(
            || {
                setups.set(setups.get() + 1);
                Ok(())
            },
            || {
                teardowns.set(teardowns.get() + 1);
                Ok(())
            },
        )
        .collect()?;
    assert_collections_equal(&out, &[1, 2, 3]);
    assert_eq!((setups.get(), teardowns.get()), (1, 1));
    Ok(())
}

#[test]
fn bracket_pairs_hooks_on_an_empty_source() -> anyhow::Result<()> {
    let setups = Cell::new(0);
    let teardowns = Cell::new(0);
    let out: Vec<i32> = empty()
        .bracket(
            || {
                setups.set(setups.get() + 1);
                Ok(())
            },
            || {
                teardowns.set(teardowns.get() + 1);
                Ok(())
            },
        )
        .collect()?;
    assert!(out.is_empty());
    assert_eq!((setups.get(), teardowns.get()), (1, 1));
    Ok(())
}

#[test]
fn bracket_runs_teardown_when_setup_fails() {
    let teardowns = Cell::new(0);
    let result = from_vec(vec![1, 2, 3])
        .bracket(
            || anyhow::bail!("setup exploded"),
            || {
                teardowns.set(teardowns.get() + 1);
                Ok(())
            },
        )
        .collect();
    let err = result.expect_err("setup error expected");
    assert!(err.to_string().contains("setup exploded"), "got: {err}");
    assert_eq!(teardowns.get(), 1);
}

#[test]
fn bracket_combines_teardown_error_with_iteration_error() {
    let result = Repeat::faulty(1i32, 3, || anyhow::anyhow!("mid-stream"))
        .bracket(|| Ok(()), || anyhow::bail!("teardown too"))
        .collect();
    let err = result.expect_err("combined error expected");
    let text = format!("{err}");
    assert!(text.contains("mid-stream"), "got: {text}");
    assert!(text.contains("teardown too"), "got: {text}");
}

#[test]
fn bracket_skips_both_hooks_when_stopped_before_any_pull() {
    let setups = Cell::new(0);
    let teardowns = Cell::new(0);
    let mut staged = from_vec(vec![1]).bracket(
        || {
            setups.set(setups.get() + 1);
            Ok(())
        },
        || {
            teardowns.set(teardowns.get() + 1);
            Ok(())
        },
    );
    let step = staged.pull(Signal::Stop);
    assert!(step.is_exhausted());
    assert_eq!((setups.get(), teardowns.get()), (0, 0));
}
