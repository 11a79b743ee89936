//! Fan a chain out to a bounded worker pool and collect the results.
//!
//! Run with: `cargo run --example fan_out`

use sluice::*;

fn busy_square(n: &u64) -> anyhow::Result<u64> {
    // Stand-in for real per-element work.
    std::thread::sleep(std::time::Duration::from_millis(2));
    Ok(n * n)
}

fn main() -> anyhow::Result<()> {
    let mut total = 0u64;
    let mut failures = 0usize;

    parallel(
        from_vec((1..=64u64).collect()),
        busy_square,
        |n, result| match result {
            Ok(sq) => total += sq,
            Err(e) => {
                failures += 1;
                eprintln!("element {n} failed: {e}");
            }
        },
        8,
    )?;

    println!("sum of squares 1..=64: {total} ({failures} failures)");
    Ok(())
}
