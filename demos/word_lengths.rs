//! Build a small chain end to end: filter, transform, window, consume.
//!
//! Run with: `cargo run --example word_lengths`

use sluice::*;

fn main() -> anyhow::Result<()> {
    let words = vec![
        "the", "quick", "brown", "fox", "jumps", "over", "the", "lazy", "dog",
    ];

    // Lengths of the interesting words, in groups of three.
    let groups = from_vec(words.clone())
        .filter(|w| w.len() >= 4)
        .map(|w| (w, w.len()))
        .chunks_partial(3)
        .collect()?;

    for group in &groups {
        println!("{group:?}");
    }

    // Terminals short-circuit: the chain is finalized either way.
    let has_long = from_vec(words).any(|w| w.len() > 4)?;
    println!("any word longer than four letters: {has_long}");

    Ok(())
}
