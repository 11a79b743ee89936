use sluice::testing::*;
use sluice::*;

#[test]
fn exhaustion_is_idempotent() {
    let mut s = from_vec(vec![1, 2]);
    assert_eq!(s.pull(Signal::Continue).value, Some(1));
    assert_eq!(s.pull(Signal::Continue).value, Some(2));
    for _ in 0..3 {
        let step = s.pull(Signal::Continue);
        assert!(step.is_exhausted());
        assert!(step.error.is_none());
    }
}

#[test]
fn stop_after_exhaustion_is_safe() {
    let mut s = from_vec(vec![1, 2, 3]);
    while s.pull(Signal::Continue).value.is_some() {}
    let step = s.pull(Signal::Stop);
    assert!(step.is_exhausted());
    assert!(step.error.is_none());
}

#[test]
fn retry_at_a_source_behaves_like_continue() {
    let mut s = from_vec(vec![1, 2, 3]);
    assert_eq!(s.pull(Signal::Retry).value, Some(1));
    assert_eq!(s.pull(Signal::Continue).value, Some(2));
    assert_eq!(s.pull(Signal::Retry).value, Some(3));
    assert!(s.pull(Signal::Continue).is_exhausted());
}

#[test]
fn terminal_stops_source_exactly_once() -> anyhow::Result<()> {
    let (src, log) = probe(from_vec(vec![1, 2, 3, 4]));
    let out = src.filter(|n| n % 2 == 0).map(|n| n * 10).collect()?;
    assert_collections_equal(&out, &[20, 40]);
    assert_eq!(stops_in(&log), 1);
    Ok(())
}

#[test]
fn early_stop_reaches_source_exactly_once() -> anyhow::Result<()> {
    let (src, log) = probe(from_vec(vec![1, 2, 3, 4, 5]));
    let out = src.take(2).collect()?;
    assert_collections_equal(&out, &[1, 2]);
    assert_eq!(stops_in(&log), 1);
    Ok(())
}

#[test]
fn single_pass_in_any_operator_order() -> anyhow::Result<()> {
    let data: Vec<i64> = (0..100).collect();

    let a = from_vec(data.clone())
        .map(|n| n + 1)
        .filter(|n| n % 3 != 0)
        .skip(5)
        .take(20)
        .collect()?;
    let b = from_vec(data.clone())
        .skip(5)
        .take(40)
        .filter(|n| (n + 1) % 3 != 0)
        .map(|n| n + 1)
        .collect()?;

    // Same elements, no duplication, original order preserved.
    assert_eq!(a.len(), 20);
    assert!(a.windows(2).all(|w| w[0] < w[1]));
    assert!(b.windows(2).all(|w| w[0] < w[1]));

    let whole = from_vec(data.clone()).collect()?;
    assert_collections_equal(&whole, &data);
    Ok(())
}

#[test]
fn combine_treats_none_as_identity() {
    assert!(combine(None, None).is_none());
    let e = combine(Some(anyhow::anyhow!("boom")), None).expect("kept");
    assert_eq!(e.to_string(), "boom");
    let e = combine(None, Some(anyhow::anyhow!("bang"))).expect("kept");
    assert_eq!(e.to_string(), "bang");
}

#[test]
fn combine_merges_and_flattens() {
    let a = anyhow::anyhow!("first");
    let b = anyhow::anyhow!("second");
    let c = anyhow::anyhow!("third");

    let ab = combine(Some(a), Some(b)).expect("merged");
    let abc = combine(Some(ab), Some(c)).expect("merged");
    let merged = abc.downcast::<Merged>().expect("composite");
    assert_eq!(merged.parts().len(), 3);
    assert_eq!(merged.parts()[0].to_string(), "first");
    assert_eq!(merged.parts()[2].to_string(), "third");
}

#[test]
fn merged_display_names_every_part() {
    let e = combine(
        Some(anyhow::anyhow!("read failed")),
        Some(anyhow::anyhow!("close failed")),
    )
    .expect("merged");
    let text = e.to_string();
    assert!(text.contains("read failed"), "got: {text}");
    assert!(text.contains("close failed"), "got: {text}");
}

#[test]
fn produce_seam_over_vec_and_map() -> anyhow::Result<()> {
    let out = vec![3, 1, 2].produce().collect()?;
    assert_collections_equal(&out, &[3, 1, 2]);

    let mut m = std::collections::HashMap::new();
    m.insert("a", 1);
    m.insert("b", 2);
    let mut pairs = m.produce().collect()?;
    pairs.sort();
    assert_collections_equal(&pairs, &[("a", 1), ("b", 2)]);
    Ok(())
}
