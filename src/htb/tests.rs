use super::{HyperTwoBits, MAX_PRECISION, MIN_PRECISION};

use std::hash::RandomState;

use hyperloglogplus::{HyperLogLog as _, HyperLogLogPlus};
use rand::{rngs::SmallRng, RngCore, SeedableRng};

#[test]
fn register_layout() {
    assert_eq!(HyperTwoBits::new(6).unwrap().registers.len(), 1);
    assert_eq!(HyperTwoBits::new(11).unwrap().registers.len(), 32);
    assert_eq!(HyperTwoBits::new(16).unwrap().registers.len(), 1024);
}

#[test]
fn rejects_out_of_range_precision() {
    assert!(HyperTwoBits::new(MIN_PRECISION - 1).is_err());
    assert!(HyperTwoBits::new(MAX_PRECISION + 1).is_err());
}

#[test]
fn val_and_set() {
    let mut htb = HyperTwoBits::new(7).unwrap();
    htb.set(3, 2);
    htb.set(100, 3);
    assert_eq!(htb.val(3), 2);
    assert_eq!(htb.val(100), 3);
    assert_eq!(htb.val(4), 0);
    assert_eq!(htb.active(), 2);
    // 3 -> 2, 2 -> 1, both stay active
    assert_eq!(htb.decrement(), 2);
    assert_eq!(htb.val(3), 1);
    assert_eq!(htb.val(100), 2);
    assert_eq!(htb.decrement(), 1);
    assert_eq!(htb.val(3), 0);
}

#[test]
fn clear_resets() {
    let mut htb = HyperTwoBits::new(8).unwrap();
    for key in 0..10_000_u64 {
        htb.insert(&key);
    }
    assert!(htb.count() > 0);
    htb.clear();
    assert_eq!(htb.count(), 0);
    assert_eq!(htb, HyperTwoBits::new(8).unwrap());
}

#[allow(
    clippy::cast_precision_loss,
    clippy::cast_sign_loss,
    clippy::cast_possible_truncation
)]
fn run(precision: u8, seed: u64, delta: f64, n: usize) {
    let mut htb = HyperTwoBits::new(precision).unwrap();
    let mut htb_a = HyperTwoBits::new(precision).unwrap();
    let mut htb_b = HyperTwoBits::new(precision).unwrap();
    let mut hll: HyperLogLogPlus<u64, RandomState> =
        HyperLogLogPlus::new(16, RandomState::new()).unwrap();

    let mut rng = SmallRng::seed_from_u64(seed);
    for i in 0..n {
        let key = rng.next_u64();
        if i % 2 == 0 {
            htb_a.insert_hash(key);
        } else {
            htb_b.insert_hash(key);
        }
        htb.insert_hash(key);
        // duplicates must not move the estimate
        htb.insert_hash(key);
        hll.insert(&key);
    }

    htb_a.merge(&htb_b);

    // random 64 bit keys, collisions are negligible at these sizes
    let count = n as f64;
    let delta_hll = (count - hll.count()).abs() / count;
    let delta_htb = (count - htb.count() as f64).abs() / count;
    let delta_htbm = (count - htb_a.count() as f64).abs() / count;

    let diff_htb = delta_htb - delta_hll;
    let diff_htbm = delta_htbm - delta_hll;

    assert!(
        diff_htb < delta,
        "Delta between HLL+ and HTB is too high: {diff_htb}\nCount: {count}\nHLL+:  {}\nHTB:   {}",
        hll.count() as u64,
        htb.count()
    );
    // merging is less precise, allow twice the delta
    assert!(
        diff_htbm < delta * 2.0,
        "Delta between HLL+ and HTB(merged) is too high: {diff_htbm}\nCount: {count}\nHLL+:  {}\nHTB:   {}",
        hll.count() as u64,
        htb_a.count()
    );
}

#[test]
fn accuracy_1_000() {
    run(11, 1, 0.13, 1_000);
}
#[test]
fn accuracy_10_000() {
    run(11, 2, 0.1, 10_000);
}
#[test]
fn accuracy_100_000() {
    run(11, 3, 0.1, 100_000);
}

#[test]
fn merge_is_commutative_for_equal_thresholds() {
    let mut a = HyperTwoBits::new(9).unwrap();
    let mut b = HyperTwoBits::new(9).unwrap();
    for key in 0..200_u64 {
        a.insert(&key);
        b.insert(&(key + 1_000));
    }
    let mut ab = a.clone();
    ab.merge(&b);
    let mut ba = b.clone();
    ba.merge(&a);
    assert_eq!(ab, ba);
}

#[test]
#[should_panic(expected = "precisions must be the same")]
fn merge_rejects_mismatched_precision() {
    let mut a = HyperTwoBits::new(8).unwrap();
    let b = HyperTwoBits::new(9).unwrap();
    a.merge(&b);
}

#[test]
fn merge_that_fills_every_substream_advances_the_threshold() {
    let mut a = HyperTwoBits::new(6).unwrap();
    let mut b = HyperTwoBits::new(6).unwrap();
    for stream in 0..62 {
        a.set(stream, 1);
        b.set(stream + 2, 1);
    }
    a.count = a.active();
    b.count = b.active();
    assert!(a.count < a.threshold(HyperTwoBits::ALPHA));

    a.merge(&b);
    assert_eq!(a.t, 5);
    assert!(a.count < a.threshold(HyperTwoBits::ALPHA));
    assert_ne!(a.count(), u64::MAX);
}

#[test]
fn merged_small_estimators_stay_finite() {
    for seed in 0..500 {
        let mut rng = SmallRng::seed_from_u64(seed);
        let mut a = HyperTwoBits::new(6).unwrap();
        let mut b = HyperTwoBits::new(6).unwrap();
        for _ in 0..20 + rng.next_u64() % 300 {
            a.insert_hash(rng.next_u64());
        }
        for _ in 0..20 + rng.next_u64() % 300 {
            b.insert_hash(rng.next_u64());
        }
        a.merge(&b);
        assert!(
            a.count < a.threshold(HyperTwoBits::ALPHA),
            "seed {seed} left {} of {} substreams active",
            a.count,
            a.streams()
        );
        assert_ne!(a.count(), u64::MAX, "seed {seed}");
    }
}
