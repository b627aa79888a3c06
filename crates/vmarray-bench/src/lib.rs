//! Benchmark workloads for the vmarray slot array.
//!
//! - [`Op`] / [`churn_script`]: a deterministic emplace/remove mix
//! - [`run_script`]: replay a script against an array
//! - [`filled_with_holes`]: a populated array with every `stride`-th slot freed

#![forbid(unsafe_code)]
#![deny(rustdoc::broken_intra_doc_links)]

use rand::Rng;
use vmarray_slots::SlotArray;
use vmarray_test_utils::{seeded_rng, stamp, Pair};

/// One step of a churn workload.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Op {
    /// Insert a fresh value.
    Emplace,
    /// Remove the `n`-th live index (modulo the live count).
    Remove(usize),
}

/// Build `len` operations with roughly `remove_pct` percent removals.
///
/// Removals are only generated while something is live, so the script
/// never underflows when replayed from an empty array.
pub fn churn_script(len: usize, remove_pct: u32, seed: u64) -> Vec<Op> {
    let mut rng = seeded_rng(seed, 0);
    let mut live = 0usize;
    (0..len)
        .map(|_| {
            if live > 0 && rng.random_range(0..100) < remove_pct {
                live -= 1;
                Op::Remove(rng.random_range(0..usize::MAX))
            } else {
                live += 1;
                Op::Emplace
            }
        })
        .collect()
}

/// Replay `script` on `array` from a single thread. Returns the live indices.
pub fn run_script<const MAX: u32>(array: &mut SlotArray<Pair, MAX>, script: &[Op]) -> Vec<u32> {
    let mut live = Vec::new();
    for (seq, op) in script.iter().enumerate() {
        match *op {
            Op::Emplace => live.push(array.emplace(stamp(0, seq as u32))),
            Op::Remove(n) => {
                let index = live.swap_remove(n % live.len());
                array.take(index);
            }
        }
    }
    live
}

/// An array with `count` values where every `stride`-th index was freed.
///
/// # Panics
///
/// Panics if `stride` is zero.
pub fn filled_with_holes<const MAX: u32>(count: u32, stride: u32) -> SlotArray<Pair, MAX> {
    assert!(stride > 0, "hole stride must be at least 1");
    let mut array = SlotArray::new();
    for seq in 0..count {
        array.emplace(stamp(0, seq));
    }
    for index in (0..count).step_by(stride as usize) {
        array.take(index);
    }
    array
}
