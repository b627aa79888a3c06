//! The basic index-reuse walkthrough, step by step.

use vmarray_slots::{GrowthPolicy, SlotArray, SlotArrayConfig};

#[test]
fn emplace_remove_reuse_walkthrough() {
    let array = SlotArray::<u64, 100>::new();
    assert!(array.is_empty());

    assert_eq!(array.emplace(10), 0);
    assert_eq!(array.emplace(20), 1);
    assert_eq!(array.emplace(30), 2);
    assert_eq!(array.len(), 3);
    assert_eq!(array.high_water_mark(), 3);

    assert_eq!(unsafe { array.remove(1) }, 20);
    assert!(!array.is_occupied(1));
    assert_eq!(array.len(), 2);

    // Freed index comes back before the high-water mark grows.
    assert_eq!(array.emplace(40), 1);
    assert_eq!(array.high_water_mark(), 3);
    assert_eq!(array.emplace(50), 3);

    assert_eq!(array[1], 40);
    assert_eq!(
        array.iter_indexed().map(|(i, v)| (i, *v)).collect::<Vec<_>>(),
        vec![(0, 10), (1, 40), (2, 30), (3, 50)]
    );
}

#[test]
fn most_recently_freed_is_reused_first() {
    let array = SlotArray::<u32, 64>::new();
    for v in 0..6 {
        array.emplace(v);
    }
    unsafe {
        array.remove(1);
        array.remove(4);
        array.remove(2);
    }
    assert_eq!(array.emplace(100), 2);
    assert_eq!(array.emplace(101), 4);
    assert_eq!(array.emplace(102), 1);
    assert_eq!(array.emplace(103), 6);
}

#[test]
fn doubling_policy_behaves_like_linear_to_callers() {
    let config = SlotArrayConfig::new().with_growth(GrowthPolicy::Doubling);
    let array = SlotArray::<u64, 100_000>::with_config(config);
    for v in 0..50_000u64 {
        assert_eq!(array.emplace(v) as u64, v);
    }
    assert_eq!(array.iter().copied().sum::<u64>(), (0..50_000u64).sum());
}

#[test]
#[should_panic(expected = "capacity exhausted")]
fn emplace_past_max_panics() {
    let array = SlotArray::<u32, 4>::new();
    for v in 0..5 {
        array.emplace(v);
    }
}
