//! Integration test: indices handed between threads.
//!
//! A producer inserts values and sends their indices over a channel; the
//! consumer becomes the sole owner of each received index, checks the
//! value and removes it. Freed indices flow back to the producer through
//! reuse, so the high-water mark stays far below the number of values.

use std::collections::HashSet;
use std::sync::Arc;
use std::thread;

use crossbeam_channel::bounded;
use vmarray_slots::SlotArray;
use vmarray_test_utils::{stamp, unstamp, Pair};

const VALUES: u32 = 20_000;
const IN_FLIGHT: usize = 64;

#[test]
fn producer_consumer_handoff() {
    let array = Arc::new(SlotArray::<Pair, 4096>::new());
    let (tx, rx) = bounded::<u32>(IN_FLIGHT);

    let producer = {
        let array = Arc::clone(&array);
        thread::spawn(move || {
            for seq in 0..VALUES {
                tx.send(array.emplace(stamp(0, seq))).unwrap();
            }
        })
    };

    let consumer = {
        let array = Arc::clone(&array);
        thread::spawn(move || {
            let mut expected = 0;
            for index in rx {
                // SAFETY: the producer gave up `index` when it sent it.
                let value = unsafe { array.remove(index) };
                assert_eq!(unstamp(value), Some((0, expected)));
                expected += 1;
            }
            expected
        })
    };

    producer.join().unwrap();
    assert_eq!(consumer.join().unwrap(), VALUES);
    assert!(array.is_empty());
    // Channel capacity plus one value held by each side bounds the live set.
    assert!(array.high_water_mark() as usize <= IN_FLIGHT + 2);
}

#[test]
fn live_indices_stay_unique_across_handoff() {
    let array = Arc::new(SlotArray::<Pair, 4096>::new());
    let (tx, rx) = bounded::<u32>(IN_FLIGHT);

    let producers: Vec<_> = (0..4)
        .map(|owner| {
            let array = Arc::clone(&array);
            let tx = tx.clone();
            thread::spawn(move || {
                for seq in 0..VALUES / 4 {
                    tx.send(array.emplace(stamp(owner, seq))).unwrap();
                }
            })
        })
        .collect();
    drop(tx);

    let mut held = HashSet::new();
    let mut received = 0;
    for index in rx {
        assert!(held.insert(index), "index {index} is live twice");
        received += 1;
        // Hold every eighth value so holes and reuse interleave.
        if received % 8 != 0 {
            held.remove(&index);
            // SAFETY: received indices are owned by this thread.
            let value = unsafe { array.remove(index) };
            assert!(unstamp(value).is_some());
        }
    }
    for p in producers {
        p.join().unwrap();
    }

    assert_eq!(received, VALUES);
    assert_eq!(array.len() as usize, held.len());
    let mut live: Vec<u32> = array.iter_indexed().map(|(i, _)| i).collect();
    let mut expected: Vec<u32> = held.into_iter().collect();
    live.sort_unstable();
    expected.sort_unstable();
    assert_eq!(live, expected);
}
