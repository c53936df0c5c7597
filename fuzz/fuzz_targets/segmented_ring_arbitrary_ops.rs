#![no_main]

use libfuzzer_sys::fuzz_target;
use hotcold::ds::{Segment, SegmentedRing};

// Fuzz arbitrary operation sequences on SegmentedRing
//
// Tests random sequences of hot/cold pushes, rotations, removals, pops and clears,
// checking the region invariants after every step.
fuzz_target!(|data: &[u8]| {
    if data.len() < 2 {
        return;
    }

    let hot_capacity = usize::from(data[0] % 8) + 1;
    let mut ring: SegmentedRing<u32> = SegmentedRing::new(hot_capacity);
    let mut all_ids = Vec::new();

    let mut idx = 1;
    while idx + 1 < data.len() {
        let op = data[idx] % 7;
        let value = u32::from(data[idx + 1]);

        match op {
            0 => {
                // push_hot_front
                let id = ring.push_hot_front(value);
                all_ids.push(id);
                assert_eq!(ring.head_id(), Some(id));
                assert_eq!(ring.segment_of(id), Some(Segment::Hot));
            }
            1 => {
                // push_cold_front
                let old_len = ring.len();
                let id = ring.push_cold_front(value);
                all_ids.push(id);
                assert_eq!(ring.len(), old_len + 1);
                assert_eq!(ring.get(id), Some(&value));
            }
            2 => {
                // rotate_while with a bounded budget
                let mut budget = value % 4;
                let old_len = ring.len();
                let promoted = ring.rotate_while(|_| {
                    if budget == 0 {
                        return false;
                    }
                    budget -= 1;
                    true
                });
                assert!(promoted <= old_len);
                assert_eq!(ring.len(), old_len);
            }
            3 => {
                // remove
                if !all_ids.is_empty() {
                    let id = all_ids[(value as usize) % all_ids.len()];
                    let old_len = ring.len();
                    if ring.remove(id).is_some() {
                        assert_eq!(ring.len(), old_len - 1);
                        assert!(!ring.contains(id));
                    }
                }
            }
            4 => {
                // pop_tail
                let old_len = ring.len();
                let tail = ring.tail().copied();
                let popped = ring.pop_tail();
                assert_eq!(popped, tail);
                if popped.is_some() {
                    assert_eq!(ring.len(), old_len - 1);
                }
            }
            5 => {
                // iter (read-only)
                let hot = ring.iter().filter(|(_, seg, _)| *seg == Segment::Hot).count();
                assert_eq!(hot, ring.hot_len());
                assert_eq!(ring.iter().count(), ring.len());
            }
            6 => {
                // clear
                ring.clear();
                all_ids.clear();
                assert!(ring.is_empty());
                assert_eq!(ring.cold_head_id(), None);
            }
            _ => unreachable!(),
        }

        assert!(ring.check_invariants().is_ok());
        assert_eq!(ring.hot_len(), ring.len().min(ring.hot_capacity()));

        idx += 2;
    }
});
